pub use shared::protocol::consts::RECONNECT_BACKOFF_SECS;
