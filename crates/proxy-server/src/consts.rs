pub use shared::protocol::consts::BRIDGE_TIMEOUT_SECS;
