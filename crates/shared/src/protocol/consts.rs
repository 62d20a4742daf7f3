/// Width in bytes of every control-channel message (one big-endian u16 port).
pub const PORT_MESSAGE_LENGTH: usize = 2;

/// How long a bridge slot waits for the agent to dial the ephemeral port
/// it was handed before the slot is abandoned and the control channel closed.
pub const BRIDGE_TIMEOUT_SECS: u64 = 5;

/// Fixed delay between agent reconnect attempts. No jitter, no backoff growth.
pub const RECONNECT_BACKOFF_SECS: u64 = 3;

/// Chunk size used by the byte pump for each read/write cycle.
pub const PUMP_CHUNK_SIZE: usize = 4096;
