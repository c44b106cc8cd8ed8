//! Default values for configuration sections.
//!
//! # Design
//! - Centralize defaults so the serde layer and the docs agree.

/// Worker tasks spawned by the task engine.
pub const DEFAULT_WORKER_COUNT: usize = 4;
/// Upper bound on configured workers.
pub const MAX_WORKER_COUNT: usize = 64;
/// Pending tasks buffered before `schedule` waits for room.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;
/// Attempts per task, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1;
/// Upper bound on configured attempts.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10;
/// Delay before a retryable failure is re-queued, in milliseconds.
pub const DEFAULT_RETRY_DELAY_MS: u64 = 0;
