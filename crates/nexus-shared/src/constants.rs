//! Application-wide constants

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Auth tokens stay valid for 7 days.
pub const DEFAULT_TOKEN_EXPIRY: i64 = 604800;

/// Default capacity of the realtime broadcast channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
