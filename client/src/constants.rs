// Shared constants for client timing, protocol paths, and channel sizes.

pub const CLOCK_TICK_MS: u64 = 50;
pub const CLOCK_TICK_MIN_MS: u64 = 10;
pub const CLOCK_TICK_MAX_MS: u64 = 100;
pub const RESULT_SETTLE_DELAY_MS: u64 = 500;
pub const HTTP_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:5000";

pub const PATH_START: &str = "/start";
pub const PATH_RESET: &str = "/reset";
pub const PATH_CONFIG: &str = "/api/config";
pub const PATH_LEADERBOARD: &str = "/result";
pub const PATH_RESULT: &str = "/laps";
pub const PATH_EVENTS: &str = "/events";

pub const UI_CHANNEL_CAPACITY: usize = 256;
pub const COMMAND_CHANNEL_CAPACITY: usize = 32;
pub const SIGNAL_CHANNEL_CAPACITY: usize = 256;
pub const COMPLETION_CHANNEL_CAPACITY: usize = 32;
