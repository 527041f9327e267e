// Wire models shared by the client and UI bindings.

mod config;
mod event;
mod result;

pub use config::{ServerConfig, DEFAULT_NAME_MAX_LEN};
pub use event::{LapPayload, RaceEndedPayload, RaceStartedPayload, StreamEvent};
pub use result::{LeaderboardEntry, RaceResult};
