// Typed push-channel events and their JSON payloads.

use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    RaceStarted { ts_ms: u64 },
    Lap { id: Option<u64>, segment_ms: i64 },
    RaceEnded { ts_ms: Option<u64> },
    KeepAlive,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct RaceStartedPayload {
    pub ts: u64,
}

#[derive(Clone, Copy, Debug, Deserialize)]
pub struct LapPayload {
    #[serde(default)]
    pub id: Option<u64>,
    pub ms: i64,
}

#[derive(Clone, Copy, Debug, Default, Deserialize)]
pub struct RaceEndedPayload {
    #[serde(default)]
    pub ts: Option<u64>,
}

impl From<RaceStartedPayload> for StreamEvent {
    fn from(payload: RaceStartedPayload) -> Self {
        StreamEvent::RaceStarted { ts_ms: payload.ts }
    }
}

impl From<LapPayload> for StreamEvent {
    fn from(payload: LapPayload) -> Self {
        StreamEvent::Lap {
            id: payload.id,
            segment_ms: payload.ms,
        }
    }
}

impl From<RaceEndedPayload> for StreamEvent {
    fn from(payload: RaceEndedPayload) -> Self {
        StreamEvent::RaceEnded { ts_ms: payload.ts }
    }
}
