// Server-sent events framing and typed event decoding.
// Invariants: partial lines are buffered across chunks; a frame is emitted only at a blank line.

use thiserror::Error;

use crate::model::{LapPayload, RaceEndedPayload, RaceStartedPayload, StreamEvent};

pub const EVENT_RACE_STARTED: &str = "race_started";
pub const EVENT_LAP: &str = "lap";
pub const EVENT_RACE_ENDED: &str = "race_ended";
pub const EVENT_PING: &str = "ping";

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("malformed {event} payload: {source}")]
    MalformedPayload {
        event: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
    started: bool,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|byte| *byte == b'\n') {
            let mut line: Vec<u8> = self.buf.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let mut line = String::from_utf8_lossy(&line).into_owned();
            if !self.started {
                self.started = true;
                if let Some(stripped) = line.strip_prefix('\u{feff}') {
                    line = stripped.to_string();
                }
            }
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(SseFrame {
            event,
            data,
            id: self.id.clone(),
        })
    }
}

fn parse_payload<T>(event: &str, data: &str) -> Result<T, ProtocolError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(data).map_err(|source| ProtocolError::MalformedPayload {
        event: event.to_string(),
        source,
    })
}

/// Maps a frame to a typed event. Unknown event names yield `Ok(None)`.
pub fn decode_event(frame: &SseFrame) -> Result<Option<StreamEvent>, ProtocolError> {
    let name = frame.event.as_deref().unwrap_or("message");
    let event: StreamEvent = match name {
        EVENT_RACE_STARTED => parse_payload::<RaceStartedPayload>(name, &frame.data)?.into(),
        EVENT_LAP => parse_payload::<LapPayload>(name, &frame.data)?.into(),
        EVENT_RACE_ENDED => {
            if frame.data.trim().is_empty() {
                RaceEndedPayload::default().into()
            } else {
                parse_payload::<RaceEndedPayload>(name, &frame.data)?.into()
            }
        }
        EVENT_PING => StreamEvent::KeepAlive,
        _ => return Ok(None),
    };
    Ok(Some(event))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut SseDecoder, input: &str) -> Vec<StreamEvent> {
        decoder
            .push(input.as_bytes())
            .iter()
            .filter_map(|frame| decode_event(frame).unwrap())
            .collect()
    }

    #[test]
    fn decodes_named_events() {
        let mut decoder = SseDecoder::new();
        let events = decode_all(
            &mut decoder,
            "event: ping\ndata: {}\n\nevent: race_started\ndata: {\"ts\": 1000}\n\nevent: lap\ndata: {\"id\": 17, \"ms\": 5000}\n\nevent: race_ended\ndata: {\"ts\": 16000}\n\n",
        );
        assert_eq!(
            events,
            vec![
                StreamEvent::KeepAlive,
                StreamEvent::RaceStarted { ts_ms: 1000 },
                StreamEvent::Lap {
                    id: Some(17),
                    segment_ms: 5000
                },
                StreamEvent::RaceEnded { ts_ms: Some(16000) },
            ]
        );
    }

    #[test]
    fn buffers_across_chunks() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: la").is_empty());
        assert!(decoder.push(b"p\r\ndata: {\"id\":1,").is_empty());
        assert!(decoder.push(b"\"ms\":4800}\r\n").is_empty());
        let frames = decoder.push(b"\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event.as_deref(), Some("lap"));
        assert_eq!(
            decode_event(&frames[0]).unwrap(),
            Some(StreamEvent::Lap {
                id: Some(1),
                segment_ms: 4800
            })
        );
    }

    #[test]
    fn comments_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\n\ndata: a\ndata: b\nid: 9\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: None,
                data: "a\nb".to_string(),
                id: Some("9".to_string()),
            }]
        );
        assert_eq!(decode_event(&frames[0]).unwrap(), None);
    }

    #[test]
    fn malformed_payload_is_a_protocol_error() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: lap\ndata: {not json\n\nevent: race_started\ndata: {\"ts\":5}\n\n");
        assert_eq!(frames.len(), 2);
        let err = decode_event(&frames[0]).unwrap_err();
        assert!(err.to_string().starts_with("malformed lap payload"));
        assert_eq!(
            decode_event(&frames[1]).unwrap(),
            Some(StreamEvent::RaceStarted { ts_ms: 5 })
        );
    }

    #[test]
    fn negative_lap_survives_decoding() {
        let frame = SseFrame {
            event: Some(EVENT_LAP.to_string()),
            data: r#"{"id":3,"ms":-20}"#.to_string(),
            id: None,
        };
        assert_eq!(
            decode_event(&frame).unwrap(),
            Some(StreamEvent::Lap {
                id: Some(3),
                segment_ms: -20
            })
        );
    }

    #[test]
    fn race_ended_tolerates_empty_payload() {
        let frame = SseFrame {
            event: Some(EVENT_RACE_ENDED.to_string()),
            data: String::new(),
            id: None,
        };
        assert_eq!(
            decode_event(&frame).unwrap(),
            Some(StreamEvent::RaceEnded { ts_ms: None })
        );
    }
}
