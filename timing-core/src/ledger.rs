// Append-only lap ledger with a running cumulative total.
// Invariants: sequence starts at 1 and grows by 1; cumulative_ms equals the sum of segments so far.

use serde::Serialize;
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct LapRecord {
    pub sequence: u32,
    pub segment_ms: u64,
    pub cumulative_ms: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum LapRejected {
    #[error("negative segment duration ({0} ms)")]
    NegativeSegment(i64),
    #[error("lap total overflow")]
    Overflow,
}

#[derive(Clone, Debug, Default)]
pub struct LapLedger {
    records: Vec<LapRecord>,
    cumulative_ms: u64,
}

impl LapLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.records.clear();
        self.cumulative_ms = 0;
    }

    /// Appends a lap. A rejected segment leaves the ledger untouched.
    pub fn record_lap(&mut self, segment_ms: i64) -> Result<LapRecord, LapRejected> {
        let segment = u64::try_from(segment_ms).map_err(|_| LapRejected::NegativeSegment(segment_ms))?;
        let cumulative_ms = self
            .cumulative_ms
            .checked_add(segment)
            .ok_or(LapRejected::Overflow)?;
        let sequence = u32::try_from(self.records.len() + 1).map_err(|_| LapRejected::Overflow)?;

        let record = LapRecord {
            sequence,
            segment_ms: segment,
            cumulative_ms,
        };
        self.records.push(record);
        self.cumulative_ms = cumulative_ms;
        Ok(record)
    }

    pub fn records(&self) -> &[LapRecord] {
        &self.records
    }

    pub fn last(&self) -> Option<&LapRecord> {
        self.records.last()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn cumulative_ms(&self) -> u64 {
        self.cumulative_ms
    }
}
