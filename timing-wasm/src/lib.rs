use serde::Serialize;
use timing_core::format;
use timing_core::ledger::LapLedger;
use timing_core::model::{RaceResult, ServerConfig};
use timing_core::validation;
use wasm_bindgen::prelude::*;

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(|err| JsValue::from_str(&err.to_string()))
}

/// Browser numbers may be fractional, negative or missing; all of those floor or fall back to zero.
#[wasm_bindgen]
pub fn format_elapsed(ms: Option<f64>) -> String {
    match ms {
        Some(ms) if ms.is_finite() && ms >= 0.0 => format::format_elapsed(ms.floor() as u64),
        _ => format::ZERO_ELAPSED.to_string(),
    }
}

#[wasm_bindgen]
pub fn validate_entry(name: &str, laps: &str, config: JsValue) -> Result<JsValue, JsValue> {
    let config: Option<ServerConfig> = if config.is_null() || config.is_undefined() {
        None
    } else {
        Some(serde_wasm_bindgen::from_value(config).map_err(|err| JsValue::from_str(&err.to_string()))?)
    };
    match validation::validate_entry(name, laps, config.as_ref()) {
        Ok(entry) => to_js(&entry),
        Err(issues) => {
            let messages: Vec<String> = issues.iter().map(ToString::to_string).collect();
            Err(to_js(&messages)?)
        }
    }
}

#[derive(Serialize)]
struct ResultDisplay {
    driver: String,
    average: String,
    rank: String,
}

/// Shapes a `/laps` response for display without inventing missing values.
#[wasm_bindgen]
pub fn format_result(result: JsValue) -> Result<JsValue, JsValue> {
    let result: RaceResult =
        serde_wasm_bindgen::from_value(result).map_err(|err| JsValue::from_str(&err.to_string()))?;
    to_js(&ResultDisplay {
        driver: result.driver_name.unwrap_or_default(),
        average: format::format_average_secs(result.average_lap_ms),
        rank: format::format_rank(result.rank),
    })
}

#[wasm_bindgen]
#[derive(Default)]
pub struct LapTable {
    ledger: LapLedger,
}

#[wasm_bindgen]
impl LapTable {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.ledger.reset();
    }

    /// Returns the appended row, or an error string for a rejected segment.
    pub fn record_lap(&mut self, segment_ms: f64) -> Result<JsValue, JsValue> {
        if !segment_ms.is_finite() {
            return Err(JsValue::from_str("segment is not a number"));
        }
        let record = self
            .ledger
            .record_lap(segment_ms.floor() as i64)
            .map_err(|err| JsValue::from_str(&err.to_string()))?;
        to_js(&record)
    }

    pub fn rows(&self) -> Result<JsValue, JsValue> {
        to_js(&self.ledger.records())
    }

    pub fn cumulative_ms(&self) -> f64 {
        self.ledger.cumulative_ms() as f64
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }
}
