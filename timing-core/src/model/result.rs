// Authoritative race result and leaderboard rows as returned by the server.
// Invariants: rank is never inferred; anything but a positive number is unknown.

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    #[serde(rename = "name", default)]
    pub driver_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_rank")]
    pub rank: Option<u32>,
    /// Milliseconds.
    #[serde(rename = "avg_lap_time", default)]
    pub average_lap_ms: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default, deserialize_with = "lenient_rank")]
    pub rank: Option<u32>,
    pub name: String,
    pub laps: u32,
    /// Seconds, already rounded by the server.
    #[serde(rename = "avg_lap_time", default)]
    pub avg_lap_time_sec: Option<f64>,
}

fn lenient_rank<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RankField {
        Number(u32),
        Other(serde_json::Value),
    }

    Ok(match Option::<RankField>::deserialize(deserializer)? {
        Some(RankField::Number(rank)) if rank > 0 => Some(rank),
        Some(RankField::Number(_)) | Some(RankField::Other(_)) | None => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_rank() {
        let result: RaceResult =
            serde_json::from_str(r#"{"name":"Kim","avg_lap_time":5000,"rank":1}"#).unwrap();
        assert_eq!(result.driver_name.as_deref(), Some("Kim"));
        assert_eq!(result.rank, Some(1));
        assert_eq!(result.average_lap_ms, Some(5000.0));
    }

    #[test]
    fn unknown_rank_forms() {
        for body in [
            r#"{"name":"Kim","avg_lap_time":null,"rank":"N/A"}"#,
            r#"{"name":"Kim","rank":null}"#,
            r#"{"name":"Kim"}"#,
            r#"{"name":"Kim","rank":0}"#,
        ] {
            let result: RaceResult = serde_json::from_str(body).unwrap();
            assert_eq!(result.rank, None, "{body}");
        }
    }

    #[test]
    fn extra_fields_are_ignored() {
        let result: RaceResult = serde_json::from_str(
            r#"{"laps":[5000,4800],"status":"ENDED","avg_lap_time":4900,"rank":2,"start_time":1000,"name":"Lee","total_laps":2}"#,
        )
        .unwrap();
        assert_eq!(result.rank, Some(2));
        assert_eq!(result.average_lap_ms, Some(4900.0));
    }

    #[test]
    fn leaderboard_rows() {
        let rows: Vec<LeaderboardEntry> = serde_json::from_str(
            r#"[{"rank":1,"name":"Kim","laps":3,"avg_lap_time":5.0},{"name":"Lee","laps":3,"avg_lap_time":5.12}]"#,
        )
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].rank, Some(1));
        assert_eq!(rows[1].rank, None);
        assert_eq!(rows[1].avg_lap_time_sec, Some(5.12));
    }
}
