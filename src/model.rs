use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Normalized types delivered to the event store (source-agnostic).

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedEvent {
    pub id: String,
    pub name: String,
    pub time: DateTime<Utc>,
    pub markets: Vec<NormalizedMarket>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedMarket {
    pub id: String,
    #[serde(rename = "type")]
    pub market_type: String,
    pub options: Vec<NormalizedOption>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedOption {
    pub id: String,
    pub name: String,
    #[serde(flatten)]
    pub odds: Odds,
}

/// Fractional odds, e.g. "5/2" -> num 5, den 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Odds {
    pub num: i64,
    pub den: i64,
}
