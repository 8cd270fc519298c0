use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Identifier the upstream feed assigns to an event. Newer events always
/// receive higher ids; ids are never reused.
pub type EventId = i64;

/// Identifier of a market referenced from a source event.
pub type MarketId = i64;

/// Timestamp layout used by the source service, e.g. "2017-08-20:15:00:00Z".
const SOURCE_TIME_FORMAT: &str = "%Y-%m-%d:%H:%M:%S";

/// Source service event: `GET /football/events/{id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceEvent {
    pub id: EventId,
    pub name: String,
    #[serde(deserialize_with = "deserialize_source_time")]
    pub time: DateTime<Utc>,
    #[serde(default, alias = "Markets")]
    pub markets: Vec<MarketId>,
}

/// Source service market: `GET /football/markets/{id}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceMarket {
    pub id: String,
    #[serde(rename = "type")]
    pub market_type: String,
    #[serde(default)]
    pub options: Vec<SourceOption>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceOption {
    pub id: String,
    pub name: String,
    /// Fractional odds as text, "<num>/<den>".
    pub odds: String,
}

/// Parse the source timestamp. Accepts a trailing `Z` or a `+HH:MM` offset.
pub fn parse_source_time(s: &str) -> Option<DateTime<Utc>> {
    if let Some(naive) = s.strip_suffix('Z') {
        return NaiveDateTime::parse_from_str(naive, SOURCE_TIME_FORMAT)
            .ok()
            .map(|dt| dt.and_utc());
    }
    DateTime::parse_from_str(s, "%Y-%m-%d:%H:%M:%S%:z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn deserialize_source_time<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_source_time(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid event time {:?}", raw)))
}
