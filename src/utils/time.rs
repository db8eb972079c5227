use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

/// Parse a backend timestamp.
///
/// RFC 3339 strings keep their offset. Naive ISO-8601 strings such as
/// `2024-01-01T12:30:00.123456` carry no offset and are read as UTC.
pub fn parse(s: &str) -> Result<OffsetDateTime, time::error::Parse> {
    if let Ok(datetime) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(datetime);
    }
    let naive = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"
    );
    PrimitiveDateTime::parse(s, naive).map(|dt| dt.assume_offset(UtcOffset::UTC))
}

/// Format a timestamp as a wall-clock `HH:MM` label.
pub fn clock(datetime: OffsetDateTime) -> String {
    format!("{:02}:{:02}", datetime.hour(), datetime.minute())
}

/// Deserialize an RFC 3339 or naive ISO-8601 string into an OffsetDateTime
pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse(&s).map_err(serde::de::Error::custom)
}

/// Serialize an OffsetDateTime into an RFC 3339 formatted string
pub fn serialize<S>(datetime: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let s = datetime
        .format(&Rfc3339)
        .map_err(serde::ser::Error::custom)?;
    serializer.serialize_str(&s)
}
