//! RFC 3339 timestamps on the wire, and the wall clock used for token expiry.

use serde::{Deserialize, Deserializer, Serializer};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

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

/// Deserialize an optional RFC 3339 string.
///
/// Missing, null, and unparseable values all become `None`; the backend's
/// `createdAt` is informational and never worth failing a history load over.
pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<OffsetDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    Ok(s.and_then(|s| OffsetDateTime::parse(&s, &Rfc3339).ok()))
}

/// Seconds since the Unix epoch, as used by JWT `exp` claims.
pub fn unix_now() -> i64 {
    OffsetDateTime::now_utc().unix_timestamp()
}
