//! RFC 3339 timestamps with millisecond precision and a `Z` suffix,
//! e.g. `2026-10-15T09:30:00.123Z`.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}

pub mod option {
    use super::*;

    pub fn serialize<S>(ts: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match ts {
            Some(ts) => super::serialize(ts, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| {
                DateTime::parse_from_rfc3339(&raw)
                    .map(|ts| ts.with_timezone(&Utc))
                    .map_err(serde::de::Error::custom)
            })
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Serialize, Deserialize)]
    struct Stamp {
        #[serde(with = "super")]
        at: DateTime<Utc>,
    }

    #[test]
    fn writes_millisecond_precision() {
        let at = Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap();
        let json = serde_json::to_string(&Stamp { at }).unwrap();
        assert_eq!(json, r#"{"at":"2026-10-15T09:30:00.000Z"}"#);
    }

    #[test]
    fn accepts_offsets_and_normalizes_to_utc() {
        let stamp: Stamp = serde_json::from_str(r#"{"at":"2026-10-15T11:30:00+02:00"}"#).unwrap();
        assert_eq!(stamp.at, Utc.with_ymd_and_hms(2026, 10, 15, 9, 30, 0).unwrap());
    }

    #[test]
    fn rejects_garbage() {
        assert!(serde_json::from_str::<Stamp>(r#"{"at":"yesterday"}"#).is_err());
    }
}
