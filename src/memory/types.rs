//! Memory record as seen by the map.
//!
//! [`MemoryRef`] is owned by the persistence layer; the map only reads it.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// A diary entry, reduced to the fields the map needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRef {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    /// When the memory happened. Missing or unparseable dates sort last.
    #[serde(default, deserialize_with = "flexible_date")]
    pub date: Option<DateTime<Utc>>,
    /// Public place name shown on the map.
    #[serde(default)]
    pub location: String,
    /// Private, more precise address. Preferred for geocoding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview_image: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
}

impl MemoryRef {
    /// The string to geocode: address if present, else location.
    /// `None` when both are blank. Such records never reach the map.
    pub fn query_name(&self) -> Option<&str> {
        self.address
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| Some(self.location.trim()).filter(|s| !s.is_empty()))
    }

    /// Preview image, else the first gallery image.
    pub fn thumbnail(&self) -> Option<&str> {
        self.preview_image
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.images.first().map(String::as_str))
    }

    /// Human-readable date, or an empty string when unknown.
    pub fn formatted_date(&self) -> String {
        self.date
            .map(|d| d.format("%-d %B %Y").to_string())
            .unwrap_or_default()
    }
}

/// Shapes a stored date arrives in.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawDate {
    Text(String),
    /// Milliseconds since the Unix epoch.
    Millis(f64),
    /// A `{seconds, nanoseconds}` timestamp object.
    Timestamp {
        #[serde(alias = "_seconds")]
        seconds: i64,
        #[serde(default, alias = "_nanoseconds")]
        nanoseconds: u32,
    },
    Other(IgnoredAny),
}

/// Accept date strings, epoch milliseconds and timestamp objects.
/// Anything else becomes `None` instead of failing the whole record.
fn flexible_date<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawDate> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawDate::Text(s)) => parse_date(&s),
        Some(RawDate::Millis(ms)) if ms.is_finite() => DateTime::from_timestamp_millis(ms as i64),
        Some(RawDate::Timestamp {
            seconds,
            nanoseconds,
        }) => DateTime::from_timestamp(seconds, nanoseconds),
        _ => None,
    })
}

/// Parse RFC 3339, offset-less ISO datetimes (taken as UTC) and bare `YYYY-MM-DD`.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory(location: &str, address: Option<&str>) -> MemoryRef {
        MemoryRef {
            id: "m1".into(),
            title: "Trip".into(),
            author: "A".into(),
            date: None,
            location: location.into(),
            address: address.map(Into::into),
            preview_image: None,
            images: vec![],
        }
    }

    #[test]
    fn address_wins_over_location() {
        let m = memory("Berlin", Some("  Unter den Linden 1, Berlin "));
        assert_eq!(m.query_name(), Some("Unter den Linden 1, Berlin"));
    }

    #[test]
    fn blank_address_falls_back_to_location() {
        let m = memory(" Hamburg ", Some("   "));
        assert_eq!(m.query_name(), Some("Hamburg"));
    }

    #[test]
    fn no_address_and_no_location_is_skipped() {
        let m = memory("", None);
        assert_eq!(m.query_name(), None);
    }

    #[test]
    fn thumbnail_prefers_preview() {
        let mut m = memory("Berlin", None);
        m.images = vec!["a.jpg".into(), "b.jpg".into()];
        assert_eq!(m.thumbnail(), Some("a.jpg"));
        m.preview_image = Some("p.jpg".into());
        assert_eq!(m.thumbnail(), Some("p.jpg"));
    }

    #[test]
    fn deserializes_camel_case_with_loose_dates() {
        let json = r#"[
            {"id": "1", "title": "A", "date": "2024-05-03", "location": "Paris", "previewImage": "x.png"},
            {"id": "2", "title": "B", "date": "2023-01-01T10:00:00Z", "location": "Rom"},
            {"id": "3", "title": "C", "date": "someday", "location": "Wien"}
        ]"#;
        let memories: Vec<MemoryRef> = serde_json::from_str(json).unwrap();
        assert_eq!(memories[0].formatted_date(), "3 May 2024");
        assert_eq!(memories[0].preview_image.as_deref(), Some("x.png"));
        assert!(memories[1].date.is_some());
        assert!(memories[2].date.is_none());
        assert_eq!(memories[2].formatted_date(), "");
    }

    #[test]
    fn odd_date_shapes_do_not_reject_the_file() {
        let json = r#"[
            {"id": "1", "location": "Berlin", "date": 1700000000000},
            {"id": "2", "location": "Köln", "date": "2024-01-01"},
            {"id": "3", "location": "Bonn", "date": {"seconds": 1700000000, "nanoseconds": 500}},
            {"id": "4", "location": "Ulm", "date": "2024-01-01T10:00:00"},
            {"id": "5", "location": "Kiel", "date": [true]},
            {"id": "6", "location": "Jena", "date": true},
            {"id": "7", "location": "Gera", "date": null}
        ]"#;
        let memories: Vec<MemoryRef> = serde_json::from_str(json).unwrap();
        assert_eq!(memories.len(), 7);
        assert_eq!(memories[0].date.unwrap().timestamp_millis(), 1_700_000_000_000);
        assert_eq!(memories[1].formatted_date(), "1 January 2024");
        assert_eq!(memories[2].date.unwrap().timestamp(), 1_700_000_000);
        assert_eq!(memories[3].date.unwrap().to_rfc3339(), "2024-01-01T10:00:00+00:00");
        assert!(memories[4].date.is_none());
        assert!(memories[5].date.is_none());
        assert!(memories[6].date.is_none());
    }
}
