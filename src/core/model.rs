use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use super::geo::Coord;

/// Stable identity of a target across fetches.
///
/// Feeds send ids either as JSON strings or numbers; both are canonicalized
/// into the same string key here so `7` and `"7"` are the same target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "RawId")]
pub struct TargetId(String);

impl TargetId {
    pub fn new(raw: impl AsRef<str>) -> Option<Self> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for TargetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Int(i64),
    Uint(u64),
    Float(f64),
    Text(String),
}

impl TryFrom<RawId> for TargetId {
    type Error = String;

    fn try_from(raw: RawId) -> Result<Self, Self::Error> {
        let text = match raw {
            RawId::Int(v) => v.to_string(),
            RawId::Uint(v) => v.to_string(),
            // Integral floats render without a fraction so 12.0 and 12 collide
            RawId::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 => {
                format!("{v:.0}")
            }
            RawId::Float(v) => v.to_string(),
            RawId::Text(s) => s,
        };
        Self::new(&text).ok_or_else(|| "target id must not be empty".to_string())
    }
}

/// Kind of object reported by the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Missile,
    Kab,
    Drone,
    Ballistics,
    Recon,
    Mrls,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missile => "missile",
            Self::Kab => "kab",
            Self::Drone => "drone",
            Self::Ballistics => "ballistics",
            Self::Recon => "recon",
            Self::Mrls => "mrls",
            Self::Unknown => "unknown",
        }
    }

    /// Kinds drawn with the pulsing threat marker.
    pub fn is_priority(&self) -> bool {
        matches!(self, Self::Missile | Self::Kab)
    }
}

impl fmt::Display for TargetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub const ICON_DIR: &str = "img/";

/// One record of the target feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    #[serde(rename = "type", default)]
    pub kind: TargetKind,
    #[serde(default)]
    pub label: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(default, alias = "expireAt", skip_serializing_if = "Option::is_none")]
    pub expire_at: Option<String>,
}

impl Target {
    pub fn coord(&self) -> Coord {
        Coord::new(self.lat, self.lng)
    }

    /// Icon from the feed, or the per-kind default under `img/`.
    pub fn icon_path(&self) -> String {
        match &self.icon {
            Some(icon) if !icon.is_empty() => icon.clone(),
            _ => format!("{ICON_DIR}{}.png", self.kind),
        }
    }

    /// Label for display; falls back to the id when the feed sent none.
    pub fn display_label(&self) -> &str {
        if self.label.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.label
        }
    }

    /// True when `expire_at` is present and strictly before `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expire_at
            .as_deref()
            .is_some_and(|expire_at| timestamp_before(expire_at, now))
    }
}

// Offset-bearing shapes that RFC 3339 rejects, e.g. minute precision.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Compares an ISO-8601 timestamp against `now`.
///
/// Offset-less timestamps are taken as UTC. Strings that do not parse at all
/// are compared lexicographically against `now` rendered in the same shape.
pub fn timestamp_before(stamp: &str, now: DateTime<Utc>) -> bool {
    let stamp = stamp.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(stamp) {
        return parsed.with_timezone(&Utc) < now;
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(stamp, format) {
            return parsed.with_timezone(&Utc) < now;
        }
    }
    // A trailing Z is UTC, same as no offset at all
    let local = stamp
        .strip_suffix('Z')
        .or_else(|| stamp.strip_suffix('z'))
        .unwrap_or(stamp);
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(local, format) {
            return naive.and_utc() < now;
        }
    }
    log::debug!("Unparseable timestamp {stamp:?}, comparing lexicographically");
    stamp < now.format("%Y-%m-%dT%H:%M:%S").to_string().as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_numeric_and_string_ids_collide() {
        let a: Target = serde_json::from_str(r#"{"id": 7, "lat": 1.0, "lng": 2.0}"#).unwrap();
        let b: Target = serde_json::from_str(r#"{"id": "7", "lat": 1.0, "lng": 2.0}"#).unwrap();
        let c: Target = serde_json::from_str(r#"{"id": 7.0, "lat": 1.0, "lng": 2.0}"#).unwrap();
        assert_eq!(a.id, b.id);
        assert_eq!(a.id, c.id);
        assert_eq!(a.id.as_str(), "7");
    }

    #[test]
    fn test_empty_id_rejected() {
        let result: Result<Target, _> =
            serde_json::from_str(r#"{"id": "  ", "lat": 1.0, "lng": 2.0}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_kind_and_default_icon() {
        let t: Target = serde_json::from_str(
            r#"{"id": "x", "type": "helicopter", "lat": 1.0, "lng": 2.0}"#,
        )
        .unwrap();
        assert_eq!(t.kind, TargetKind::Unknown);
        assert_eq!(t.icon_path(), "img/unknown.png");
        assert_eq!(t.display_label(), "x");

        let t: Target = serde_json::from_str(
            r#"{"id": "y", "type": "kab", "label": "KAB-500", "lat": 1.0, "lng": 2.0}"#,
        )
        .unwrap();
        assert_eq!(t.kind, TargetKind::Kab);
        assert!(t.kind.is_priority());
        assert_eq!(t.icon_path(), "img/kab.png");
        assert_eq!(t.display_label(), "KAB-500");
    }

    #[test]
    fn test_expiry_comparison() {
        assert!(timestamp_before("2025-03-01T11:59:59Z", now()));
        assert!(!timestamp_before("2025-03-01T12:00:00Z", now()));
        assert!(!timestamp_before("2025-03-01T14:30:00+02:00", now()));
        assert!(timestamp_before("2025-03-01T13:30:00+02:00", now()));
        assert!(timestamp_before("2025-03-01T11:00:00", now()));
        assert!(!timestamp_before("2025-03-02 00:00:00", now()));
        assert!(timestamp_before("2024-garbage", now()));
    }

    #[test]
    fn test_expiry_with_minute_precision_offsets() {
        // 13:30+02:00 is 11:30Z, already past
        assert!(timestamp_before("2025-03-01T13:30+02:00", now()));
        // 11:30-03:00 is 14:30Z, still ahead
        assert!(!timestamp_before("2025-03-01T11:30-03:00", now()));
        assert!(timestamp_before("2025-03-01T13:30+0200", now()));
        assert!(!timestamp_before("2025-03-01T13:30:00.250+0100", now()));
        assert!(timestamp_before("2025-03-01T11:30Z", now()));
        assert!(!timestamp_before("2025-03-01T12:30Z", now()));
        assert!(!timestamp_before("2025-03-01 15:00+03:00", now()));
    }

    #[test]
    fn test_offset_target_expiry_flows_through_is_expired() {
        let past: Target = serde_json::from_str(
            r#"{"id": 1, "lat": 1.0, "lng": 2.0, "expire_at": "2025-03-01T13:30+02:00"}"#,
        )
        .unwrap();
        let live: Target = serde_json::from_str(
            r#"{"id": 2, "lat": 1.0, "lng": 2.0, "expire_at": "2025-03-01T11:30-03:00"}"#,
        )
        .unwrap();
        assert!(past.is_expired(now()));
        assert!(!live.is_expired(now()));
    }

    #[test]
    fn test_target_without_expiry_never_expires() {
        let t: Target = serde_json::from_str(r#"{"id": 1, "lat": 1.0, "lng": 2.0}"#).unwrap();
        assert!(!t.is_expired(now()));
    }
}
