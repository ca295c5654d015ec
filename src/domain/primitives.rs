//! Identifier newtypes and date/time persistence formats.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Persisted date format (`YYYY-MM-DD`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted timestamp format, fund-local wall clock.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Persisted time-of-day format.
pub const TIME_FORMAT: &str = "%H:%M";

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Generate a fresh random identifier.
            pub fn generate() -> Self {
                $name(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

entity_id!(
    /// Fund identifier.
    FundId
);
entity_id!(
    /// Quotaholder (investor) identifier.
    QuotaholderId
);
entity_id!(
    /// Subscription/redemption movement identifier.
    MovementId
);
entity_id!(AssetId);
entity_id!(ReceivableId);

/// A persisted enum code that does not map to any known variant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} code: {code}")]
pub struct UnknownCode {
    pub kind: &'static str,
    pub code: String,
}

impl UnknownCode {
    pub fn new(kind: &'static str, code: &str) -> Self {
        Self {
            kind,
            code: code.to_string(),
        }
    }
}

/// Source of "now" for request timestamps and report stamps.
pub type Clock = fn() -> NaiveDateTime;

/// Current fund-local wall clock.
pub fn local_now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT)
}

pub fn format_datetime(ts: NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

pub fn parse_datetime(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
}

pub fn format_time(t: NaiveTime) -> String {
    t.format(TIME_FORMAT).to_string()
}

pub fn parse_time(s: &str) -> Result<NaiveTime, chrono::ParseError> {
    NaiveTime::parse_from_str(s, TIME_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        let a = MovementId::generate();
        let b = MovementId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = FundId::new("f-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"f-1\"");
    }

    #[test]
    fn test_date_and_time_formats() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        assert_eq!(format_date(d), "2024-03-06");
        assert_eq!(parse_date("2024-03-06").unwrap(), d);

        let ts = d.and_hms_opt(13, 59, 0).unwrap();
        assert_eq!(format_datetime(ts), "2024-03-06T13:59:00");
        assert_eq!(parse_datetime("2024-03-06T13:59:00").unwrap(), ts);

        let t = NaiveTime::from_hms_opt(14, 0, 0).unwrap();
        assert_eq!(format_time(t), "14:00");
        assert_eq!(parse_time("14:00").unwrap(), t);
    }
}
