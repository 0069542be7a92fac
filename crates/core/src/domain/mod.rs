//! Boundary value objects.
//!
//! Rows arrive from the persistence layer loosely typed (every field optional).
//! Each entity has exactly one validating constructor (`from_raw`) that maps a
//! raw row into a strict value object or a [`RejectReason`], so the analytical
//! modules never see optional or missing fields.

pub mod inventory;
pub mod movement;
pub mod period;
pub mod product;
pub mod sale;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

/// Why a raw row was dropped. Rejections are counted, never fatal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MissingTimestamp,
    UnparseableTimestamp,
    MissingQuantity,
    NegativeQuantity,
    MissingAmount,
    NegativeAmount,
    MissingIdentifier(&'static str),
    UnknownMovementKind,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTimestamp => "missing_timestamp",
            Self::UnparseableTimestamp => "unparseable_timestamp",
            Self::MissingQuantity => "missing_quantity",
            Self::NegativeQuantity => "negative_quantity",
            Self::MissingAmount => "missing_amount",
            Self::NegativeAmount => "negative_amount",
            Self::MissingIdentifier(_) => "missing_identifier",
            Self::UnknownMovementKind => "unknown_movement_kind",
        }
    }
}

/// Parses a row timestamp into local wall-clock time.
///
/// RFC 3339 values keep the wall-clock reading of their own offset (a sale at
/// `2024-03-03T23:30:00-05:00` happened on Sunday locally). Naive SQL-style
/// timestamps and bare dates are taken as already local.
pub(crate) fn parse_local_timestamp(raw: &str) -> Result<NaiveDateTime, RejectReason> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(RejectReason::MissingTimestamp);
    }

    if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
        return Ok(value.naive_local());
    }

    const NAIVE_FORMATS: [&str; 4] =
        ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
    for format in NAIVE_FORMATS {
        if let Ok(value) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(value);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or(RejectReason::UnparseableTimestamp)
}

/// Trims an optional identifier, rejecting blanks.
pub(crate) fn required_identifier(
    value: Option<&str>,
    field: &'static str,
) -> Result<String, RejectReason> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .ok_or(RejectReason::MissingIdentifier(field))
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike};

    use super::{parse_local_timestamp, required_identifier, RejectReason};

    #[test]
    fn rfc3339_keeps_local_wall_clock_date() {
        let parsed = parse_local_timestamp("2024-03-03T23:30:00-05:00").expect("parses");

        assert_eq!(parsed.date(), NaiveDate::from_ymd_opt(2024, 3, 3).expect("valid date"));
        assert_eq!(parsed.hour(), 23);
    }

    #[test]
    fn sql_style_and_bare_dates_are_accepted() {
        let sql = parse_local_timestamp("2024-03-04 08:15:00").expect("sql timestamp");
        let fractional = parse_local_timestamp("2024-03-04 08:15:00.250").expect("fractional");
        let bare = parse_local_timestamp("2024-03-04").expect("bare date");

        assert_eq!(sql.date(), bare.date());
        assert_eq!(fractional.date(), bare.date());
        assert_eq!(bare.hour(), 0);
    }

    #[test]
    fn blank_and_garbage_timestamps_are_rejected() {
        assert_eq!(parse_local_timestamp("   "), Err(RejectReason::MissingTimestamp));
        assert_eq!(parse_local_timestamp("last tuesday"), Err(RejectReason::UnparseableTimestamp));
    }

    #[test]
    fn blank_identifiers_are_rejected_with_field_name() {
        assert_eq!(
            required_identifier(Some("  "), "store_id"),
            Err(RejectReason::MissingIdentifier("store_id"))
        );
        assert_eq!(required_identifier(Some(" s-1 "), "store_id"), Ok("s-1".to_string()));
    }
}
