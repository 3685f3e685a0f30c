//! Per-record normalization: raw posting -> `CleanedRecord`.
//!
//! Pure and independent across records. The only failures are record-scoped
//! (`RecordError`); a missing rate or region is a valid "unknown", not an error.

use chrono::{DateTime, NaiveDate};

use crate::clean::regions::region_for_state;
use crate::domain::{CleanedRecord, RawPosting, daily_from_hourly};
use crate::error::RecordError;
use crate::extract::{KeywordTable, resolve_hourly_rate};

/// Normalize one raw posting.
pub fn normalize_posting(
    raw: &RawPosting,
    keywords: &KeywordTable,
) -> Result<CleanedRecord, RecordError> {
    let specialty = non_empty(raw.specialty.as_deref());
    let state = non_empty(raw.state.as_deref());

    let (specialty, state) = match (specialty, state) {
        (Some(sp), Some(st)) => (sp, st),
        (None, None) => return Err(RecordError::MissingIdentity),
        (None, Some(_)) => return Err(RecordError::MissingSpecialty),
        (Some(_), None) => return Err(RecordError::MissingState),
    };

    let rate_hourly = resolve_hourly_rate(raw);
    let flags = match raw.description_html.as_deref() {
        Some(html) => keywords.extract(html),
        None => keywords.empty_flags(),
    };

    let start_date = raw.start_date.as_deref().and_then(parse_date);
    let end_date = raw.end_date.as_deref().and_then(parse_date);
    let duration_days = match (start_date, end_date) {
        (Some(start), Some(end)) if end >= start => Some((end - start).num_days()),
        _ => None,
    };

    Ok(CleanedRecord {
        job_id: non_empty(raw.identity()),
        title: non_empty(raw.title.as_deref()),
        region: region_for_state(&state),
        specialty,
        state,
        city: non_empty(raw.city.as_deref()),
        start_date,
        end_date,
        duration_days,
        rate_hourly,
        rate_daily: daily_from_hourly(rate_hourly),
        flags,
    })
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a posting date. Unparseable input is treated as missing.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const FMTS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d", "%d-%m-%Y"];
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in FMTS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    // Timestamps such as `2024-05-01T00:00:00` without an offset.
    s.get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Region;

    fn raw(specialty: Option<&str>, state: Option<&str>) -> RawPosting {
        RawPosting {
            specialty: specialty.map(str::to_string),
            state: state.map(str::to_string),
            ..RawPosting::default()
        }
    }

    #[test]
    fn builds_record_with_derived_fields() {
        let mut posting = raw(Some(" Anesthesiology "), Some("Texas"));
        posting.description_html = Some("<ul><li>$1,200/day</li><li>ACLS</li></ul>".into());
        posting.start_date = Some("2024-05-01".into());
        posting.end_date = Some("2024-05-31T00:00:00".into());

        let rec = normalize_posting(&posting, &KeywordTable::default()).unwrap();
        assert_eq!(rec.specialty, "Anesthesiology");
        assert_eq!(rec.region, Some(Region::Southwest));
        assert_eq!(rec.rate_hourly, Some(150.0));
        assert_eq!(rec.rate_daily, Some(1200.0));
        assert_eq!(rec.duration_days, Some(30));
        assert!(rec.flag("acls_required"));
        assert!(!rec.flag("epic_emr"));
    }

    #[test]
    fn missing_rate_keeps_daily_missing() {
        let rec = normalize_posting(&raw(Some("Radiology"), Some("Ohio")), &KeywordTable::default()).unwrap();
        assert_eq!(rec.rate_hourly, None);
        assert_eq!(rec.rate_daily, None);
        assert_eq!(rec.flags.len(), KeywordTable::default().len());
    }

    #[test]
    fn unknown_state_keeps_record_without_region() {
        let rec = normalize_posting(&raw(Some("Radiology"), Some("Guam")), &KeywordTable::default()).unwrap();
        assert_eq!(rec.region, None);
        assert_eq!(rec.state, "Guam");
    }

    #[test]
    fn missing_identity_is_rejected() {
        let kw = KeywordTable::default();
        assert_eq!(normalize_posting(&raw(None, Some("  ")), &kw), Err(RecordError::MissingIdentity));
        assert_eq!(normalize_posting(&raw(None, Some("Ohio")), &kw), Err(RecordError::MissingSpecialty));
        assert_eq!(normalize_posting(&raw(Some("ER"), None), &kw), Err(RecordError::MissingState));
    }

    #[test]
    fn bad_dates_are_coerced_to_missing() {
        let mut posting = raw(Some("ER"), Some("Ohio"));
        posting.start_date = Some("ASAP".into());
        posting.end_date = Some("2024-01-01".into());
        let rec = normalize_posting(&posting, &KeywordTable::default()).unwrap();
        assert_eq!(rec.start_date, None);
        assert_eq!(rec.duration_days, None);
    }

    #[test]
    fn end_before_start_has_no_duration() {
        let mut posting = raw(Some("ER"), Some("Ohio"));
        posting.start_date = Some("2024-03-01".into());
        posting.end_date = Some("2024-02-01".into());
        let rec = normalize_posting(&posting, &KeywordTable::default()).unwrap();
        assert_eq!(rec.duration_days, None);
    }
}
