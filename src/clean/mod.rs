//! Cleaning stage: raw postings -> validated `CleanedRecord`s.
//!
//! Workflow:
//! deduplicate -> per-record normalize (parallel, order preserved) -> collect rejections
//!
//! Each record is transformed independently, so running the per-record step on the
//! rayon pool gives exactly the same output as a serial loop.

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::domain::{CleanConfig, CleanedRecord, RawPosting};
use crate::error::RecordError;
use crate::extract::KeywordTable;

pub mod dedup;
pub mod normalize;
pub mod regions;

pub use normalize::{normalize_posting, parse_date};
pub use regions::region_for_state;

/// A posting that did not make it into the cleaned dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// 1-based position in the raw input (line number for JSONL input).
    pub line: usize,
    pub job_id: Option<String>,
    pub error: RecordError,
}

/// Output of the cleaning stage.
#[derive(Debug, Clone, Default)]
pub struct CleanOutput {
    pub records: Vec<CleanedRecord>,
    pub rejections: Vec<Rejection>,
    pub duplicates_dropped: usize,
}

impl CleanOutput {
    pub fn rated_count(&self) -> usize {
        self.records.iter().filter(|r| r.rate_hourly.is_some()).count()
    }
}

/// Clean a batch of postings. `lines[i]` is the source line of `postings[i]`.
pub fn clean_postings(
    postings: &[RawPosting],
    lines: &[usize],
    keywords: &KeywordTable,
    config: &CleanConfig,
) -> CleanOutput {
    let keep: Vec<usize> = if config.dedup {
        dedup::surviving_indices(postings)
    } else {
        (0..postings.len()).collect()
    };
    let duplicates_dropped = postings.len() - keep.len();
    if duplicates_dropped > 0 {
        info!(duplicates_dropped, "dropped duplicate postings");
    }

    let results: Vec<(usize, Result<CleanedRecord, RecordError>)> = keep
        .par_iter()
        .map(|&idx| (idx, normalize_posting(&postings[idx], keywords)))
        .collect();

    let mut records = Vec::with_capacity(results.len());
    let mut rejections = Vec::new();
    for (idx, result) in results {
        match result {
            Ok(record) => records.push(record),
            Err(error) => {
                let line = lines.get(idx).copied().unwrap_or(idx + 1);
                debug!(line, %error, "rejected posting");
                rejections.push(Rejection {
                    line,
                    job_id: postings[idx].identity().map(str::to_string),
                    error,
                });
            }
        }
    }

    if !rejections.is_empty() {
        warn!(rejected = rejections.len(), "postings failed validation");
    }

    let output = CleanOutput {
        records,
        rejections,
        duplicates_dropped,
    };
    log_rate_summary(&output);
    output
}

fn log_rate_summary(output: &CleanOutput) {
    let mut rates: Vec<f64> = output.records.iter().filter_map(|r| r.rate_hourly).collect();
    if rates.is_empty() {
        info!(records = output.records.len(), "no hourly rates resolved");
        return;
    }
    rates.sort_by(f64::total_cmp);
    let median = crate::report::median(&rates).unwrap_or(f64::NAN);
    info!(
        records = output.records.len(),
        rated = rates.len(),
        min = rates[0],
        max = rates[rates.len() - 1],
        median,
        "hourly rate coverage"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn posting(id: &str, specialty: &str, state: &str, html: &str) -> RawPosting {
        RawPosting {
            job_id: Some(id.to_string()),
            specialty: Some(specialty.to_string()),
            state: Some(state.to_string()),
            description_html: Some(html.to_string()),
            ..RawPosting::default()
        }
    }

    #[test]
    fn rejections_are_counted_and_batch_continues() {
        let postings = vec![
            posting("1", "ER", "Ohio", "<li>$200/hr</li>"),
            posting("2", "", "", ""),
            posting("3", "ICU", "Texas", ""),
        ];
        let out = clean_postings(&postings, &[3, 4, 5], &KeywordTable::default(), &CleanConfig::default());
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.rejections.len(), 1);
        assert_eq!(out.rejections[0].line, 4);
        assert_eq!(out.rejections[0].error, RecordError::MissingIdentity);
        assert_eq!(out.rated_count(), 1);
    }

    #[test]
    fn output_order_matches_input_order() {
        let postings: Vec<RawPosting> = (0..200)
            .map(|i| posting(&i.to_string(), &format!("S{i}"), "Utah", ""))
            .collect();
        let out = clean_postings(&postings, &[], &KeywordTable::default(), &CleanConfig::default());
        let specialties: Vec<String> = out.records.iter().map(|r| r.specialty.clone()).collect();
        let expected: Vec<String> = (0..200).map(|i| format!("S{i}")).collect();
        assert_eq!(specialties, expected);
    }

    #[test]
    fn invariants_hold_for_every_record() {
        let postings = vec![
            posting("1", "ER", "Ohio", "<li>$150-$170/hr</li>"),
            posting("2", "ER", "Ohio", "<li>$1200/day</li>"),
            posting("3", "ER", "Ohio", "<li>call for details</li>"),
        ];
        let out = clean_postings(&postings, &[], &KeywordTable::default(), &CleanConfig::default());
        for rec in &out.records {
            match rec.rate_hourly {
                Some(h) => {
                    assert!(h >= 0.0);
                    assert_eq!(rec.rate_daily, Some(h * 8.0));
                }
                None => assert_eq!(rec.rate_daily, None),
            }
        }
    }

    #[test]
    fn dedup_is_applied_when_enabled() {
        let postings = vec![posting("1", "ER", "Ohio", ""), posting("1", "ER", "Ohio", "")];
        let out = clean_postings(&postings, &[], &KeywordTable::default(), &CleanConfig { dedup: true });
        assert_eq!(out.records.len(), 1);
        assert_eq!(out.duplicates_dropped, 1);
    }
}
