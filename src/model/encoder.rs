//! Feature encoding.
//!
//! Vector layout (fixed once the vocabulary is fitted):
//!
//! ```text
//! [ flag_* (0/1) ... | ln(1 + duration_days) | specialty one-hot ..., <unknown> | state one-hot ..., <unknown> | city one-hot ..., <unknown> ]
//! ```
//!
//! Categories never seen while fitting encode into the `<unknown>` slot of their
//! block instead of failing. A missing city is unknown too. Missing durations are
//! filled with the training median.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::{CleanedRecord, FeatureFlags};
use crate::report::median;

const UNKNOWN: &str = "<unknown>";

/// A single job description to encode: either a cleaned record or a prediction query.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeatureQuery {
    pub specialty: String,
    pub state: String,
    pub city: Option<String>,
    pub flags: FeatureFlags,
    pub duration_days: Option<i64>,
}

impl From<&CleanedRecord> for FeatureQuery {
    fn from(rec: &CleanedRecord) -> Self {
        Self {
            specialty: rec.specialty.clone(),
            state: rec.state.clone(),
            city: rec.city.clone(),
            flags: rec.flags.clone(),
            duration_days: rec.duration_days,
        }
    }
}

/// Vocabulary snapshot taken at training time. Persisted with the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    pub flags: Vec<String>,
    pub specialties: Vec<String>,
    pub states: Vec<String>,
    pub cities: Vec<String>,
    /// Log-duration used when a record has no duration.
    pub duration_fill: f64,
}

impl FeatureEncoder {
    /// Fit the vocabulary on the training records.
    pub fn fit(records: &[&CleanedRecord], flags: Vec<String>) -> Self {
        let specialties: BTreeSet<&str> = records.iter().map(|r| r.specialty.as_str()).collect();
        let states: BTreeSet<&str> = records.iter().map(|r| r.state.as_str()).collect();
        let cities: BTreeSet<&str> = records.iter().filter_map(|r| r.city.as_deref()).collect();
        let durations: Vec<f64> = records
            .iter()
            .filter_map(|r| r.duration_days)
            .map(log_duration)
            .collect();

        Self {
            flags,
            specialties: specialties.into_iter().map(str::to_string).collect(),
            states: states.into_iter().map(str::to_string).collect(),
            cities: cities.into_iter().map(str::to_string).collect(),
            duration_fill: median(&durations).unwrap_or(0.0),
        }
    }

    /// Length of every encoded vector.
    pub fn width(&self) -> usize {
        self.flags.len()
            + 1
            + (self.specialties.len() + 1)
            + (self.states.len() + 1)
            + (self.cities.len() + 1)
    }

    pub fn encode(&self, query: &FeatureQuery) -> Vec<f64> {
        let mut row = Vec::with_capacity(self.width());

        for flag in &self.flags {
            let on = query.flags.get(flag).copied().unwrap_or(false);
            row.push(if on { 1.0 } else { 0.0 });
        }

        row.push(query.duration_days.map(log_duration).unwrap_or(self.duration_fill));

        push_one_hot(&mut row, &self.specialties, &query.specialty);
        push_one_hot(&mut row, &self.states, &query.state);
        push_one_hot(&mut row, &self.cities, query.city.as_deref().unwrap_or(UNKNOWN));

        row
    }

    pub fn encode_record(&self, rec: &CleanedRecord) -> Vec<f64> {
        self.encode(&FeatureQuery::from(rec))
    }

    /// Column names matching `encode` output.
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        names.extend(self.flags.iter().map(|f| format!("flag_{f}")));
        names.push("log_duration_days".to_string());
        names.extend(self.specialties.iter().map(|s| format!("specialty={s}")));
        names.push(format!("specialty={UNKNOWN}"));
        names.extend(self.states.iter().map(|s| format!("state={s}")));
        names.push(format!("state={UNKNOWN}"));
        names.extend(self.cities.iter().map(|c| format!("city={c}")));
        names.push(format!("city={UNKNOWN}"));
        names
    }

    pub fn knows_specialty(&self, specialty: &str) -> bool {
        self.specialties.binary_search_by(|s| s.as_str().cmp(specialty)).is_ok()
    }

    pub fn knows_state(&self, state: &str) -> bool {
        self.states.binary_search_by(|s| s.as_str().cmp(state)).is_ok()
    }

    pub fn knows_city(&self, city: &str) -> bool {
        self.cities.binary_search_by(|c| c.as_str().cmp(city)).is_ok()
    }
}

fn log_duration(days: i64) -> f64 {
    (days.max(0) as f64).ln_1p()
}

/// One-hot over a sorted vocabulary plus a trailing unknown slot.
fn push_one_hot(row: &mut Vec<f64>, vocab: &[String], value: &str) {
    let start = row.len();
    row.resize(start + vocab.len() + 1, 0.0);
    let slot = vocab
        .binary_search_by(|v| v.as_str().cmp(value))
        .unwrap_or(vocab.len());
    row[start + slot] = 1.0;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(specialty: &str, state: &str, duration: Option<i64>, acls: bool) -> CleanedRecord {
        CleanedRecord {
            job_id: None,
            title: None,
            specialty: specialty.to_string(),
            state: state.to_string(),
            city: Some(if state == "Texas" { "Austin" } else { "Dayton" }.to_string()),
            region: None,
            start_date: None,
            end_date: None,
            duration_days: duration,
            rate_hourly: Some(100.0),
            rate_daily: Some(800.0),
            flags: [("acls_required".to_string(), acls)].into_iter().collect(),
        }
    }

    fn encoder() -> FeatureEncoder {
        let a = rec("Radiology", "Texas", Some(30), true);
        let b = rec("Anesthesiology", "Ohio", None, false);
        let c = CleanedRecord {
            city: None,
            ..rec("Radiology", "Ohio", Some(30), false)
        };
        FeatureEncoder::fit(&[&a, &b, &c], vec!["acls_required".to_string()])
    }

    #[test]
    fn vocabulary_is_sorted_and_width_matches() {
        let enc = encoder();
        assert_eq!(enc.specialties, vec!["Anesthesiology", "Radiology"]);
        assert_eq!(enc.states, vec!["Ohio", "Texas"]);
        assert_eq!(enc.cities, vec!["Austin", "Dayton"]);
        assert_eq!(enc.width(), 1 + 1 + 3 + 3 + 3);
        assert_eq!(enc.feature_names().len(), enc.width());
    }

    #[test]
    fn encodes_flags_duration_and_categories() {
        let enc = encoder();
        let row = enc.encode_record(&rec("Radiology", "Ohio", Some(30), true));
        assert_eq!(row.len(), enc.width());
        assert_eq!(row[0], 1.0);
        assert!((row[1] - 31f64.ln()).abs() < 1e-12);
        assert_eq!(&row[2..5], &[0.0, 1.0, 0.0]);
        assert_eq!(&row[5..8], &[1.0, 0.0, 0.0]);
        assert_eq!(&row[8..11], &[0.0, 1.0, 0.0]);
    }

    #[test]
    fn unseen_categories_use_unknown_slot() {
        let enc = encoder();
        let query = FeatureQuery {
            specialty: "Dermatology".into(),
            state: "Maine".into(),
            ..FeatureQuery::default()
        };
        let row = enc.encode(&query);
        assert_eq!(&row[2..5], &[0.0, 0.0, 1.0]);
        assert_eq!(&row[5..8], &[0.0, 0.0, 1.0]);
        assert!(!enc.knows_specialty("Dermatology"));
        assert!(enc.knows_state("Texas"));
    }

    #[test]
    fn unseen_or_missing_city_uses_unknown_slot() {
        let enc = encoder();
        let mut query = FeatureQuery {
            specialty: "Radiology".into(),
            state: "Texas".into(),
            city: Some("Austin".into()),
            ..FeatureQuery::default()
        };
        assert_eq!(&enc.encode(&query)[8..11], &[1.0, 0.0, 0.0]);

        query.city = Some("El Paso".into());
        assert_eq!(&enc.encode(&query)[8..11], &[0.0, 0.0, 1.0]);
        assert!(!enc.knows_city("El Paso"));

        query.city = None;
        assert_eq!(&enc.encode(&query)[8..11], &[0.0, 0.0, 1.0]);
        assert_eq!(enc.feature_names()[10], "city=<unknown>");
    }

    #[test]
    fn missing_duration_uses_training_median() {
        let enc = encoder();
        assert!((enc.duration_fill - 31f64.ln()).abs() < 1e-12);
        let row = enc.encode(&FeatureQuery::default());
        assert_eq!(row[1], enc.duration_fill);
    }
}
