//! Shared domain types.
//!
//! These types are kept small and serializable so they can be:
//!
//! - read from the scraper's JSONL output (`RawPosting`)
//! - carried through the cleaning pipeline (`CleanedRecord`)
//! - exported to CSV / JSON for reporting and modeling

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Deserializer, Serialize};

/// Hours in the working day used to convert between hourly and daily rates.
pub const HOURS_PER_DAY: f64 = 8.0;

/// A raw job posting as produced by the ingestion collaborator.
///
/// Dates stay as text here: the source is inconsistent and unparseable dates are
/// coerced to missing during normalization, not rejected at load time. The same
/// goes for the scrape timestamp, which the scraper writes without an offset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawPosting {
    #[serde(default, alias = "Id", deserialize_with = "de_job_id")]
    pub job_id: Option<String>,
    /// Listing slug used in the posting URL.
    #[serde(
        default,
        alias = "JobIdStrnew",
        deserialize_with = "de_job_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub listing_id: Option<String>,
    #[serde(default, alias = "Title")]
    pub title: Option<String>,
    #[serde(default, alias = "SpecialtyName")]
    pub specialty: Option<String>,
    #[serde(default, alias = "StateName")]
    pub state: Option<String>,
    #[serde(default, alias = "City")]
    pub city: Option<String>,
    /// Rate supplied directly by the source. Zero means "unset".
    #[serde(default, alias = "RegularHR")]
    pub structured_rate: Option<f64>,
    #[serde(default, alias = "Description")]
    pub description_html: Option<String>,
    #[serde(default, alias = "StartDate")]
    pub start_date: Option<String>,
    #[serde(default, alias = "EndDate")]
    pub end_date: Option<String>,
    #[serde(default, alias = "CreartedOn", alias = "PostedOn")]
    pub posted_on: Option<String>,
    #[serde(default, alias = "scrape_timestamp_utc", deserialize_with = "de_scrape_time")]
    pub scraped_at: Option<DateTime<Utc>>,
}

impl RawPosting {
    /// Identifier used to match re-scrapes of one job: the numeric id, else the listing slug.
    pub fn identity(&self) -> Option<&str> {
        [self.job_id.as_deref(), self.listing_id.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
    }
}

/// Ids arrive as strings or bare JSON numbers.
fn de_job_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdValue {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<IdValue>::deserialize(deserializer)?.map(|id| match id {
        IdValue::Text(s) => s,
        IdValue::Int(n) => n.to_string(),
        IdValue::Float(v) => v.to_string(),
    }))
}

fn de_scrape_time<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<String>::deserialize(deserializer)?;
    Ok(text.as_deref().and_then(parse_scrape_time))
}

/// Parse a scrape timestamp. RFC 3339 first; a timestamp without an offset is read as UTC.
pub fn parse_scrape_time(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// The six U.S. reporting regions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum Region {
    NewEngland,
    MidAtlantic,
    South,
    Midwest,
    Southwest,
    West,
}

impl Region {
    pub const ALL: [Region; 6] = [
        Region::NewEngland,
        Region::MidAtlantic,
        Region::South,
        Region::Midwest,
        Region::Southwest,
        Region::West,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            Region::NewEngland => "New England",
            Region::MidAtlantic => "Mid-Atlantic",
            Region::South => "South",
            Region::Midwest => "Midwest",
            Region::Southwest => "Southwest",
            Region::West => "West",
        }
    }

    pub fn from_display_name(name: &str) -> Option<Region> {
        Region::ALL
            .into_iter()
            .find(|r| r.display_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Flag name -> value. Every flag of the keyword table is present; absent keywords are `false`.
pub type FeatureFlags = BTreeMap<String, bool>;

/// One accepted posting after rate resolution, normalization and feature extraction.
///
/// Built only by `clean::normalize_posting`, which keeps `rate_daily` tied to
/// `rate_hourly`. Never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleanedRecord {
    pub job_id: Option<String>,
    pub title: Option<String>,
    pub specialty: String,
    pub state: String,
    pub city: Option<String>,
    pub region: Option<Region>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub duration_days: Option<i64>,
    pub rate_hourly: Option<f64>,
    pub rate_daily: Option<f64>,
    pub flags: FeatureFlags,
}

impl CleanedRecord {
    pub fn flag(&self, name: &str) -> bool {
        self.flags.get(name).copied().unwrap_or(false)
    }
}

/// Derive the daily rate from an hourly rate (`None` stays `None`).
pub fn daily_from_hourly(rate_hourly: Option<f64>) -> Option<f64> {
    rate_hourly.map(|r| r * HOURS_PER_DAY)
}

/// How reporting rows are grouped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GroupKey {
    Specialty,
    State,
    Region,
    /// Calendar month of the start date (`YYYY-MM`).
    Month,
}

impl GroupKey {
    pub fn label(self) -> &'static str {
        match self {
            GroupKey::Specialty => "specialty",
            GroupKey::State => "state",
            GroupKey::Region => "region",
            GroupKey::Month => "month",
        }
    }
}

/// Median rate and sample count for one group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupStatistic {
    pub key: String,
    /// Median of the non-null hourly rates (`None` if the group has none).
    pub median_rate: Option<f64>,
    /// Number of non-null rates behind the median.
    pub sample_count: usize,
    /// Fewer samples than the configured minimum.
    pub low_confidence: bool,
    /// Region rollups only: number of states whose medians were combined.
    pub state_count: Option<usize>,
}

/// Which regression model to fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    /// Random forest of regression trees.
    Forest,
    /// Ordinary least squares over the same encoding.
    Linear,
}

impl ModelKind {
    pub fn display_name(self) -> &'static str {
        match self {
            ModelKind::Forest => "Random forest",
            ModelKind::Linear => "Linear (OLS)",
        }
    }
}

/// Options for the cleaning stage.
#[derive(Debug, Clone, Default)]
pub struct CleanConfig {
    /// Deduplicate postings sharing (job id, title, posted date).
    pub dedup: bool,
}

/// Options for the reporting stage.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Groups with fewer rated samples are flagged low-confidence.
    pub min_group_size: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { min_group_size: 5 }
    }
}

/// Options for the training stage.
#[derive(Debug, Clone)]
pub struct TrainConfig {
    pub model_kind: ModelKind,
    pub seed: u64,
    /// Share of rated records held out for evaluation.
    pub test_fraction: f64,
    /// Training aborts below this many training rows.
    pub min_train_samples: usize,
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; `None` means all.
    pub max_features: Option<usize>,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            model_kind: ModelKind::Forest,
            seed: 42,
            test_fraction: 0.2,
            min_train_samples: 10,
            n_trees: 100,
            max_depth: 12,
            min_samples_leaf: 1,
            max_features: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_posting_accepts_scraper_field_names() {
        let line = r#"{"Id":"J-1","SpecialtyName":"Anesthesiology","StateName":"Texas","RegularHR":0,"Description":"<ul><li>ACLS</li></ul>","StartDate":"2024-05-01","scrape_timestamp_utc":"2024-04-01T12:00:00Z"}"#;
        let raw: RawPosting = serde_json::from_str(line).unwrap();
        assert_eq!(raw.job_id.as_deref(), Some("J-1"));
        assert_eq!(raw.specialty.as_deref(), Some("Anesthesiology"));
        assert_eq!(raw.structured_rate, Some(0.0));
        assert!(raw.scraped_at.is_some());
        assert!(raw.end_date.is_none());
    }

    #[test]
    fn scraper_timestamp_without_offset_is_utc() {
        let line = r#"{"Id":12345,"JobIdStrnew":"er-physician-12345","SpecialtyName":"Hospitalist","StateName":"Ohio","scrape_timestamp_utc":"2025-06-01T12:34:56.789012"}"#;
        let raw: RawPosting = serde_json::from_str(line).unwrap();
        assert_eq!(raw.job_id.as_deref(), Some("12345"));
        assert_eq!(raw.listing_id.as_deref(), Some("er-physician-12345"));

        let at = raw.scraped_at.unwrap();
        assert_eq!(at.to_rfc3339(), "2025-06-01T12:34:56.789012+00:00");

        // Written back with an offset, read back unchanged.
        let again: RawPosting = serde_json::from_str(&serde_json::to_string(&raw).unwrap()).unwrap();
        assert_eq!(again, raw);
    }

    #[test]
    fn scrape_time_formats() {
        assert!(parse_scrape_time("2024-04-01T12:00:00Z").is_some());
        assert!(parse_scrape_time("2024-04-01T08:00:00-04:00").is_some());
        assert_eq!(
            parse_scrape_time("2024-04-01 12:00:00"),
            parse_scrape_time("2024-04-01T12:00:00+00:00")
        );
        assert_eq!(parse_scrape_time("yesterday"), None);

        let raw: RawPosting =
            serde_json::from_str(r#"{"Id":"J-2","scrape_timestamp_utc":"not a time"}"#).unwrap();
        assert_eq!(raw.scraped_at, None);
        let raw: RawPosting = serde_json::from_str(r#"{"Id":null,"scrape_timestamp_utc":null}"#).unwrap();
        assert_eq!(raw, RawPosting::default());
    }

    #[test]
    fn identity_falls_back_to_listing_slug() {
        let raw = RawPosting {
            job_id: Some("  ".to_string()),
            listing_id: Some("icu-nights-77".to_string()),
            ..RawPosting::default()
        };
        assert_eq!(raw.identity(), Some("icu-nights-77"));
        let raw = RawPosting {
            job_id: Some("77".to_string()),
            ..raw
        };
        assert_eq!(raw.identity(), Some("77"));
        assert_eq!(RawPosting::default().identity(), None);
    }

    #[test]
    fn region_names_round_trip() {
        for region in Region::ALL {
            assert_eq!(Region::from_display_name(region.display_name()), Some(region));
        }
        assert_eq!(Region::from_display_name("mid-atlantic"), Some(Region::MidAtlantic));
    }

    #[test]
    fn daily_rate_follows_hourly() {
        assert_eq!(daily_from_hourly(Some(150.0)), Some(1200.0));
        assert_eq!(daily_from_hourly(None), None);
    }
}
