//! Reporting: robust group statistics over the cleaned dataset.
//!
//! Every figure is a median of non-null hourly rates, never a mean: pay
//! distributions are right-skewed and a handful of premium postings would drag
//! a mean far from the typical rate.
//!
//! Region figures are rolled up from state medians (median of the state medians),
//! so one heavily-posted state cannot dominate a sparse region.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::{CleanedRecord, GroupKey, GroupStatistic, ReportConfig};

pub mod format;

pub use format::*;

/// Dataset-wide figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallSummary {
    pub total_records: usize,
    pub rated_records: usize,
    pub median_rate: Option<f64>,
    pub min_rate: Option<f64>,
    pub max_rate: Option<f64>,
}

/// All reporting tables for one pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Reports {
    pub overall: OverallSummary,
    pub by_specialty: Vec<GroupStatistic>,
    pub by_state: Vec<GroupStatistic>,
    pub by_region: Vec<GroupStatistic>,
    pub by_month: Vec<GroupStatistic>,
}

impl Reports {
    pub fn table(&self, key: GroupKey) -> &[GroupStatistic] {
        match key {
            GroupKey::Specialty => &self.by_specialty,
            GroupKey::State => &self.by_state,
            GroupKey::Region => &self.by_region,
            GroupKey::Month => &self.by_month,
        }
    }
}

/// Median of the finite values in `values` (order does not matter).
pub fn median(values: &[f64]) -> Option<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Build every reporting table.
pub fn build_reports(records: &[CleanedRecord], config: &ReportConfig) -> Reports {
    Reports {
        overall: overall_summary(records),
        by_specialty: group_statistics(records, GroupKey::Specialty, config.min_group_size),
        by_state: group_statistics(records, GroupKey::State, config.min_group_size),
        by_region: group_statistics(records, GroupKey::Region, config.min_group_size),
        by_month: group_statistics(records, GroupKey::Month, config.min_group_size),
    }
}

/// Per-group median and count, ordered by key.
///
/// Groups whose records all lack a rate are still listed (with no median).
/// Records without a region (or start date, for `Month`) are not grouped.
pub fn group_statistics(
    records: &[CleanedRecord],
    key: GroupKey,
    min_group_size: usize,
) -> Vec<GroupStatistic> {
    if key == GroupKey::Region {
        return region_rollup(records, min_group_size);
    }

    let mut groups: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for rec in records {
        let Some(group) = group_label(rec, key) else {
            continue;
        };
        let rates = groups.entry(group).or_default();
        if let Some(rate) = rec.rate_hourly {
            rates.push(rate);
        }
    }

    groups
        .into_iter()
        .map(|(key, rates)| GroupStatistic {
            key,
            median_rate: median(&rates),
            sample_count: rates.len(),
            low_confidence: rates.len() < min_group_size,
            state_count: None,
        })
        .collect()
}

fn group_label(rec: &CleanedRecord, key: GroupKey) -> Option<String> {
    match key {
        GroupKey::Specialty => Some(rec.specialty.clone()),
        GroupKey::State => Some(rec.state.clone()),
        GroupKey::Region => rec.region.map(|r| r.display_name().to_string()),
        GroupKey::Month => rec.start_date.map(|d| d.format("%Y-%m").to_string()),
    }
}

/// Region figure = median of the state medians within the region.
fn region_rollup(records: &[CleanedRecord], min_group_size: usize) -> Vec<GroupStatistic> {
    let mut regions: BTreeMap<_, BTreeMap<&str, Vec<f64>>> = BTreeMap::new();
    for rec in records {
        let Some(region) = rec.region else { continue };
        let rates = regions
            .entry(region)
            .or_default()
            .entry(rec.state.as_str())
            .or_default();
        if let Some(rate) = rec.rate_hourly {
            rates.push(rate);
        }
    }

    regions
        .into_iter()
        .map(|(region, states)| {
            let state_medians: Vec<f64> = states.values().filter_map(|r| median(r)).collect();
            let sample_count: usize = states.values().map(Vec::len).sum();
            GroupStatistic {
                key: region.display_name().to_string(),
                median_rate: median(&state_medians),
                sample_count,
                low_confidence: sample_count < min_group_size,
                state_count: Some(state_medians.len()),
            }
        })
        .collect()
}

fn overall_summary(records: &[CleanedRecord]) -> OverallSummary {
    let rates: Vec<f64> = records.iter().filter_map(|r| r.rate_hourly).collect();
    OverallSummary {
        total_records: records.len(),
        rated_records: rates.len(),
        median_rate: median(&rates),
        min_rate: rates.iter().copied().reduce(f64::min),
        max_rate: rates.iter().copied().reduce(f64::max),
    }
}
