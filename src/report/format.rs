//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the cleaning/model code stays free of presentation concerns
//! - output changes are localized

use crate::clean::CleanOutput;
use crate::domain::{GroupKey, GroupStatistic};
use crate::model::{FeatureQuery, TrainOutcome};
use crate::report::Reports;

/// Summary of a cleaning pass.
pub fn format_clean_summary(rows_read: usize, unreadable: usize, output: &CleanOutput) -> String {
    let mut out = String::new();
    out.push_str("=== locum - Cleaning ===\n");
    out.push_str(&format!("Rows read:      {rows_read}\n"));
    if unreadable > 0 {
        out.push_str(&format!("Unreadable:     {unreadable}\n"));
    }
    out.push_str(&format!("Duplicates:     {}\n", output.duplicates_dropped));
    out.push_str(&format!("Rejected:       {}\n", output.rejections.len()));
    out.push_str(&format!("Accepted:       {}\n", output.records.len()));
    out.push_str(&format!(
        "With rate:      {} ({})\n",
        output.rated_count(),
        fmt_share(output.rated_count(), output.records.len())
    ));

    for r in output.rejections.iter().take(5) {
        out.push_str(&format!(
            "  line {:<6} {:<16} {}\n",
            r.line,
            truncate(r.job_id.as_deref().unwrap_or("-"), 16),
            r.error
        ));
    }
    if output.rejections.len() > 5 {
        out.push_str(&format!("  ... and {} more\n", output.rejections.len() - 5));
    }
    out
}

/// Market overview: dataset-wide figures plus the top groups of each table.
pub fn format_market_overview(reports: &Reports, top_n: usize) -> String {
    let o = &reports.overall;
    let mut out = String::new();

    out.push_str("=== locum - Market Overview ===\n");
    out.push_str(&format!(
        "Records: {} | with rate: {} ({})\n",
        o.total_records,
        o.rated_records,
        fmt_share(o.rated_records, o.total_records)
    ));
    out.push_str(&format!(
        "Hourly rate: median {} | min {} | max {}\n",
        fmt_rate(o.median_rate),
        fmt_rate(o.min_rate),
        fmt_rate(o.max_rate)
    ));

    for key in [GroupKey::Specialty, GroupKey::State, GroupKey::Region, GroupKey::Month] {
        let rows = reports.table(key);
        if rows.is_empty() {
            continue;
        }
        out.push('\n');
        out.push_str(&format!("By {}:\n", key.label()));
        let shown = if key == GroupKey::Month {
            rows.to_vec()
        } else {
            top_by_median(rows, top_n)
        };
        out.push_str(&format_group_table(&shown, key == GroupKey::Region));
        if shown.len() < rows.len() {
            out.push_str(&format!("({} of {} groups shown)\n", shown.len(), rows.len()));
        }
    }
    out
}

/// Groups with a median, highest first; key breaks ties.
fn top_by_median(rows: &[GroupStatistic], top_n: usize) -> Vec<GroupStatistic> {
    let mut ranked: Vec<GroupStatistic> = rows.iter().filter(|r| r.median_rate.is_some()).cloned().collect();
    ranked.sort_by(|a, b| {
        b.median_rate
            .unwrap_or(0.0)
            .total_cmp(&a.median_rate.unwrap_or(0.0))
            .then_with(|| a.key.cmp(&b.key))
    });
    ranked.truncate(top_n);
    ranked
}

pub fn format_group_table(rows: &[GroupStatistic], with_state_count: bool) -> String {
    let mut out = String::new();
    let header = format!("{:<28} {:>10} {:>8} {:>7}", "group", "median/hr", "n", "states");
    let rule = format!("{:-<28} {:-<10} {:-<8} {:-<7}", "", "", "", "");
    if with_state_count {
        out.push_str(&header);
        out.push('\n');
        out.push_str(&rule);
    } else {
        out.push_str(header[..header.len() - 8].trim_end());
        out.push('\n');
        out.push_str(&rule[..rule.len() - 8]);
    }
    out.push('\n');

    for r in rows {
        let low = if r.low_confidence { " (low n)" } else { "" };
        let line = if with_state_count {
            format!(
                "{:<28} {:>10} {:>8} {:>7}{low}",
                truncate(&r.key, 28),
                fmt_rate(r.median_rate),
                r.sample_count,
                r.state_count.unwrap_or(0)
            )
        } else {
            format!(
                "{:<28} {:>10} {:>8}{low}",
                truncate(&r.key, 28),
                fmt_rate(r.median_rate),
                r.sample_count
            )
        };
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Training summary: sizes, held-out metrics, importances and a few held-out samples.
pub fn format_training_summary(outcome: &TrainOutcome, top_n: usize) -> String {
    let model = &outcome.model;
    let m = &model.metrics;
    let mut out = String::new();

    out.push_str("=== locum - Rate Model ===\n");
    out.push_str(&format!(
        "Model: {} | version {}\n",
        model.model.kind().display_name(),
        model.version
    ));
    out.push_str(&format!(
        "Rows: train={} test={} | features={} | seed={}\n",
        m.n_train,
        m.n_test,
        model.encoder.width(),
        model.settings.seed
    ));
    out.push_str(&format!(
        "Held-out: MAE={} RMSE={} R2={}\n",
        fmt_rate(m.mae),
        fmt_rate(m.rmse),
        m.r2.map(|v| format!("{v:.3}")).unwrap_or_else(|| "n/a".to_string())
    ));

    if !model.importances.is_empty() {
        out.push_str(&format!("\nTop {} features:\n", top_n.min(model.importances.len())));
        for fi in model.importances.iter().take(top_n) {
            out.push_str(&format!("  {:<36} {:>6.3}\n", truncate(&fi.feature, 36), fi.importance));
        }
    }

    if !outcome.holdout.is_empty() {
        out.push_str("\nHeld-out samples:\n");
        out.push_str(&format!("  {:>10} {:>10} {:>10}\n", "actual", "predicted", "error"));
        for (actual, predicted) in outcome.holdout.iter().take(5) {
            out.push_str(&format!(
                "  {:>10.2} {:>10.2} {:>10.2}\n",
                actual,
                predicted,
                predicted - actual
            ));
        }
    }
    out
}

pub fn format_prediction(query: &FeatureQuery, estimate: f64, model_version: &str) -> String {
    let flags: Vec<&str> = query
        .flags
        .iter()
        .filter(|(_, on)| **on)
        .map(|(name, _)| name.as_str())
        .collect();
    let mut out = String::new();
    match &query.city {
        Some(city) => out.push_str(&format!("{} in {city}, {}", query.specialty, query.state)),
        None => out.push_str(&format!("{} in {}", query.specialty, query.state)),
    }
    if !flags.is_empty() {
        out.push_str(&format!(" [{}]", flags.join(", ")));
    }
    if let Some(days) = query.duration_days {
        out.push_str(&format!(", {days} days"));
    }
    out.push('\n');
    out.push_str(&format!(
        "Estimated rate: ${estimate:.2}/hr (${:.2}/day) | model {model_version}\n",
        estimate * crate::domain::HOURS_PER_DAY
    ));
    out
}

fn fmt_rate(v: Option<f64>) -> String {
    v.map(|x| format!("{x:.2}")).unwrap_or_else(|| "n/a".to_string())
}

fn fmt_share(part: usize, whole: usize) -> String {
    if whole == 0 {
        return "n/a".to_string();
    }
    format!("{:.1}%", 100.0 * part as f64 / whole as f64)
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
