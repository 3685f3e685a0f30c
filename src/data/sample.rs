//! Synthetic raw postings for exercising the pipeline offline.
//!
//! Rates follow a simple multiplicative model:
//!
//! ```text
//! hourly = specialty_base * state_premium * (1 + flag premiums) * lognormal noise
//! ```
//!
//! and are published the way real sources publish them: sometimes as a
//! structured field, sometimes only as list-item text (hourly or daily), and
//! sometimes not at all.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::LogNormal;
use tracing::info;

use crate::domain::{HOURS_PER_DAY, RawPosting};
use crate::error::AppError;

/// Log-scale standard deviation of the rate noise.
const NOISE_SIGMA: f64 = 0.08;

const SPECIALTIES: [(&str, f64); 8] = [
    ("Anesthesiology", 310.0),
    ("Emergency Medicine", 225.0),
    ("Hospitalist", 165.0),
    ("Family Medicine", 125.0),
    ("Psychiatry", 185.0),
    ("Radiology", 290.0),
    ("General Surgery", 250.0),
    ("Neurology", 210.0),
];

/// `(state, city, premium)`; the city is left off some postings.
const STATES: [(&str, &str, f64); 12] = [
    ("California", "Sacramento", 1.15),
    ("New York", "Albany", 1.10),
    ("Massachusetts", "Worcester", 1.08),
    ("Texas", "Houston", 1.00),
    ("Florida", "Tampa", 0.98),
    ("Ohio", "Columbus", 0.95),
    ("Illinois", "Peoria", 1.00),
    ("Arizona", "Tucson", 1.02),
    ("Georgia", "Macon", 0.97),
    ("Washington", "Spokane", 1.06),
    ("Pennsylvania", "Erie", 1.01),
    ("Vermont", "Burlington", 1.04),
];

/// `(bullet text, premium)` for the requirement bullets a posting may carry.
const BULLETS: [(&str, f64); 5] = [
    ("Board certified required", 0.05),
    ("Weekend coverage expected", 0.04),
    ("Level I trauma center", 0.07),
    ("ACLS required", 0.0),
    ("Epic EMR experience preferred", 0.0),
];

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub count: usize,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self { count: 500, seed: 42 }
    }
}

/// Generate `config.count` postings (plus a few re-scraped duplicates).
pub fn generate_postings(config: &SampleConfig) -> Result<Vec<RawPosting>, AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Sample count must be > 0."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let noise = LogNormal::new(0.0, NOISE_SIGMA)
        .map_err(|e| AppError::new(4, format!("Noise distribution error: {e}")))?;

    let base_day = NaiveDate::from_ymd_opt(2025, 1, 6)
        .ok_or_else(|| AppError::new(4, "Invalid sample base date."))?;
    let scraped_at: DateTime<Utc> = base_day
        .and_hms_opt(6, 0, 0)
        .map(|dt| dt.and_utc())
        .ok_or_else(|| AppError::new(4, "Invalid sample scrape time."))?;

    let mut postings = Vec::with_capacity(config.count + config.count / 20);
    for i in 0..config.count {
        let (specialty, base) = SPECIALTIES[rng.gen_range(0..SPECIALTIES.len())];
        let (state, city, premium) = STATES[rng.gen_range(0..STATES.len())];

        let bullets: Vec<(&str, f64)> = BULLETS
            .iter()
            .copied()
            .filter(|_| rng.gen_bool(0.35))
            .collect();
        let flag_premium: f64 = bullets.iter().map(|(_, p)| p).sum();
        let hourly = (base * premium * (1.0 + flag_premium) * noise.sample(&mut rng)).round();

        let start = base_day + Duration::days(rng.gen_range(0..180));
        let end = start + Duration::days(7 * rng.gen_range(1..=12));

        let mut items: Vec<String> = bullets.iter().map(|(text, _)| text.to_string()).collect();
        items.push(format!("{specialty} coverage, {}-week assignment", (end - start).num_days() / 7));

        let structured_rate = match rng.gen_range(0..10) {
            0..=4 => Some(hourly),
            5..=6 => {
                items.push(format!("Pay: ${hourly:.0}/hr"));
                Some(0.0)
            }
            7 => {
                items.push(format!("Compensation: ${:.0} per day", hourly * HOURS_PER_DAY));
                None
            }
            _ => None,
        };

        let description_html = format!(
            "<p>Locum tenens opportunity.</p><ul>{}</ul>",
            items
                .iter()
                .map(|item| format!("<li>{item}</li>"))
                .collect::<String>()
        );

        let slug = specialty.to_lowercase().replace(' ', "-");
        postings.push(RawPosting {
            job_id: Some(format!("SYN-{:05}", i + 1)),
            listing_id: Some(format!("locum-{slug}-{:05}", i + 1)),
            title: Some(format!("Locum {specialty} - {state}")),
            specialty: Some(specialty.to_string()),
            state: Some(state.to_string()),
            city: (i % 7 != 0).then(|| city.to_string()),
            structured_rate,
            description_html: Some(description_html),
            start_date: Some(start.format("%Y-%m-%d").to_string()),
            end_date: Some(end.format("%Y-%m-%d").to_string()),
            posted_on: Some((start - Duration::days(21)).format("%Y-%m-%d").to_string()),
            scraped_at: Some(scraped_at),
        });
    }

    // Re-scrapes of earlier postings, as a multi-day crawl would produce.
    let n_dupes = config.count / 20;
    for k in 0..n_dupes {
        let src = rng.gen_range(0..config.count);
        let mut dupe = postings[src].clone();
        dupe.scraped_at = Some(scraped_at + Duration::hours(24 * (k as i64 % 3 + 1)));
        postings.push(dupe);
    }

    info!(
        postings = postings.len(),
        duplicates = n_dupes,
        seed = config.seed,
        "generated synthetic postings"
    );
    Ok(postings)
}
