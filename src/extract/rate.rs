//! Hourly rate resolution.
//!
//! Priority order, first success wins:
//! 1. the structured rate, when present and strictly positive
//! 2. the first list item whose text quotes a dollar amount tied to a time unit
//!    (`$150/hr`, `$150-$170 per hour`, `$1,200 daily`, `$150 to $170 an hour`)
//! 3. missing
//!
//! Ranges resolve to their midpoint and daily amounts are divided by the
//! working-day length. Nothing here is imputed: "no match" stays `None`.

use crate::domain::{HOURS_PER_DAY, RawPosting};
use crate::extract::html::list_items;

/// Time unit a quoted amount is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateUnit {
    Hour,
    Day,
}

/// A dollar amount (or range midpoint) with its unit, as quoted in text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuotedRate {
    pub amount: f64,
    pub unit: RateUnit,
}

impl QuotedRate {
    pub fn hourly(self) -> f64 {
        match self.unit {
            RateUnit::Hour => self.amount,
            RateUnit::Day => self.amount / HOURS_PER_DAY,
        }
    }
}

/// Resolve the canonical hourly rate for a posting.
pub fn resolve_hourly_rate(raw: &RawPosting) -> Option<f64> {
    if let Some(rate) = raw.structured_rate.filter(|r| r.is_finite() && *r > 0.0) {
        return Some(rate);
    }

    let html = raw.description_html.as_deref()?;
    rate_from_description(html)
}

/// First quoted rate found in the description's list items, normalized to hourly.
pub fn rate_from_description(html: &str) -> Option<f64> {
    list_items(html)
        .iter()
        .find_map(|item| find_quoted_rate(item))
        .map(QuotedRate::hourly)
}

/// First `$amount [range] [connector] unit` pattern in `text`.
pub fn find_quoted_rate(text: &str) -> Option<QuotedRate> {
    let lower = text.to_lowercase();
    let mut search_from = 0;

    while let Some(rel) = lower[search_from..].find('$') {
        let dollar = search_from + rel;
        search_from = dollar + 1;

        if let Some(quoted) = parse_quote_at(&lower[dollar + 1..]) {
            if quoted.amount > 0.0 && quoted.amount.is_finite() {
                return Some(quoted);
            }
        }
    }

    None
}

/// Parse what follows a `$`.
fn parse_quote_at(s: &str) -> Option<QuotedRate> {
    let (low, rest) = parse_amount(s)?;

    let (amount, rest) = match parse_range_tail(rest) {
        Some((high, tail)) => ((low + high) / 2.0, tail),
        None => (low, rest),
    };

    let unit = parse_unit(rest)?;
    Some(QuotedRate { amount, unit })
}

/// Leading amount such as `1,200.50`. Returns the value and the remaining text.
fn parse_amount(s: &str) -> Option<(f64, &str)> {
    let s = s.trim_start();
    let mut end = 0;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '0'..='9' | ',' => end = i + 1,
            '.' if !seen_dot => {
                // Only a decimal point if a digit follows.
                if s[i + 1..].starts_with(|d: char| d.is_ascii_digit()) {
                    seen_dot = true;
                    end = i + 1;
                } else {
                    break;
                }
            }
            _ => break,
        }
    }

    let digits: String = s[..end].chars().filter(|c| *c != ',').collect();
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let value = digits.parse::<f64>().ok()?;
    Some((value, &s[end..]))
}

/// `- $170`, `– 170`, `to $170`. Returns the upper amount and the remaining text.
fn parse_range_tail(s: &str) -> Option<(f64, &str)> {
    let s = s.trim_start();
    let after_sep = if let Some(rest) = s.strip_prefix(['-', '–', '—']) {
        rest
    } else {
        let rest = s.strip_prefix("to")?;
        if rest.starts_with(|c: char| c.is_alphanumeric()) {
            return None;
        }
        rest
    };

    let after_sep = after_sep.trim_start();
    let after_sep = after_sep.strip_prefix('$').unwrap_or(after_sep);
    parse_amount(after_sep)
}

/// Optional connector (`/`, `per`, `a`, `an`) followed by a unit word.
fn parse_unit(s: &str) -> Option<RateUnit> {
    let mut rest = s.trim_start();
    if let Some(r) = rest.strip_prefix('/') {
        rest = r.trim_start();
    } else {
        let word = leading_word(rest);
        if matches!(word, "per" | "a" | "an") {
            rest = rest[word.len()..].trim_start();
        }
    }

    match leading_word(rest) {
        "hr" | "hrs" | "hour" | "hours" | "hourly" => Some(RateUnit::Hour),
        "day" | "days" | "daily" => Some(RateUnit::Day),
        _ => None,
    }
}

fn leading_word(s: &str) -> &str {
    let end = s
        .char_indices()
        .find(|(_, c)| !c.is_alphabetic())
        .map(|(i, _)| i)
        .unwrap_or(s.len());
    &s[..end]
}
