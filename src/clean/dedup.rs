//! Duplicate postings across scrapes.
//!
//! The scraper revisits listings, so the same job can appear more than once in a
//! snapshot. Postings sharing (job id, title, posted date) collapse to the most
//! recently scraped copy; ties keep the earlier one. The job id falls back to the
//! listing slug; postings with neither cannot be matched and always survive. Survivors keep their input order.

use std::collections::HashMap;

use crate::domain::RawPosting;

type DedupKey<'a> = (&'a str, Option<&'a str>, Option<&'a str>);

fn dedup_key(raw: &RawPosting) -> Option<DedupKey<'_>> {
    let id = raw.identity()?;
    Some((
        id,
        raw.title.as_deref().map(str::trim),
        raw.posted_on.as_deref().map(str::trim),
    ))
}

/// Indices of the postings to keep, in input order.
pub fn surviving_indices(postings: &[RawPosting]) -> Vec<usize> {
    let mut best: HashMap<DedupKey<'_>, usize> = HashMap::new();

    for (idx, raw) in postings.iter().enumerate() {
        let Some(key) = dedup_key(raw) else { continue };
        match best.get(&key) {
            Some(&kept) if postings[kept].scraped_at >= raw.scraped_at => {}
            _ => {
                best.insert(key, idx);
            }
        }
    }

    postings
        .iter()
        .enumerate()
        .filter(|(idx, raw)| match dedup_key(raw) {
            Some(key) => best.get(&key) == Some(idx),
            None => true,
        })
        .map(|(idx, _)| idx)
        .collect()
}
