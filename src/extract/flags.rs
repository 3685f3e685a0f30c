//! Keyword flags mined from list-item text.
//!
//! A `KeywordTable` maps each flag name to one or more phrases. A flag is set when
//! any of its phrases occurs in the list-item text as a contiguous run of whole
//! words, compared case-insensitively. Punctuation separates words, so
//! "ACLS, BLS" matches the phrase "acls bls" while "scarlet" never matches "scar".
//!
//! New flags are added to the table; the matcher does not change. Flags are kept
//! sorted by name, which is also their column order in every output.

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::FeatureFlags;
use crate::error::AppError;
use crate::extract::html::list_item_text;

/// One flag and the phrases that set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagRule {
    pub name: String,
    pub phrases: Vec<String>,
}

/// Immutable flag -> phrases configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordTable {
    rules: Vec<CompiledRule>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompiledRule {
    name: String,
    phrases: Vec<Vec<String>>,
}

const DEFAULT_RULES: &[(&str, &[&str])] = &[
    (
        "board_certified",
        &["board certified", "board certification", "board eligible"],
    ),
    ("weekend_shifts", &["weekend", "weekends", "weekend call"]),
    (
        "trauma_center",
        &["trauma center", "level i trauma", "trauma level"],
    ),
    ("acls_required", &["acls"]),
    ("epic_emr", &["epic", "epic emr", "emr epic"]),
];

impl Default for KeywordTable {
    fn default() -> Self {
        let rules = DEFAULT_RULES
            .iter()
            .map(|(name, phrases)| FlagRule {
                name: (*name).to_string(),
                phrases: phrases.iter().map(|p| (*p).to_string()).collect(),
            })
            .collect();
        // The built-in table is known to be valid.
        Self::from_rules(rules).unwrap_or_else(|_| Self { rules: Vec::new() })
    }
}

impl KeywordTable {
    /// Validate and compile a set of rules.
    pub fn from_rules(rules: Vec<FlagRule>) -> Result<Self, String> {
        let mut compiled = Vec::with_capacity(rules.len());
        for rule in rules {
            if !is_flag_name(&rule.name) {
                return Err(format!(
                    "invalid flag name `{}` (use lowercase letters, digits and `_`)",
                    rule.name
                ));
            }
            if compiled.iter().any(|c: &CompiledRule| c.name == rule.name) {
                return Err(format!("duplicate flag `{}`", rule.name));
            }
            let phrases: Vec<Vec<String>> = rule.phrases.iter().map(|p| tokenize(p)).collect();
            if phrases.is_empty() || phrases.iter().any(Vec::is_empty) {
                return Err(format!("flag `{}` has an empty phrase", rule.name));
            }
            compiled.push(CompiledRule {
                name: rule.name,
                phrases,
            });
        }
        compiled.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(Self { rules: compiled })
    }

    /// Load a JSON keyword file: `{ "flag_name": ["phrase", ...] }`.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let file = File::open(path).map_err(|e| {
            AppError::new(2, format!("Failed to open keyword file '{}': {e}", path.display()))
        })?;
        let map: BTreeMap<String, Vec<String>> = serde_json::from_reader(file)
            .map_err(|e| AppError::new(2, format!("Invalid keyword file '{}': {e}", path.display())))?;
        let rules = map
            .into_iter()
            .map(|(name, phrases)| FlagRule { name, phrases })
            .collect();
        Self::from_rules(rules)
            .map_err(|e| AppError::new(2, format!("Invalid keyword file '{}': {e}", path.display())))
    }

    /// Flag names, sorted.
    pub fn flag_names(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Flags for a description: only list-item text is searched.
    pub fn extract(&self, description_html: &str) -> FeatureFlags {
        self.match_text(&list_item_text(description_html))
    }

    /// Flags for plain text. Every flag is present in the result.
    pub fn match_text(&self, text: &str) -> FeatureFlags {
        let words = tokenize(text);
        self.rules
            .iter()
            .map(|rule| {
                let hit = rule.phrases.iter().any(|p| contains_phrase(&words, p));
                (rule.name.clone(), hit)
            })
            .collect()
    }

    /// All flags `false`; used when a posting has no description.
    pub fn empty_flags(&self) -> FeatureFlags {
        self.rules.iter().map(|r| (r.name.clone(), false)).collect()
    }
}

fn is_flag_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Lowercased alphanumeric words.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(words: &[String], phrase: &[String]) -> bool {
    if phrase.len() > words.len() {
        return false;
    }
    words.windows(phrase.len()).any(|w| w == phrase)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(rules: &[(&str, &[&str])]) -> KeywordTable {
        KeywordTable::from_rules(
            rules
                .iter()
                .map(|(n, p)| FlagRule {
                    name: (*n).to_string(),
                    phrases: p.iter().map(|s| (*s).to_string()).collect(),
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn matches_whole_words_case_insensitively() {
        let t = KeywordTable::default();
        let flags = t.extract("<ul><li>Must be BOARD CERTIFIED</li><li>ACLS, BLS</li></ul>");
        assert!(flags["board_certified"]);
        assert!(flags["acls_required"]);
        assert!(!flags["trauma_center"]);
        assert!(!flags["epic_emr"]);
    }

    #[test]
    fn substring_inside_another_word_does_not_match() {
        let t = table(&[("scar", &["scar"])]);
        assert!(!t.match_text("scarlet fever clinic")["scar"]);
        assert!(!t.match_text("oscar")["scar"]);
        assert!(t.match_text("scar revision")["scar"]);
    }

    #[test]
    fn phrases_must_be_contiguous() {
        let t = table(&[("trauma_center", &["level i trauma"])]);
        assert!(t.match_text("Level I Trauma hospital")["trauma_center"]);
        assert!(!t.match_text("level ii trauma")["trauma_center"]);
        assert!(!t.match_text("trauma level i")["trauma_center"]);
    }

    #[test]
    fn only_list_items_are_searched() {
        let t = KeywordTable::default();
        let flags = t.extract("<p>Epic EMR, weekend call</p><ul><li>Clinic only</li></ul>");
        assert!(flags.values().all(|v| !v));
    }

    #[test]
    fn every_flag_is_present_even_without_text() {
        let t = KeywordTable::default();
        let flags = t.extract("");
        assert_eq!(flags.len(), t.len());
        assert_eq!(t.empty_flags(), flags);
    }

    #[test]
    fn rejects_bad_rules() {
        let empty_phrase = vec![FlagRule {
            name: "x".into(),
            phrases: vec!["  ,, ".into()],
        }];
        assert!(KeywordTable::from_rules(empty_phrase).is_err());

        let bad_name = vec![FlagRule {
            name: "Bad Name".into(),
            phrases: vec!["x".into()],
        }];
        assert!(KeywordTable::from_rules(bad_name).is_err());
    }

    #[test]
    fn loads_keyword_file_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keywords.json");
        std::fs::write(&path, r#"{"telemetry": ["telemetry"], "icu": ["icu", "intensive care"]}"#).unwrap();

        let t = KeywordTable::from_json_file(&path).unwrap();
        assert_eq!(t.flag_names(), vec!["icu".to_string(), "telemetry".to_string()]);
        assert!(t.match_text("Intensive care unit")["icu"]);
    }
}
