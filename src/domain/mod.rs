//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - ingest input (`RawPosting`)
//! - the cleaned, validated row (`CleanedRecord`, `Region`, `FeatureFlags`)
//! - reporting output (`GroupStatistic`, `GroupKey`)
//! - stage configuration (`CleanConfig`, `ReportConfig`, `TrainConfig`)

pub mod types;

pub use types::*;
