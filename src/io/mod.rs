//! Input/output helpers.
//!
//! - raw JSONL ingest (`ingest`)
//! - cleaned dataset CSV (`dataset`)
//! - report table exports (`export`)
//! - model artifact JSON read/write (`artifact`)

pub mod artifact;
pub mod dataset;
pub mod export;
pub mod ingest;

pub use artifact::*;
pub use dataset::*;
pub use export::*;
pub use ingest::*;
