//! `locum-rates` library crate.
//!
//! The binary (`locum`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - each stage (clean, report, train, predict) can be driven on its own

pub mod app;
pub mod clean;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod extract;
pub mod io;
pub mod math;
pub mod model;
pub mod report;
