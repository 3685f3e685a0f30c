//! Signal extraction from job descriptions.
//!
//! - list-item text scanning (`html`)
//! - hourly rate resolution (`rate`)
//! - keyword flags (`flags`)

pub mod flags;
pub mod html;
pub mod rate;

pub use flags::*;
pub use rate::*;
