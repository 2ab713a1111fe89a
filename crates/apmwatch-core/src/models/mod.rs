//! Data models for apmwatch

mod alert;
mod apm;
mod sample;

pub use alert::*;
pub use apm::*;
pub use sample::*;
