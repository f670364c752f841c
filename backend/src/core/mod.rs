//! Core services shared by every component

pub mod time;

pub use time::{Clock, ManualClock, SystemClock, SECONDS_PER_WEEK, SECONDS_PER_YEAR};
