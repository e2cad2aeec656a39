//! 공통 타입.

pub mod time_range;

pub use time_range::TimeRange;
