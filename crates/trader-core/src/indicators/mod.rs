//! 지표 계산.

pub mod volume_profile;

pub use volume_profile::{deterministic_levels, extremes_levels, value_area, value_area_with};
