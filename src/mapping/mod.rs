//! Single-day map construction.
//!
//! The pipeline for one day is: [`aggregate`] trip rows per origin province,
//! [`detect`] which geometry column holds province names, then
//! [`assemble`] the join and pick a [`color`] per feature.
//! [`pipeline::MapContext`] wires the steps to the configured datasets.

pub mod aggregate;
pub mod assemble;
pub mod color;
pub mod detect;
pub mod pipeline;
pub mod types;

pub use assemble::{MapRequest, Palette, assemble_map};
pub use color::{ColorRamp, Rgb, fill_color, relative_fill_color};
pub use detect::{Detection, DetectionMethod, detect_province_field};
pub use pipeline::MapContext;
pub use types::{ColoredMap, DayAggregate, FeatureFill, KeyedValues, MapKind, MapView, RateTable};
