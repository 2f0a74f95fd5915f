//! Grid matching and marking

pub mod engine;
pub mod row;

pub use engine::MarkingEngine;
pub use row::{ColumnPolicy, GridRowSample};
