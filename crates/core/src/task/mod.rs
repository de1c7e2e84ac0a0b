//! Task module
//!
//! This module contains the source-side task model and the source interface.

mod model;
mod source;

pub use model::*;
pub use source::{DeltaCursor, DeltaPage, TaskSource};
