//! Core data models for hero statistics.

mod graph;
mod hero;
mod ids;
mod tier;

pub use graph::*;
pub use hero::*;
pub use ids::*;
pub use tier::*;
