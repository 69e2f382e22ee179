//! Spatial partitioning data structures
//!
//! Provides spatial indexing for collision queries and ground raycasts.

mod grid;
mod spatial_query;

pub use grid::{CellCoord, SpatialGrid};
pub use spatial_query::SpatialQuery;
