//! Spatial partitioning.
//!
//! The world is split into a fixed N x N grid of chunks with a precomputed
//! Moore-neighbourhood graph. Chunk membership drives visibility.

mod grid;

pub use grid::{Bounds, ChunkGeometry, WorldGrid};
