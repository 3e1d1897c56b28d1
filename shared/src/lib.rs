//! Shared building blocks for the camsim workspace.
//!
//! Holds the domain-neutral pieces the simulator is assembled from: noise
//! sampling over `ndarray` grids and deterministic seeding for parallel work.

pub mod algo;
pub mod image_proc;
