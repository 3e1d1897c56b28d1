//! Algorithms shared across simulation crates

pub mod parallel;

pub use parallel::{derive_seed, par_map_seeded, try_par_map_seeded};
