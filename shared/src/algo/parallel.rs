//! Parallel processing utilities with deterministic seeding
//!
//! Work items are processed on the rayon pool, but every item draws from its
//! own generator seeded from a base seed plus the item's index. The output of
//! a parallel run is therefore identical to a sequential run with the same
//! base seed, regardless of how rayon schedules the items.

use log::debug;
use rand::SeedableRng;
use rayon::prelude::*;

/// Derive the seed for work item `index` from a run-wide base seed.
pub fn derive_seed(base_seed: u64, index: usize) -> u64 {
    base_seed.wrapping_add(index as u64)
}

/// Map `f` over `items` in parallel, handing each call a freshly seeded RNG.
///
/// # Arguments
/// * `items` - Work items, processed in parallel
/// * `base_seed` - Base seed; item `i` receives an RNG seeded with `derive_seed(base_seed, i)`
/// * `f` - Closure receiving the item index, the item and its private RNG
///
/// # Returns
/// Results in the same order as `items`
pub fn par_map_seeded<T, U, R, F>(items: &[T], base_seed: u64, f: F) -> Vec<U>
where
    T: Sync,
    U: Send,
    R: SeedableRng,
    F: Fn(usize, &T, &mut R) -> U + Send + Sync,
{
    debug!("Mapping {} items from base seed {}", items.len(), base_seed);
    items
        .par_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut rng = R::seed_from_u64(derive_seed(base_seed, index));
            f(index, item, &mut rng)
        })
        .collect()
}

/// Fallible variant of [`par_map_seeded`] that stops at the first error.
///
/// Items already in flight on other threads may still complete, but no new
/// items are started once an error has been observed. Which error is returned
/// when several items fail concurrently is unspecified.
pub fn try_par_map_seeded<T, U, E, R, F>(items: &[T], base_seed: u64, f: F) -> Result<Vec<U>, E>
where
    T: Sync,
    U: Send,
    E: Send,
    R: SeedableRng,
    F: Fn(usize, &T, &mut R) -> Result<U, E> + Send + Sync,
{
    debug!("Mapping {} fallible items from base seed {}", items.len(), base_seed);
    items
        .par_iter()
        .enumerate()
        .map(|(index, item)| {
            let mut rng = R::seed_from_u64(derive_seed(base_seed, index));
            f(index, item, &mut rng)
        })
        .collect()
}
