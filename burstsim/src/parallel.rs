//! Independent seeded tasks, run serially or on the rayon pool.
//!
//! Every task gets its own `StdRng` derived from a base seed and its index,
//! so results do not depend on scheduling. A task that errors or panics is
//! reported as a [`TaskFailure`] and does not disturb the others.

use std::panic::{self, AssertUnwindSafe};

use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use thiserror::Error;

use crate::error::SimError;

/// Why a task produced no result.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error(transparent)]
    Failed(#[from] SimError),

    #[error("task panicked: {0}")]
    Panicked(String),
}

/// Seed for task `index` of a run seeded with `seed` (splitmix64 finalizer).
///
/// Neighbouring base seeds give unrelated streams.
pub fn task_seed(seed: u64, index: usize) -> u64 {
    let mut z = seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn run_task<T, U, F>(f: &F, index: usize, item: &T, seed: u64) -> Result<U, TaskFailure>
where
    F: Fn(usize, &T, &mut StdRng) -> Result<U, SimError>,
{
    let mut rng = StdRng::seed_from_u64(task_seed(seed, index));
    match panic::catch_unwind(AssertUnwindSafe(|| f(index, item, &mut rng))) {
        Ok(result) => result.map_err(TaskFailure::from),
        Err(payload) => Err(TaskFailure::Panicked(panic_message(payload))),
    }
}

/// Map `f` over `items`, one seeded RNG per item. Output order matches input.
pub fn map_seeded<T, U, F>(items: &[T], seed: u64, serial: bool, f: F) -> Vec<Result<U, TaskFailure>>
where
    T: Sync,
    U: Send,
    F: Fn(usize, &T, &mut StdRng) -> Result<U, SimError> + Sync,
{
    if serial {
        items
            .iter()
            .enumerate()
            .map(|(i, item)| run_task(&f, i, item, seed))
            .collect()
    } else {
        items
            .par_iter()
            .enumerate()
            .map(|(i, item)| run_task(&f, i, item, seed))
            .collect()
    }
}
