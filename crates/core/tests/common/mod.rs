//! Shared setup for the integration suites

use erosion_sim_core::HeightCell;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`
#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Random but reproducible grid with hills, puddles and some suspended sediment
#[allow(dead_code)]
pub fn random_cells(width: usize, seed: u64) -> Vec<HeightCell> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..width * width)
        .map(|_| HeightCell {
            bedrock: rng.random_range(0.0..4.0),
            water: rng.random_range(0.0..0.5),
            sediment: rng.random_range(0.0..0.05),
            reserved: 0.0,
        })
        .collect()
}
