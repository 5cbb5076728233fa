// spiderexpress-core/src/domain/rng.rs
//
// A single seeded RNG threads through every strategy invocation so that
// two runs with the same seed and connector responses produce
// bit-identical sampled output (§4.4.bis, Testable Property 5).

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Derives a fresh seed from OS entropy, for first-run bootstrap when the
/// project config does not pin `random_seed`. The derived value is
/// persisted into `AppState.random_seed` so subsequent resumes are
/// deterministic relative to each other.
pub fn derive_os_seed() -> u64 {
    rand::rng().next_u64()
}

/// Derives a per-(iteration, layer) sub-seed from the master seed, for
/// the concurrently-dispatched connector calls in the `gathering` phase
/// (§5.bis). Layers run in an arbitrary, possibly parallel order, so
/// their RNG draws (retry jitter, `random_wait`) cannot share one
/// mutable `StdRng`; deriving instead of drawing keeps each layer's
/// stream reproducible independent of dispatch order.
pub fn derive_layer_seed(master_seed: u64, iteration: u64, layer: &str) -> u64 {
    derive_phase_seed(master_seed, iteration, layer, b"gather")
}

/// Derives a per-(iteration, layer) sub-seed for the `sampling` phase,
/// the same way `derive_layer_seed` does for `gathering`. A resumed run
/// only knows `AppState.iteration`, not how many sampling draws an
/// earlier, interrupted run already made, so the sampling strategies
/// (`random`, `spikyball`) cannot share one long-lived `StdRng` across
/// the whole crawl either — each call re-derives from scratch (§4.4.bis,
/// Testable Property 5). The `sample` tag keeps this stream independent
/// of `derive_layer_seed`'s for the same `(iteration, layer)` pair.
pub fn derive_sampling_seed(master_seed: u64, iteration: u64, layer: &str) -> u64 {
    derive_phase_seed(master_seed, iteration, layer, b"sample")
}

fn derive_phase_seed(master_seed: u64, iteration: u64, layer: &str, phase: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325 ^ master_seed;
    for byte in phase
        .iter()
        .copied()
        .chain(iteration.to_le_bytes())
        .chain(layer.as_bytes().iter().copied())
    {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
