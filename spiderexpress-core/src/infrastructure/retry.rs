// spiderexpress-core/src/infrastructure/retry.rs
//
// Bounded exponential backoff for TransientIOError/StoreError (§7): base
// 500ms, factor 2, jitter +/-25%, capped at 3 attempts.

use rand::Rng;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const BASE_DELAY_MS: u64 = 500;
const FACTOR: u64 = 2;
const JITTER_RATIO: f64 = 0.25;

pub fn backoff_delay(attempt: u32, rng: &mut impl Rng) -> Duration {
    let base = BASE_DELAY_MS.saturating_mul(FACTOR.saturating_pow(attempt));
    let jitter_span = (base as f64 * JITTER_RATIO) as i64;
    let jitter = rng.random_range(-jitter_span..=jitter_span);
    let millis = (base as i64 + jitter).max(0) as u64;
    Duration::from_millis(millis)
}

/// Retries `op` up to `DEFAULT_MAX_ATTEMPTS` times, sleeping a jittered
/// exponential backoff between attempts. Returns the last error once the
/// budget is exhausted.
pub async fn with_retry<T, E, F, Fut>(
    label: &str,
    rng: &mut impl Rng,
    mut op: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if attempt + 1 < DEFAULT_MAX_ATTEMPTS => {
                let delay = backoff_delay(attempt, rng);
                warn!(%label, attempt, %err, delay_ms = delay.as_millis() as u64, "transient failure, retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}
