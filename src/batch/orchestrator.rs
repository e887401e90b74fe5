//! The sequential batch run loop.
//!
//! Exactly one item is mid-flight at any time: providers rate-limit
//! aggressively, and keeping the (recognize, transcode) pair atomic per
//! item makes every state transition trivially ordered. All suspension
//! points are `tokio::time::sleep`s and the gateway call itself.
//!
//! ## Checkpoints
//!
//! Cancellation is observed at the top of the per-item loop and inside the
//! pause poll; pause is observed before each dequeue. Neither interrupts
//! the in-flight item — it finishes naturally and records its outcome.

use crate::batch::control::BatchRunContext;
use crate::batch::queue::ItemStatus;
use crate::config::BatchConfig;
use crate::error::{ItemError, Math2AnyError};
use crate::output::{BatchRunReport, OutputBundle};
use crate::pipeline::{encode, input};
use crate::provider::{resolve_gateway, RecognitionGateway};
use crate::transcode::transcode;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Which items a run considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunScope {
    /// Every item; already-completed items are skipped, so re-running a
    /// partially processed queue is idempotent.
    All,
    /// Only items currently `Failed` (the explicit retry action).
    FailedOnly,
}

/// Run the queue against the configured provider.
///
/// Provider resolution happens first; a configuration problem (missing API
/// key, unknown provider) aborts here, before any item is touched.
pub async fn run_batch(
    ctx: &BatchRunContext,
    config: &BatchConfig,
) -> Result<BatchRunReport, Math2AnyError> {
    let gateway = resolve_gateway(config)?;
    Ok(process_queue(ctx, gateway.as_ref(), config, RunScope::All).await)
}

/// Re-run only the failed items, reusing the full retry/backoff/
/// cancellation machinery.
pub async fn retry_failed(
    ctx: &BatchRunContext,
    config: &BatchConfig,
) -> Result<BatchRunReport, Math2AnyError> {
    let gateway = resolve_gateway(config)?;
    Ok(process_queue(ctx, gateway.as_ref(), config, RunScope::FailedOnly).await)
}

/// The run loop proper, generic over the gateway so tests can drive it
/// with a scripted in-memory implementation.
pub async fn process_queue(
    ctx: &BatchRunContext,
    gateway: &dyn RecognitionGateway,
    config: &BatchConfig,
    scope: RunScope,
) -> BatchRunReport {
    let start = Instant::now();
    ctx.control.begin_run();

    let ids = {
        let queue = ctx.queue.lock().unwrap();
        queue.ids(scope == RunScope::FailedOnly)
    };
    let total = ids.len();
    info!("Batch run started: {} item(s), provider '{}'", total, gateway.name());

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total);
    }

    let mut processed_any = false;

    for (index, id) in ids.into_iter().enumerate() {
        if ctx.control.is_cancelled() {
            info!("Cancellation observed; leaving remaining items untouched");
            break;
        }

        // Pause never interrupts an in-flight item; it bites here, at the
        // item boundary. Cancel must win even while paused.
        while ctx.control.is_paused() && !ctx.control.is_cancelled() {
            sleep(config.pause_poll()).await;
        }
        if ctx.control.is_cancelled() {
            info!("Cancellation observed during pause");
            break;
        }

        // Skip items completed by an earlier run, and items the user
        // removed before this run reached them.
        let (source, name) = {
            let queue = ctx.queue.lock().unwrap();
            match queue.get(id) {
                None => continue,
                Some(item) if item.status == ItemStatus::Completed => {
                    debug!("'{}' already completed, skipping", item.name);
                    continue;
                }
                Some(item) => (item.source.clone(), item.name.clone()),
            }
        };

        // Inter-item delay: between processed items, never after the last,
        // skipped on cancellation (checked above).
        if processed_any {
            sleep(config.inter_item_delay()).await;
        }
        processed_any = true;

        if let Some(ref cb) = config.progress_callback {
            cb.on_item_start(index, total, &name);
        }

        {
            let mut queue = ctx.queue.lock().unwrap();
            queue.mark_processing(id);
        }

        match process_item(gateway, config, &source, &name).await {
            Ok((bundle, attempts)) => {
                info!("'{}' completed after {} attempt(s)", name, attempts);
                let mut queue = ctx.queue.lock().unwrap();
                queue.mark_completed(id, bundle, attempts);
                drop(queue);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_item_complete(index, total, &name);
                }
            }
            Err((error, attempts)) => {
                warn!("'{}' failed: {}", name, error);
                let message = error.to_string();
                let mut queue = ctx.queue.lock().unwrap();
                queue.mark_failed(id, error, attempts);
                drop(queue);
                if let Some(ref cb) = config.progress_callback {
                    cb.on_item_error(index, total, &name, &message);
                }
            }
        }
    }

    let progress = ctx.queue.lock().unwrap().progress();
    let report = BatchRunReport {
        total: progress.total,
        completed: progress.completed,
        failed: progress.failed,
        pending: progress.pending,
        cancelled: ctx.control.is_cancelled(),
        duration_ms: start.elapsed().as_millis() as u64,
    };

    ctx.control.end_run();
    info!(
        "Batch run finished: {}/{} completed, {} failed, {}ms",
        report.completed, report.total, report.failed, report.duration_ms
    );
    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(report.total, report.completed, report.failed);
    }

    report
}

/// Process one item: resolve, encode, then recognize with retries.
///
/// Returns the bundle or the terminal item error, either way with the
/// number of recognition attempts consumed.
async fn process_item(
    gateway: &dyn RecognitionGateway,
    config: &BatchConfig,
    source: &str,
    name: &str,
) -> Result<(OutputBundle, u32), (ItemError, u32)> {
    let resolved = input::resolve_input(source, config.download_timeout_secs)
        .await
        .map_err(|e| {
            (
                ItemError::ImageUnreadable {
                    name: name.to_string(),
                    detail: e.to_string(),
                },
                0,
            )
        })?;

    let encoded = encode::encode_image(&resolved.bytes).map_err(|e| {
        (
            ItemError::ImageUnreadable {
                name: name.to_string(),
                detail: e.to_string(),
            },
            0,
        )
    })?;

    let mut last_error: Option<String> = None;

    for attempt in 1..=config.max_retries {
        match gateway.recognize(&encoded).await {
            Ok(expression) => {
                debug!("'{}' recognized: {} chars of LaTeX", name, expression.as_str().len());
                return Ok((transcode(&expression), attempt));
            }
            Err(err) => {
                warn!(
                    "'{}': attempt {}/{} failed — {}",
                    name, attempt, config.max_retries, err
                );

                if err.is_fatal() {
                    return Err((
                        ItemError::RecognitionFailed {
                            name: name.to_string(),
                            attempts: attempt,
                            detail: err.message,
                        },
                        attempt,
                    ));
                }

                if attempt < config.max_retries {
                    let delay = backoff_delay(config, attempt, err.is_rate_limited());
                    debug!("'{}': backing off {}ms", name, delay.as_millis());
                    sleep(delay).await;
                }
                last_error = Some(err.message);
            }
        }
    }

    Err((
        ItemError::RecognitionFailed {
            name: name.to_string(),
            attempts: config.max_retries,
            detail: last_error.unwrap_or_else(|| "unknown error".to_string()),
        },
        config.max_retries,
    ))
}

/// Delay before the next attempt, given the number of failures so far.
///
/// Rate-limited: `min(base · 2^failures, cap)` — the provider needs room
/// that grows until it recovers. Anything else: `base · failures`.
pub(crate) fn backoff_delay(config: &BatchConfig, failures: u32, rate_limited: bool) -> Duration {
    let ms = if rate_limited {
        config
            .retry_backoff_ms
            .saturating_mul(2u64.saturating_pow(failures))
            .min(config.backoff_cap_ms)
    } else {
        config.retry_backoff_ms.saturating_mul(failures as u64)
    };
    Duration::from_millis(ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base_ms: u64) -> BatchConfig {
        BatchConfig::builder()
            .retry_backoff_ms(base_ms)
            .build()
            .unwrap()
    }

    #[test]
    fn rate_limited_backoff_is_exponential() {
        let c = config(1000);
        assert_eq!(backoff_delay(&c, 1, true), Duration::from_millis(2000));
        assert_eq!(backoff_delay(&c, 2, true), Duration::from_millis(4000));
        assert_eq!(backoff_delay(&c, 3, true), Duration::from_millis(8000));
    }

    #[test]
    fn rate_limited_backoff_is_capped() {
        let c = config(1000);
        assert_eq!(backoff_delay(&c, 20, true), Duration::from_millis(30_000));
    }

    #[test]
    fn other_backoff_is_linear() {
        let c = config(1000);
        assert_eq!(backoff_delay(&c, 1, false), Duration::from_millis(1000));
        assert_eq!(backoff_delay(&c, 2, false), Duration::from_millis(2000));
    }

    #[test]
    fn backoff_respects_custom_cap() {
        let c = BatchConfig::builder()
            .retry_backoff_ms(1000)
            .backoff_cap_ms(3000)
            .build()
            .unwrap();
        assert_eq!(backoff_delay(&c, 2, true), Duration::from_millis(3000));
    }
}
