use std::time::Duration;

use adviser_core::Event;
use adviser_logging::{adviser_debug, adviser_error, adviser_info, adviser_warn};
use tokio_util::sync::CancellationToken;

use crate::{ConsumerError, Fetcher, Processor};

#[derive(Debug, Clone)]
pub struct ConsumerSettings {
    /// Upper bound on events requested per fetch.
    pub batch_size: usize,
    /// Pause after a failed fetch.
    pub fetch_backoff: Duration,
    /// Pause after a fetch that returned nothing.
    pub idle_interval: Duration,
    /// Leave the loop on fetch errors that retrying cannot fix. Off by default:
    /// the loop stays up and keeps retrying.
    pub stop_on_unrecoverable: bool,
}

impl Default for ConsumerSettings {
    fn default() -> Self {
        Self {
            batch_size: 100,
            fetch_backoff: Duration::from_secs(5),
            idle_interval: Duration::from_secs(1),
            stop_on_unrecoverable: false,
        }
    }
}

/// Poll, batch, process loop over a [`Fetcher`] and a [`Processor`].
///
/// Events of a batch are processed one at a time in fetch order. A failing
/// event is logged and skipped; a failing fetch is logged and retried after
/// `fetch_backoff`. Availability wins over error surfacing, so by default
/// nothing makes the loop return except cancellation.
pub struct EventConsumer<F, P> {
    fetcher: F,
    processor: P,
    settings: ConsumerSettings,
}

impl<F, P> EventConsumer<F, P>
where
    F: Fetcher,
    P: Processor<F::Meta>,
{
    pub fn new(fetcher: F, processor: P, settings: ConsumerSettings) -> Self {
        Self {
            fetcher,
            processor,
            settings,
        }
    }

    /// Runs until an unrecoverable error. With default settings this never returns.
    pub async fn start(&self) -> Result<(), ConsumerError> {
        self.run(CancellationToken::new()).await
    }

    /// Runs until `shutdown` is cancelled. Cancellation is honored during a
    /// fetch, during pauses and between events; an event already handed to the
    /// processor is allowed to finish.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ConsumerError> {
        adviser_info!(
            "consumer started batch_size={} fetch_backoff_ms={} idle_ms={}",
            self.settings.batch_size,
            self.settings.fetch_backoff.as_millis(),
            self.settings.idle_interval.as_millis()
        );

        while !shutdown.is_cancelled() {
            let fetched = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                result = self.fetcher.fetch(self.settings.batch_size) => result,
            };

            let events = match fetched {
                Ok(events) => events,
                Err(err) => {
                    adviser_error!("consumer: {err}");
                    if self.settings.stop_on_unrecoverable && err.is_unrecoverable() {
                        adviser_error!("consumer: giving up on unrecoverable fetch error");
                        return Err(ConsumerError::Fetch(err));
                    }
                    if !pause(&shutdown, self.settings.fetch_backoff).await {
                        break;
                    }
                    continue;
                }
            };

            if events.is_empty() {
                if !pause(&shutdown, self.settings.idle_interval).await {
                    break;
                }
                continue;
            }

            self.handle_batch(events, &shutdown).await;
        }

        adviser_info!("consumer stopped");
        Ok(())
    }

    async fn handle_batch(&self, events: Vec<Event<F::Meta>>, shutdown: &CancellationToken) {
        let total = events.len();
        let mut failed = 0usize;

        for (index, event) in events.into_iter().enumerate() {
            if shutdown.is_cancelled() {
                adviser_warn!(
                    "consumer: shutdown requested, {} of {} events left unprocessed",
                    total - index,
                    total
                );
                return;
            }
            if let Err(err) = self.processor.process(event).await {
                failed += 1;
                adviser_error!("consumer: event {}/{}: {err}", index + 1, total);
            }
        }

        adviser_debug!("consumer: batch done events={} failed={}", total, failed);
    }
}

/// Sleeps for `duration`. Returns false if `shutdown` fired first.
async fn pause(shutdown: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}
