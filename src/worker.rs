use std::{
    fmt,
    future::Future,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock},
    task::{Context, Poll},
    time::Duration,
};

use tokio::{
    sync::{mpsc, oneshot},
    time::{interval_at, Instant, Interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tower::{Service, ServiceExt};
use tracing::{debug, info, trace, warn};
use tracing_futures::Instrument;

use super::{
    config::Settings,
    message::{self, Batch},
};

pub(crate) type SharedSettings = Arc<Mutex<Settings>>;

pub(crate) fn lock_settings(shared: &SharedSettings) -> MutexGuard<'_, Settings> {
    // Settings are plain values, a panic while holding the lock cannot leave them torn.
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tells producers whether the inbox still accepts messages.
///
/// Every send into the inbox happens under the read lock, and sealing takes the write lock. Once
/// `seal` returns, every message that made it into the channel is there to be drained, including
/// those sent with a slot reserved before the seal.
#[derive(Debug, Default)]
pub(crate) struct Gate {
    sealed: RwLock<bool>,
}

impl Gate {
    /// Runs `send` unless the inbox has been sealed.
    pub(crate) fn admit<T>(&self, send: impl FnOnce() -> T) -> Option<T> {
        let sealed = self.sealed.read().unwrap_or_else(PoisonError::into_inner);
        if *sealed {
            None
        } else {
            Some(send())
        }
    }

    fn seal(&self) {
        *self.sealed.write().unwrap_or_else(PoisonError::into_inner) = true;
    }
}

/// Owns the receiving end of the inbox and the service messages are delivered to.
///
/// Every collection cycle runs while holding the lock around the collector, so the periodic cycle,
/// an explicit flush and the final cycle on close never interleave their drains.
pub(crate) struct Collector<S> {
    rx: mpsc::Receiver<String>,
    gate: Arc<Gate>,
    service: S,
    settings: SharedSettings,
}

pub(crate) type SharedCollector<S> = Arc<tokio::sync::Mutex<Collector<S>>>;

/// Task that periodically collects and sends the queued messages. This type should not be used
/// directly, instead `DelayNotifier` requires an executor that can accept this task.
///
/// The worker runs until the notifier is closed or every handle is dropped. It then seals the
/// inbox, sends whatever is still queued and completes.
pub struct Worker {
    inner: Pin<Box<dyn Future<Output = ()> + Send>>,
}

// ===== impl Collector =====

impl<S> Collector<S>
where
    S: Service<String, Response = ()>,
    S::Error: Into<crate::BoxError>,
{
    pub(crate) fn new(
        rx: mpsc::Receiver<String>,
        gate: Arc<Gate>,
        service: S,
        settings: SharedSettings,
    ) -> Self {
        Self {
            rx,
            gate,
            service,
            settings,
        }
    }

    /// Drains the inbox, drops duplicates and sends the result in bounded groups.
    ///
    /// A group that fails is logged and dropped; the remaining groups are still sent.
    pub(crate) async fn run_cycle(&mut self) {
        let batch = Batch::drain(&mut self.rx);
        if batch.is_empty() {
            trace!("inbox empty; nothing to send");
            return;
        }

        let (max_messages, separator, identity) = {
            let settings = lock_settings(&self.settings);
            (
                settings.max_messages,
                settings.separator.clone(),
                settings.identity.clone(),
            )
        };

        debug!(messages = batch.len(), max_messages, "sending collected messages");

        for (group, messages) in batch.groups(max_messages).enumerate() {
            let text = message::payload(messages, &separator, identity.as_deref());
            match self.deliver(text).await {
                Ok(()) => trace!(group, messages = messages.len(), "group delivered"),
                Err(error) => {
                    warn!(group, messages = messages.len(), %error, "send message error")
                }
            }
        }
    }

    /// Closes the inbox. Messages already queued can still be drained.
    pub(crate) fn seal(&mut self) {
        self.gate.seal();
        self.rx.close();
    }

    async fn deliver(&mut self, text: String) -> Result<(), crate::BoxError> {
        let service = self.service.ready().await.map_err(Into::into)?;
        service.call(text).await.map_err(Into::into)
    }
}

// ===== impl Worker =====

impl Worker {
    pub(crate) fn new<S>(
        collector: SharedCollector<S>,
        settings: SharedSettings,
        shutdown: CancellationToken,
        done: oneshot::Sender<()>,
    ) -> Worker
    where
        S: Service<String, Response = ()> + Send + 'static,
        S::Future: Send,
        S::Error: Into<crate::BoxError> + Send + Sync,
    {
        trace!("creating notifier worker");

        let run = async move {
            run(collector, settings, shutdown).await;
            // The handle may be gone already, e.g. when the worker stops because every handle
            // was dropped.
            let _ = done.send(());
        };

        Worker {
            inner: Box::pin(run.instrument(tracing::debug_span!("notifier_worker"))),
        }
    }
}

impl Future for Worker {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}

impl fmt::Debug for Worker {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Worker").finish()
    }
}

fn new_ticker(window: Duration) -> Interval {
    // `Settings::window` is a public field, so it can still be zero here.
    let window = window.max(Settings::MIN_WINDOW);
    // Like a wall-clock ticker the first tick only fires after a full window.
    let mut ticker = interval_at(Instant::now() + window, window);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

async fn run<S>(
    collector: SharedCollector<S>,
    settings: SharedSettings,
    shutdown: CancellationToken,
) where
    S: Service<String, Response = ()>,
    S::Error: Into<crate::BoxError>,
{
    let mut window = lock_settings(&settings).window;
    let mut ticker = new_ticker(window);

    loop {
        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                trace!("shutdown signal received");
                break;
            }
            _ = ticker.tick() => {
                collector.lock().await.run_cycle().await;
            }
        }

        let current = lock_settings(&settings).window;
        if current != window {
            debug!(?current, previous = ?window, "collection window changed");
            window = current;
            ticker = new_ticker(window);
        }
    }

    let mut collector = collector.lock().await;
    // Seal before the last drain so nothing can be accepted that would never be sent.
    collector.seal();
    collector.run_cycle().await;

    info!("notifier worker stopped");
}
