use std::{
    fmt, future,
    sync::{Arc, Mutex},
    task::{Context, Poll},
    time::Duration,
};

use futures_core::ready;
use tokio::sync::{
    mpsc::{self, error::TrySendError},
    oneshot,
};
use tokio_util::sync::{CancellationToken, PollSender};
use tower::Service;

use super::{
    config::Settings,
    error::{Closed, Full, Sealed},
    worker::{lock_settings, Collector, Gate, SharedCollector, SharedSettings, Worker},
};

/// Collects messages over a fixed window and forwards them in deduplicated groups.
///
/// Producers hand messages to the notifier with [`enqueue`](Self::enqueue) from any number of
/// tasks; the handle is cheap to clone and all clones share one inbox. A background [`Worker`]
/// wakes up once per collection window, drains whatever is queued, removes duplicates and calls
/// the wrapped service once per group of at most `max_messages` messages.
///
/// Call [`close`](Self::close) to stop the notifier: it waits for the worker to send everything
/// that is still queued. Dropping the last handle has the same effect, without the waiting.
///
/// See the module documentation for more details.
pub struct DelayNotifier<S> {
    tx: mpsc::Sender<String>,
    // Used by the `Service` implementation, which has to reserve inbox capacity in `poll_ready`.
    poll_tx: PollSender<String>,
    shared: Arc<Shared<S>>,
}

struct Shared<S> {
    settings: SharedSettings,
    gate: Arc<Gate>,
    collector: SharedCollector<S>,
    shutdown: CancellationToken,
    // Completed by the worker after the final cycle. Taken by the first `close`.
    done: Mutex<Option<oneshot::Receiver<()>>>,
}

impl<S> DelayNotifier<S>
where
    S: Service<String, Response = ()> + Send + 'static,
    S::Future: Send,
    S::Error: Into<crate::BoxError> + Send + Sync,
{
    /// Creates a new `DelayNotifier` wrapping `service`.
    ///
    /// The default Tokio executor is used to run the worker, which means that this method must be
    /// called while on the Tokio runtime.
    pub fn new(service: S, settings: Settings) -> Self {
        let (notifier, worker) = Self::pair(service, settings);
        tokio::spawn(worker);
        notifier
    }

    /// Creates a new `DelayNotifier` wrapping `service`, but returns the background worker.
    ///
    /// This is useful if you do not want to spawn directly onto the `tokio` runtime but instead
    /// want to use your own executor. Nothing is sent until the worker is polled, and
    /// [`close`](Self::close) only returns once the worker has completed.
    pub fn pair(service: S, settings: Settings) -> (Self, Worker) {
        let (tx, rx) = mpsc::channel(settings.capacity.max(1));
        let (done_tx, done_rx) = oneshot::channel();
        let shutdown = CancellationToken::new();
        let settings = Arc::new(Mutex::new(settings));
        let gate = Arc::new(Gate::default());
        let collector = Arc::new(tokio::sync::Mutex::new(Collector::new(
            rx,
            gate.clone(),
            service,
            settings.clone(),
        )));

        let worker = Worker::new(collector.clone(), settings.clone(), shutdown.clone(), done_tx);

        let notifier = Self {
            poll_tx: PollSender::new(tx.clone()),
            tx,
            shared: Arc::new(Shared {
                settings,
                gate,
                collector,
                shutdown,
                done: Mutex::new(Some(done_rx)),
            }),
        };
        (notifier, worker)
    }

    /// Runs a collection cycle right away instead of waiting for the next tick.
    pub async fn flush(&self) {
        self.shared.collector.lock().await.run_cycle().await;
    }

    /// Stops the notifier.
    ///
    /// The inbox is sealed, the messages still queued are sent, and only then does this return.
    /// There is no deadline: if a delivery hangs, so does `close`. Only the first call does any
    /// work; later calls fail with [`Sealed`].
    pub async fn close(&self) -> Result<(), crate::BoxError> {
        let done = self
            .shared
            .done
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
            .ok_or_else(Sealed::new)?;

        tracing::debug!("closing notifier; waiting for the final flush");
        self.shared.shutdown.cancel();

        if done.await.is_err() {
            // The worker never ran its final cycle. Seal the inbox ourselves so that producers
            // don't keep queueing messages nobody will send.
            self.shared.collector.lock().await.seal();
            return Err(Closed::new().into());
        }

        Ok(())
    }
}

impl<S> DelayNotifier<S> {
    /// Queues a message, waiting for a free slot if the inbox is full.
    ///
    /// Fails with [`Sealed`] once the notifier has been closed.
    pub async fn enqueue(&self, text: impl Into<String>) -> Result<(), crate::BoxError> {
        let text = text.into();
        let permit = self.tx.reserve().await.map_err(|_| Sealed::new())?;
        self.shared
            .gate
            .admit(|| permit.send(text))
            .ok_or_else(Sealed::new)?;
        Ok(())
    }

    /// Queues a message if the inbox has room for it.
    ///
    /// Fails with [`Full`] when the inbox is at capacity and with [`Sealed`] once the notifier has
    /// been closed.
    pub fn try_enqueue(&self, text: impl Into<String>) -> Result<(), crate::BoxError> {
        let permit = match self.tx.try_reserve() {
            Ok(permit) => permit,
            Err(TrySendError::Full(())) => return Err(Full::new().into()),
            Err(TrySendError::Closed(())) => return Err(Sealed::new().into()),
        };
        let text = text.into();
        self.shared
            .gate
            .admit(|| permit.send(text))
            .ok_or_else(Sealed::new)?;
        Ok(())
    }

    /// Sets the interval between collection cycles. Takes effect after the next cycle.
    ///
    /// Windows shorter than [`Settings::MIN_WINDOW`] are raised to it.
    pub fn set_window(&self, window: Duration) {
        lock_settings(&self.shared.settings).window = window.max(Settings::MIN_WINDOW);
    }

    /// Sets the maximum number of messages per outbound call; `0` disables the limit.
    pub fn set_max_messages(&self, max_messages: usize) {
        lock_settings(&self.shared.settings).max_messages = max_messages;
    }

    pub fn set_separator(&self, separator: impl Into<String>) {
        lock_settings(&self.shared.settings).separator = separator.into();
    }

    /// Sets the tag prepended to every outbound call. An empty identity removes the tag.
    pub fn set_identity(&self, identity: impl Into<String>) {
        let identity = identity.into();
        lock_settings(&self.shared.settings).identity = Some(identity).filter(|i| !i.is_empty());
    }

    /// A snapshot of the current settings.
    pub fn settings(&self) -> Settings {
        lock_settings(&self.shared.settings).clone()
    }
}

impl<S> Service<String> for DelayNotifier<S> {
    type Response = ();
    type Error = crate::BoxError;
    type Future = future::Ready<Result<(), crate::BoxError>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Waits for a free inbox slot, just like `enqueue`.
        match ready!(self.poll_tx.poll_reserve(cx)) {
            Ok(()) => Poll::Ready(Ok(())),
            Err(_) => Poll::Ready(Err(Sealed::new().into())),
        }
    }

    fn call(&mut self, text: String) -> Self::Future {
        tracing::trace!("queueing message");

        // A slot reserved before the notifier was closed must not be used after the final drain.
        let poll_tx = &mut self.poll_tx;
        let admitted = self.shared.gate.admit(|| poll_tx.send_item(text));
        let result: Result<(), crate::BoxError> = match admitted {
            Some(Ok(())) => Ok(()),
            Some(Err(_)) => Err(Sealed::new().into()),
            None => {
                self.poll_tx.abort_send();
                Err(Sealed::new().into())
            }
        };
        future::ready(result)
    }
}

impl<S> Clone for DelayNotifier<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            // The new clone hasn't reserved a slot yet. It will when it's next polled ready.
            poll_tx: PollSender::new(self.tx.clone()),
            shared: self.shared.clone(),
        }
    }
}

impl<S> fmt::Debug for DelayNotifier<S> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DelayNotifier")
            .field("settings", &self.settings())
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S> Drop for Shared<S> {
    fn drop(&mut self) {
        // Last handle gone: let the worker send what is left and stop.
        self.shutdown.cancel();
    }
}
