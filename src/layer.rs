use std::fmt;

use tower::{layer::Layer, Service};

use super::{config::Settings, service::DelayNotifier};

/// Adds a layer collecting messages into delayed, deduplicated groups.
///
/// The default Tokio executor is used to run the worker, which means that this layer can only be
/// used on the Tokio runtime.
///
/// See the module documentation for more details.
#[derive(Clone)]
pub struct DelayLayer {
    settings: Settings,
}

impl DelayLayer {
    /// Creates a new [`DelayLayer`].
    ///
    /// Every service wrapped by this layer gets its own inbox and worker, configured by `settings`.
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl Default for DelayLayer {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl<S> Layer<S> for DelayLayer
where
    S: Service<String, Response = ()> + Send + 'static,
    S::Future: Send,
    S::Error: Into<crate::BoxError> + Send + Sync,
{
    type Service = DelayNotifier<S>;

    fn layer(&self, service: S) -> Self::Service {
        DelayNotifier::new(service, self.settings.clone())
    }
}

impl fmt::Debug for DelayLayer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("DelayLayer")
            .field("window", &self.settings.window)
            .field("max_messages", &self.settings.max_messages)
            .finish()
    }
}
