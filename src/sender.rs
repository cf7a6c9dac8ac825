use std::{
    fmt,
    sync::Arc,
    task::{Context, Poll},
};

use tower::Service;

use super::{error::NoEndpoint, future::ResponseFuture, selector::EndpointSelector};

/// Placeholder replaced by the selected token in a webhook URL format.
pub const TOKEN_PLACEHOLDER: &str = "{token}";

/// Renders the text of a message into the request body expected by a webhook.
pub type BodyTemplate = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A single rendered webhook call, handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub url: String,
    pub body: String,
}

/// Sends every message straight away as one webhook call.
///
/// Each call picks the next token from the [`EndpointSelector`], renders the webhook URL and the
/// request body, and hands the resulting [`Outbound`] to the transport service, which answers with
/// the HTTP status code. Every `2xx` status counts as delivered, so a bot answering `204 No
/// Content` is treated like one answering `200 OK`; anything else is reported as a
/// [`DeliveryError`](crate::error::DeliveryError). There are no retries.
pub struct Sender<T> {
    transport: T,
    url_format: String,
    body: BodyTemplate,
    selector: Arc<EndpointSelector>,
    identity: Option<String>,
}

impl<T> Sender<T> {
    /// Creates a new `Sender`.
    ///
    /// `url_format` must contain [`TOKEN_PLACEHOLDER`], which is substituted with one of `tokens`
    /// on every call.
    pub fn new<F, I, S>(transport: T, url_format: impl Into<String>, body: F, tokens: I) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            transport,
            url_format: url_format.into(),
            body: Arc::new(body),
            selector: Arc::new(EndpointSelector::new(tokens)),
            identity: None,
        }
    }

    /// Tags every message as `[identity] message`.
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.set_identity(identity);
        self
    }

    pub fn set_identity(&mut self, identity: impl Into<String>) {
        let identity = identity.into();
        self.identity = if identity.is_empty() {
            None
        } else {
            Some(identity)
        };
    }

    /// Returns a reference to the transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Returns a mutable reference to the transport, e.g. to change its request settings.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn render(&self, token: &str, text: String) -> Outbound {
        let text = match &self.identity {
            Some(identity) => format!("[{}] {}", identity, text),
            None => text,
        };

        Outbound {
            url: self.url_format.replace(TOKEN_PLACEHOLDER, token),
            body: (self.body)(&text),
        }
    }
}

impl<T> Service<String> for Sender<T>
where
    T: Service<Outbound, Response = u16>,
    T::Error: Into<crate::BoxError>,
{
    type Response = ();
    type Error = crate::BoxError;
    type Future = ResponseFuture<T::Future>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.transport.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, text: String) -> Self::Future {
        let outbound = match self.selector.next() {
            Some(token) => self.render(token, text),
            None => return ResponseFuture::failed(NoEndpoint::new().into()),
        };

        tracing::trace!(body.len = outbound.body.len(), "sending webhook request");

        ResponseFuture::new(self.transport.call(outbound))
    }
}

impl<T: Clone> Clone for Sender<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            url_format: self.url_format.clone(),
            body: self.body.clone(),
            // Clones keep rotating over the same cursor.
            selector: self.selector.clone(),
            identity: self.identity.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Sender<T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Sender")
            .field("transport", &self.transport)
            .field("selector", &self.selector)
            .field("identity", &self.identity)
            .finish()
    }
}
