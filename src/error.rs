//! Error types

use std::{fmt, sync::Arc};

/// An error produced when a message is offered to a notifier that has been closed.
#[derive(Debug)]
pub struct Sealed {
    _p: (),
}

/// An error produced when the notifier's worker stopped before it could finish the final flush,
/// e.g. because it panicked or was dropped without being spawned.
#[derive(Debug)]
pub struct Closed {
    _p: (),
}

/// An error produced by [`try_enqueue`](crate::DelayNotifier::try_enqueue) when the inbox has no
/// free slot left.
#[derive(Debug)]
pub struct Full {
    _p: (),
}

/// An error produced when a message is sent but no webhook token has been registered.
#[derive(Debug)]
pub struct NoEndpoint {
    _p: (),
}

/// An error produced when the webhook did not accept a message.
///
/// Either the transport failed to complete the request, in which case the underlying error is
/// available through [`source`](std::error::Error::source), or the webhook answered with a
/// non-success status.
#[derive(Debug, Clone)]
pub struct DeliveryError {
    status: Option<u16>,
    inner: Option<Arc<crate::BoxError>>,
}

// ===== impl Sealed =====

impl Sealed {
    pub(crate) fn new() -> Self {
        Sealed { _p: () }
    }
}

impl fmt::Display for Sealed {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("notifier closed; no more messages are accepted")
    }
}

impl std::error::Error for Sealed {}

// ===== impl Closed =====

impl Closed {
    pub(crate) fn new() -> Self {
        Closed { _p: () }
    }
}

impl fmt::Display for Closed {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("notifier's worker closed unexpectedly")
    }
}

impl std::error::Error for Closed {}

// ===== impl Full =====

impl Full {
    pub(crate) fn new() -> Self {
        Full { _p: () }
    }
}

impl fmt::Display for Full {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("notifier inbox is full")
    }
}

impl std::error::Error for Full {}

// ===== impl NoEndpoint =====

impl NoEndpoint {
    pub(crate) fn new() -> Self {
        NoEndpoint { _p: () }
    }
}

impl fmt::Display for NoEndpoint {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt.write_str("no webhook url")
    }
}

impl std::error::Error for NoEndpoint {}

// ===== impl DeliveryError =====

impl DeliveryError {
    pub(crate) fn status(status: u16) -> Self {
        DeliveryError {
            status: Some(status),
            inner: None,
        }
    }

    pub(crate) fn transport(error: crate::BoxError) -> Self {
        DeliveryError {
            status: None,
            inner: Some(Arc::new(error)),
        }
    }

    /// The status code returned by the webhook, if the request completed.
    pub fn status_code(&self) -> Option<u16> {
        self.status
    }
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, &self.inner) {
            (Some(status), _) => write!(fmt, "failed to send message, status code: {}", status),
            (None, Some(inner)) => write!(fmt, "send request error: {}", inner),
            (None, None) => fmt.write_str("send request error"),
        }
    }
}

impl std::error::Error for DeliveryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner
            .as_ref()
            .map(|e| &***e as &(dyn std::error::Error + 'static))
    }
}
