//! Future types

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures_core::ready;
use pin_project_lite::pin_project;

use crate::error::DeliveryError;

pin_project! {
    /// Future that completes when the webhook has answered a [`Sender`](crate::Sender) call.
    #[derive(Debug)]
    pub struct ResponseFuture<T> {
        #[pin]
        state: ResponseState<T>,
    }
}

pin_project! {
    #[project = ResponseStateProj]
    #[derive(Debug)]
    enum ResponseState<T> {
        Failed {
            error: Option<crate::BoxError>,
        },
        Called {
            #[pin]
            fut: T,
        },
    }
}

impl<T> ResponseFuture<T> {
    pub(crate) fn new(fut: T) -> Self {
        ResponseFuture {
            state: ResponseState::Called { fut },
        }
    }

    pub(crate) fn failed(err: crate::BoxError) -> Self {
        ResponseFuture {
            state: ResponseState::Failed { error: Some(err) },
        }
    }
}

impl<F, E> Future for ResponseFuture<F>
where
    F: Future<Output = Result<u16, E>>,
    E: Into<crate::BoxError>,
{
    type Output = Result<(), crate::BoxError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.project().state.project() {
            ResponseStateProj::Failed { error } => {
                Poll::Ready(Err(error.take().expect("polled after error")))
            }
            ResponseStateProj::Called { fut } => match ready!(fut.poll(cx)) {
                Ok(status) if (200..300).contains(&status) => Poll::Ready(Ok(())),
                Ok(status) => Poll::Ready(Err(DeliveryError::status(status).into())),
                Err(e) => Poll::Ready(Err(DeliveryError::transport(e.into()).into())),
            },
        }
    }
}
