use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use reqwest::{
    header::{HeaderMap, HeaderValue, CONTENT_TYPE},
    Client, Method,
};
use tower::Service;

use super::sender::Outbound;

/// Transport that performs [`Outbound`] calls over HTTP with `reqwest`.
///
/// Answers with the status code of the response; the body is discarded.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    method: Method,
    headers: HeaderMap,
}

impl HttpTransport {
    /// Creates a transport that POSTs JSON bodies with a default `reqwest` client.
    pub fn new() -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        Self {
            client: Client::new(),
            method: Method::POST,
            headers,
        }
    }

    /// Replaces the HTTP client.
    pub fn set_client(&mut self, client: Client) {
        self.client = client;
    }

    /// Replaces the request method and headers.
    pub fn set_request_config(&mut self, method: Method, headers: HeaderMap) {
        self.method = method;
        self.headers = headers;
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Outbound> for HttpTransport {
    type Response = u16;
    type Error = reqwest::Error;
    type Future = Pin<Box<dyn Future<Output = Result<u16, reqwest::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Outbound) -> Self::Future {
        let request = self
            .client
            .request(self.method.clone(), req.url)
            .headers(self.headers.clone())
            .body(req.body);

        Box::pin(async move {
            let response = request.send().await?;
            Ok(response.status().as_u16())
        })
    }
}
