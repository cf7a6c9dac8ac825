use std::net::SocketAddr;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};
use tower::{Service, ServiceExt};

use tower_notify::{
    error, platform, BoxError, HttpTransport, Outbound, Sender, TOKEN_PLACEHOLDER,
};

mod support;

/// What the webhook received.
struct Received {
    head: String,
    body: String,
}

impl Received {
    fn has_header(&self, name: &str, value: &str) -> bool {
        self.head.lines().any(|line| match line.split_once(':') {
            Some((n, v)) => n.eq_ignore_ascii_case(name) && v.trim() == value,
            None => false,
        })
    }
}

/// Accepts a single HTTP request and answers it with `status`.
async fn webhook(status: &'static str) -> (SocketAddr, JoinHandle<Received>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();

        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the end of the headers");
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                break pos + 4;
            }
        };

        let head = String::from_utf8(buf[..head_end].to_vec()).unwrap();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
            .map(|(_, value)| value.trim().parse::<usize>().unwrap())
            .unwrap_or(0);

        while buf.len() < head_end + length {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0, "connection closed before the end of the body");
            buf.extend_from_slice(&chunk[..n]);
        }
        let body = String::from_utf8(buf[head_end..head_end + length].to_vec()).unwrap();

        let response = format!(
            "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
            status
        );
        stream.write_all(response.as_bytes()).await.unwrap();

        Received { head, body }
    });

    (addr, server)
}

#[tokio::test]
async fn posts_json_by_default() -> Result<(), BoxError> {
    let _guard = support::trace_init();

    let (addr, server) = webhook("200 OK").await;
    let mut transport = HttpTransport::new();

    let status = transport
        .ready()
        .await?
        .call(Outbound {
            url: format!("http://{}/hook", addr),
            body: r#"{"text":"hi"}"#.to_owned(),
        })
        .await?;
    assert_eq!(status, 200);

    let received = server.await?;
    assert!(received.head.starts_with("POST /hook HTTP/1.1"), "{}", received.head);
    assert!(received.has_header("content-type", "application/json"), "{}", received.head);
    assert_eq!(received.body, r#"{"text":"hi"}"#);

    Ok(())
}

#[tokio::test]
async fn request_config_replaces_method_and_headers() -> Result<(), BoxError> {
    let _guard = support::trace_init();

    let (addr, server) = webhook("404 Not Found").await;

    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert("x-bot-secret", reqwest::header::HeaderValue::from_static("s3cr3t"));
    let mut transport = HttpTransport::new();
    transport.set_request_config(reqwest::Method::PUT, headers);

    let status = transport
        .ready()
        .await?
        .call(Outbound {
            url: format!("http://{}/hook", addr),
            body: "plain".to_owned(),
        })
        .await?;
    assert_eq!(status, 404);

    let received = server.await?;
    assert!(received.head.starts_with("PUT /hook HTTP/1.1"), "{}", received.head);
    assert!(received.has_header("x-bot-secret", "s3cr3t"), "{}", received.head);
    assert!(!received.has_header("content-type", "application/json"), "{}", received.head);
    assert_eq!(received.body, "plain");

    Ok(())
}

#[tokio::test]
async fn sender_reports_rejected_webhook_call() -> Result<(), BoxError> {
    let _guard = support::trace_init();

    let (addr, server) = webhook("429 Too Many Requests").await;
    let url = format!("http://{}/bot/{}", addr, TOKEN_PLACEHOLDER);
    let mut sender = Sender::new(HttpTransport::new(), url, platform::lark_body, ["abc"]);

    let err = sender
        .ready()
        .await?
        .call("quota exceeded".to_owned())
        .await
        .unwrap_err();
    let err = err
        .downcast_ref::<error::DeliveryError>()
        .expect("should be a DeliveryError");
    assert_eq!(err.status_code(), Some(429));

    let received = server.await?;
    assert!(received.head.starts_with("POST /bot/abc HTTP/1.1"), "{}", received.head);
    let body: serde_json::Value = serde_json::from_str(&received.body)?;
    assert_eq!(body["content"]["text"], "quota exceeded");

    Ok(())
}
