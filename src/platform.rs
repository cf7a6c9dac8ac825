//! Ready-made senders for chat platforms that accept text through bot webhooks.
//!
//! Every constructor accepts one or more tokens; calls rotate over them so a busy application does
//! not hit the rate limit of a single bot.

use serde_json::json;

use super::{http::HttpTransport, sender::Sender};

/// Webhook of a Lark (Feishu international) custom bot.
pub const LARK_WEBHOOK: &str = "https://open.larksuite.com/open-apis/bot/v2/hook/{token}";

/// Webhook of a WeCom (qyweixin) group bot.
pub const WECOM_WEBHOOK: &str = "https://qyapi.weixin.qq.com/cgi-bin/webhook/send?key={token}";

/// Creates a sender for Lark custom bots.
pub fn lark<I, S>(tokens: I) -> Sender<HttpTransport>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Sender::new(HttpTransport::new(), LARK_WEBHOOK, lark_body, tokens)
}

/// Creates a sender for WeCom group bots.
pub fn wecom<I, S>(keys: I) -> Sender<HttpTransport>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Sender::new(HttpTransport::new(), WECOM_WEBHOOK, wecom_body, keys)
}

pub fn lark_body(text: &str) -> String {
    json!({ "msg_type": "text", "content": { "text": text } }).to_string()
}

pub fn wecom_body(text: &str) -> String {
    json!({ "msgtype": "text", "text": { "content": text } }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bodies_escape_message_text() {
        let body: serde_json::Value =
            serde_json::from_str(&lark_body("a \"b\"\n===\nc")).unwrap();
        assert_eq!(body["msg_type"], "text");
        assert_eq!(body["content"]["text"], "a \"b\"\n===\nc");

        let body: serde_json::Value = serde_json::from_str(&wecom_body("boom")).unwrap();
        assert_eq!(body["msgtype"], "text");
        assert_eq!(body["text"]["content"], "boom");
    }
}
