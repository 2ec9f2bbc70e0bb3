//! Request and response bodies of the backend API.

use serde::{Deserialize, Serialize};

/// A Telegram dialog known to the backend, as listed by `GET /chats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatInfo {
    pub name: String,
    /// Missing for dialogs whose entity has no numeric id.
    pub id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
    /// Entity kind, e.g. `Channel`, `User`, `Chat`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Messages already scraped into the backend store.
    #[serde(default)]
    pub message_count: u64,
}

/// Outcome of `POST /chats/{id}/scrape`.
///
/// The backend reports scrape failures in-band with a 200 status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeReport {
    pub status: ScrapeStatus,
    pub messages_saved: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ScrapeReport {
    pub fn is_success(&self) -> bool {
        self.status == ScrapeStatus::Success
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeStatus {
    Success,
    Error,
}

/// Body of `POST /chat`.
#[derive(Debug, Serialize)]
pub(crate) struct ChatQuery<'a> {
    pub query: &'a str,
}

/// Body of `POST /chats/{id}/send`.
#[derive(Debug, Serialize)]
pub(crate) struct SendMessage<'a> {
    pub text: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_info_from_backend_json() {
        let json = r#"{"name":"OpenIPC FPV users","id":1234567890,"username":null,"type":"Channel","message_count":42}"#;
        let chat: ChatInfo = serde_json::from_str(json).unwrap();
        assert_eq!(chat.name, "OpenIPC FPV users");
        assert_eq!(chat.id, Some(1_234_567_890));
        assert!(chat.username.is_none());
        assert_eq!(chat.kind, "Channel");
        assert_eq!(chat.message_count, 42);
    }

    #[test]
    fn test_chat_info_missing_optional_fields() {
        let json = r#"{"name":"Saved Messages","id":null,"type":"User"}"#;
        let chat: ChatInfo = serde_json::from_str(json).unwrap();
        assert_eq!(chat.id, None);
        assert_eq!(chat.message_count, 0);
    }

    #[test]
    fn test_scrape_report_error_variant() {
        let json = r#"{"status":"error","messages_saved":0,"detail":"Channel with id 5 not found in dialogs"}"#;
        let report: ScrapeReport = serde_json::from_str(json).unwrap();
        assert!(!report.is_success());
        assert_eq!(
            report.detail.as_deref(),
            Some("Channel with id 5 not found in dialogs")
        );
    }

    #[test]
    fn test_request_bodies_serialize() {
        let query = serde_json::to_value(ChatQuery { query: "hello" }).unwrap();
        assert_eq!(query, serde_json::json!({ "query": "hello" }));

        let send = serde_json::to_value(SendMessage { text: "hi" }).unwrap();
        assert_eq!(send, serde_json::json!({ "text": "hi" }));
    }
}
