// Transport module: the `Transport` trait the rest of the crate talks to,
// and `ApiClient`, a small blocking client for the Telegram Bot HTTP API.
// Everything here is synchronous; one request is in flight at a time.

use reqwest::blocking::{multipart, Client};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::fs::File;
use std::time::Duration;

use crate::config::TRANSPORT_TIMEOUT;
use crate::error::{TransportError, UploaderError, UploaderResult};

pub const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Token value shipped in sample configs; treated like a missing token.
pub const PLACEHOLDER_TOKEN: &str = "YOUR_BOT_TOKEN_HERE";

/// Slowest upload rate still waited for. File sends get
/// `TRANSPORT_TIMEOUT` plus the time this rate needs for the file.
const MIN_UPLOAD_BYTES_PER_SEC: u64 = 256 * 1024;

/// Where a file is sent: a numeric chat id or an `@channel` handle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ChatId {
    Id(i64),
    Handle(String),
}

impl fmt::Display for ChatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatId::Id(id) => write!(f, "{id}"),
            ChatId::Handle(handle) => f.write_str(handle),
        }
    }
}

/// The bot account itself (`getMe`).
#[derive(Debug, Clone, Deserialize)]
pub struct BotIdentity {
    pub id: i64,
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
    #[serde(other)]
    Unknown,
}

/// A chat seen in the bot's recent activity.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRef {
    pub id: i64,
    #[serde(rename = "type")]
    pub kind: ChatKind,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    #[serde(other)]
    Unknown,
}

impl MemberStatus {
    /// Owners and administrators may post files.
    pub fn is_admin(self) -> bool {
        matches!(self, MemberStatus::Creator | MemberStatus::Administrator)
    }
}

/// The message created by a successful send.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub message_id: i64,
}

/// An opened file ready to be streamed to the transport.
#[derive(Debug)]
pub struct FileUpload {
    pub file_name: String,
    pub size: u64,
    pub file: File,
}

/// Operations the uploader needs from a messaging backend.
pub trait Transport {
    fn identity(&self) -> Result<BotIdentity, TransportError>;

    /// Chats referenced by the bot's recent updates, in update order.
    fn recent_chats(&self) -> Result<Vec<ChatRef>, TransportError>;

    fn membership_status(&self, chat_id: i64, user_id: i64)
        -> Result<MemberStatus, TransportError>;

    fn send_video(
        &self,
        destination: &ChatId,
        upload: FileUpload,
        caption: &str,
    ) -> Result<MessageRef, TransportError>;

    fn send_document(
        &self,
        destination: &ChatId,
        upload: FileUpload,
        caption: &str,
    ) -> Result<MessageRef, TransportError>;
}

/// Envelope of every Bot API response.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<i64>,
}

impl<T> ApiResponse<T> {
    fn into_result(self) -> Result<T, TransportError> {
        if !self.ok {
            return Err(TransportError::Api {
                code: self.error_code.unwrap_or_default(),
                description: self.description.unwrap_or_else(|| "no description".into()),
            });
        }
        self.result.ok_or(TransportError::MissingResult)
    }
}

#[derive(Debug, Deserialize)]
struct Update {
    #[serde(default)]
    message: Option<ChatHolder>,
    #[serde(default)]
    channel_post: Option<ChatHolder>,
}

#[derive(Debug, Deserialize)]
struct ChatHolder {
    chat: ChatRef,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: MemberStatus,
}

/// Reject an empty or placeholder bot token before anything else runs.
pub fn validate_token(token: &str) -> UploaderResult<&str> {
    let token = token.trim();
    if token.is_empty() || token == PLACEHOLDER_TOKEN {
        return Err(UploaderError::Credential(
            "bot token is missing; pass --token or set TELEGRAM_BOT_TOKEN".into(),
        ));
    }
    Ok(token)
}

/// Blocking Telegram Bot API client. Holds the HTTP client and the
/// token-bearing base URL (`<api>/bot<token>`), which is never logged.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client against `api_url`, normally `DEFAULT_API_URL`.
    pub fn with_api_url(token: &str, api_url: &str) -> UploaderResult<Self> {
        let token = validate_token(token)?;
        let client = Client::builder()
            .connect_timeout(TRANSPORT_TIMEOUT)
            .timeout(TRANSPORT_TIMEOUT)
            .pool_idle_timeout(TRANSPORT_TIMEOUT)
            .build()
            .map_err(TransportError::from)?;
        Ok(ApiClient {
            client,
            base_url: format!("{}/bot{}", api_url.trim_end_matches('/'), token),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/{}", self.base_url, method)
    }

    /// GET a method with query parameters and unwrap the API envelope.
    fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        query: &[(&str, String)],
    ) -> Result<T, TransportError> {
        let res = self.client.get(self.method_url(method)).query(query).send()?;
        let envelope: ApiResponse<T> = res.json()?;
        envelope.into_result()
    }

    /// POST a file as multipart/form-data under `field`.
    fn send_file(
        &self,
        method: &str,
        field: &str,
        destination: &ChatId,
        upload: FileUpload,
        caption: &str,
        streaming: bool,
    ) -> Result<MessageRef, TransportError> {
        let deadline =
            TRANSPORT_TIMEOUT + Duration::from_secs(upload.size / MIN_UPLOAD_BYTES_PER_SEC);
        let part = multipart::Part::reader_with_length(upload.file, upload.size)
            .file_name(upload.file_name);
        let mut form = multipart::Form::new()
            .text("chat_id", destination.to_string())
            .text("caption", caption.to_string());
        if streaming {
            form = form.text("supports_streaming", "true");
        }
        let form = form.part(field.to_string(), part);

        let res = self
            .client
            .post(self.method_url(method))
            .timeout(deadline)
            .multipart(form)
            .send()?;
        let envelope: ApiResponse<MessageRef> = res.json()?;
        envelope.into_result()
    }
}

impl Transport for ApiClient {
    fn identity(&self) -> Result<BotIdentity, TransportError> {
        self.call("getMe", &[])
    }

    fn recent_chats(&self) -> Result<Vec<ChatRef>, TransportError> {
        let updates: Vec<Update> = self.call("getUpdates", &[("limit", "100".to_string())])?;
        Ok(updates
            .into_iter()
            .flat_map(|u| [u.message, u.channel_post])
            .flatten()
            .map(|holder| holder.chat)
            .collect())
    }

    fn membership_status(
        &self,
        chat_id: i64,
        user_id: i64,
    ) -> Result<MemberStatus, TransportError> {
        let member: ChatMember = self.call(
            "getChatMember",
            &[("chat_id", chat_id.to_string()), ("user_id", user_id.to_string())],
        )?;
        Ok(member.status)
    }

    fn send_video(
        &self,
        destination: &ChatId,
        upload: FileUpload,
        caption: &str,
    ) -> Result<MessageRef, TransportError> {
        self.send_file("sendVideo", "video", destination, upload, caption, true)
    }

    fn send_document(
        &self,
        destination: &ChatId,
        upload: FileUpload,
        caption: &str,
    ) -> Result<MessageRef, TransportError> {
        self.send_file("sendDocument", "document", destination, upload, caption, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_and_empty_tokens_are_rejected() {
        assert!(matches!(validate_token(""), Err(UploaderError::Credential(_))));
        assert!(matches!(
            validate_token(PLACEHOLDER_TOKEN),
            Err(UploaderError::Credential(_))
        ));
        assert_eq!(validate_token(" 123:abc ").unwrap(), "123:abc");
    }

    #[test]
    fn error_envelope_becomes_api_error() {
        let raw = r#"{"ok": false, "error_code": 403, "description": "Forbidden: bot is not a member"}"#;
        let envelope: ApiResponse<MessageRef> = serde_json::from_str(raw).unwrap();
        match envelope.into_result() {
            Err(TransportError::Api { code, description }) => {
                assert_eq!(code, 403);
                assert!(description.contains("not a member"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn updates_expose_message_and_channel_chats() {
        let raw = r#"{"ok": true, "result": [
            {"update_id": 1, "message": {"message_id": 5, "chat": {"id": -100, "type": "supergroup", "title": "Team"}}},
            {"update_id": 2, "channel_post": {"message_id": 6, "chat": {"id": -200, "type": "channel", "title": "News", "username": "news"}}},
            {"update_id": 3, "edited_message": {"message_id": 7}}
        ]}"#;
        let envelope: ApiResponse<Vec<Update>> = serde_json::from_str(raw).unwrap();
        let updates = envelope.into_result().unwrap();
        let chats: Vec<ChatRef> = updates
            .into_iter()
            .flat_map(|u| [u.message, u.channel_post])
            .flatten()
            .map(|h| h.chat)
            .collect();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].kind, ChatKind::Supergroup);
        assert_eq!(chats[1].username.as_deref(), Some("news"));
    }

    #[test]
    fn unknown_member_status_is_tolerated() {
        let member: ChatMember = serde_json::from_str(r#"{"status": "owner_pending"}"#).unwrap();
        assert_eq!(member.status, MemberStatus::Unknown);
        assert!(!member.status.is_admin());
        assert!(MemberStatus::Creator.is_admin());
    }

    #[test]
    fn chat_ids_render_for_the_api() {
        assert_eq!(ChatId::Id(-1001234).to_string(), "-1001234");
        assert_eq!(ChatId::Handle("@drops".into()).to_string(), "@drops");
    }
}
