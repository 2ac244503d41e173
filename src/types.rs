//! Bot API records the core reads. Unknown fields are ignored, missing
//! optional fields default.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Chat {
    pub id: i64,
    /// "private", "group", "supergroup" or "channel".
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PhotoSize {
    pub file_id: String,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
    #[serde(default)]
    pub file_size: Option<i64>,
}

/// Shared shape of audio, document, sticker, video and voice attachments.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct FileAttachment {
    pub file_id: String,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub emoji: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Contact {
    pub phone_number: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Venue {
    pub location: Location,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    /// Unix epoch seconds.
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub reply_to_message: Option<Box<Message>>,

    #[serde(default)]
    pub photo: Vec<PhotoSize>,
    #[serde(default)]
    pub audio: Option<FileAttachment>,
    #[serde(default)]
    pub document: Option<FileAttachment>,
    #[serde(default)]
    pub sticker: Option<FileAttachment>,
    #[serde(default)]
    pub video: Option<FileAttachment>,
    #[serde(default)]
    pub voice: Option<FileAttachment>,
    #[serde(default)]
    pub contact: Option<Contact>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub venue: Option<Venue>,

    #[serde(default)]
    pub new_chat_members: Vec<User>,
    #[serde(default)]
    pub left_chat_member: Option<User>,
    #[serde(default)]
    pub new_chat_title: Option<String>,
    #[serde(default)]
    pub new_chat_photo: Vec<PhotoSize>,
    #[serde(default)]
    pub delete_chat_photo: bool,
    #[serde(default)]
    pub group_chat_created: bool,
    #[serde(default)]
    pub supergroup_chat_created: bool,
    #[serde(default)]
    pub channel_chat_created: bool,
    #[serde(default)]
    pub migrate_to_chat_id: Option<i64>,
    #[serde(default)]
    pub migrate_from_chat_id: Option<i64>,
    #[serde(default)]
    pub pinned_message: Option<Box<Message>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
}

fn strip_prefix_ignore_ascii_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}

fn is_username_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl Message {
    pub fn sent_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.date, 0)
    }

    /// Text the router scans for commands.
    ///
    /// A leading `@bot_username` mention is dropped and `/cmd@bot_username`
    /// becomes `/cmd`. Commands aimed at other bots are left untouched so they
    /// never match. Messages without text yield an empty string.
    pub fn command_text(&self, bot_username: Option<&str>) -> String {
        let Some(text) = self.text.as_deref() else {
            return String::new();
        };
        let Some(username) = bot_username.filter(|u| !u.is_empty()) else {
            return text.to_string();
        };

        let trimmed = text.trim_start();
        let mention = format!("@{}", username);
        if let Some(rest) = strip_prefix_ignore_ascii_case(trimmed, &mention) {
            if !rest.starts_with(is_username_char) {
                return rest.trim_start().to_string();
            }
        }

        if trimmed.starts_with('/') {
            let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
            let word = &trimmed[..end];
            if let Some(at) = word.find('@') {
                if word[at + 1..].eq_ignore_ascii_case(username) {
                    return format!("{}{}", &word[..at], &trimmed[end..]);
                }
            }
        }

        text.to_string()
    }

    /// Whether the message is meant for `bot`: any private chat, a reply to
    /// one of the bot's messages, or an `@username` mention in the text or
    /// caption (which also covers `/cmd@username`).
    pub fn is_addressed_to(&self, bot: &User) -> bool {
        if self.chat.kind == "private" {
            return true;
        }
        let replied_to_bot = self
            .reply_to_message
            .as_ref()
            .and_then(|reply| reply.from.as_ref())
            .is_some_and(|author| author.id == bot.id);
        if replied_to_bot {
            return true;
        }

        let Some(username) = bot.username.as_deref() else {
            return false;
        };
        let mention = format!("@{}", username.to_ascii_lowercase());
        [self.text.as_deref(), self.caption.as_deref()]
            .into_iter()
            .flatten()
            .any(|body| {
                let lower = body.to_ascii_lowercase();
                lower.match_indices(&mention).any(|(idx, _)| {
                    !lower[idx + mention.len()..].starts_with(is_username_char)
                })
            })
    }
}
