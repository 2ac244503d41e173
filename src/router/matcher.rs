use crate::router::scanner::{Cursor, Scanner};
use crate::types::Message;

/// Whether a command must be typed with its leading `/`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SlashMode {
    #[default]
    Required,
    Optional,
}

/// A command name plus aliases, tried in the order given.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    names: Vec<String>,
    slash: SlashMode,
}

impl Command {
    pub fn new(name: &str) -> Self {
        Self::with_aliases([name])
    }

    pub fn with_aliases<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            names: names
                .into_iter()
                .map(|n| n.as_ref().trim_start_matches('/').to_string())
                .collect(),
            slash: SlashMode::default(),
        }
    }

    pub fn slash(mut self, mode: SlashMode) -> Self {
        self.slash = mode;
        self
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Try to consume this command at `at`. Returns the name as typed
    /// (without the slash) and the position after it.
    pub fn match_at(
        &self,
        scanner: &Scanner<'_>,
        at: Cursor,
        case_sensitive: bool,
    ) -> Option<(String, Cursor)> {
        let (word, next) = scanner.scan_word(at)?;
        let bare = match (word.strip_prefix('/'), self.slash) {
            (Some(bare), _) => bare,
            (None, SlashMode::Optional) => word,
            (None, SlashMode::Required) => return None,
        };
        let hit = self.names.iter().any(|name| {
            if case_sensitive {
                name == bare
            } else {
                name.to_lowercase() == bare.to_lowercase()
            }
        });
        hit.then(|| (bare.to_string(), next))
    }
}

/// Kinds of non-text content a route can match on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentType {
    Photo,
    Audio,
    Document,
    Sticker,
    Video,
    Voice,
    Contact,
    Location,
    Venue,
    NewChatMembers,
    LeftChatMember,
    NewChatTitle,
    NewChatPhoto,
    DeleteChatPhoto,
    GroupChatCreated,
    SupergroupChatCreated,
    ChannelChatCreated,
    MigrateToChatId,
    MigrateFromChatId,
    PinnedMessage,
}

impl ContentType {
    pub fn is_present_in(self, message: &Message) -> bool {
        match self {
            ContentType::Photo => !message.photo.is_empty(),
            ContentType::Audio => message.audio.is_some(),
            ContentType::Document => message.document.is_some(),
            ContentType::Sticker => message.sticker.is_some(),
            ContentType::Video => message.video.is_some(),
            ContentType::Voice => message.voice.is_some(),
            ContentType::Contact => message.contact.is_some(),
            ContentType::Location => message.location.is_some(),
            ContentType::Venue => message.venue.is_some(),
            ContentType::NewChatMembers => !message.new_chat_members.is_empty(),
            ContentType::LeftChatMember => message.left_chat_member.is_some(),
            ContentType::NewChatTitle => message.new_chat_title.is_some(),
            ContentType::NewChatPhoto => !message.new_chat_photo.is_empty(),
            ContentType::DeleteChatPhoto => message.delete_chat_photo,
            ContentType::GroupChatCreated => message.group_chat_created,
            ContentType::SupergroupChatCreated => message.supergroup_chat_created,
            ContentType::ChannelChatCreated => message.channel_chat_created,
            ContentType::MigrateToChatId => message.migrate_to_chat_id.is_some(),
            ContentType::MigrateFromChatId => message.migrate_from_chat_id.is_some(),
            ContentType::PinnedMessage => message.pinned_message.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    Command(Command),
    Content(ContentType),
}

impl From<Command> for Matcher {
    fn from(command: Command) -> Self {
        Matcher::Command(command)
    }
}

impl From<ContentType> for Matcher {
    fn from(content: ContentType) -> Self {
        Matcher::Content(content)
    }
}
