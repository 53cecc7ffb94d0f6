// Channel resolver: finds the chats the bot may post to, caches them for
// the session, and parses destinations typed in by hand.

use std::collections::HashSet;

use crate::api::{BotIdentity, ChatId, ChatKind, Transport};
use crate::error::{TransportError, UploaderError, UploaderResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Group,
    Supergroup,
    Channel,
    Manual,
}

/// A destination files can be uploaded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: ChatId,
    pub title: String,
    pub kind: ChannelKind,
    pub username: Option<String>,
}

impl Channel {
    /// One-line description for menus.
    pub fn label(&self) -> String {
        let icon = match self.kind {
            ChannelKind::Channel => "📢",
            ChannelKind::Manual => "✏️",
            ChannelKind::Group | ChannelKind::Supergroup => "👥",
        };
        match &self.username {
            Some(username) => format!("{icon} {} (@{username})", self.title),
            None => format!("{icon} {}", self.title),
        }
    }
}

/// Discovers destinations once per session; `refresh` forces a new lookup.
#[derive(Debug, Default)]
pub struct ChannelResolver {
    cache: Option<Vec<Channel>>,
    bot: Option<BotIdentity>,
}

impl ChannelResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Chats where the bot is an administrator or the owner, first-seen
    /// order, one per chat id. A failed lookup yields an empty list and is
    /// not cached, so the next call tries again.
    pub fn candidates<T: Transport + ?Sized>(&mut self, transport: &T) -> &[Channel] {
        if self.cache.is_none() {
            match discover(transport) {
                Ok((bot, channels)) => {
                    tracing::info!(
                        "bot @{} can post to {} chat(s)",
                        bot.username.as_deref().unwrap_or(&bot.first_name),
                        channels.len()
                    );
                    self.bot = Some(bot);
                    self.cache = Some(channels);
                }
                Err(err) => {
                    tracing::error!("channel discovery failed: {err}");
                    return &[];
                }
            }
        }
        self.cache.as_deref().unwrap_or(&[])
    }

    pub fn refresh<T: Transport + ?Sized>(&mut self, transport: &T) -> &[Channel] {
        self.cache = None;
        self.candidates(transport)
    }

    /// The bot account, known after the first successful discovery.
    pub fn bot(&self) -> Option<&BotIdentity> {
        self.bot.as_ref()
    }
}

fn discover<T: Transport + ?Sized>(
    transport: &T,
) -> Result<(BotIdentity, Vec<Channel>), TransportError> {
    let bot = transport.identity()?;
    let mut seen = HashSet::new();
    let mut channels = Vec::new();

    for chat in transport.recent_chats()? {
        let kind = match chat.kind {
            ChatKind::Group => ChannelKind::Group,
            ChatKind::Supergroup => ChannelKind::Supergroup,
            ChatKind::Channel => ChannelKind::Channel,
            ChatKind::Private | ChatKind::Unknown => continue,
        };
        if !seen.insert(chat.id) {
            continue;
        }
        match transport.membership_status(chat.id, bot.id) {
            Ok(status) if status.is_admin() => channels.push(Channel {
                id: ChatId::Id(chat.id),
                title: chat
                    .title
                    .or_else(|| chat.username.clone())
                    .unwrap_or_else(|| chat.id.to_string()),
                kind,
                username: chat.username,
            }),
            Ok(status) => tracing::debug!("skipping chat {}: bot is {status:?}", chat.id),
            Err(err) => tracing::debug!("skipping chat {}: {err}", chat.id),
        }
    }
    Ok((bot, channels))
}

/// Parse a typed destination: `@handle` or a (possibly negative) chat id.
pub fn resolve_manual(input: &str) -> UploaderResult<Channel> {
    let input = input.trim();
    let id = if let Some(handle) = input.strip_prefix('@') {
        if handle.is_empty() || handle.chars().any(char::is_whitespace) {
            return Err(invalid_destination(input));
        }
        ChatId::Handle(input.to_string())
    } else {
        input
            .parse::<i64>()
            .map(ChatId::Id)
            .map_err(|_| invalid_destination(input))?
    };
    Ok(Channel {
        title: format!("manual destination {id}"),
        id,
        kind: ChannelKind::Manual,
        username: None,
    })
}

fn invalid_destination(input: &str) -> UploaderError {
    UploaderError::Input(format!(
        "'{input}' is not a destination; use @username or a numeric chat id"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ChatRef, FileUpload, MemberStatus, MessageRef};
    use std::cell::Cell;
    use std::collections::HashMap;

    struct FakeBot {
        chats: Vec<ChatRef>,
        statuses: HashMap<i64, MemberStatus>,
        fail_updates: bool,
        update_calls: Cell<usize>,
    }

    fn chat(id: i64, kind: ChatKind, title: &str) -> ChatRef {
        ChatRef {
            id,
            kind,
            title: Some(title.to_string()),
            username: None,
        }
    }

    impl Transport for FakeBot {
        fn identity(&self) -> Result<BotIdentity, TransportError> {
            Ok(BotIdentity {
                id: 42,
                first_name: "Uploader".into(),
                username: Some("uploader_bot".into()),
            })
        }

        fn recent_chats(&self) -> Result<Vec<ChatRef>, TransportError> {
            self.update_calls.set(self.update_calls.get() + 1);
            if self.fail_updates {
                return Err(TransportError::MissingResult);
            }
            Ok(self.chats.clone())
        }

        fn membership_status(
            &self,
            chat_id: i64,
            user_id: i64,
        ) -> Result<MemberStatus, TransportError> {
            assert_eq!(user_id, 42);
            self.statuses
                .get(&chat_id)
                .copied()
                .ok_or(TransportError::Api {
                    code: 400,
                    description: "chat not found".into(),
                })
        }

        fn send_video(&self, _: &ChatId, _: FileUpload, _: &str) -> Result<MessageRef, TransportError> {
            unreachable!()
        }

        fn send_document(&self, _: &ChatId, _: FileUpload, _: &str) -> Result<MessageRef, TransportError> {
            unreachable!()
        }
    }

    fn bot(chats: Vec<ChatRef>, statuses: &[(i64, MemberStatus)]) -> FakeBot {
        FakeBot {
            chats,
            statuses: statuses.iter().copied().collect(),
            fail_updates: false,
            update_calls: Cell::new(0),
        }
    }

    #[test]
    fn duplicate_chats_collapse_keeping_first_title() {
        let fake = bot(
            vec![
                chat(-1, ChatKind::Supergroup, "First title"),
                chat(-2, ChatKind::Channel, "News"),
                chat(-1, ChatKind::Supergroup, "Renamed later"),
            ],
            &[(-1, MemberStatus::Administrator), (-2, MemberStatus::Creator)],
        );
        let mut resolver = ChannelResolver::new();
        let found = resolver.candidates(&fake).to_vec();

        assert_eq!(found.len(), 2);
        assert_eq!(found[0].id, ChatId::Id(-1));
        assert_eq!(found[0].title, "First title");
        assert_eq!(found[1].kind, ChannelKind::Channel);
        assert_eq!(resolver.bot().unwrap().id, 42);
    }

    #[test]
    fn non_admin_private_and_failing_chats_are_dropped() {
        let fake = bot(
            vec![
                chat(7, ChatKind::Private, "dm"),
                chat(-3, ChatKind::Group, "Readers"),
                chat(-4, ChatKind::Group, "Broken"),
                chat(-5, ChatKind::Group, "Admins"),
            ],
            &[
                (7, MemberStatus::Administrator),
                (-3, MemberStatus::Member),
                (-5, MemberStatus::Administrator),
            ],
        );
        let found = ChannelResolver::new().candidates(&fake).to_vec();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Admins");
    }

    #[test]
    fn results_are_cached_until_refresh() {
        let fake = bot(vec![chat(-1, ChatKind::Group, "g")], &[(-1, MemberStatus::Creator)]);
        let mut resolver = ChannelResolver::new();
        resolver.candidates(&fake);
        resolver.candidates(&fake);
        assert_eq!(fake.update_calls.get(), 1);
        resolver.refresh(&fake);
        assert_eq!(fake.update_calls.get(), 2);
    }

    #[test]
    fn failed_discovery_is_empty_and_retried() {
        let mut fake = bot(vec![], &[]);
        fake.fail_updates = true;
        let mut resolver = ChannelResolver::new();
        assert!(resolver.candidates(&fake).is_empty());
        assert!(resolver.candidates(&fake).is_empty());
        assert_eq!(fake.update_calls.get(), 2);
    }

    #[test]
    fn manual_entry_accepts_handles_and_ids() {
        let handle = resolve_manual(" @my_channel ").unwrap();
        assert_eq!(handle.id, ChatId::Handle("@my_channel".into()));
        assert_eq!(handle.kind, ChannelKind::Manual);

        assert_eq!(resolve_manual("-1001234567").unwrap().id, ChatId::Id(-1001234567));
        assert_eq!(resolve_manual("12").unwrap().id, ChatId::Id(12));

        for bad in ["", "@", "my_channel", "12a", "--5", "@a b"] {
            assert!(
                matches!(resolve_manual(bad), Err(UploaderError::Input(_))),
                "{bad:?} should be rejected"
            );
        }
    }
}
