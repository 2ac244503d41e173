//! Ordered command / content-type routing.
//!
//! Routes are tried in registration order. A route that matches but whose
//! handler returns `false` hands the message on to the next route, with the
//! argument cursor rewound.

pub mod matcher;
pub mod scanner;

use anyhow::Result;
use async_trait::async_trait;
use tracing::debug;

use crate::types::{Message, Update};

pub use matcher::{Command, ContentType, Matcher, SlashMode};
pub use scanner::{Arguments, Cursor, Scanner, DEFAULT_SKIP_CHARS};

/// What a handler sees: the message, the argument cursor and the command
/// name that matched (empty for content-type routes).
#[derive(Debug, Clone)]
pub struct Context {
    pub message: Message,
    pub args: Arguments,
    pub command: String,
}

/// A route target. Returning `Ok(false)` means "not mine, keep looking".
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, ctx: &mut Context) -> Result<bool>;
}

#[async_trait]
impl<F> Handler for F
where
    F: Fn(&mut Context) -> Result<bool> + Send + Sync,
{
    async fn handle(&self, ctx: &mut Context) -> Result<bool> {
        self(ctx)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RouterOptions {
    pub case_sensitive: bool,
    /// Ignored between tokens and when checking for leftover text.
    pub skip_chars: String,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            case_sensitive: false,
            skip_chars: DEFAULT_SKIP_CHARS.to_string(),
        }
    }
}

struct Route {
    matcher: Matcher,
    handler: Box<dyn Handler>,
}

#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
    options: RouterOptions,
    bot_username: Option<String>,
    partial_match: Option<Box<dyn Handler>>,
    unknown_command: Option<Box<dyn Handler>>,
    unsupported_content_type: Option<Box<dyn Handler>>,
}

impl Router {
    pub fn new(options: RouterOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Lets `/cmd@username` and a leading `@username` route like `/cmd`.
    pub fn set_bot_username(&mut self, username: Option<String>) {
        self.bot_username = username;
    }

    pub fn add(&mut self, matcher: impl Into<Matcher>, handler: impl Handler + 'static) -> &mut Self {
        self.routes.push(Route {
            matcher: matcher.into(),
            handler: Box::new(handler),
        });
        self
    }

    /// Called after a handler succeeded but left unconsumed text. Its result
    /// is ignored.
    pub fn on_partial_match(&mut self, handler: impl Handler + 'static) -> &mut Self {
        self.partial_match = Some(Box::new(handler));
        self
    }

    /// Called for non-empty command text no route took. Return `false` to
    /// mark the message consumed.
    pub fn on_unknown_command(&mut self, handler: impl Handler + 'static) -> &mut Self {
        self.unknown_command = Some(Box::new(handler));
        self
    }

    /// Called for messages without command text no route took. Return
    /// `false` to mark the message consumed.
    pub fn on_unsupported_content_type(&mut self, handler: impl Handler + 'static) -> &mut Self {
        self.unsupported_content_type = Some(Box::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub async fn process_update(&self, update: &Update) -> Result<bool> {
        match &update.message {
            Some(message) => self.process(message).await,
            None => Ok(false),
        }
    }

    /// Route one message. Returns whether anything consumed it.
    pub async fn process(&self, message: &Message) -> Result<bool> {
        let text = message.command_text(self.bot_username.as_deref());
        let mut ctx = Context {
            message: message.clone(),
            args: Arguments::new(text, self.options.skip_chars.as_str()),
            command: String::new(),
        };
        let start = ctx.args.position();

        for (index, route) in self.routes.iter().enumerate() {
            ctx.args.reset(start);
            ctx.command.clear();

            let matched = match &route.matcher {
                Matcher::Command(command) => {
                    let found =
                        command.match_at(&ctx.args.scanner(), start, self.options.case_sensitive);
                    match found {
                        Some((name, next)) => {
                            ctx.command = name;
                            ctx.args.reset(next);
                            true
                        }
                        None => false,
                    }
                }
                Matcher::Content(kind) => kind.is_present_in(message),
            };
            if !matched {
                continue;
            }

            if !route.handler.handle(&mut ctx).await? {
                debug!("Route {} declined message {}", index, message.message_id);
                continue;
            }

            if !ctx.args.is_at_end() {
                if let Some(partial) = &self.partial_match {
                    debug!("Partial match, leftover: {:?}", ctx.args.rest());
                    partial.handle(&mut ctx).await?;
                }
            }
            return Ok(true);
        }

        ctx.args.reset(start);
        ctx.command.clear();

        let fallback = if ctx.args.is_at_end() {
            &self.unsupported_content_type
        } else {
            if let Some(word) = ctx.args.scan_word() {
                ctx.command = word.strip_prefix('/').unwrap_or(&word).to_string();
            }
            &self.unknown_command
        };

        match fallback {
            Some(handler) => Ok(!handler.handle(&mut ctx).await?),
            None => Ok(false),
        }
    }
}
