use std::path::PathBuf;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pollbot::bot::{self, DispatchOptions};
use pollbot::config::Config;
use pollbot::{ApiClient, Command, ContentType, Context, Handler, Router, UpdatePoller};

const HELP_TEXT: &str = "Commands:\n\
     /start - Say hello\n\
     /help - Show this message\n\
     /echo <text> - Repeat <text> back";

/// Replies with fixed text.
struct StaticReply {
    api: ApiClient,
    text: &'static str,
}

#[async_trait]
impl Handler for StaticReply {
    async fn handle(&self, ctx: &mut Context) -> Result<bool> {
        self.api
            .send_message(ctx.message.chat.id, self.text, None)
            .await?;
        Ok(true)
    }
}

struct Echo {
    api: ApiClient,
}

#[async_trait]
impl Handler for Echo {
    async fn handle(&self, ctx: &mut Context) -> Result<bool> {
        let reply = ctx
            .args
            .scan_rest()
            .unwrap_or_else(|| "Usage: /echo <text>".to_string());
        self.api
            .send_message(ctx.message.chat.id, &reply, Some(ctx.message.message_id))
            .await?;
        Ok(true)
    }
}

struct PhotoReceived {
    api: ApiClient,
}

#[async_trait]
impl Handler for PhotoReceived {
    async fn handle(&self, ctx: &mut Context) -> Result<bool> {
        let Some(largest) = ctx.message.photo.iter().max_by_key(|p| p.width * p.height) else {
            return Ok(false);
        };
        let reply = format!("Nice photo! ({}x{})", largest.width, largest.height);
        self.api.send_message(ctx.message.chat.id, &reply, None).await?;
        Ok(true)
    }
}

/// Shared shape of the three fallbacks: reply, then report "not handled",
/// which the router counts as consumed.
struct Fallback {
    api: ApiClient,
    render: fn(&Context) -> String,
}

#[async_trait]
impl Handler for Fallback {
    async fn handle(&self, ctx: &mut Context) -> Result<bool> {
        let reply = (self.render)(ctx);
        self.api.send_message(ctx.message.chat.id, &reply, None).await?;
        Ok(false)
    }
}

fn build_router(api: &ApiClient, config: &Config, username: Option<String>) -> Router {
    let mut router = Router::new(config.router_options());
    router.set_bot_username(username);
    router
        .add(
            Command::new("start"),
            StaticReply {
                api: api.clone(),
                text: "Hello! Send /help to see what I can do.",
            },
        )
        .add(
            Command::with_aliases(["help", "h"]),
            StaticReply {
                api: api.clone(),
                text: HELP_TEXT,
            },
        )
        .add(Command::new("echo"), Echo { api: api.clone() })
        .add(ContentType::Photo, PhotoReceived { api: api.clone() })
        .on_partial_match(Fallback {
            api: api.clone(),
            render: |ctx| format!("Ignoring extra arguments: {}", ctx.args.rest()),
        })
        .on_unknown_command(Fallback {
            api: api.clone(),
            render: |ctx| format!("Unknown command: {}\n\n{}", ctx.command, HELP_TEXT),
        })
        .on_unsupported_content_type(Fallback {
            api: api.clone(),
            render: |_| "Sorry, I can't handle this kind of message.".to_string(),
        });
    router
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,pollbot=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    info!("Loading configuration from: {}", config_path.display());
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    info!("Configuration loaded successfully");
    info!("  API: {}", config.telegram.base_url);
    info!("  Poll timeout: {}s, limit: {}", config.polling.timeout, config.polling.limit);
    info!("  Allowed users: {:?}", config.telegram.allowed_user_ids);

    // The HTTP read timeout must outlast the long-poll timeout.
    let http = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(config.polling.timeout + 10))
        .build()
        .context("Failed to build HTTP client")?;
    let api = ApiClient::new(&config.telegram.bot_token, &config.telegram.base_url)
        .with_http_client(http);

    let me = api.get_me().await.context("Failed to fetch bot identity")?;
    info!("Running as @{}", me.username.as_deref().unwrap_or("?"));

    let router = build_router(&api, &config, me.username.clone());
    let mut poller = UpdatePoller::new(api.clone(), config.poller_config());
    poller.set_identity(me);

    let options = DispatchOptions {
        only_addressed_to_self: config.polling.only_addressed_to_self,
        allowed_user_ids: config.telegram.allowed_user_ids.clone(),
    };

    info!("Bot is starting...");
    bot::run(&mut poller, &router, &options).await?;

    Ok(())
}
