use std::future::Future;
use std::time::Duration;

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use tokio::runtime::{Handle, Runtime};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::api::{ApiClient, Parameters};
use crate::bridge::{self, WaitError};
use crate::error::{BotError, TransportError};
use crate::poller::{PollerConfig, UpdatePoller, UpdateSource};
use crate::router::Router;
use crate::types::{Update, User};

/// Filters applied by [`run`] before an update reaches the router.
#[derive(Debug, Clone, Default)]
pub struct DispatchOptions {
    pub only_addressed_to_self: bool,
    /// Empty means everyone.
    pub allowed_user_ids: Vec<i64>,
}

impl DispatchOptions {
    fn allows(&self, update: &Update) -> bool {
        if self.allowed_user_ids.is_empty() {
            return true;
        }
        update
            .message
            .as_ref()
            .and_then(|m| m.from.as_ref())
            .is_some_and(|user| self.allowed_user_ids.contains(&user.id))
    }
}

/// Poll updates forever and route each one.
///
/// A failing handler only loses its own update. Returns when polling
/// itself fails, which only happens with auto-reconnect off.
pub async fn run<S: UpdateSource>(
    poller: &mut UpdatePoller<S>,
    router: &Router,
    options: &DispatchOptions,
) -> std::result::Result<(), BotError> {
    info!("Dispatching updates...");
    loop {
        let update = poller.next_update(options.only_addressed_to_self).await?;

        if !options.allows(&update) {
            debug!("Ignoring update {} from a user not on the allow list", update.update_id);
            continue;
        }

        match router.process_update(&update).await {
            Ok(true) => debug!("Update {} handled", update.update_id),
            Ok(false) => warn!("Unhandled update: {}", update.update_id),
            Err(e) => error!("Error handling update {}: {:#}", update.update_id, e),
        }
    }
}

/// Drive `future` to completion on the calling thread. Refuses to run from
/// inside any runtime, where blocking would panic or stall its workers.
fn block_on_main<F: Future>(runtime: &Runtime, future: F) -> std::result::Result<F::Output, BotError> {
    if Handle::try_current().is_ok() {
        return Err(BotError::NestedRuntime);
    }
    Ok(runtime.block_on(future))
}

/// Blocking front end for code that is not async.
///
/// Owns the main execution context: async completions scheduled through
/// [`Bot::call_async`] run there, and the `_sync` methods drive their HTTP
/// call on the calling thread. Called from async code, the `_sync` methods
/// fail with [`BotError::NestedRuntime`] instead of blocking.
pub struct Bot {
    runtime: Runtime,
    api: ApiClient,
    poller: UpdatePoller<ApiClient>,
    identity: Option<User>,
    last_error: Option<BotError>,
}

impl Bot {
    pub fn new(api: ApiClient, config: PollerConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("pollbot-main")
            .enable_all()
            .build()
            .context("Failed to start the main execution context")?;
        Ok(Self {
            runtime,
            poller: UpdatePoller::new(api.clone(), config),
            api,
            identity: None,
            last_error: None,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn main_context(&self) -> Handle {
        self.runtime.handle().clone()
    }

    pub fn identity(&self) -> Option<&User> {
        self.identity.as_ref()
    }

    /// Most recent failure of a `_sync` call, cleared by the next success.
    pub fn last_error(&self) -> Option<&BotError> {
        self.last_error.as_ref()
    }

    /// Ask the server who this bot is. Must succeed before polling with
    /// `only_addressed_to_self`. Failures land in [`Bot::last_error`].
    pub fn fetch_identity(&mut self) -> Option<&User> {
        let result = block_on_main(&self.runtime, self.api.get_me())
            .and_then(|r| r.map_err(BotError::from));
        let me = self.record(result)?;
        info!(
            "Running as @{} ({})",
            me.username.as_deref().unwrap_or("?"),
            me.id
        );
        self.poller.set_identity(me.clone());
        Some(self.identity.insert(me))
    }

    pub fn call_sync<T: DeserializeOwned>(&mut self, endpoint: &str, params: &Parameters) -> Option<T> {
        let result = block_on_main(&self.runtime, self.api.call(endpoint, params))
            .and_then(|r| r.map_err(BotError::from));
        self.record(result)
    }

    /// Schedule a call; `completion` runs on the main context.
    pub fn call_async<T, F>(&self, endpoint: &str, params: Parameters, completion: F) -> JoinHandle<()>
    where
        T: DeserializeOwned + Send + 'static,
        F: FnOnce(std::result::Result<T, TransportError>) + Send + 'static,
    {
        self.api
            .call_with(endpoint, params, self.runtime.handle(), completion)
    }

    pub fn next_update_sync(&mut self, only_addressed_to_self: bool) -> Option<Update> {
        let result = block_on_main(
            &self.runtime,
            self.poller.next_update(only_addressed_to_self),
        )
        .and_then(|r| r);
        self.record(result)
    }

    /// Block for `duration` without stalling callbacks on the main context.
    pub fn wait(&self, duration: Duration) -> std::result::Result<(), WaitError> {
        bridge::wait(self.runtime.handle(), duration)
    }

    fn record<T>(&mut self, result: std::result::Result<T, BotError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.last_error = None;
                Some(value)
            }
            Err(e) => {
                warn!("Bot API call failed: {}", e);
                self.last_error = Some(e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Chat, Message};

    fn from_user(id: i64) -> Update {
        Update {
            update_id: 1,
            message: Some(Message {
                from: Some(User {
                    id,
                    ..Default::default()
                }),
                chat: Chat {
                    id,
                    kind: "private".to_string(),
                    ..Default::default()
                },
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_allow_list() {
        let open = DispatchOptions::default();
        assert!(open.allows(&from_user(5)));

        let closed = DispatchOptions {
            allowed_user_ids: vec![5],
            ..Default::default()
        };
        assert!(closed.allows(&from_user(5)));
        assert!(!closed.allows(&from_user(6)));
        assert!(!closed.allows(&Update::default()));
    }

    fn no_reconnect() -> PollerConfig {
        PollerConfig {
            auto_reconnect: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_sync_calls_inside_async_code_fail_without_blocking() {
        let mut server = mockito::Server::new_async().await;
        let untouched = server
            .mock("POST", mockito::Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let api = ApiClient::new("7:NESTED", &server.url());
        let mut bot = Bot::new(api, no_reconnect()).unwrap();

        let sent: Option<serde_json::Value> = bot.call_sync("getMe", &Parameters::new());
        assert!(sent.is_none());
        assert!(matches!(bot.last_error(), Some(BotError::NestedRuntime)));

        assert!(bot.fetch_identity().is_none());
        assert!(bot.identity().is_none());
        assert!(matches!(bot.last_error(), Some(BotError::NestedRuntime)));

        assert!(bot.next_update_sync(false).is_none());
        assert!(matches!(bot.last_error(), Some(BotError::NestedRuntime)));

        untouched.assert_async().await;
        // A runtime cannot be dropped from async code.
        tokio::task::spawn_blocking(move || drop(bot)).await.unwrap();
    }

    #[test]
    fn test_failed_identity_fetch_is_recorded() {
        let mut server = mockito::Server::new();
        let _me = server
            .mock("POST", "/bot7:IDENTITY/getMe")
            .with_status(401)
            .with_body(r#"{"ok": false, "description": "Unauthorized", "error_code": 401}"#)
            .create();

        let api = ApiClient::new("7:IDENTITY", &server.url());
        let mut bot = Bot::new(api, no_reconnect()).unwrap();

        assert!(bot.fetch_identity().is_none());
        assert!(bot.identity().is_none());
        match bot.last_error() {
            Some(BotError::Transport(TransportError::InvalidStatusCode { status, .. })) => {
                assert_eq!(*status, 401)
            }
            other => panic!("unexpected last error: {other:?}"),
        }
    }
}
