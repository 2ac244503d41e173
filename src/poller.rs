use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::api::ApiClient;
use crate::error::{BotError, TransportError};
use crate::types::{Update, User};

pub const DEFAULT_LIMIT: u32 = 100;
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Where updates come from. [`ApiClient`] is the real source.
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch_updates(
        &self,
        offset: i64,
        limit: u32,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError>;
}

#[async_trait]
impl UpdateSource for ApiClient {
    async fn fetch_updates(
        &self,
        offset: i64,
        limit: u32,
        timeout_secs: u64,
    ) -> Result<Vec<Update>, TransportError> {
        self.get_updates(offset, limit, timeout_secs).await
    }
}

/// Delay before the next fetch, indexed by how many fetches in a row failed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    pub delays_secs: Vec<u64>,
    /// Used once the retry count runs past `delays_secs`.
    pub max_delay_secs: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delays_secs: vec![0, 1, 2, 5, 10, 20],
            max_delay_secs: 30,
        }
    }
}

impl ReconnectPolicy {
    pub fn delay_for(&self, retry_count: usize) -> Duration {
        let secs = self
            .delays_secs
            .get(retry_count)
            .copied()
            .unwrap_or(self.max_delay_secs);
        Duration::from_secs(secs)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollerConfig {
    pub limit: u32,
    pub timeout_secs: u64,
    pub auto_reconnect: bool,
    pub reconnect: ReconnectPolicy,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            auto_reconnect: true,
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Long-polling loop state: the offset, fetched-but-undelivered updates and
/// the consecutive failure count. One poller per bot token.
pub struct UpdatePoller<S = ApiClient> {
    source: S,
    config: PollerConfig,
    offset: i64,
    buffer: VecDeque<Update>,
    retry_count: usize,
    identity: Option<User>,
}

impl<S: UpdateSource> UpdatePoller<S> {
    pub fn new(source: S, config: PollerConfig) -> Self {
        Self {
            source,
            config,
            offset: 0,
            buffer: VecDeque::new(),
            retry_count: 0,
            identity: None,
        }
    }

    /// The bot's own user, needed to filter by addressee.
    pub fn set_identity(&mut self, identity: User) {
        self.identity = Some(identity);
    }

    pub fn offset(&self) -> i64 {
        self.offset
    }

    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Next update in fetch order.
    ///
    /// With auto-reconnect on this only returns once an update is available;
    /// failed fetches are retried per the reconnect policy. With it off, the
    /// first failed fetch is returned to the caller.
    ///
    /// When `only_addressed_to_self` is set, messages not meant for this bot
    /// are dropped, though the offset still moves past them.
    pub async fn next_update(&mut self, only_addressed_to_self: bool) -> Result<Update, BotError> {
        if only_addressed_to_self && self.identity.is_none() {
            return Err(BotError::IdentityUnknown);
        }

        loop {
            while let Some(update) = self.buffer.pop_front() {
                if only_addressed_to_self && !self.is_for_us(&update) {
                    debug!("Skipping update {} not addressed to this bot", update.update_id);
                    continue;
                }
                return Ok(update);
            }
            self.fetch().await?;
        }
    }

    fn is_for_us(&self, update: &Update) -> bool {
        match (&update.message, &self.identity) {
            (Some(message), Some(bot)) => message.is_addressed_to(bot),
            (Some(_), None) => false,
            (None, _) => true,
        }
    }

    /// One successful fetch, retrying failures when allowed. An empty result
    /// still counts as success; the server already held the request open.
    async fn fetch(&mut self) -> Result<(), TransportError> {
        loop {
            let result = self
                .source
                .fetch_updates(self.offset, self.config.limit, self.config.timeout_secs)
                .await;

            match result {
                Ok(updates) => {
                    if self.retry_count > 0 {
                        info!("Update polling recovered after {} retries", self.retry_count);
                    }
                    self.retry_count = 0;
                    self.enqueue(updates);
                    return Ok(());
                }
                Err(e) if !self.config.auto_reconnect => {
                    warn!("Fetching updates failed: {}", e);
                    return Err(e);
                }
                Err(e) => {
                    let delay = self.config.reconnect.delay_for(self.retry_count);
                    self.retry_count += 1;
                    warn!(
                        "Fetching updates failed (attempt {}), retrying in {:?}: {}",
                        self.retry_count, delay, e
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn enqueue(&mut self, mut updates: Vec<Update>) {
        // Anything below the current offset was already acknowledged.
        updates.retain(|u| u.update_id >= self.offset);
        updates.sort_by_key(|u| u.update_id);
        if let Some(last) = updates.last() {
            self.offset = last.update_id + 1;
        }
        debug!("Fetched {} updates, next offset {}", updates.len(), self.offset);
        self.buffer.extend(updates);
    }
}
