//! Long-polling Bot API client: a request pipeline, an update poller, an
//! ordered command router and a blocking wait that keeps async work moving.

pub mod api;
pub mod bot;
pub mod bridge;
pub mod config;
pub mod error;
pub mod poller;
pub mod router;
pub mod types;

pub use api::{ApiClient, InputFile, Parameters};
pub use bot::{Bot, DispatchOptions};
pub use error::{BotError, TransportError};
pub use poller::{PollerConfig, ReconnectPolicy, UpdatePoller};
pub use router::{Command, ContentType, Context, Handler, Router, RouterOptions};
