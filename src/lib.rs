//! FreeSWITCH call-control gateway driven by remote XML call flows
//!
//! FreeSWITCH hands each call to the gateway through its outbound event
//! socket. The gateway answers, looks the destination number up in a static
//! route table and evaluates the call-flow document served at the matching
//! URL: speak text, collect digits (which selects the next document) or
//! bridge to a trunk.
//!
//! # Architecture
//!
//! - [`ConnectionListener`] accepts connections and spawns one task each
//! - [`CallSession`] owns one connection from `connect` to close
//! - [`Interpreter`] fetches documents through a [`DocumentFetcher`] and runs
//!   their commands against the session
//! - [`OriginationClient`] places new calls through the inbound socket; the
//!   answered leg reconnects as an ordinary session
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use jeego::{Config, ConnectionListener, GatewayError, HttpFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), GatewayError> {
//!     let config = Arc::new(Config::load("/etc/jeego.xml")?);
//!     let fetcher = Arc::new(HttpFetcher::new()?);
//!
//!     ConnectionListener::bind(config, fetcher)
//!         .await?
//!         .run()
//!         .await
//! }
//! ```
//!
//! Configure FreeSWITCH to connect to the gateway:
//! ```xml
//! <action application="socket" data="127.0.0.1:8084 full"/>
//! ```
//!
//! A call-flow document:
//! ```xml
//! <Response>
//!   <Say message="Enter your PIN"/>
//!   <Read digits="4" action="http://flows.example/pin.xml"/>
//! </Response>
//! ```

#[macro_use]
mod macros;

pub mod app;
pub mod callflow;
pub mod channel;
pub mod command;
pub mod config;
pub mod constants;
pub mod error;
pub mod headers;
pub mod http;
pub mod listener;
pub mod origination;
pub mod protocol;
pub mod routes;
pub mod session;

pub use app::dptools::AppCommand;
pub use callflow::{CallFlowDocument, Command, DocumentFetcher, HttpFetcher, Interpreter};
pub use channel::{CallDirection, CallParties};
pub use command::{EslCommand, ReplyStatus};
pub use config::Config;
pub use constants::DEFAULT_ESL_PORT;
pub use error::{GatewayError, GatewayResult};
pub use headers::{HeaderSet, SessionHeader};
pub use listener::ConnectionListener;
pub use origination::OriginationClient;
pub use protocol::EslFramer;
pub use routes::{RouteRule, RouteTable};
pub use session::{CallSession, SessionOutcome, SessionState};
