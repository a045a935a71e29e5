//! One outbound-socket connection from FreeSWITCH, from `connect` to close.
//!
//! FreeSWITCH dials the gateway for every call routed to the `socket`
//! application. The session reads the channel data, answers, selects the TTS
//! voice, resolves the destination to a call-flow document and hands control
//! to the [`Interpreter`]. Every command is strictly request-then-reply on
//! the single stream the session owns.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info, warn};

use crate::{
    app::dptools::AppCommand,
    callflow::{fetch::DocumentFetcher, interpreter::Interpreter},
    channel::{CallDirection, CallParties},
    command::{EslCommand, ReplyStatus},
    config::Config,
    error::GatewayResult,
    headers::HeaderSet,
    protocol::EslFramer,
};

/// Lifecycle of a session. States only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SessionState {
    /// Socket accepted, nothing exchanged yet.
    Connected,
    /// Channel data received.
    HeadersRead,
    /// Caller and destination identified.
    DirectionResolved,
    /// `answer` executed.
    Answered,
    /// TTS engine and voice selected.
    SetupComplete,
    /// Destination matched a route.
    RouteResolved,
    /// Call-flow documents are being evaluated.
    Executing,
    /// Connection shut down.
    Closed,
}

/// How a session ended when no error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The call flow ran to its end.
    Completed,
    /// No route for the destination; the call was hung up.
    NoRoute,
}

/// Call session over an accepted control-socket stream.
pub struct CallSession<S> {
    framer: EslFramer<S>,
    config: Arc<Config>,
    headers: HeaderSet,
    parties: Option<CallParties>,
    state: SessionState,
}

impl<S> std::fmt::Debug for CallSession<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallSession")
            .field("parties", &self.parties)
            .field("state", &self.state)
            .finish()
    }
}

impl<S> CallSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, config: Arc<Config>) -> Self {
        let framer = EslFramer::new(stream).with_read_timeout(config.read_timeout());
        Self {
            framer,
            config,
            headers: HeaderSet::new(),
            parties: None,
            state: SessionState::Connected,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Channel data as received with the `connect` reply.
    pub fn headers(&self) -> &HeaderSet {
        &self.headers
    }

    /// Identity of the call, once the channel data has been read.
    pub fn parties(&self) -> Option<&CallParties> {
        self.parties
            .as_ref()
    }

    /// Channel UUID; empty until the channel data has been read.
    pub fn uuid(&self) -> &str {
        self.parties
            .as_ref()
            .map_or("", |p| p.uuid.as_str())
    }

    pub fn from_party(&self) -> &str {
        self.parties
            .as_ref()
            .map_or("", |p| p.from.as_str())
    }

    pub fn to_party(&self) -> &str {
        self.parties
            .as_ref()
            .map_or("", |p| p.to.as_str())
    }

    pub fn direction(&self) -> Option<CallDirection> {
        self.parties
            .as_ref()
            .map(|p| p.direction)
    }

    /// Send `connect` and ingest the channel data block.
    async fn read_channel_data(&mut self) -> GatewayResult<()> {
        self.framer
            .send(&EslCommand::Connect)
            .await?;
        self.headers = self
            .framer
            .read_session_headers()
            .await?;
        self.state = SessionState::HeadersRead;

        let parties = CallParties::from_headers(&self.headers);
        info!(
            "[SESSION] Call {} ({}) from '{}' to '{}'",
            parties.uuid, parties.direction, parties.from, parties.to
        );
        self.parties = Some(parties);
        self.state = SessionState::DirectionResolved;
        Ok(())
    }

    /// Run one command and consume its reply. A `-ERR` reply is logged, not
    /// raised; the switch keeps the channel and the flow continues.
    pub async fn execute(&mut self, command: &EslCommand) -> GatewayResult<()> {
        let reply = self
            .framer
            .request(command)
            .await?;
        if ReplyStatus::classify(&reply) == ReplyStatus::Err {
            warn!("[SESSION] {} rejected: {}", command.log_line(), reply.trim_end());
        }
        Ok(())
    }

    /// Execute a dialplan application with no argument.
    pub async fn execute_app(&mut self, name: &str) -> GatewayResult<()> {
        self.execute(&AppCommand::execute(name, None))
            .await
    }

    /// Execute a dialplan application with one argument string.
    pub async fn execute_app_with_arg(&mut self, name: &str, arg: &str) -> GatewayResult<()> {
        self.execute(&AppCommand::execute(name, Some(arg.to_string())))
            .await
    }

    /// Run `api <name> <uuid> <arg>` and return the payload.
    pub async fn call_api(&mut self, name: &str, arg: &str) -> GatewayResult<String> {
        let command = EslCommand::api(name, [self.uuid(), arg]);
        self.framer
            .request(&command)
            .await
    }

    pub async fn hangup(&mut self) -> GatewayResult<()> {
        self.execute_app("hangup")
            .await
    }

    /// Shut the connection down. Safe to call more than once.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Err(e) = self
            .framer
            .shutdown()
            .await
        {
            debug!("[SESSION] Shutdown of {} failed: {}", self.uuid(), e);
        }
        self.state = SessionState::Closed;
        debug!("[SESSION] Closed {}", self.uuid());
    }

    async fn answer_and_setup(&mut self) -> GatewayResult<()> {
        self.execute(&AppCommand::answer())
            .await?;
        self.state = SessionState::Answered;

        let engine = AppCommand::set_var("tts_engine", &self.config.tts_engine);
        let voice = AppCommand::set_var("tts_voice", &self.config.tts_voice);
        self.execute(&engine)
            .await?;
        self.execute(&voice)
            .await?;
        self.state = SessionState::SetupComplete;
        Ok(())
    }

    async fn drive<F: DocumentFetcher>(&mut self, fetcher: &F) -> GatewayResult<SessionOutcome> {
        self.read_channel_data()
            .await?;
        self.answer_and_setup()
            .await?;

        let route = self
            .config
            .routes
            .resolve(self.to_party())
            .map(str::to_string);
        let url = match route {
            Some(url) => url,
            None => {
                info!(
                    "[SESSION] No route for '{}', hanging up {}",
                    self.to_party(),
                    self.uuid()
                );
                self.hangup()
                    .await?;
                return Ok(SessionOutcome::NoRoute);
            }
        };
        self.state = SessionState::RouteResolved;
        debug!("[SESSION] '{}' routed to {}", self.to_party(), url);

        self.state = SessionState::Executing;
        let config = Arc::clone(&self.config);
        Interpreter::new(&config, fetcher)
            .run(self, &url)
            .await?;
        Ok(SessionOutcome::Completed)
    }

    /// Drive the whole call and close the connection on every path.
    ///
    /// Once the channel data has been read, a failure that left the socket
    /// usable is followed by a best-effort `hangup`.
    pub async fn run<F: DocumentFetcher>(&mut self, fetcher: &F) -> GatewayResult<SessionOutcome> {
        let result = self
            .drive(fetcher)
            .await;

        if let Err(e) = &result {
            warn!("[SESSION] Call {} failed: {}", self.uuid(), e);
            if self.state >= SessionState::DirectionResolved && !e.is_transport() {
                if let Err(hangup_err) = self
                    .hangup()
                    .await
                {
                    debug!("[SESSION] Hangup after failure also failed: {}", hangup_err);
                }
            }
        }

        self.close()
            .await;
        result
    }
}
