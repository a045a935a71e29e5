//! Evaluation of call-flow documents against a live session.

use futures_util::future::BoxFuture;
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::{
    app::dptools::AppCommand,
    callflow::{
        document::{CallFlowDocument, Command},
        fetch::{base_params, merge_params, DocumentFetcher, QueryParams},
    },
    channel::CallParties,
    config::Config,
    constants::{DIGITS_VARIABLE, UNDEFINED_VARIABLE},
    error::{GatewayError, GatewayResult},
    session::CallSession,
};

/// Fetches documents and runs their commands on a session.
///
/// A `Read` hands the collected digits to the document named by its
/// `action`, which is fetched and evaluated before the rest of the current
/// document continues.
pub struct Interpreter<'a, F> {
    config: &'a Config,
    fetcher: &'a F,
}

impl<'a, F: DocumentFetcher> Interpreter<'a, F> {
    pub fn new(config: &'a Config, fetcher: &'a F) -> Self {
        Self { config, fetcher }
    }

    /// Fetch the document at `url` and evaluate it.
    pub async fn run<S>(&self, session: &mut CallSession<S>, url: &str) -> GatewayResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        self.run_document(session, url.to_string(), QueryParams::new(), 1)
            .await
    }

    /// Fetch and parse one document. The query carries the call identity
    /// plus `extra`, which wins on a key collision.
    pub async fn fetch(
        &self,
        parties: &CallParties,
        url: &str,
        extra: &[(String, String)],
    ) -> GatewayResult<CallFlowDocument> {
        let params = merge_params(&base_params(parties), extra);
        let xml = self
            .fetcher
            .fetch(url, &params)
            .await?;
        CallFlowDocument::parse(&xml)
    }

    fn run_document<'s, S>(
        &'s self,
        session: &'s mut CallSession<S>,
        url: String,
        extra: QueryParams,
        depth: usize,
    ) -> BoxFuture<'s, GatewayResult<()>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 's,
    {
        Box::pin(async move {
            if let Some(max_depth) = self.config.max_document_depth {
                if depth > max_depth {
                    return Err(GatewayError::DepthExceeded { max_depth });
                }
            }

            let parties = session
                .parties()
                .cloned()
                .ok_or_else(|| {
                    GatewayError::protocol_error("call flow started before channel data")
                })?;
            info!("[FLOW] Fetching {} for {}", url, parties.uuid);
            let document = self
                .fetch(&parties, &url, &extra)
                .await?;
            debug!("[FLOW] {} yielded {} commands", url, document.len());

            self.evaluate(session, document, depth)
                .await
        })
    }

    /// Runs the commands in order and stops at the first failure.
    async fn evaluate<S>(
        &self,
        session: &mut CallSession<S>,
        document: CallFlowDocument,
        depth: usize,
    ) -> GatewayResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        for command in document {
            self.evaluate_command(session, command, depth)
                .await?;
        }
        Ok(())
    }

    async fn evaluate_command<S>(
        &self,
        session: &mut CallSession<S>,
        command: Command,
        depth: usize,
    ) -> GatewayResult<()>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        debug!("[FLOW] <{}> at depth {}", command.tag(), depth);
        match command {
            Command::Say { message } => {
                session
                    .execute(&AppCommand::speak(&message))
                    .await
            }
            Command::Read { digits, action } => {
                session
                    .execute(&AppCommand::read_digits(digits, &self.config.read_prompt))
                    .await?;

                let collected = session
                    .call_api("uuid_getvar", DIGITS_VARIABLE)
                    .await?;
                // Nothing entered leaves the variable unset.
                let collected = match collected.trim_end_matches(['\n', '\r']) {
                    UNDEFINED_VARIABLE => String::new(),
                    entered => entered.to_string(),
                };
                info!("[FLOW] Collected '{}', continuing at {}", collected, action);

                let extra = vec![(DIGITS_VARIABLE.to_string(), collected)];
                self.run_document(&mut *session, action, extra, depth + 1)
                    .await
            }
            Command::Bridge { did } => {
                let dial_string = self
                    .config
                    .trunk_dial_string(&did);
                session
                    .execute(&AppCommand::bridge(&dial_string))
                    .await
            }
        }
    }
}
