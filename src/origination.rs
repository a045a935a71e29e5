//! Starting new calls through the switch's inbound event socket.
//!
//! The originated leg is told to connect back to the gateway's outbound
//! socket on answer, carrying the logical caller in
//! [`OUTBOUND_NUMBER_VARIABLE`] so the reconnecting session can route it.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    command::{EslCommand, ReplyStatus},
    config::Config,
    constants::{DEFAULT_TIMEOUT_MS, OUTBOUND_NUMBER_VARIABLE},
    error::{GatewayError, GatewayResult},
    protocol::{EslFramer, MessageType},
};

/// Establish a TCP connection with a timeout.
async fn tcp_connect_with_timeout(addr: &str) -> GatewayResult<TcpStream> {
    match timeout(
        Duration::from_millis(DEFAULT_TIMEOUT_MS),
        TcpStream::connect(addr),
    )
    .await
    {
        Ok(Ok(s)) => {
            debug!("[CONNECT] TCP connection to {} established", addr);
            Ok(s)
        }
        Ok(Err(e)) => {
            warn!("[CONNECT] TCP connect to {} failed: {}", addr, e);
            Err(GatewayError::Io(e))
        }
        Err(_) => {
            warn!(
                "[CONNECT] TCP connect to {} timed out after {}ms",
                addr, DEFAULT_TIMEOUT_MS
            );
            Err(GatewayError::Timeout {
                timeout_ms: DEFAULT_TIMEOUT_MS,
            })
        }
    }
}

/// Reject numbers that would break out of the originate dial string.
fn validate_number(number: &str) -> GatewayResult<()> {
    let bad = number.is_empty()
        || number
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, ',' | '{' | '}' | '\'' | '@' | '/'));
    if bad {
        return Err(GatewayError::InvalidNumber(number.to_string()));
    }
    Ok(())
}

/// Argument of `api originate` for a call from `from` to `to`.
pub fn originate_arg(config: &Config, from: &str, to: &str) -> String {
    format!(
        "{{{}={},execute_on_answer='socket {} full'}}{} &park()",
        OUTBOUND_NUMBER_VARIABLE,
        from,
        config.callback_addr(),
        config.trunk_dial_string(to)
    )
}

/// One-shot client for the inbound event socket.
#[derive(Debug, Clone)]
pub struct OriginationClient {
    config: Arc<Config>,
}

impl OriginationClient {
    pub fn new(config: Arc<Config>) -> Self {
        Self { config }
    }

    /// Authenticate on a fresh connection.
    async fn authenticate(&self, framer: &mut EslFramer<TcpStream>) -> GatewayResult<()> {
        debug!("[AUTH] Waiting for auth request from FreeSWITCH");
        let greeting = framer
            .read_header_block()
            .await?;
        if MessageType::of(&greeting) != MessageType::AuthRequest {
            return Err(GatewayError::protocol_error("Expected auth request"));
        }

        let reply = framer
            .request(&EslCommand::Auth {
                password: self
                    .config
                    .inbound_password
                    .clone(),
            })
            .await?;
        if ReplyStatus::classify(&reply) == ReplyStatus::Err {
            return Err(GatewayError::auth_failed(reply));
        }
        debug!("[AUTH] Authentication successful");
        Ok(())
    }

    /// Ask the switch to call `to` through the trunk on behalf of `from`.
    ///
    /// `api originate` blocks until the far end answers or the attempt
    /// fails, so this returns the switch's `+OK <uuid>` only for a call that
    /// is already up. No read deadline applies.
    pub async fn originate(&self, from: &str, to: &str) -> GatewayResult<String> {
        validate_number(from)?;
        validate_number(to)?;

        let stream = tcp_connect_with_timeout(&self.config.inbound_dial_to).await?;
        let mut framer = EslFramer::new(stream);
        self.authenticate(&mut framer)
            .await?;

        let command = EslCommand::api("originate", [originate_arg(&self.config, from, to)]);
        let reply = framer
            .request(&command)
            .await;
        if let Err(e) = framer
            .shutdown()
            .await
        {
            debug!("[CONNECT] Shutdown after originate failed: {}", e);
        }

        let reply = reply?;
        let reply = reply.trim_end();
        if ReplyStatus::classify(reply) == ReplyStatus::Err {
            warn!("[ORIGINATE] {} -> {} rejected: {}", from, to, reply);
            return Err(GatewayError::CommandFailed {
                reply_text: reply.to_string(),
            });
        }
        info!("[ORIGINATE] {} -> {} accepted: {}", from, to, reply);
        Ok(reply.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn originate_arg_layout() {
        let config = Config::new("callcentric.com", "callcentric.com");
        assert_eq!(
            originate_arg(&config, "15551230000", "18005550199"),
            "{jeego_outbound_number=15551230000,execute_on_answer='socket 127.0.0.1:8084 full'}sofia/gateway/callcentric.com/18005550199@callcentric.com &park()"
        );
    }

    #[test]
    fn originate_arg_uses_callback_addr() {
        let mut config = Config::new("gw", "host");
        config.callback_addr = Some("10.0.0.9:8084".to_string());
        assert!(originate_arg(&config, "1", "2").contains("'socket 10.0.0.9:8084 full'"));
    }

    #[test]
    fn numbers_validated() {
        assert!(validate_number("+15551230000").is_ok());
        assert!(validate_number("").is_err());
        assert!(validate_number("1 2").is_err());
        assert!(validate_number("1,origination_caller_id_number=666").is_err());
        assert!(validate_number("1}sofia/x").is_err());
    }
}
