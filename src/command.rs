//! Wire encoding of the commands the gateway sends to FreeSWITCH

use crate::error::{GatewayError, GatewayResult};
use std::fmt;

/// Validate that a user-provided string contains no newline characters.
///
/// ESL commands are line-delimited; embedded newlines would allow injection
/// of arbitrary protocol commands. Document authors control `Say` messages
/// and `Bridge` targets, so this guards every remote-supplied value.
fn validate_no_newlines(s: &str, context: &str) -> GatewayResult<()> {
    if s.contains('\n') || s.contains('\r') {
        return Err(GatewayError::protocol_error(format!(
            "{} must not contain newlines",
            context
        )));
    }
    Ok(())
}

/// Reply-Text classification per the ESL wire protocol.
///
/// FreeSWITCH commands return `+OK …` on success and `-ERR …` on failure.
/// `api` payloads follow the same convention for most commands, while
/// `uuid_getvar` returns the bare value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReplyStatus {
    /// Text starts with `+OK` or is empty.
    Ok,
    /// Text starts with `-ERR`.
    Err,
    /// Text present but matches neither prefix.
    Other,
}

impl ReplyStatus {
    /// Classify a `Reply-Text` value or `api/response` payload.
    pub fn classify(text: &str) -> Self {
        let text = text.trim_start();
        if text.is_empty() || text.starts_with("+OK") {
            ReplyStatus::Ok
        } else if text.starts_with("-ERR") {
            ReplyStatus::Err
        } else {
            ReplyStatus::Other
        }
    }
}

/// ESL command types
#[derive(Clone, PartialEq, Eq)]
pub enum EslCommand {
    /// Start an outbound session; FreeSWITCH answers with the channel data
    Connect,
    /// Authenticate an inbound connection with the shared secret
    Auth { password: String },
    /// Run an API command; `args` are appended space-separated
    Api { command: String, args: Vec<String> },
    /// Execute a dialplan application on the attached channel
    Execute { app: String, args: Option<String> },
}

impl fmt::Debug for EslCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EslCommand::Connect => write!(f, "Connect"),
            EslCommand::Auth { .. } => f
                .debug_struct("Auth")
                .field("password", &"[REDACTED]")
                .finish(),
            EslCommand::Api { command, args } => f
                .debug_struct("Api")
                .field("command", command)
                .field("args", args)
                .finish(),
            EslCommand::Execute { app, args } => f
                .debug_struct("Execute")
                .field("app", app)
                .field("args", args)
                .finish(),
        }
    }
}

impl EslCommand {
    /// API command with arguments.
    pub fn api<I, S>(command: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EslCommand::Api {
            command: command.to_string(),
            args: args
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }

    /// Format a simple one-line command with optional arguments
    fn simple_line(cmd: &str, args: &[&str]) -> String {
        let mut result = String::from(cmd);
        for arg in args {
            result.push(' ');
            result.push_str(arg);
        }
        result
    }

    /// Validate all user-supplied fields, then split into wire lines.
    ///
    /// The returned lines carry no terminators; the framer appends one per
    /// line plus the closing blank line.
    pub fn to_wire_lines(&self) -> GatewayResult<Vec<String>> {
        match self {
            EslCommand::Connect => Ok(vec!["connect".to_string()]),
            EslCommand::Auth { password } => {
                validate_no_newlines(password, "password")?;
                Ok(vec![Self::simple_line("auth", &[password])])
            }
            EslCommand::Api { command, args } => {
                validate_no_newlines(command, "api command")?;
                for arg in args {
                    validate_no_newlines(arg, "api argument")?;
                }
                let args: Vec<&str> = args
                    .iter()
                    .map(|s| s.as_str())
                    .filter(|s| !s.is_empty())
                    .collect();
                Ok(vec![Self::simple_line(
                    &format!("api {}", command),
                    &args,
                )])
            }
            EslCommand::Execute { app, args } => {
                validate_no_newlines(app, "execute app")?;
                let mut lines = vec![
                    "sendmsg".to_string(),
                    "call-command: execute".to_string(),
                    format!("execute-app-name: {}", app),
                ];
                if let Some(a) = args {
                    validate_no_newlines(a, "execute args")?;
                    lines.push(format!("execute-app-arg: {}", a));
                }
                Ok(lines)
            }
        }
    }

    /// One-line description safe for logs (secrets redacted).
    pub fn log_line(&self) -> String {
        match self {
            EslCommand::Auth { .. } => "auth [REDACTED]".to_string(),
            EslCommand::Execute { app, args } => match args {
                Some(a) => format!("execute {} {}", app, a),
                None => format!("execute {}", app),
            },
            other => other
                .to_wire_lines()
                .map(|lines| lines.join(" "))
                .unwrap_or_else(|_| format!("{:?}", other)),
        }
    }
}
