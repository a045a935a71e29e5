//! Error types for the gateway

use thiserror::Error;

/// Every failure the gateway can surface.
///
/// Transport and protocol errors end the affected call session; document
/// errors end the call flow (the session then attempts a hangup); origination
/// errors are reported back to the HTTP trigger.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Socket read/write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection in the middle of a message.
    #[error("connection closed by peer")]
    ConnectionClosed,

    /// A configured read deadline expired.
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Malformed framing (bad `Content-Length`, invalid UTF-8, injection attempt).
    #[error("protocol error: {message}")]
    ProtocolError { message: String },

    /// A header value could not be interpreted.
    #[error("invalid header: {header}")]
    InvalidHeader { header: String },

    /// Reply with a `Content-Type` that is neither `command/reply` nor `api/response`.
    #[error("unrecognized response format: {content_type}")]
    UnrecognizedResponse { content_type: String },

    /// The switch rejected the shared secret.
    #[error("authentication failed: {reason}")]
    AuthFailed { reason: String },

    /// The switch answered a command with `-ERR`.
    #[error("command failed: {reply_text}")]
    CommandFailed { reply_text: String },

    /// Transport failure while fetching a call-flow document.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The document server answered with a non-2xx status.
    #[error("remote host returned status {status} for url: {url}")]
    FetchStatus { url: String, status: u16 },

    /// Malformed call-flow XML.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// A call-flow element the interpreter does not know.
    #[error("invalid call-flow command: {0}")]
    UnknownCommand(String),

    /// A call-flow element lacks an attribute it needs.
    #[error("<{command}> is missing required attribute '{attribute}'")]
    MissingAttribute {
        command: &'static str,
        attribute: &'static str,
    },

    /// A call-flow attribute has a value of the wrong shape.
    #[error("<{command}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidAttribute {
        command: &'static str,
        attribute: &'static str,
        value: String,
    },

    /// The payload is well-formed XML but not a usable document (no root
    /// element, truncated).
    #[error("invalid call-flow document: {0}")]
    InvalidDocument(String),

    /// Chained `Read` documents went deeper than `MaxDocumentDepth`.
    #[error("call-flow documents nested deeper than {max_depth}")]
    DepthExceeded { max_depth: usize },

    /// A caller or destination number unfit for a dial string.
    #[error("invalid number: {0:?}")]
    InvalidNumber(String),

    /// The configuration file could not be read or mapped.
    #[error("configuration error: {0}")]
    Config(String),

    /// The configuration XML did not match the expected shape.
    #[error("configuration error: {0}")]
    ConfigFormat(#[from] quick_xml::DeError),
}

/// Result alias used across the crate.
pub type GatewayResult<T> = Result<T, GatewayError>;

impl GatewayError {
    pub(crate) fn protocol_error(message: impl Into<String>) -> Self {
        GatewayError::ProtocolError {
            message: message.into(),
        }
    }

    pub(crate) fn auth_failed(reason: impl Into<String>) -> Self {
        GatewayError::AuthFailed {
            reason: reason.into(),
        }
    }

    /// Whether the error came from the connection itself rather than from
    /// something the switch or the document server said.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            GatewayError::Io(_) | GatewayError::ConnectionClosed | GatewayError::Timeout { .. }
        )
    }
}
