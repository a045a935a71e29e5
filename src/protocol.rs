//! ESL framing: header blocks, command writes and reply parsing
//!
//! The control socket carries `Name: value` lines closed by a blank line,
//! optionally followed by a `Content-Length` body. Both directions share one
//! ordered stream, so a reply must be consumed completely before the next
//! command is written; [`EslFramer`] is therefore used strictly
//! request-then-reply by its single owner.

use std::future::Future;
use std::time::Duration;

use percent_encoding::percent_decode_str;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, trace};

use crate::{
    command::EslCommand,
    constants::{
        CONTENT_TYPE_API_RESPONSE, CONTENT_TYPE_AUTH_REQUEST, CONTENT_TYPE_COMMAND_REPLY,
        HEADER_CONTENT_LENGTH, HEADER_CONTENT_TYPE, HEADER_DELIMITER, HEADER_REPLY_TEXT,
        LINE_TERMINATOR, MAX_MESSAGE_SIZE,
    },
    error::{GatewayError, GatewayResult},
    headers::HeaderSet,
};

/// ESL message types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    /// Authentication request from server
    AuthRequest,
    /// Command reply
    CommandReply,
    /// API response
    ApiResponse,
    /// Anything else (or no Content-Type at all)
    Unknown(String),
}

impl MessageType {
    /// Parse message type from Content-Type header
    pub fn from_content_type(content_type: &str) -> Self {
        match content_type {
            CONTENT_TYPE_AUTH_REQUEST => MessageType::AuthRequest,
            CONTENT_TYPE_COMMAND_REPLY => MessageType::CommandReply,
            CONTENT_TYPE_API_RESPONSE => MessageType::ApiResponse,
            other => MessageType::Unknown(other.to_string()),
        }
    }

    /// Message type of a header block.
    pub fn of(headers: &HeaderSet) -> Self {
        Self::from_content_type(headers.get_or_empty(HEADER_CONTENT_TYPE))
    }
}

/// Whether header values are percent-decoded while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ValueEncoding {
    Raw,
    PercentEncoded,
}

/// Header-block scanner state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    InHeaders,
    Done,
}

/// Split one header line on the first `": "`.
///
/// This is the only end-of-block test: a blank line has no delimiter, and
/// neither does any other malformed line, so both close the block.
fn split_header_line(line: &str) -> Option<(&str, &str)> {
    line.trim_end_matches(['\n', '\r'])
        .split_once(HEADER_DELIMITER)
}

fn decode_value(raw_value: &str) -> String {
    percent_decode_str(raw_value)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw_value.to_string())
}

/// Await an I/O future, bounded by `deadline` when one is configured.
async fn with_deadline<T>(
    deadline: Option<Duration>,
    fut: impl Future<Output = std::io::Result<T>>,
) -> GatewayResult<T> {
    let result = match deadline {
        None => fut.await,
        Some(d) => match tokio::time::timeout(d, fut).await {
            Ok(r) => r,
            Err(_) => {
                return Err(GatewayError::Timeout {
                    timeout_ms: d.as_millis() as u64,
                })
            }
        },
    };
    result.map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => GatewayError::ConnectionClosed,
        _ => GatewayError::Io(e),
    })
}

/// Line-oriented reader/writer over one control-socket stream.
pub struct EslFramer<S> {
    stream: BufReader<S>,
    read_timeout: Option<Duration>,
}

impl<S> std::fmt::Debug for EslFramer<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EslFramer")
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl<S> EslFramer<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap a connected stream. Reads block indefinitely.
    pub fn new(stream: S) -> Self {
        Self {
            stream: BufReader::new(stream),
            read_timeout: None,
        }
    }

    /// Bound every individual read by `timeout` (`None` = wait forever).
    pub fn with_read_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Read one `\n`-terminated line. EOF before the terminator is
    /// [`GatewayError::ConnectionClosed`].
    async fn next_line(&mut self) -> GatewayResult<String> {
        let mut buf = Vec::new();
        let deadline = self.read_timeout;
        let n = with_deadline(deadline, self.stream.read_until(b'\n', &mut buf)).await?;
        if n == 0 || !buf.ends_with(LINE_TERMINATOR.as_bytes()) {
            return Err(GatewayError::ConnectionClosed);
        }
        String::from_utf8(buf).map_err(|_| GatewayError::protocol_error("Invalid UTF-8 in headers"))
    }

    async fn read_block(&mut self, encoding: ValueEncoding) -> GatewayResult<HeaderSet> {
        let mut headers = HeaderSet::new();
        let mut state = ScanState::InHeaders;

        while state == ScanState::InHeaders {
            let line = self
                .next_line()
                .await?;
            state = match split_header_line(&line) {
                Some((key, value)) => {
                    let value = match encoding {
                        ValueEncoding::Raw => value.to_string(),
                        ValueEncoding::PercentEncoded => decode_value(value),
                    };
                    headers.insert(key, value);
                    ScanState::InHeaders
                }
                None => {
                    if !line
                        .trim_end_matches(['\n', '\r'])
                        .is_empty()
                    {
                        trace!("[RECV] Header block closed by line without delimiter");
                    }
                    ScanState::Done
                }
            };
        }

        trace!("[RECV] Read header block with {} headers", headers.len());
        Ok(headers)
    }

    /// Read one header block, values verbatim.
    pub async fn read_header_block(&mut self) -> GatewayResult<HeaderSet> {
        self.read_block(ValueEncoding::Raw)
            .await
    }

    /// Read the channel-data block of an outbound session; values are
    /// percent-decoded.
    pub async fn read_session_headers(&mut self) -> GatewayResult<HeaderSet> {
        self.read_block(ValueEncoding::PercentEncoded)
            .await
    }

    /// Write pre-formatted lines followed by a blank line, then flush.
    pub async fn write_command<L: AsRef<str>>(&mut self, lines: &[L]) -> GatewayResult<()> {
        let mut out = String::new();
        for line in lines {
            out.push_str(line.as_ref());
            out.push_str(LINE_TERMINATOR);
        }
        out.push_str(LINE_TERMINATOR);

        self.stream
            .write_all(out.as_bytes())
            .await?;
        self.stream
            .flush()
            .await?;
        Ok(())
    }

    /// Encode and write a typed command.
    pub async fn send(&mut self, command: &EslCommand) -> GatewayResult<()> {
        let lines = command.to_wire_lines()?;
        debug!("[SEND] {}", command.log_line());
        self.write_command(&lines)
            .await
    }

    /// Read the body that follows an `api/response` header block.
    async fn read_body(&mut self, headers: &HeaderSet) -> GatewayResult<String> {
        let length_str = headers
            .get(HEADER_CONTENT_LENGTH)
            .ok_or_else(|| GatewayError::protocol_error("api/response without Content-Length"))?;
        let length: usize = length_str
            .trim()
            .parse()
            .map_err(|_| GatewayError::InvalidHeader {
                header: format!("{}: {}", HEADER_CONTENT_LENGTH, length_str),
            })?;

        if length > MAX_MESSAGE_SIZE {
            return Err(GatewayError::protocol_error(format!(
                "Message too large: Content-Length {} exceeds limit {}",
                length, MAX_MESSAGE_SIZE
            )));
        }

        let mut body = vec![0u8; length];
        let deadline = self.read_timeout;
        with_deadline(deadline, self.stream.read_exact(&mut body)).await?;
        trace!("[RECV] Read {} byte api/response body", length);

        String::from_utf8(body).map_err(|_| GatewayError::protocol_error("Invalid UTF-8 in body"))
    }

    /// Read one reply and return its payload.
    ///
    /// `command/reply` yields the `Reply-Text` value; `api/response` yields
    /// exactly `Content-Length` bytes of body. Anything else is
    /// [`GatewayError::UnrecognizedResponse`].
    pub async fn parse_reply(&mut self) -> GatewayResult<String> {
        let headers = self
            .read_header_block()
            .await?;
        match MessageType::of(&headers) {
            MessageType::CommandReply => {
                let text = headers
                    .get_or_empty(HEADER_REPLY_TEXT)
                    .to_string();
                trace!("[RECV] command/reply: {}", text);
                Ok(text)
            }
            MessageType::ApiResponse => {
                self.read_body(&headers)
                    .await
            }
            MessageType::AuthRequest | MessageType::Unknown(_) => {
                Err(GatewayError::UnrecognizedResponse {
                    content_type: headers
                        .get(HEADER_CONTENT_TYPE)
                        .unwrap_or("<none>")
                        .to_string(),
                })
            }
        }
    }

    /// Send a command and block for its reply payload.
    pub async fn request(&mut self, command: &EslCommand) -> GatewayResult<String> {
        self.send(command)
            .await?;
        self.parse_reply()
            .await
    }

    /// Shut down the write half so the peer sees EOF.
    pub async fn shutdown(&mut self) -> GatewayResult<()> {
        self.stream
            .shutdown()
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{duplex, DuplexStream};

    /// Framer whose peer has already written `input` and hung up.
    async fn framer_over(input: &[u8]) -> EslFramer<DuplexStream> {
        let (ours, mut theirs) = duplex(64 * 1024);
        theirs
            .write_all(input)
            .await
            .unwrap();
        drop(theirs);
        EslFramer::new(ours)
    }

    #[test]
    fn test_split_header_line() {
        assert_eq!(
            split_header_line("Content-Type: api/response\n"),
            Some(("Content-Type", "api/response"))
        );
        assert_eq!(
            split_header_line("Reply-Text: +OK a: b\r\n"),
            Some(("Reply-Text", "+OK a: b"))
        );
        assert_eq!(split_header_line("\n"), None);
        assert_eq!(split_header_line("no-delimiter-here\n"), None);
        assert_eq!(split_header_line("Key:value\n"), None);
    }

    #[tokio::test]
    async fn test_read_well_formed_block() {
        let mut framer =
            framer_over(b"Content-Type: command/reply\nReply-Text: +OK\nX-Dup: 1\nX-Dup: 2\n\n")
                .await;
        let headers = framer
            .read_header_block()
            .await
            .unwrap();

        assert_eq!(headers.len(), 3);
        assert_eq!(headers.get("Content-Type"), Some("command/reply"));
        assert_eq!(headers.get("Reply-Text"), Some("+OK"));
        assert_eq!(headers.get("X-Dup"), Some("2"));
    }

    #[tokio::test]
    async fn test_line_without_delimiter_truncates_block() {
        let mut framer =
            framer_over(b"A: 1\nthis line is malformed\nB: 2\n\nContent-Type: api/response\n\n")
                .await;
        let first = framer
            .read_header_block()
            .await
            .unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first.get("A"), Some("1"));
        assert_eq!(first.get("B"), None);

        // The lines after the malformed one are left on the stream.
        let second = framer
            .read_header_block()
            .await
            .unwrap();
        assert_eq!(second.get("B"), Some("2"));
    }

    #[tokio::test]
    async fn test_crlf_lines() {
        let mut framer = framer_over(b"Content-Type: command/reply\r\nReply-Text: +OK\r\n\r\n").await;
        let headers = framer
            .read_header_block()
            .await
            .unwrap();
        assert_eq!(headers.get("Reply-Text"), Some("+OK"));
    }

    #[tokio::test]
    async fn test_eof_before_block_end() {
        let mut framer = framer_over(b"Content-Type: command/reply\nReply-Te").await;
        let err = framer
            .read_header_block()
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_session_headers_are_decoded() {
        let mut framer = framer_over(
            b"Channel-Name: sofia/internal/1000%40example.com\nCaller-Caller-ID-Name: John%20Doe\n\n",
        )
        .await;
        let headers = framer
            .read_session_headers()
            .await
            .unwrap();
        assert_eq!(
            headers.get("Channel-Name"),
            Some("sofia/internal/1000@example.com")
        );
        assert_eq!(headers.get("Caller-Caller-ID-Name"), Some("John Doe"));
    }

    #[tokio::test]
    async fn test_reply_headers_are_not_decoded() {
        let mut framer = framer_over(b"Content-Type: command/reply\nReply-Text: +OK 100%25\n\n").await;
        assert_eq!(
            framer
                .parse_reply()
                .await
                .unwrap(),
            "+OK 100%25"
        );
    }

    #[tokio::test]
    async fn test_parse_command_reply_keeps_spaces() {
        let mut framer =
            framer_over(b"Content-Type: command/reply\nReply-Text: -ERR no such  channel \n\n").await;
        assert_eq!(
            framer
                .parse_reply()
                .await
                .unwrap(),
            "-ERR no such  channel "
        );
    }

    #[tokio::test]
    async fn test_parse_api_response_body_is_raw() {
        let body = "a: b\n\nKey: value\n";
        let input = format!(
            "Content-Type: api/response\nContent-Length: {}\n\n{}Content-Type: command/reply\nReply-Text: +OK\n\n",
            body.len(),
            body
        );
        let mut framer = framer_over(input.as_bytes()).await;
        assert_eq!(
            framer
                .parse_reply()
                .await
                .unwrap(),
            body
        );
        // The stream is positioned right after the body.
        assert_eq!(
            framer
                .parse_reply()
                .await
                .unwrap(),
            "+OK"
        );
    }

    #[tokio::test]
    async fn test_parse_api_response_empty_body() {
        let mut framer = framer_over(b"Content-Type: api/response\nContent-Length: 0\n\n").await;
        assert_eq!(
            framer
                .parse_reply()
                .await
                .unwrap(),
            ""
        );
    }

    #[tokio::test]
    async fn test_api_response_missing_length() {
        let mut framer = framer_over(b"Content-Type: api/response\n\n1234").await;
        let err = framer
            .parse_reply()
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::ProtocolError { .. }));
    }

    #[tokio::test]
    async fn test_api_response_non_numeric_length() {
        let mut framer = framer_over(b"Content-Type: api/response\nContent-Length: four\n\n1234").await;
        let err = framer
            .parse_reply()
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidHeader { .. }));
    }

    #[tokio::test]
    async fn test_api_response_oversized_length() {
        let input = format!(
            "Content-Type: api/response\nContent-Length: {}\n\n",
            MAX_MESSAGE_SIZE + 1
        );
        let mut framer = framer_over(input.as_bytes()).await;
        assert!(matches!(
            framer
                .parse_reply()
                .await
                .unwrap_err(),
            GatewayError::ProtocolError { .. }
        ));
    }

    #[tokio::test]
    async fn test_api_response_short_body() {
        let mut framer = framer_over(b"Content-Type: api/response\nContent-Length: 10\n\n123").await;
        assert!(matches!(
            framer
                .parse_reply()
                .await
                .unwrap_err(),
            GatewayError::ConnectionClosed
        ));
    }

    #[tokio::test]
    async fn test_unrecognized_content_type() {
        let mut framer = framer_over(b"Content-Type: text/event-plain\n\n").await;
        let err = framer
            .parse_reply()
            .await
            .unwrap_err();
        assert!(
            matches!(err, GatewayError::UnrecognizedResponse { ref content_type } if content_type == "text/event-plain")
        );

        let mut framer = framer_over(b"Reply-Text: +OK\n\n").await;
        assert!(matches!(
            framer
                .parse_reply()
                .await
                .unwrap_err(),
            GatewayError::UnrecognizedResponse { .. }
        ));
    }

    #[tokio::test]
    async fn test_write_command_appends_blank_line() {
        let (ours, mut theirs) = duplex(1024);
        let mut framer = EslFramer::new(ours);
        framer
            .write_command(&["sendmsg", "call-command: execute", "execute-app-name: answer"])
            .await
            .unwrap();
        framer
            .shutdown()
            .await
            .unwrap();

        let mut written = String::new();
        theirs
            .read_to_string(&mut written)
            .await
            .unwrap();
        assert_eq!(
            written,
            "sendmsg\ncall-command: execute\nexecute-app-name: answer\n\n"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_timeout() {
        let (ours, _theirs) = duplex(1024);
        let mut framer = EslFramer::new(ours).with_read_timeout(Some(Duration::from_millis(250)));
        let err = framer
            .read_header_block()
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { timeout_ms: 250 }));
    }

    #[test]
    fn test_message_type() {
        assert_eq!(
            MessageType::from_content_type("auth/request"),
            MessageType::AuthRequest
        );
        assert_eq!(
            MessageType::from_content_type("api/response"),
            MessageType::ApiResponse
        );
        assert_eq!(
            MessageType::of(&HeaderSet::new()),
            MessageType::Unknown(String::new())
        );
    }
}
