//! Protocol constants and configuration defaults

/// Default FreeSWITCH ESL port for inbound connections
pub const DEFAULT_ESL_PORT: u16 = 8021;

/// Maximum `api/response` body size (8MB) - validates Content-Length header
/// No legitimate ESL reply should exceed this (largest is sofia status ~1-2MB)
pub const MAX_MESSAGE_SIZE: usize = 8 * 1024 * 1024;

/// Protocol line terminator; a bare one closes a header block.
pub const LINE_TERMINATOR: &str = "\n";

/// Separator between a header name and its value.
pub const HEADER_DELIMITER: &str = ": ";

/// Content-Type header values
pub const CONTENT_TYPE_AUTH_REQUEST: &str = "auth/request";
pub const CONTENT_TYPE_COMMAND_REPLY: &str = "command/reply";
pub const CONTENT_TYPE_API_RESPONSE: &str = "api/response";

/// Protocol framing header names.
pub const HEADER_CONTENT_TYPE: &str = "Content-Type";
/// Protocol framing header: body length.
pub const HEADER_CONTENT_LENGTH: &str = "Content-Length";
/// Protocol framing header: command reply status.
pub const HEADER_REPLY_TEXT: &str = "Reply-Text";

/// Channel variable stamped on legs this gateway originates; carries the
/// logical caller because the leg's SIP "from" is the trunk identity.
pub const OUTBOUND_NUMBER_VARIABLE: &str = "jeego_outbound_number";

/// Channel variable the `read` application stores collected digits in.
pub const DIGITS_VARIABLE: &str = "digits";

/// What `uuid_getvar` answers for a variable that was never set.
pub const UNDEFINED_VARIABLE: &str = "_undef_";

/// Maximum time the `read` application waits for digits.
pub const READ_DIGIT_TIMEOUT_MS: u64 = 10000;

/// Key that ends digit collection early.
pub const READ_TERMINATOR: &str = "#";

/// Connection timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Default configuration file location.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/jeego.xml";

/// Default text-to-speech engine selected during channel setup.
pub const DEFAULT_TTS_ENGINE: &str = "flite";

/// Default text-to-speech voice selected during channel setup.
pub const DEFAULT_TTS_VOICE: &str = "kal";

/// Default prompt played while collecting digits.
pub const DEFAULT_READ_PROMPT: &str = "conference/8000/conf-pin.wav";
