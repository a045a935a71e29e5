//! Gateway configuration, loaded once at startup from an XML file.
//!
//! ```xml
//! <Config>
//!   <BindTo>127.0.0.1:8084</BindTo>
//!   <HTTPBindTo>127.0.0.1:8080</HTTPBindTo>
//!   <InboundDialTo>127.0.0.1:8021</InboundDialTo>
//!   <InboundPassword>ClueCon</InboundPassword>
//!   <SofiaGatewayName>callcentric.com</SofiaGatewayName>
//!   <SofiaGatewayHost>callcentric.com</SofiaGatewayHost>
//!   <Routes>
//!     <Rule DID="555" URL="http://flows.example/a.xml"/>
//!   </Routes>
//! </Config>
//! ```
//!
//! The loaded value is never mutated; share it as `Arc<Config>`.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{
    constants::{DEFAULT_ESL_PORT, DEFAULT_READ_PROMPT, DEFAULT_TTS_ENGINE, DEFAULT_TTS_VOICE},
    error::{GatewayError, GatewayResult},
    routes::RouteTable,
};

fn default_bind_to() -> String {
    "127.0.0.1:8084".to_string()
}

fn default_http_bind_to() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_inbound_dial_to() -> String {
    format!("127.0.0.1:{}", DEFAULT_ESL_PORT)
}

fn default_inbound_password() -> String {
    "ClueCon".to_string()
}

fn default_tts_engine() -> String {
    DEFAULT_TTS_ENGINE.to_string()
}

fn default_tts_voice() -> String {
    DEFAULT_TTS_VOICE.to_string()
}

fn default_read_prompt() -> String {
    DEFAULT_READ_PROMPT.to_string()
}

#[derive(Clone, Deserialize)]
pub struct Config {
    /// Address the outbound-socket listener binds; FreeSWITCH connects here.
    #[serde(rename = "BindTo", default = "default_bind_to")]
    pub bind_to: String,

    /// Address of the HTTP trigger endpoint.
    #[serde(rename = "HTTPBindTo", default = "default_http_bind_to")]
    pub http_bind_to: String,

    /// FreeSWITCH inbound event socket used for origination.
    #[serde(rename = "InboundDialTo", default = "default_inbound_dial_to")]
    pub inbound_dial_to: String,

    /// Shared secret for the inbound event socket.
    #[serde(rename = "InboundPassword", default = "default_inbound_password")]
    pub inbound_password: String,

    /// Sofia gateway used for bridging and origination.
    #[serde(rename = "SofiaGatewayName")]
    pub sofia_gateway_name: String,

    /// Host part appended to dialed numbers.
    #[serde(rename = "SofiaGatewayHost")]
    pub sofia_gateway_host: String,

    /// Address originated legs reconnect to; defaults to `BindTo`.
    #[serde(rename = "CallbackAddr", default)]
    pub callback_addr: Option<String>,

    #[serde(rename = "TtsEngine", default = "default_tts_engine")]
    pub tts_engine: String,

    #[serde(rename = "TtsVoice", default = "default_tts_voice")]
    pub tts_voice: String,

    /// Sound played while `Read` collects digits.
    #[serde(rename = "ReadPrompt", default = "default_read_prompt")]
    pub read_prompt: String,

    /// Per-read deadline on the control socket. Absent: wait forever.
    #[serde(rename = "ReadTimeoutMs", default)]
    pub read_timeout_ms: Option<u64>,

    /// Cap on chained `Read` documents. Absent: unbounded.
    #[serde(rename = "MaxDocumentDepth", default)]
    pub max_document_depth: Option<usize>,

    #[serde(rename = "Routes", default)]
    pub routes: RouteTable,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("bind_to", &self.bind_to)
            .field("http_bind_to", &self.http_bind_to)
            .field("inbound_dial_to", &self.inbound_dial_to)
            .field("inbound_password", &"[REDACTED]")
            .field("sofia_gateway_name", &self.sofia_gateway_name)
            .field("sofia_gateway_host", &self.sofia_gateway_host)
            .field("callback_addr", &self.callback_addr)
            .field("tts_engine", &self.tts_engine)
            .field("tts_voice", &self.tts_voice)
            .field("read_prompt", &self.read_prompt)
            .field("read_timeout_ms", &self.read_timeout_ms)
            .field("max_document_depth", &self.max_document_depth)
            .field("routes", &self.routes)
            .finish()
    }
}

impl Config {
    /// Read and parse the configuration file at `path`.
    pub fn load(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)
            .map_err(|e| GatewayError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_xml(&xml)
    }

    /// Parse configuration from an XML string.
    pub fn from_xml(xml: &str) -> GatewayResult<Self> {
        let config: Config = quick_xml::de::from_str(xml)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> GatewayResult<()> {
        for (name, value) in [
            ("BindTo", &self.bind_to),
            ("SofiaGatewayName", &self.sofia_gateway_name),
            ("SofiaGatewayHost", &self.sofia_gateway_host),
        ] {
            if value
                .trim()
                .is_empty()
            {
                return Err(GatewayError::Config(format!("{} must not be empty", name)));
            }
        }
        if self.max_document_depth == Some(0) {
            return Err(GatewayError::Config(
                "MaxDocumentDepth must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// `socket` target originated legs are told to reconnect to.
    pub fn callback_addr(&self) -> &str {
        self.callback_addr
            .as_deref()
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.bind_to)
    }

    /// Per-read deadline for control-socket sessions.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout_ms
            .map(Duration::from_millis)
    }

    /// Sofia dial string for `number` through the configured gateway.
    pub fn trunk_dial_string(&self, number: &str) -> String {
        format!(
            "sofia/gateway/{}/{}@{}",
            self.sofia_gateway_name, number, self.sofia_gateway_host
        )
    }

    /// Minimal configuration, mostly for tests and embedding.
    pub fn new(gateway_name: impl Into<String>, gateway_host: impl Into<String>) -> Self {
        Self {
            bind_to: default_bind_to(),
            http_bind_to: default_http_bind_to(),
            inbound_dial_to: default_inbound_dial_to(),
            inbound_password: default_inbound_password(),
            sofia_gateway_name: gateway_name.into(),
            sofia_gateway_host: gateway_host.into(),
            callback_addr: None,
            tts_engine: default_tts_engine(),
            tts_voice: default_tts_voice(),
            read_prompt: default_read_prompt(),
            read_timeout_ms: None,
            max_document_depth: None,
            routes: RouteTable::default(),
        }
    }

    /// Replace the route table.
    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = routes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"<?xml version="1.0"?>
<Config>
  <BindTo>0.0.0.0:8084</BindTo>
  <HTTPBindTo>0.0.0.0:8080</HTTPBindTo>
  <InboundDialTo>10.0.0.5:8021</InboundDialTo>
  <InboundPassword>s3cret</InboundPassword>
  <SofiaGatewayName>callcentric.com</SofiaGatewayName>
  <SofiaGatewayHost>callcentric.com</SofiaGatewayHost>
  <CallbackAddr>10.0.0.9:8084</CallbackAddr>
  <ReadTimeoutMs>30000</ReadTimeoutMs>
  <MaxDocumentDepth>8</MaxDocumentDepth>
  <Routes>
    <Rule DID="555" URL="http://flows.example/a.xml"/>
    <Rule DID="1000" URL="http://flows.example/b.xml"/>
  </Routes>
</Config>"#;

    #[test]
    fn parse_full_config() {
        let config = Config::from_xml(FULL).unwrap();
        assert_eq!(config.bind_to, "0.0.0.0:8084");
        assert_eq!(config.http_bind_to, "0.0.0.0:8080");
        assert_eq!(config.inbound_dial_to, "10.0.0.5:8021");
        assert_eq!(config.inbound_password, "s3cret");
        assert_eq!(config.callback_addr(), "10.0.0.9:8084");
        assert_eq!(config.read_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.max_document_depth, Some(8));
        assert_eq!(config.routes.len(), 2);
        assert_eq!(
            config
                .routes
                .resolve("1000"),
            Some("http://flows.example/b.xml")
        );
    }

    #[test]
    fn defaults_apply() {
        let config = Config::from_xml(
            "<Config><SofiaGatewayName>gw</SofiaGatewayName><SofiaGatewayHost>host</SofiaGatewayHost></Config>",
        )
        .unwrap();
        assert_eq!(config.bind_to, "127.0.0.1:8084");
        assert_eq!(config.inbound_dial_to, "127.0.0.1:8021");
        assert_eq!(config.tts_engine, "flite");
        assert_eq!(config.tts_voice, "kal");
        assert_eq!(config.read_timeout(), None);
        assert_eq!(config.callback_addr(), "127.0.0.1:8084");
        assert!(config
            .routes
            .is_empty());
    }

    #[test]
    fn missing_gateway_is_an_error() {
        let err = Config::from_xml("<Config><BindTo>127.0.0.1:1</BindTo></Config>").unwrap_err();
        assert!(matches!(err, GatewayError::ConfigFormat(_)));
    }

    #[test]
    fn zero_depth_rejected() {
        let err = Config::from_xml(
            "<Config><SofiaGatewayName>gw</SofiaGatewayName><SofiaGatewayHost>h</SofiaGatewayHost><MaxDocumentDepth>0</MaxDocumentDepth></Config>",
        )
        .unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }

    #[test]
    fn trunk_dial_string() {
        let config = Config::new("callcentric.com", "callcentric.com");
        assert_eq!(
            config.trunk_dial_string("18005550199"),
            "sofia/gateway/callcentric.com/18005550199@callcentric.com"
        );
    }

    #[test]
    fn debug_redacts_password() {
        let config = Config::from_xml(FULL).unwrap();
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("s3cret"));
        assert!(debug_str.contains("REDACTED"));
    }

    #[test]
    fn missing_file() {
        let err = Config::load("/nonexistent/jeego.xml").unwrap_err();
        assert!(matches!(err, GatewayError::Config(_)));
    }
}
