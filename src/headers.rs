//! Typed header names and the header set read from the control socket.

use std::collections::HashMap;

/// Error returned when parsing an unrecognized session header name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseSessionHeaderError(pub String);

impl std::fmt::Display for ParseSessionHeaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown session header: {}", self.0)
    }
}

impl std::error::Error for ParseSessionHeaderError {}

header_names! {
    error: ParseSessionHeaderError,
    /// Headers of the channel-data block FreeSWITCH sends in reply to
    /// `connect` that the call session reads.
    ///
    /// Channel variables appear with a `variable_` prefix.
    pub enum SessionHeader {
        ChannelUniqueId = "Channel-Unique-ID",
        ChannelDirection = "Channel-Direction",
        SipFromUser = "variable_sip_from_user",
        SipToUser = "variable_sip_to_user",
        OutboundNumber = "variable_jeego_outbound_number",
    }
}

/// Header name → value mapping for one protocol message.
///
/// Rebuilt for every message; a repeated name keeps the last value seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderSet {
    entries: HashMap<String, String>,
}

impl HeaderSet {
    /// Empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a header.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(name.into(), value.into());
    }

    /// Look up a header by name.
    pub fn get(&self, name: impl AsRef<str>) -> Option<&str> {
        self.entries
            .get(name.as_ref())
            .map(|s| s.as_str())
    }

    /// Header value, or `""` when absent.
    pub fn get_or_empty(&self, name: impl AsRef<str>) -> &str {
        self.get(name)
            .unwrap_or("")
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.entries
            .len()
    }

    /// `true` if no header was read.
    pub fn is_empty(&self) -> bool {
        self.entries
            .is_empty()
    }

    /// Iterate over all name/value pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = HeaderSet::new();
        for (k, v) in iter {
            set.insert(k, v);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_round_trip() {
        assert_eq!(
            SessionHeader::ChannelUniqueId.to_string(),
            "Channel-Unique-ID"
        );
        assert_eq!(
            SessionHeader::OutboundNumber.to_string(),
            "variable_jeego_outbound_number"
        );
    }

    #[test]
    fn from_str_exact_spelling() {
        for header in SessionHeader::ALL {
            assert_eq!(header.as_str().parse::<SessionHeader>(), Ok(*header));
        }
        // HeaderSet lookups are case-sensitive, so parsing is too.
        assert!("channel-direction"
            .parse::<SessionHeader>()
            .is_err());
    }

    #[test]
    fn from_str_unknown() {
        let err = "X-Custom".parse::<SessionHeader>();
        assert_eq!(
            err.unwrap_err()
                .to_string(),
            "unknown session header: X-Custom"
        );
    }

    #[test]
    fn header_set_last_write_wins() {
        let mut set = HeaderSet::new();
        set.insert("Reply-Text", "+OK");
        set.insert("Reply-Text", "-ERR again");
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("Reply-Text"), Some("-ERR again"));
    }

    #[test]
    fn header_set_typed_lookup() {
        let set: HeaderSet = [("variable_sip_to_user", "555")]
            .into_iter()
            .collect();
        assert_eq!(set.get(SessionHeader::SipToUser), Some("555"));
        assert_eq!(set.get_or_empty(SessionHeader::SipFromUser), "");
    }
}
