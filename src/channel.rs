//! Channel identity extracted from the session header block.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::headers::{HeaderSet, SessionHeader};

/// Direction of the channel attached to an outbound-socket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallDirection {
    /// A call that arrived at the switch from outside.
    Inbound,
    /// A leg this gateway originated, reconnecting after answer.
    Outbound,
}

impl CallDirection {
    /// Classify a `Channel-Direction` value. Only the exact value `inbound`
    /// is inbound; everything else, including a missing header, is treated
    /// as an originated leg.
    pub fn from_channel_direction(value: &str) -> Self {
        if value == "inbound" {
            Self::Inbound
        } else {
            Self::Outbound
        }
    }
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inbound => "inbound",
            Self::Outbound => "outbound",
        };
        f.write_str(name)
    }
}

/// Error returned when parsing an invalid call direction string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseCallDirectionError(pub String);

impl fmt::Display for ParseCallDirectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown call direction: {}", self.0)
    }
}

impl std::error::Error for ParseCallDirectionError {}

impl FromStr for CallDirection {
    type Err = ParseCallDirectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s
            .to_lowercase()
            .as_str()
        {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            _ => Err(ParseCallDirectionError(s.to_string())),
        }
    }
}

/// Who a call is from and to, as far as call-flow routing is concerned.
///
/// For an inbound call both parties come from the SIP headers. An originated
/// leg's SIP "from" is the trunk identity, so the logical caller is recovered
/// from the `jeego_outbound_number` channel variable stamped at origination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallParties {
    /// Switch-assigned channel UUID.
    pub uuid: String,
    /// Inbound call or originated leg.
    pub direction: CallDirection,
    /// Logical caller.
    pub from: String,
    /// Destination used for routing.
    pub to: String,
}

impl CallParties {
    /// Extract identity from a channel-data header block. Missing headers
    /// become empty strings.
    pub fn from_headers(headers: &HeaderSet) -> Self {
        let direction =
            CallDirection::from_channel_direction(headers.get_or_empty(SessionHeader::ChannelDirection));

        let from = match direction {
            CallDirection::Inbound => headers.get_or_empty(SessionHeader::SipFromUser),
            CallDirection::Outbound => headers.get_or_empty(SessionHeader::OutboundNumber),
        };

        Self {
            uuid: headers
                .get_or_empty(SessionHeader::ChannelUniqueId)
                .to_string(),
            direction,
            from: from.to_string(),
            to: headers
                .get_or_empty(SessionHeader::SipToUser)
                .to_string(),
        }
    }
}
