//! Call-flow document parsing.
//!
//! A document is a root element of any name whose direct children are
//! commands, evaluated in document order:
//!
//! ```xml
//! <Response>
//!   <Say message="Welcome"/>
//!   <Read digits="4" action="http://flows.example/pin.xml"/>
//!   <Bridge did="18005550199"/>
//! </Response>
//! ```

use std::borrow::Cow;
use std::collections::HashMap;

use quick_xml::events::attributes::Attribute;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{GatewayError, GatewayResult};

/// One instruction of a call-flow document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Speak `message` through text-to-speech.
    Say { message: String },
    /// Collect exactly `digits` DTMF digits, then hand control to the
    /// document at `action`, which receives them as the `digits` parameter.
    Read { digits: u32, action: String },
    /// Bridge the call to `did` through the configured trunk.
    Bridge { did: String },
}

impl Command {
    /// Element name of this command.
    pub fn tag(&self) -> &'static str {
        match self {
            Command::Say { .. } => "Say",
            Command::Read { .. } => "Read",
            Command::Bridge { .. } => "Bridge",
        }
    }

    fn from_element(element: &BytesStart<'_>) -> GatewayResult<Self> {
        let name = String::from_utf8_lossy(
            element
                .local_name()
                .as_ref(),
        )
        .into_owned();
        let mut attrs = attributes(element)?;

        match name.as_str() {
            "Say" => Ok(Command::Say {
                message: take_required(&mut attrs, "Say", "message")?,
            }),
            "Read" => {
                let raw_digits = take_required(&mut attrs, "Read", "digits")?;
                let digits = raw_digits
                    .trim()
                    .parse::<u32>()
                    .ok()
                    .filter(|n| *n > 0)
                    .ok_or(GatewayError::InvalidAttribute {
                        command: "Read",
                        attribute: "digits",
                        value: raw_digits.clone(),
                    })?;
                Ok(Command::Read {
                    digits,
                    action: take_required(&mut attrs, "Read", "action")?,
                })
            }
            "Bridge" => Ok(Command::Bridge {
                did: take_required(&mut attrs, "Bridge", "did")?,
            }),
            _ => Err(GatewayError::UnknownCommand(name)),
        }
    }
}

/// Attribute values are normalized before unescaping: a literal newline,
/// carriage return or tab becomes a space. Character references such as
/// `&#10;` are not normalized and survive as control characters.
fn attributes(element: &BytesStart<'_>) -> GatewayResult<HashMap<String, String>> {
    let mut attrs = HashMap::new();
    for attr in element.attributes() {
        let attr = normalize_whitespace(attr.map_err(quick_xml::Error::from)?);
        let key = String::from_utf8_lossy(
            attr.key
                .local_name()
                .as_ref(),
        )
        .into_owned();
        let value = attr
            .unescape_value()?
            .into_owned();
        attrs.insert(key, value);
    }
    Ok(attrs)
}

fn normalize_whitespace(attr: Attribute<'_>) -> Attribute<'_> {
    if !attr
        .value
        .iter()
        .any(|&b| matches!(b, b'\n' | b'\r' | b'\t'))
    {
        return attr;
    }
    let value: Vec<u8> = attr
        .value
        .iter()
        .map(|&b| match b {
            b'\n' | b'\r' | b'\t' => b' ',
            other => other,
        })
        .collect();
    Attribute {
        key: attr.key,
        value: Cow::Owned(value),
    }
}

fn take_required(
    attrs: &mut HashMap<String, String>,
    command: &'static str,
    attribute: &'static str,
) -> GatewayResult<String> {
    attrs
        .remove(attribute)
        .ok_or(GatewayError::MissingAttribute { command, attribute })
}

/// Ordered commands parsed from one fetched payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallFlowDocument {
    commands: Vec<Command>,
}

impl CallFlowDocument {
    /// Parse a document. Any unknown element, missing attribute or XML
    /// error fails the whole document; nothing is returned partially.
    ///
    /// Text, comments, elements nested inside a command, and anything after
    /// the root element closes are ignored.
    pub fn parse(xml: &str) -> GatewayResult<Self> {
        let mut reader = Reader::from_str(xml);
        let mut commands = Vec::new();
        let mut depth = 0usize;
        let mut saw_root = false;

        loop {
            match reader.read_event()? {
                Event::Start(ref e) => {
                    match depth {
                        0 => saw_root = true,
                        1 => commands.push(Command::from_element(e)?),
                        _ => {}
                    }
                    depth += 1;
                }
                Event::Empty(ref e) => match depth {
                    0 => {
                        saw_root = true;
                        break;
                    }
                    1 => commands.push(Command::from_element(e)?),
                    _ => {}
                },
                Event::End(_) => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        break;
                    }
                }
                Event::Eof => {
                    if depth > 0 {
                        return Err(GatewayError::InvalidDocument(
                            "unexpected end of document".to_string(),
                        ));
                    }
                    break;
                }
                _ => {}
            }
        }

        if !saw_root {
            return Err(GatewayError::InvalidDocument(
                "no root element".to_string(),
            ));
        }

        Ok(Self { commands })
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands
            .is_empty()
    }
}

impl IntoIterator for CallFlowDocument {
    type Item = Command;
    type IntoIter = std::vec::IntoIter<Command>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands
            .into_iter()
    }
}

impl std::str::FromStr for CallFlowDocument {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
