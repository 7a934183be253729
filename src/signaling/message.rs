//! `TAG:payload` signaling messages.

use std::fmt;

/// Acknowledgement the display sends for a received candidate.
pub const ACK: &str = "OK";

/// A tagged signaling message.
///
/// Payloads are session descriptions and candidates, carried verbatim apart
/// from escaping: `\`, CR and LF are written as `\\`, `\r` and `\n` so every
/// message fits on one line. [`Display`](fmt::Display) produces the escaped
/// line and [`parse`](Self::parse) reverses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalingMessage {
    /// Session offer from the console.
    Offer(String),
    /// Session answer from the display.
    Answer(String),
    /// Connectivity candidate from the console.
    Ice(String),
}

impl SignalingMessage {
    const OFFER: &'static str = "OFFER";
    const ANSWER: &'static str = "ANSWER";
    const ICE: &'static str = "ICE";

    /// Parse a line. Returns `None` for an unknown or missing tag.
    ///
    /// The payload is everything after the first `:` and may be empty.
    pub fn parse(line: &str) -> Option<Self> {
        let (tag, payload) = line.split_once(':')?;
        let payload = unescape(payload);
        match tag {
            Self::OFFER => Some(Self::Offer(payload)),
            Self::ANSWER => Some(Self::Answer(payload)),
            Self::ICE => Some(Self::Ice(payload)),
            _ => None,
        }
    }

    /// The wire tag.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Offer(_) => Self::OFFER,
            Self::Answer(_) => Self::ANSWER,
            Self::Ice(_) => Self::ICE,
        }
    }

    /// The unescaped payload.
    pub fn payload(&self) -> &str {
        match self {
            Self::Offer(p) | Self::Answer(p) | Self::Ice(p) => p,
        }
    }

    /// Consume the message, returning its payload.
    pub fn into_payload(self) -> String {
        match self {
            Self::Offer(p) | Self::Answer(p) | Self::Ice(p) => p,
        }
    }
}

impl fmt::Display for SignalingMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.tag(), escape(self.payload()))
    }
}

fn escape(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len());
    for c in payload.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}

// Unknown escapes and a trailing backslash are kept literally.
fn unescape(payload: &str) -> String {
    let mut out = String::with_capacity(payload.len());
    let mut chars = payload.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_tags() {
        assert_eq!(
            SignalingMessage::parse("OFFER:abc"),
            Some(SignalingMessage::Offer("abc".into()))
        );
        assert_eq!(
            SignalingMessage::parse("ANSWER:xyz"),
            Some(SignalingMessage::Answer("xyz".into()))
        );
        assert_eq!(
            SignalingMessage::parse("ICE:candidate:1 1 udp 2122260223"),
            Some(SignalingMessage::Ice("candidate:1 1 udp 2122260223".into()))
        );
        assert_eq!(
            SignalingMessage::parse("OFFER:"),
            Some(SignalingMessage::Offer(String::new()))
        );
    }

    #[test]
    fn rejects_unknown_lines() {
        for line in ["", "OK", "HELLO:x", "offer:abc", "OFFER abc"] {
            assert_eq!(SignalingMessage::parse(line), None, "{line:?}");
        }
    }

    #[test]
    fn multiline_descriptions_fit_on_one_line() {
        let sdp = "v=0\r\no=- 4611 2 IN IP4 127.0.0.1\r\na=path:C:\\games\r\n";
        let line = SignalingMessage::Offer(sdp.into()).to_string();
        assert!(!line.contains(['\r', '\n']));
        assert!(line.starts_with("OFFER:v=0\\r\\no=-"));
        assert_eq!(
            SignalingMessage::parse(&line).map(SignalingMessage::into_payload),
            Some(sdp.to_string())
        );
    }

    #[test]
    fn unknown_escapes_are_kept() {
        assert_eq!(unescape("a\\tb\\"), "a\\tb\\");
    }
}
