//! The single-line message grammar shared by both dispatchers.
//!
//! Every dispatcher-level line is either an invoke (`i` + handler name) or a
//! return (`r` + value text). Handler arguments and block payloads follow as
//! additional lines owned by the handler contract, not by this grammar.

/// Prefix of an invoke line.
pub const INVOKE_PREFIX: char = 'i';
/// Prefix of a return line.
pub const RETURN_PREFIX: char = 'r';

/// One dispatcher-level message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Ask the peer to execute the named handler.
    Invoke { handler: String },
    /// Complete the peer's pending invocation with a value.
    Return { value: String },
}

impl Message {
    /// Parse a received line. Returns `None` for anything outside the
    /// grammar; the dispatcher treats that as a fatal unexpected message.
    pub fn parse(line: &str) -> Option<Message> {
        let mut chars = line.chars();
        match chars.next()? {
            INVOKE_PREFIX => Some(Message::Invoke {
                handler: chars.as_str().to_string(),
            }),
            RETURN_PREFIX => Some(Message::Return {
                value: chars.as_str().to_string(),
            }),
            _ => None,
        }
    }

    /// Encode this message as one line (without the newline).
    pub fn encode(&self) -> String {
        match self {
            Message::Invoke { handler } => format!("{INVOKE_PREFIX}{handler}"),
            Message::Return { value } => format!("{RETURN_PREFIX}{value}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_invoke() {
        assert_eq!(
            Message::parse("idouble"),
            Some(Message::Invoke {
                handler: "double".to_string()
            })
        );
    }

    #[test]
    fn parse_return_with_and_without_value() {
        assert_eq!(
            Message::parse("r42"),
            Some(Message::Return {
                value: "42".to_string()
            })
        );
        assert_eq!(
            Message::parse("r"),
            Some(Message::Return {
                value: String::new()
            })
        );
    }

    #[test]
    fn parse_rejects_other_content() {
        assert_eq!(Message::parse(""), None);
        assert_eq!(Message::parse("x whatever"), None);
        assert_eq!(Message::parse("Invoke double"), None);
    }

    #[test]
    fn encode_parse_roundtrip() {
        for message in [
            Message::Invoke {
                handler: "square".to_string(),
            },
            Message::Return {
                value: "6*6".to_string(),
            },
            Message::Return {
                value: String::new(),
            },
        ] {
            assert_eq!(Message::parse(&message.encode()), Some(message));
        }
    }
}
