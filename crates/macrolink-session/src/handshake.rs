//! Session bootstrap: the identity line.
//!
//! On session start the engine announces exactly one identity line before
//! any handler may run: a one-character mark naming its capability profile,
//! followed by opaque attribute text for the startup layer. Until that line
//! is consumed no call frame may be created; anything else arriving first is
//! a handshake violation.

use crate::error::{Result, SessionError};

/// Mark character for the narrow (byte-oriented) profile.
pub const NARROW_MARK: char = 'n';
/// Mark character for the wide (full Unicode) profile.
pub const WIDE_MARK: char = 'w';

/// Capability profile of an engine variant.
///
/// The profile gates which character codes may appear in token lists sent
/// to the engine: a narrow engine only handles single bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineProfile {
    /// Byte-oriented engine: token characters are limited to U+00FF.
    Narrow,
    /// Full-Unicode engine.
    Wide,
}

impl EngineProfile {
    /// The one-character identity mark for this profile.
    pub fn mark(self) -> char {
        match self {
            EngineProfile::Narrow => NARROW_MARK,
            EngineProfile::Wide => WIDE_MARK,
        }
    }

    /// Reverse of [`EngineProfile::mark`].
    pub fn from_mark(mark: char) -> Option<EngineProfile> {
        match mark {
            NARROW_MARK => Some(EngineProfile::Narrow),
            WIDE_MARK => Some(EngineProfile::Wide),
            _ => None,
        }
    }

    /// Largest character code usable in tokens for this profile.
    pub fn max_char_code(self) -> u32 {
        match self {
            EngineProfile::Narrow => 0xFF,
            EngineProfile::Wide => char::MAX as u32,
        }
    }
}

/// The engine's announced identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineIdentity {
    pub profile: EngineProfile,
    /// Opaque trailing text from the identity line. Owned by the startup
    /// layer (transport descriptors, option echoes); the dispatcher only
    /// carries it.
    pub attributes: String,
}

impl EngineIdentity {
    pub fn new(profile: EngineProfile) -> Self {
        Self {
            profile,
            attributes: String::new(),
        }
    }

    pub fn with_attributes(profile: EngineProfile, attributes: impl Into<String>) -> Self {
        Self {
            profile,
            attributes: attributes.into(),
        }
    }

    /// Render the identity line (without the newline).
    pub fn encode(&self) -> String {
        format!("{}{}", self.profile.mark(), self.attributes)
    }

    /// Parse a received identity line.
    ///
    /// Anything that does not start with a known mark fails with
    /// [`SessionError::HandshakeExpected`], carrying the offending line.
    pub fn parse(line: &str) -> Result<EngineIdentity> {
        let mut chars = line.chars();
        let mark = chars
            .next()
            .ok_or_else(|| SessionError::HandshakeExpected(line.to_string()))?;
        let profile = EngineProfile::from_mark(mark)
            .ok_or_else(|| SessionError::HandshakeExpected(line.to_string()))?;
        Ok(EngineIdentity {
            profile,
            attributes: chars.as_str().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mark_roundtrip() {
        for profile in [EngineProfile::Narrow, EngineProfile::Wide] {
            assert_eq!(EngineProfile::from_mark(profile.mark()), Some(profile));
        }
        assert_eq!(EngineProfile::from_mark('q'), None);
    }

    #[test]
    fn identity_roundtrip() {
        let identity = EngineIdentity::with_attributes(EngineProfile::Wide, "pipe:7");
        let line = identity.encode();
        assert_eq!(line, "wpipe:7");
        assert_eq!(EngineIdentity::parse(&line).unwrap(), identity);
    }

    #[test]
    fn identity_without_attributes() {
        let parsed = EngineIdentity::parse("n").unwrap();
        assert_eq!(parsed.profile, EngineProfile::Narrow);
        assert!(parsed.attributes.is_empty());
    }

    #[test]
    fn non_identity_lines_rejected() {
        for line in ["", "idouble", "r42", "zmark"] {
            assert!(
                matches!(
                    EngineIdentity::parse(line),
                    Err(SessionError::HandshakeExpected(ref got)) if got == line
                ),
                "line {line:?} should be a handshake violation"
            );
        }
    }

    #[test]
    fn narrow_profile_caps_character_codes() {
        assert_eq!(EngineProfile::Narrow.max_char_code(), 0xFF);
        assert!(EngineProfile::Wide.max_char_code() >= 0x10FFFF);
    }
}
