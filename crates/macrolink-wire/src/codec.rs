//! Token-list serialization.
//!
//! Encodes a [`TokenList`] to a single printable, newline-free line and back.
//! Units are self-terminating, so tokens are concatenated with no separators:
//!
//! - `<marker><char>` — character token, code point ≥ 32
//! - `^<marker><char+0x40>` — character token, code point < 32
//! - `*…*\<name> ` — control sequence; one `*` per escaped name byte, each
//!   byte < 33 rendered inside the name as `␠<byte+0x40>`, terminated by a
//!   single space
//! - `\ ` — the null-name sentinel
//! - `R` — the frozen no-op marker
//!
//! The shift keeps every emitted byte printable: control characters 0–31 land
//! in `@`–`_`. Decoding consumes exactly the characters each unit owns and
//! rejects anything else.

use crate::error::DecodeError;
use crate::token::{Category, Token, TokenList};

/// Character codes below this are caret-escaped in character units.
const CHAR_ESCAPE_BELOW: u32 = 32;
/// Character codes below this are escape units inside a control-sequence
/// name (space itself must be escaped because space terminates the name).
const NAME_ESCAPE_BELOW: u32 = 33;
/// Offset that shifts an escaped code into the printable range.
const ESCAPE_SHIFT: u32 = 0x40;

/// Encode a token list into one newline-free line fragment.
pub fn encode(tokens: &TokenList) -> String {
    let mut out = String::new();
    for token in tokens {
        encode_token(token, &mut out);
    }
    out
}

fn encode_token(token: &Token, out: &mut String) {
    match token {
        Token::Character { ch, category } => {
            let code = *ch as u32;
            if code < CHAR_ESCAPE_BELOW {
                out.push('^');
                out.push(category.marker());
                out.push(shift_up(code));
            } else {
                out.push(category.marker());
                out.push(*ch);
            }
        }
        Token::ControlSequence(name) => {
            let escaped = name
                .chars()
                .filter(|c| (*c as u32) < NAME_ESCAPE_BELOW)
                .count();
            for _ in 0..escaped {
                out.push('*');
            }
            out.push('\\');
            for c in name.chars() {
                let code = c as u32;
                if code < NAME_ESCAPE_BELOW {
                    out.push(' ');
                    out.push(shift_up(code));
                } else {
                    out.push(c);
                }
            }
            out.push(' ');
        }
        Token::FrozenRelax => out.push('R'),
    }
}

/// Decode one line fragment back into a token list.
pub fn decode(line: &str) -> Result<TokenList, DecodeError> {
    let chars: Vec<char> = line.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '\\' | '*' => {
                let (token, next) = decode_control_sequence(&chars, i)?;
                tokens.push(token);
                i = next;
            }
            'R' => {
                tokens.push(Token::FrozenRelax);
                i += 1;
            }
            '^' => {
                let marker = *chars.get(i + 1).ok_or(DecodeError::BadEscape { at: i })?;
                let category =
                    Category::from_marker(marker).ok_or(DecodeError::BadEscape { at: i + 1 })?;
                let shifted = *chars.get(i + 2).ok_or(DecodeError::BadEscape { at: i })?;
                let ch = shift_down(shifted, CHAR_ESCAPE_BELOW)
                    .ok_or(DecodeError::BadEscape { at: i + 2 })?;
                tokens.push(Token::Character { ch, category });
                i += 3;
            }
            marker => {
                let category = Category::from_marker(marker)
                    .ok_or(DecodeError::UnknownCategory { marker, at: i })?;
                let ch = *chars.get(i + 1).ok_or(DecodeError::BadEscape { at: i })?;
                tokens.push(Token::Character { ch, category });
                i += 2;
            }
        }
    }

    Ok(tokens.into_iter().collect())
}

fn decode_control_sequence(chars: &[char], start: usize) -> Result<(Token, usize), DecodeError> {
    let mut i = start;
    let mut escapes = 0usize;
    while i < chars.len() && chars[i] == '*' {
        escapes += 1;
        i += 1;
    }
    if chars.get(i) != Some(&'\\') {
        return Err(DecodeError::BadEscape { at: i });
    }
    i += 1;

    let mut name = String::new();
    for _ in 0..escapes {
        let space = find_space(chars, i).ok_or(DecodeError::UnterminatedName { at: start })?;
        name.extend(&chars[i..space]);
        let shifted = *chars
            .get(space + 1)
            .ok_or(DecodeError::BadEscape { at: space })?;
        let ch = shift_down(shifted, NAME_ESCAPE_BELOW)
            .ok_or(DecodeError::BadEscape { at: space + 1 })?;
        name.push(ch);
        i = space + 2;
    }

    let space = find_space(chars, i).ok_or(DecodeError::UnterminatedName { at: start })?;
    name.extend(&chars[i..space]);
    Ok((Token::ControlSequence(name), space + 1))
}

fn find_space(chars: &[char], from: usize) -> Option<usize> {
    chars[from..].iter().position(|c| *c == ' ').map(|p| from + p)
}

fn shift_up(code: u32) -> char {
    char::from_u32(code + ESCAPE_SHIFT).unwrap_or('\u{FFFD}')
}

fn shift_down(shifted: char, limit: u32) -> Option<char> {
    let code = (shifted as u32).checked_sub(ESCAPE_SHIFT)?;
    if code < limit {
        char::from_u32(code)
    } else {
        None
    }
}
