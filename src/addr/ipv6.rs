//! Textual IPv6 codec.
//!
//! The parser is an explicit character-driven state machine rather than a
//! split-on-colon pass: every invariant (one `::`, group width, group
//! count, bracket balance) is enforced at the transition where it can
//! first be violated, and the offending input is carried in the error.

use crate::error::Ipv6ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Initial,
    LeftBracket,
    HexDigit,
    FirstColon,
    RegularColon,
    DoubleColon,
    RightBracket,
}

/// Parses an optionally-bracketed IPv6 literal into network-order bytes.
///
/// Groups before the `::` elision fill the result from the front; groups
/// after it are held back and copied into the tail once the input ends,
/// with the middle zero-filled.
pub fn parse(text: &str) -> Result<[u8; 16], Ipv6ParseError> {
    let err = |reason: &'static str| Ipv6ParseError {
        input: text.to_string(),
        reason,
    };

    let mut state = State::Initial;
    let mut bracketed = false;
    let mut elided = false;
    let mut head: Vec<u16> = Vec::with_capacity(8);
    let mut tail: Vec<u16> = Vec::with_capacity(8);
    let mut group: u32 = 0;
    let mut digits: u8 = 0;

    // Guarded by the is_ascii_hexdigit match arms.
    let hexval = |c: char| c.to_digit(16).unwrap_or(0);

    // Commits the current group into head or tail and re-checks the count
    // invariants: eight groups max, seven max beside an elision.
    let commit = |head: &mut Vec<u16>, tail: &mut Vec<u16>, elided: bool, group: u32| {
        if elided {
            tail.push(group as u16);
        } else {
            head.push(group as u16);
        }
        let total = head.len() + tail.len();
        if elided && total > 7 {
            return Err("too many groups beside \"::\"");
        }
        if !elided && total > 8 {
            return Err("more than eight groups");
        }
        Ok(())
    };

    for ch in text.chars() {
        match state {
            State::Initial => match ch {
                '[' => {
                    bracketed = true;
                    state = State::LeftBracket;
                }
                ':' => state = State::FirstColon,
                c if c.is_ascii_hexdigit() => {
                    group = hexval(c);
                    digits = 1;
                    state = State::HexDigit;
                }
                _ => return Err(err("unexpected character")),
            },
            State::LeftBracket => match ch {
                ':' => state = State::FirstColon,
                c if c.is_ascii_hexdigit() => {
                    group = hexval(c);
                    digits = 1;
                    state = State::HexDigit;
                }
                _ => return Err(err("unexpected character after \"[\"")),
            },
            State::FirstColon => match ch {
                ':' => {
                    elided = true;
                    state = State::DoubleColon;
                }
                // A bare leading colon may only begin an elision.
                _ => return Err(err("single leading colon")),
            },
            State::HexDigit => match ch {
                c if c.is_ascii_hexdigit() => {
                    if digits == 4 {
                        return Err(err("group longer than four hex digits"));
                    }
                    group = group * 16 + hexval(c);
                    digits += 1;
                }
                ':' => {
                    commit(&mut head, &mut tail, elided, group).map_err(err)?;
                    state = State::RegularColon;
                }
                ']' => {
                    if !bracketed {
                        return Err(err("unmatched closing bracket"));
                    }
                    commit(&mut head, &mut tail, elided, group).map_err(err)?;
                    state = State::RightBracket;
                }
                _ => return Err(err("unexpected character")),
            },
            State::RegularColon => match ch {
                ':' => {
                    if elided {
                        return Err(err("more than one \"::\""));
                    }
                    elided = true;
                    state = State::DoubleColon;
                }
                c if c.is_ascii_hexdigit() => {
                    group = hexval(c);
                    digits = 1;
                    state = State::HexDigit;
                }
                _ => return Err(err("unexpected character after colon")),
            },
            State::DoubleColon => match ch {
                ':' => return Err(err("colon directly after \"::\"")),
                ']' => {
                    if !bracketed {
                        return Err(err("unmatched closing bracket"));
                    }
                    state = State::RightBracket;
                }
                c if c.is_ascii_hexdigit() => {
                    group = hexval(c);
                    digits = 1;
                    state = State::HexDigit;
                }
                _ => return Err(err("unexpected character after \"::\"")),
            },
            State::RightBracket => return Err(err("trailing characters after \"]\"")),
        }
    }

    match state {
        State::Initial | State::LeftBracket => return Err(err("empty address")),
        State::FirstColon => return Err(err("single leading colon")),
        State::RegularColon => return Err(err("trailing colon")),
        State::HexDigit => {
            commit(&mut head, &mut tail, elided, group).map_err(err)?;
            if bracketed {
                return Err(err("missing closing bracket"));
            }
        }
        State::DoubleColon => {
            if bracketed {
                return Err(err("missing closing bracket"));
            }
        }
        State::RightBracket => {}
    }

    if !elided && head.len() != 8 {
        return Err(err("fewer than eight groups"));
    }

    let mut bytes = [0u8; 16];
    for (i, g) in head.iter().enumerate() {
        bytes[2 * i..2 * i + 2].copy_from_slice(&g.to_be_bytes());
    }
    let tail_start = 16 - 2 * tail.len();
    for (i, g) in tail.iter().enumerate() {
        bytes[tail_start + 2 * i..tail_start + 2 * i + 2].copy_from_slice(&g.to_be_bytes());
    }
    Ok(bytes)
}

/// Renders the RFC 5952 compact form: lowercase hex, leading zeros
/// stripped, and the longest all-zero run (leftmost on ties, length >= 2)
/// elided as `::`.
pub fn format(bytes: &[u8; 16]) -> String {
    let groups = to_groups(bytes);

    let mut best_start = 0;
    let mut best_len = 0;
    let mut i = 0;
    while i < 8 {
        if groups[i] == 0 {
            let start = i;
            while i < 8 && groups[i] == 0 {
                i += 1;
            }
            if i - start > best_len {
                best_start = start;
                best_len = i - start;
            }
        } else {
            i += 1;
        }
    }

    if best_len < 2 {
        return groups
            .iter()
            .map(|g| format!("{:x}", g))
            .collect::<Vec<_>>()
            .join(":");
    }

    let left = groups[..best_start]
        .iter()
        .map(|g| format!("{:x}", g))
        .collect::<Vec<_>>()
        .join(":");
    let right = groups[best_start + best_len..]
        .iter()
        .map(|g| format!("{:x}", g))
        .collect::<Vec<_>>()
        .join(":");
    format!("{}::{}", left, right)
}

/// Renders the fully-expanded canonical form: eight zero-padded groups,
/// never elided. Intended for logs and tests where alignment matters.
pub fn format_full(bytes: &[u8; 16]) -> String {
    to_groups(bytes)
        .iter()
        .map(|g| format!("{:04x}", g))
        .collect::<Vec<_>>()
        .join(":")
}

fn to_groups(bytes: &[u8; 16]) -> [u16; 8] {
    let mut groups = [0u16; 8];
    for (i, g) in groups.iter_mut().enumerate() {
        *g = u16::from_be_bytes([bytes[2 * i], bytes[2 * i + 1]]);
    }
    groups
}
