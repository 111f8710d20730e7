//! Textual IPv4 codec: strict dotted-quad form.

/// Parses `a.b.c.d` into network-order bytes. Exactly four decimal
/// octets, each 0-255; anything else is rejected.
pub fn parse(text: &str) -> Option<[u8; 4]> {
    let mut bytes = [0u8; 4];
    let mut parts = 0;
    for part in text.split('.') {
        if parts == 4 || part.is_empty() || part.len() > 3 {
            return None;
        }
        if !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let value: u16 = part.parse().ok()?;
        if value > 255 {
            return None;
        }
        bytes[parts] = value as u8;
        parts += 1;
    }
    if parts == 4 { Some(bytes) } else { None }
}

pub fn format(bytes: &[u8; 4]) -> String {
    format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
}
