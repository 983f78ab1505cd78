// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP string escapes (ISO 10303-21 §6.4.3)

/// Decodes the escapes of a raw STEP string body.
///
/// Handles `''`, `\\`, `\S\c` (high half of ISO 8859-1), `\X\hh`
/// (ISO 8859-1 byte), `\X2\…\X0\` (UTF-16) and `\X4\…\X0\` (UTF-32).
/// Code page switches `\PA\` … `\PI\` are dropped. Malformed escapes are kept
/// verbatim.
pub fn decode_step_string(raw: &str) -> String {
    if memchr::memchr2(b'\\', b'\'', raw.as_bytes()).is_none() {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(i) = memchr::memchr2(b'\\', b'\'', rest.as_bytes()) {
        out.push_str(&rest[..i]);
        let tail = &rest[i..];

        if let Some(after) = tail.strip_prefix("''") {
            out.push('\'');
            rest = after;
        } else if let Some(after) = tail.strip_prefix("\\\\") {
            out.push('\\');
            rest = after;
        } else if let Some((decoded, after)) = tail
            .strip_prefix("\\X2\\")
            .and_then(|body| decode_wide(body, 4))
        {
            out.push_str(&decoded);
            rest = after;
        } else if let Some((decoded, after)) = tail
            .strip_prefix("\\X4\\")
            .and_then(|body| decode_wide(body, 8))
        {
            out.push_str(&decoded);
            rest = after;
        } else if let Some(byte) = tail.strip_prefix("\\X\\").and_then(|body| hex_value(body, 2)) {
            out.push(char::from(byte as u8));
            rest = &tail[5..];
        } else if let Some(c) = tail
            .strip_prefix("\\S\\")
            .and_then(|body| body.bytes().next())
            .filter(u8::is_ascii)
        {
            out.push(char::from(c + 0x80));
            rest = &tail[4..];
        } else if is_code_page_switch(tail) {
            rest = &tail[4..];
        } else {
            out.push_str(&tail[..1]);
            rest = &tail[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Value of the first `digits` ASCII hex digits of `s`.
fn hex_value(s: &str, digits: usize) -> Option<u32> {
    let bytes = s.as_bytes().get(..digits)?;
    bytes.iter().try_fold(0u32, |acc, &b| {
        char::from(b).to_digit(16).map(|d| (acc << 4) | d)
    })
}

/// Decodes hex groups of `width` digits up to `\X0\`.
fn decode_wide(body: &str, width: usize) -> Option<(String, &str)> {
    let end = body.find("\\X0\\")?;
    let hex = &body[..end];
    if hex.len() % width != 0 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let values = (0..hex.len())
        .step_by(width)
        .map(|at| hex_value(&hex[at..], width))
        .collect::<Option<Vec<u32>>>()?;

    let decoded = if width == 4 {
        char::decode_utf16(values.iter().map(|&v| v as u16))
            .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    } else {
        values
            .iter()
            .map(|&v| char::from_u32(v).unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    };
    Some((decoded, &body[end + 4..]))
}

fn is_code_page_switch(tail: &str) -> bool {
    let b = tail.as_bytes();
    b.len() >= 4 && b[0] == b'\\' && b[1] == b'P' && (b'A'..=b'I').contains(&b[2]) && b[3] == b'\\'
}
