//! Upload filename repair.
//!
//! Some clients and proxies decode the UTF-8 bytes of a multipart filename as
//! Latin-1 or Windows-1252, so "Домашка.pdf" arrives as "Ð”Ð¾Ð¼Ð°ÑˆÐºÐ°.pdf".
//! Such names are turned back into the UTF-8 text they started as.

use encoding_rs::{UTF_8, WINDOWS_1252};

/// Name used when nothing usable is left.
const FALLBACK_NAME: &str = "upload";

/// Reinterpret a single-byte-decoded name as UTF-8 where that is what it was.
///
/// Names that are already proper Unicode, or whose bytes are not valid UTF-8,
/// are returned unchanged.
pub fn reinterpret_legacy(name: &str) -> String {
    if name.is_ascii() {
        return name.to_string();
    }

    // Latin-1: every char maps to exactly one byte.
    if name.chars().all(|c| (c as u32) <= 0xFF) {
        let bytes: Vec<u8> = name.chars().map(|c| c as u32 as u8).collect();
        if let Some(decoded) = UTF_8.decode_without_bom_handling_and_without_replacement(&bytes) {
            return decoded.into_owned();
        }
        return name.to_string();
    }

    // Windows-1252 maps 0x80..0x9F to typographic characters such as 'Ÿ' or '€'.
    let (bytes, _, unmappable) = WINDOWS_1252.encode(name);
    if !unmappable {
        if let Some(decoded) = UTF_8.decode_without_bom_handling_and_without_replacement(&bytes) {
            return decoded.into_owned();
        }
    }

    name.to_string()
}

/// Final name for the drive: repaired, without directory parts or control characters.
pub fn normalize(name: &str) -> String {
    let repaired = reinterpret_legacy(name);
    let base = repaired
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default();
    let cleaned: String = base.chars().filter(|c| !c.is_control()).collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() || cleaned == "." || cleaned == ".." {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}
