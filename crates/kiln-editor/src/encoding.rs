//! File encoding detection.
//!
//! Detection is by byte-order mark only: UTF-8 with BOM, UTF-16 LE and BE.
//! Without a BOM the bytes are taken as UTF-8. Invalid sequences are
//! replaced with U+FFFD and the result is flagged as lossy; the caller
//! reports that as an encoding error and carries on.
//!
//! The detected encoding is remembered with the document and reused on save.

use std::fmt;

const BOM_UTF8: &[u8] = &[0xEF, 0xBB, 0xBF];
const BOM_UTF16_LE: &[u8] = &[0xFF, 0xFE];
const BOM_UTF16_BE: &[u8] = &[0xFE, 0xFF];

/// Line separator used when writing a document.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

// ---------------------------------------------------------------------------
// TextEncoding
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextEncoding {
    #[default]
    Utf8,
    /// UTF-8 with a leading BOM, written back with one.
    Utf8Bom,
    Utf16Le,
    Utf16Be,
}

impl TextEncoding {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Utf8Bom => "utf-8-sig",
            Self::Utf16Le => "utf-16-le",
            Self::Utf16Be => "utf-16-be",
        }
    }

    /// Encoding announced by the BOM at the start of `bytes`, and the BOM
    /// length.
    #[must_use]
    pub fn sniff(bytes: &[u8]) -> (Self, usize) {
        if bytes.starts_with(BOM_UTF8) {
            (Self::Utf8Bom, BOM_UTF8.len())
        } else if bytes.starts_with(BOM_UTF16_LE) {
            (Self::Utf16Le, BOM_UTF16_LE.len())
        } else if bytes.starts_with(BOM_UTF16_BE) {
            (Self::Utf16Be, BOM_UTF16_BE.len())
        } else {
            (Self::Utf8, 0)
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Decode / encode
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub text: String,
    pub encoding: TextEncoding,
    /// Some bytes were invalid and got replaced.
    pub lossy: bool,
}

/// Decode file contents, detecting the encoding from the BOM.
#[must_use]
pub fn decode(bytes: &[u8]) -> Decoded {
    let (encoding, bom) = TextEncoding::sniff(bytes);
    let body = &bytes[bom..];
    let (text, lossy) = match encoding {
        TextEncoding::Utf8 | TextEncoding::Utf8Bom => match std::str::from_utf8(body) {
            Ok(s) => (s.to_string(), false),
            Err(_) => (String::from_utf8_lossy(body).into_owned(), true),
        },
        TextEncoding::Utf16Le => decode_utf16(body, u16::from_le_bytes),
        TextEncoding::Utf16Be => decode_utf16(body, u16::from_be_bytes),
    };
    Decoded {
        text,
        encoding,
        lossy,
    }
}

fn decode_utf16(body: &[u8], unit: fn([u8; 2]) -> u16) -> (String, bool) {
    let mut lossy = body.len() % 2 != 0;
    let units = body.chunks_exact(2).map(|pair| unit([pair[0], pair[1]]));
    let text = char::decode_utf16(units)
        .map(|r| {
            r.unwrap_or_else(|_| {
                lossy = true;
                char::REPLACEMENT_CHARACTER
            })
        })
        .collect();
    (text, lossy)
}

/// Encode `text` for writing, BOM included where the encoding has one.
#[must_use]
pub fn encode(text: &str, encoding: TextEncoding) -> Vec<u8> {
    match encoding {
        TextEncoding::Utf8 => text.as_bytes().to_vec(),
        TextEncoding::Utf8Bom => [BOM_UTF8, text.as_bytes()].concat(),
        TextEncoding::Utf16Le => {
            let mut out = BOM_UTF16_LE.to_vec();
            out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
            out
        }
        TextEncoding::Utf16Be => {
            let mut out = BOM_UTF16_BE.to_vec();
            out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
            out
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn plain_utf8() {
        let d = decode("héllo\n".as_bytes());
        assert_eq!(d.encoding, TextEncoding::Utf8);
        assert_eq!(d.text, "héllo\n");
        assert!(!d.lossy);
    }

    #[test]
    fn utf8_bom_is_stripped_and_kept_for_save() {
        let bytes = [BOM_UTF8, b"abc"].concat();
        let d = decode(&bytes);
        assert_eq!(d.encoding, TextEncoding::Utf8Bom);
        assert_eq!(d.text, "abc");
        assert_eq!(encode(&d.text, d.encoding), bytes);
    }

    #[test]
    fn utf16_both_orders() {
        let le = [0xFF, 0xFE, b'h', 0, b'i', 0];
        let be = [0xFE, 0xFF, 0, b'h', 0, b'i'];
        assert_eq!(decode(&le).text, "hi");
        assert_eq!(decode(&le).encoding, TextEncoding::Utf16Le);
        assert_eq!(decode(&be).text, "hi");
        assert_eq!(encode("hi", TextEncoding::Utf16Be), be.to_vec());
    }

    #[test]
    fn invalid_utf8_is_replaced_and_flagged() {
        let d = decode(&[b'a', 0xFF, b'b']);
        assert!(d.lossy);
        assert_eq!(d.text, "a\u{FFFD}b");
    }

    #[test]
    fn odd_utf16_tail_is_flagged() {
        let d = decode(&[0xFF, 0xFE, b'x', 0, b'y']);
        assert!(d.lossy);
        assert_eq!(d.text, "x");
    }

    #[test]
    fn empty_file() {
        let d = decode(&[]);
        assert_eq!(d.text, "");
        assert_eq!(d.encoding, TextEncoding::Utf8);
    }
}
