//! Text/binary disambiguation for byte strings
//!
//! The remote schema does not say whether a byte string is human text or an
//! opaque payload, so we guess from the bytes themselves. This is lossy in
//! spirit: a binary payload that happens to be more than 70% printable ASCII
//! is classified as text, and non-ASCII text with many high bytes is
//! classified as binary. Either way the bytes survive; only their rendering
//! in the artifact differs.

/// Maximum share of non-text bytes tolerated in a text string, in tenths
const NON_TEXT_TENTHS: usize = 3;

/// How a byte string should be represented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Text,
    Binary,
}

/// Classify a byte string as text or binary
///
/// - Any NUL byte makes it binary.
/// - The empty string is text.
/// - Otherwise it is text when at most 30% of its bytes fall outside
///   printable ASCII plus `\n`, `\r`, `\t` and `\b`.
pub fn classify(bytes: &[u8]) -> Kind {
    if bytes.contains(&0) {
        return Kind::Binary;
    }
    if bytes.is_empty() {
        return Kind::Text;
    }

    let non_text = bytes.iter().filter(|&&b| !is_text_byte(b)).count();
    if non_text * 10 <= bytes.len() * NON_TEXT_TENTHS {
        Kind::Text
    } else {
        Kind::Binary
    }
}

fn is_text_byte(b: u8) -> bool {
    matches!(b, 0x20..=0x7e | b'\n' | b'\r' | b'\t' | 0x08)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nul_is_always_binary() {
        assert_eq!(classify(b"\0"), Kind::Binary);
        assert_eq!(classify(b"hello\0world"), Kind::Binary);
        // Mostly printable, still binary
        assert_eq!(classify(b"a perfectly ordinary sentence\0"), Kind::Binary);
    }

    #[test]
    fn test_empty_is_text() {
        assert_eq!(classify(b""), Kind::Text);
    }

    #[test]
    fn test_plain_ascii_is_text() {
        assert_eq!(classify(b"<en-note>Hello</en-note>"), Kind::Text);
        assert_eq!(classify(b"line one\r\nline two\tTabbed\x08"), Kind::Text);
    }

    #[test]
    fn test_boundary_three_of_ten_is_text() {
        let bytes = [b'a', b'b', b'c', b'd', b'e', b'f', b'g', 0x01, 0x02, 0xff];
        assert_eq!(classify(&bytes), Kind::Text);
    }

    #[test]
    fn test_boundary_four_of_ten_is_binary() {
        let bytes = [b'a', b'b', b'c', b'd', b'e', b'f', 0x01, 0x02, 0x7f, 0xff];
        assert_eq!(classify(&bytes), Kind::Binary);
    }

    #[test]
    fn test_mostly_printable_binary_is_misclassified_as_text() {
        // A payload with a few control bytes but no NUL reads as text.
        let mut bytes = b"GIF89a-looking-header-bytes".to_vec();
        bytes.extend_from_slice(&[0x01, 0x02, 0x03]);
        assert_eq!(classify(&bytes), Kind::Text);
    }

    #[test]
    fn test_dense_non_ascii_text_is_binary() {
        // "日本語" is nine bytes, all >= 0x80
        assert_eq!(classify("日本語".as_bytes()), Kind::Binary);
    }

    #[test]
    fn test_md5_hash_is_binary() {
        let hash = [
            0x9e, 0x10, 0x7d, 0x9d, 0x37, 0x2b, 0xb6, 0x82, 0x6b, 0xd8, 0x1d, 0x35, 0x42, 0xa4,
            0x19, 0xd6,
        ];
        assert_eq!(classify(&hash), Kind::Binary);
    }
}
