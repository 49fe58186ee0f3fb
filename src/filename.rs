//! Expected checksums embedded in filenames.
//!
//! Release groups tag files as `Show - 01 [1A2B3C4D].mkv`.  A tag is exactly
//! eight hex digits between a matching pair of delimiters.  Three delimiter
//! kinds are recognised, in priority order:
//!
//! | Priority | Form         |
//! |----------|--------------|
//! | 1        | `[1A2B3C4D]` |
//! | 2        | `(1A2B3C4D)` |
//! | 3        | `_1A2B3C4D_` |
//!
//! The first kind that occurs anywhere in the name decides; within that kind
//! the last tag in the name wins.  Shorter runs such as `[1234]` are not tags
//! and leading zeroes are never inferred, so `[ABCDEF]` does not match.

use std::path::Path;

use crate::checksum::{Checksum, HEX_DIGITS};

const DELIMITERS: [(u8, u8); 3] = [(b'[', b']'), (b'(', b')'), (b'_', b'_')];

/// Extract the expected checksum from the last component of `path`.
pub fn extract<P: AsRef<Path>>(path: P) -> Option<Checksum> {
    let name = path.as_ref().file_name()?.to_string_lossy();
    extract_from_name(&name)
}

/// Extract the expected checksum from a bare filename.
pub fn extract_from_name(name: &str) -> Option<Checksum> {
    DELIMITERS
        .iter()
        .find_map(|&(open, close)| last_tag(name.as_bytes(), open, close))
}

fn last_tag(bytes: &[u8], open: u8, close: u8) -> Option<Checksum> {
    let width = HEX_DIGITS + 2;
    if bytes.len() < width {
        return None;
    }
    (0..=bytes.len() - width).rev().find_map(|start| {
        let window = &bytes[start..start + width];
        if window[0] != open || window[width - 1] != close {
            return None;
        }
        let digits = &window[1..width - 1];
        if !digits.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
        // ASCII hex digits are valid UTF-8 on their own.
        std::str::from_utf8(digits).ok().and_then(|s| Checksum::from_hex(s).ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn square_bracket_tag() {
        assert_eq!(extract_from_name("movie[DEADBEEF].mkv"), Some(Checksum(0xDEAD_BEEF)));
    }

    #[test]
    fn tag_digits_are_case_insensitive() {
        assert_eq!(
            extract_from_name("movie[deadbeef].mkv"),
            extract_from_name("movie[DEADBEEF].mkv")
        );
    }

    #[test]
    fn untagged_name() {
        assert_eq!(extract_from_name("movie.mkv"), None);
        assert_eq!(extract_from_name(""), None);
    }

    #[test]
    fn last_tag_wins() {
        assert_eq!(extract_from_name("a[1234].b[ABCDEF01].mkv"), Some(Checksum(0xABCD_EF01)));
        assert_eq!(
            extract_from_name("[11111111] show [22222222].mkv"),
            Some(Checksum(0x2222_2222))
        );
    }

    #[test]
    fn short_tags_are_not_padded() {
        assert_eq!(extract_from_name("clip[ABCDEF].avi"), None);
        assert_eq!(extract_from_name("clip[0ABCDEF01].avi"), None);
    }

    #[test]
    fn delimiter_priority() {
        assert_eq!(extract_from_name("show (12345678).mkv"), Some(Checksum(0x1234_5678)));
        assert_eq!(extract_from_name("show_12345678_v2.mkv"), Some(Checksum(0x1234_5678)));
        assert_eq!(
            extract_from_name("show (12345678) [87654321].mkv"),
            Some(Checksum(0x8765_4321))
        );
        assert_eq!(
            extract_from_name("show_AAAAAAAA_(BBBBBBBB).mkv"),
            Some(Checksum(0xBBBB_BBBB))
        );
    }

    #[test]
    fn only_the_file_name_is_scanned() {
        assert_eq!(extract("[DEADBEEF]/movie.mkv"), None);
        assert_eq!(extract("dir/movie [CAFEBABE].mkv"), Some(Checksum(0xCAFE_BABE)));
    }

    #[test]
    fn non_ascii_names() {
        assert_eq!(extract_from_name("ĉapitro [0BADF00D].mkv"), Some(Checksum(0x0BAD_F00D)));
        assert_eq!(extract_from_name("[ÄÄÄÄ]"), None);
    }

    proptest! {
        #[test]
        fn never_panics(name in "\\PC*") {
            let _ = extract_from_name(&name);
        }

        #[test]
        fn finds_embedded_tag(prefix in "[a-z ]{0,12}", value in any::<u32>(), suffix in "[a-z.]{0,8}") {
            let name = format!("{prefix}[{value:08x}]{suffix}");
            prop_assert_eq!(extract_from_name(&name), Some(Checksum(value)));
        }
    }
}
