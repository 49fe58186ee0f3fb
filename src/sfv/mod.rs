//! SFV (Simple File Verification) manifest parser.
//!
//! # Format
//! ```text
//! ; comment lines start with a semicolon
//! sub/dir/file1.bin 1A2B3C4D
//! name with spaces.bin deadbeef
//! ```
//! One entry per line: a path, whitespace, then exactly eight hex digits.
//! The checksum is always the final whitespace-delimited token, so paths may
//! contain spaces.  Blank lines and `;` comments are skipped.  Paths may use
//! either `/` or `\` as the directory separator.
//!
//! # Encoding
//! Lines are decoded as UTF-8.  A line that is not valid UTF-8 is decoded as
//! Latin-1, which is what most legacy SFV writers produce.  A UTF-8 byte
//! order mark on the first line is dropped.
//!
//! # Errors
//! Parsing is per line.  A malformed line yields
//! [`SfvError::MalformedLine`] and the iterator moves on to the next line.
//! Only an I/O error ends the iteration early.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::checksum::Checksum;

const COMMENT: char = ';';
const BOM: char = '\u{FEFF}';

#[derive(Error, Debug)]
pub enum SfvError {
    #[error("line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

// ── ManifestEntry ────────────────────────────────────────────────────────────

/// One `path checksum` line of a manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// The path exactly as written in the manifest.
    pub path:     String,
    pub checksum: Checksum,
    /// 1-based line number within the manifest.
    pub line:     usize,
}

impl ManifestEntry {
    /// The entry path as a relative [`PathBuf`], treating both `/` and `\`
    /// as separators.
    pub fn relative_path(&self) -> PathBuf {
        split_components(&self.path).collect()
    }
}

/// Split a manifest path on either separator, dropping empty and `.` parts.
pub fn split_components(path: &str) -> impl Iterator<Item = &str> {
    path.split(|c| c == '/' || c == '\\').filter(|c| !c.is_empty() && *c != ".")
}

// ── Parser ───────────────────────────────────────────────────────────────────

/// Lazy line-by-line manifest reader.
///
/// Restarting means constructing a new parser over a fresh reader.
pub struct SfvParser<R: BufRead> {
    reader:  R,
    line_no: usize,
    buf:     Vec<u8>,
    done:    bool,
}

impl<R: BufRead> SfvParser<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, line_no: 0, buf: Vec::new(), done: false }
    }

    fn next_line(&mut self) -> io::Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_no += 1;
        let text = match String::from_utf8(std::mem::take(&mut self.buf)) {
            Ok(s)  => s,
            Err(e) => e.into_bytes().iter().map(|&b| b as char).collect(),
        };
        Ok(Some(text))
    }
}

impl<R: BufRead> Iterator for SfvParser<R> {
    type Item = Result<ManifestEntry, SfvError>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let text = match self.next_line() {
                Ok(Some(t)) => t,
                Ok(None)    => { self.done = true; return None; }
                Err(e)      => { self.done = true; return Some(Err(SfvError::Io(e))); }
            };
            let text = if self.line_no == 1 { text.trim_start_matches(BOM) } else { &text };
            if let Some(parsed) = parse_line(text, self.line_no) {
                return Some(parsed);
            }
        }
        None
    }
}

/// Parse manifest text from any buffered reader.
pub fn parse<R: BufRead>(reader: R) -> SfvParser<R> {
    SfvParser::new(reader)
}

/// Open and parse the manifest at `path`.
pub fn parse_file<P: AsRef<Path>>(path: P) -> io::Result<SfvParser<BufReader<File>>> {
    Ok(SfvParser::new(BufReader::new(File::open(path)?)))
}

/// Parse one manifest line.  Returns `None` for blank and comment lines.
pub fn parse_line(text: &str, line: usize) -> Option<Result<ManifestEntry, SfvError>> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.starts_with(COMMENT) {
        return None;
    }

    let malformed = |reason: String| SfvError::MalformedLine { line, reason };

    let Some(split) = trimmed.rfind(char::is_whitespace) else {
        return Some(Err(malformed(format!("expected `path checksum`, found {trimmed:?}"))));
    };
    let (path, token) = trimmed.split_at(split);
    let path  = path.trim_end();
    let token = token.trim_start();

    if path.is_empty() {
        return Some(Err(malformed("missing file path".to_owned())));
    }
    Some(
        Checksum::from_hex(token)
            .map(|checksum| ManifestEntry { path: path.to_owned(), checksum, line })
            .map_err(|e| malformed(format!("bad checksum {token:?}: {e}"))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn entries(text: &str) -> Vec<Result<ManifestEntry, SfvError>> {
        parse(Cursor::new(text.as_bytes().to_vec())).collect()
    }

    #[test]
    fn parses_entries_and_skips_comments() {
        let parsed = entries("; comment\nsub/dir/file1.bin 1A2B3C4D\nfile2.bin deadbeef\n");
        let ok: Vec<ManifestEntry> = parsed.into_iter().map(Result::unwrap).collect();
        assert_eq!(ok.len(), 2);
        assert_eq!(ok[0].path, "sub/dir/file1.bin");
        assert_eq!(ok[0].checksum, Checksum(0x1A2B_3C4D));
        assert_eq!(ok[0].line, 2);
        assert_eq!(ok[1].path, "file2.bin");
        assert_eq!(ok[1].checksum, "DEADBEEF".parse().unwrap());
    }

    #[test]
    fn paths_may_contain_spaces() {
        let parsed = entries("  my file  name.bin\t\tCAFEBABE  \r\n");
        let entry = parsed[0].as_ref().unwrap();
        assert_eq!(entry.path, "my file  name.bin");
        assert_eq!(entry.checksum, Checksum(0xCAFE_BABE));
    }

    #[test]
    fn blank_lines_are_ignored() {
        assert!(entries("\n   \n\t\n; only a comment\n").is_empty());
    }

    #[test]
    fn malformed_lines_do_not_stop_parsing() {
        let parsed = entries("bad.bin 1234\nlonely\n 0BADF00D\ngood.bin 00000001\n");
        assert_eq!(parsed.len(), 4);
        assert!(matches!(parsed[0], Err(SfvError::MalformedLine { line: 1, .. })));
        assert!(matches!(parsed[1], Err(SfvError::MalformedLine { line: 2, .. })));
        assert!(matches!(parsed[2], Err(SfvError::MalformedLine { line: 3, .. })));
        assert_eq!(parsed[3].as_ref().unwrap().checksum, Checksum(1));
    }

    #[test]
    fn latin1_lines_are_decoded() {
        let mut raw = b"caf".to_vec();
        raw.push(0xE9);
        raw.extend_from_slice(b".txt 0000000A\n");
        let parsed: Vec<_> = parse(Cursor::new(raw)).collect();
        assert_eq!(parsed[0].as_ref().unwrap().path, "café.txt");
    }

    #[test]
    fn leading_bom_is_dropped() {
        let parsed = entries("\u{FEFF}a.bin 00000002\n");
        assert_eq!(parsed[0].as_ref().unwrap().path, "a.bin");
    }

    #[test]
    fn both_separator_styles() {
        let parsed = entries("sub\\dir\\x.bin 00000003\n./sub/y.bin 00000004\n");
        let a = parsed[0].as_ref().unwrap();
        let b = parsed[1].as_ref().unwrap();
        assert_eq!(a.relative_path(), Path::new("sub").join("dir").join("x.bin"));
        assert_eq!(b.relative_path(), Path::new("sub").join("y.bin"));
    }
}
