//! Line classification for changes manifests.
//!
//! Each manifest line is one of four shapes. Only the first three carry
//! meaning for the upload; everything else is copied through verbatim.

/// Prefix of the architecture declaration line.
pub const ARCHITECTURE_PREFIX: &str = "Architecture: ";
/// Prefix of the distribution declaration line.
pub const DISTRIBUTION_PREFIX: &str = "Distribution: ";

/// Shortest digest accepted in a file-reference line (an MD5 sum).
const MIN_DIGEST_LEN: usize = 32;
/// Most classifier tokens (section, priority) between size and file name.
const MAX_CLASSIFIERS: usize = 2;

/// A parsed manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `Architecture: <tokens>`.
    Architecture(Vec<&'a str>),
    /// `Distribution: <tokens>`.
    Distribution(Vec<&'a str>),
    /// An indented `<digest> <size> [classifiers] <file>` entry.
    FileReference(FileReference<'a>),
    /// Any other line.
    Opaque,
}

/// One artefact entry from a `Files:` or `Checksums-*:` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReference<'a> {
    /// Hex digest of the artefact.
    pub digest: &'a str,
    /// Size in bytes as written in the manifest: a non-empty run of ASCII
    /// digits of any length.
    pub size: &'a str,
    /// Optional section/priority tokens, at most two.
    pub classifiers: Vec<&'a str>,
    /// File name, the remainder of the line.
    pub file_name: &'a str,
}

/// Classifies a single line with its terminator already removed.
///
/// # Examples
///
/// ```
/// use apt_upload::manifest::line::{LineKind, classify_line};
///
/// assert_eq!(
///     classify_line("Architecture: amd64"),
///     LineKind::Architecture(vec!["amd64"])
/// );
/// assert_eq!(classify_line("Source: hello"), LineKind::Opaque);
/// ```
#[must_use]
pub fn classify_line(line: &str) -> LineKind<'_> {
    if let Some(rest) = line.strip_prefix(ARCHITECTURE_PREFIX) {
        return LineKind::Architecture(rest.split_whitespace().collect());
    }
    if let Some(rest) = line.strip_prefix(DISTRIBUTION_PREFIX) {
        return LineKind::Distribution(rest.split_whitespace().collect());
    }
    parse_file_reference(line).map_or(LineKind::Opaque, LineKind::FileReference)
}

/// Parses an indented file-reference line.
///
/// The accepted shape is: leading whitespace, a lowercase hex digest of at
/// least 32 characters, one whitespace character, a decimal size, up to two
/// lowercase classifier tokens each preceded by one whitespace character, one
/// more whitespace character, then the file name to the end of the line.
/// When fewer classifiers make the line fit, the extra words belong to the
/// file name.
#[must_use]
pub fn parse_file_reference(line: &str) -> Option<FileReference<'_>> {
    let body = line.trim_start_matches(is_field_space);
    if body.len() == line.len() {
        return None;
    }

    let (digest, rest) = take_while(body, |c| c.is_ascii_digit() || ('a'..='f').contains(&c));
    if digest.len() < MIN_DIGEST_LEN {
        return None;
    }
    let rest = skip_one_space(rest)?;

    let (size, rest) = take_while(rest, |c| c.is_ascii_digit());
    if size.is_empty() {
        return None;
    }

    // Classifiers are only taken when a separating space and a file name
    // follow them, so `main readme` yields one classifier and a file name.
    let classifiers = classifier_prefix(rest);
    let consumed: usize = classifiers.iter().map(|word| word.len() + 1).sum();
    let file_name = skip_one_space(rest.get(consumed..)?)?;

    Some(FileReference {
        digest,
        size,
        classifiers,
        file_name,
    })
}

/// Collects up to [`MAX_CLASSIFIERS`] leading ` <lowercase>` words from `rest`.
fn classifier_prefix(rest: &str) -> Vec<&str> {
    let mut words = Vec::new();
    let mut cursor = rest;
    while words.len() < MAX_CLASSIFIERS {
        let Some(after_space) = skip_one_space(cursor) else {
            break;
        };
        let (word, tail) = take_while(after_space, |c| c.is_ascii_lowercase());
        if word.is_empty() || skip_one_space(tail).is_none() {
            break;
        }
        words.push(word);
        cursor = tail;
    }
    words
}

fn take_while(s: &str, pred: impl Fn(char) -> bool) -> (&str, &str) {
    let end = s.find(|c: char| !pred(c)).unwrap_or(s.len());
    s.split_at(end)
}

fn skip_one_space(s: &str) -> Option<&str> {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_field_space(c) => Some(chars.as_str()),
        _ => None,
    }
}

fn is_field_space(c: char) -> bool {
    c.is_ascii_whitespace()
}
