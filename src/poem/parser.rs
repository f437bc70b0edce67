/// Utility functions for splitting poem text into stanzas

use regex::Regex;
use std::sync::OnceLock;

/// Get the regex pattern for stanza breaks
fn get_stanza_break_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        // One or more lines holding nothing but whitespace
        Regex::new(r"\r?\n(?:[ \t]*\r?\n)+").unwrap()
    })
}

/// Parsed pieces of a plain-text poem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPoem {
    pub title: Option<String>,
    pub stanzas: Vec<Vec<String>>,
}

/// Parse a plain-text poem
///
/// A leading line starting with `#` is taken as the title. Stanzas are
/// separated by blank lines; lines inside a stanza are trimmed and empty
/// ones dropped.
///
/// # Examples
/// ```
/// use calavera_lib::poem::parser::parse_poem;
///
/// let parsed = parse_poem("# Title\n\nuno\ndos\n\ntres");
/// assert_eq!(parsed.title.as_deref(), Some("Title"));
/// assert_eq!(parsed.stanzas, vec![vec!["uno", "dos"], vec!["tres"]]);
/// ```
pub fn parse_poem(text: &str) -> ParsedPoem {
    let mut title = None;
    let mut stanzas = Vec::new();

    for block in get_stanza_break_regex().split(text.trim()) {
        let mut lines: Vec<String> = block
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(|l| l.to_string())
            .collect();

        if title.is_none() && stanzas.is_empty() {
            if let Some(first) = lines.first() {
                if let Some(heading) = first.strip_prefix('#') {
                    title = Some(heading.trim_start_matches('#').trim().to_string());
                    lines.remove(0);
                }
            }
        }

        if !lines.is_empty() {
            stanzas.push(lines);
        }
    }

    ParsedPoem { title, stanzas }
}

/// Split a pre-joined stanza back into its lines
pub fn split_lines(stanza: &str) -> Vec<String> {
    stanza
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(|l| l.to_string())
        .collect()
}
