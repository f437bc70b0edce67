// Poem model
// Stanzas are immutable once the poem is built

pub mod parser;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PoemError;

/// The poem bundled with the application
pub const BUNDLED_POEM: &str = include_str!("../../resources/calavera.txt");

/// One verse block of the poem
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stanza {
    lines: Vec<String>,
}

impl Stanza {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Build a stanza from a single pre-joined string
    pub fn from_joined(text: &str) -> Self {
        Self {
            lines: parser::split_lines(text),
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn joined(&self) -> String {
        self.lines.join("\n")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Poem {
    title: Option<String>,
    stanzas: Vec<Stanza>,
}

impl Poem {
    pub fn new(title: Option<String>, stanzas: Vec<Stanza>) -> Self {
        Self { title, stanzas }
    }

    /// Build a poem from groups of lines, one group per stanza
    pub fn from_line_groups<G, L, S>(groups: G) -> Self
    where
        G: IntoIterator<Item = L>,
        L: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            title: None,
            stanzas: groups.into_iter().map(Stanza::new).collect(),
        }
    }

    /// Parse a plain-text poem, rejecting text with no stanzas
    pub fn parse(text: &str) -> Result<Self, PoemError> {
        let parsed = parser::parse_poem(text);
        if parsed.stanzas.is_empty() {
            return Err(PoemError::Empty);
        }

        Ok(Self {
            title: parsed.title,
            stanzas: parsed.stanzas.into_iter().map(Stanza::new).collect(),
        })
    }

    pub fn load(path: &Path) -> Result<Self, PoemError> {
        let text = fs::read_to_string(path).map_err(|source| PoemError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    pub fn bundled() -> Self {
        let parsed = parser::parse_poem(BUNDLED_POEM);
        Self {
            title: parsed.title,
            stanzas: parsed.stanzas.into_iter().map(Stanza::new).collect(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn stanzas(&self) -> &[Stanza] {
        &self.stanzas
    }

    pub fn stanza(&self, index: usize) -> Option<&Stanza> {
        self.stanzas.get(index)
    }

    pub fn len(&self) -> usize {
        self.stanzas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stanzas.is_empty()
    }

    /// The whole poem as one narration blob: title, then stanzas separated
    /// by blank lines
    pub fn narration_text(&self) -> String {
        let mut parts = Vec::with_capacity(self.stanzas.len() + 1);
        if let Some(title) = &self.title {
            parts.push(title.clone());
        }
        parts.extend(self.stanzas.iter().map(Stanza::joined));
        parts.join("\n\n")
    }
}

/// Naming convention for per-stanza audio assets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StanzaAssets {
    dir: PathBuf,
    prefix: String,
    extension: String,
}

impl StanzaAssets {
    pub fn new(dir: impl Into<PathBuf>, prefix: impl Into<String>, extension: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            prefix: prefix.into(),
            extension: extension.into(),
        }
    }

    /// Path of the clip for a 0-based stanza index (files are numbered from 1)
    pub fn path(&self, index: usize) -> PathBuf {
        self.dir
            .join(format!("{}{}.{}", self.prefix, index + 1, self.extension))
    }
}

impl Default for StanzaAssets {
    fn default() -> Self {
        Self::new("assets/audio", "stanza", "wav")
    }
}
