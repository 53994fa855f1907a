//! Output-index to language-name table.

use std::path::Path;

use crate::{Error, Result};

/// Ordered language labels; entry `i` names output class `i`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTable {
    labels: Vec<String>,
}

impl LanguageTable {
    pub fn from_labels<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::InvalidConfig(
                "language table must not be empty".to_owned(),
            ));
        }
        Ok(Self { labels })
    }

    /// Read one label per line. Blank lines are skipped and labels are trimmed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        let text = std::fs::read_to_string(p)
            .map_err(|e| Error::Io(format!("failed to read {}: {e}", p.display())))?;
        Self::from_labels(text.lines().map(str::trim).filter(|l| !l.is_empty()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, idx: usize) -> Option<&str> {
        self.labels.get(idx).map(String::as_str)
    }
}
