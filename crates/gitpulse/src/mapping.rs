//! Author-name normalization table.
//!
//! The table maps raw author names, as recorded in commits, to canonical
//! names. It is loaded once per run and passed by reference to the
//! persistence step.
//!
//! The file is TOML with a single `[authors]` table:
//!
//! ```toml
//! [authors]
//! "alice.w" = "Alice Wong"
//! "Alice Wong (laptop)" = "Alice Wong"
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Errors loading an author map.
#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Failed to read author map {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid author map {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct MappingFile {
    #[serde(default)]
    authors: HashMap<String, String>,
}

/// Read-only lookup from raw author name to canonical name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthorMap {
    names: HashMap<String, String>,
}

impl AuthorMap {
    /// Build a map from `(raw, canonical)` pairs. Keys are trimmed; blank
    /// keys and blank canonical names are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let names = pairs
            .into_iter()
            .filter_map(|(raw, canonical)| {
                let raw = raw.as_ref().trim();
                let canonical = canonical.as_ref().trim();
                (!raw.is_empty() && !canonical.is_empty())
                    .then(|| (raw.to_string(), canonical.to_string()))
            })
            .collect();
        Self { names }
    }

    /// Parse a map from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        let file: MappingFile = toml::from_str(text)?;
        Ok(Self::from_pairs(file.authors))
    }

    /// Load a map from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MappingError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MappingError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text).map_err(|source| MappingError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load a map, falling back to an empty one if the file is missing or
    /// invalid. The failure is logged.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(map) => {
                tracing::info!(entries = map.len(), "Loaded author map");
                map
            }
            Err(e) => {
                tracing::warn!("{e}; author names will be stored unmapped");
                Self::default()
            }
        }
    }

    /// The canonical name for `raw`, or `raw` itself when it has no entry.
    #[must_use]
    pub fn map<'a>(&'a self, raw: &'a str) -> &'a str {
        self.names
            .get(raw.trim())
            .map(String::as_str)
            .unwrap_or(raw)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unknown_names_map_to_themselves() {
        let map = AuthorMap::default();
        assert_eq!(map.map("Alice"), "Alice");
        assert!(map.is_empty());
    }

    #[test]
    fn test_keys_are_trimmed() {
        let map = AuthorMap::from_pairs([(" alice.w ", "Alice Wong"), ("", "Nobody")]);
        assert_eq!(map.len(), 1);
        assert_eq!(map.map("alice.w"), "Alice Wong");
        assert_eq!(map.map("  alice.w"), "Alice Wong");
        assert_eq!(map.map("Alice.W"), "Alice.W");
    }

    #[test]
    fn test_parses_authors_table() {
        let map = AuthorMap::from_toml_str(
            r#"
            [authors]
            "alice.w" = "Alice Wong"
            "bob" = "Bob Stone"
            "#,
        )
        .expect("valid mapping");
        assert_eq!(map.len(), 2);
        assert_eq!(map.map("bob"), "Bob Stone");
    }

    #[test]
    fn test_missing_table_is_empty() {
        let map = AuthorMap::from_toml_str("").expect("empty file is valid");
        assert!(map.is_empty());
    }

    #[test]
    fn test_load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[authors]\n\"alice.w\" = \"Alice Wong\"").expect("write");

        let map = AuthorMap::load(file.path()).expect("loads");
        assert_eq!(map.map("alice.w"), "Alice Wong");
    }

    #[test]
    fn test_load_reports_missing_and_invalid_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("absent.toml");
        assert!(matches!(
            AuthorMap::load(&missing),
            Err(MappingError::Read { .. })
        ));

        let invalid = dir.path().join("broken.toml");
        std::fs::write(&invalid, "[authors\n").expect("write");
        assert!(matches!(
            AuthorMap::load(&invalid),
            Err(MappingError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_or_empty_falls_back() {
        let dir = tempfile::tempdir().expect("temp dir");
        let map = AuthorMap::load_or_empty(dir.path().join("absent.toml"));
        assert!(map.is_empty());
    }
}
