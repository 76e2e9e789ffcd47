//! Local alias table
//!
//! Maps short names to fully-qualified [`Auri`]s. The table is owned by the
//! local client environment, never by a digi, and is persisted as a TOML file.
//! Every mutation rewrites the whole file through a temporary file and an
//! atomic rename, so a failed write leaves the previous table in place.
//!
//! Concurrent processes writing the same file race last-write-wins; there is
//! no cross-process locking.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::auri::Auri;

pub const ALIAS_FILE_NAME: &str = "alias.toml";

#[derive(Debug, thiserror::Error)]
pub enum AliasError {
    #[error("alias not found: {0}")]
    NotFound(String),
    #[error("invalid alias name: {0:?}")]
    InvalidName(String),
    #[error("alias file IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("alias file is malformed: {0}")]
    Decode(#[from] toml::de::Error),
    #[error("failed to encode alias table: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: BTreeMap<String, Auri>,
}

/// A single `name -> auri` entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Alias {
    pub name: String,
    pub auri: Auri,
}

/// File-backed alias table
///
/// Loaded lazily on first use and flushed on every mutation.
#[derive(Debug)]
pub struct AliasTable {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, Auri>>>,
}

impl AliasTable {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    /// Alias table stored in `dir/alias.toml`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(ALIAS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Look up an alias; never touches anything but the local file
    pub fn resolve(&self, name: &str) -> Result<Auri, AliasError> {
        let mut cache = self.cache.lock();
        let table = self.loaded(&mut cache)?;
        table
            .get(name)
            .cloned()
            .ok_or_else(|| AliasError::NotFound(name.to_string()))
    }

    /// Insert or overwrite an alias (last write wins)
    pub fn set(&self, name: &str, auri: Auri) -> Result<(), AliasError> {
        validate_name(name)?;
        let mut cache = self.cache.lock();
        let mut table = self.loaded(&mut cache)?.clone();
        if let Some(previous) = table.insert(name.to_string(), auri.clone()) {
            if previous != auri {
                tracing::debug!(alias = name, %previous, %auri, "overwriting alias");
            }
        }
        self.flush(&table)?;
        *cache = Some(table);
        Ok(())
    }

    pub fn remove(&self, name: &str) -> Result<Auri, AliasError> {
        let mut cache = self.cache.lock();
        let mut table = self.loaded(&mut cache)?.clone();
        let removed = table
            .remove(name)
            .ok_or_else(|| AliasError::NotFound(name.to_string()))?;
        self.flush(&table)?;
        *cache = Some(table);
        Ok(removed)
    }

    /// Remove every alias; the file is either fully cleared or left as it was
    pub fn clear(&self) -> Result<(), AliasError> {
        let mut cache = self.cache.lock();
        let empty = BTreeMap::new();
        self.flush(&empty)?;
        *cache = Some(empty);
        Ok(())
    }

    /// All aliases sorted by name
    pub fn list(&self) -> Result<Vec<Alias>, AliasError> {
        let mut cache = self.cache.lock();
        let table = self.loaded(&mut cache)?;
        Ok(table
            .iter()
            .map(|(name, auri)| Alias {
                name: name.clone(),
                auri: auri.clone(),
            })
            .collect())
    }

    fn loaded<'a>(
        &self,
        cache: &'a mut Option<BTreeMap<String, Auri>>,
    ) -> Result<&'a BTreeMap<String, Auri>, AliasError> {
        if cache.is_none() {
            *cache = Some(self.read_file()?);
        }
        Ok(cache.get_or_insert_with(BTreeMap::new))
    }

    fn read_file(&self) -> Result<BTreeMap<String, Auri>, AliasError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => {
                let file: AliasFile = toml::from_str(&contents)?;
                Ok(file.aliases)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn flush(&self, table: &BTreeMap<String, Auri>) -> Result<(), AliasError> {
        let contents = toml::to_string_pretty(&AliasFile {
            aliases: table.clone(),
        })?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(contents.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), AliasError> {
    let invalid = name.is_empty()
        || name
            .chars()
            .any(|c| c == '/' || c == '|' || c.is_whitespace());
    if invalid {
        return Err(AliasError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn alpha() -> Auri {
        Auri::new("db", "v1", "Store", "alpha")
    }

    #[test]
    fn test_missing_file_is_empty_table() {
        let dir = TempDir::new().unwrap();
        let table = AliasTable::in_dir(dir.path());
        assert!(table.list().unwrap().is_empty());
        assert!(matches!(table.resolve("alpha"), Err(AliasError::NotFound(_))));
    }

    #[test]
    fn test_set_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        AliasTable::in_dir(dir.path()).set("a", alpha()).unwrap();

        let reopened = AliasTable::in_dir(dir.path());
        assert_eq!(reopened.resolve("a").unwrap(), alpha());
    }

    #[test]
    fn test_set_overwrites() {
        let dir = TempDir::new().unwrap();
        let table = AliasTable::in_dir(dir.path());
        table.set("a", alpha()).unwrap();
        let beta = Auri::new("db", "v1", "Store", "beta");
        table.set("a", beta.clone()).unwrap();
        assert_eq!(table.resolve("a").unwrap(), beta);
        assert_eq!(table.list().unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_names_rejected() {
        let dir = TempDir::new().unwrap();
        let table = AliasTable::in_dir(dir.path());
        for name in ["", "a/b", "a|b", "a b"] {
            assert!(matches!(
                table.set(name, alpha()),
                Err(AliasError::InvalidName(_))
            ));
        }
    }

    #[test]
    fn test_malformed_file_reports_decode_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(ALIAS_FILE_NAME), "aliases = [[[").unwrap();
        let table = AliasTable::in_dir(dir.path());
        assert!(matches!(table.resolve("a"), Err(AliasError::Decode(_))));
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let table = AliasTable::in_dir(dir.path());
        table.set("a", alpha()).unwrap();
        assert_eq!(table.remove("a").unwrap(), alpha());
        assert!(matches!(table.remove("a"), Err(AliasError::NotFound(_))));
    }
}
