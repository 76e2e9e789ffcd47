use std::sync::Arc;

use crate::alias::{AliasError, AliasTable};
use crate::auri::Auri;
use crate::error::RelationError;

/// Parse the canonical `group/version/kind/namespace/name` form
pub fn parse_auri(text: &str) -> Result<Auri, RelationError> {
    text.parse().map_err(|source| RelationError::Address {
        text: text.to_string(),
        source,
    })
}

/// Turns user-supplied text (an alias or a textual Auri) into an [`Auri`]
///
/// Resolution is purely local: the alias table is read from disk and the
/// relation store is never consulted.
#[derive(Debug, Clone, Default)]
pub struct Resolver {
    aliases: Option<Arc<AliasTable>>,
}

impl Resolver {
    pub fn new(aliases: Arc<AliasTable>) -> Self {
        Self {
            aliases: Some(aliases),
        }
    }

    /// A resolver that only accepts full addresses
    pub fn without_aliases() -> Self {
        Self { aliases: None }
    }

    pub fn aliases(&self) -> Option<&AliasTable> {
        self.aliases.as_deref()
    }

    pub fn resolve(&self, text: &str) -> Result<Auri, RelationError> {
        let text = text.trim();
        if text.contains('/') {
            return parse_auri(text);
        }

        match &self.aliases {
            Some(aliases) => Ok(aliases.resolve(text)?),
            None => Err(AliasError::NotFound(text.to_string()).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_resolves_addresses_and_aliases() {
        let dir = TempDir::new().unwrap();
        let table = Arc::new(AliasTable::in_dir(dir.path()));
        let alpha = Auri::new("db", "v1", "Store", "alpha");
        table.set("a", alpha.clone()).unwrap();

        let resolver = Resolver::new(table);
        assert_eq!(resolver.resolve(" a ").unwrap(), alpha);
        assert_eq!(resolver.resolve("db/v1/Store/default/alpha").unwrap(), alpha);
        assert_eq!(resolver.resolve("b").unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(resolver.resolve("db/v1/Store").unwrap_err().kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_without_aliases() {
        let resolver = Resolver::without_aliases();
        assert_eq!(resolver.resolve("a").unwrap_err().kind(), ErrorKind::NotFound);
    }
}
