use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::auri::Auri;
use crate::error::RelationError;
use crate::relation::{PipeEdge, PipeRefs};
use crate::resolver::Resolver;
use crate::store::RelationStore;

use super::update::{Edit, Relations};
use super::EngineConfig;

/// Separator between digis in a chain spec
pub const CHAIN_SEPARATOR: char = '|';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipeOp {
    #[default]
    Pipe,
    Unpipe,
}

/// An ordered list of pipe edges, applied left to right
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piper {
    edges: Vec<PipeEdge>,
}

impl Piper {
    /// A single `source -> target` pipe
    pub fn new(resolver: &Resolver, source: &str, target: &str) -> Result<Self, RelationError> {
        let source = resolver.resolve(source)?;
        let target = resolver.resolve(target)?;
        Ok(Self {
            edges: vec![PipeEdge::new(source, target)],
        })
    }

    /// Build `d1 -> d2 -> .. -> dn` from `"d1 | d2 | .. | dn"`
    pub fn from_chain(resolver: &Resolver, spec: &str) -> Result<Self, RelationError> {
        let tokens: Vec<&str> = spec.split(CHAIN_SEPARATOR).map(str::trim).collect();
        if tokens.iter().any(|t| t.is_empty()) {
            return Err(RelationError::PipeSpec(spec.to_string(), "empty element"));
        }
        if tokens.len() < 2 {
            return Err(RelationError::PipeSpec(
                spec.to_string(),
                "a chain needs at least two digis",
            ));
        }

        let digis = tokens
            .iter()
            .map(|t| resolver.resolve(t))
            .collect::<Result<Vec<Auri>, _>>()?;

        let edges = digis
            .windows(2)
            .map(|pair| PipeEdge::new(pair[0].clone(), pair[1].clone()))
            .collect();
        Ok(Self { edges })
    }

    pub fn from_edges(edges: Vec<PipeEdge>) -> Self {
        Self { edges }
    }

    pub fn edges(&self) -> &[PipeEdge] {
        &self.edges
    }

    pub fn into_edges(self) -> Vec<PipeEdge> {
        self.edges
    }
}

/// Installs and removes pipe bindings on target digis
#[derive(Debug, Clone)]
pub struct PipeComposer {
    relations: Relations,
}

impl PipeComposer {
    pub fn new(store: Arc<dyn RelationStore>, config: EngineConfig) -> Self {
        Self {
            relations: Relations::new(store, config),
        }
    }

    pub async fn apply(&self, op: PipeOp, piper: &Piper) -> Result<(), RelationError> {
        match op {
            PipeOp::Pipe => self.pipe(piper).await,
            PipeOp::Unpipe => self.unpipe(piper).await,
        }
    }

    /// Install every edge, left to right
    ///
    /// Not transactional: if edge `k` fails, edges before it stay installed
    /// and the error names `k` and its endpoints. Re-running is safe since
    /// installing an existing edge is a no-op.
    pub async fn pipe(&self, piper: &Piper) -> Result<(), RelationError> {
        for (index, edge) in piper.edges().iter().enumerate() {
            self.install(edge)
                .await
                .map_err(|cause| chain_error(index, edge, cause))?;
        }
        Ok(())
    }

    /// Remove every edge, left to right, with the same partial-failure
    /// behavior as [`PipeComposer::pipe`]
    pub async fn unpipe(&self, piper: &Piper) -> Result<(), RelationError> {
        for (index, edge) in piper.edges().iter().enumerate() {
            self.remove(edge)
                .await
                .map_err(|cause| chain_error(index, edge, cause))?;
        }
        Ok(())
    }

    /// Input bindings of `target`
    pub async fn list(&self, target: &Auri) -> Result<PipeRefs, RelationError> {
        Ok(self.relations.get(target).await?.pipes)
    }

    async fn install(&self, edge: &PipeEdge) -> Result<(), RelationError> {
        self.relations.get(&edge.source).await?;

        let binding = edge.binding();
        let replaced = self
            .relations
            .modify(&edge.target, |digi| {
                let existing = digi.pipes.get(&edge.input).cloned();
                if existing.as_ref() == Some(&binding) {
                    return Ok(Edit::Unchanged(None));
                }
                digi.pipes.insert(edge.input.clone(), binding.clone());
                Ok(Edit::Changed(existing))
            })
            .await?;

        if let Some(replaced) = replaced {
            tracing::warn!(
                %edge,
                previous = %replaced.source,
                "pipe replaced an existing input binding"
            );
        } else {
            tracing::info!(%edge, "piped");
        }
        Ok(())
    }

    async fn remove(&self, edge: &PipeEdge) -> Result<(), RelationError> {
        let binding = edge.binding();
        self.relations
            .modify(&edge.target, |digi| {
                if digi.pipes.get(&edge.input) != Some(&binding) {
                    return Err(RelationError::PipeNotFound {
                        src: edge.source.clone(),
                        dst: edge.target.clone(),
                        input: edge.input.clone(),
                    });
                }
                digi.pipes.remove(&edge.input);
                Ok(Edit::Changed(()))
            })
            .await?;

        tracing::info!(%edge, "unpiped");
        Ok(())
    }
}

fn chain_error(index: usize, edge: &PipeEdge, cause: RelationError) -> RelationError {
    RelationError::Chain {
        index,
        src: edge.source.clone(),
        dst: edge.target.clone(),
        cause: Box::new(cause),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn auri(name: &str) -> String {
        format!("db/v1/Store/default/{}", name)
    }

    #[test]
    fn test_chain_preserves_order() {
        let resolver = Resolver::without_aliases();
        let spec = format!("{} | {} |{}", auri("a"), auri("b"), auri("c"));
        let piper = Piper::from_chain(&resolver, &spec).unwrap();

        let names: Vec<(&str, &str)> = piper
            .edges()
            .iter()
            .map(|e| (e.source.name.as_str(), e.target.name.as_str()))
            .collect();
        assert_eq!(names, vec![("a", "b"), ("b", "c")]);
        assert_eq!(Piper::from_chain(&resolver, &spec).unwrap(), piper);
    }

    #[test]
    fn test_chain_needs_two_digis() {
        let resolver = Resolver::without_aliases();
        let err = Piper::from_chain(&resolver, &auri("a")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);

        let err = Piper::from_chain(&resolver, &format!("{} | ", auri("a"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Parse);
    }

    #[test]
    fn test_chain_surfaces_resolution_errors() {
        let resolver = Resolver::without_aliases();
        let err = Piper::from_chain(&resolver, &format!("{} | nope", auri("a"))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
