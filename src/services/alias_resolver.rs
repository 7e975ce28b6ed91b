use std::collections::{BTreeMap, BTreeSet};

use crate::error::PipelineError;
use crate::models::AliasEntry;

/// Maps raw team codes to canonical team identities.
///
/// Built once per run from the alias table and shared read-only by every stage.
#[derive(Debug, Clone, Default)]
pub struct AliasResolver {
    current: BTreeMap<String, String>,
    names: BTreeMap<String, String>,
}

impl AliasResolver {
    /// Build a resolver, rejecting alias tables whose resolution would not be stable.
    ///
    /// Every `current_team_code` must resolve to itself: an entry pointing at a code that is
    /// itself aliased elsewhere is a chain, and the same code mapped to two targets is a conflict.
    pub fn new(entries: &[AliasEntry]) -> Result<Self, PipelineError> {
        let mut current: BTreeMap<String, String> = BTreeMap::new();
        let mut names = BTreeMap::new();

        for entry in entries {
            let code = entry.team_code.trim();
            let target = entry.current_team_code.trim();

            if let Some(existing) = current.get(code) {
                if existing != target {
                    return Err(PipelineError::ConflictingAlias {
                        code: code.to_string(),
                        first: existing.clone(),
                        second: target.to_string(),
                    });
                }
                continue;
            }

            current.insert(code.to_string(), target.to_string());
            names.insert(code.to_string(), entry.team_name.trim().to_string());
        }

        for (code, target) in &current {
            if let Some(next) = current.get(target) {
                if next != target {
                    return Err(PipelineError::AliasChain {
                        code: code.clone(),
                        target: target.clone(),
                        next: next.clone(),
                    });
                }
            }
        }

        tracing::debug!("Alias resolver built from {} entries", current.len());
        Ok(Self { current, names })
    }

    /// Canonical identity of `code`; codes without an alias entry map to themselves.
    pub fn resolve<'a>(&'a self, code: &'a str) -> &'a str {
        self.current.get(code).map(String::as_str).unwrap_or(code)
    }

    /// Every canonical id the alias table knows about.
    pub fn canonical_ids(&self) -> BTreeSet<String> {
        self.current.values().cloned().collect()
    }

    /// Display name for a canonical id.
    ///
    /// Prefers the entry whose code is the canonical code itself, then the alphabetically first
    /// name among the codes pointing at it, then the id.
    pub fn team_name(&self, team_id: &str) -> String {
        if self.current.get(team_id).map(String::as_str) == Some(team_id) {
            if let Some(name) = self.names.get(team_id) {
                return name.clone();
            }
        }

        self.current
            .iter()
            .filter(|(_, target)| target.as_str() == team_id)
            .filter_map(|(code, _)| self.names.get(code))
            .min()
            .cloned()
            .unwrap_or_else(|| team_id.to_string())
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }
}
