// Local indexer: scoped declarations for the file being edited,
// recomputed from scratch on every content change.

use std::sync::{Arc, Mutex, MutexGuard};

use apex_ast::{local_declarations, Declaration};
use apex_parser::ApexParser;
use dashmap::DashMap;

#[derive(Default)]
pub struct LocalIndex {
    parser: Mutex<Option<ApexParser>>,
    entries: DashMap<String, Arc<Vec<Declaration>>>,
}

impl LocalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the document and replace its declarations. A document that
    /// cannot be parsed (grammar missing, parser failure) contributes an
    /// empty set rather than stale results.
    pub fn update(&self, uri: &str, text: &str) {
        let declarations = self.parse(text);
        tracing::debug!(uri, count = declarations.len(), "local index updated");
        self.entries.insert(uri.to_string(), Arc::new(declarations));
    }

    pub fn remove(&self, uri: &str) {
        self.entries.remove(uri);
    }

    pub fn declarations(&self, uri: &str) -> Arc<Vec<Declaration>> {
        self.entries
            .get(uri)
            .map(|entry| Arc::clone(entry.value()))
            .unwrap_or_default()
    }

    fn parse(&self, text: &str) -> Vec<Declaration> {
        let mut guard = self.parser_slot();
        if guard.is_none() {
            match ApexParser::new() {
                Ok(parser) => *guard = Some(parser),
                Err(err) => {
                    tracing::debug!(error = %err, "Apex parser unavailable, local index empty");
                    return Vec::new();
                }
            }
        }
        let Some(parser) = guard.as_mut() else {
            return Vec::new();
        };
        match parser.parse_source(text) {
            Ok(mirrors) => local_declarations(&mirrors),
            Err(err) => {
                tracing::warn!(error = %err, "local parse failed");
                Vec::new()
            }
        }
    }

    fn parser_slot(&self) -> MutexGuard<'_, Option<ApexParser>> {
        match self.parser.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_document_is_empty() {
        let index = LocalIndex::new();
        assert!(index.declarations("file:///nope.cls").is_empty());
    }

    #[test]
    fn test_update_replaces_and_close_drops() {
        // Works with or without the grammar: entries are replaced either way.
        let index = LocalIndex::new();
        index.update("file:///a.cls", "public class A {}");
        let first = index.declarations("file:///a.cls");
        index.update("file:///a.cls", "public class B {}");
        let second = index.declarations("file:///a.cls");
        assert!(!Arc::ptr_eq(&first, &second));

        index.remove("file:///a.cls");
        assert!(index.declarations("file:///a.cls").is_empty());
    }
}
