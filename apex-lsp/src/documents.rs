// Authoritative text of open documents. All mutation happens on the
// dispatch loop; the map is shared so handlers can read cheaply.

use std::sync::Arc;

use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct OpenDocuments {
    docs: DashMap<String, Arc<String>>,
}

impl OpenDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// `didOpen` and `didChange` both overwrite; document sync is full.
    pub fn set(&self, uri: &str, text: String) {
        self.docs.insert(uri.to_string(), Arc::new(text));
    }

    pub fn remove(&self, uri: &str) {
        self.docs.remove(uri);
    }

    pub fn get(&self, uri: &str) -> Option<Arc<String>> {
        self.docs.get(uri).map(|entry| Arc::clone(entry.value()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_change_close() {
        let documents = OpenDocuments::new();
        documents.set("file:///a.cls", "v1".to_string());
        documents.set("file:///a.cls", "v2".to_string());
        assert_eq!(documents.get("file:///a.cls").as_deref().map(String::as_str), Some("v2"));

        documents.remove("file:///a.cls");
        assert!(documents.get("file:///a.cls").is_none());
    }
}
