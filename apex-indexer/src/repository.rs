// Lazy reader of the persisted index. A repository is created per indexing
// run and caches what it loads for its own lifetime; re-indexing swaps the
// whole repository rather than invalidating entries in place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use apex_ast::{
    sobject_declaration, workspace_declaration, ApexIndexEntry, Declaration, SObjectIndexEntry,
    SCHEMA_VERSION,
};

use crate::fs::FileSystem;
use crate::workspace;

type TypeMap = BTreeMap<String, Declaration>;

struct RootIndexes {
    root: PathBuf,
    apex: OnceLock<TypeMap>,
    sobjects: OnceLock<TypeMap>,
}

pub struct IndexRepository {
    fs: Arc<dyn FileSystem>,
    roots: Vec<RootIndexes>,
}

impl IndexRepository {
    pub fn new(fs: Arc<dyn FileSystem>, roots: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            fs,
            roots: roots
                .into_iter()
                .map(|root| RootIndexes {
                    root,
                    apex: OnceLock::new(),
                    sobjects: OnceLock::new(),
                })
                .collect(),
        }
    }

    /// Union of Apex types and SObjects across all workspace roots.
    pub fn declarations(&self) -> Vec<Declaration> {
        let mut out = Vec::new();
        for root in &self.roots {
            out.extend(self.apex(root).values().cloned());
        }
        for root in &self.roots {
            out.extend(self.sobjects(root).values().cloned());
        }
        out
    }

    /// Case-insensitive type lookup: Apex entries first, then SObjects,
    /// roots searched in registration order.
    pub fn indexed_type(&self, name: &str) -> Option<Declaration> {
        let key = name.to_ascii_lowercase();
        for root in &self.roots {
            if let Some(declaration) = self.apex(root).get(&key) {
                return Some(declaration.clone());
            }
        }
        for root in &self.roots {
            if let Some(declaration) = self.sobjects(root).get(&key) {
                return Some(declaration.clone());
            }
        }
        None
    }

    fn apex<'a>(&self, root: &'a RootIndexes) -> &'a TypeMap {
        root.apex.get_or_init(|| {
            load_map(
                self.fs.as_ref(),
                &workspace::apex_index_dir(&root.root),
                parse_apex_entry,
            )
        })
    }

    fn sobjects<'a>(&self, root: &'a RootIndexes) -> &'a TypeMap {
        root.sobjects.get_or_init(|| {
            load_map(
                self.fs.as_ref(),
                &workspace::sobject_index_dir(&root.root),
                parse_sobject_entry,
            )
        })
    }
}

fn parse_apex_entry(text: &str) -> Result<(String, Declaration), String> {
    let entry: ApexIndexEntry = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if entry.schema_version != SCHEMA_VERSION {
        return Err(format!("unsupported schemaVersion {}", entry.schema_version));
    }
    Ok((
        entry.class_name.clone(),
        workspace_declaration(&entry.type_mirror),
    ))
}

fn parse_sobject_entry(text: &str) -> Result<(String, Declaration), String> {
    let entry: SObjectIndexEntry = serde_json::from_str(text).map_err(|e| e.to_string())?;
    if entry.schema_version != SCHEMA_VERSION {
        return Err(format!("unsupported schemaVersion {}", entry.schema_version));
    }
    Ok((
        entry.object_api_name.clone(),
        sobject_declaration(&entry.object_metadata),
    ))
}

fn load_map(
    fs: &dyn FileSystem,
    dir: &Path,
    parse: fn(&str) -> Result<(String, Declaration), String>,
) -> TypeMap {
    let mut map = TypeMap::new();
    let files = match fs.list_dir(dir) {
        Ok(files) => files,
        // The directory only exists once an indexing run created it.
        Err(_) => return map,
    };
    for file in files {
        if file.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let text = match fs.read_to_string(&file) {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "unreadable index payload");
                continue;
            }
        };
        match parse(&text) {
            Ok((name, declaration)) => {
                if map.insert(name.to_ascii_lowercase(), declaration).is_some() {
                    tracing::warn!(name = %name, path = %file.display(), "duplicate indexed type, keeping the later one");
                }
            }
            Err(err) => {
                tracing::warn!(path = %file.display(), error = %err, "skipping index payload");
            }
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;
    use apex_ast::{
        ByteRange, ClassMirror, SObjectFieldMetadata, SObjectMetadata, SObjectSource, SourceInfo,
        TypeMirror,
    };

    fn apex_payload(class_name: &str, schema_version: u32) -> String {
        let entry = ApexIndexEntry {
            schema_version,
            class_name: class_name.to_string(),
            source: SourceInfo {
                uri: format!("file:///ws/classes/{class_name}.cls"),
                relative_path: format!("classes/{class_name}.cls"),
            },
            type_mirror: TypeMirror::Class(ClassMirror {
                name: class_name.to_string(),
                modifiers: vec!["public".to_string()],
                super_class: None,
                interfaces: Vec::new(),
                range: ByteRange::new(0, 10),
                inner_types: Vec::new(),
                fields: Vec::new(),
                properties: Vec::new(),
                methods: Vec::new(),
                constructors: Vec::new(),
            }),
        };
        serde_json::to_string(&entry).expect("serialize")
    }

    fn sobject_payload(api_name: &str) -> String {
        let entry = SObjectIndexEntry {
            schema_version: SCHEMA_VERSION,
            object_api_name: api_name.to_string(),
            source: SObjectSource {
                object_meta_uri: format!("file:///ws/objects/{api_name}.object-meta.xml"),
                relative_path: format!("objects/{api_name}.object-meta.xml"),
            },
            object_metadata: SObjectMetadata {
                api_name: api_name.to_string(),
                label: None,
                plural_label: None,
                description: None,
                fields: vec![SObjectFieldMetadata {
                    api_name: "Name".to_string(),
                    label: None,
                    field_type: Some("Text".to_string()),
                    description: None,
                }],
            },
        };
        serde_json::to_string(&entry).expect("serialize")
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_apex_first() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.write_str("/ws/.apex-lsp/apex/Account.json", &apex_payload("Account", 1));
        fs.write_str("/ws/.apex-lsp/sobjects/Account.json", &sobject_payload("Account"));

        let repo = IndexRepository::new(fs, vec![PathBuf::from("/ws")]);
        let found = repo.indexed_type("ACCOUNT").expect("lookup");
        assert!(matches!(found, Declaration::Class(_)));
        assert_eq!(repo.declarations().len(), 2);
    }

    #[test]
    fn test_roots_searched_in_registration_order() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.write_str("/a/.apex-lsp/apex/Util.json", &apex_payload("Util", 1));
        fs.write_str("/b/.apex-lsp/apex/Util.json", &apex_payload("Util", 1));

        let repo = IndexRepository::new(
            fs,
            vec![PathBuf::from("/b"), PathBuf::from("/a")],
        );
        assert!(repo.indexed_type("util").is_some());
    }

    #[test]
    fn test_bad_payloads_are_skipped() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.write_str("/ws/.apex-lsp/apex/Broken.json", "{ not json");
        fs.write_str("/ws/.apex-lsp/apex/Future.json", &apex_payload("Future", 2));
        fs.write_str("/ws/.apex-lsp/apex/Good.json", &apex_payload("Good", 1));
        fs.write_str("/ws/.apex-lsp/apex/notes.txt", "ignored");

        let repo = IndexRepository::new(fs, vec![PathBuf::from("/ws")]);
        assert!(repo.indexed_type("Good").is_some());
        assert!(repo.indexed_type("Future").is_none());
        assert_eq!(repo.declarations().len(), 1);
    }

    #[test]
    fn test_results_are_cached_for_repository_lifetime() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.write_str("/ws/.apex-lsp/apex/Cached.json", &apex_payload("Cached", 1));

        let repo = IndexRepository::new(fs.clone(), vec![PathBuf::from("/ws")]);
        assert!(repo.indexed_type("Cached").is_some());

        // Later on-disk changes are not observed by this repository.
        let _ = fs.remove_file(Path::new("/ws/.apex-lsp/apex/Cached.json"));
        assert!(repo.indexed_type("Cached").is_some());
    }
}
