// SObject indexing: an object directory holds `<Name>.object-meta.xml`
// plus `fields/*.field-meta.xml`; all of it is folded into one metadata
// payload per object.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use apex_ast::{SObjectFieldMetadata, SObjectIndexEntry, SObjectMetadata, SObjectSource, SCHEMA_VERSION};
use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

use crate::fs::{file_uri, FileSystem};
use crate::pipeline::IndexTarget;
use crate::workspace;

pub const OBJECT_META_SUFFIX: &str = ".object-meta.xml";
pub const FIELD_META_SUFFIX: &str = ".field-meta.xml";

#[derive(Debug, Error)]
pub enum SObjectXmlError {
    #[error("malformed metadata XML: {0}")]
    Xml(#[from] quick_xml::Error),
}

#[derive(Debug, Clone)]
pub struct SObjectSourceDir {
    pub meta_file: PathBuf,
    pub object_dir: PathBuf,
    pub api_name: String,
}

pub struct SObjectIndexTarget {
    fs: Arc<dyn FileSystem>,
    workspace_root: PathBuf,
    index_dir: PathBuf,
}

impl SObjectIndexTarget {
    pub fn new(fs: Arc<dyn FileSystem>, workspace_root: &Path) -> Self {
        Self {
            fs,
            workspace_root: workspace_root.to_path_buf(),
            index_dir: workspace::sobject_index_dir(workspace_root),
        }
    }

    fn payload_path(&self, api_name: &str) -> PathBuf {
        self.index_dir.join(format!("{api_name}.json"))
    }
}

impl IndexTarget for SObjectIndexTarget {
    type Item = SObjectSourceDir;

    fn kind(&self) -> &'static str {
        "sobject"
    }

    fn recognize(&self, file: &Path) -> Option<SObjectSourceDir> {
        let name = file.file_name()?.to_str()?;
        let api_name = name.strip_suffix(OBJECT_META_SUFFIX)?;
        if api_name.is_empty() {
            return None;
        }
        Some(SObjectSourceDir {
            meta_file: file.to_path_buf(),
            object_dir: file.parent()?.to_path_buf(),
            api_name: api_name.to_string(),
        })
    }

    fn logical_name(&self, item: &SObjectSourceDir) -> String {
        item.api_name.clone()
    }

    fn is_stale(&self, item: &SObjectSourceDir) -> bool {
        let Ok(payload_time) = self.fs.modified(&self.payload_path(&item.api_name)) else {
            return true;
        };
        // Any file anywhere under the object directory (field metadata
        // included) newer than the payload makes the object stale.
        let Ok(files) = self.fs.list_files(&item.object_dir) else {
            return true;
        };
        files.iter().any(|file| {
            self.fs
                .modified(file)
                .map(|time| time > payload_time)
                .unwrap_or(true)
        })
    }

    fn index(&self, item: &SObjectSourceDir) -> anyhow::Result<()> {
        let object_xml = self
            .fs
            .read_to_string(&item.meta_file)
            .with_context(|| format!("reading {}", item.meta_file.display()))?;
        let mut metadata = parse_object_metadata(&item.api_name, &object_xml)
            .with_context(|| format!("parsing {}", item.meta_file.display()))?;

        let fields_dir = item.object_dir.join("fields");
        for field_file in self.fs.list_dir(&fields_dir).unwrap_or_default() {
            let Some(name) = field_file.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(fallback_name) = name.strip_suffix(FIELD_META_SUFFIX) else {
                continue;
            };
            let field_xml = match self.fs.read_to_string(&field_file) {
                Ok(xml) => xml,
                Err(err) => {
                    tracing::warn!(path = %field_file.display(), error = %err, "unreadable field metadata");
                    continue;
                }
            };
            match parse_field_metadata(fallback_name, &field_xml) {
                Ok(field) => metadata.fields.push(field),
                Err(err) => {
                    tracing::warn!(path = %field_file.display(), error = %err, "skipping field metadata");
                }
            }
        }

        let entry = SObjectIndexEntry {
            schema_version: SCHEMA_VERSION,
            object_api_name: item.api_name.clone(),
            source: SObjectSource {
                object_meta_uri: file_uri(&item.meta_file),
                relative_path: item
                    .meta_file
                    .strip_prefix(&self.workspace_root)
                    .unwrap_or(&item.meta_file)
                    .display()
                    .to_string(),
            },
            object_metadata: metadata,
        };
        let mut body = serde_json::to_vec_pretty(&entry).context("serializing payload")?;
        body.push(b'\n');
        self.fs
            .write(&self.payload_path(&item.api_name), &body)
            .with_context(|| format!("writing payload for {}", item.api_name))?;
        Ok(())
    }

    fn output_dir(&self) -> PathBuf {
        self.index_dir.clone()
    }
}

/// Parse `<Name>.object-meta.xml`. Only the direct children of the root
/// element are of interest; unknown elements are skipped.
pub fn parse_object_metadata(
    api_name: &str,
    xml: &str,
) -> Result<SObjectMetadata, SObjectXmlError> {
    let values = top_level_elements(xml, &["label", "pluralLabel", "description"])?;
    Ok(SObjectMetadata {
        api_name: api_name.to_string(),
        label: values.get("label").cloned(),
        plural_label: values.get("pluralLabel").cloned(),
        description: values.get("description").cloned(),
        fields: Vec::new(),
    })
}

/// Parse one `fields/*.field-meta.xml`. The API name prefers the
/// `<fullName>` element over the file name.
pub fn parse_field_metadata(
    fallback_api_name: &str,
    xml: &str,
) -> Result<SObjectFieldMetadata, SObjectXmlError> {
    let values = top_level_elements(xml, &["fullName", "label", "type", "description"])?;
    Ok(SObjectFieldMetadata {
        api_name: values
            .get("fullName")
            .cloned()
            .unwrap_or_else(|| fallback_api_name.to_string()),
        label: values.get("label").cloned(),
        field_type: values.get("type").cloned(),
        description: values.get("description").cloned(),
    })
}

/// Text of the wanted elements sitting directly under the document root.
fn top_level_elements(
    xml: &str,
    wanted: &[&str],
) -> Result<HashMap<String, String>, SObjectXmlError> {
    let mut reader = Reader::from_str(xml);
    let mut out = HashMap::new();
    let mut depth = 0usize;
    let mut current: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                depth += 1;
                if depth == 2 {
                    let name = String::from_utf8_lossy(start.local_name().as_ref()).to_string();
                    current = wanted.contains(&name.as_str()).then_some(name);
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    current = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(text) => {
                if let Some(name) = &current {
                    let value = text
                        .decode()
                        .map(|v| v.trim().to_string())
                        .unwrap_or_default();
                    if !value.is_empty() {
                        out.entry(name.clone()).or_insert(value);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(out)
}
