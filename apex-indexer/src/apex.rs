// Apex class indexing: one `.cls` file in, one persisted mirror payload
// out, keyed by the class name the parse discovered.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use apex_ast::{ApexIndexEntry, SourceInfo, SCHEMA_VERSION};
use apex_parser::ApexParser;

use crate::fs::{file_uri, FileSystem};
use crate::pipeline::IndexTarget;
use crate::workspace;

#[derive(Debug, Clone)]
pub struct ApexSource {
    pub path: PathBuf,
}

pub struct ApexIndexTarget {
    fs: Arc<dyn FileSystem>,
    workspace_root: PathBuf,
    index_dir: PathBuf,
}

impl ApexIndexTarget {
    pub fn new(fs: Arc<dyn FileSystem>, workspace_root: &Path) -> Self {
        Self {
            fs,
            workspace_root: workspace_root.to_path_buf(),
            index_dir: workspace::apex_index_dir(workspace_root),
        }
    }

    fn payload_path(&self, class_name: &str) -> PathBuf {
        self.index_dir.join(format!("{class_name}.json"))
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.workspace_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

impl IndexTarget for ApexIndexTarget {
    type Item = ApexSource;

    fn kind(&self) -> &'static str {
        "apex"
    }

    fn recognize(&self, file: &Path) -> Option<ApexSource> {
        let extension = file.extension()?.to_str()?;
        extension.eq_ignore_ascii_case("cls").then(|| ApexSource {
            path: file.to_path_buf(),
        })
    }

    fn logical_name(&self, item: &ApexSource) -> String {
        item.path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string()
    }

    fn is_stale(&self, item: &ApexSource) -> bool {
        let payload = self.payload_path(&self.logical_name(item));
        match (self.fs.modified(&item.path), self.fs.modified(&payload)) {
            (Ok(source), Ok(output)) => source > output,
            // Missing payload, unreadable source: reindex.
            _ => true,
        }
    }

    fn index(&self, item: &ApexSource) -> anyhow::Result<()> {
        let source = self
            .fs
            .read_to_string(&item.path)
            .with_context(|| format!("reading {}", item.path.display()))?;

        let mut parser = ApexParser::new().context("constructing Apex parser")?;
        let mirrors = parser
            .parse_source(&source)
            .with_context(|| format!("parsing {}", item.path.display()))?;

        // The payload is keyed by the name the parse discovered, falling
        // back to the file stem for files tree-sitter could not make
        // sense of.
        let fallback = self.logical_name(item);
        let mirror = mirrors
            .into_iter()
            .next()
            .with_context(|| format!("no type declaration in {}", item.path.display()))?;
        let class_name = if mirror.name().is_empty() {
            fallback
        } else {
            mirror.name().to_string()
        };

        let entry = ApexIndexEntry {
            schema_version: SCHEMA_VERSION,
            class_name: class_name.clone(),
            source: SourceInfo {
                uri: file_uri(&item.path),
                relative_path: self.relative_path(&item.path),
            },
            type_mirror: mirror,
        };
        let mut body = serde_json::to_vec_pretty(&entry).context("serializing payload")?;
        body.push(b'\n');
        self.fs
            .write(&self.payload_path(&class_name), &body)
            .with_context(|| format!("writing payload for {class_name}"))?;
        Ok(())
    }

    fn output_dir(&self) -> PathBuf {
        self.index_dir.clone()
    }
}
