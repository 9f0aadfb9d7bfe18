// SFDX workspace layout: a root is a directory holding `sfdx-project.json`,
// whose `packageDirectories` array names the source trees to index.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::fs::FileSystem;

pub const PROJECT_FILE: &str = "sfdx-project.json";

/// Directory name of the persisted index, relative to a workspace root.
pub const INDEX_DIR: &str = ".apex-lsp";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SfdxProject {
    #[serde(default)]
    package_directories: Vec<PackageDirectory>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PackageDirectory {
    path: String,
}

/// Package directories declared by `<root>/sfdx-project.json`, resolved
/// against the root. A missing or unparseable project file is not an
/// error; the root simply contributes nothing.
pub fn package_directories(fs: &dyn FileSystem, root: &Path) -> Vec<PathBuf> {
    let project_file = root.join(PROJECT_FILE);
    let text = match fs.read_to_string(&project_file) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(root = %root.display(), error = %err, "no readable sfdx-project.json");
            return Vec::new();
        }
    };
    let project: SfdxProject = match serde_json::from_str(&text) {
        Ok(project) => project,
        Err(err) => {
            tracing::warn!(root = %root.display(), error = %err, "malformed sfdx-project.json");
            return Vec::new();
        }
    };
    project
        .package_directories
        .iter()
        .map(|dir| root.join(&dir.path))
        .collect()
}

/// `<root>/.apex-lsp/apex`, where per-class payloads live.
pub fn apex_index_dir(root: &Path) -> PathBuf {
    root.join(INDEX_DIR).join("apex")
}

/// `<root>/.apex-lsp/sobjects`, where per-object payloads live.
pub fn sobject_index_dir(root: &Path) -> PathBuf {
    root.join(INDEX_DIR).join("sobjects")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    #[test]
    fn test_package_directories_resolve_against_root() {
        let fs = MemoryFileSystem::new();
        fs.write_str(
            "/ws/sfdx-project.json",
            r#"{"packageDirectories":[{"path":"force-app"},{"path":"unpackaged"}],"sourceApiVersion":"59.0"}"#,
        );
        let dirs = package_directories(&fs, Path::new("/ws"));
        assert_eq!(
            dirs,
            vec![PathBuf::from("/ws/force-app"), PathBuf::from("/ws/unpackaged")]
        );
    }

    #[test]
    fn test_missing_project_file_is_empty() {
        let fs = MemoryFileSystem::new();
        assert!(package_directories(&fs, Path::new("/nowhere")).is_empty());
    }

    #[test]
    fn test_malformed_project_file_is_empty() {
        let fs = MemoryFileSystem::new();
        fs.write_str("/ws/sfdx-project.json", "not json at all");
        assert!(package_directories(&fs, Path::new("/ws")).is_empty());
    }
}
