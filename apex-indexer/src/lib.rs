// Workspace indexing for SFDX projects: locate package directories, run
// the Apex and SObject pipelines over them, and read the persisted result
// back on demand.

mod apex;
mod fs;
mod pipeline;
mod repository;
mod sobject;
pub mod workspace;

use std::path::Path;
use std::sync::Arc;

pub use apex::{ApexIndexTarget, ApexSource};
pub use fs::{file_uri, FileSystem, MemoryFileSystem, OsFileSystem};
pub use pipeline::{batch_size, run_pipeline, IndexTarget, PipelineSummary};
pub use repository::IndexRepository;
pub use sobject::{
    parse_field_metadata, parse_object_metadata, SObjectIndexTarget, SObjectSourceDir,
    SObjectXmlError, FIELD_META_SUFFIX, OBJECT_META_SUFFIX,
};

/// Per-root result of one indexing run.
#[derive(Debug, Clone, Default)]
pub struct WorkspaceIndexSummary {
    pub package_directories: usize,
    pub apex: PipelineSummary,
    pub sobjects: PipelineSummary,
}

impl WorkspaceIndexSummary {
    pub fn indexed(&self) -> usize {
        self.apex.indexed + self.sobjects.indexed
    }

    pub fn collected(&self) -> usize {
        self.apex.collected + self.sobjects.collected
    }
}

/// Index one workspace root: both pipelines run concurrently over the
/// root's package directories.
pub async fn index_workspace_root(
    fs: Arc<dyn FileSystem>,
    root: &Path,
) -> WorkspaceIndexSummary {
    let package_dirs = workspace::package_directories(fs.as_ref(), root);
    if package_dirs.is_empty() {
        tracing::info!(root = %root.display(), "no package directories, nothing to index");
        return WorkspaceIndexSummary::default();
    }

    let apex_target = Arc::new(ApexIndexTarget::new(fs.clone(), root));
    let sobject_target = Arc::new(SObjectIndexTarget::new(fs.clone(), root));
    let (apex, sobjects) = tokio::join!(
        run_pipeline(fs.clone(), &package_dirs, apex_target),
        run_pipeline(fs.clone(), &package_dirs, sobject_target),
    );
    WorkspaceIndexSummary {
        package_directories: package_dirs.len(),
        apex,
        sobjects,
    }
}
