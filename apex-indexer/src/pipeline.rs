// The four-stage indexing pipeline: collect recognized sources, keep the
// stale ones, index those on a blocking-worker pool in fixed batches, then
// purge payloads whose source is gone.
//
// The pipeline is generic over the item type so the Apex and SObject
// indexers share the staging logic and tests can drive it with synthetic
// targets.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::fs::FileSystem;

pub trait IndexTarget: Send + Sync + 'static {
    type Item: Clone + Send + Sync + 'static;

    /// Short label used in log lines ("apex", "sobject").
    fn kind(&self) -> &'static str;

    /// Filter-and-map a collected file to a pipeline item.
    fn recognize(&self, file: &Path) -> Option<Self::Item>;

    /// The name the payload file is keyed by, used for orphan detection.
    fn logical_name(&self, item: &Self::Item) -> String;

    /// Whether the persisted payload is absent or older than the source.
    fn is_stale(&self, item: &Self::Item) -> bool;

    /// Produce and persist the payload for one item. Runs on a blocking
    /// worker; failures are isolated to the item.
    fn index(&self, item: &Self::Item) -> anyhow::Result<()>;

    /// Directory holding this target's payloads.
    fn output_dir(&self) -> PathBuf;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub collected: usize,
    pub stale: usize,
    pub indexed: usize,
    pub failed: usize,
    pub purged: usize,
}

/// Worker batch size: one batch per run of hardware threads, each batch
/// finishing before the next starts.
pub fn batch_size() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

pub async fn run_pipeline<T: IndexTarget>(
    fs: Arc<dyn FileSystem>,
    package_dirs: &[PathBuf],
    target: Arc<T>,
) -> PipelineSummary {
    let mut summary = PipelineSummary::default();
    let output_dir = target.output_dir();
    if let Err(err) = fs.create_dir_all(&output_dir) {
        tracing::error!(
            kind = target.kind(),
            dir = %output_dir.display(),
            error = %err,
            "cannot create index directory, skipping"
        );
        return summary;
    }

    // Stage 1: collect.
    let mut items = Vec::new();
    for dir in package_dirs {
        match fs.list_files(dir) {
            Ok(files) => {
                for file in files {
                    if let Some(item) = target.recognize(&file) {
                        items.push(item);
                    }
                }
            }
            Err(err) => {
                tracing::debug!(dir = %dir.display(), error = %err, "package directory not listable");
            }
        }
    }
    summary.collected = items.len();

    // Stage 2: stale filter.
    let stale: Vec<T::Item> = items
        .iter()
        .filter(|item| target.is_stale(item))
        .cloned()
        .collect();
    summary.stale = stale.len();

    // Stage 3: index in parallel, batch by batch.
    let batch = batch_size().max(1);
    for chunk in stale.chunks(batch) {
        let mut handles = Vec::with_capacity(chunk.len());
        for item in chunk {
            let target = Arc::clone(&target);
            let item = item.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let name = target.logical_name(&item);
                (name, target.index(&item))
            }));
        }
        for handle in handles {
            match handle.await {
                Ok((_, Ok(()))) => summary.indexed += 1,
                Ok((name, Err(err))) => {
                    summary.failed += 1;
                    tracing::warn!(kind = target.kind(), item = %name, error = %err, "indexing failed");
                }
                Err(err) => {
                    summary.failed += 1;
                    tracing::error!(kind = target.kind(), error = %err, "index worker panicked");
                }
            }
        }
    }

    // Stage 4: orphan purge. Keyed case-insensitively by logical name.
    let keep: HashSet<String> = items
        .iter()
        .map(|item| target.logical_name(item).to_ascii_lowercase())
        .collect();
    if let Ok(existing) = fs.list_dir(&output_dir) {
        for file in existing {
            if file.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = file.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if keep.contains(&stem.to_ascii_lowercase()) {
                continue;
            }
            match fs.remove_file(&file) {
                Ok(()) => {
                    summary.purged += 1;
                    tracing::debug!(kind = target.kind(), path = %file.display(), "purged orphan payload");
                }
                Err(err) => {
                    tracing::warn!(kind = target.kind(), path = %file.display(), error = %err, "orphan purge failed");
                }
            }
        }
    }

    tracing::info!(
        kind = target.kind(),
        collected = summary.collected,
        indexed = summary.indexed,
        failed = summary.failed,
        purged = summary.purged,
        "index pipeline finished"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::MemoryFileSystem;

    /// Copies `.src` files to `<name>.json` payloads.
    struct CopyTarget {
        fs: Arc<MemoryFileSystem>,
        out: PathBuf,
        fail_on: Option<String>,
    }

    impl IndexTarget for CopyTarget {
        type Item = PathBuf;

        fn kind(&self) -> &'static str {
            "copy"
        }

        fn recognize(&self, file: &Path) -> Option<PathBuf> {
            (file.extension().and_then(|e| e.to_str()) == Some("src")).then(|| file.to_path_buf())
        }

        fn logical_name(&self, item: &PathBuf) -> String {
            item.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string()
        }

        fn is_stale(&self, item: &PathBuf) -> bool {
            let payload = self.out.join(format!("{}.json", self.logical_name(item)));
            match (self.fs.modified(item), self.fs.modified(&payload)) {
                (Ok(source), Ok(output)) => source > output,
                _ => true,
            }
        }

        fn index(&self, item: &PathBuf) -> anyhow::Result<()> {
            let name = self.logical_name(item);
            if self.fail_on.as_deref() == Some(name.as_str()) {
                anyhow::bail!("boom");
            }
            let text = self.fs.read_to_string(item)?;
            let payload = self.out.join(format!("{name}.json"));
            self.fs.write(&payload, text.as_bytes())?;
            Ok(())
        }

        fn output_dir(&self) -> PathBuf {
            self.out.clone()
        }
    }

    fn target(fs: &Arc<MemoryFileSystem>, fail_on: Option<&str>) -> Arc<CopyTarget> {
        Arc::new(CopyTarget {
            fs: Arc::clone(fs),
            out: PathBuf::from("/ws/.apex-lsp/copy"),
            fail_on: fail_on.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_second_run_is_idempotent() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.write_str("/ws/pkg/A.src", "alpha");
        fs.write_str("/ws/pkg/B.src", "beta");
        let dirs = vec![PathBuf::from("/ws/pkg")];

        let first = run_pipeline(fs.clone(), &dirs, target(&fs, None)).await;
        assert_eq!(first.collected, 2);
        assert_eq!(first.indexed, 2);

        let writes_before = fs.write_count();
        let removals_before = fs.remove_count();
        let second = run_pipeline(fs.clone(), &dirs, target(&fs, None)).await;
        assert_eq!(second.stale, 0);
        assert_eq!(second.indexed, 0);
        assert_eq!(second.purged, 0);
        assert_eq!(fs.write_count(), writes_before);
        assert_eq!(fs.remove_count(), removals_before);
    }

    #[tokio::test]
    async fn test_changed_source_is_reindexed() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.write_str("/ws/pkg/A.src", "alpha");
        let dirs = vec![PathBuf::from("/ws/pkg")];
        run_pipeline(fs.clone(), &dirs, target(&fs, None)).await;

        fs.write_str("/ws/pkg/A.src", "alpha v2");
        let second = run_pipeline(fs.clone(), &dirs, target(&fs, None)).await;
        assert_eq!(second.stale, 1);
        assert_eq!(second.indexed, 1);
        assert_eq!(
            fs.read_to_string(Path::new("/ws/.apex-lsp/copy/A.json")).expect("payload"),
            "alpha v2"
        );
    }

    #[tokio::test]
    async fn test_orphans_are_purged_case_insensitively() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.write_str("/ws/pkg/Kept.src", "kept");
        // Same logical name under different casing must survive the purge.
        fs.write_str("/ws/.apex-lsp/copy/KEPT.json", "stale casing");
        fs.write_str("/ws/.apex-lsp/copy/Gone.json", "orphan");
        let dirs = vec![PathBuf::from("/ws/pkg")];

        let summary = run_pipeline(fs.clone(), &dirs, target(&fs, None)).await;
        assert_eq!(summary.purged, 1);
        assert!(fs.exists(Path::new("/ws/.apex-lsp/copy/KEPT.json")));
        assert!(!fs.exists(Path::new("/ws/.apex-lsp/copy/Gone.json")));
    }

    #[tokio::test]
    async fn test_item_failures_are_swallowed() {
        let fs = Arc::new(MemoryFileSystem::new());
        fs.write_str("/ws/pkg/Good.src", "good");
        fs.write_str("/ws/pkg/Bad.src", "bad");
        let dirs = vec![PathBuf::from("/ws/pkg")];

        let summary = run_pipeline(fs.clone(), &dirs, target(&fs, Some("Bad"))).await;
        assert_eq!(summary.indexed, 1);
        assert_eq!(summary.failed, 1);
        assert!(fs.exists(Path::new("/ws/.apex-lsp/copy/Good.json")));
        assert!(!fs.exists(Path::new("/ws/.apex-lsp/copy/Bad.json")));
    }
}
