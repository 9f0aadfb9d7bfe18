// Filesystem abstraction. The indexing pipeline and the repository only
// talk to this trait, so every piece of on-disk behavior can be exercised
// against the in-memory backend.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

pub trait FileSystem: Send + Sync {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
    /// Write the full contents of a file, replacing any previous contents.
    /// Implementations must never expose a torn file to readers.
    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()>;
    fn modified(&self, path: &Path) -> io::Result<SystemTime>;
    /// Regular files under `dir`, recursively, symlinks not followed,
    /// sorted by path.
    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    /// Regular files directly inside `dir`, sorted by path.
    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
}

/// A `file://` URI for a path, used in persisted payloads.
pub fn file_uri(path: &Path) -> String {
    match url::Url::from_file_path(path) {
        Ok(url) => url.to_string(),
        Err(()) => format!("file://{}", path.display()),
    }
}

/// The real filesystem.
#[derive(Debug, Default, Clone)]
pub struct OsFileSystem;

impl OsFileSystem {
    fn walk(dir: &Path, out: &mut Vec<PathBuf>) -> io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_symlink() {
                continue;
            }
            if file_type.is_dir() {
                Self::walk(&entry.path(), out)?;
            } else if file_type.is_file() {
                out.push(entry.path());
            }
        }
        Ok(())
    }
}

impl FileSystem for OsFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        // Write-then-rename so readers never observe a partial file.
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, path)
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        std::fs::metadata(path)?.modified()
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        Self::walk(dir, &mut out)?;
        out.sort();
        Ok(out)
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                out.push(entry.path());
            }
        }
        out.sort();
        Ok(out)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        std::fs::remove_file(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-memory backend for tests. Modification times come from a logical
/// clock that advances on every write, and write/removal counters let
/// tests assert that a pipeline run touched nothing.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    files: BTreeMap<PathBuf, MemoryFile>,
    clock: u64,
    writes: u64,
    removals: u64,
}

#[derive(Debug, Clone)]
struct MemoryFile {
    contents: Vec<u8>,
    modified: SystemTime,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `write` calls observed so far.
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    /// Number of `remove_file` calls observed so far.
    pub fn remove_count(&self) -> u64 {
        self.lock().removals
    }

    /// Convenience for seeding test trees.
    pub fn write_str(&self, path: impl Into<PathBuf>, contents: &str) {
        let _ = self.write(&path.into(), contents.as_bytes());
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl MemoryInner {
    fn tick(&mut self) -> SystemTime {
        self.clock += 1;
        UNIX_EPOCH + Duration::from_secs(self.clock)
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        let inner = self.lock();
        let file = inner
            .files
            .get(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))?;
        String::from_utf8(file.contents.clone())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
        let mut inner = self.lock();
        let modified = inner.tick();
        inner.writes += 1;
        inner.files.insert(
            path.to_path_buf(),
            MemoryFile {
                contents: contents.to_vec(),
                modified,
            },
        );
        Ok(())
    }

    fn modified(&self, path: &Path) -> io::Result<SystemTime> {
        self.lock()
            .files
            .get(path)
            .map(|f| f.modified)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn list_files(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .lock()
            .files
            .keys()
            .filter(|p| p.starts_with(dir))
            .cloned()
            .collect())
    }

    fn list_dir(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .lock()
            .files
            .keys()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect())
    }

    fn create_dir_all(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        let mut inner = self.lock();
        inner.removals += 1;
        inner
            .files
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, path.display().to_string()))
    }

    fn exists(&self, path: &Path) -> bool {
        let inner = self.lock();
        inner.files.contains_key(path) || inner.files.keys().any(|p| p.starts_with(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_os_fs_walk_write_read() {
        let dir = tempfile::tempdir().expect("tempdir");
        let fs = OsFileSystem;
        let nested = dir.path().join("force-app").join("classes");
        fs.create_dir_all(&nested).expect("create dirs");
        fs.write(&nested.join("X.cls"), b"public class X {}").expect("write nested");
        fs.write(&dir.path().join("top.cls"), b"public class T {}").expect("write top");

        let files = fs.list_files(dir.path()).expect("walk");
        assert_eq!(files.len(), 2);
        assert!(fs.modified(&files[0]).is_ok());
        assert_eq!(
            fs.read_to_string(&nested.join("X.cls")).expect("read"),
            "public class X {}"
        );

        let direct = fs.list_dir(dir.path()).expect("list");
        assert_eq!(direct, vec![dir.path().join("top.cls")]);
        fs.remove_file(&dir.path().join("top.cls")).expect("remove");
        assert!(!fs.exists(&dir.path().join("top.cls")));
    }

    #[test]
    fn test_memory_fs_round_trip() {
        let fs = MemoryFileSystem::new();
        fs.write_str("/ws/classes/A.cls", "public class A {}");
        assert_eq!(
            fs.read_to_string(Path::new("/ws/classes/A.cls")).expect("read"),
            "public class A {}"
        );
        assert!(fs.exists(Path::new("/ws/classes")));
        assert_eq!(fs.write_count(), 1);
    }

    #[test]
    fn test_memory_fs_clock_orders_writes() {
        let fs = MemoryFileSystem::new();
        fs.write_str("/a", "first");
        fs.write_str("/b", "second");
        let a = fs.modified(Path::new("/a")).expect("mtime a");
        let b = fs.modified(Path::new("/b")).expect("mtime b");
        assert!(b > a);
    }

    #[test]
    fn test_list_dir_is_not_recursive() {
        let fs = MemoryFileSystem::new();
        fs.write_str("/out/A.json", "{}");
        fs.write_str("/out/fields/F.json", "{}");
        let direct = fs.list_dir(Path::new("/out")).expect("list");
        assert_eq!(direct, vec![PathBuf::from("/out/A.json")]);
        let all = fs.list_files(Path::new("/out")).expect("walk");
        assert_eq!(all.len(), 2);
    }
}
