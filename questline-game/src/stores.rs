//! Key-value store backends for save slots
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

use crate::KeyValueStore;

/// In-memory store. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    type Error = Infallible;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Directory-backed store: one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys map to file names one-to-one: anything outside `[A-Za-z0-9_-]`
    /// is written as `%XX` per UTF-8 byte.
    fn path_for(&self, key: &str) -> PathBuf {
        let mut file = String::with_capacity(key.len());
        for c in key.chars() {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                file.push(c);
            } else {
                let mut buf = [0; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(file, "%{byte:02X}");
                }
            }
        }
        self.root.join(format!("{file}.json"))
    }
}

fn io_error(path: &Path, source: io::Error) -> FileStoreError {
    FileStoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

impl KeyValueStore for FileStore {
    type Error = FileStoreError;

    fn get(&self, key: &str) -> Result<Option<String>, Self::Error> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(&path, err)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Self::Error> {
        fs::create_dir_all(&self.root).map_err(|err| io_error(&self.root, err))?;
        let path = self.path_for(key);
        let staging = path.with_extension("json.tmp");
        fs::write(&staging, value).map_err(|err| io_error(&staging, err))?;
        fs::rename(&staging, &path).map_err(|err| {
            let _ = fs::remove_file(&staging);
            io_error(&path, err)
        })
    }

    fn remove(&self, key: &str) -> Result<(), Self::Error> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(io_error(&path, err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_root(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "questline-store-{label}-{}",
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ))
    }

    #[test]
    fn memory_store_clones_share_entries() {
        let store = MemoryStore::default();
        let handle = store.clone();
        store.set("k", "v").unwrap();
        assert_eq!(handle.get("k").unwrap().as_deref(), Some("v"));
        handle.remove("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn file_store_survives_fresh_handle() {
        let root = temp_root("fresh");
        FileStore::new(&root).set("save/slot", "{\"a\":1}").unwrap();

        let reopened = FileStore::new(&root);
        assert_eq!(reopened.get("save/slot").unwrap().as_deref(), Some("{\"a\":1}"));
        assert!(root.join("save%2Fslot.json").exists());

        reopened.remove("save/slot").unwrap();
        reopened.remove("save/slot").unwrap();
        assert_eq!(reopened.get("save/slot").unwrap(), None);
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_store_keeps_similar_keys_apart() {
        let root = temp_root("apart");
        let store = FileStore::new(&root);
        store.set("a/b", "slash").unwrap();
        store.set("a_b", "underscore").unwrap();
        store.set("a%2Fb", "escaped").unwrap();
        assert_eq!(store.get("a/b").unwrap().as_deref(), Some("slash"));
        assert_eq!(store.get("a_b").unwrap().as_deref(), Some("underscore"));
        assert_eq!(store.get("a%2Fb").unwrap().as_deref(), Some("escaped"));
        assert!(root.join("a_b.json").exists());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn failed_rename_leaves_no_staging_file() {
        let root = temp_root("staging");
        let store = FileStore::new(&root);
        fs::create_dir_all(root.join("blocked.json")).unwrap();
        fs::write(root.join("blocked.json").join("inner"), "x").unwrap();

        assert!(store.set("blocked", "value").is_err());
        assert!(!root.join("blocked.json.tmp").exists());
        let _ = fs::remove_dir_all(root);
    }

    #[test]
    fn file_store_reads_missing_directory_as_empty() {
        let store = FileStore::new(temp_root("missing"));
        assert_eq!(store.get("anything").unwrap(), None);
    }
}
