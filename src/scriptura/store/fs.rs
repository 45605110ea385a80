use super::KeyValueStore;
use crate::error::{Result, ScripturaError};
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// File-backed key-value storage: each key is a `<key>.json` file under `root`.
pub struct FsKv {
    root: PathBuf,
}

impl FsKv {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ScripturaError::Store(format!("Invalid storage key: {}", key)));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }

    fn ensure_dir(&self) -> Result<()> {
        if !self.root.exists() {
            fs::create_dir_all(&self.root).map_err(ScripturaError::Io)?;
        }
        Ok(())
    }
}

impl KeyValueStore for FsKv {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.key_path(key)?;
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(ScripturaError::Io)?;
        Ok(Some(content))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let target = self.key_path(key)?;
        self.ensure_dir()?;

        // Atomic write
        let tmp = self.root.join(format!(".{}-{}.tmp", key, Uuid::new_v4()));
        fs::write(&tmp, value).map_err(ScripturaError::Io)?;
        fs::rename(&tmp, target).map_err(ScripturaError::Io)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        if path.exists() {
            fs::remove_file(path).map_err(ScripturaError::Io)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn round_trips_documents_on_disk() {
        let dir = TempDir::new().unwrap();
        let kv = FsKv::new(dir.path().join("nested"));

        assert_eq!(kv.get("scriptura_bookmarks").unwrap(), None);
        kv.set("scriptura_bookmarks", "[]").unwrap();
        assert_eq!(
            kv.get("scriptura_bookmarks").unwrap(),
            Some("[]".to_string())
        );
        assert!(dir.path().join("nested/scriptura_bookmarks.json").exists());

        kv.remove("scriptura_bookmarks").unwrap();
        assert_eq!(kv.get("scriptura_bookmarks").unwrap(), None);
    }

    #[test]
    fn leaves_no_tmp_files_behind() {
        let dir = TempDir::new().unwrap();
        let kv = FsKv::new(dir.path());
        kv.set("k", "one").unwrap();
        kv.set("k", "two").unwrap();

        for entry in fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.ends_with(".tmp"), "Found leftover tmp file: {}", name);
        }
        assert_eq!(kv.get("k").unwrap(), Some("two".to_string()));
    }

    #[test]
    fn rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let kv = FsKv::new(dir.path());
        assert!(kv.set("../escape", "x").is_err());
        assert!(kv.get("").is_err());
    }
}
