use std::fs;
use std::path::{Path, PathBuf};

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::config::config_directory;
use crate::error::{AppError, AppResult};

const CACHE_FILE_NAME: &str = "test_case_cache.json";
const CACHE_LIMIT: usize = 256;

#[derive(Default, Serialize, Deserialize)]
struct CacheFile {
    entries: Vec<CacheEntry>,
}

#[derive(Serialize, Deserialize, Clone)]
struct CacheEntry {
    key: String,
    test_cases: String,
}

/// Generated test cases keyed by model and requirement text.
pub struct TestCaseCache {
    file_path: PathBuf,
    file: CacheFile,
    dirty: bool,
}

impl TestCaseCache {
    pub fn load() -> AppResult<Self> {
        Self::load_from(config_directory()?.join(CACHE_FILE_NAME))
    }

    pub fn load_from(path: PathBuf) -> AppResult<Self> {
        let file = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str::<CacheFile>(&contents)
                .map_err(|err| AppError::Configuration(format!("invalid cache file: {err}")))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => CacheFile::default(),
            Err(err) => return Err(AppError::Io(err)),
        };

        Ok(Self {
            file_path: path,
            file,
            dirty: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.file
            .entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.test_cases.clone())
    }

    pub fn insert(&mut self, key: String, test_cases: &str) {
        self.file.entries.retain(|entry| entry.key != key);
        self.file.entries.push(CacheEntry {
            key,
            test_cases: test_cases.to_string(),
        });

        if self.file.entries.len() > CACHE_LIMIT {
            let overflow = self.file.entries.len() - CACHE_LIMIT;
            self.file.entries.drain(0..overflow);
        }
        self.dirty = true;
    }

    pub fn save(&self) -> AppResult<()> {
        if !self.dirty {
            return Ok(());
        }
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(&self.file)
            .map_err(|err| AppError::Configuration(format!("failed to write cache: {err}")))?;
        fs::write(&self.file_path, data)?;
        Ok(())
    }

    pub fn compute_key(model: &str, requirement: &str) -> String {
        let mut hasher = Hasher::new();
        hasher.update(model.as_bytes());
        hasher.update(&[0]);
        hasher.update(requirement.trim().as_bytes());
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persists_entries_between_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        let key = TestCaseCache::compute_key("gemini-1.5-flash", "Users can log in.");

        let mut cache = TestCaseCache::load_from(path.clone()).unwrap();
        assert!(cache.get(&key).is_none());
        cache.insert(key.clone(), "1. Valid login");
        cache.save().unwrap();

        let reloaded = TestCaseCache::load_from(path).unwrap();
        assert_eq!(reloaded.get(&key).as_deref(), Some("1. Valid login"));
    }

    #[test]
    fn key_depends_on_model_and_text() {
        let a = TestCaseCache::compute_key("model-a", "Users can log in.");
        assert_eq!(a, TestCaseCache::compute_key("model-a", " Users can log in. "));
        assert_ne!(a, TestCaseCache::compute_key("model-b", "Users can log in."));
        assert_ne!(a, TestCaseCache::compute_key("model-a", "Users can log out."));
    }

    #[test]
    fn evicts_oldest_entries_past_the_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = TestCaseCache::load_from(dir.path().join(CACHE_FILE_NAME)).unwrap();
        for i in 0..CACHE_LIMIT + 5 {
            cache.insert(format!("key-{i}"), "cases");
        }
        assert!(cache.get("key-0").is_none());
        assert!(cache.get("key-4").is_none());
        assert!(cache.get("key-5").is_some());
        assert_eq!(cache.file.entries.len(), CACHE_LIMIT);
    }

    #[test]
    fn untouched_cache_is_not_written() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CACHE_FILE_NAME);
        TestCaseCache::load_from(path.clone()).unwrap().save().unwrap();
        assert!(!path.exists());
    }
}
