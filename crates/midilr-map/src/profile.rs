//! Profile files on disk
//!
//! A profile is one YAML document of bindings. Profiles live in a single
//! folder and are addressed by file stem (`studio` → `studio.yaml`).

use crate::codec::ProfileDocument;
use crate::storage;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const PROFILE_EXTENSION: &str = "yaml";

/// Read a profile document
///
/// A missing file is an empty document, so a fresh install starts with no bindings.
pub fn load_document(path: &Path) -> Result<ProfileDocument> {
    log::info!("load_document: Loading from {:?}", path);

    let Some(contents) = storage::read_if_exists(path)? else {
        log::info!("load_document: Profile doesn't exist, starting empty");
        return Ok(ProfileDocument::new());
    };
    ProfileDocument::from_yaml(&contents)
        .with_context(|| format!("Failed to parse profile: {:?}", path))
}

/// Write a profile document
///
/// Creates parent directories if they don't exist.
pub fn save_document(path: &Path, doc: &ProfileDocument) -> Result<()> {
    log::info!("save_document: Saving {} elements to {:?}", doc.elements.len(), path);
    let yaml = doc.to_yaml().context("Failed to serialize profile to YAML")?;
    storage::write_creating_dirs(path, &yaml)
}

/// Folder of named profiles
#[derive(Debug, Clone)]
pub struct ProfileStore {
    dir: PathBuf,
}

impl ProfileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a profile name; a trailing `.yaml` is accepted
    pub fn path_for(&self, name: &str) -> PathBuf {
        let stem = name.strip_suffix(".yaml").unwrap_or(name);
        self.dir
            .join(format!("{}.{}", sanitize_name(stem), PROFILE_EXTENSION))
    }

    /// Names of the stored profiles, sorted
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        let entries = fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read profile directory: {:?}", self.dir))?;
        for entry in entries {
            let path = entry?.path();
            if path.extension().and_then(|s| s.to_str()) != Some(PROFILE_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).exists()
    }

    pub fn load(&self, name: &str) -> Result<ProfileDocument> {
        load_document(&self.path_for(name))
    }

    pub fn save(&self, name: &str, doc: &ProfileDocument) -> Result<()> {
        save_document(&self.path_for(name), doc)
    }

    pub fn delete(&self, name: &str) -> Result<()> {
        let path = self.path_for(name);
        if !path.exists() {
            return Err(anyhow::anyhow!("Profile not found: {name}"));
        }
        fs::remove_file(&path).with_context(|| format!("Failed to delete profile: {:?}", path))
    }
}

fn sanitize_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command_map::CommandMap;
    use crate::identity::MidiMessageId;

    fn sample_map() -> CommandMap {
        let mut map = CommandMap::new();
        map.bind(MidiMessageId::cc(1, 7).unwrap(), "Exposure");
        map.bind(MidiMessageId::note_on(2, 36).unwrap(), "NextPhoto");
        map
    }

    #[test]
    fn test_save_and_load_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("default.yaml");

        save_document(&path, &sample_map().to_document()).unwrap();

        let mut loaded = CommandMap::new();
        let report = loaded.load_document(&load_document(&path).unwrap());
        assert_eq!(report.loaded, 2);
        assert!(report.skipped.is_empty());
        assert_eq!(loaded.lookup(&MidiMessageId::cc(1, 7).unwrap()), Some("Exposure"));
    }

    #[test]
    fn test_missing_document_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let doc = load_document(&dir.path().join("default.yaml")).unwrap();
        assert!(doc.elements.is_empty());
    }

    #[test]
    fn test_unparseable_document_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "elements: [unterminated").unwrap();
        assert!(load_document(&path).is_err());
    }

    #[test]
    fn test_repeated_attribute_does_not_block_profile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("default.yaml");
        fs::write(
            &path,
            "root: settings\nelements:\n  - name: setting\n    attributes: { Channel: 1, Data: 7, MessageType: ControlChange, CommandName: Exposure }\n  - name: setting\n    attributes: { Channel: 1, Channel: 2, Data: 8, MessageType: ControlChange, CommandName: Contrast }\n",
        )
        .unwrap();

        let mut map = CommandMap::new();
        let report = map.load_document(&load_document(&path).unwrap());
        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped.len(), 1);
    }

    #[test]
    fn test_store_list_load_save_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::new(dir.path().join("profiles"));
        assert!(store.list().unwrap().is_empty());

        let doc = sample_map().to_document();
        store.save("studio", &doc).unwrap();
        store.save("live.yaml", &doc).unwrap();
        fs::write(store.dir().join("notes.txt"), "ignored").unwrap();

        assert_eq!(store.list().unwrap(), vec!["live", "studio"]);
        assert!(store.exists("studio"));
        assert_eq!(store.load("live").unwrap().elements.len(), 2);

        store.delete("studio").unwrap();
        assert!(!store.exists("studio"));
        assert!(store.delete("studio").is_err());
    }

    #[test]
    fn test_path_for_sanitizes() {
        let store = ProfileStore::new("/tmp/profiles");
        assert_eq!(store.path_for("my/profile"), PathBuf::from("/tmp/profiles/my_profile.yaml"));
    }
}
