//! The message index: message identifier → rendered file path, kept as `dump.json`.
//!
//! Written at the end of the fetch run and read back by the acknowledge run.
//! The JSON object keeps insertion order so the file lists messages in the
//! order they were fetched.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::{info, warn};

use crate::error::{Inbox2HtmlError, Result};

/// Default file name of the index inside the output directory.
pub const DEFAULT_INDEX_FILE: &str = "dump.json";

/// Ordered map of message identifier to output file path. Keys are unique.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageIndex {
    entries: Vec<(String, String)>,
    /// Position of each key in `entries`.
    positions: HashMap<String, usize>,
}

impl MessageIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `message_id → path`.
    ///
    /// A key that is already present keeps its position and gets the new path.
    pub fn insert(&mut self, message_id: impl Into<String>, path: impl AsRef<Path>) {
        let message_id = message_id.into();
        let path = path.as_ref().to_string_lossy().into_owned();
        match self.positions.get(&message_id) {
            Some(&pos) => {
                warn!(message_id = %message_id, "Duplicate Message-ID, replacing index entry");
                self.entries[pos].1 = path;
            }
            None => {
                self.positions.insert(message_id.clone(), self.entries.len());
                self.entries.push((message_id, path));
            }
        }
    }

    pub fn get(&self, message_id: &str) -> Option<&str> {
        self.positions
            .get(message_id)
            .map(|&pos| self.entries[pos].1.as_str())
    }

    /// Message identifiers in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(id, p)| (id.as_str(), p.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Read an index written by [`MessageIndex::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Inbox2HtmlError::IndexMissing(path.to_path_buf()));
            }
            Err(e) => return Err(Inbox2HtmlError::io(path, e)),
        };
        let index: Self =
            serde_json::from_slice(&data).map_err(|e| Inbox2HtmlError::InvalidIndex {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        info!(path = %path.display(), entries = index.len(), "Loaded message index");
        Ok(index)
    }

    /// Write the index as a JSON object, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_vec(self).map_err(|e| Inbox2HtmlError::InvalidIndex {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json).map_err(|e| Inbox2HtmlError::io(path, e))?;
        info!(path = %path.display(), entries = self.len(), "Saved message index");
        Ok(())
    }
}

/// `<output_dir>/<file_name>`.
pub fn index_path(output_dir: &Path, file_name: &str) -> PathBuf {
    output_dir.join(file_name)
}

impl Serialize for MessageIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, path) in &self.entries {
            map.serialize_entry(id, path)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for MessageIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_map(IndexVisitor)
    }
}

struct IndexVisitor;

impl<'de> Visitor<'de> for IndexVisitor {
    type Value = MessageIndex;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object mapping message ids to file paths")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
        let mut index = MessageIndex::new();
        while let Some((id, path)) = access.next_entry::<String, String>()? {
            index.insert(id, path);
        }
        Ok(index)
    }
}
