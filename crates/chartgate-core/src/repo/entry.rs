//! Registry file schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const REGISTRY_API_VERSION: &str = "v1";

/// A named remote chart repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryEntry {
    pub name: String,
    pub url: String,
}

impl RepositoryEntry {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }

    /// Check the name is usable as a registry key and a cache file stem.
    pub fn validate_name(name: &str) -> Result<(), String> {
        if name.trim().is_empty() {
            return Err("repository name must not be empty".to_string());
        }
        if name.contains('/') || name.contains('\\') || name == "." || name == ".." {
            return Err(format!("repository name ({}) contains '/'", name));
        }
        Ok(())
    }
}

/// Ordered list of registered repositories as persisted on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryFile {
    #[serde(default)]
    pub api_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated: Option<DateTime<Utc>>,
    #[serde(default)]
    pub repositories: Vec<RepositoryEntry>,
}

impl Default for RegistryFile {
    fn default() -> Self {
        Self::new()
    }
}

impl RegistryFile {
    pub fn new() -> Self {
        Self {
            api_version: REGISTRY_API_VERSION.to_string(),
            generated: None,
            repositories: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&RepositoryEntry> {
        self.repositories.iter().find(|entry| entry.name == name)
    }

    /// Insert `entry`, replacing an entry with the same name in place.
    ///
    /// Returns `true` when an existing entry was replaced.
    pub fn update(&mut self, entry: RepositoryEntry) -> bool {
        match self.repositories.iter_mut().find(|e| e.name == entry.name) {
            Some(existing) => {
                *existing = entry;
                true
            }
            None => {
                self.repositories.push(entry);
                false
            }
        }
    }

    /// Remove the entry named `name`, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<RepositoryEntry> {
        let position = self.repositories.iter().position(|e| e.name == name)?;
        Some(self.repositories.remove(position))
    }
}
