//! Transient key-value store shared between the upload step and the preview.
//!
//! Values are strings, the way a browser's local storage holds them. The
//! store is a single JSON file with one active session.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decode::encode_data_url;
use crate::error::PreviewError;

pub const DOCUMENT_KEY: &str = "previewPdfDataUrl";
pub const PROJECT_KEY: &str = "previewProjectData";

const PDF_MIME: &str = "application/pdf";

/// A document captured by the upload step, as a data URL
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredDocument(String);

impl StoredDocument {
    #[must_use]
    pub fn data_url(&self) -> &str {
        &self.0
    }
}

/// Form data of the user's project. Carried along, never read by rendering.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectMetadata(pub serde_json::Map<String, serde_json::Value>);

impl ProjectMetadata {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SessionStore {
    entries: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    saved_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    file_path: Option<PathBuf>,
}

impl SessionStore {
    pub fn ephemeral() -> Self {
        Self::default()
    }

    pub fn with_file(file_path: &Path) -> Self {
        Self {
            file_path: Some(file_path.to_path_buf()),
            ..Self::default()
        }
    }

    /// Load the store, or start an empty one bound to `file_path` if it does
    /// not exist yet
    pub fn load_from_file(file_path: &Path) -> anyhow::Result<Self> {
        if !file_path.exists() {
            return Ok(Self::with_file(file_path));
        }
        let content = fs::read_to_string(file_path)
            .with_context(|| format!("reading session store {}", file_path.display()))?;
        let mut store: Self = serde_json::from_str(&content)
            .with_context(|| format!("parsing session store {}", file_path.display()))?;
        store.file_path = Some(file_path.to_path_buf());
        Ok(store)
    }

    pub fn save(&mut self) -> anyhow::Result<()> {
        let Some(path) = self.file_path.clone() else {
            // Ephemeral stores don't save to disk
            return Ok(());
        };
        self.saved_at = Some(Utc::now());
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(&path, content)
            .with_context(|| format!("writing session store {}", path.display()))?;
        log::debug!("Saved session store to {}", path.display());
        Ok(())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.entries.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.entries.remove(key)
    }

    #[must_use]
    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.saved_at
    }

    /// The document left by the upload step
    pub fn stored_document(&self) -> Result<StoredDocument, PreviewError> {
        self.get(DOCUMENT_KEY)
            .filter(|url| !url.trim().is_empty())
            .map(|url| StoredDocument(url.to_string()))
            .ok_or(PreviewError::MissingInput)
    }

    /// Project form data, if the upload step stored any
    pub fn project_metadata(&self) -> Result<Option<ProjectMetadata>, PreviewError> {
        self.get(PROJECT_KEY)
            .map(|json| {
                serde_json::from_str(json)
                    .context("parsing stored project data")
                    .map_err(PreviewError::Session)
            })
            .transpose()
    }

    /// Record a PDF for preview, replacing whatever was stored before
    pub fn store_document(
        &mut self,
        pdf: &[u8],
        project: Option<&ProjectMetadata>,
    ) -> anyhow::Result<()> {
        self.set(DOCUMENT_KEY, encode_data_url(PDF_MIME, pdf));
        match project {
            Some(project) => self.set(PROJECT_KEY, serde_json::to_string(project)?),
            None => {
                self.remove(PROJECT_KEY);
            }
        }
        self.save()
    }

    /// Forget the stored document and project data
    pub fn clear(&mut self) -> anyhow::Result<()> {
        self.remove(DOCUMENT_KEY);
        self.remove(PROJECT_KEY);
        self.save()
    }
}
