//! Source documents and the directory reader that loads them.

use crate::error::{CrewLabError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// A loaded text document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: Uuid,
    pub text: String,
    pub metadata: BTreeMap<String, String>,
}

impl Document {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    fn from_file(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();

        Ok(Document::new(String::from_utf8_lossy(&bytes))
            .with_metadata("file_path", path.to_string_lossy())
            .with_metadata("file_name", file_name))
    }
}

/// Loads documents from explicit files or from a directory.
///
/// ```ignore
/// let docs = DirectoryReader::from_files(["data/artigo1.txt"]).load_data()?;
/// let all = DirectoryReader::from_dir("data").pattern("*.txt").recursive(true).load_data()?;
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryReader {
    input_files: Vec<PathBuf>,
    input_dir: Option<PathBuf>,
    pattern: String,
    recursive: bool,
}

impl DirectoryReader {
    pub fn from_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            input_files: files.into_iter().map(Into::into).collect(),
            input_dir: None,
            pattern: "*".to_string(),
            recursive: false,
        }
    }

    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            input_files: Vec::new(),
            input_dir: Some(dir.into()),
            pattern: "*".to_string(),
            recursive: false,
        }
    }

    /// Glob applied to file names inside the directory (default `*`)
    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = pattern.into();
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn load_data(&self) -> Result<Vec<Document>> {
        let files = match &self.input_dir {
            Some(dir) => self.discover(dir)?,
            None => self.input_files.clone(),
        };

        files
            .iter()
            .map(|path| {
                debug!(path = %path.display(), "Reading document");
                Document::from_file(path)
            })
            .collect()
    }

    fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(CrewLabError::ConfigError(format!(
                "Directory {} does not exist",
                dir.display()
            )));
        }

        let pattern = if self.recursive {
            dir.join("**").join(&self.pattern)
        } else {
            dir.join(&self.pattern)
        };

        let entries = glob::glob(&pattern.to_string_lossy())
            .map_err(|e| CrewLabError::ConfigError(format!("Invalid pattern: {}", e)))?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable path");
                    None
                }
            })
            .filter(|path| path.is_file() && !is_hidden(path))
            .collect();
        files.sort();

        if files.is_empty() {
            return Err(CrewLabError::ConfigError(format!(
                "No files found in {}",
                dir.display()
            )));
        }

        Ok(files)
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name().map(|n| n.to_string_lossy().starts_with('.')).unwrap_or(false)
}
