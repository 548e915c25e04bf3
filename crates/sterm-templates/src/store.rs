//! On-disk template storage.

use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use std::fs;
use sterm_parsers::{validate_file_stem, ValidateError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("unsafe template name: {0}")]
    UnsafeName(#[from] ValidateError),
    #[error("template not found: {0:?}")]
    NotFound(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistent storage for templates, one JSON file per name under a
/// dedicated directory.
pub struct TemplateStore {
    dir: Utf8PathBuf,
}

impl TemplateStore {
    pub fn new(dir: impl Into<Utf8PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, name: &str) -> Result<Utf8PathBuf, TemplateError> {
        let name = validate_file_stem(name)?;
        Ok(self.dir.join(format!("{name}.json")))
    }

    /// Save (or overwrite) a template.
    ///
    /// The file is written to a temporary sibling and renamed into
    /// place, so a crash can never leave a half-written template.
    pub fn save(
        &self,
        name: &str,
        params: &BTreeMap<String, String>,
    ) -> Result<(), TemplateError> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.dir)?;

        let content = serde_json::to_string_pretty(params)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    /// Load a template by name.
    pub fn load(&self, name: &str) -> Result<BTreeMap<String, String>, TemplateError> {
        let path = self.path_for(name)?;
        if !path.is_file() {
            return Err(TemplateError::NotFound(name.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Sorted names of all stored templates. Raw paths stay internal.
    pub fn list(&self) -> Result<Vec<String>, TemplateError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in self.dir.read_dir_utf8()? {
            let entry = entry?;
            let path = entry.path();
            if path.extension() == Some("json") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Delete a stored template. Returns false if it did not exist.
    pub fn delete(&self, name: &str) -> Result<bool, TemplateError> {
        let path = self.path_for(name)?;
        if path.is_file() {
            fs::remove_file(&path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Seed the built-in templates on first run.
    ///
    /// Writes nothing if any template already exists, so a deleted
    /// default stays deleted.
    pub fn ensure_defaults(&self) -> Result<(), TemplateError> {
        if !self.list()?.is_empty() {
            return Ok(());
        }
        for (name, params) in crate::defaults::default_templates() {
            self.save(name, &params)?;
        }
        Ok(())
    }

    pub fn dir(&self) -> &Utf8Path {
        &self.dir
    }
}
