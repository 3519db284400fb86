//! Application configuration loaded from a JSON file.
//!
//! Every field has a default, so an empty object (or no file at all) gives
//! the stock export settings with the embedded templates.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::acquisition::{DirectorySource, EmbeddedSource, HttpSource, TemplateSource};
use crate::error::Result;
use crate::export::ExportOptions;

/// Where template resources are fetched from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TemplateConfig {
    #[default]
    Embedded,
    Directory {
        path: PathBuf,
    },
    Http {
        base_url: String,
    },
}

impl TemplateConfig {
    pub fn build(&self) -> Box<dyn TemplateSource> {
        match self {
            TemplateConfig::Embedded => Box::new(EmbeddedSource),
            TemplateConfig::Directory { path } => Box::new(DirectorySource::new(path.clone())),
            TemplateConfig::Http { base_url } => Box::new(HttpSource::new(base_url.clone())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub export: ExportOptions,
    pub templates: TemplateConfig,
    /// Directory finished PDFs are written to.
    pub output_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            export: ExportOptions::default(),
            templates: TemplateConfig::default(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let config = Self::from_json(&json)?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
