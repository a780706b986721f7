//! TOML configuration.
//!
//! ```toml
//! [db]
//! path = "./data/fsearch.sqlite"
//!
//! [index]
//! name = "fractal_search"
//!
//! [partition]
//! max_documents = 2
//!
//! [search]
//! default_limit = 10
//!
//! [server]
//! bind = "127.0.0.1:5000"
//!
//! [sources.filesystem]
//! root = "./docs"
//! ```
//!
//! Every section except `[db]` is optional.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use fractal_search_core::store::IndexSchema;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub partition: PartitionConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IndexConfig {
    #[serde(default = "default_index_name")]
    pub name: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            name: default_index_name(),
        }
    }
}

fn default_index_name() -> String {
    "fractal_search".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct PartitionConfig {
    #[serde(default = "default_max_documents")]
    pub max_documents: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            max_documents: default_max_documents(),
        }
    }
}

fn default_max_documents() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
        }
    }
}

fn default_limit() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5000".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    pub filesystem: Option<FilesystemSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FilesystemSourceConfig {
    pub root: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
    #[serde(default)]
    pub exclude_globs: Vec<String>,
    #[serde(default)]
    pub follow_symlinks: bool,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.md".to_string(), "**/*.txt".to_string()]
}

impl Config {
    /// Defaults for commands that can run without a config file.
    pub fn minimal() -> Self {
        Self {
            db: DbConfig {
                path: PathBuf::from("./data/fsearch.sqlite"),
            },
            index: IndexConfig::default(),
            partition: PartitionConfig::default(),
            search: SearchConfig::default(),
            server: ServerConfig::default(),
            sources: SourcesConfig::default(),
        }
    }

    /// The `{id, text, label}` schema under the configured index name.
    pub fn schema(&self) -> IndexSchema {
        IndexSchema::labeled(self.index.name.clone())
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.partition.max_documents == 0 {
        anyhow::bail!("partition.max_documents must be >= 1");
    }

    if config.search.default_limit == 0 {
        anyhow::bail!("search.default_limit must be >= 1");
    }

    config
        .schema()
        .validate()
        .with_context(|| "Invalid [index] section")?;

    Ok(config)
}
