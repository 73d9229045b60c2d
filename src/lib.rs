//! folio: a static site generator for Markdown-driven portfolio and blog sites
//!
//! Markdown collections are scanned into a page table, each page is rendered
//! into an HTML shell carrying its data as JSON, and every collection is
//! exposed to the client as a virtual module with its summaries.

pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod modules;
pub mod pages;
pub mod router;
pub mod server;
pub mod templates;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};

/// Config file name, looked up in the site's base directory
pub const CONFIG_FILE: &str = "_config.yml";

/// A site on disk
#[derive(Debug, Clone)]
pub struct Site {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Content (Markdown and static assets) directory
    pub content_dir: PathBuf,
    /// Output directory
    pub output_dir: PathBuf,
    /// Page template overriding the built-in shell
    pub template_path: Option<PathBuf>,
}

impl Site {
    /// Create a new Site instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join(CONFIG_FILE);

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No {} found, using defaults", CONFIG_FILE);
            config::SiteConfig::default()
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a Site from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let content_dir = base_dir.join(&config.content_dir);
        let output_dir = base_dir.join(&config.output_dir);
        let template_path = config.template.as_ref().map(|t| base_dir.join(t));

        Self {
            config,
            base_dir,
            content_dir,
            output_dir,
            template_path,
        }
    }

    /// Enable or disable prerendering of page content
    pub fn prerender(mut self, enabled: bool) -> Self {
        self.config.prerender = enabled;
        self
    }

    pub fn config_path(&self) -> PathBuf {
        self.base_dir.join(CONFIG_FILE)
    }

    /// Generate the static site
    pub fn generate(&self) -> Result<generator::BuildReport> {
        generator::Generator::new(self)?.generate()
    }

    /// Remove the output directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
