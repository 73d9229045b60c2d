//! Site configuration (_config.yml)

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub content_dir: String,
    pub output_dir: String,
    /// Optional HTML template overriding the built-in shell
    pub template: Option<String>,

    // Client
    pub entry: String,
    pub module_scope: String,
    pub not_found_component: String,

    // Rendering
    pub prerender: bool,
    #[serde(default)]
    pub highlight: HighlightConfig,

    // Content
    pub collections: Vec<CollectionConfig>,
    pub pages: Vec<StaticPageConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "Portfolio".to_string(),
            description: String::new(),
            author: String::new(),
            language: "en".to_string(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            content_dir: "public".to_string(),
            output_dir: "dist".to_string(),
            template: None,

            entry: "/main.js".to_string(),
            module_scope: "@kepler".to_string(),
            not_found_component: "PageNotFound".to_string(),

            prerender: false,
            highlight: HighlightConfig::default(),

            collections: vec![
                CollectionConfig::pages("blog", "blog", "BlogPost"),
                CollectionConfig::pages("portfolio", "portfolio", "PortfolioPiece"),
                CollectionConfig::data("experience", "about/experience"),
                CollectionConfig::data("education", "about/education"),
            ],
            pages: vec![
                StaticPageConfig {
                    route: "index".to_string(),
                    component: "Home".to_string(),
                    with_index: false,
                    listing: None,
                },
                StaticPageConfig::new("blog", "BlogIndex"),
                StaticPageConfig {
                    listing: Some("portfolio".to_string()),
                    ..StaticPageConfig::new("portfolio", "PortfolioIndex")
                },
                StaticPageConfig::new("about", "About"),
            ],
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let config: SiteConfig =
            serde_yaml::from_str(&content).map_err(|source| Error::ConfigParse {
                path: path.to_path_buf(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross references between collections and pages
    pub fn validate(&self) -> Result<()> {
        let mut names = HashSet::new();
        for collection in &self.collections {
            if !names.insert(collection.name.as_str()) {
                return Err(Error::Config(format!(
                    "collection {:?} is defined twice",
                    collection.name
                )));
            }
            if collection.route_prefix().is_empty() {
                return Err(Error::Config(format!(
                    "collection {:?} has neither a prefix nor a dir",
                    collection.name
                )));
            }
        }

        for page in &self.pages {
            if page.route.trim_matches('/').is_empty() {
                return Err(Error::Config("static page with an empty route".to_string()));
            }
            if let Some(listing) = &page.listing {
                if !names.contains(listing.as_str()) {
                    return Err(Error::UnknownCollection(listing.clone()));
                }
            }
        }

        Ok(())
    }

    /// Look up a collection by name
    pub fn collection(&self, name: &str) -> Option<&CollectionConfig> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Id of the virtual module carrying a collection's summaries
    pub fn module_id(&self, collection: &str) -> String {
        format!("{}/{}", self.module_scope.trim_end_matches('/'), collection)
    }
}

/// What a collection produces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionKind {
    /// One routed page per file plus a summary module
    Pages,
    /// Only a summary module, no pages
    Data,
}

/// A directory of Markdown files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    /// Directory relative to `content_dir`
    pub dir: String,
    /// URL prefix of the collection's pages
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_kind")]
    pub kind: CollectionKind,
    /// Client component rendering a single item
    #[serde(default)]
    pub component: String,
}

fn default_kind() -> CollectionKind {
    CollectionKind::Pages
}

impl CollectionConfig {
    pub fn pages(name: &str, dir: &str, component: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.to_string(),
            prefix: dir.to_string(),
            kind: CollectionKind::Pages,
            component: component.to_string(),
        }
    }

    pub fn data(name: &str, dir: &str) -> Self {
        Self {
            name: name.to_string(),
            dir: dir.to_string(),
            prefix: dir.to_string(),
            kind: CollectionKind::Data,
            component: String::new(),
        }
    }

    /// URL prefix without surrounding slashes, falling back to `dir`
    pub fn route_prefix(&self) -> &str {
        let prefix = self.prefix.trim_matches('/');
        if prefix.is_empty() {
            self.dir.trim_matches('/')
        } else {
            prefix
        }
    }
}

/// A page that is not backed by a content file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StaticPageConfig {
    pub route: String,
    pub component: String,
    /// Register `route/index` next to `route`
    #[serde(default = "default_true")]
    pub with_index: bool,
    /// Collection whose summaries are attached to this page
    #[serde(default)]
    pub listing: Option<String>,
}

fn default_true() -> bool {
    true
}

impl StaticPageConfig {
    pub fn new(route: &str, component: &str) -> Self {
        Self {
            route: route.to_string(),
            component: component.to_string(),
            with_index: true,
            listing: None,
        }
    }

    pub fn route(&self) -> &str {
        self.route.trim_matches('/')
    }
}

/// Code highlighting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightConfig {
    pub enable: bool,
    pub theme: String,
    pub line_number: bool,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self {
            enable: true,
            theme: "base16-ocean.dark".to_string(),
            line_number: false,
        }
    }
}
