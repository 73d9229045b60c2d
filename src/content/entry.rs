//! Content entry and collection models

use chrono::{DateTime, Local};
use std::path::PathBuf;

use super::FrontMatter;
use crate::config::{CollectionConfig, CollectionKind};

/// A single Markdown file inside a collection
#[derive(Debug, Clone)]
pub struct ContentEntry {
    /// File name, e.g. `hello-world.md`
    pub file_name: String,

    /// File name without the Markdown extension
    pub stem: String,

    /// Route key of the page, e.g. `blog/hello-world`
    pub route: String,

    /// Full source file path
    pub source: PathBuf,

    /// URL the raw Markdown is served from
    pub markdown_url: String,

    /// Whole file as read from disk
    pub raw: String,

    /// Markdown after the front-matter block
    pub body: String,

    pub front_matter: FrontMatter,
}

impl ContentEntry {
    /// Title from front-matter, falling back to the file stem
    pub fn title(&self) -> String {
        self.front_matter
            .title()
            .unwrap_or_else(|| self.stem.clone())
    }

    pub fn description(&self) -> Option<String> {
        self.front_matter.description()
    }

    pub fn date(&self) -> Option<DateTime<Local>> {
        self.front_matter.date()
    }
}

/// All entries loaded from one collection directory
#[derive(Debug, Clone)]
pub struct Collection {
    pub config: CollectionConfig,
    pub entries: Vec<ContentEntry>,
}

impl Collection {
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn kind(&self) -> CollectionKind {
        self.config.kind
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Find an entry by route key
    pub fn get(&self, route: &str) -> Option<&ContentEntry> {
        self.entries.iter().find(|e| e.route == route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(raw: &str) -> ContentEntry {
        let (front_matter, body) = FrontMatter::parse(raw).unwrap();
        ContentEntry {
            file_name: "first-post.md".to_string(),
            stem: "first-post".to_string(),
            route: "blog/first-post".to_string(),
            source: PathBuf::from("public/blog/first-post.md"),
            markdown_url: "/blog/first-post.md".to_string(),
            raw: raw.to_string(),
            body: body.to_string(),
            front_matter,
        }
    }

    #[test]
    fn test_title_falls_back_to_stem() {
        assert_eq!(entry("No front-matter").title(), "first-post");
        assert_eq!(entry("---\ntitle: Hi\n---\n").title(), "Hi");
    }

    #[test]
    fn test_collection_lookup() {
        let collection = Collection {
            config: CollectionConfig::pages("blog", "blog", "BlogPost"),
            entries: vec![entry("body")],
        };
        assert_eq!(collection.len(), 1);
        assert!(collection.get("blog/first-post").is_some());
        assert!(collection.get("blog/missing").is_none());
    }
}
