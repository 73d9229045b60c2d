//! Content loader - scans collection directories for Markdown files

use std::fs;
use std::path::Path;
use walkdir::WalkDir;

use super::{Collection, ContentEntry, FrontMatter};
use crate::config::{CollectionConfig, CollectionKind};
use crate::error::{Error, Result};
use crate::Site;

/// Loads collections from the content directory
pub struct ContentLoader<'a> {
    site: &'a Site,
}

impl<'a> ContentLoader<'a> {
    /// Create a new content loader
    pub fn new(site: &'a Site) -> Self {
        Self { site }
    }

    /// Load every configured collection, in config order
    pub fn load_all(&self) -> Result<Vec<Collection>> {
        self.site
            .config
            .collections
            .iter()
            .map(|c| self.load_collection(c))
            .collect()
    }

    /// Load a collection by name
    pub fn load_named(&self, name: &str) -> Result<Collection> {
        let config = self
            .site
            .config
            .collection(name)
            .ok_or_else(|| Error::UnknownCollection(name.to_string()))?;
        self.load_collection(config)
    }

    /// Load the direct children of a collection directory
    pub fn load_collection(&self, config: &CollectionConfig) -> Result<Collection> {
        let dir = self.site.content_dir.join(&config.dir);
        let mut entries = Vec::new();

        if !dir.is_dir() {
            tracing::warn!(
                "Collection {} has no directory at {:?}",
                config.name,
                dir
            );
            return Ok(Collection {
                config: config.clone(),
                entries,
            });
        }

        for entry in WalkDir::new(&dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(&dir).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                Error::io(path, source)
            })?;

            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if is_hidden(path) {
                tracing::debug!("Skipping hidden file {:?}", path);
                continue;
            }
            if !is_markdown_file(path) {
                tracing::debug!("Skipping non-markdown file {:?}", path);
                continue;
            }

            entries.push(self.load_entry(config, path)?);
        }

        tracing::debug!("Loaded {} entries from {}", entries.len(), config.name);

        Ok(Collection {
            config: config.clone(),
            entries,
        })
    }

    /// Load a single Markdown file
    fn load_entry(&self, config: &CollectionConfig, path: &Path) -> Result<ContentEntry> {
        let raw = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;

        let (front_matter, body) =
            FrontMatter::parse(&raw).map_err(|source| Error::FrontMatter {
                path: path.to_path_buf(),
                source,
            })?;
        let body = body.to_string();

        let file_name = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let stem = strip_markdown_ext(&file_name).to_string();

        let prefix = config.route_prefix();
        let route = format!("{}/{}", prefix, stem);

        // Pages are served under their prefix, data files where they live on disk
        let url_base = match config.kind {
            CollectionKind::Pages => prefix,
            CollectionKind::Data => config.dir.trim_matches('/'),
        };
        let markdown_url = format!("/{}/{}", url_base, file_name);

        Ok(ContentEntry {
            file_name,
            stem,
            route,
            source: path.to_path_buf(),
            markdown_url,
            raw,
            body,
            front_matter,
        })
    }
}

/// Check if a file is a markdown file
pub fn is_markdown_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("md") || e.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

/// Dot-files are neither pages nor published assets
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|s| s.starts_with('.'))
        .unwrap_or(false)
}

fn strip_markdown_ext(file_name: &str) -> &str {
    match file_name.rfind('.') {
        Some(pos) => &file_name[..pos],
        None => file_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn site_with(files: &[(&str, &str)]) -> (TempDir, Site) {
        let tmp = TempDir::new().unwrap();
        for (path, content) in files {
            let full = tmp.path().join("public").join(path);
            fs::create_dir_all(full.parent().unwrap()).unwrap();
            fs::write(full, content).unwrap();
        }
        let site = Site::new(tmp.path()).unwrap();
        (tmp, site)
    }

    #[test]
    fn test_load_pages_collection() {
        let (_tmp, site) = site_with(&[
            ("blog/b-second.md", "---\ntitle: Second\n---\nTwo"),
            ("blog/a-first.md", "---\ntitle: First\n---\nOne"),
            ("blog/cover.png", "not markdown"),
            ("blog/drafts/nested.md", "---\ntitle: Nested\n---\n"),
        ]);
        let loader = ContentLoader::new(&site);
        let blog = loader.load_named("blog").unwrap();

        let routes: Vec<_> = blog.entries.iter().map(|e| e.route.as_str()).collect();
        assert_eq!(routes, vec!["blog/a-first", "blog/b-second"]);

        let first = &blog.entries[0];
        assert_eq!(first.stem, "a-first");
        assert_eq!(first.markdown_url, "/blog/a-first.md");
        assert_eq!(first.title(), "First");
        assert_eq!(first.body, "One");
    }

    #[test]
    fn test_load_data_collection_urls() {
        let (_tmp, site) = site_with(&[(
            "about/experience/acme.md",
            "---\ncompany: Acme\n---\nBuilt things",
        )]);
        let loader = ContentLoader::new(&site);
        let experience = loader.load_named("experience").unwrap();
        assert_eq!(experience.len(), 1);
        assert_eq!(
            experience.entries[0].markdown_url,
            "/about/experience/acme.md"
        );
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let (_tmp, site) = site_with(&[]);
        let loader = ContentLoader::new(&site);
        let collections = loader.load_all().unwrap();
        assert_eq!(collections.len(), 4);
        assert!(collections.iter().all(|c| c.is_empty()));
    }

    #[test]
    fn test_bad_frontmatter_propagates_with_path() {
        let (_tmp, site) = site_with(&[("blog/broken.md", "---\ntitle: Broken\n")]);
        let loader = ContentLoader::new(&site);
        match loader.load_named("blog") {
            Err(Error::FrontMatter { path, .. }) => assert!(path.ends_with("broken.md")),
            other => panic!("expected front-matter error, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_collection() {
        let (_tmp, site) = site_with(&[]);
        let loader = ContentLoader::new(&site);
        assert!(matches!(
            loader.load_named("nope"),
            Err(Error::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_markdown_extensions() {
        assert!(is_markdown_file(Path::new("a.md")));
        assert!(is_markdown_file(Path::new("a.markdown")));
        assert!(is_markdown_file(Path::new("a.MD")));
        assert!(!is_markdown_file(Path::new("a.mdx")));
        assert_eq!(strip_markdown_ext("post.v2.md"), "post.v2");
    }

    #[test]
    fn test_hidden_files_are_skipped() {
        let (_tmp, site) = site_with(&[
            ("blog/.draft.md", "---\ntitle: Draft\n---\n"),
            ("blog/post.md", "---\ntitle: Post\n---\n"),
        ]);
        let blog = ContentLoader::new(&site).load_named("blog").unwrap();
        let stems: Vec<_> = blog.entries.iter().map(|e| e.stem.as_str()).collect();
        assert_eq!(stems, vec!["post"]);
    }
}
