//! Page table - maps every output page key to its template and data

use indexmap::IndexMap;
use serde::Serialize;
use std::collections::HashSet;

use crate::config::{CollectionKind, SiteConfig, StaticPageConfig};
use crate::content::{Collection, ContentEntry};
use crate::error::{Error, Result};

/// Name of the template every page renders with unless overridden
pub const DEFAULT_TEMPLATE: &str = "page.html";

/// Route of the page served at the site root; it never gets a `/index` copy
pub const INDEX_ROUTE: &str = "index";

/// One output page
#[derive(Debug, Clone, Serialize)]
pub struct PageEntry {
    /// Logical route without the `/index` alias, e.g. `blog/hello`
    pub route: String,
    pub template: String,
    /// Client entry script
    pub entry: String,
    /// Client component that renders this page
    pub component: String,
    /// Collection the page was generated from
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    pub data: PageData,
}

/// Per-page data handed to the template and embedded for hydration
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub markdown_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_markdown_file: Option<String>,
    /// Collection whose summaries this page lists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listing: Option<String>,
}

impl PageEntry {
    /// Entry for a page not backed by a content file
    pub fn static_page(config: &SiteConfig, page: &StaticPageConfig) -> Self {
        Self {
            route: page.route().to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            entry: config.entry.clone(),
            component: page.component.clone(),
            collection: None,
            data: PageData {
                listing: page.listing.clone(),
                ..PageData::default()
            },
        }
    }

    /// Entry for a collection item
    pub fn content(config: &SiteConfig, collection: &Collection, item: &ContentEntry) -> Self {
        Self {
            route: item.route.clone(),
            template: DEFAULT_TEMPLATE.to_string(),
            entry: config.entry.clone(),
            component: collection.config.component.clone(),
            collection: Some(collection.name().to_string()),
            data: PageData {
                markdown_source: Some(site_relative_source(config, collection, item)),
                markdown_url: Some(item.markdown_url.clone()),
                raw_markdown_file: Some(item.raw.clone()),
                listing: None,
            },
        }
    }

    /// Human readable origin, used in duplicate route errors
    fn origin(&self) -> String {
        match &self.data.markdown_source {
            Some(source) => source.clone(),
            None => format!("page {}", self.component),
        }
    }
}

/// Source path relative to the site, e.g. `./public/blog/hello.md`
fn site_relative_source(config: &SiteConfig, collection: &Collection, item: &ContentEntry) -> String {
    let mut path = String::from(".");
    for part in [config.content_dir.as_str(), collection.config.dir.as_str()] {
        for segment in part.split('/').filter(|s| !s.is_empty() && *s != ".") {
            path.push('/');
            path.push_str(segment);
        }
    }
    path.push('/');
    path.push_str(&item.file_name);
    path
}

/// Register a page under both `route` and `route/index`
pub fn page_and_dir(route: &str, entry: PageEntry) -> [(String, PageEntry); 2] {
    let route = route.trim_matches('/');
    [
        (route.to_string(), entry.clone()),
        (format!("{}/index", route), entry),
    ]
}

/// Insertion-ordered table of output pages
#[derive(Debug, Clone, Default)]
pub struct PageTable {
    pages: IndexMap<String, PageEntry>,
}

impl PageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the full table for a site
    ///
    /// Static pages come in config order, each followed by the items of the
    /// page collection mounted under its route. Collections without such a
    /// page are appended at the end.
    pub fn build(config: &SiteConfig, collections: &[Collection]) -> Result<Self> {
        let mut table = Self::new();
        let mut mounted: HashSet<&str> = HashSet::new();

        for page in &config.pages {
            let entry = PageEntry::static_page(config, page);
            if page.with_index && page.route() != INDEX_ROUTE {
                table.insert_all(page_and_dir(page.route(), entry))?;
            } else {
                table.insert(page.route(), entry)?;
            }

            for collection in collections {
                if collection.kind() == CollectionKind::Pages
                    && collection.config.route_prefix() == page.route()
                    && mounted.insert(collection.name())
                {
                    table.insert_collection(config, collection)?;
                }
            }
        }

        for collection in collections {
            if collection.kind() == CollectionKind::Pages && mounted.insert(collection.name()) {
                table.insert_collection(config, collection)?;
            }
        }

        Ok(table)
    }

    fn insert_collection(&mut self, config: &SiteConfig, collection: &Collection) -> Result<()> {
        for item in &collection.entries {
            let entry = PageEntry::content(config, collection, item);
            self.insert_all(page_and_dir(&item.route, entry))?;
        }
        Ok(())
    }

    fn insert_all(&mut self, pages: [(String, PageEntry); 2]) -> Result<()> {
        for (key, entry) in pages {
            self.insert(&key, entry)?;
        }
        Ok(())
    }

    /// Add a page; a key may only be produced once
    pub fn insert(&mut self, key: &str, entry: PageEntry) -> Result<()> {
        if let Some(existing) = self.pages.get(key) {
            return Err(Error::DuplicateRoute {
                route: key.to_string(),
                first: existing.origin(),
                second: entry.origin(),
            });
        }
        self.pages.insert(key.to_string(), entry);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&PageEntry> {
        self.pages.get(key)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PageEntry)> {
        self.pages.iter()
    }

    /// The `…/index` copies of a collection's pages, one per content file
    pub fn canonical<'a>(
        &'a self,
        collection: &'a str,
    ) -> impl Iterator<Item = (&'a String, &'a PageEntry)> + 'a {
        self.pages.iter().filter(move |(key, entry)| {
            entry.collection.as_deref() == Some(collection) && key.ends_with("/index")
        })
    }

    /// Output file for every page key
    pub fn inputs(&self) -> IndexMap<String, String> {
        self.pages
            .keys()
            .map(|key| (key.clone(), format!("{}.html", key)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionConfig;
    use crate::content::FrontMatter;
    use std::path::PathBuf;

    fn item(prefix: &str, file: &str) -> ContentEntry {
        let stem = file.rsplit_once('.').map(|(s, _)| s).unwrap_or(file);
        ContentEntry {
            file_name: file.to_string(),
            stem: stem.to_string(),
            route: format!("{}/{}", prefix, stem),
            source: PathBuf::from(format!("public/{}/{}", prefix, file)),
            markdown_url: format!("/{}/{}", prefix, file),
            raw: "---\ntitle: T\n---\nbody".to_string(),
            body: "body".to_string(),
            front_matter: FrontMatter::default(),
        }
    }

    fn collections() -> Vec<Collection> {
        vec![
            Collection {
                config: CollectionConfig::pages("blog", "blog", "BlogPost"),
                entries: vec![item("blog", "hello.md"), item("blog", "world.md")],
            },
            Collection {
                config: CollectionConfig::pages("portfolio", "portfolio", "PortfolioPiece"),
                entries: vec![item("portfolio", "bridge.md")],
            },
            Collection {
                config: CollectionConfig::data("experience", "about/experience"),
                entries: vec![item("about/experience", "acme.md")],
            },
        ]
    }

    #[test]
    fn test_page_and_dir() {
        let config = SiteConfig::default();
        let entry = PageEntry::static_page(&config, &StaticPageConfig::new("about", "About"));
        let [(a, _), (b, _)] = page_and_dir("/about/", entry);
        assert_eq!(a, "about");
        assert_eq!(b, "about/index");
    }

    #[test]
    fn test_build_order() {
        let config = SiteConfig::default();
        let table = PageTable::build(&config, &collections()).unwrap();
        let keys: Vec<_> = table.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "index",
                "blog",
                "blog/index",
                "blog/hello",
                "blog/hello/index",
                "blog/world",
                "blog/world/index",
                "portfolio",
                "portfolio/index",
                "portfolio/bridge",
                "portfolio/bridge/index",
                "about",
                "about/index",
            ]
        );
    }

    #[test]
    fn test_entries_carry_data() {
        let config = SiteConfig::default();
        let table = PageTable::build(&config, &collections()).unwrap();

        let post = table.get("blog/hello/index").unwrap();
        assert_eq!(post.component, "BlogPost");
        assert_eq!(post.route, "blog/hello");
        assert_eq!(post.entry, "/main.js");
        assert_eq!(post.data.markdown_url.as_deref(), Some("/blog/hello.md"));
        assert_eq!(
            post.data.markdown_source.as_deref(),
            Some("./public/blog/hello.md")
        );
        assert!(post.data.raw_markdown_file.is_some());

        let portfolio = table.get("portfolio").unwrap();
        assert_eq!(portfolio.data.listing.as_deref(), Some("portfolio"));
        assert!(portfolio.data.markdown_url.is_none());
    }

    #[test]
    fn test_canonical_and_inputs() {
        let config = SiteConfig::default();
        let table = PageTable::build(&config, &collections()).unwrap();

        let canonical: Vec<_> = table.canonical("blog").map(|(k, _)| k.as_str()).collect();
        assert_eq!(canonical, vec!["blog/hello/index", "blog/world/index"]);

        let inputs = table.inputs();
        assert_eq!(inputs.get("index").map(String::as_str), Some("index.html"));
        assert_eq!(
            inputs.get("blog/hello/index").map(String::as_str),
            Some("blog/hello/index.html")
        );
        assert_eq!(inputs.len(), table.len());
    }

    #[test]
    fn test_duplicate_route_is_error() {
        let config = SiteConfig::default();
        let mut cols = collections();
        cols[0].entries.push(item("blog", "hello.markdown"));

        match PageTable::build(&config, &cols) {
            Err(Error::DuplicateRoute {
                route,
                first,
                second,
            }) => {
                assert_eq!(route, "blog/hello");
                assert!(first.ends_with("hello.md"));
                assert!(second.ends_with("hello.markdown"));
            }
            other => panic!("expected duplicate route, got {:?}", other),
        }
    }

    #[test]
    fn test_content_colliding_with_static_page() {
        let mut config = SiteConfig::default();
        config.pages.push(StaticPageConfig::new("blog/hello", "Special"));
        assert!(matches!(
            PageTable::build(&config, &collections()),
            Err(Error::DuplicateRoute { .. })
        ));
    }

    #[test]
    fn test_unmounted_collection_appended() {
        let mut config = SiteConfig::default();
        config.pages.retain(|p| p.route != "portfolio");
        let table = PageTable::build(&config, &collections()).unwrap();
        let keys: Vec<_> = table.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys.last(), Some(&"portfolio/bridge/index"));
        assert!(!keys.contains(&"portfolio"));
    }

    #[test]
    fn test_index_page_has_single_key() {
        let yaml = r#"
pages:
  - route: index
    component: Home
  - route: blog
    component: BlogIndex
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        let table = PageTable::build(&config, &collections()).unwrap();
        assert!(table.get("index").is_some());
        assert!(table.get("index/index").is_none());
        assert_eq!(table.iter().next().map(|(k, _)| k.as_str()), Some("index"));
    }

    #[test]
    fn test_markdown_source_with_dot_content_dir() {
        let config = SiteConfig {
            content_dir: "./".to_string(),
            ..SiteConfig::default()
        };
        let table = PageTable::build(&config, &collections()).unwrap();
        let bridge = table.get("portfolio/bridge").unwrap();
        assert_eq!(
            bridge.data.markdown_source.as_deref(),
            Some("./portfolio/bridge.md")
        );
    }
}
