//! Client route table
//!
//! Patterns use `{name}` for one path segment and `{...name}` for the rest of
//! the path. The table is matched in order, first match wins, and is written
//! to `routes.json` so the client router and the dev server agree on which
//! component owns a URL.

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

use crate::config::{CollectionKind, SiteConfig};
use crate::error::{Error, Result};
use crate::helpers::decode_url;
use crate::pages::INDEX_ROUTE;

/// A compiled route pattern
#[derive(Debug, Clone)]
pub struct RoutePattern {
    pattern: String,
    regex: Regex,
    params: Vec<String>,
    catch_all: bool,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidRoutePattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let mut source = String::from("^");
        let mut params = Vec::new();
        let mut catch_all = false;
        let mut rest = pattern;

        while let Some(open) = rest.find(['{', '}']) {
            if rest[open..].starts_with('}') {
                return Err(invalid("unmatched `}`"));
            }
            source.push_str(&regex::escape(&rest[..open]));

            let after = &rest[open + 1..];
            let close = after.find('}').ok_or_else(|| invalid("unclosed `{`"))?;
            let inner = &after[..close];
            if inner.contains('{') {
                return Err(invalid("nested `{`"));
            }

            let (name, is_rest) = match inner.strip_prefix("...") {
                Some(name) => (name, true),
                None => (inner, false),
            };
            if !is_param_name(name) {
                return Err(invalid("parameter names must be identifiers"));
            }
            if params.iter().any(|p| p == name) {
                return Err(invalid("parameter used twice"));
            }

            if is_rest {
                source.push_str("(.*)");
                catch_all = true;
            } else {
                source.push_str("([^/]+)");
            }
            params.push(name.to_string());
            rest = &after[close + 1..];
        }

        if rest.contains('}') {
            return Err(invalid("unmatched `}`"));
        }
        source.push_str(&regex::escape(rest));
        source.push('$');

        let regex = Regex::new(&source).map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            params,
            catch_all,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Whether the pattern ends in a rest parameter
    pub fn is_catch_all(&self) -> bool {
        self.catch_all
    }

    /// Match a path, returning decoded parameters
    pub fn matches(&self, path: &str) -> Option<IndexMap<String, String>> {
        let captures = self.regex.captures(path)?;
        Some(
            self.params
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let value = captures.get(i + 1).map(|m| m.as_str()).unwrap_or("");
                    (name.clone(), decode_url(value))
                })
                .collect(),
        )
    }
}

fn is_param_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// A pattern bound to the component that renders it
#[derive(Debug, Clone)]
pub struct Route {
    pub pattern: RoutePattern,
    pub component: String,
}

/// Result of resolving a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub pattern: String,
    pub component: String,
    pub params: IndexMap<String, String>,
    /// Matched only by a rest-parameter fallback
    pub not_found: bool,
}

#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    path: &'a str,
    component: &'a str,
}

/// Ordered list of routes
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, pattern: &str, component: &str) -> Result<()> {
        self.routes.push(Route {
            pattern: RoutePattern::parse(pattern)?,
            component: component.to_string(),
        });
        Ok(())
    }

    /// Register the four spellings of a page: `/x.html`, `/x`, `/x/`, `/x/index.html`
    pub fn single_page(&mut self, slug: &str, component: &str) -> Result<()> {
        let slug = slug.trim_matches('/');
        for pattern in single_page(slug) {
            self.add(&pattern, component)?;
        }
        Ok(())
    }

    /// Build the table for a site, mirroring the page table's order
    pub fn from_config(config: &SiteConfig) -> Result<Self> {
        let mut table = Self::new();
        let mut mounted: HashSet<&str> = HashSet::new();

        let page_collections: Vec<_> = config
            .collections
            .iter()
            .filter(|c| c.kind == CollectionKind::Pages)
            .collect();

        for page in &config.pages {
            let route = page.route();
            if route == INDEX_ROUTE {
                // The site root is always the index page; `with_index` adds
                // the `/index` spellings on top
                table.add("/", &page.component)?;
                table.add("/index.html", &page.component)?;
                if page.with_index {
                    table.add("/index", &page.component)?;
                    table.add("/index/", &page.component)?;
                }
            } else if page.with_index {
                table.single_page(route, &page.component)?;
            } else {
                table.add(&format!("/{}", route), &page.component)?;
                table.add(&format!("/{}.html", route), &page.component)?;
            }

            for collection in &page_collections {
                if collection.route_prefix() == route && mounted.insert(collection.name.as_str()) {
                    table.single_page(
                        &format!("{}/{{slug}}", collection.route_prefix()),
                        &collection.component,
                    )?;
                }
            }
        }

        for collection in &page_collections {
            if mounted.insert(collection.name.as_str()) {
                table.single_page(
                    &format!("{}/{{slug}}", collection.route_prefix()),
                    &collection.component,
                )?;
            }
        }

        table.add("/{...notFound}", &config.not_found_component)?;
        Ok(table)
    }

    /// First route matching the path
    pub fn resolve(&self, path: &str) -> Option<RouteMatch> {
        self.routes.iter().find_map(|route| {
            route.pattern.matches(path).map(|params| RouteMatch {
                pattern: route.pattern.as_str().to_string(),
                component: route.component.clone(),
                params,
                not_found: route.pattern.is_catch_all(),
            })
        })
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// `[{ path, component }]` in match order
    pub fn manifest(&self) -> serde_json::Result<serde_json::Value> {
        let entries: Vec<_> = self
            .routes
            .iter()
            .map(|r| ManifestEntry {
                path: r.pattern.as_str(),
                component: &r.component,
            })
            .collect();
        serde_json::to_value(entries)
    }
}

/// The four patterns a single page is reachable under
pub fn single_page(slug: &str) -> [String; 4] {
    [
        format!("/{}.html", slug),
        format!("/{}", slug),
        format!("/{}/", slug),
        format!("/{}/index.html", slug),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_match() {
        let pattern = RoutePattern::parse("/blog/{slug}.html").unwrap();
        assert_eq!(pattern.params(), &["slug".to_string()]);

        let params = pattern.matches("/blog/hello.html").unwrap();
        assert_eq!(params.get("slug").map(String::as_str), Some("hello"));

        assert!(pattern.matches("/blog/hello").is_none());
        assert!(pattern.matches("/blog/a/b.html").is_none());
        assert!(pattern.matches("/blog/.html").is_none());
    }

    #[test]
    fn test_literal_characters_are_escaped() {
        let pattern = RoutePattern::parse("/index.html").unwrap();
        assert!(pattern.matches("/index.html").is_some());
        assert!(pattern.matches("/indexxhtml").is_none());
    }

    #[test]
    fn test_rest_parameter() {
        let pattern = RoutePattern::parse("/{...notFound}").unwrap();
        assert!(pattern.is_catch_all());
        let params = pattern.matches("/a/b/c").unwrap();
        assert_eq!(params["notFound"], "a/b/c");
        assert_eq!(pattern.matches("/").unwrap()["notFound"], "");
    }

    #[test]
    fn test_params_are_decoded() {
        let pattern = RoutePattern::parse("/blog/{slug}").unwrap();
        assert_eq!(pattern.matches("/blog/caf%C3%A9").unwrap()["slug"], "café");
    }

    #[test]
    fn test_invalid_patterns() {
        for bad in ["/blog/{slug", "/blog/slug}", "/{}", "/{1x}", "/{a}/{a}", "/{{a}}"] {
            assert!(
                matches!(
                    RoutePattern::parse(bad),
                    Err(Error::InvalidRoutePattern { .. })
                ),
                "{} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_single_page() {
        assert_eq!(
            single_page("about"),
            ["/about.html", "/about", "/about/", "/about/index.html"]
        );
    }

    #[test]
    fn test_from_config_resolution() {
        let table = RouteTable::from_config(&SiteConfig::default()).unwrap();

        let component = |path: &str| table.resolve(path).map(|m| m.component);
        assert_eq!(component("/").as_deref(), Some("Home"));
        assert_eq!(component("/index.html").as_deref(), Some("Home"));
        assert_eq!(component("/about").as_deref(), Some("About"));
        assert_eq!(component("/blog/").as_deref(), Some("BlogIndex"));
        assert_eq!(component("/blog/index.html").as_deref(), Some("BlogIndex"));
        assert_eq!(component("/blog/hello").as_deref(), Some("BlogPost"));
        assert_eq!(
            component("/portfolio/bridge/index.html").as_deref(),
            Some("PortfolioPiece")
        );

        let post = table.resolve("/blog/hello.html").unwrap();
        assert_eq!(post.params["slug"], "hello");
        assert!(!post.not_found);

        let missing = table.resolve("/nope/deeper").unwrap();
        assert_eq!(missing.component, "PageNotFound");
        assert!(missing.not_found);
        assert_eq!(missing.params["notFound"], "nope/deeper");
    }

    #[test]
    fn test_manifest_order() {
        let table = RouteTable::from_config(&SiteConfig::default()).unwrap();
        let manifest = table.manifest().unwrap();
        let paths: Vec<_> = manifest
            .as_array()
            .unwrap()
            .iter()
            .map(|e| e["path"].as_str().unwrap().to_string())
            .collect();

        assert_eq!(&paths[..3], &["/", "/index.html", "/blog.html"]);
        assert_eq!(paths.last().map(String::as_str), Some("/{...notFound}"));
        // index(2) + blog, blog/{slug}, portfolio, portfolio/{slug}, about (4 each) + fallback
        assert_eq!(table.len(), 2 + 5 * 4 + 1);
    }

    #[test]
    fn test_index_with_default_alias_flag() {
        let yaml = r#"
pages:
  - route: index
    component: Home
  - route: about
    component: About
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.pages[0].with_index);
        let table = RouteTable::from_config(&config).unwrap();

        for path in ["/", "/index.html", "/index", "/index/"] {
            let matched = table.resolve(path).unwrap();
            assert_eq!(matched.component, "Home", "{}", path);
            assert!(!matched.not_found);
        }
        assert_eq!(table.resolve("/about/").unwrap().component, "About");
    }
}
