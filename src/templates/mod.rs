//! Page shell templates using the Tera template engine
//!
//! A single `page.html` shell is embedded in the binary. Sites may point
//! `template` in `_config.yml` at their own file, which replaces it.

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::error::{Error, Result};
use crate::helpers::{html_escape, strip_html};
use crate::pages::DEFAULT_TEMPLATE;

/// Template renderer for page shells
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a renderer with the built-in shell, or the file at `override_path`
    pub fn new(override_path: Option<&Path>) -> Result<Self> {
        let mut tera = Tera::default();

        // Content is already HTML; templates escape explicitly
        tera.autoescape_on(vec![]);

        let shell = match override_path {
            Some(path) => {
                tracing::debug!("Using page template {:?}", path);
                fs::read_to_string(path).map_err(|e| Error::io(path, e))?
            }
            None => include_str!("page.html").to_string(),
        };
        tera.add_raw_template(DEFAULT_TEMPLATE, &shell)?;

        tera.register_filter("strip_html", strip_html_filter);
        tera.register_filter("truncate_chars", truncate_chars_filter);
        tera.register_filter("escape_attr", escape_attr_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: strip HTML tags
fn strip_html_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("strip_html", "value", String, value);
    Ok(tera::Value::String(strip_html(&s)))
}

/// Tera filter: escape for a quoted attribute, leaving `/` readable in URLs
fn escape_attr_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("escape_attr", "value", String, value);
    Ok(tera::Value::String(html_escape(&s)))
}

/// Tera filter: truncate by character count
fn truncate_chars_filter(
    value: &tera::Value,
    args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("truncate_chars", "value", String, value);
    let length = match args.get("length") {
        Some(val) => tera::try_get_value!("truncate_chars", "length", usize, val),
        None => 150,
    };
    let omission = match args.get("omission") {
        Some(val) => tera::try_get_value!("truncate_chars", "omission", String, val),
        None => "...".to_string(),
    };

    if s.chars().count() <= length {
        Ok(tera::Value::String(s))
    } else {
        let truncated: String = s.chars().take(length).collect();
        Ok(tera::Value::String(format!(
            "{}{}",
            truncated.trim_end(),
            omission
        )))
    }
}

/// Make JSON safe to place inside a `<script>` element
pub fn script_json(value: &serde_json::Value) -> Result<String> {
    Ok(serde_json::to_string(value)?.replace('<', "\\u003c"))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub url: String,
    pub root: String,
}

impl SiteData {
    pub fn from_config(config: &SiteConfig) -> Self {
        Self {
            title: config.title.clone(),
            description: config.description.clone(),
            author: config.author.clone(),
            language: config.language.clone(),
            url: config.url.clone(),
            root: config.root.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PageContext {
    /// Page table key
    pub key: String,
    pub route: String,
    pub url: String,
    pub permalink: String,
    pub component: String,
    pub collection: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListingItem {
    pub title: String,
    pub url: String,
    pub date: Option<String>,
    pub description: Option<String>,
}
