//! Generator module - builds the page table and writes the site

use serde_json::json;
use std::fs;
use std::path::Path;
use std::time::{Duration, Instant};
use tera::Context;
use walkdir::WalkDir;

use crate::config::CollectionKind;
use crate::content::loader::is_hidden;
use crate::content::{Collection, ContentEntry, ContentLoader, MarkdownRenderer};
use crate::error::{Error, Result};
use crate::helpers::{full_url_for, html_summary, page_url, url_for};
use crate::modules::ModuleRegistry;
use crate::pages::{collection_json, PageEntry, PageTable, DEFAULT_TEMPLATE};
use crate::router::RouteTable;
use crate::templates::{script_json, ListingItem, PageContext, SiteData, TemplateRenderer};
use crate::Site;

/// Page key of the not-found page
pub const NOT_FOUND_KEY: &str = "404";

/// Route manifest file name
pub const ROUTES_FILE: &str = "routes.json";

/// Everything known about a site before anything is written
#[derive(Debug, Clone)]
pub struct SitePlan {
    pub collections: Vec<Collection>,
    pub table: PageTable,
    pub modules: ModuleRegistry,
    pub routes: RouteTable,
}

impl SitePlan {
    /// Load content and derive the page table, modules and routes
    pub fn load(site: &Site) -> Result<Self> {
        site.config.validate()?;

        let collections = ContentLoader::new(site).load_all()?;
        let table = PageTable::build(&site.config, &collections)?;

        let mut modules = ModuleRegistry::new(&site.config);
        for collection in &collections {
            let data = collection_json(&table, collection)?;
            modules.register(&site.config.module_id(collection.name()), data)?;
        }

        let routes = RouteTable::from_config(&site.config)?;

        Ok(Self {
            collections,
            table,
            modules,
            routes,
        })
    }

    pub fn collection(&self, name: &str) -> Option<&Collection> {
        self.collections.iter().find(|c| c.name() == name)
    }

    /// Content file behind a page, if any
    pub fn item(&self, page: &PageEntry) -> Option<&ContentEntry> {
        let collection = self.collection(page.collection.as_deref()?)?;
        collection.get(&page.route)
    }
}

/// Summary of a finished build
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub pages: usize,
    pub modules: usize,
    pub routes: usize,
    pub assets: usize,
    pub elapsed: Duration,
}

/// Static site generator
pub struct Generator<'a> {
    site: &'a Site,
    renderer: TemplateRenderer,
    markdown: MarkdownRenderer,
}

impl<'a> Generator<'a> {
    /// Create a new generator
    pub fn new(site: &'a Site) -> Result<Self> {
        let renderer = TemplateRenderer::new(site.template_path.as_deref())?;
        let markdown = MarkdownRenderer::with_config(&site.config.highlight);

        Ok(Self {
            site,
            renderer,
            markdown,
        })
    }

    /// Generate the entire site
    pub fn generate(&self) -> Result<BuildReport> {
        let start = Instant::now();

        let plan = SitePlan::load(self.site)?;
        tracing::info!(
            "Loaded {} collections, {} pages",
            plan.collections.len(),
            plan.table.len()
        );

        let output_dir = &self.site.output_dir;
        fs::create_dir_all(output_dir).map_err(|e| Error::io(output_dir, e))?;

        // Assets first, so generated pages win over same-named files
        let assets = self.copy_content()?;

        let import_map = script_json(&plan.modules.import_map())?;

        for (key, output) in plan.table.inputs() {
            let Some(page) = plan.table.get(&key) else {
                continue;
            };
            let html = self.render_page(&plan, &key, page, &import_map)?;
            write_output(output_dir, &output, &html)?;
        }

        let not_found = self.render_not_found(&import_map)?;
        write_output(output_dir, &format!("{}.html", NOT_FOUND_KEY), &not_found)?;

        let modules = plan.modules.emit(output_dir)?;

        let manifest = serde_json::to_string_pretty(&plan.routes.manifest()?)?;
        write_output(output_dir, ROUTES_FILE, &manifest)?;

        let report = BuildReport {
            pages: plan.table.len() + 1,
            modules,
            routes: plan.routes.len(),
            assets,
            elapsed: start.elapsed(),
        };

        tracing::info!(
            "Generated {} pages, {} modules, {} routes, {} assets in {:.2}s",
            report.pages,
            report.modules,
            report.routes,
            report.assets,
            report.elapsed.as_secs_f64()
        );

        Ok(report)
    }

    /// Render one page table entry
    fn render_page(
        &self,
        plan: &SitePlan,
        key: &str,
        page: &PageEntry,
        import_map: &str,
    ) -> Result<String> {
        let config = &self.site.config;
        let item = plan.item(page);
        let url = page_url(config, key);

        let page_context = PageContext {
            key: key.to_string(),
            route: page.route.clone(),
            url: url.clone(),
            permalink: full_url_for(config, &url),
            component: page.component.clone(),
            collection: page.collection.clone(),
            title: item.map(ContentEntry::title),
            description: item.and_then(|i| self.description(i)),
            date: item.and_then(|i| i.date()).map(|d| d.format("%Y-%m-%d").to_string()),
        };

        let listing_data = match &page.data.listing {
            Some(name) => {
                let id = config.module_id(name);
                plan.modules.get(&id).map(|m| m.data.clone())
            }
            None => None,
        };

        let mut page_data = json!({
            "key": key,
            "route": page.route,
            "component": page.component,
            "data": page.data,
        });
        if let Some(item) = item {
            page_data["frontmatter"] = item.front_matter.summary_json();
        }
        if let Some(listing) = &listing_data {
            page_data["listing"] = listing.clone();
        }

        let (content, listing) = if config.prerender {
            let content = item
                .map(|i| self.markdown.render(&i.body))
                .unwrap_or_default();
            let listing = match &page.data.listing {
                Some(name) => plan
                    .collection(name)
                    .map(|c| self.listing_items(plan, c))
                    .unwrap_or_default(),
                None => Vec::new(),
            };
            (content, listing)
        } else {
            (String::new(), Vec::new())
        };

        let mut context = self.create_base_context(import_map, &page.entry);
        context.insert("page", &page_context);
        context.insert("content", &content);
        context.insert("listing", &listing);
        context.insert("page_data", &script_json(&page_data)?);

        let template = if page.template.is_empty() {
            DEFAULT_TEMPLATE
        } else {
            page.template.as_str()
        };
        self.renderer.render(template, &context)
    }

    /// Render the page served for unmatched URLs
    fn render_not_found(&self, import_map: &str) -> Result<String> {
        let config = &self.site.config;
        let url = url_for(config, &format!("{}.html", NOT_FOUND_KEY));

        let page_context = PageContext {
            key: NOT_FOUND_KEY.to_string(),
            route: NOT_FOUND_KEY.to_string(),
            url: url.clone(),
            permalink: full_url_for(config, &url),
            component: config.not_found_component.clone(),
            collection: None,
            title: Some("Page not found".to_string()),
            description: None,
            date: None,
        };
        let page_data = json!({
            "key": NOT_FOUND_KEY,
            "route": NOT_FOUND_KEY,
            "component": config.not_found_component,
            "data": {},
        });

        let mut context = self.create_base_context(import_map, &config.entry);
        context.insert("page", &page_context);
        context.insert("content", "");
        context.insert("listing", &Vec::<ListingItem>::new());
        context.insert("page_data", &script_json(&page_data)?);

        self.renderer.render(DEFAULT_TEMPLATE, &context)
    }

    /// Create a base context with common variables
    fn create_base_context(&self, import_map: &str, entry: &str) -> Context {
        let config = &self.site.config;
        let mut context = Context::new();
        context.insert("site", &SiteData::from_config(config));
        context.insert("import_map", import_map);
        context.insert("entry", &url_for(config, entry));
        context.insert("prerendered", &config.prerender);
        context
    }

    /// Front-matter description, else a summary of the excerpt
    fn description(&self, item: &ContentEntry) -> Option<String> {
        item.description().or_else(|| {
            let excerpt = &item.front_matter.excerpt;
            (!excerpt.is_empty()).then(|| html_summary(&self.markdown.render(excerpt), 160))
        })
    }

    /// Listing entries for a collection, linking pages or raw Markdown
    fn listing_items(&self, plan: &SitePlan, collection: &Collection) -> Vec<ListingItem> {
        let config = &self.site.config;
        match collection.kind() {
            CollectionKind::Pages => plan
                .table
                .canonical(collection.name())
                .filter_map(|(key, page)| {
                    let item = collection.get(&page.route)?;
                    Some(self.listing_item(item, page_url(config, key)))
                })
                .collect(),
            CollectionKind::Data => collection
                .entries
                .iter()
                .map(|item| self.listing_item(item, url_for(config, &item.markdown_url)))
                .collect(),
        }
    }

    fn listing_item(&self, item: &ContentEntry, url: String) -> ListingItem {
        ListingItem {
            title: item.title(),
            url,
            date: item.date().map(|d| d.format("%Y-%m-%d").to_string()),
            description: self.description(item),
        }
    }

    /// Copy the content directory into the output directory
    fn copy_content(&self) -> Result<usize> {
        let content_dir = &self.site.content_dir;
        if !content_dir.is_dir() {
            tracing::warn!("Content directory {:?} does not exist", content_dir);
            return Ok(0);
        }

        let output_dir = &self.site.output_dir;
        let config_path = self.site.config_path();

        let mut copied = 0;
        for entry in WalkDir::new(content_dir)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0
                    || !(is_hidden(e.path())
                        || e.path().starts_with(output_dir)
                        || e.path() == config_path)
            })
        {
            let entry = entry.map_err(|e| {
                let path = e.path().unwrap_or(content_dir).to_path_buf();
                let source = e
                    .into_io_error()
                    .unwrap_or_else(|| std::io::Error::other("filesystem loop"));
                Error::io(path, source)
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            let relative = path.strip_prefix(content_dir).unwrap_or(path);
            let dest = self.site.output_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            fs::copy(path, &dest).map_err(|e| Error::io(&dest, e))?;
            copied += 1;
        }

        tracing::debug!("Copied {} assets from {:?}", copied, content_dir);
        Ok(copied)
    }
}

/// Write a file below the output directory, creating parents
fn write_output(output_dir: &Path, relative: &str, contents: &str) -> Result<()> {
    let path = output_dir.join(relative);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(&path, contents).map_err(|e| Error::io(&path, e))?;
    tracing::debug!("Generated: {:?}", path);
    Ok(())
}
