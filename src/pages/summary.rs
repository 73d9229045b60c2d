//! Collection summaries exposed to the client as JSON

use serde::Serialize;

use super::PageTable;
use crate::config::CollectionKind;
use crate::content::Collection;

/// Listing entry for a routed collection item
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    /// Output file of the canonical page, e.g. `blog/hello/index.html`
    pub url: String,
    pub slug: String,
    pub markdown_url: String,
    pub frontmatter: serde_json::Value,
}

/// Listing entry for a data-only collection item
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSummary {
    pub markdown_url: String,
    pub frontmatter: serde_json::Value,
}

/// Summaries for the canonical pages of a routed collection, in table order
pub fn page_summaries(table: &PageTable, collection: &Collection) -> Vec<PageSummary> {
    table
        .canonical(collection.name())
        .filter_map(|(key, page)| {
            let item = collection.get(&page.route)?;
            Some(PageSummary {
                url: format!("{}.html", key),
                slug: key.rsplit('/').nth(1).unwrap_or_default().to_string(),
                markdown_url: item.markdown_url.clone(),
                frontmatter: item.front_matter.summary_json(),
            })
        })
        .collect()
}

/// Summaries for every file of a collection
pub fn data_summaries(collection: &Collection) -> Vec<DataSummary> {
    collection
        .entries
        .iter()
        .map(|item| DataSummary {
            markdown_url: item.markdown_url.clone(),
            frontmatter: item.front_matter.to_json(),
        })
        .collect()
}

/// JSON value a collection contributes to its virtual module
pub fn collection_json(
    table: &PageTable,
    collection: &Collection,
) -> serde_json::Result<serde_json::Value> {
    match collection.kind() {
        CollectionKind::Pages => serde_json::to_value(page_summaries(table, collection)),
        CollectionKind::Data => serde_json::to_value(data_summaries(collection)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CollectionConfig, SiteConfig};
    use crate::content::{ContentEntry, FrontMatter};
    use std::path::PathBuf;

    fn item(prefix: &str, stem: &str, raw: &str) -> ContentEntry {
        let (front_matter, body) = FrontMatter::parse(raw).unwrap();
        ContentEntry {
            file_name: format!("{}.md", stem),
            stem: stem.to_string(),
            route: format!("{}/{}", prefix, stem),
            source: PathBuf::from(format!("public/{}/{}.md", prefix, stem)),
            markdown_url: format!("/{}/{}.md", prefix, stem),
            raw: raw.to_string(),
            body: body.to_string(),
            front_matter,
        }
    }

    #[test]
    fn test_page_summaries() {
        let blog = Collection {
            config: CollectionConfig::pages("blog", "blog", "BlogPost"),
            entries: vec![item(
                "blog",
                "hello",
                "---\ntitle: Hello\ndate: 2021-03-04\n---\nHi",
            )],
        };
        let table = PageTable::build(&SiteConfig::default(), std::slice::from_ref(&blog)).unwrap();
        let summaries = page_summaries(&table, &blog);

        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert_eq!(summary.url, "blog/hello/index.html");
        assert_eq!(summary.slug, "hello");
        assert_eq!(summary.markdown_url, "/blog/hello.md");
        assert_eq!(summary.frontmatter["data"]["title"], "Hello");

        let json = serde_json::to_value(summary).unwrap();
        assert!(json.get("markdownUrl").is_some());
        assert!(json["frontmatter"].get("content").is_none());
    }

    #[test]
    fn test_data_summaries() {
        let education = Collection {
            config: CollectionConfig::data("education", "about/education"),
            entries: vec![item(
                "about/education",
                "school",
                "---\nschool: State U\nyears: [2010, 2014]\n---\n",
            )],
        };
        let json = collection_json(&PageTable::new(), &education).unwrap();
        assert_eq!(json[0]["markdownUrl"], "/about/education/school.md");
        assert_eq!(json[0]["frontmatter"]["school"], "State U");
        assert_eq!(json[0]["frontmatter"]["years"][1], 2014);
    }
}
