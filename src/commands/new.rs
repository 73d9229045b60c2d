//! Create a new collection entry

use anyhow::Result;
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::PathBuf;

use crate::error::Error;
use crate::Site;

/// Create `{content_dir}/{dir}/{slug}.md` for a collection
pub fn create_entry(
    site: &Site,
    collection: &str,
    title: &str,
    slug: Option<&str>,
) -> Result<PathBuf> {
    let config = site
        .config
        .collection(collection)
        .ok_or_else(|| Error::UnknownCollection(collection.to_string()))?;

    let slug = match slug {
        Some(s) => slug::slugify(s),
        None => slug::slugify(title),
    };
    if slug.is_empty() {
        anyhow::bail!("Cannot derive a file name from {:?}", title);
    }

    let target_dir = site.content_dir.join(&config.dir);
    fs::create_dir_all(&target_dir)?;

    let file_path = target_dir.join(format!("{}.md", slug));
    if file_path.exists() {
        anyhow::bail!("File already exists: {:?}", file_path);
    }

    let now = chrono::Local::now();
    let mut front_matter = Mapping::new();
    front_matter.insert("title".into(), Value::String(title.to_string()));
    front_matter.insert(
        "date".into(),
        Value::String(now.format("%Y-%m-%d %H:%M:%S").to_string()),
    );
    front_matter.insert("description".into(), Value::String(String::new()));

    let content = format!("---\n{}---\n", serde_yaml::to_string(&front_matter)?);
    fs::write(&file_path, content)?;

    tracing::info!("Created: {:?}", file_path);
    Ok(file_path)
}
