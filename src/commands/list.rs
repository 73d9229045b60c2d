//! List site information

use anyhow::Result;
use std::fmt::Write;

use crate::generator::SitePlan;
use crate::Site;

/// Print pages, routes, modules, collections or one collection's entries
pub fn run(site: &Site, what: &str) -> Result<()> {
    print!("{}", render(site, what)?);
    Ok(())
}

/// Build the listing text without printing it
pub fn render(site: &Site, what: &str) -> Result<String> {
    let plan = SitePlan::load(site)?;
    let mut out = String::new();

    match what {
        "page" | "pages" => {
            writeln!(out, "Pages ({}):", plan.table.len())?;
            for (key, page) in plan.table.iter() {
                writeln!(out, "  {} -> {}", key, page.component)?;
            }
        }
        "route" | "routes" => {
            writeln!(out, "Routes ({}):", plan.routes.len())?;
            for route in plan.routes.routes() {
                writeln!(out, "  {} -> {}", route.pattern.as_str(), route.component)?;
            }
        }
        "module" | "modules" => {
            writeln!(out, "Modules ({}):", plan.modules.len())?;
            for module in plan.modules.iter() {
                let count = module.data.as_array().map(Vec::len).unwrap_or(0);
                writeln!(out, "  {} ({} entries) [{}]", module.id, count, module.path())?;
            }
        }
        "collection" | "collections" => {
            writeln!(out, "Collections ({}):", plan.collections.len())?;
            for collection in &plan.collections {
                writeln!(
                    out,
                    "  {} [{:?}] {} entries in {}",
                    collection.name(),
                    collection.kind(),
                    collection.len(),
                    collection.config.dir
                )?;
            }
        }
        name => match plan.collection(name) {
            Some(collection) => {
                writeln!(out, "{} ({}):", collection.name(), collection.len())?;
                for item in &collection.entries {
                    let date = item
                        .date()
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .unwrap_or_else(|| "----------".to_string());
                    writeln!(out, "  {} - {} [{}]", date, item.title(), item.markdown_url)?;
                }
            }
            None => {
                let names: Vec<_> = plan.collections.iter().map(|c| c.name()).collect();
                anyhow::bail!(
                    "Unknown type: {}. Available: pages, routes, modules, collections, {}",
                    what,
                    names.join(", ")
                );
            }
        },
    }

    Ok(out)
}
