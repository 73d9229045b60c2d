//! Virtual modules
//!
//! Each collection is exposed to the client as a synthetic ES module whose
//! default export is the collection's summary JSON. Ids are bare specifiers
//! such as `@kepler/blog`; the build writes them under `_modules/` and an
//! import map lets the browser resolve the bare ids.

use indexmap::IndexMap;
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::config::SiteConfig;
use crate::error::{Error, Result};
use crate::helpers::join_root;

/// Output directory of emitted modules, relative to the output dir
pub const MODULES_DIR: &str = "_modules";

/// Prefix marking an id as resolved to a virtual module
const RESOLVED_PREFIX: char = '\0';

/// A module whose source is generated in memory
#[derive(Debug, Clone)]
pub struct VirtualModule {
    pub id: String,
    pub data: serde_json::Value,
    json: String,
    source: String,
}

impl VirtualModule {
    pub fn new(id: &str, data: serde_json::Value) -> Result<Self> {
        let json = serde_json::to_string(&data)?;
        let source = format!("export default {}", json);
        Ok(Self {
            id: id.to_string(),
            data,
            json,
            source,
        })
    }

    /// Id the module resolves to
    pub fn resolved_id(&self) -> String {
        format!("{}{}", RESOLVED_PREFIX, self.id)
    }

    /// ES module source, `export default <json>`
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn json(&self) -> &str {
        &self.json
    }

    /// File name stem, `@kepler/blog` becomes `kepler-blog`
    pub fn file_stem(&self) -> String {
        let stem: String = self
            .id
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        stem.trim_matches('-').to_string()
    }

    /// Path of the emitted module relative to the output dir
    pub fn path(&self) -> String {
        format!("{}/{}.js", MODULES_DIR, self.file_stem())
    }
}

/// Registry of virtual modules for one build
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    root: String,
    modules: IndexMap<String, VirtualModule>,
}

impl ModuleRegistry {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            root: config.root.clone(),
            modules: IndexMap::new(),
        }
    }

    /// Register a module; ids must be unique
    pub fn register(&mut self, id: &str, data: serde_json::Value) -> Result<()> {
        if self.modules.contains_key(id) {
            return Err(Error::Config(format!(
                "virtual module {:?} registered twice",
                id
            )));
        }
        let module = VirtualModule::new(id, data)?;
        self.modules.insert(id.to_string(), module);
        Ok(())
    }

    /// Resolve an import id, only registered ids resolve
    pub fn resolve(&self, id: &str) -> Option<String> {
        self.modules.get(id).map(VirtualModule::resolved_id)
    }

    /// Load the source of a resolved id
    pub fn load(&self, resolved_id: &str) -> Option<&str> {
        let id = resolved_id.strip_prefix(RESOLVED_PREFIX)?;
        self.modules.get(id).map(VirtualModule::source)
    }

    pub fn get(&self, id: &str) -> Option<&VirtualModule> {
        self.modules.get(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &VirtualModule> {
        self.modules.values()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Import map resolving every module id to its served URL
    pub fn import_map(&self) -> serde_json::Value {
        let imports: serde_json::Map<String, serde_json::Value> = self
            .modules
            .values()
            .map(|m| (m.id.clone(), json!(self.url(m))))
            .collect();
        json!({ "imports": imports })
    }

    fn url(&self, module: &VirtualModule) -> String {
        join_root(&self.root, &module.path())
    }

    /// Write every module as `.js` and `.json`, plus `importmap.json`
    pub fn emit(&self, output_dir: &Path) -> Result<usize> {
        let dir = output_dir.join(MODULES_DIR);
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        for module in self.modules.values() {
            let js_path = output_dir.join(module.path());
            fs::write(&js_path, module.source()).map_err(|e| Error::io(&js_path, e))?;

            let json_path = dir.join(format!("{}.json", module.file_stem()));
            fs::write(&json_path, module.json()).map_err(|e| Error::io(&json_path, e))?;

            tracing::debug!("Emitted module {} -> {:?}", module.id, js_path);
        }

        let map_path = dir.join("importmap.json");
        let map = serde_json::to_string_pretty(&self.import_map())?;
        fs::write(&map_path, map).map_err(|e| Error::io(&map_path, e))?;

        Ok(self.modules.len())
    }
}
