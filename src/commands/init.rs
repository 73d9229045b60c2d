//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

use crate::CONFIG_FILE;

const DEFAULT_CONFIG: &str = r#"# Site
title: Portfolio
description: ''
author: ''
language: en

# URL
url: http://example.com
root: /

# Directory
content_dir: public
output_dir: dist
# template: index.html

# Client
entry: /main.js
module_scope: '@kepler'
not_found_component: PageNotFound

# Render Markdown and listings into the HTML at build time
prerender: false

highlight:
  enable: true
  theme: base16-ocean.dark
  line_number: false

collections:
  - name: blog
    dir: blog
    component: BlogPost
  - name: portfolio
    dir: portfolio
    component: PortfolioPiece
  - name: experience
    dir: about/experience
    kind: data
  - name: education
    dir: about/education
    kind: data

pages:
  - route: index
    component: Home
    with_index: false
  - route: blog
    component: BlogIndex
  - route: portfolio
    component: PortfolioIndex
    listing: portfolio
  - route: about
    component: About
"#;

const CONTENT_DIRS: &[&str] = &[
    "public/blog",
    "public/portfolio",
    "public/about/experience",
    "public/about/education",
];

/// Initialize a new site in the given directory
///
/// Existing files are left untouched, so running it in a populated site
/// only fills in what is missing.
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;
    for dir in CONTENT_DIRS {
        fs::create_dir_all(target_dir.join(dir))?;
    }

    write_if_missing(&target_dir.join(CONFIG_FILE), DEFAULT_CONFIG)?;

    let now = chrono::Local::now();
    let sample_post = format!(
        r#"---
title: Hello World
date: {}
description: The first post on this site.
---

Welcome! Posts live in `public/blog`, portfolio pieces in `public/portfolio`.

<!-- more -->

## Quick Start

```bash
$ folio new blog "My New Post"
$ folio serve
```
"#,
        now.format("%Y-%m-%d %H:%M:%S")
    );
    write_if_missing(&target_dir.join("public/blog/hello-world.md"), &sample_post)?;

    Ok(())
}

fn write_if_missing(path: &Path, contents: &str) -> Result<()> {
    if path.exists() {
        tracing::warn!("Keeping existing {:?}", path);
        return Ok(());
    }
    fs::write(path, contents)?;
    tracing::debug!("Created {:?}", path);
    Ok(())
}
