//! Content module - collections, front-matter and Markdown rendering

mod entry;
mod frontmatter;
pub mod loader;
mod markdown;

pub use entry::{Collection, ContentEntry};
pub use frontmatter::{parse_date_string, yaml_to_json, FrontMatter, EXCERPT_SEPARATOR};
pub use loader::ContentLoader;
pub use markdown::MarkdownRenderer;
