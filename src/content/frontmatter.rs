//! Front-matter parsing

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use serde_json::json;
use serde_yaml::{Mapping, Value};

use crate::error::FrontMatterError;

/// Marks the end of a post excerpt
pub const EXCERPT_SEPARATOR: &str = "<!-- more -->";

/// Front-matter data from a content file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrontMatter {
    /// Parsed YAML mapping
    pub data: Mapping,
    /// A delimited block was present but held no data
    pub is_empty: bool,
    /// Body text before the excerpt separator, empty when there is none
    pub excerpt: String,
}

impl FrontMatter {
    /// Parse front-matter from content string
    /// Returns (front_matter, remaining_content)
    pub fn parse(content: &str) -> Result<(Self, &str), FrontMatterError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        let Some(rest) = strip_delimiter_line(content) else {
            return Ok((Self::with_body(Mapping::new(), false, content), content));
        };

        // Find the closing delimiter on its own line
        let mut offset = 0;
        let mut close = None;
        for line in rest.split_inclusive('\n') {
            if is_delimiter(line) {
                close = Some((offset, offset + line.len()));
                break;
            }
            offset += line.len();
        }
        let (yaml_end, body_start) = close.ok_or(FrontMatterError::Unterminated)?;

        let yaml = &rest[..yaml_end];
        let body = &rest[body_start..];

        let is_empty = yaml
            .lines()
            .all(|l| l.trim().is_empty() || l.trim_start().starts_with('#'));
        if is_empty {
            return Ok((Self::with_body(Mapping::new(), true, body), body));
        }

        let data = match serde_yaml::from_str::<Value>(yaml)? {
            Value::Mapping(map) => map,
            Value::Null => Mapping::new(),
            _ => return Err(FrontMatterError::NotAMapping),
        };

        Ok((Self::with_body(data, false, body), body))
    }

    fn with_body(data: Mapping, is_empty: bool, body: &str) -> Self {
        let excerpt = body
            .find(EXCERPT_SEPARATOR)
            .map(|pos| body[..pos].trim().to_string())
            .unwrap_or_default();
        Self {
            data,
            is_empty,
            excerpt,
        }
    }

    /// Look up a top-level key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Look up a top-level key as a string, stringifying scalars
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<String> {
        self.get_str("title")
    }

    pub fn description(&self) -> Option<String> {
        self.get_str("description")
    }

    /// Parse the `date` field into a DateTime
    pub fn date(&self) -> Option<DateTime<Local>> {
        self.get_str("date").and_then(|s| parse_date_string(&s))
    }

    /// Front-matter data as JSON
    pub fn to_json(&self) -> serde_json::Value {
        yaml_to_json(&Value::Mapping(self.data.clone()))
    }

    /// Summary shape exposed to the client (data, emptiness flag and excerpt)
    pub fn summary_json(&self) -> serde_json::Value {
        json!({
            "data": self.to_json(),
            "isEmpty": self.is_empty,
            "excerpt": self.excerpt,
        })
    }
}

/// Strip a leading `---` line, returning what follows it
fn strip_delimiter_line(content: &str) -> Option<&str> {
    let (first, rest) = match content.find('\n') {
        Some(pos) => (&content[..pos], &content[pos + 1..]),
        None => (content, ""),
    };
    is_delimiter(first).then_some(rest)
}

/// A delimiter line is exactly `---`, allowing only a CRLF line ending
fn is_delimiter(line: &str) -> bool {
    line.trim_end_matches(['\n', '\r']) == "---"
}

/// Convert a YAML value to JSON. Non-string keys are stringified.
pub fn yaml_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                json!(i)
            } else if let Some(u) = n.as_u64() {
                json!(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map(serde_json::Value::Number)
                    .unwrap_or(serde_json::Value::Null)
            }
        }
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Sequence(seq) => serde_json::Value::Array(seq.iter().map(yaml_to_json).collect()),
        Value::Mapping(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                let key = match k {
                    Value::String(s) => s.clone(),
                    other => serde_yaml::to_string(other)
                        .map(|s| s.trim().to_string())
                        .unwrap_or_default(),
                };
                out.insert(key, yaml_to_json(v));
            }
            serde_json::Value::Object(out)
        }
        Value::Tagged(tagged) => yaml_to_json(&tagged.value),
    }
}

/// Parse a date string in various formats
pub fn parse_date_string(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();

    let datetime_formats = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }

    for fmt in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return dt.and_local_timezone(Local).earliest();
        }
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0)?.and_local_timezone(Local).earliest();
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_yaml_frontmatter() {
        let content = r#"---
title: Hello World
date: 2024-01-15 10:30:00
tags:
  - rust
  - web
---

This is the content.
"#;

        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title(), Some("Hello World".to_string()));
        assert!(!fm.is_empty);
        assert_eq!(
            fm.to_json()["tags"],
            serde_json::json!(["rust", "web"])
        );
        assert!(remaining.contains("This is the content."));
        assert!(!remaining.contains("title:"));
    }

    #[test]
    fn test_no_frontmatter() {
        let content = "# Just a heading\n\nText.";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert!(fm.data.is_empty());
        assert!(!fm.is_empty);
        assert_eq!(remaining, content);
    }

    #[test]
    fn test_empty_block() {
        let content = "---\n\n---\nBody";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert!(fm.is_empty);
        assert_eq!(remaining, "Body");
    }

    #[test]
    fn test_unterminated_block_is_error() {
        let content = "---\ntitle: Oops\n\nNo closing line";
        assert!(matches!(
            FrontMatter::parse(content),
            Err(FrontMatterError::Unterminated)
        ));
    }

    #[test]
    fn test_invalid_yaml_is_error() {
        let content = "---\ntitle: [unclosed\n---\nBody";
        assert!(matches!(
            FrontMatter::parse(content),
            Err(FrontMatterError::Yaml(_))
        ));
    }

    #[test]
    fn test_scalar_yaml_is_error() {
        let content = "---\njust a sentence\n---\nBody";
        assert!(matches!(
            FrontMatter::parse(content),
            Err(FrontMatterError::NotAMapping)
        ));
    }

    #[test]
    fn test_horizontal_rule_later_is_not_frontmatter() {
        let content = "Intro\n\n---\n\nMore";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert!(fm.data.is_empty());
        assert_eq!(remaining, content);
    }

    #[test]
    fn test_bom_and_crlf() {
        let content = "\u{feff}---\r\ntitle: Windows\r\n---\r\nBody\r\n";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.title(), Some("Windows".to_string()));
        assert_eq!(remaining, "Body\r\n");
    }

    #[test]
    fn test_delimiters_must_be_exact() {
        // Trailing spaces disqualify the opening line just like the closing one
        let content = "--- \ntitle: Spaced\n--- \nBody";
        let (fm, remaining) = FrontMatter::parse(content).unwrap();
        assert!(fm.data.is_empty());
        assert_eq!(remaining, content);

        let content = "---\ntitle: Spaced\n--- \nBody";
        assert!(matches!(
            FrontMatter::parse(content),
            Err(FrontMatterError::Unterminated)
        ));
    }

    #[test]
    fn test_excerpt() {
        let content = "---\ntitle: Post\n---\nShort intro.\n<!-- more -->\nThe rest.";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        assert_eq!(fm.excerpt, "Short intro.");
    }

    #[test]
    fn test_summary_json_shape() {
        let content = "---\ntitle: Post\ndescription: About things\n---\nBody";
        let (fm, _) = FrontMatter::parse(content).unwrap();
        let summary = fm.summary_json();
        assert_eq!(summary["data"]["title"], "Post");
        assert_eq!(summary["data"]["description"], "About things");
        assert_eq!(summary["isEmpty"], false);
        assert_eq!(summary["excerpt"], "");
        assert!(summary.get("content").is_none());
    }

    #[test]
    fn test_parse_date() {
        let (fm, _) = FrontMatter::parse("---\ndate: 2024-01-15\n---\n").unwrap();
        let dt = fm.date().unwrap();
        assert_eq!(dt.format("%Y-%m-%d").to_string(), "2024-01-15");

        let dt = parse_date_string("2024-01-15 10:30:00").unwrap();
        assert_eq!(dt.format("%H:%M").to_string(), "10:30");
        assert!(parse_date_string("not a date").is_none());
    }

    #[test]
    fn test_numeric_values_stringify() {
        let (fm, _) = FrontMatter::parse("---\ntitle: 2024\nyear: 1999\n---\n").unwrap();
        assert_eq!(fm.title(), Some("2024".to_string()));
        assert_eq!(fm.to_json()["year"], 1999);
    }
}
