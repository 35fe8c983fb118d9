use crate::schema::types::ExtractionSchema;
use crate::SchemaError;
use scraper::Selector;
use std::path::Path;

/// On-disk schema document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    Toml,
    Json,
}

impl SchemaFormat {
    /// Picks the format from a file extension; anything but `.json` is TOML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Toml,
        }
    }
}

/// Loads, parses, and validates a schema document
///
/// # Arguments
///
/// * `path` - Path to a `.toml` or `.json` schema file
///
/// # Returns
///
/// * `Ok(ExtractionSchema)` - A structurally valid schema
/// * `Err(SchemaError)` - The file could not be read, parsed, or validated
pub fn load_schema(path: &Path) -> Result<ExtractionSchema, SchemaError> {
    let content = std::fs::read_to_string(path)?;
    let schema = parse_schema(&content, SchemaFormat::from_path(path))?;
    tracing::debug!(
        "Loaded schema '{}' from {} ({} fields)",
        schema.name,
        path.display(),
        schema.fields.len()
    );
    Ok(schema)
}

/// Parses and validates a schema document held in memory
pub fn parse_schema(content: &str, format: SchemaFormat) -> Result<ExtractionSchema, SchemaError> {
    let schema: ExtractionSchema = match format {
        SchemaFormat::Toml => toml::from_str(content)?,
        SchemaFormat::Json => serde_json::from_str(content)?,
    };
    validate_schema(&schema)?;
    Ok(schema)
}

/// Checks the structural invariants of a schema
///
/// Selectors that fail to parse are only warned about: at extraction time
/// they degrade to "no match", and schema authors iterate on live pages.
pub fn validate_schema(schema: &ExtractionSchema) -> Result<(), SchemaError> {
    let invalid = |message: String| SchemaError::Invalid {
        name: schema.name.clone(),
        message,
    };

    if schema.name.trim().is_empty() {
        return Err(invalid("name cannot be empty".to_string()));
    }

    if schema.item_selector.trim().is_empty() {
        return Err(invalid("item_selector cannot be empty".to_string()));
    }

    if schema.fields.is_empty() {
        return Err(invalid("at least one field is required".to_string()));
    }

    for (name, field) in &schema.fields {
        if name.trim().is_empty() {
            return Err(invalid("field names cannot be empty".to_string()));
        }
        if name == "_meta" {
            return Err(invalid("'_meta' is reserved".to_string()));
        }
        if field.selector.trim().is_empty() {
            return Err(invalid(format!("field '{}' has an empty selector", name)));
        }
        if let Some(attr) = &field.attribute {
            if attr.trim().is_empty() {
                return Err(invalid(format!("field '{}' has an empty attribute", name)));
            }
        }
        warn_if_unparsable(&schema.name, &format!("fields.{}", name), &field.selector);
    }

    warn_if_unparsable(&schema.name, "item_selector", &schema.item_selector);

    if let Some(pagination) = &schema.pagination {
        if pagination.next_selector.trim().is_empty() {
            return Err(invalid("pagination.next_selector cannot be empty".to_string()));
        }
        if pagination.max_pages == Some(0) {
            return Err(invalid("pagination.max_pages must be >= 1".to_string()));
        }
        if let Some(wait) = pagination.wait_seconds {
            if !wait.is_finite() || wait < 0.0 {
                return Err(invalid(format!(
                    "pagination.wait_seconds must be >= 0, got {}",
                    wait
                )));
            }
        }
        warn_if_unparsable(&schema.name, "pagination.next_selector", &pagination.next_selector);
    }

    if let Some(url) = &schema.url {
        if url::Url::parse(url).is_err() {
            return Err(invalid(format!("url '{}' is not an absolute URL", url)));
        }
    }

    Ok(())
}

fn warn_if_unparsable(schema: &str, location: &str, selector: &str) {
    if Selector::parse(selector).is_err() {
        tracing::warn!(
            "Schema '{}': {} '{}' is not valid CSS and will never match",
            schema,
            location,
            selector
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::Builder;

    const TOML_SCHEMA: &str = r#"
name = "blog-posts"
url = "https://example.com/blog"
item_selector = "article.post"

[fields.title]
selector = "h2"
required = true

[fields.link]
selector = "a"
attribute = "href"

[fields.tags]
selector = ".tag"
multiple = true

[fields.author]
selector = ".byline"
default = "anonymous"

[pagination]
next_selector = "a.next"
max_pages = 5
wait_seconds = 0.5
"#;

    #[test]
    fn test_parse_toml_schema() {
        let schema = parse_schema(TOML_SCHEMA, SchemaFormat::Toml).unwrap();

        assert_eq!(schema.name, "blog-posts");
        assert_eq!(schema.item_selector, "article.post");
        assert_eq!(schema.fields.len(), 4);
        assert!(schema.fields["title"].required);
        assert_eq!(schema.fields["link"].attribute.as_deref(), Some("href"));
        assert!(schema.fields["tags"].multiple);
        assert_eq!(schema.fields["author"].default, Some(json!("anonymous")));

        let pagination = schema.pagination.unwrap();
        assert_eq!(pagination.next_selector, "a.next");
        assert_eq!(pagination.max_pages, Some(5));
    }

    #[test]
    fn test_parse_json_schema() {
        let content = r#"{
            "name": "products",
            "item_selector": ".product",
            "fields": {
                "price": {"selector": ".price", "default": 0}
            }
        }"#;

        let schema = parse_schema(content, SchemaFormat::Json).unwrap();
        assert_eq!(schema.fields["price"].default, Some(json!(0)));
        assert!(schema.pagination.is_none());
    }

    #[test]
    fn test_load_schema_picks_format_by_extension() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(br#"{"name":"x","item_selector":"li","fields":{"t":{"selector":"a"}}}"#)
            .unwrap();
        file.flush().unwrap();

        let schema = load_schema(file.path()).unwrap();
        assert_eq!(schema.name, "x");
    }

    #[test]
    fn test_missing_fields_rejected() {
        let content = "name = \"empty\"\nitem_selector = \"li\"\n[fields]\n";
        let result = parse_schema(content, SchemaFormat::Toml);
        assert!(matches!(result, Err(SchemaError::Invalid { .. })));
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        let content = r#"
name = "x"
item_selector = "li"
[fields.t]
selector = "a"
[pagination]
next_selector = "a.next"
max_pages = 0
"#;
        assert!(parse_schema(content, SchemaFormat::Toml).is_err());
    }

    #[test]
    fn test_invalid_css_is_not_a_load_error() {
        let content = r#"
name = "x"
item_selector = "[[[broken"
[fields.t]
selector = "a"
"#;
        assert!(parse_schema(content, SchemaFormat::Toml).is_ok());
    }

    #[test]
    fn test_reserved_meta_field_rejected() {
        let content = "name = \"x\"\nitem_selector = \"li\"\n[fields._meta]\nselector = \"a\"\n";
        assert!(parse_schema(content, SchemaFormat::Toml).is_err());
    }
}
