use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// A declarative description of what to extract from a listing page
///
/// Loaded once per job and shared read-only across the crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionSchema {
    /// Schema identifier, stamped into `_meta.schema`
    pub name: String,

    /// Default start URL for the job
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// CSS selector matching each repeating item container
    pub item_selector: String,

    /// Field name to field spec, resolved relative to each item
    pub fields: BTreeMap<String, FieldSpec>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationSpec>,
}

/// How to resolve a single named field inside an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub selector: String,

    /// Read this attribute instead of the element text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,

    /// Value used when the field is optional and nothing matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Reject the whole item when this field is missing
    #[serde(default)]
    pub required: bool,

    /// Collect every non-empty match as a list
    #[serde(default)]
    pub multiple: bool,
}

/// Next-page link discovery for multi-page jobs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaginationSpec {
    pub next_selector: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,

    /// Pause between consecutive page fetches, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_seconds: Option<f64>,
}

impl FieldSpec {
    /// A text field with no attribute, default, or flags
    pub fn text(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            attribute: None,
            default: None,
            required: false,
            multiple: false,
        }
    }

    /// A field reading `attribute` from the first match
    pub fn attr(selector: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            attribute: Some(attribute.into()),
            ..Self::text(selector)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

impl ExtractionSchema {
    /// Builds a schema with no fields and no pagination
    pub fn new(name: impl Into<String>, item_selector: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: None,
            item_selector: item_selector.into(),
            fields: BTreeMap::new(),
            pagination: None,
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.insert(name.into(), spec);
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationSpec) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}
