use crate::extract::record::Record;
use crate::schema::{ExtractionSchema, FieldSpec};
use crate::selector::{collapse_whitespace, validate_selector, SelectorChain, SelectorReport};
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A field spec with its selector parsed once up front
struct CompiledField {
    name: String,
    spec: FieldSpec,
    /// `None` when the selector does not parse; the field then resolves to its default
    selector: Option<Selector>,
}

/// Applies an [`ExtractionSchema`] to HTML documents
pub struct SchemaParser {
    schema: Arc<ExtractionSchema>,
    items: SelectorChain,
    fields: Vec<CompiledField>,
}

impl SchemaParser {
    pub fn new(schema: Arc<ExtractionSchema>) -> Self {
        let items = SelectorChain::new([schema.item_selector.as_str()]);
        let fields = schema
            .fields
            .iter()
            .map(|(name, spec)| {
                let selector = match Selector::parse(&spec.selector) {
                    Ok(selector) => Some(selector),
                    Err(e) => {
                        tracing::warn!(
                            "Field '{}' selector '{}' does not parse ({:?}); using its default",
                            name,
                            spec.selector,
                            e
                        );
                        None
                    }
                };
                CompiledField {
                    name: name.clone(),
                    spec: spec.clone(),
                    selector,
                }
            })
            .collect();

        Self {
            schema,
            items,
            fields,
        }
    }

    pub fn schema(&self) -> &ExtractionSchema {
        &self.schema
    }

    /// Extracts one record per item matched by the schema's item selector
    ///
    /// Items missing a required field are dropped whole; optional fields
    /// that resolve to nothing take their default, or null.
    pub fn parse(&self, html: &str) -> Vec<Record> {
        if html.trim().is_empty() {
            return Vec::new();
        }
        let document = Html::parse_document(html);
        self.parse_document(&document)
    }

    pub fn parse_document(&self, document: &Html) -> Vec<Record> {
        let items = self.items.select_all_in(document);
        let total = items.len();

        let records: Vec<Record> = items
            .into_iter()
            .filter_map(|item| self.parse_item(item))
            .collect();

        if records.len() < total {
            tracing::debug!(
                "Schema '{}': {} of {} items rejected for missing required fields",
                self.schema.name,
                total - records.len(),
                total
            );
        }
        records
    }

    fn parse_item(&self, item: ElementRef<'_>) -> Option<Record> {
        let mut fields = BTreeMap::new();

        for field in &self.fields {
            let value = match &field.selector {
                Some(selector) => resolve_field(item, selector, &field.spec),
                None => None,
            };

            let value = match value {
                Some(value) => value,
                None if field.spec.required => {
                    tracing::debug!("Item rejected: required field '{}' is missing", field.name);
                    return None;
                }
                None => field.spec.default.clone().unwrap_or(Value::Null),
            };
            fields.insert(field.name.clone(), value);
        }

        Some(Record::new(fields))
    }

    /// Validates the item selector against a page, for diagnosing empty results
    pub fn diagnose(&self, html: &str) -> SelectorReport {
        let document = Html::parse_document(html);
        validate_selector(&document, &self.schema.item_selector, None)
    }
}

/// Resolves one field inside `item`; `None` means missing
///
/// A `multiple` field is never missing: no matches is an empty list.
fn resolve_field(item: ElementRef<'_>, selector: &Selector, spec: &FieldSpec) -> Option<Value> {
    let read = |el: ElementRef<'_>| -> Option<String> {
        match &spec.attribute {
            Some(attribute) => el.value().attr(attribute).map(|v| v.trim().to_string()),
            None => Some(collapse_whitespace(&el.text().collect::<String>())),
        }
    };

    if spec.multiple {
        let values: Vec<Value> = item
            .select(selector)
            .filter_map(read)
            .map(Value::String)
            .collect();
        Some(Value::Array(values))
    } else {
        item.select(selector)
            .next()
            .and_then(read)
            .filter(|raw| !raw.is_empty())
            .map(Value::String)
    }
}
