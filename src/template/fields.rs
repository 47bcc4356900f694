use crate::error::RustyMergeError;
use crate::template::render::parse_part;
use crate::template::TemplateFormat;
use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

/// `{{ name }}` with optional inner whitespace, as matched in paragraph text
pub(crate) static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").expect("Hardcode regex pattern"));

/// Strict `{{name}}` form searched in raw markup
static RAW_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(\w+)\}\}").expect("Hardcode regex pattern"));

/// Collects the placeholder names of a template in discovery order.
///
/// Paragraph text is searched first so placeholders split across formatting runs
/// are found. If that yields nothing, the raw markup of the parts is scanned for
/// the strict `{{identifier}}` form.
pub(crate) fn extract_fields(parts: &[(String, String)], format: TemplateFormat) -> Result<Vec<String>, RustyMergeError> {
    let mut fields = FieldSet::default();
    for (_, content) in parts {
        if format.is_package() {
            for paragraph in parse_part(content, format)?.paragraphs {
                fields.collect(&PLACEHOLDER, &paragraph.text());
            }
        } else {
            fields.collect(&PLACEHOLDER, content);
        }
    }

    if fields.is_empty() {
        debug!("no placeholder in paragraph text, scanning raw markup");
        for (_, content) in parts {
            fields.collect(&RAW_PLACEHOLDER, content);
        }
    }
    Ok(fields.names)
}

/// Ordered set of field names
#[derive(Default)]
struct FieldSet {
    names: Vec<String>,
    seen: HashSet<String>,
}

impl FieldSet {
    fn collect(&mut self, pattern: &Regex, text: &str) {
        for captures in pattern.captures_iter(text) {
            let name = &captures[1];
            if self.seen.insert(name.to_owned()) {
                self.names.push(name.to_owned());
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
