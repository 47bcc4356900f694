use std::collections::HashMap;

/// Binding of every template field to a spreadsheet column.
///
/// Fields keep the order they were discovered in; an empty column means the
/// field is still unmapped.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldMapping {
    bindings: Vec<(String, String)>,
}

impl FieldMapping {
    /// Binds each field to the column selected for it, or leaves it unmapped.
    /// Selections for names that are not template fields are ignored.
    pub fn build_mapping(fields: &[String], selections: &HashMap<String, String>) -> Self {
        let bindings = fields
            .iter()
            .map(|field| {
                let column = selections.get(field).map(|column| column.trim().to_owned());
                (field.to_owned(), column.unwrap_or_default())
            })
            .collect();
        FieldMapping { bindings }
    }

    /// Binds each field to the column carrying the same name, if there is one.
    pub fn prefill(fields: &[String], columns: &[String]) -> Self {
        let bindings = fields
            .iter()
            .map(|field| {
                let column = if columns.contains(field) { field.to_owned() } else { String::new() };
                (field.to_owned(), column)
            })
            .collect();
        FieldMapping { bindings }
    }

    /// Overrides bindings with explicit, non-empty selections.
    pub fn with_selections(mut self, selections: &HashMap<String, String>) -> Self {
        for (field, column) in self.bindings.iter_mut() {
            match selections.get(field.as_str()).map(|selection| selection.trim()) {
                Some(selection) if !selection.is_empty() => *column = selection.to_owned(),
                _ => {}
            }
        }
        self
    }

    /// Fields left without a column, in field order.
    pub fn validate(&self) -> Vec<String> {
        self.bindings
            .iter()
            .filter(|(_, column)| column.is_empty())
            .map(|(field, _)| field.to_owned())
            .collect()
    }

    /// Bindings, as (field, column), whose column is not one of `columns`.
    pub fn unknown_columns(&self, columns: &[String]) -> Vec<(String, String)> {
        self.bindings
            .iter()
            .filter(|(_, column)| !column.is_empty() && !columns.contains(column))
            .cloned()
            .collect()
    }

    /// Column bound to a field
    pub fn column(&self, field: &str) -> Option<&str> {
        self.bindings
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, column)| column.as_str())
            .filter(|column| !column.is_empty())
    }

    /// (field, column) pairs in field order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings.iter().map(|(field, column)| (field.as_str(), column.as_str()))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}
