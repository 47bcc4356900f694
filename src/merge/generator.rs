use crate::merge::GenerationError;
use crate::template::package::is_malformed_container;
use crate::template::package::rewrite_in_place;
use crate::template::DocumentTemplate;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;
use tracing::warn;

/// Produces one document: loads a fresh copy of the template, substitutes the
/// context values, writes the result and checks that it reopens.
///
/// When the written file cannot be opened as a container, its bytes are
/// rewritten unchanged and checked once more; a second failure is returned.
pub fn generate(
    template_path: &Path,
    context: &HashMap<String, String>,
    output_path: &Path,
) -> Result<(), GenerationError> {
    let template = DocumentTemplate::load(template_path)
        .map_err(|error| GenerationError::TemplateLoad(error.to_string()))?;
    let rendered = template
        .render(context)
        .map_err(|error| GenerationError::Render(error.to_string()))?;
    template
        .write(&rendered, output_path)
        .map_err(|error| GenerationError::Write(error.to_string()))?;

    match template.verify(output_path) {
        Ok(()) => {}
        Err(error) if is_malformed_container(&error) => {
            warn!(output = %output_path.display(), %error, "rewriting malformed document");
            rewrite_in_place(output_path).map_err(|error| GenerationError::Write(error.to_string()))?;
            template
                .verify(output_path)
                .map_err(|error| GenerationError::Integrity(error.to_string()))?;
        }
        Err(error) => Err(GenerationError::Integrity(error.to_string()))?,
    }

    debug!(output = %output_path.display(), parts = rendered.len(), "document written");
    Ok(())
}
