use crate::config::TemplatesConfig;

/// What a file in the template directory is, judged by its name alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateKind {
    /// `<marker><dataset><ext>`: copied once per record of `dataset`.
    Base { dataset: String },
    /// Include/extends target, never rendered on its own.
    Partial,
    /// Rendered to the output directory.
    Page,
}

/// Classifies a template filename. Returns `None` for files that do not
/// carry the template extension.
pub fn classify(filename: &str, conventions: &TemplatesConfig) -> Option<TemplateKind> {
    let stem = filename.strip_suffix(conventions.ext.as_str())?;
    if let Some(dataset) = stem.strip_prefix(conventions.base_marker.as_str()) {
        if !dataset.is_empty() {
            return Some(TemplateKind::Base {
                dataset: dataset.to_string(),
            });
        }
    }
    match &conventions.partial_prefix {
        Some(prefix) if !prefix.is_empty() && filename.starts_with(prefix.as_str()) => {
            Some(TemplateKind::Partial)
        }
        _ => Some(TemplateKind::Page),
    }
}
