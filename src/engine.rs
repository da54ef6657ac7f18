use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde::Serialize;
use std::path::{Component, Path, PathBuf};

/// TemplateEngine wraps minijinja::Environment and provides a clean API for rendering templates.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Creates a new TemplateEngine with lenient undefined handling and the
    /// site filters registered.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Lenient);

        // Register custom filters
        env.add_filter("slug", crate::filters::filter_slug);
        env.add_filter("camelcase", crate::filters::filter_camelcase);
        env.add_filter("pascalcase", crate::filters::filter_pascalcase);
        env.add_filter("snakecase", crate::filters::filter_snakecase);
        env.add_filter("kebabcase", crate::filters::filter_kebabcase);
        env.add_filter("screamingsnakecase", crate::filters::filter_screamingsnakecase);

        Self { env }
    }

    /// Makes undefined variables an error instead of rendering as empty.
    pub fn strict(mut self, strict: bool) -> Self {
        let behavior = if strict {
            UndefinedBehavior::Strict
        } else {
            UndefinedBehavior::Lenient
        };
        self.env.set_undefined_behavior(behavior);
        self
    }

    /// Resolves `{% include %}`, `{% extends %}` and `{% import %}` names
    /// relative to `root`.
    pub fn with_loader(mut self, root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        self.env.set_loader(move |name: &str| {
            let relative = Path::new(name);
            if relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
            {
                return Ok(None);
            }
            match std::fs::read_to_string(root.join(relative)) {
                Ok(source) => Ok(Some(source)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template {:?}", name),
                )
                .with_source(e)),
            }
        });
        self
    }

    /// Registers a global variable in the template environment.
    pub fn add_global<T: Serialize>(&mut self, name: String, value: T) {
        self.env
            .add_global(name, minijinja::value::Value::from_serialize(&value));
    }

    /// Renders a template string with the given context.
    pub fn render_string<T: Serialize>(
        &self,
        template_str: &str,
        context: &T,
    ) -> Result<String, String> {
        let template = self
            .env
            .template_from_str(template_str)
            .map_err(|e| e.to_string())?;

        let rendered = template.render(context).map_err(|e| {
            if let Some(line) = e.line() {
                let error_line = template_str.lines().nth(line - 1).unwrap_or("");
                format!("{}\n{}", e, error_line)
            } else {
                format!("{}", e)
            }
        })?;

        Ok(rendered)
    }

    /// Renders a template from a file with the given context.
    pub fn render_file<T: Serialize>(
        &self,
        template_path: &Path,
        context: &T,
    ) -> Result<String, String> {
        let template_str = std::fs::read_to_string(template_path)
            .map_err(|e| format!("Failed to read template file {:?}: {}", template_path, e))?;

        self.render_string(&template_str, context)
            .map_err(|e| format!("{:?}, error: {}", template_path, e))
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_render_string() {
        let engine = TemplateEngine::new();
        let context = HashMap::from([("name", "World")]);
        let result = engine.render_string("Hello, {{ name }}!", &context).unwrap();
        assert_eq!(result, "Hello, World!");
    }

    #[test]
    fn test_render_string_with_globals() {
        let mut engine = TemplateEngine::new();
        engine.add_global("version".to_string(), "1.0.0");

        let context = HashMap::from([("name", "Test")]);
        let result = engine
            .render_string("{{ name }} v{{ version }}", &context)
            .unwrap();
        assert_eq!(result, "Test v1.0.0");
    }

    #[test]
    fn test_undefined_variable_lenient_by_default() {
        let engine = TemplateEngine::new();
        let context: HashMap<String, String> = HashMap::new();
        let result = engine.render_string("Hello, {{ name }}!", &context).unwrap();
        assert_eq!(result, "Hello, !");
    }

    #[test]
    fn test_undefined_variable_strict() {
        let engine = TemplateEngine::new().strict(true);
        let context: HashMap<String, String> = HashMap::new();
        let result = engine.render_string("Hello, {{ name }}!", &context);
        assert!(result.is_err());
    }

    #[test]
    fn test_slug_filter_in_template() {
        let engine = TemplateEngine::new();
        let context = HashMap::from([("id", "42"), ("title", "Carol Jones")]);
        let result = engine
            .render_string("<a href=\"{{ id }}-{{ title | slug }}.html\">", &context)
            .unwrap();
        assert_eq!(result, "<a href=\"42-carol-jones.html\">");
    }

    #[test]
    fn test_loader_extends_and_include() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("_layout.html"),
            "<main>{% block body %}{% endblock %}</main>",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("partials")).unwrap();
        std::fs::write(dir.path().join("partials/_nav.html"), "<nav/>").unwrap();

        let engine = TemplateEngine::new().with_loader(dir.path());
        let context: HashMap<String, String> = HashMap::new();
        let result = engine
            .render_string(
                "{% extends \"_layout.html\" %}{% block body %}{% include \"partials/_nav.html\" %}{% endblock %}",
                &context,
            )
            .unwrap();
        assert_eq!(result, "<main><nav/></main>");
    }

    #[test]
    fn test_loader_rejects_parent_dirs() {
        let dir = tempdir().unwrap();
        let engine = TemplateEngine::new().with_loader(dir.path().join("templates"));
        let context: HashMap<String, String> = HashMap::new();
        let result = engine.render_string("{% include \"../secret.html\" %}", &context);
        assert!(result.is_err());
    }
}
