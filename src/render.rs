//! Rendering of the template directory into the output directory.
//!
//! Every page template, hand-written or generated, is bound to exactly one
//! record by [`Resolver`] and rendered with the record's fields as context.

use log::{debug, info, warn};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

use crate::classify::{classify, TemplateKind};
use crate::config::{Lookup, SiteConfig};
use crate::data::Record;
use crate::engine::TemplateEngine;
use crate::generator::GeneratedFile;
use crate::registry::DatasetRegistry;

/// Context key holding every registered dataset.
const DATASETS_KEY: &str = "datasets";

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to scan template directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Failed to render {path:?}: {message}")]
    Template { path: PathBuf, message: String },
}

/// Picks the data record a template file is rendered with. Always returns
/// a record: the default one when nothing matches.
pub struct Resolver<'a> {
    registry: &'a DatasetRegistry,
    origins: HashMap<&'a Path, &'a Record>,
    default: &'a Record,
    lookup: Lookup,
}

impl<'a> Resolver<'a> {
    pub fn new(
        registry: &'a DatasetRegistry,
        generated: &'a [GeneratedFile],
        default: &'a Record,
        lookup: Lookup,
    ) -> Self {
        let origins = generated
            .iter()
            .map(|file| (file.path.as_path(), &file.record))
            .collect();
        Self {
            registry,
            origins,
            default,
            lookup,
        }
    }

    pub fn resolve(&self, path: &Path) -> &'a Record {
        let found = match self.lookup {
            Lookup::Origin => self.origins.get(path).copied(),
            Lookup::PathSubstring => self.by_path_substring(path),
        };
        match found {
            Some(record) => {
                debug!(
                    "Found generated template {:?}: using {}",
                    path,
                    Value::Object(record.fields().clone())
                );
                record
            }
            None => self.default,
        }
    }

    /// First record, in registration then record order, whose id occurs in
    /// the path. Records with an empty id never match.
    fn by_path_substring(&self, path: &Path) -> Option<&'a Record> {
        let haystack = path.to_string_lossy();
        self.registry
            .iter()
            .flat_map(|(_, dataset)| dataset.iter())
            .find(|record| {
                let id = record.id();
                !id.is_empty() && haystack.contains(id.as_str())
            })
    }
}

pub struct Renderer<'a> {
    config: &'a SiteConfig,
    engine: TemplateEngine,
}

impl<'a> Renderer<'a> {
    pub fn new(config: &'a SiteConfig) -> Self {
        let mut engine = TemplateEngine::new()
            .strict(config.render.strict)
            .with_loader(config.templates_dir());
        if let Some(globals) = &config.globals {
            for (name, value) in globals {
                engine.add_global(name.clone(), value);
            }
        }
        Self { config, engine }
    }

    /// Page templates under the template directory, in sorted order. Base
    /// Templates and partials are left out.
    pub fn discover(&self) -> Result<Vec<PathBuf>, RenderError> {
        let base = self.config.templates_dir();
        if !base.is_dir() {
            debug!("Template directory does not exist: {:?}", base);
            return Ok(Vec::new());
        }
        let mut pages = Vec::new();
        for entry in WalkDir::new(&base).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(filename) = entry.file_name().to_str() else {
                continue;
            };
            match classify(filename, &self.config.templates) {
                Some(TemplateKind::Page) => pages.push(entry.into_path()),
                Some(TemplateKind::Base { .. }) if entry.depth() > 1 => {
                    warn!(
                        "Base template {:?} is not at the top of {:?}, skipping it",
                        entry.path(),
                        base
                    );
                }
                _ => {}
            }
        }
        Ok(pages)
    }

    /// Where a template's output goes: flat under the output directory, or
    /// mirroring the template tree when flattening is off.
    pub fn output_path(&self, template: &Path) -> PathBuf {
        let base = self.config.templates_dir();
        let output = self.config.output_dir();
        if self.config.output.flatten {
            match template.file_name() {
                Some(name) => output.join(name),
                None => output,
            }
        } else {
            output.join(template.strip_prefix(&base).unwrap_or(template))
        }
    }

    fn context(record: &Record, registry: &DatasetRegistry) -> Value {
        let mut context = record.fields().clone();
        context
            .entry(DATASETS_KEY.to_string())
            .or_insert_with(|| registry.to_value());
        Value::Object(context)
    }

    /// Renders every page and writes it to the output directory. Returns
    /// the written paths.
    pub fn render_all(
        &self,
        resolver: &Resolver,
        registry: &DatasetRegistry,
    ) -> Result<Vec<PathBuf>, RenderError> {
        let mut written = Vec::new();
        let mut seen = HashSet::new();
        for template in self.discover()? {
            let record = resolver.resolve(&template);
            let rendered = self
                .engine
                .render_file(&template, &Self::context(record, registry))
                .map_err(|message| RenderError::Template {
                    path: template.clone(),
                    message,
                })?;

            let output_path = self.output_path(&template);
            if !seen.insert(output_path.clone()) {
                warn!(
                    "{:?} overwrites an earlier page at {:?}",
                    template, output_path
                );
            }
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            fs::write(&output_path, rendered).map_err(|source| RenderError::Io {
                path: output_path.clone(),
                source,
            })?;
            info!("{:?}", output_path);
            written.push(output_path);
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn rec(value: Value) -> Record {
        match value {
            Value::Object(map) => Record::new(map),
            _ => unreachable!(),
        }
    }

    fn config_at(root: &Path) -> SiteConfig {
        SiteConfig {
            root: root.to_path_buf(),
            ..SiteConfig::default()
        }
    }

    #[test]
    fn test_resolve_by_origin() {
        let carol = rec(json!({"id": "42", "title": "Carol"}));
        let default = rec(json!({"title": "Home"}));
        let mut registry = DatasetRegistry::new();
        registry.register("team", vec![carol.clone()]);
        let generated = vec![GeneratedFile {
            path: PathBuf::from("/site/templates/team/42-carol.html"),
            contents: Vec::new(),
            dataset: "team".to_string(),
            record: carol.clone(),
        }];

        let resolver = Resolver::new(&registry, &generated, &default, Lookup::Origin);
        assert_eq!(
            resolver.resolve(Path::new("/site/templates/team/42-carol.html")),
            &carol
        );
        assert_eq!(
            resolver.resolve(Path::new("/site/templates/misc/unrelated.html")),
            &default
        );
        // a hand-written page that happens to contain the id
        assert_eq!(
            resolver.resolve(Path::new("/site/templates/page-42.html")),
            &default
        );
    }

    #[test]
    fn test_resolve_by_path_substring() {
        let carol = rec(json!({"id": "42", "title": "Carol"}));
        let default = rec(json!({"title": "Home"}));
        let mut registry = DatasetRegistry::new();
        registry.register("team", vec![carol.clone()]);

        let resolver = Resolver::new(&registry, &[], &default, Lookup::PathSubstring);
        assert_eq!(
            resolver.resolve(Path::new("/site/templates/team/42-carol.html")),
            &carol
        );
        assert_eq!(
            resolver.resolve(Path::new("/site/templates/misc/unrelated.html")),
            &default
        );
    }

    #[test]
    fn test_path_substring_first_match_wins() {
        let one = rec(json!({"id": "1", "title": "One"}));
        let twelve = rec(json!({"id": "12", "title": "Twelve"}));
        let no_id = rec(json!({"title": "Nobody"}));
        let default = Record::default();
        let mut registry = DatasetRegistry::new();
        registry.register("a", vec![no_id, one.clone()]);
        registry.register("b", vec![twelve]);

        let resolver = Resolver::new(&registry, &[], &default, Lookup::PathSubstring);
        assert_eq!(resolver.resolve(Path::new("/t/b/12-twelve.html")), &one);
        assert_eq!(resolver.resolve(Path::new("/t/index.html")), &default);
    }

    #[test]
    fn test_discover_skips_base_and_partials() {
        let dir = tempdir().unwrap();
        let config = config_at(dir.path());
        let templates = config.templates_dir();
        fs::create_dir_all(templates.join("team")).unwrap();
        fs::write(templates.join("__team.html"), "base").unwrap();
        fs::write(templates.join("_layout.html"), "layout").unwrap();
        fs::write(templates.join("index.html"), "index").unwrap();
        fs::write(templates.join("notes.txt"), "notes").unwrap();
        fs::write(templates.join("team/1-alice.html"), "alice").unwrap();

        let renderer = Renderer::new(&config);
        assert_eq!(
            renderer.discover().unwrap(),
            vec![templates.join("index.html"), templates.join("team/1-alice.html")]
        );
    }

    #[test]
    fn test_discover_skips_nested_base_templates() {
        let dir = tempdir().unwrap();
        let config = config_at(dir.path());
        let templates = config.templates_dir();
        fs::create_dir_all(templates.join("about")).unwrap();
        fs::write(templates.join("about/__people.html"), "people").unwrap();
        fs::write(templates.join("about/contact.html"), "contact").unwrap();

        let renderer = Renderer::new(&config);
        assert_eq!(
            renderer.discover().unwrap(),
            vec![templates.join("about/contact.html")]
        );
    }

    #[test]
    fn test_output_path_flatten() {
        let dir = tempdir().unwrap();
        let mut config = config_at(dir.path());
        let template = config.templates_dir().join("team/deep/1-alice.html");

        assert_eq!(
            Renderer::new(&config).output_path(&template),
            config.output_dir().join("1-alice.html")
        );
        config.output.flatten = false;
        assert_eq!(
            Renderer::new(&config).output_path(&template),
            config.output_dir().join("team/deep/1-alice.html")
        );
    }

    #[test]
    fn test_render_all_flattens() {
        let dir = tempdir().unwrap();
        let config = config_at(dir.path());
        let templates = config.templates_dir();
        fs::create_dir_all(templates.join("team")).unwrap();
        fs::create_dir_all(templates.join("news/2024")).unwrap();
        fs::write(templates.join("_layout.html"), "[{% block body %}{% endblock %}]").unwrap();
        fs::write(
            templates.join("team/1-alice.html"),
            "{% extends \"_layout.html\" %}{% block body %}{{ title }}{% endblock %}",
        )
        .unwrap();
        fs::write(templates.join("news/2024/n1-launch.html"), "{{ title | slug }}").unwrap();

        let alice = rec(json!({"id": "1", "title": "Alice"}));
        let launch = rec(json!({"id": "n1", "title": "Big Launch"}));
        let mut registry = DatasetRegistry::new();
        registry.register("team", vec![alice.clone()]);
        registry.register("news", vec![launch.clone()]);
        let generated = vec![
            GeneratedFile {
                path: templates.join("team/1-alice.html"),
                contents: Vec::new(),
                dataset: "team".to_string(),
                record: alice,
            },
            GeneratedFile {
                path: templates.join("news/2024/n1-launch.html"),
                contents: Vec::new(),
                dataset: "news".to_string(),
                record: launch,
            },
        ];
        let default = Record::default();
        let resolver = Resolver::new(&registry, &generated, &default, Lookup::Origin);

        let written = Renderer::new(&config).render_all(&resolver, &registry).unwrap();
        let output = config.output_dir();
        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(output.join("1-alice.html")).unwrap(), "[Alice]");
        assert_eq!(fs::read_to_string(output.join("n1-launch.html")).unwrap(), "big-launch");
        assert!(!output.join("team").exists());
    }

    #[test]
    fn test_render_datasets_and_globals() {
        let dir = tempdir().unwrap();
        let mut config = config_at(dir.path());
        config.globals = Some(HashMap::from([("site_name".to_string(), json!("Lab"))]));
        let templates = config.templates_dir();
        fs::create_dir_all(&templates).unwrap();
        fs::write(
            templates.join("index.html"),
            "{{ site_name }}: {{ title }}{% for m in datasets.team %} {{ m.id }}-{{ m.title | slug }}{% endfor %}",
        )
        .unwrap();

        let mut registry = DatasetRegistry::new();
        registry.register(
            "team",
            vec![
                rec(json!({"id": "1", "title": "Alice A"})),
                rec(json!({"id": "2", "title": "Bob"})),
            ],
        );
        let default = rec(json!({"title": "Home"}));
        let resolver = Resolver::new(&registry, &[], &default, Lookup::Origin);

        Renderer::new(&config).render_all(&resolver, &registry).unwrap();
        assert_eq!(
            fs::read_to_string(config.output_dir().join("index.html")).unwrap(),
            "Lab: Home 1-alice-a 2-bob"
        );
    }

    #[test]
    fn test_render_error_names_file() {
        let dir = tempdir().unwrap();
        let config = config_at(dir.path());
        let templates = config.templates_dir();
        fs::create_dir_all(&templates).unwrap();
        fs::write(templates.join("broken.html"), "{% if %}").unwrap();

        let registry = DatasetRegistry::new();
        let default = Record::default();
        let resolver = Resolver::new(&registry, &[], &default, Lookup::Origin);
        let err = Renderer::new(&config)
            .render_all(&resolver, &registry)
            .unwrap_err();
        assert!(matches!(err, RenderError::Template { .. }));
        assert!(err.to_string().contains("broken.html"));
    }
}
