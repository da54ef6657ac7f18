//! One full site build.
//!
//! ```text
//! library -> styles -> assets -> data -> fan-out -> render -> data export
//! ```
//!
//! Each call starts from scratch: a fresh data loader and dataset registry,
//! full directory scans. Any error aborts the build.

use log::info;
use std::path::PathBuf;
use thiserror::Error;

use crate::assets::{self, AssetError};
use crate::command::{self, CommandError};
use crate::config::{AssetTask, SiteConfig};
use crate::data::{load_default_record, DataError, DataLoader};
use crate::generator::{materialize, FanoutGenerator, GenerateError, GeneratedFile};
use crate::registry::DatasetRegistry;
use crate::render::{RenderError, Renderer, Resolver};

#[derive(Error, Debug)]
pub enum BuildError {
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// What a successful build produced.
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Generated File paths inside the template directory.
    pub generated: Vec<PathBuf>,
    /// Rendered pages in the output directory.
    pub rendered: Vec<PathBuf>,
    /// Datasets bound to Base Templates.
    pub registry: DatasetRegistry,
    /// JSON files written by the data export.
    pub exported: Vec<PathBuf>,
    pub assets_copied: usize,
}

/// Runs the whole build for `config`.
pub fn build_site(config: &SiteConfig) -> Result<BuildReport, BuildError> {
    let mut report = BuildReport::default();

    if let Some(library) = &config.library_path {
        let tasks = assets::library_tasks(
            &config.resolve(library),
            &config.source_dir(),
            &config.output_dir(),
        );
        report.assets_copied += assets::run_tasks(&tasks)?;
    }

    if let Some(styles) = &config.styles {
        command::run(styles, &config.root)?;
    }

    let asset_tasks: Vec<_> = config
        .assets
        .iter()
        .map(|task| AssetTask {
            from: config.resolve(&task.from),
            to: config.resolve(&task.to),
        })
        .collect();
    report.assets_copied += assets::run_tasks(&asset_tasks)?;

    let (generated, registry, loader) = generate(config)?;
    report.generated = generated.iter().map(|f| f.path.clone()).collect();

    let default_record = load_default_record(&config.default_data_file())?;
    let resolver = Resolver::new(
        &registry,
        &generated,
        &default_record,
        config.render.lookup,
    );
    report.rendered = Renderer::new(config).render_all(&resolver, &registry)?;

    if let Some(export) = &config.data.export {
        report.exported = loader.export_json(&config.resolve(export))?;
    }

    info!(
        "Built {} pages ({} generated from {} datasets)",
        report.rendered.len(),
        report.generated.len(),
        registry.len()
    );
    report.registry = registry;
    Ok(report)
}

/// Loads data, fans out the Base Templates and writes the Generated Files
/// into the template directory.
fn generate(
    config: &SiteConfig,
) -> Result<(Vec<GeneratedFile>, DatasetRegistry, DataLoader), BuildError> {
    let mut loader = DataLoader::new(config.data_dir(), config.data.ext.clone());
    loader.load_all(&[config.default_data_file()])?;

    let mut registry = DatasetRegistry::new();
    let generator = FanoutGenerator::new(config.templates_dir(), &config.templates);
    let generated = generator.generate(&mut loader, &mut registry)?;
    materialize(&generated)?;
    Ok((generated, registry, loader))
}
