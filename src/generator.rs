use log::{debug, info, warn};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::classify::{classify, TemplateKind};
use crate::config::TemplatesConfig;
use crate::data::{DataError, DataLoader, Record};
use crate::registry::DatasetRegistry;
use crate::slug::slugify_value;

#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Data(#[from] DataError),
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> GenerateError + '_ {
    move |source| GenerateError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// A file produced from a Base Template for one record, not yet on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    /// Verbatim copy of the Base Template.
    pub contents: Vec<u8>,
    pub dataset: String,
    /// The record this file was generated for.
    pub record: Record,
}

/// Slug segment used when a record has no usable title. Matches what the
/// `slug` filter renders for the same input.
const NO_SLUG: &str = "false";

/// Output filename for a record: `<prefix><id>-<slug(title)><suffix>`.
///
/// A record without an id gets an empty id segment.
pub fn generated_file_name(record: &Record, file_prefix: &str, file_suffix: &str) -> String {
    let slug = record
        .title()
        .and_then(slugify_value)
        .unwrap_or_else(|| NO_SLUG.to_string());
    format!("{}{}-{}{}", file_prefix, record.id(), slug, file_suffix)
}

/// Fans Base Templates out into one file per data record.
pub struct FanoutGenerator<'a> {
    base: PathBuf,
    conventions: &'a TemplatesConfig,
}

impl<'a> FanoutGenerator<'a> {
    pub fn new(base: impl Into<PathBuf>, conventions: &'a TemplatesConfig) -> Self {
        Self {
            base: base.into(),
            conventions,
        }
    }

    /// Ensures that the specified directory exists, creating it if necessary.
    fn ensure_dir_exists(path: &Path) -> Result<(), GenerateError> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(io_error(path))?;
        }
        Ok(())
    }

    /// Base Templates at the top of the template directory as
    /// `(dataset, path)`, sorted by filename.
    pub fn base_templates(&self) -> Result<Vec<(String, PathBuf)>, GenerateError> {
        if !self.base.is_dir() {
            debug!("Template directory does not exist: {:?}", self.base);
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for entry in fs::read_dir(&self.base).map_err(io_error(&self.base))? {
            let entry = entry.map_err(io_error(&self.base))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some(TemplateKind::Base { dataset }) = classify(filename, self.conventions) {
                found.push((dataset, path));
            }
        }
        found.sort_by(|a, b| a.1.cmp(&b.1));
        Ok(found)
    }

    /// Produces the Generated Files for every Base Template and registers
    /// each matched dataset in `registry`.
    ///
    /// Order is Base Template order, then record order. A Base Template
    /// without a data file yields nothing and registers nothing.
    pub fn generate(
        &self,
        loader: &mut DataLoader,
        registry: &mut DatasetRegistry,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let mut files = Vec::new();
        for (dataset_name, template_path) in self.base_templates()? {
            let out_dir = self.base.join(&dataset_name);
            Self::ensure_dir_exists(&out_dir)?;

            let expected = loader.dir().join(format!("{}.*", dataset_name));
            let Some(dataset) = loader.load(&dataset_name)? else {
                warn!(
                    "No data for base template {:?}: expected {:?}",
                    template_path, expected
                );
                continue;
            };
            let contents = fs::read(&template_path).map_err(io_error(&template_path))?;

            for record in dataset {
                if record.id().is_empty() {
                    warn!("Record without id in dataset {:?}", dataset_name);
                }
                let filename = generated_file_name(
                    record,
                    &self.conventions.file_prefix,
                    &self.conventions.ext,
                );
                files.push(GeneratedFile {
                    path: out_dir.join(filename),
                    contents: contents.clone(),
                    dataset: dataset_name.clone(),
                    record: record.clone(),
                });
            }
            debug!(
                "Generated {} files from {:?}",
                dataset.len(),
                template_path
            );
            registry.register(dataset_name, dataset.clone());
        }
        Ok(files)
    }
}

/// Writes Generated Files to disk. Files whose current contents already
/// match are not touched. Returns the number of files written.
pub fn materialize(files: &[GeneratedFile]) -> Result<usize, GenerateError> {
    let mut written = 0;
    for file in files {
        if let Some(parent) = file.path.parent() {
            FanoutGenerator::ensure_dir_exists(parent)?;
        }
        if fs::read(&file.path).is_ok_and(|current| current == file.contents) {
            continue;
        }
        fs::write(&file.path, &file.contents).map_err(io_error(&file.path))?;
        info!("{:?}", file.path);
        written += 1;
    }
    Ok(written)
}
