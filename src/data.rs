//! Data files: parsing, normalization to a list of records, and loading by
//! dataset name.
//!
//! A data file is either a bare array of records or an envelope object with
//! a `data` array. Both normalize to a [`Dataset`] right after parsing, so
//! nothing downstream ever sees the raw shape.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions accepted as YAML data in addition to the configured one.
const YAML_EXTENSIONS: &[&str] = &[".yaml", ".yml"];

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Failed to read data file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse JSON data in {path:?}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to parse YAML data in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("Unexpected data shape in {path:?}: {reason}")]
    Shape { path: PathBuf, reason: String },
}

/// One data row. Carries at least `id` and `title`, plus whatever other
/// fields the templates want.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    /// String form of the `id` field. Numbers are accepted; anything else,
    /// including a missing id, gives an empty string.
    pub fn id(&self) -> String {
        match self.0.get("id") {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    pub fn title(&self) -> Option<&Value> {
        self.0.get("title")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

pub type Dataset = Vec<Record>;

/// Source format of a data file, picked from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
}

impl DataFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Some(Self::Json),
            Some("yaml") | Some("yml") => Some(Self::Yaml),
            _ => None,
        }
    }
}

/// Parses data text into a JSON value. YAML is converted mechanically.
pub fn parse_data(path: &Path, text: &str) -> Result<Value, DataError> {
    match DataFormat::from_path(path).unwrap_or(DataFormat::Json) {
        DataFormat::Json => serde_json::from_str(text).map_err(|source| DataError::Json {
            path: path.to_path_buf(),
            source,
        }),
        DataFormat::Yaml => serde_yaml::from_str(text).map_err(|source| DataError::Yaml {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Normalizes a parsed data file into its records.
pub fn normalize(path: &Path, value: Value) -> Result<Dataset, DataError> {
    let shape_error = |reason: String| DataError::Shape {
        path: path.to_path_buf(),
        reason,
    };
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            Some(_) => return Err(shape_error("`data` field is not an array".to_string())),
            None => return Err(shape_error("object has no `data` field".to_string())),
        },
        _ => {
            return Err(shape_error(
                "expected an array or an object with a `data` array".to_string(),
            ))
        }
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(fields) => Ok(Record(fields)),
            _ => Err(shape_error(format!("record {} is not an object", i))),
        })
        .collect()
}

/// Reads, parses and normalizes one data file.
pub fn load_file(path: &Path) -> Result<Dataset, DataError> {
    let text = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    normalize(path, parse_data(path, &text)?)
}

/// Loads the fallback record used for templates without a record of their
/// own. Accepts `{data: {...}}` or a plain object. A missing file gives an
/// empty record.
pub fn load_default_record(path: &Path) -> Result<Record, DataError> {
    if !path.exists() {
        warn!("Default data file not found: {:?}", path);
        return Ok(Record::default());
    }
    let text = fs::read_to_string(path).map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match parse_data(path, &text)? {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Object(fields)) => Ok(Record(fields)),
            Some(_) => Err(DataError::Shape {
                path: path.to_path_buf(),
                reason: "`data` field of the default data is not an object".to_string(),
            }),
            None => Ok(Record(map)),
        },
        _ => Err(DataError::Shape {
            path: path.to_path_buf(),
            reason: "default data must be an object".to_string(),
        }),
    }
}

/// Loads datasets from a data directory by name, caching each one.
pub struct DataLoader {
    dir: PathBuf,
    ext: String,
    cache: BTreeMap<String, Dataset>,
}

impl DataLoader {
    pub fn new(dir: impl Into<PathBuf>, ext: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            ext: ext.into(),
            cache: BTreeMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the data file for `name`: the configured extension first,
    /// then the YAML alternatives.
    pub fn locate(&self, name: &str) -> Option<PathBuf> {
        std::iter::once(self.ext.as_str())
            .chain(YAML_EXTENSIONS.iter().copied())
            .map(|ext| self.dir.join(format!("{}{}", name, ext)))
            .find(|path| path.is_file())
    }

    /// Returns the dataset called `name`, loading it on first use. `None`
    /// when no data file exists for it.
    pub fn load(&mut self, name: &str) -> Result<Option<&Dataset>, DataError> {
        if !self.cache.contains_key(name) {
            let Some(path) = self.locate(name) else {
                return Ok(None);
            };
            debug!("Loading data {:?}", path);
            let dataset = load_file(&path)?;
            self.cache.insert(name.to_string(), dataset);
        }
        Ok(self.cache.get(name))
    }

    /// Loads every data file in the directory, named by file stem. Files in
    /// `skip` (the default data file) are left alone. Returns the loaded
    /// names in directory order.
    pub fn load_all(&mut self, skip: &[PathBuf]) -> Result<Vec<String>, DataError> {
        if !self.dir.is_dir() {
            debug!("Data directory does not exist: {:?}", self.dir);
            return Ok(Vec::new());
        }
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir).map_err(|source| DataError::Io {
            path: self.dir.clone(),
            source,
        })? {
            let entry = entry.map_err(|source| DataError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && DataFormat::from_path(&path).is_some() && !skip.contains(&path) {
                paths.push(path);
            }
        }
        paths.sort();

        let mut names = Vec::new();
        for path in paths {
            let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if !self.cache.contains_key(name) {
                debug!("Loading data {:?}", path);
                let dataset = load_file(&path)?;
                self.cache.insert(name.to_string(), dataset);
            }
            names.push(name.to_string());
        }
        Ok(names)
    }

    pub fn datasets(&self) -> impl Iterator<Item = (&str, &Dataset)> {
        self.cache.iter().map(|(name, data)| (name.as_str(), data))
    }

    /// Writes every loaded dataset to `<dir>/<name>.json` in envelope form.
    pub fn export_json(&self, dir: &Path) -> Result<Vec<PathBuf>, DataError> {
        fs::create_dir_all(dir).map_err(|source| DataError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        let mut written = Vec::new();
        for (name, dataset) in &self.cache {
            let path = dir.join(format!("{}.json", name));
            let body = serde_json::to_string_pretty(&serde_json::json!({ "data": dataset }))
                .map_err(|source| DataError::Json {
                    path: path.clone(),
                    source,
                })?;
            fs::write(&path, body).map_err(|source| DataError::Io {
                path: path.clone(),
                source,
            })?;
            written.push(path);
        }
        Ok(written)
    }
}
