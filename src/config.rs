use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the config file picked up from the working directory when no
/// `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "site.yaml";

#[derive(Debug, Deserialize, Clone)]
pub struct SiteConfig {
    /// Source root; vendored library files land under `<source>/css/lib`
    /// and `<source>/js/lib`.
    #[serde(default = "default_source")]
    pub source: PathBuf,

    #[serde(default)]
    pub templates: TemplatesConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub render: RenderConfig,

    pub globals: Option<HashMap<String, serde_json::Value>>,

    #[serde(default = "default_assets")]
    pub assets: Vec<AssetTask>,

    pub library_path: Option<PathBuf>,

    pub styles: Option<CommandTask>,

    pub deploy: Option<CommandTask>,

    #[serde(default)]
    pub verbose: bool,

    #[serde(default = "default_true")]
    pub live_reload: bool,

    /// Directory relative paths are resolved against. Set by the loader.
    #[serde(skip)]
    pub root: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TemplatesConfig {
    #[serde(default = "default_templates_path")]
    pub path: PathBuf,
    #[serde(default = "default_template_ext")]
    pub ext: String,
    #[serde(default = "default_base_marker")]
    pub base_marker: String,
    #[serde(default = "default_partial_prefix")]
    pub partial_prefix: Option<String>,
    #[serde(default)]
    pub file_prefix: String,
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            path: default_templates_path(),
            ext: default_template_ext(),
            base_marker: default_base_marker(),
            partial_prefix: default_partial_prefix(),
            file_prefix: String::new(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
    #[serde(default = "default_data_ext")]
    pub ext: String,
    #[serde(default = "default_data_file")]
    pub default: PathBuf,
    pub export: Option<PathBuf>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
            ext: default_data_ext(),
            default: default_data_file(),
            export: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_output_path")]
    pub path: PathBuf,
    #[serde(default = "default_true")]
    pub flatten: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: default_output_path(),
            flatten: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct RenderConfig {
    #[serde(default)]
    pub lookup: Lookup,
    #[serde(default)]
    pub strict: bool,
}

/// How a template file is bound to its data record at render time.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    /// Generated files use the record they were generated from.
    #[default]
    Origin,
    /// First record whose id occurs anywhere in the file path.
    PathSubstring,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AssetTask {
    pub from: PathBuf,
    pub to: PathBuf,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CommandTask {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Paths whose changes should trigger a rebuild in watch mode.
    #[serde(default)]
    pub watch: Vec<PathBuf>,
}

fn default_source() -> PathBuf {
    PathBuf::from("source")
}

fn default_templates_path() -> PathBuf {
    PathBuf::from("source/templates")
}

fn default_template_ext() -> String {
    ".html".to_string()
}

fn default_base_marker() -> String {
    "__".to_string()
}

fn default_partial_prefix() -> Option<String> {
    Some("_".to_string())
}

fn default_data_path() -> PathBuf {
    PathBuf::from("source/data")
}

fn default_data_ext() -> String {
    ".json".to_string()
}

fn default_data_file() -> PathBuf {
    PathBuf::from("source/data/default.json")
}

fn default_output_path() -> PathBuf {
    PathBuf::from("public")
}

fn default_assets() -> Vec<AssetTask> {
    vec![
        AssetTask {
            from: PathBuf::from("source/js"),
            to: PathBuf::from("public/js"),
        },
        AssetTask {
            from: PathBuf::from("source/img"),
            to: PathBuf::from("public/img"),
        },
    ]
}

fn default_true() -> bool {
    true
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse YAML in {path:?}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            source: default_source(),
            templates: TemplatesConfig::default(),
            data: DataConfig::default(),
            output: OutputConfig::default(),
            render: RenderConfig::default(),
            globals: None,
            assets: default_assets(),
            library_path: None,
            styles: None,
            deploy: None,
            verbose: false,
            live_reload: true,
            root: PathBuf::new(),
        }
    }
}

impl SiteConfig {
    /// Loads a config file. Relative paths inside it are resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml(&content).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        config.root = absolute_dir(parent).map_err(|source| ConfigError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
        Ok(config)
    }

    /// Parses config from YAML text without touching the filesystem.
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// Loads `explicit` if given, otherwise `site.yaml` from `cwd` if it
    /// exists, otherwise the defaults rooted at `cwd`.
    pub fn load_or_default(explicit: Option<&Path>, cwd: &Path) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let candidate = cwd.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            return Self::load(&candidate);
        }
        let root = absolute_dir(cwd).map_err(|source| ConfigError::Io {
            path: cwd.to_path_buf(),
            source,
        })?;
        Ok(Self {
            root,
            ..Self::default()
        })
    }

    /// Resolves a configured path against the config root.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        self.root.join(path)
    }

    pub fn templates_dir(&self) -> PathBuf {
        self.resolve(&self.templates.path)
    }

    pub fn data_dir(&self) -> PathBuf {
        self.resolve(&self.data.path)
    }

    pub fn default_data_file(&self) -> PathBuf {
        self.resolve(&self.data.default)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve(&self.output.path)
    }

    pub fn source_dir(&self) -> PathBuf {
        self.resolve(&self.source)
    }

    /// The configured deploy command, or a subtree push of the output
    /// directory to the `gh-pages` branch.
    pub fn deploy_task(&self) -> CommandTask {
        self.deploy.clone().unwrap_or_else(|| CommandTask {
            command: "git".to_string(),
            args: vec![
                "subtree".to_string(),
                "push".to_string(),
                "--prefix".to_string(),
                self.output.path.to_string_lossy().into_owned(),
                "origin".to_string(),
                "gh-pages".to_string(),
            ],
            watch: Vec::new(),
        })
    }

    /// Directories watched for changes in live reload mode.
    pub fn watch_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.templates_dir(), self.data_dir()];
        paths.extend(self.assets.iter().map(|task| self.resolve(&task.from)));
        if let Some(styles) = &self.styles {
            paths.extend(styles.watch.iter().map(|p| self.resolve(p)));
        }
        paths.sort();
        paths.dedup();
        paths
    }
}

fn absolute_dir(dir: &Path) -> std::io::Result<PathBuf> {
    std::fs::canonicalize(dir)
}
