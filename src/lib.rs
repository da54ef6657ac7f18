//! Static site builder.
//!
//! Data files are loaded into named datasets, "base templates"
//! (`__<dataset>.html`) are fanned out into one page per record, and every
//! page template is rendered with minijinja against its record into a flat
//! output directory.

pub mod assets;
pub mod classify;
pub mod command;
pub mod config;
pub mod data;
pub mod engine;
pub mod filters;
pub mod generator;
pub mod pipeline;
pub mod registry;
pub mod render;
pub mod slug;
pub mod watch;

pub use classify::{classify, TemplateKind};
pub use config::{Lookup, SiteConfig};
pub use data::{DataLoader, Dataset, Record};
pub use engine::TemplateEngine;
pub use generator::{FanoutGenerator, GeneratedFile};
pub use pipeline::{build_site, BuildError, BuildReport};
pub use registry::DatasetRegistry;
pub use render::{Renderer, Resolver};
pub use slug::slugify;
