use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use sitegen::config::SiteConfig;
use sitegen::{build_site, command, watch};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the YAML site configuration (defaults to ./site.yaml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log every resolved record and copied file
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Don't start watching after the default build
    #[arg(long, global = true)]
    nosync: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the site once
    Build,
    /// Build the site, then rebuild on every change
    Watch,
    /// Build the site, then run the deploy command
    Deploy,
    /// Initialize a new site
    Init {
        /// Site directory
        #[arg(default_value = ".")]
        path: PathBuf,
    },
}

fn init_logger(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::Init { path }) => {
            init_logger(cli.verbose);
            init_site(path)
        }
        _ => run(&cli),
    }
}

fn run(cli: &Cli) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read working directory")?;
    let config = SiteConfig::load_or_default(cli.config.as_deref(), &cwd)
        .context("Failed to load config")?;
    init_logger(cli.verbose || config.verbose);

    match cli.command {
        Some(Commands::Build) => {
            build_site(&config).context("Build failed")?;
        }
        Some(Commands::Watch) => {
            let report = build_site(&config).context("Build failed")?;
            watch::watch_site(&config, report)?;
        }
        Some(Commands::Deploy) => {
            build_site(&config).context("Build failed")?;
            command::run(&config.deploy_task(), &config.root).context("Deploy failed")?;
            info!("✓ Deployed {:?}", config.output.path);
        }
        _ => {
            let report = build_site(&config).context("Build failed")?;
            if config.live_reload && !cli.nosync {
                watch::watch_site(&config, report)?;
            }
        }
    }

    Ok(())
}

fn init_site(path: &Path) -> Result<()> {
    info!("Initializing site at {:?}", path);

    // Create directory structure
    for dir in ["source/templates", "source/data", "source/js", "source/img"] {
        std::fs::create_dir_all(path.join(dir))?;
    }

    let config_content = r#"templates:
  path: source/templates
  ext: .html
data:
  path: source/data
  default: source/data/default.json
output:
  path: public
  flatten: true
globals:
  site_name: "My Site"
live_reload: true
"#;
    std::fs::write(path.join("site.yaml"), config_content)?;

    let default_data = r#"{
  "data": {
    "title": "Home"
  }
}
"#;
    std::fs::write(path.join("source/data/default.json"), default_data)?;

    let team_data = r#"{
  "data": [
    {"id": "1", "title": "Ada Lovelace", "role": "Analyst"},
    {"id": "2", "title": "Alan Turing", "role": "Researcher"}
  ]
}
"#;
    std::fs::write(path.join("source/data/team.json"), team_data)?;

    let layout = r#"<!doctype html>
<html>
<head><title>{{ title }} | {{ site_name }}</title></head>
<body>
{% block body %}{% endblock %}
</body>
</html>
"#;
    std::fs::write(path.join("source/templates/_layout.html"), layout)?;

    let index = r#"{% extends "_layout.html" %}
{% block body %}
<h1>{{ title }}</h1>
<ul>
{% for member in datasets.team %}
  <li><a href="{{ member.id }}-{{ member.title | slug }}.html">{{ member.title }}</a></li>
{% endfor %}
</ul>
{% endblock %}
"#;
    std::fs::write(path.join("source/templates/index.html"), index)?;

    let member = r#"{% extends "_layout.html" %}
{% block body %}
<h1>{{ title }}</h1>
<p>{{ role }}</p>
<a href="index.html">Back</a>
{% endblock %}
"#;
    std::fs::write(path.join("source/templates/__team.html"), member)?;

    info!("✓ Site initialized successfully!");
    info!("  Run: sitegen build");

    Ok(())
}
