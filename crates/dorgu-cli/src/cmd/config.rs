use crate::layers::{self, Sources};
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use dorgu_core::global::{GlobalConfig, KEYS};
use dorgu_core::paths;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// List every global setting with its source
    List,

    /// Print one global setting
    Get {
        /// Setting key, e.g. defaults.registry
        key: String,
    },

    /// Change one global setting
    Set {
        /// Setting key, e.g. defaults.registry
        key: String,
        value: String,
    },

    /// Print the global config file location
    Path,

    /// Restore the global config to its defaults
    Reset,

    /// Print the effective configuration for an application
    Show {
        /// Application directory
        #[arg(default_value = ".")]
        app_dir: PathBuf,

        /// Workspace config file (default: <root>/.dorgu.yaml)
        #[arg(long)]
        config: Option<PathBuf>,

        #[arg(long, short = 'n')]
        namespace: Option<String>,

        #[arg(long)]
        registry: Option<String>,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(root: &Path, subcmd: ConfigSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::List => list(json),
        ConfigSubcommand::Get { key } => get(&key, json),
        ConfigSubcommand::Set { key, value } => set(&key, &value, json),
        ConfigSubcommand::Path => path(json),
        ConfigSubcommand::Reset => reset(json),
        ConfigSubcommand::Show {
            app_dir,
            config,
            namespace,
            registry,
        } => show(
            &Sources {
                root,
                app_dir: &app_dir,
                workspace_config: config.as_deref(),
                namespace,
                registry,
            },
            json,
        ),
    }
}

fn global_path() -> anyhow::Result<PathBuf> {
    paths::global_config_path().context("cannot locate global config")
}

fn load() -> anyhow::Result<(PathBuf, GlobalConfig)> {
    let path = global_path()?;
    let cfg = GlobalConfig::load(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    Ok((path, cfg))
}

// ---------------------------------------------------------------------------
// list / get / set
// ---------------------------------------------------------------------------

fn list(json: bool) -> anyhow::Result<()> {
    let (_, cfg) = load()?;
    let entries = cfg.list_all();
    if json {
        return print_json(&entries);
    }
    let rows = entries
        .into_iter()
        .map(|e| {
            let value = if e.value.is_empty() {
                "(not set)".to_string()
            } else {
                e.value
            };
            vec![e.key, value, e.source]
        })
        .collect();
    print_table(&["KEY", "VALUE", "SOURCE"], rows);
    Ok(())
}

fn get(key: &str, json: bool) -> anyhow::Result<()> {
    let (_, cfg) = load()?;
    let value = cfg.get(key)?;
    if json {
        return print_json(&serde_json::json!({ "key": key, "value": value }));
    }
    println!("{value}");
    Ok(())
}

fn set(key: &str, value: &str, json: bool) -> anyhow::Result<()> {
    let (path, mut cfg) = load()?;
    cfg.set(key, value)?;
    cfg.save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    let shown = cfg.get(key)?;
    if json {
        return print_json(&serde_json::json!({ "key": key, "value": shown }));
    }
    println!("Set {key} = {shown}");
    Ok(())
}

// ---------------------------------------------------------------------------
// path / reset
// ---------------------------------------------------------------------------

fn path(json: bool) -> anyhow::Result<()> {
    let path = global_path()?;
    if json {
        return print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "exists": path.exists(),
        }));
    }
    println!("{}", path.display());
    Ok(())
}

fn reset(json: bool) -> anyhow::Result<()> {
    let path = global_path()?;
    GlobalConfig::default()
        .save(&path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    if json {
        return print_json(&serde_json::json!({ "reset": true, "keys": KEYS }));
    }
    println!("Reset global config at {}", path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// show
// ---------------------------------------------------------------------------

fn show(sources: &Sources, json: bool) -> anyhow::Result<()> {
    let resolved = layers::resolve(sources);
    if json {
        return print_json(&resolved.config);
    }
    print!("{}", resolved.config.to_yaml()?);
    Ok(())
}
