use crate::output::print_json;
use anyhow::Context;
use dorgu_core::config::EffectiveConfig;
use dorgu_core::{io, paths};
use std::path::Path;

const HEADER: &str = "\
# Dorgu workspace configuration
# Applies to every application under this directory. An application's own
# .dorgu.yaml and CLI flags take precedence over these values.
#
# The built-in defaults are listed below, commented out. Uncomment a value to
# pin it for this workspace; anything left commented falls through to the
# global config (dorgu config set ...) and then the built-in default.

";

/// Header, the schema version, then every built-in value as a comment so the
/// workspace layer starts out unset.
fn template(config: &EffectiveConfig) -> anyhow::Result<String> {
    let body = config.to_yaml().context("failed to render default config")?;
    let mut out = format!("{HEADER}version: \"{}\"\n\n", config.version);
    for line in body.lines().filter(|l| !l.starts_with("version:")) {
        out.push_str("# ");
        out.push_str(line);
        out.push('\n');
    }
    Ok(out)
}

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let path = paths::app_config_path(root);
    let content = template(&EffectiveConfig::builtin())?;
    let created = io::write_if_missing(&path, content.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    if json {
        return print_json(&serde_json::json!({
            "path": path.display().to_string(),
            "created": created,
        }));
    }
    if created {
        println!("  created: {}", paths::APP_CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::APP_CONFIG_FILE);
    }
    Ok(())
}
