use super::app::AppArgs;
use crate::output::print_json;
use anyhow::Context;
use clap::{Args, Subcommand};
use dorgu_core::io;
use dorgu_core::manifest::{common, persona_spec, DocumentKind, GeneratedDocument};
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum PersonaSubcommand {
    /// Write only the ApplicationPersona (persona.yaml) for an application
    Generate(PersonaGenerateArgs),
}

#[derive(Args)]
pub struct PersonaGenerateArgs {
    #[command(flatten)]
    pub app: AppArgs,

    /// Output directory (default: <app-dir>/k8s)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print the persona instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}

pub fn run(root: &Path, subcmd: PersonaSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PersonaSubcommand::Generate(args) => generate(root, args, json),
    }
}

fn generate(root: &Path, args: PersonaGenerateArgs, json: bool) -> anyhow::Result<()> {
    let (analysis, config) = args.app.load(root)?;
    let namespace =
        common::namespace_or_default(args.app.namespace.as_deref().unwrap_or_default(), &config);
    let content = persona_spec::generate(&analysis, namespace, &config)
        .with_context(|| format!("failed to generate persona for '{}'", analysis.name))?;
    let document = GeneratedDocument::new(DocumentKind::PersonaSpec, content);

    let output_dir = args.app.output_dir(args.output.as_deref());
    let path = io::resolve_relative(&output_dir, &document.path);
    if !args.dry_run {
        io::write_documents(&output_dir, std::slice::from_ref(&document))
            .with_context(|| format!("failed to write {}", output_dir.display()))?;
    }

    if json {
        return print_json(&serde_json::json!({
            "app": analysis.name,
            "path": path.display().to_string(),
            "dry_run": args.dry_run,
            "content": document.content,
        }));
    }
    if args.dry_run {
        print!("{}", document.content);
    } else {
        println!("Generated persona: {}", path.display());
    }
    Ok(())
}
