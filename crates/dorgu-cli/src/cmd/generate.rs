use super::app::AppArgs;
use crate::output::{format_documents, format_validation, print_json};
use anyhow::Context;
use clap::Args;
use dorgu_core::io;
use dorgu_core::manifest::{generate_all, GenerateOptions, GeneratedDocument};
use dorgu_core::validate::{validate, ValidationResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Args)]
pub struct GenerateArgs {
    #[command(flatten)]
    pub app: AppArgs,

    /// Output directory (default: <app-dir>/k8s)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Print documents instead of writing them
    #[arg(long)]
    pub dry_run: bool,

    /// Skip the ArgoCD application
    #[arg(long)]
    pub skip_argocd: bool,

    /// Skip the CI workflow
    #[arg(long)]
    pub skip_ci: bool,

    /// Skip PERSONA.md and persona.yaml
    #[arg(long)]
    pub skip_persona: bool,

    /// Skip post-generation validation
    #[arg(long)]
    pub skip_validation: bool,
}

#[derive(Serialize)]
struct GenerateReport<'a> {
    app: &'a str,
    output_dir: String,
    dry_run: bool,
    files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    documents: Option<&'a [GeneratedDocument]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation: Option<&'a ValidationResult>,
}

pub fn run(root: &Path, args: GenerateArgs, json: bool) -> anyhow::Result<()> {
    let (analysis, config) = args.app.load(root)?;

    let options = GenerateOptions {
        namespace: args.app.namespace.as_deref().unwrap_or_default(),
        skip_gitops: args.skip_argocd,
        skip_ci: args.skip_ci,
        skip_persona: args.skip_persona,
        persona_writer: None,
    };
    let documents = generate_all(&analysis, &config, &options)
        .with_context(|| format!("failed to generate manifests for '{}'", analysis.name))?;

    let output_dir = args.app.output_dir(args.output.as_deref());

    let files: Vec<PathBuf> = if args.dry_run {
        documents
            .iter()
            .map(|d| io::resolve_relative(&output_dir, &d.path))
            .collect()
    } else {
        io::write_documents(&output_dir, &documents)
            .with_context(|| format!("failed to write {}", output_dir.display()))?
    };

    let validation = (!args.skip_validation).then(|| validate(&analysis, &documents, &config));

    if json {
        return print_json(&GenerateReport {
            app: &analysis.name,
            output_dir: output_dir.display().to_string(),
            dry_run: args.dry_run,
            files: files.iter().map(|p| p.display().to_string()).collect(),
            documents: args.dry_run.then_some(documents.as_slice()),
            validation: validation.as_ref(),
        });
    }

    if args.dry_run {
        print!("{}", format_documents(&documents));
    } else {
        println!(
            "Generated {} file(s) for '{}':",
            files.len(),
            analysis.name
        );
        for path in &files {
            println!("  wrote: {}", path.display());
        }
    }

    if let Some(validation) = &validation {
        println!("\nValidation:");
        print!("{}", format_validation(validation));
    }
    Ok(())
}
