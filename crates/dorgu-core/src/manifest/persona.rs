//! Human-readable `PERSONA.md`.

use super::common;
use crate::analysis::AnalysisResult;
use crate::config::EffectiveConfig;
use crate::error::Result;

pub const PLACEHOLDER: &str = "[PLACEHOLDER]";

/// Enrichment seam for the free-text persona. Implementations may call out
/// to a language model; a failure falls back to [`generate`].
pub trait PersonaWriter {
    fn write_persona(&self, analysis: &AnalysisResult, config: &EffectiveConfig) -> Result<String>;
}

fn or_placeholder(value: &str) -> &str {
    if value.is_empty() {
        PLACEHOLDER
    } else {
        value
    }
}

fn ports_section(analysis: &AnalysisResult) -> String {
    if analysis.ports.is_empty() {
        return "No ports exposed.\n".to_string();
    }
    analysis
        .ports
        .iter()
        .map(|p| {
            format!(
                "- Port {} ({}): {}\n",
                p.port,
                p.protocol,
                or_placeholder(&p.purpose)
            )
        })
        .collect()
}

fn dependencies_section(analysis: &AnalysisResult) -> String {
    match analysis.overrides().map(|o| &o.dependencies) {
        Some(deps) if !deps.is_empty() => deps
            .iter()
            .map(|dep| {
                let kind = if dep.kind.is_empty() { "service" } else { dep.kind.as_str() };
                let required = if dep.required { " (required)" } else { "" };
                format!("- **{}** ({kind}){required}\n", dep.name)
            })
            .collect(),
        _ if analysis.dependencies.is_empty() => "No external dependencies detected.\n".to_string(),
        _ => analysis
            .dependencies
            .iter()
            .map(|dep| format!("- {dep}\n"))
            .collect(),
    }
}

fn scaling_line(analysis: &AnalysisResult) -> String {
    let Some(s) = common::scaling(analysis) else {
        return "No auto-scaling configured".to_string();
    };
    let mut line = format!("Min {} replicas, Max {} replicas", s.min_replicas, s.max_replicas);
    if s.target_cpu > 0 {
        line.push_str(&format!(", Target CPU {}%", s.target_cpu));
    }
    if s.target_memory > 0 {
        line.push_str(&format!(", Target Memory {}%", s.target_memory));
    }
    line
}

fn health_section(analysis: &AnalysisResult) -> String {
    let probes = common::probes(analysis);
    let mut out = String::new();
    if let Some(l) = &probes.liveness {
        out.push_str(&format!("- **Liveness:** {} (port {})\n", l.path, l.port));
    }
    if let Some(r) = &probes.readiness {
        out.push_str(&format!("- **Readiness:** {} (port {})\n", r.path, r.port));
    }
    if out.is_empty() {
        out.push_str("No health check configured.\n");
    }
    out
}

fn operations_section(analysis: &AnalysisResult) -> String {
    let mut out = String::new();
    if let Some(ops) = analysis.operations() {
        if !ops.runbook.is_empty() {
            out.push_str(&format!("- **Runbook:** {}\n", ops.runbook));
        }
        if !ops.on_call.is_empty() {
            out.push_str(&format!("- **On-Call:** {}\n", ops.on_call));
        }
        if !ops.maintenance_window.is_empty() {
            out.push_str(&format!("- **Maintenance Window:** {}\n", ops.maintenance_window));
        }
        if !ops.alerts.is_empty() {
            out.push_str("\n### Configured Alerts\n");
            for alert in &ops.alerts {
                out.push_str(&format!("- {alert}\n"));
            }
        }
    }
    if out.is_empty() {
        out.push_str("*Add operational notes here after deploying the application.*\n");
    }
    out
}

/// Deterministic persona built from the analysis and config alone.
pub fn generate(
    analysis: &AnalysisResult,
    _namespace: &str,
    config: &EffectiveConfig,
) -> Result<String> {
    common::require_name(analysis)?;

    let app_type = analysis.app_type();
    let description = match analysis.description() {
        "" => format!("A containerized {app_type} application"),
        d => d.to_string(),
    };
    let resources = common::resources(analysis, config);

    let mut doc = format!("# {}\n\n## Overview\n\n{description}\n\n", analysis.name);

    if let Some(instructions) = analysis
        .overrides()
        .map(|o| o.instructions.trim())
        .filter(|i| !i.is_empty())
    {
        doc.push_str(&format!("## Application Context\n\n{instructions}\n\n"));
    }

    doc.push_str(&format!(
        "## Technical Stack\n\n\
         - **Language:** {}\n\
         - **Framework:** {}\n\
         - **Type:** {app_type}\n\n",
        or_placeholder(&analysis.language),
        or_placeholder(&analysis.framework),
    ));

    doc.push_str(&format!("## API/Interfaces\n\n{}\n", ports_section(analysis)));
    doc.push_str(&format!(
        "## External Dependencies\n\n{}\n",
        dependencies_section(analysis)
    ));

    doc.push_str(&format!(
        "## Resource Profile\n\n\
         - **Profile:** {}\n\
         - **Requests:** cpu {}, memory {}\n\
         - **Limits:** cpu {}, memory {}\n\
         - **Scaling:** {}\n\n",
        analysis.resource_profile(),
        resources.requests.cpu,
        resources.requests.memory,
        resources.limits.cpu,
        resources.limits.memory,
        scaling_line(analysis),
    ));

    doc.push_str(&format!(
        "## Health & Monitoring\n\n{}\n",
        health_section(analysis)
    ));

    doc.push_str(&format!(
        "## Ownership\n\n\
         - **Team:** {}\n\
         - **Contact:** {}\n\
         - **Repository:** {}\n\n",
        or_placeholder(analysis.team()),
        or_placeholder(analysis.owner()),
        or_placeholder(analysis.repository()),
    ));

    doc.push_str(&format!(
        "## Operational Notes\n\n{}",
        operations_section(analysis)
    ));
    Ok(doc)
}

/// Writer output when one is supplied and succeeds with non-empty text,
/// otherwise the deterministic persona.
pub fn generate_with(
    analysis: &AnalysisResult,
    namespace: &str,
    config: &EffectiveConfig,
    writer: Option<&dyn PersonaWriter>,
) -> Result<String> {
    common::require_name(analysis)?;
    if let Some(writer) = writer {
        match writer.write_persona(analysis, config) {
            Ok(text) if !text.trim().is_empty() => return Ok(text),
            Ok(_) => tracing::debug!("persona writer returned empty text, using basic persona"),
            Err(e) => tracing::debug!(error = %e, "persona writer failed, using basic persona"),
        }
    }
    generate(analysis, namespace, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{AppOverrides, Dependency, Operations, Port};
    use crate::error::DorguError;

    struct Fixed(&'static str);

    impl PersonaWriter for Fixed {
        fn write_persona(&self, _: &AnalysisResult, _: &EffectiveConfig) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl PersonaWriter for Failing {
        fn write_persona(&self, _: &AnalysisResult, _: &EffectiveConfig) -> Result<String> {
            Err(DorguError::PersonaWriter("rate limited".to_string()))
        }
    }

    fn orders() -> AnalysisResult {
        let mut a = AnalysisResult::new("orders");
        a.ports = vec![Port::new(8080, "TCP", "HTTP API")];
        a
    }

    #[test]
    fn placeholders_for_missing_fields() {
        let md = generate(&orders(), "default", &EffectiveConfig::builtin()).unwrap();
        assert!(md.starts_with("# orders\n"));
        assert!(md.contains("A containerized api application"));
        assert!(md.contains("- **Language:** [PLACEHOLDER]"));
        assert!(md.contains("- **Team:** [PLACEHOLDER]"));
        assert!(md.contains("- **Repository:** [PLACEHOLDER]"));
        assert!(md.contains("- Port 8080 (TCP): HTTP API"));
        assert!(md.contains("No auto-scaling configured"));
        assert!(md.contains("No health check configured."));
        assert!(!md.contains("## Application Context"));
    }

    #[test]
    fn port_without_purpose_gets_placeholder() {
        let mut a = orders();
        a.ports.push(Port::new(9090, "TCP", ""));
        let md = generate(&a, "default", &EffectiveConfig::builtin()).unwrap();
        assert!(md.contains("- Port 9090 (TCP): [PLACEHOLDER]\n"));
        assert!(!md.contains(": \n"));
    }

    #[test]
    fn sections_keep_blank_line_spacing() {
        let md = generate(&orders(), "default", &EffectiveConfig::builtin()).unwrap();
        assert!(md.contains("## Technical Stack\n\n- **Language:** [PLACEHOLDER]\n"));
        assert!(md.contains("- **Type:** api\n\n## API/Interfaces\n\n- Port 8080"));
        assert!(md.ends_with("*Add operational notes here after deploying the application.*\n"));
    }

    #[test]
    fn overrides_surface_in_persona() {
        let mut a = orders();
        a.team = "detected".to_string();
        a.overrides = Some(AppOverrides {
            team: "payments".to_string(),
            instructions: "Handles order intake.".to_string(),
            dependencies: vec![Dependency {
                name: "postgres".to_string(),
                kind: "database".to_string(),
                required: true,
                ..Dependency::default()
            }],
            operations: Some(Operations {
                runbook: "https://runbooks.acme.io/orders".to_string(),
                alerts: vec!["HighLatency".to_string()],
                ..Operations::default()
            }),
            ..AppOverrides::default()
        });
        let md = generate(&a, "default", &EffectiveConfig::builtin()).unwrap();
        assert!(md.contains("- **Team:** payments"));
        assert!(md.contains("## Application Context\n\nHandles order intake."));
        assert!(md.contains("- **postgres** (database) (required)"));
        assert!(md.contains("### Configured Alerts\n- HighLatency"));
    }

    #[test]
    fn writer_output_used_when_present() {
        let cfg = EffectiveConfig::builtin();
        let md = generate_with(&orders(), "default", &cfg, Some(&Fixed("# enriched\n"))).unwrap();
        assert_eq!(md, "# enriched\n");
    }

    #[test]
    fn failing_or_empty_writer_falls_back() {
        let cfg = EffectiveConfig::builtin();
        let basic = generate(&orders(), "default", &cfg).unwrap();
        assert_eq!(
            generate_with(&orders(), "default", &cfg, Some(&Failing)).unwrap(),
            basic
        );
        assert_eq!(
            generate_with(&orders(), "default", &cfg, Some(&Fixed("  "))).unwrap(),
            basic
        );
    }
}
