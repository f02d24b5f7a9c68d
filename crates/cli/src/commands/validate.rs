//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{MetadataId, PortState, SplitterBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    sample_rate: u32,
    channels: u16,
    port_count: usize,
    policy_installed: bool,
    scripted_frames: Option<u64>,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: Vec::new(),
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => ValidationResult {
            valid: true,
            config_path,
            error: None,
            warnings: collect_warnings(&blueprint),
            summary: Some(ConfigSummary {
                version: format!("{:?}", blueprint.version),
                sample_rate: blueprint.media_format.sample_rate,
                channels: blueprint.media_format.num_channels,
                port_count: blueprint.ports.len(),
                policy_installed: blueprint.metadata_propagation.is_some(),
                scripted_frames: blueprint.simulation.as_ref().map(|s| s.frames),
            }),
        },
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: Vec::new(),
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &SplitterBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    match &blueprint.metadata_propagation {
        None => warnings.push(
            "No metadata_propagation table - every non-EOS metadata event will be dropped"
                .to_string(),
        ),
        Some(policy) => {
            for port in &blueprint.ports {
                let entry = policy.ports.iter().find(|p| p.port_id == port.port_id);
                match entry {
                    None => warnings.push(format!(
                        "Port {} has no allow-list - it receives EOS only, marked internal",
                        port.port_id
                    )),
                    Some(entry) if !entry.allowed.contains(&MetadataId::EOS) => {
                        warnings.push(format!(
                            "Port {} does not allow EOS - EOS will arrive marked internal",
                            port.port_id
                        ))
                    }
                    Some(_) => {}
                }
            }
        }
    }

    for port in &blueprint.ports {
        if port.block_all_metadata {
            warnings.push(format!(
                "Port {} blocks all non-EOS metadata",
                port.port_id
            ));
        }
        if port.initial_state != PortState::Started {
            let scheduled = blueprint.simulation.as_ref().is_some_and(|s| {
                s.port_changes
                    .iter()
                    .any(|c| c.port_id == port.port_id && c.state == PortState::Started)
            });
            if !scheduled {
                warnings.push(format!("Port {} is never started", port.port_id));
            }
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!(
                "  Input: {} Hz, {} channels",
                summary.sample_rate, summary.channels
            );
            println!("  Ports: {}", summary.port_count);
            println!("  Policy table: {}", summary.policy_installed);
            if let Some(frames) = summary.scripted_frames {
                println!("  Scripted frames: {}", frames);
            }
        }

        if !result.warnings.is_empty() {
            println!("\n⚠ Warnings:");
            for warning in &result.warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
