//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{ScriptedMetadata, SplitterBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    media_format: MediaFormatInfo,
    ports: Vec<PortInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    script: Option<ScriptInfo>,
}

#[derive(Serialize)]
struct MediaFormatInfo {
    sample_rate: u32,
    bits_per_sample: u16,
    num_channels: u16,
    layout: String,
}

#[derive(Serialize)]
struct PortInfo {
    port_id: u32,
    initial_state: String,
    ts_propagation: String,
    block_all_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    capacity_bytes: Option<usize>,
    /// None when no policy table is configured
    #[serde(skip_serializing_if = "Option::is_none")]
    allowed_metadata: Option<Vec<String>>,
}

#[derive(Serialize)]
struct ScriptInfo {
    frames: u64,
    frame_duration_ms: u32,
    latched_clock_offset_us: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    in_place_port: Option<u32>,
    metadata: Vec<String>,
    port_changes: Vec<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;
    let info = build_config_info(&blueprint, args.script);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &SplitterBlueprint, with_script: bool) -> ConfigInfo {
    let format = &blueprint.media_format;

    let ports = blueprint
        .ports
        .iter()
        .map(|port| PortInfo {
            port_id: port.port_id.0,
            initial_state: format!("{:?}", port.initial_state),
            ts_propagation: format!("{:?}", port.ts_propagation),
            block_all_metadata: port.block_all_metadata,
            capacity_bytes: port.capacity_bytes,
            allowed_metadata: blueprint.metadata_propagation.as_ref().map(|policy| {
                policy
                    .ports
                    .iter()
                    .filter(|entry| entry.port_id == port.port_id)
                    .flat_map(|entry| entry.allowed.iter().map(ToString::to_string))
                    .collect()
            }),
        })
        .collect();

    let script = blueprint
        .simulation
        .as_ref()
        .filter(|_| with_script)
        .map(|sim| ScriptInfo {
            frames: sim.frames,
            frame_duration_ms: sim.frame_duration_ms,
            latched_clock_offset_us: sim.latched_clock_offset_us,
            in_place_port: sim.in_place_port.map(|p| p.0),
            metadata: sim.metadata.iter().map(describe_metadata).collect(),
            port_changes: sim
                .port_changes
                .iter()
                .map(|c| format!("frame {}: port {} -> {:?}", c.frame, c.port_id, c.state))
                .collect(),
        });

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        media_format: MediaFormatInfo {
            sample_rate: format.sample_rate,
            bits_per_sample: format.bits_per_sample,
            num_channels: format.num_channels,
            layout: format!("{:?}", format.layout),
        },
        ports,
        script,
    }
}

fn describe_metadata(scripted: &ScriptedMetadata) -> String {
    match scripted {
        ScriptedMetadata::Eos {
            frame,
            flushing,
            internal,
            ..
        } => format!(
            "frame {frame}: EOS (flushing={flushing}, internal={internal})"
        ),
        ScriptedMetadata::Custom {
            frame, id, payload, ..
        } => format!("frame {frame}: {id} ({} bytes)", payload.len()),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("\n=== Splitter Configuration ===\n");
    println!("Version: {}", info.version);

    let format = &info.media_format;
    println!(
        "\nInput: {} Hz, {} bit, {} channels ({})",
        format.sample_rate, format.bits_per_sample, format.num_channels, format.layout
    );

    println!("\nPorts ({}):", info.ports.len());
    for port in &info.ports {
        println!(
            "  - port {} [{}] ts={}{}",
            port.port_id,
            port.initial_state,
            port.ts_propagation,
            if port.block_all_metadata {
                ", metadata blocked"
            } else {
                ""
            }
        );
        if let Some(capacity) = port.capacity_bytes {
            println!("      capacity: {} bytes", capacity);
        }
        match &port.allowed_metadata {
            Some(allowed) if !allowed.is_empty() => {
                println!("      allowed: {}", allowed.join(", "))
            }
            Some(_) => println!("      allowed: (none)"),
            None => {}
        }
    }

    if let Some(ref script) = info.script {
        println!("\nScript:");
        println!(
            "  {} frames x {} ms, latched clock offset {} us",
            script.frames, script.frame_duration_ms, script.latched_clock_offset_us
        );
        if let Some(port) = script.in_place_port {
            println!("  In-place port: {}", port);
        }
        for line in script.metadata.iter().chain(&script.port_changes) {
            println!("  - {}", line);
        }
    }

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    const CONFIG: &str = r#"
[media_format]
sample_rate = 48000
bits_per_sample = 24
num_channels = 2

[[ports]]
port_id = 1

[[ports]]
port_id = 2

[[metadata_propagation.ports]]
port_id = 1
allowed = [0x0A001000]

[simulation]
frames = 3

[[simulation.metadata]]
kind = "custom"
frame = 1
id = 0x20
payload = [9, 9]
"#;

    #[test]
    fn test_build_config_info() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let info = build_config_info(&blueprint, true);

        assert_eq!(info.ports.len(), 2);
        assert_eq!(
            info.ports[0].allowed_metadata,
            Some(vec!["0x0A001000".to_string()])
        );
        assert_eq!(info.ports[1].allowed_metadata, Some(vec![]));

        let script = info.script.unwrap();
        assert_eq!(script.metadata, vec!["frame 1: 0x00000020 (2 bytes)"]);
    }

    #[test]
    fn test_script_hidden_by_default() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        assert!(build_config_info(&blueprint, false).script.is_none());
    }
}
