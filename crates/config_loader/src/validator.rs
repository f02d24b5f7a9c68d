//! 配置校验模块
//!
//! 校验规则：
//! - 字段级约束 (validator derive: 采样率/声道数/端口数量; 位宽 16/24/32)
//! - port_id 唯一
//! - metadata_propagation 引用的 port_id 必须存在且不重复
//! - 白名单内 metadata id 不重复
//! - simulation 脚本引用的 port_id 必须存在，帧号在范围内

use std::collections::HashSet;

use contracts::{ContractError, SplitterBlueprint};
use validator::Validate;

/// 校验 SplitterBlueprint 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(blueprint: &SplitterBlueprint) -> Result<(), ContractError> {
    validate_fields(blueprint)?;
    validate_port_ids(blueprint)?;
    validate_metadata_propagation(blueprint)?;
    validate_simulation(blueprint)?;
    Ok(())
}

/// 字段级约束
fn validate_fields(blueprint: &SplitterBlueprint) -> Result<(), ContractError> {
    blueprint
        .validate()
        .map_err(|e| ContractError::config_validation("blueprint", e.to_string()))?;

    let bits = blueprint.media_format.bits_per_sample;
    if !matches!(bits, 16 | 24 | 32) {
        return Err(ContractError::config_validation(
            "media_format.bits_per_sample",
            format!("unsupported sample width {bits}, expected 16, 24 or 32"),
        ));
    }

    if let Some(sim) = &blueprint.simulation {
        sim.validate()
            .map_err(|e| ContractError::config_validation("simulation", e.to_string()))?;
    }
    Ok(())
}

/// 校验 port_id 唯一性
fn validate_port_ids(blueprint: &SplitterBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, port) in blueprint.ports.iter().enumerate() {
        if !seen.insert(port.port_id) {
            return Err(ContractError::config_validation(
                format!("ports[{idx}].port_id"),
                format!("duplicate port_id {}", port.port_id),
            ));
        }
        if port.capacity_bytes == Some(0) {
            return Err(ContractError::config_validation(
                format!("ports[{idx}].capacity_bytes"),
                "capacity_bytes must be > 0",
            ));
        }
    }
    Ok(())
}

/// 校验 metadata 白名单配置
fn validate_metadata_propagation(blueprint: &SplitterBlueprint) -> Result<(), ContractError> {
    let Some(propagation) = &blueprint.metadata_propagation else {
        return Ok(());
    };

    let known: HashSet<_> = blueprint.ports.iter().map(|p| p.port_id).collect();
    let mut seen = HashSet::new();

    for (idx, entry) in propagation.ports.iter().enumerate() {
        if !known.contains(&entry.port_id) {
            return Err(ContractError::config_validation(
                format!("metadata_propagation.ports[{idx}].port_id"),
                format!("port_id {} not found in ports", entry.port_id),
            ));
        }
        if !seen.insert(entry.port_id) {
            return Err(ContractError::config_validation(
                format!("metadata_propagation.ports[{idx}].port_id"),
                format!("duplicate port_id {}", entry.port_id),
            ));
        }

        let mut ids = HashSet::new();
        for id in &entry.allowed {
            if !ids.insert(*id) {
                return Err(ContractError::config_validation(
                    format!("metadata_propagation.ports[{idx}].allowed"),
                    format!("duplicate metadata id {id}"),
                ));
            }
        }
    }
    Ok(())
}

/// 校验仿真脚本
fn validate_simulation(blueprint: &SplitterBlueprint) -> Result<(), ContractError> {
    let Some(sim) = &blueprint.simulation else {
        return Ok(());
    };

    let known: HashSet<_> = blueprint.ports.iter().map(|p| p.port_id).collect();

    if let Some(port_id) = sim.in_place_port {
        if !known.contains(&port_id) {
            return Err(ContractError::config_validation(
                "simulation.in_place_port",
                format!("port_id {port_id} not found in ports"),
            ));
        }
    }

    for (idx, change) in sim.port_changes.iter().enumerate() {
        if !known.contains(&change.port_id) {
            return Err(ContractError::config_validation(
                format!("simulation.port_changes[{idx}].port_id"),
                format!("port_id {} not found in ports", change.port_id),
            ));
        }
        if change.frame >= sim.frames {
            return Err(ContractError::config_validation(
                format!("simulation.port_changes[{idx}].frame"),
                format!("frame {} is beyond the last frame {}", change.frame, sim.frames - 1),
            ));
        }
    }

    for (idx, scripted) in sim.metadata.iter().enumerate() {
        if scripted.frame() >= sim.frames {
            return Err(ContractError::config_validation(
                format!("simulation.metadata[{idx}].frame"),
                format!(
                    "frame {} is beyond the last frame {}",
                    scripted.frame(),
                    sim.frames - 1
                ),
            ));
        }
        scripted.to_event().map_err(|e| {
            ContractError::config_validation(format!("simulation.metadata[{idx}]"), e.to_string())
        })?;
    }
    Ok(())
}
