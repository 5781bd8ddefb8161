// src/metrics.rs
//! Resource probes and the generation cost model.

use serde::{Deserialize, Serialize};
use std::process::Command;
use sysinfo::System;

/// Linear cost model: per narration second plus per scene image
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub per_second_rate: f64,
    pub per_image_rate: f64,
}

impl Default for CostModel {
    fn default() -> Self {
        Self {
            per_second_rate: 0.05,
            per_image_rate: 0.02,
        }
    }
}

impl CostModel {
    pub fn generation_cost(&self, duration_seconds: f64, num_scenes: usize) -> f64 {
        duration_seconds * self.per_second_rate + num_scenes as f64 * self.per_image_rate
    }
}

/// Percentage of physical memory in use
pub fn memory_usage_percent() -> f64 {
    let mut sys = System::new();
    sys.refresh_memory();
    let total = sys.total_memory();
    if total == 0 {
        return 0.0;
    }
    sys.used_memory() as f64 / total as f64 * 100.0
}

/// GPU utilization from `nvidia-smi`, or 0 when no GPU is visible
pub fn gpu_usage_percent() -> f64 {
    let output = Command::new("nvidia-smi")
        .args(["--query-gpu=utilization.gpu", "--format=csv,noheader,nounits"])
        .output();

    match output {
        Ok(out) if out.status.success() => {
            parse_gpu_utilization(&String::from_utf8_lossy(&out.stdout))
        }
        _ => 0.0,
    }
}

/// Mean utilization across the GPUs listed one per line
fn parse_gpu_utilization(stdout: &str) -> f64 {
    let values: Vec<f64> = stdout
        .lines()
        .filter_map(|line| line.trim().parse::<f64>().ok())
        .collect();
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Host-level snapshot served by the metrics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct SystemSnapshot {
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub memory_available_gb: f64,
    pub gpu_usage: f64,
}

pub fn system_snapshot() -> SystemSnapshot {
    let mut sys = System::new();
    sys.refresh_memory();
    sys.refresh_cpu();
    let total = sys.total_memory();

    SystemSnapshot {
        cpu_usage: sys.global_cpu_info().cpu_usage() as f64,
        memory_usage: if total == 0 {
            0.0
        } else {
            sys.used_memory() as f64 / total as f64 * 100.0
        },
        memory_available_gb: sys.available_memory() as f64 / (1024.0 * 1024.0 * 1024.0),
        gpu_usage: gpu_usage_percent(),
    }
}
