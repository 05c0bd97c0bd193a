//! Run configuration
//!
//! One loading stage produces a flat, immutable [`ModelConfig`]:
//! 1. TOML file (optional; missing fields take the model defaults)
//! 2. Environment variables (runtime overrides)
//! 3. Validation
//!
//! The result is passed explicitly to every derivation step.

use crate::{Depth, Result, TcError, Time, Voltage};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Domain geometry handed to the network builder (um)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub shape: String,
    pub size_x: f64,
    pub size_y: f64,
    pub size_z: f64,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            shape: "cylinder".to_string(),
            size_x: 100.0,
            size_y: 1500.0,
            size_z: 100.0,
        }
    }
}

/// Settings for the external simulation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    /// Equilibration + simulation (ms)
    pub duration: Time,
    /// Integration step (ms)
    pub dt: Time,
    pub verbose: bool,
    /// Downsampling of recorded traces (ms)
    pub record_step: Time,
    pub filename: String,
    pub print_pop_avg_rates: bool,
    /// Time window shown by the raster and trace directives (ms)
    pub trace_window: [Time; 2],
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            duration: (0.2 + 0.8) * 1e3,
            dt: 0.25,
            verbose: false,
            record_step: 1.0,
            filename: "TC_output".to_string(),
            print_pop_avg_rates: false,
            trace_window: [0.0, 1500.0],
        }
    }
}

/// Complete model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Development mode: shrink the column and write to scratch
    pub testing: bool,
    /// Factor applied to population sizes and connection counts in testing mode
    pub testing_scale: u32,
    pub include_gap_junctions: bool,
    pub log_level: String,
    pub geometry: Geometry,
    /// `[upper, lower]` depth bands: pia, L2/3, L4, L5, L6
    pub layer_boundaries: [[Depth; 2]; 5],
    /// Range for random initial membrane potentials
    pub v_init: [Voltage; 2],
    /// Directory holding the `<template>.hoc` cell files
    pub cells_dir: String,
    pub output_dir: PathBuf,
    pub simulation: SimulationSettings,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            testing: true,
            testing_scale: 10,
            include_gap_junctions: true,
            log_level: "info".to_string(),
            geometry: Geometry::default(),
            layer_boundaries: [
                [0.0, 81.6],
                [81.6, 587.1],
                [587.1, 922.2],
                [922.2, 1170.0],
                [1170.0, 1491.7],
            ],
            v_init: [-70.0, 20.0],
            cells_dir: "cells/generatedNEURON".to_string(),
            output_dir: PathBuf::from("output"),
            simulation: SimulationSettings::default(),
        }
    }
}

/// Where the external runtime writes its results
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputPaths {
    pub output: PathBuf,
    pub figures: PathBuf,
    pub data: PathBuf,
}

impl ModelConfig {
    /// Testing runs overwrite a single scratch directory
    pub fn output_paths(&self) -> OutputPaths {
        if self.testing {
            let scratch = PathBuf::from("scratch");
            OutputPaths {
                output: scratch.clone(),
                figures: scratch.clone(),
                data: scratch,
            }
        } else {
            OutputPaths {
                output: self.output_dir.clone(),
                figures: self.output_dir.join("figs"),
                data: self.output_dir.join("dat"),
            }
        }
    }

    pub fn save_pickle(&self) -> bool {
        !self.testing
    }

    /// Parse a TOML document; absent fields keep their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Load configuration
///
/// With `config_path == None` the built-in defaults are used. Environment
/// overrides are applied and the result is validated before it is returned.
///
/// # Errors
///
/// Returns an error if the file cannot be read, is not valid TOML, or fails
/// validation.
pub fn load_config(config_path: Option<&Path>) -> Result<ModelConfig> {
    let mut config = match config_path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            info!(target: "tcmodel-core", "Loading configuration from {}", path.display());
            ModelConfig::from_toml_str(&content)?
        }
        None => ModelConfig::default(),
    };

    apply_environment_overrides(&mut config);
    validate_config(&config)?;

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `TCMODEL_TESTING` -> `testing`
/// - `TCMODEL_INCLUDE_GJ` -> `include_gap_junctions`
/// - `TCMODEL_OUTPUT_DIR` -> `output_dir`
/// - `TCMODEL_LOG_LEVEL` -> `log_level`
/// - `TCMODEL_DURATION` -> `simulation.duration`
/// - `TCMODEL_DT` -> `simulation.dt`
pub fn apply_environment_overrides(config: &mut ModelConfig) {
    apply_overrides_from(config, |key| env::var(key).ok());
}

pub(crate) fn apply_overrides_from<F>(config: &mut ModelConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("TCMODEL_TESTING") {
        match parse_flag(&value) {
            Some(flag) => config.testing = flag,
            None => warn!(target: "tcmodel-core", "Ignoring TCMODEL_TESTING={}", value),
        }
    }
    if let Some(value) = lookup("TCMODEL_INCLUDE_GJ") {
        match parse_flag(&value) {
            Some(flag) => config.include_gap_junctions = flag,
            None => warn!(target: "tcmodel-core", "Ignoring TCMODEL_INCLUDE_GJ={}", value),
        }
    }
    if let Some(value) = lookup("TCMODEL_OUTPUT_DIR") {
        config.output_dir = PathBuf::from(value);
    }
    if let Some(value) = lookup("TCMODEL_LOG_LEVEL") {
        config.log_level = value;
    }
    if let Some(value) = lookup("TCMODEL_DURATION") {
        match value.parse::<Time>() {
            Ok(duration) => config.simulation.duration = duration,
            Err(_) => warn!(target: "tcmodel-core", "Ignoring TCMODEL_DURATION={}", value),
        }
    }
    if let Some(value) = lookup("TCMODEL_DT") {
        match value.parse::<Time>() {
            Ok(dt) => config.simulation.dt = dt,
            Err(_) => warn!(target: "tcmodel-core", "Ignoring TCMODEL_DT={}", value),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Validate the complete configuration
///
/// # Errors
///
/// Returns `TcError::InvalidConfig` listing every problem found.
pub fn validate_config(config: &ModelConfig) -> Result<()> {
    let mut errors = Vec::new();

    if !(config.simulation.dt > 0.0) {
        errors.push(format!("simulation.dt must be positive (got {})", config.simulation.dt));
    }
    if !(config.simulation.duration > 0.0) {
        errors.push(format!(
            "simulation.duration must be positive (got {})",
            config.simulation.duration
        ));
    }
    if config.testing_scale == 0 {
        errors.push("testing_scale must be at least 1".to_string());
    }
    if !(config.v_init[0] < config.v_init[1]) {
        errors.push(format!("v_init range is empty: {:?}", config.v_init));
    }
    for (i, band) in config.layer_boundaries.iter().enumerate() {
        if !(band[0] < band[1]) {
            errors.push(format!("layer_boundaries[{}] = {:?} is not upper < lower", i, band));
        }
    }

    if errors.is_empty() {
        return Ok(());
    }

    let messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");
    Err(TcError::InvalidConfig(format!(
        "Configuration validation failed:\n{}",
        messages
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults_validate() {
        let config = ModelConfig::default();
        assert!(validate_config(&config).is_ok());
        assert_eq!(config.simulation.duration, 1000.0);
        assert!(!config.save_pickle());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ModelConfig::from_toml_str(
            r#"
            testing = false

            [simulation]
            dt = 0.1
            "#,
        )
        .unwrap();
        assert!(!config.testing);
        assert_eq!(config.simulation.dt, 0.1);
        assert_eq!(config.simulation.filename, "TC_output");
        assert_eq!(config.layer_boundaries[4], [1170.0, 1491.7]);
    }

    #[test]
    fn test_output_paths() {
        let mut config = ModelConfig::default();
        assert_eq!(config.output_paths().data, PathBuf::from("scratch"));

        config.testing = false;
        let paths = config.output_paths();
        assert_eq!(paths.figures, PathBuf::from("output/figs"));
        assert_eq!(paths.data, PathBuf::from("output/dat"));
        assert!(config.save_pickle());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("TCMODEL_TESTING", "no"),
            ("TCMODEL_DT", "0.5"),
            ("TCMODEL_DURATION", "soon"),
        ]
        .into_iter()
        .collect();

        let mut config = ModelConfig::default();
        apply_overrides_from(&mut config, |key| vars.get(key).map(|v| v.to_string()));

        assert!(!config.testing);
        assert_eq!(config.simulation.dt, 0.5);
        assert_eq!(config.simulation.duration, 1000.0);
    }

    #[test]
    fn test_inverted_band_rejected() {
        let mut config = ModelConfig::default();
        config.layer_boundaries[2] = [922.2, 587.1];
        config.simulation.dt = 0.0;

        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("layer_boundaries[2]"));
        assert!(err.contains("simulation.dt"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "include_gap_junctions = false\ncells_dir = \"cells\"").unwrap();

        let config = load_config(Some(file.path())).unwrap();
        assert!(!config.include_gap_junctions);
        assert_eq!(config.cells_dir, "cells");
    }
}
