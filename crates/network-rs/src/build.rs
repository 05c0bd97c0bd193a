//! Build pipeline and table writer

use crate::column::ColumnSpec;
use crate::connection::{derive_connection_rules, ConnectionRule};
use crate::depth::LayerBands;
use crate::import::{describe_imports, CellImport};
use crate::mechanism::{derive_mechanisms, SynapseMechanism};
use crate::population::{describe_populations, PopulationEntry, PopulationModel};
use crate::simconfig::{describe_sim_config, SimConfig};
use crate::stimulation::{describe_stimulation, StimulationPlan};
use crate::Result;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tcmodel_core::{Geometry, ModelConfig};
use tcmodel_synparams::ParameterTables;
use tracing::info;

/// Complete output of one build
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkTables {
    pub geometry: Geometry,
    pub populations: Vec<PopulationEntry>,
    pub mechanisms: Vec<SynapseMechanism>,
    pub rules: Vec<ConnectionRule>,
    pub imports: Vec<CellImport>,
    pub stimulation: StimulationPlan,
    pub sim_config: SimConfig,
}

#[derive(Serialize)]
struct PopulationFile<'a> {
    geometry: &'a Geometry,
    populations: &'a [PopulationEntry],
}

/// Run every derivation stage
///
/// The population model comes from [`PopulationModel::for_config`].
/// Nothing is returned unless every stage succeeds.
pub fn build_network(
    config: &ModelConfig,
    column: &ColumnSpec,
    tables: &ParameterTables,
) -> Result<NetworkTables> {
    let model = PopulationModel::for_config(config, column)?;

    let bands = LayerBands::from_boundaries(&config.layer_boundaries)?;
    let populations = describe_populations(&model, &bands, config.v_init)?;
    let mechanisms = derive_mechanisms(&model, tables, config.include_gap_junctions)?;
    let rules = derive_connection_rules(&model, tables, &mechanisms)?;
    let imports = describe_imports(&model, &config.cells_dir);
    let stimulation = describe_stimulation(&model, &populations);
    let sim_config = describe_sim_config(config, &model);

    info!(target: "tcmodel-network",
        "Built network: {} populations, {} mechanisms, {} rules{}",
        populations.len(), mechanisms.len(), rules.len(),
        if config.testing { " (testing scale)" } else { "" });

    Ok(NetworkTables {
        geometry: config.geometry.clone(),
        populations,
        mechanisms,
        rules,
        imports,
        stimulation,
        sim_config,
    })
}

impl NetworkTables {
    pub fn gap_mechanism_count(&self) -> usize {
        self.mechanisms.iter().filter(|m| m.kind.is_gap_junction()).count()
    }

    pub fn gap_rule_count(&self) -> usize {
        self.rules.iter().filter(|r| r.gap_junction).count()
    }

    /// Write the six tables as pretty JSON into `dir`, creating it if needed
    pub fn write_tables(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;

        let population_file = PopulationFile {
            geometry: &self.geometry,
            populations: &self.populations,
        };

        let files = [
            ("populations.json", serde_json::to_string_pretty(&population_file)?),
            ("synapse_mechanisms.json", serde_json::to_string_pretty(&self.mechanisms)?),
            ("connection_rules.json", serde_json::to_string_pretty(&self.rules)?),
            ("cell_imports.json", serde_json::to_string_pretty(&self.imports)?),
            ("stimulation.json", serde_json::to_string_pretty(&self.stimulation)?),
            ("sim_config.json", serde_json::to_string_pretty(&self.sim_config)?),
        ];

        let mut written = Vec::with_capacity(files.len());
        for (name, content) in files {
            let path = dir.join(name);
            fs::write(&path, content)?;
            written.push(path);
        }

        info!(target: "tcmodel-network", "Wrote {} tables to {}", written.len(), dir.display());
        Ok(written)
    }
}
