//! Population model
//!
//! Flattens a [`ColumnSpec`] into one list of population records and one
//! `n x n` count matrix. Every attribute of a population travels in its
//! record, so the list and the matrix are the only two things that must
//! agree on order, and [`PopulationModel::new`] checks that they do.

use crate::column::{ColumnSpec, Stratum};
use crate::depth::{DepthRange, LayerBands};
use crate::{NetworkError, Result};
use ndarray::Array2;
use serde::Serialize;
use std::collections::HashSet;
use tcmodel_core::{ElectroSubtype, ModelConfig, PrincipalClass, Voltage};
use tracing::info;

/// One flattened population
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Population {
    pub id: String,
    pub stratum: Stratum,
    pub layer: String,
    pub class: PrincipalClass,
    pub subtype: ElectroSubtype,
    pub size: u32,
    pub template: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopulationModel {
    populations: Vec<Population>,
    counts: Array2<u32>,
}

impl PopulationModel {
    pub fn new(column: &ColumnSpec) -> Result<Self> {
        column.check_shape()?;

        let mut seen = HashSet::new();
        let mut populations = Vec::with_capacity(column.population_count());
        for (stratum, spec) in column.flattened() {
            let id = spec.id();
            if !seen.insert(id.clone()) {
                return Err(NetworkError::DuplicatePopulation(id));
            }
            populations.push(Population {
                id,
                stratum,
                layer: spec.layer.clone(),
                class: spec.class,
                subtype: spec.subtype,
                size: spec.size,
                template: spec.template.clone(),
            });
        }

        let n = populations.len();
        let counts = Array2::from_shape_fn((n, n), |(i, j)| column.connection_counts[i][j]);

        info!(target: "tcmodel-network", "Population model: {} populations, {} cells",
            n, populations.iter().map(|p| u64::from(p.size)).sum::<u64>());

        Ok(Self { populations, counts })
    }

    /// Model at the size the configuration asks for
    ///
    /// In testing mode the column is scaled down by `config.testing_scale` first.
    pub fn for_config(config: &ModelConfig, column: &ColumnSpec) -> Result<Self> {
        if config.testing {
            Self::new(&column.scaled(config.testing_scale))
        } else {
            Self::new(column)
        }
    }

    pub fn populations(&self) -> &[Population] {
        &self.populations
    }

    pub fn len(&self) -> usize {
        self.populations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.populations.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Population> {
        self.populations.iter().find(|p| p.id == id)
    }

    /// Expected inputs from one `pre` population onto a single `post` cell
    pub fn connection_count(&self, pre: usize, post: usize) -> u32 {
        self.counts[[pre, post]]
    }

    /// `count(pre, post) / size(pre)`; zero when the presynaptic population is empty
    pub fn connection_probability(&self, pre: usize, post: usize) -> f64 {
        match self.populations[pre].size {
            0 => 0.0,
            size => f64::from(self.counts[[pre, post]]) / f64::from(size),
        }
    }

    pub fn connection_probabilities(&self) -> Array2<f64> {
        let n = self.len();
        Array2::from_shape_fn((n, n), |(pre, post)| self.connection_probability(pre, post))
    }
}

/// Population table entry handed to the network builder
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationEntry {
    pub id: String,
    pub layer: String,
    pub cell_type: PrincipalClass,
    pub subtype: ElectroSubtype,
    pub num_cells: u32,
    pub y_range: DepthRange,
    pub v_init: [Voltage; 2],
    pub cell_model: String,
    pub template: String,
}

pub fn describe_populations(
    model: &PopulationModel,
    bands: &LayerBands,
    v_init: [Voltage; 2],
) -> Result<Vec<PopulationEntry>> {
    model
        .populations()
        .iter()
        .map(|p| {
            Ok(PopulationEntry {
                id: p.id.clone(),
                layer: p.layer.clone(),
                cell_type: p.class,
                subtype: p.subtype,
                num_cells: p.size,
                y_range: bands.depth_for(&p.layer)?,
                v_init,
                cell_model: format!("{}_mod", p.template),
                template: p.template.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{PopulationSpec, StratumSpec};

    fn two_population_column(pre_size: u32) -> ColumnSpec {
        ColumnSpec {
            strata: vec![StratumSpec {
                stratum: Stratum::Superficial,
                populations: vec![
                    PopulationSpec::new("L23", ElectroSubtype::RegularSpiking, PrincipalClass::Pyramidal, pre_size, "T1"),
                    PopulationSpec::new("L23", ElectroSubtype::FastSpiking, PrincipalClass::Basket, 90, "T2"),
                ],
            }],
            connection_counts: vec![vec![5, 20], vec![10, 0]],
        }
    }

    #[test]
    fn test_probabilities() {
        let model = PopulationModel::new(&two_population_column(100)).unwrap();
        assert_eq!(model.connection_probability(0, 1), 0.2);
        assert_eq!(model.connection_probability(1, 0), 10.0 / 90.0);

        let p = model.connection_probabilities();
        assert_eq!(p.dim(), (2, 2));
        assert_eq!(p[[0, 0]], 0.05);
        assert_eq!(p[[1, 1]], 0.0);
    }

    #[test]
    fn test_empty_presynaptic_population() {
        let model = PopulationModel::new(&two_population_column(0)).unwrap();
        assert_eq!(model.connection_probability(0, 1), 0.0);
        assert_eq!(model.connection_probabilities().row(0).sum(), 0.0);
    }

    #[test]
    fn test_for_config_scales_in_testing_mode() {
        let column = ColumnSpec::traub2005();

        let testing = PopulationModel::for_config(&ModelConfig::default(), &column).unwrap();
        assert_eq!(testing.populations()[0].size, 100);
        assert_eq!(testing.connection_count(0, 5), 1);

        let full_config = ModelConfig {
            testing: false,
            ..ModelConfig::default()
        };
        let full = PopulationModel::for_config(&full_config, &column).unwrap();
        assert_eq!(full, PopulationModel::new(&column).unwrap());
        assert_eq!(full.populations()[0].size, 1000);
    }

    #[test]
    fn test_duplicate_population() {
        let mut column = two_population_column(10);
        column.strata[0].populations[1] = column.strata[0].populations[0].clone();
        let err = PopulationModel::new(&column).unwrap_err();
        assert!(matches!(err, NetworkError::DuplicatePopulation(ref id) if id == "L23_RS_PYR"));
    }

    #[test]
    fn test_matrix_must_match_population_list() {
        let mut column = two_population_column(10);
        column.connection_counts.push(vec![0, 0]);
        assert!(matches!(PopulationModel::new(&column), Err(NetworkError::MatrixShape { .. })));
    }

    #[test]
    fn test_population_entries() {
        let model = PopulationModel::new(&ColumnSpec::traub2005()).unwrap();
        let config = ModelConfig::default();
        let bands = LayerBands::from_boundaries(&config.layer_boundaries).unwrap();

        let entries = describe_populations(&model, &bands, config.v_init).unwrap();
        assert_eq!(entries.len(), 12);
        assert_eq!(entries[0].cell_model, "L23PyrRS_mod");
        assert_eq!(entries[8].id, "L56_FS_BASK");
        assert_eq!(entries[8].y_range, [922.2, 1491.7]);

        let json = serde_json::to_value(&entries[3]).unwrap();
        assert_eq!(json["cellType"], "AXO");
        assert_eq!(json["numCells"], 90);
    }
}
