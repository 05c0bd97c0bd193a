//! Column definition: populations grouped into strata, plus the count matrix

use crate::{NetworkError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tcmodel_core::{ElectroSubtype, PrincipalClass};
use tracing::{debug, info};

/// Laminar group of populations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stratum {
    Superficial,
    Granular,
    Infragranular,
    Deep,
}

/// One population before flattening
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PopulationSpec {
    /// Layer label, e.g. `L23` or `L56`
    pub layer: String,
    pub class: PrincipalClass,
    pub subtype: ElectroSubtype,
    pub size: u32,
    /// External morphology/biophysics template
    pub template: String,
}

impl PopulationSpec {
    pub fn new(
        layer: &str,
        subtype: ElectroSubtype,
        class: PrincipalClass,
        size: u32,
        template: &str,
    ) -> Self {
        Self {
            layer: layer.to_string(),
            class,
            subtype,
            size,
            template: template.to_string(),
        }
    }

    /// `{layer}_{subtype}_{class}`
    pub fn id(&self) -> String {
        format!("{}_{}_{}", self.layer, self.subtype, self.class)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StratumSpec {
    pub stratum: Stratum,
    pub populations: Vec<PopulationSpec>,
}

/// Column as configured
///
/// Rows and columns of `connection_counts` follow the stratum-major
/// flattening of `strata`. Entry `[pre][post]` is the expected number of
/// presynaptic inputs converging on one postsynaptic cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSpec {
    pub strata: Vec<StratumSpec>,
    pub connection_counts: Vec<Vec<u32>>,
}

// ============================================================================
// Column file layout
// ============================================================================

/// Class and subtype stay raw labels until [`ColumnSpec::from_json_str`]
/// classifies them, so an unknown label surfaces as a [`tcmodel_core::TcError`]
#[derive(Debug, Deserialize)]
struct PopulationRow {
    layer: String,
    class: String,
    subtype: String,
    size: u32,
    template: String,
}

#[derive(Debug, Deserialize)]
struct StratumRow {
    stratum: Stratum,
    populations: Vec<PopulationRow>,
}

#[derive(Debug, Deserialize)]
struct ColumnFile {
    strata: Vec<StratumRow>,
    connection_counts: Vec<Vec<u32>>,
}

impl PopulationRow {
    fn classify(self) -> Result<PopulationSpec> {
        Ok(PopulationSpec {
            class: self.class.parse()?,
            subtype: self.subtype.parse()?,
            layer: self.layer,
            size: self.size,
            template: self.template,
        })
    }
}

impl ColumnSpec {
    /// Twelve-population neocortical column of Traub et al. (2005)
    pub fn traub2005() -> Self {
        use ElectroSubtype::*;
        use PrincipalClass::*;

        let strata = vec![
            StratumSpec {
                stratum: Stratum::Superficial,
                populations: vec![
                    PopulationSpec::new("L23", RegularSpiking, Pyramidal, 1000, "L23PyrRS"),
                    PopulationSpec::new("L23", FastRhythmicBursting, Pyramidal, 50, "L23PyrFRB_varInit"),
                    PopulationSpec::new("L23", FastSpiking, Basket, 90, "SupBasket"),
                    PopulationSpec::new("L23", FastSpiking, AxoAxonic, 90, "SupAxAx"),
                    PopulationSpec::new("L23", LowThresholdSpiking, Interneuron, 90, "SupLTSInter"),
                ],
            },
            StratumSpec {
                stratum: Stratum::Granular,
                populations: vec![PopulationSpec::new("L4", RegularSpiking, Stellate, 240, "L4SpinyStellate")],
            },
            StratumSpec {
                stratum: Stratum::Infragranular,
                populations: vec![
                    PopulationSpec::new("L5", IntrinsicBursting, Pyramidal, 800, "L5TuftedPyrIB"),
                    PopulationSpec::new("L5", RegularSpiking, Pyramidal, 200, "L5TuftedPyrRS"),
                ],
            },
            StratumSpec {
                stratum: Stratum::Deep,
                populations: vec![
                    PopulationSpec::new("L56", FastSpiking, Basket, 100, "DeepBasket"),
                    PopulationSpec::new("L56", FastSpiking, AxoAxonic, 100, "DeepAxAx"),
                    PopulationSpec::new("L56", LowThresholdSpiking, Interneuron, 100, "DeepLTSInter"),
                    PopulationSpec::new("L6", RegularSpiking, Pyramidal, 500, "L6NonTuftedPyrRS"),
                ],
            },
        ];

        let connection_counts = vec![
            vec![50, 50, 90, 90, 90, 3, 60, 60, 30, 30, 30, 3],
            vec![5, 5, 5, 5, 5, 1, 3, 3, 3, 3, 3, 1],
            vec![20, 20, 20, 20, 20, 20, 0, 0, 0, 0, 0, 0],
            vec![20, 20, 0, 0, 0, 5, 5, 5, 0, 0, 0, 5],
            vec![20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20],
            vec![20, 20, 20, 20, 20, 30, 20, 20, 20, 20, 20, 20],
            vec![2, 2, 20, 20, 20, 30, 50, 20, 20, 20, 20, 20],
            vec![2, 2, 20, 20, 20, 30, 20, 10, 20, 20, 20, 20],
            vec![0, 0, 0, 0, 0, 20, 20, 20, 20, 20, 20, 20],
            vec![5, 5, 0, 0, 0, 5, 5, 5, 0, 0, 0, 5],
            vec![10, 10, 10, 10, 10, 20, 20, 20, 20, 20, 20, 20],
            vec![10, 10, 10, 10, 10, 10, 10, 10, 10, 10, 1, 20],
        ];

        Self { strata, connection_counts }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: ColumnFile = serde_json::from_str(content)?;
        let strata = file
            .strata
            .into_iter()
            .map(|s| -> Result<StratumSpec> {
                Ok(StratumSpec {
                    stratum: s.stratum,
                    populations: s
                        .populations
                        .into_iter()
                        .map(PopulationRow::classify)
                        .collect::<Result<_>>()?,
                })
            })
            .collect::<Result<_>>()?;

        Ok(Self {
            strata,
            connection_counts: file.connection_counts,
        })
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        info!(target: "tcmodel-network", "Loading column from {}", path.display());
        Self::from_json_str(&content)
    }

    pub fn population_count(&self) -> usize {
        self.strata.iter().map(|s| s.populations.len()).sum()
    }

    /// Populations in flattening order, each with its stratum
    pub fn flattened(&self) -> impl Iterator<Item = (Stratum, &PopulationSpec)> {
        self.strata
            .iter()
            .flat_map(|s| s.populations.iter().map(move |p| (s.stratum, p)))
    }

    /// Check the count matrix against the population list
    pub fn check_shape(&self) -> Result<()> {
        let expected = self.population_count();
        let rows = self.connection_counts.len();
        if rows != expected {
            return Err(NetworkError::MatrixShape {
                expected,
                rows,
                cols: self.connection_counts.first().map_or(0, Vec::len),
            });
        }
        if let Some(row) = self.connection_counts.iter().find(|row| row.len() != expected) {
            return Err(NetworkError::MatrixShape {
                expected,
                rows,
                cols: row.len(),
            });
        }
        Ok(())
    }

    /// Testing-mode copy: every size and count passed through [`scale_count`]
    pub fn scaled(&self, factor: u32) -> Self {
        debug!(target: "tcmodel-network", "Scaling column down by {}", factor);

        let strata = self
            .strata
            .iter()
            .map(|s| StratumSpec {
                stratum: s.stratum,
                populations: s
                    .populations
                    .iter()
                    .map(|p| PopulationSpec {
                        size: scale_count(p.size, factor),
                        ..p.clone()
                    })
                    .collect(),
            })
            .collect();

        let connection_counts = self
            .connection_counts
            .iter()
            .map(|row| row.iter().map(|&c| scale_count(c, factor)).collect())
            .collect();

        Self { strata, connection_counts }
    }
}

/// Divide by `factor`, truncating, except that a nonzero value never drops to zero
pub fn scale_count(value: u32, factor: u32) -> u32 {
    if value == 0 || factor <= 1 {
        value
    } else if value < factor {
        1
    } else {
        value / factor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tcmodel_core::TcError;

    #[test]
    fn test_default_column_shape() {
        let column = ColumnSpec::traub2005();
        assert_eq!(column.population_count(), 12);
        assert!(column.check_shape().is_ok());

        let ids: Vec<String> = column.flattened().map(|(_, p)| p.id()).collect();
        assert_eq!(ids[0], "L23_RS_PYR");
        assert_eq!(ids[5], "L4_RS_STEL");
        assert_eq!(ids[11], "L6_RS_PYR");
    }

    #[test]
    fn test_scale_count() {
        assert_eq!(scale_count(0, 10), 0);
        assert_eq!(scale_count(5, 10), 1);
        assert_eq!(scale_count(1, 10), 1);
        assert_eq!(scale_count(10, 10), 1);
        assert_eq!(scale_count(19, 10), 1);
        assert_eq!(scale_count(1000, 10), 100);
        assert_eq!(scale_count(7, 1), 7);
    }

    #[test]
    fn test_scaled_column() {
        let scaled = ColumnSpec::traub2005().scaled(10);
        assert_eq!(scaled.strata[0].populations[0].size, 100);
        assert_eq!(scaled.strata[0].populations[1].size, 5);
        // 3 / 10 rounds up to a single connection
        assert_eq!(scaled.connection_counts[0][5], 1);
        assert_eq!(scaled.connection_counts[2][6], 0);
        assert_eq!(scaled.connection_counts[0][0], 5);
    }

    #[test]
    fn test_ragged_matrix() {
        let mut column = ColumnSpec::traub2005();
        column.connection_counts[3].pop();
        match column.check_shape() {
            Err(NetworkError::MatrixShape { expected, rows, cols }) => {
                assert_eq!((expected, rows, cols), (12, 12, 11));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_column_json() {
        let column = ColumnSpec::from_json_str(
            r#"{
                "strata": [{"stratum": "granular", "populations": [
                    {"layer": "L4", "class": "STEL", "subtype": "RS", "size": 24, "template": "L4SpinyStellate"}
                ]}],
                "connection_counts": [[3]]
            }"#,
        )
        .unwrap();
        assert_eq!(column.strata[0].populations[0].id(), "L4_RS_STEL");
    }

    fn single_population(class: &str, subtype: &str) -> String {
        format!(
            r#"{{"strata": [{{"stratum": "deep", "populations": [
                {{"layer": "L6", "class": "{}", "subtype": "{}", "size": 1, "template": "X"}}
            ]}}], "connection_counts": [[0]]}}"#,
            class, subtype
        )
    }

    #[test]
    fn test_column_json_unclassified_class() {
        let err = ColumnSpec::from_json_str(&single_population("SOM", "RS")).unwrap_err();
        assert!(
            matches!(err, NetworkError::Core(TcError::UnclassifiedPrincipalType(ref label)) if label == "SOM"),
            "unexpected: {:?}",
            err
        );
    }

    #[test]
    fn test_column_json_unknown_subtype() {
        let err = ColumnSpec::from_json_str(&single_population("PYR", "XYZ")).unwrap_err();
        assert!(
            matches!(err, NetworkError::Core(TcError::UnknownSubtype(ref label)) if label == "XYZ"),
            "unexpected: {:?}",
            err
        );
    }

    #[test]
    fn test_column_json_syntax_error() {
        let err = ColumnSpec::from_json_str(r#"{"strata": ["#).unwrap_err();
        assert!(matches!(err, NetworkError::JsonError(_)));
    }
}
