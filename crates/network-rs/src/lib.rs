//! # Network-RS
//!
//! Derivation of the complete network description of a thalamocortical
//! column: populations, synaptic mechanisms, connection rules, cell
//! imports, stimulation and simulation settings, ready to be handed to an
//! external network-building runtime.
//!
//! ## Pipeline
//!
//! | Stage | Module | Output |
//! |-------|--------|--------|
//! | Column definition | [`column`] | ordered strata, count matrix, testing scale-down |
//! | Population model | [`population`] | flat population list, probabilities |
//! | Depth assignment | [`depth`] | `[upper, lower]` band per population |
//! | Mechanism derivation | [`mechanism`] | AMPA/NMDA/GABA/gap mechanisms |
//! | Rule derivation | [`connection`] | recurrent/feedforward/gap rules |
//! | Descriptors | [`import`], [`stimulation`], [`simconfig`] | passthrough tables |
//! | Build | [`build`] | [`NetworkTables`] and the JSON writer |
//!
//! Every stage is a pure function of its inputs; a fatal error in any stage
//! aborts the build before a table is produced.

pub mod build;
pub mod column;
pub mod connection;
pub mod depth;
pub mod import;
pub mod mechanism;
pub mod population;
pub mod simconfig;
pub mod stimulation;

pub use build::{build_network, NetworkTables};
pub use column::{scale_count, ColumnSpec, PopulationSpec, Stratum, StratumSpec};
pub use connection::{derive_connection_rules, section_names, ConnectionRule};
pub use depth::{DepthRange, LayerBands};
pub use import::{describe_imports, CellImport};
pub use mechanism::{derive_mechanisms, MechanismKind, SynapseMechanism};
pub use population::{describe_populations, Population, PopulationEntry, PopulationModel};
pub use simconfig::{describe_sim_config, SimConfig};
pub use stimulation::{describe_stimulation, StimulationPlan};

use tcmodel_core::{Depth, TcError};
use tcmodel_synparams::ParamsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Unrecognized layer label: {0}")]
    UnrecognizedLayer(String),

    #[error("Invalid depth band {band}: upper {upper} must lie above lower {lower}")]
    InvalidDepthBand { band: String, upper: Depth, lower: Depth },

    #[error("Connection matrix is {rows}x{cols}, expected {expected}x{expected}")]
    MatrixShape { expected: usize, rows: usize, cols: usize },

    #[error("Duplicate population id: {0}")]
    DuplicatePopulation(String),

    #[error(transparent)]
    Params(#[from] ParamsError),

    #[error(transparent)]
    Core(#[from] TcError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NetworkError>;
