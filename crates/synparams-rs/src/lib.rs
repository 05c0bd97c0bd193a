//! # SynParams-RS
//!
//! Synaptic parameter tables for the thalamocortical column of
//! Traub et al. (2005), as ported to NEURON.
//!
//! Four kinds of tables are held here:
//! - decay time constants per `(receptor, pre template, post template)`
//! - unitary conductances per `(receptor, pre template, post template)`
//! - permitted postsynaptic compartments per `(pre template, post template)`
//! - gap-junction compartments, conductances and junction counts per template
//!
//! Not every template pair has a synapse. A missing time constant means
//! "no synapse of that kind exists" and is reported as `Ok(None)` by
//! [`ParameterTables::lookup_optional`]; every other miss is an error.

pub mod legacy;
pub mod tables;

pub use legacy::{parse_legacy_key, LegacyImport, LegacyKey};
pub use tables::{
    CompartmentList, CountMismatch, GapJunctionEntry, PairKey, ParameterTables, SynapseKey,
    SynapseParameterEntry,
};

use tcmodel_core::TcError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("Missing {table} entry: {key}")]
    MissingParameter { table: &'static str, key: String },

    #[error("Invalid parameter {key}: {reason}")]
    InvalidParameter { key: String, reason: String },

    #[error("Unrecognized legacy key: {0}")]
    LegacyKey(String),

    #[error(transparent)]
    Core(#[from] TcError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ParamsError>;
