//! # TCModel Core
//!
//! Shared vocabulary for the thalamocortical column model.
//!
//! ## Cell vocabulary
//!
//! | Label | Principal class | Polarity |
//! |-------|-----------------|----------|
//! | PYR   | pyramidal       | excitatory |
//! | STEL  | spiny stellate  | excitatory |
//! | BASK  | basket          | inhibitory |
//! | AXO   | axo-axonic      | inhibitory |
//! | IN    | other interneuron (LTS) | inhibitory |
//!
//! Electrophysiological subtypes: RS (regular spiking), FRB (fast rhythmic
//! bursting), IB (intrinsic bursting), FS (fast spiking), LTS (low-threshold
//! spiking).

pub mod config;

pub use config::{
    apply_environment_overrides, load_config, validate_config, Geometry, ModelConfig,
    OutputPaths, SimulationSettings,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Common errors
#[derive(Debug, Error)]
pub enum TcError {
    #[error("Unclassified principal cell type: {0}")]
    UnclassifiedPrincipalType(String),

    #[error("Unknown electrophysiological subtype: {0}")]
    UnknownSubtype(String),

    #[error("Unknown receptor kind: {0}")]
    UnknownReceptor(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, TcError>;

/// Time (ms)
pub type Time = f64;

/// Voltage (mV)
pub type Voltage = f64;

/// Unitary synaptic conductance, in the units of the parameter tables
pub type Conductance = f64;

/// Cortical depth below pia (um)
pub type Depth = f64;

/// Excitatory or inhibitory output of a cell class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    Excitatory,
    Inhibitory,
}

impl Polarity {
    /// Single-letter tag used in connection rule labels
    pub fn tag(&self) -> &'static str {
        match self {
            Polarity::Excitatory => "E",
            Polarity::Inhibitory => "I",
        }
    }
}

/// Principal (morphological) cell class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum PrincipalClass {
    Pyramidal,
    Stellate,
    Basket,
    AxoAxonic,
    Interneuron,
}

impl PrincipalClass {
    pub const ALL: [PrincipalClass; 5] = [
        PrincipalClass::Pyramidal,
        PrincipalClass::Stellate,
        PrincipalClass::Basket,
        PrincipalClass::AxoAxonic,
        PrincipalClass::Interneuron,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PrincipalClass::Pyramidal => "PYR",
            PrincipalClass::Stellate => "STEL",
            PrincipalClass::Basket => "BASK",
            PrincipalClass::AxoAxonic => "AXO",
            PrincipalClass::Interneuron => "IN",
        }
    }

    /// Glutamatergic classes excite, GABAergic classes inhibit
    pub fn polarity(&self) -> Polarity {
        match self {
            PrincipalClass::Pyramidal | PrincipalClass::Stellate => Polarity::Excitatory,
            PrincipalClass::Basket | PrincipalClass::AxoAxonic | PrincipalClass::Interneuron => {
                Polarity::Inhibitory
            }
        }
    }

    pub fn is_excitatory(&self) -> bool {
        self.polarity() == Polarity::Excitatory
    }

    /// Basket, axo-axonic and other interneurons
    pub fn is_interneuron(&self) -> bool {
        matches!(
            self,
            PrincipalClass::Basket | PrincipalClass::AxoAxonic | PrincipalClass::Interneuron
        )
    }
}

impl FromStr for PrincipalClass {
    type Err = TcError;

    fn from_str(s: &str) -> Result<Self> {
        PrincipalClass::ALL
            .into_iter()
            .find(|class| class.label() == s)
            .ok_or_else(|| TcError::UnclassifiedPrincipalType(s.to_string()))
    }
}

impl TryFrom<String> for PrincipalClass {
    type Error = TcError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PrincipalClass> for &'static str {
    fn from(class: PrincipalClass) -> Self {
        class.label()
    }
}

impl fmt::Display for PrincipalClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Electrophysiological firing subtype
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum ElectroSubtype {
    RegularSpiking,
    FastRhythmicBursting,
    IntrinsicBursting,
    FastSpiking,
    LowThresholdSpiking,
}

impl ElectroSubtype {
    pub const ALL: [ElectroSubtype; 5] = [
        ElectroSubtype::RegularSpiking,
        ElectroSubtype::FastRhythmicBursting,
        ElectroSubtype::IntrinsicBursting,
        ElectroSubtype::FastSpiking,
        ElectroSubtype::LowThresholdSpiking,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ElectroSubtype::RegularSpiking => "RS",
            ElectroSubtype::FastRhythmicBursting => "FRB",
            ElectroSubtype::IntrinsicBursting => "IB",
            ElectroSubtype::FastSpiking => "FS",
            ElectroSubtype::LowThresholdSpiking => "LTS",
        }
    }
}

impl FromStr for ElectroSubtype {
    type Err = TcError;

    fn from_str(s: &str) -> Result<Self> {
        ElectroSubtype::ALL
            .into_iter()
            .find(|subtype| subtype.label() == s)
            .ok_or_else(|| TcError::UnknownSubtype(s.to_string()))
    }
}

impl TryFrom<String> for ElectroSubtype {
    type Error = TcError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ElectroSubtype> for &'static str {
    fn from(subtype: ElectroSubtype) -> Self {
        subtype.label()
    }
}

impl fmt::Display for ElectroSubtype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Chemical receptor kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "&'static str")]
pub enum Receptor {
    Ampa,
    Nmda,
    Gaba,
}

impl Receptor {
    pub const ALL: [Receptor; 3] = [Receptor::Ampa, Receptor::Nmda, Receptor::Gaba];

    pub fn label(&self) -> &'static str {
        match self {
            Receptor::Ampa => "AMPA",
            Receptor::Nmda => "NMDA",
            Receptor::Gaba => "GABA",
        }
    }
}

impl FromStr for Receptor {
    type Err = TcError;

    fn from_str(s: &str) -> Result<Self> {
        Receptor::ALL
            .into_iter()
            .find(|receptor| receptor.label() == s)
            .ok_or_else(|| TcError::UnknownReceptor(s.to_string()))
    }
}

impl TryFrom<String> for Receptor {
    type Error = TcError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Receptor> for &'static str {
    fn from(receptor: Receptor) -> Self {
        receptor.label()
    }
}

impl fmt::Display for Receptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
