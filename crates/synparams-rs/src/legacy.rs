//! Import of flat, string-keyed parameter dumps
//!
//! Older parameter sets name every entry by a single string:
//!
//! | Key shape | Meaning |
//! |-----------|---------|
//! | `tau<R>_<pre>_to_<post>` | decay time constant of receptor `R` |
//! | `g<R>_<pre>_to_<post>` | unitary conductance of receptor `R` |
//! | `compallow_<pre>_to_<post>` | permitted postsynaptic compartments |
//! | `ncompallow_<pre>_to_<post>` | stated length of that list |
//! | `compallow_<template>` | gap-junction compartments |
//! | `gGAP_<template>` / `nGAP_<template>` | gap conductance / junctions per cell |
//!
//! Keys are parsed into structured form once, at import time. Keys with a
//! receptor outside AMPA/NMDA/GABA are skipped with a warning; any other
//! unparseable key is an error.

use crate::tables::{PairKey, ParameterTables, SynapseKey};
use crate::{ParamsError, Result};
use pest::iterators::Pairs;
use pest::Parser;
use pest_derive::Parser;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tcmodel_core::{Receptor, TcError};
use tracing::{info, warn};

#[derive(Parser)]
#[grammar_inline = r#"
template = @{ (!"_to_" ~ (ASCII_ALPHANUMERIC | "_"))+ }
receptor = @{ ASCII_ALPHA_UPPER ~ (ASCII_ALPHA_UPPER | ASCII_DIGIT)* }

chem_quantity = { "tau" | "g" }
gap_quantity = { "gGAP" | "nGAP" }

compartment_count = { "ncompallow_" ~ template ~ "_to_" ~ template }
chemical = { chem_quantity ~ receptor ~ "_" ~ template ~ "_to_" ~ template }
compartments = { "compallow_" ~ template ~ "_to_" ~ template }
gap_compartments = { "compallow_" ~ template }
gap_value = { gap_quantity ~ "_" ~ template }

key = { SOI ~ (compartment_count | chemical | compartments | gap_compartments | gap_value) ~ EOI }
"#]
struct LegacyKeyParser;

/// A parsed flat key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LegacyKey {
    TimeConstant(SynapseKey),
    Conductance(SynapseKey),
    Compartments(PairKey),
    CompartmentCount(PairKey),
    GapCompartments(String),
    GapConductance(String),
    GapCount(String),
}

/// Parse one flat key
///
/// # Errors
///
/// `ParamsError::Core(TcError::UnknownReceptor)` for a well-formed chemical
/// key naming an unsupported receptor, `ParamsError::LegacyKey` otherwise.
pub fn parse_legacy_key(key: &str) -> Result<LegacyKey> {
    let parsed = LegacyKeyParser::parse(Rule::key, key)
        .map_err(|_| ParamsError::LegacyKey(key.to_string()))?
        .next()
        .and_then(|pair| pair.into_inner().next())
        .ok_or_else(|| ParamsError::LegacyKey(key.to_string()))?;

    let rule = parsed.as_rule();
    let mut inner = parsed.into_inner();

    match rule {
        Rule::chemical => {
            let quantity = next_str(&mut inner, key)?;
            let receptor: Receptor = next_str(&mut inner, key)?.parse()?;
            let pre = next_str(&mut inner, key)?;
            let post = next_str(&mut inner, key)?;
            let synapse = SynapseKey::new(receptor, pre, post);
            Ok(if quantity == "tau" {
                LegacyKey::TimeConstant(synapse)
            } else {
                LegacyKey::Conductance(synapse)
            })
        }
        Rule::compartments | Rule::compartment_count => {
            let pre = next_str(&mut inner, key)?;
            let post = next_str(&mut inner, key)?;
            let pair = PairKey::new(pre, post);
            Ok(if rule == Rule::compartments {
                LegacyKey::Compartments(pair)
            } else {
                LegacyKey::CompartmentCount(pair)
            })
        }
        Rule::gap_compartments => Ok(LegacyKey::GapCompartments(next_str(&mut inner, key)?.to_string())),
        Rule::gap_value => {
            let quantity = next_str(&mut inner, key)?;
            let template = next_str(&mut inner, key)?.to_string();
            Ok(if quantity == "gGAP" {
                LegacyKey::GapConductance(template)
            } else {
                LegacyKey::GapCount(template)
            })
        }
        _ => Err(ParamsError::LegacyKey(key.to_string())),
    }
}

fn next_str<'i>(inner: &mut Pairs<'i, Rule>, key: &str) -> Result<&'i str> {
    inner
        .next()
        .map(|pair| pair.as_str())
        .ok_or_else(|| ParamsError::LegacyKey(key.to_string()))
}

/// Result of importing a flat parameter dump
#[derive(Debug, Clone)]
pub struct LegacyImport {
    pub tables: ParameterTables,
    /// Keys skipped because their receptor is not modelled
    pub skipped: Vec<String>,
}

impl ParameterTables {
    /// Import a flat JSON object of `key -> number | [integers]`
    pub fn from_legacy_json(content: &str) -> Result<LegacyImport> {
        let root: Value = serde_json::from_str(content)?;
        let entries = root.as_object().ok_or_else(|| ParamsError::InvalidParameter {
            key: "<root>".to_string(),
            reason: "expected a JSON object".to_string(),
        })?;

        let mut tables = ParameterTables::new();
        let mut skipped = Vec::new();
        let mut declared_counts = Vec::new();

        for (raw_key, value) in entries {
            let parsed = match parse_legacy_key(raw_key) {
                Ok(parsed) => parsed,
                Err(ParamsError::Core(TcError::UnknownReceptor(receptor))) => {
                    warn!(target: "tcmodel-synparams",
                        "Skipping {}: receptor {} is not modelled", raw_key, receptor);
                    skipped.push(raw_key.clone());
                    continue;
                }
                Err(e) => return Err(e),
            };

            match parsed {
                LegacyKey::TimeConstant(key) => tables.insert_time_constant(key, number(raw_key, value)?)?,
                LegacyKey::Conductance(key) => tables.insert_conductance(key, number(raw_key, value)?)?,
                LegacyKey::Compartments(pair) => tables.insert_compartments(pair, indices(raw_key, value)?)?,
                LegacyKey::CompartmentCount(pair) => declared_counts.push((pair, count(raw_key, value)?)),
                LegacyKey::GapCompartments(template) => {
                    tables.insert_gap_compartments(&template, indices(raw_key, value)?)?
                }
                LegacyKey::GapConductance(template) => {
                    tables.insert_gap_conductance(&template, number(raw_key, value)?)?
                }
                LegacyKey::GapCount(template) => {
                    let n = u32::try_from(count(raw_key, value)?)
                        .map_err(|_| invalid(raw_key, "count out of range"))?;
                    tables.insert_gap_count(&template, n)?
                }
            }
        }

        // Counts may precede their lists in the document
        for (pair, declared) in declared_counts {
            tables.declare_compartment_count(&pair, declared)?;
        }

        info!(target: "tcmodel-synparams",
            "Imported {} synapse entries ({} keys skipped)", tables.synapse_count(), skipped.len());

        Ok(LegacyImport { tables, skipped })
    }

    pub fn from_legacy_json_file(path: &Path) -> Result<LegacyImport> {
        let content = fs::read_to_string(path)?;
        Self::from_legacy_json(&content)
    }
}

fn invalid(key: &str, reason: &str) -> ParamsError {
    ParamsError::InvalidParameter {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn number(key: &str, value: &Value) -> Result<f64> {
    value.as_f64().ok_or_else(|| invalid(key, "expected a number"))
}

fn count(key: &str, value: &Value) -> Result<usize> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(key, "expected a non-negative integer"))
}

fn indices(key: &str, value: &Value) -> Result<Vec<u32>> {
    value
        .as_array()
        .ok_or_else(|| invalid(key, "expected a list of compartment indices"))?
        .iter()
        .map(|v| {
            v.as_u64()
                .and_then(|n| u32::try_from(n).ok())
                .ok_or_else(|| invalid(key, "compartment index must be a non-negative integer"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chemical_keys() {
        assert_eq!(
            parse_legacy_key("tauAMPA_L23PyrRS_to_L23PyrFRB_varInit").unwrap(),
            LegacyKey::TimeConstant(SynapseKey::new(Receptor::Ampa, "L23PyrRS", "L23PyrFRB_varInit"))
        );
        assert_eq!(
            parse_legacy_key("gGABA_SupBasket_to_L23PyrRS").unwrap(),
            LegacyKey::Conductance(SynapseKey::new(Receptor::Gaba, "SupBasket", "L23PyrRS"))
        );
    }

    #[test]
    fn test_parse_compartment_keys() {
        assert_eq!(
            parse_legacy_key("ncompallow_TCR_to_L4SpinyStellate").unwrap(),
            LegacyKey::CompartmentCount(PairKey::new("TCR", "L4SpinyStellate"))
        );
        assert_eq!(
            parse_legacy_key("compallow_L23PyrFRB_varInit_to_L5TuftedPyrRS").unwrap(),
            LegacyKey::Compartments(PairKey::new("L23PyrFRB_varInit", "L5TuftedPyrRS"))
        );
        assert_eq!(
            parse_legacy_key("compallow_L23PyrFRB_varInit").unwrap(),
            LegacyKey::GapCompartments("L23PyrFRB_varInit".to_string())
        );
    }

    #[test]
    fn test_parse_gap_keys() {
        assert_eq!(
            parse_legacy_key("gGAP_DeepBasket").unwrap(),
            LegacyKey::GapConductance("DeepBasket".to_string())
        );
        assert_eq!(parse_legacy_key("nGAP_nRT").unwrap(), LegacyKey::GapCount("nRT".to_string()));
    }

    #[test]
    fn test_unknown_receptor_and_bad_keys() {
        let err = parse_legacy_key("tauGABA1_nRT_to_TCR").unwrap_err();
        assert!(matches!(err, ParamsError::Core(TcError::UnknownReceptor(ref r)) if r == "GABA1"));

        for bad in ["", "tauAMPA", "gAMPA_L23PyrRS", "weight_A_to_B", "compallow_"] {
            assert!(matches!(parse_legacy_key(bad), Err(ParamsError::LegacyKey(_))), "{}", bad);
        }
    }

    #[test]
    fn test_import_flat_dump() {
        let import = ParameterTables::from_legacy_json(
            r#"{
                "ncompallow_A_to_B": 3,
                "compallow_A_to_B": [2, 3],
                "tauAMPA_A_to_B": 2.0,
                "gAMPA_A_to_B": 0.25e-3,
                "tauGABA2_C_to_B": 44.5,
                "compallow_B": [5],
                "gGAP_B": 3,
                "nGAP_B": 2
            }"#,
        )
        .unwrap();

        assert_eq!(import.skipped, vec!["tauGABA2_C_to_B".to_string()]);
        let tables = &import.tables;
        assert_eq!(tables.require(Receptor::Ampa, "A", "B").unwrap().g, 0.25e-3);
        assert_eq!(tables.compartments("A", "B").unwrap(), &[2, 3]);
        assert_eq!(tables.gap_junction("B").unwrap().junctions_per_cell, 2);
        assert_eq!(tables.audit().len(), 1);
    }

    #[test]
    fn test_import_rejects_wrong_value_type() {
        let err = ParameterTables::from_legacy_json(r#"{"compallow_A_to_B": 4}"#).unwrap_err();
        assert!(matches!(err, ParamsError::InvalidParameter { .. }));

        let err = ParameterTables::from_legacy_json(r#"{"synapses_A": 4}"#).unwrap_err();
        assert!(matches!(err, ParamsError::LegacyKey(_)));
    }

    #[test]
    fn test_import_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"tauNMDA_A_to_A": 130.0, "gNMDA_A_to_A": 0.025e-3}}"#).unwrap();

        let import = ParameterTables::from_legacy_json_file(file.path()).unwrap();
        assert!(import.skipped.is_empty());
        assert_eq!(import.tables.require(Receptor::Nmda, "A", "A").unwrap().tau, 130.0);
    }
}
