//! Connection rule derivation
//!
//! Rules are built from the mechanisms that were actually emitted, never
//! from a second eligibility check against the tables. A pair gets a rule
//! when its count is nonzero *and* it has at least one emitted chemical
//! mechanism; a population gets a gap rule when its gap mechanism exists.

use crate::mechanism::SynapseMechanism;
use crate::population::{Population, PopulationModel};
use crate::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tcmodel_synparams::ParameterTables;
use tracing::{debug, info};

/// Connectivity function provided by the external runtime
pub const CONN_FUNC: &str = "traubCellConn";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionRule {
    pub label: String,
    pub pre: String,
    pub post: String,
    pub conn_func: String,
    /// Chemical: expected inputs per postsynaptic cell.
    /// Gap junction: expected homotypic partners per cell.
    pub num_pre_to_post: u32,
    pub syn_mech: Vec<String>,
    pub sec: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syns_per_conn: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_sec: Option<Vec<String>>,
    pub gap_junction: bool,
}

/// `comp_<n>` section names
pub fn section_names(indices: &[u32]) -> Vec<String> {
    indices.iter().map(|i| format!("comp_{}", i)).collect()
}

fn chemical_label(pre: &Population, post: &Population) -> String {
    let tag = pre.class.polarity().tag();
    if pre.id == post.id {
        format!("recurrent_{}_{}", tag, pre.id)
    } else {
        format!("FF_{}_{}->{}", tag, pre.id, post.id)
    }
}

/// Derive every rule, in the same order as the mechanisms they reference
///
/// # Errors
///
/// A compartment list is required for every pair that receives a rule, and
/// the gap compartment list for every population with a gap mechanism.
pub fn derive_connection_rules(
    model: &PopulationModel,
    tables: &ParameterTables,
    mechanisms: &[SynapseMechanism],
) -> Result<Vec<ConnectionRule>> {
    let mut chemical: BTreeMap<(&str, &str), Vec<&str>> = BTreeMap::new();
    let mut gap: BTreeMap<&str, &SynapseMechanism> = BTreeMap::new();
    for mechanism in mechanisms {
        if mechanism.kind.is_gap_junction() {
            gap.insert(mechanism.pre.as_str(), mechanism);
        } else {
            chemical
                .entry((mechanism.pre.as_str(), mechanism.post.as_str()))
                .or_default()
                .push(mechanism.label.as_str());
        }
    }

    let mut rules = Vec::new();
    let mut paired: BTreeSet<(&str, &str)> = BTreeSet::new();

    for (i, pre) in model.populations().iter().enumerate() {
        if let Some(mechanism) = gap.get(pre.id.as_str()) {
            let junction = tables.gap_junction(&pre.template)?;
            let secs = section_names(tables.gap_compartments(&pre.template)?);
            rules.push(ConnectionRule {
                label: format!("gj_{}", pre.id),
                pre: pre.id.clone(),
                post: pre.id.clone(),
                conn_func: CONN_FUNC.to_string(),
                num_pre_to_post: model.connection_count(i, i),
                syn_mech: vec![mechanism.label.clone()],
                sec: secs.clone(),
                delay: None,
                weight: Some(1.0),
                syns_per_conn: Some(junction.junctions_per_cell),
                pre_sec: Some(secs),
                gap_junction: true,
            });
        }

        for (j, post) in model.populations().iter().enumerate() {
            let count = model.connection_count(i, j);
            if count == 0 {
                debug!(target: "tcmodel-network", "Zero count for {} -> {}, no rule", pre.id, post.id);
                continue;
            }
            let Some(labels) = chemical.get(&(pre.id.as_str(), post.id.as_str())) else {
                debug!(target: "tcmodel-network",
                    "No mechanisms for {} -> {}, no rule", pre.id, post.id);
                continue;
            };

            let secs = section_names(tables.compartments(&pre.template, &post.template)?);
            paired.insert((pre.id.as_str(), post.id.as_str()));
            rules.push(ConnectionRule {
                label: chemical_label(pre, post),
                pre: pre.id.clone(),
                post: post.id.clone(),
                conn_func: CONN_FUNC.to_string(),
                num_pre_to_post: count,
                syn_mech: labels.iter().map(|l| l.to_string()).collect(),
                sec: secs,
                delay: Some(0.0),
                weight: None,
                syns_per_conn: None,
                pre_sec: None,
                gap_junction: false,
            });
        }
    }

    let unused = chemical.keys().filter(|pair| !paired.contains(*pair)).count();
    info!(target: "tcmodel-network",
        "Derived {} connection rules ({} gap junction); {} mechanism pairs have zero count",
        rules.len(), gap.len(), unused);

    Ok(rules)
}
