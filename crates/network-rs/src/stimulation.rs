//! Stimulation descriptors
//!
//! Two protocols are described for the external runtime:
//! a depolarizing step current into layer 2/3 regular-spiking pyramids, and
//! ectopic axonal spikes in every glutamatergic population (mean interval
//! 10 s for superficial pyramids, 1 s for the rest). Only the descriptors
//! are produced here; spike trains are drawn by the runtime.

use crate::column::Stratum;
use crate::depth::DepthRange;
use crate::population::{PopulationEntry, PopulationModel};
use serde::Serialize;
use tcmodel_core::{PrincipalClass, Time};
use tracing::debug;

/// Population receiving the step current
pub const CLAMP_TARGET: &str = "L23_RS_PYR";

const CLAMP_SOURCE: &str = "depol_step_current";
const SUPERFICIAL_ECTOPIC: &str = "ectopic1";
const DEEP_ECTOPIC: &str = "ectopic2";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum SourceKind {
    IClamp {
        #[serde(rename = "del")]
        delay: Time,
        dur: Time,
        /// nA
        amp: f64,
    },
    NetStim {
        /// Mean inter-spike interval (ms)
        interval: Time,
        start: Time,
        noise: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StimulationSource {
    pub label: String,
    #[serde(flatten)]
    pub kind: SourceKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConditions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pop: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cell_type: Option<PrincipalClass>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_range: Option<DepthRange>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StimulationTarget {
    pub label: String,
    pub source: String,
    pub conds: TargetConditions,
    pub sec: String,
    pub loc: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<Time>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StimulationPlan {
    pub sources: Vec<StimulationSource>,
    pub targets: Vec<StimulationTarget>,
}

/// Axonal compartment of the excitatory templates
pub fn axon_compartment(template: &str) -> Option<u32> {
    match template {
        "L23PyrRS" | "L23PyrFRB_varInit" => Some(69),
        "L5TuftedPyrIB" | "L5TuftedPyrRS" => Some(56),
        "L6NonTuftedPyrRS" => Some(45),
        "L4SpinyStellate" => Some(54),
        _ => None,
    }
}

fn sources() -> Vec<StimulationSource> {
    vec![
        StimulationSource {
            label: CLAMP_SOURCE.to_string(),
            kind: SourceKind::IClamp { delay: 200.0, dur: 200.0, amp: 1.5 },
        },
        StimulationSource {
            label: SUPERFICIAL_ECTOPIC.to_string(),
            kind: SourceKind::NetStim { interval: 10_000.0, start: 0.0, noise: 10.0 },
        },
        StimulationSource {
            label: DEEP_ECTOPIC.to_string(),
            kind: SourceKind::NetStim { interval: 1_000.0, start: 0.0, noise: 10.0 },
        },
    ]
}

/// Stimulation sources and targets for the given populations
///
/// Ectopic targets select cells by class and depth band, so populations
/// sharing both (e.g. the two layer 2/3 pyramid subtypes) share one target.
pub fn describe_stimulation(model: &PopulationModel, entries: &[PopulationEntry]) -> StimulationPlan {
    let mut targets = Vec::new();

    if model.get(CLAMP_TARGET).is_some() {
        targets.push(StimulationTarget {
            label: format!("curr_inj->{}", CLAMP_TARGET),
            source: CLAMP_SOURCE.to_string(),
            conds: TargetConditions {
                pop: Some(CLAMP_TARGET.to_string()),
                ..TargetConditions::default()
            },
            sec: "comp_1".to_string(),
            loc: 0.5,
            weight: None,
            delay: None,
        });
    } else {
        debug!(target: "tcmodel-network", "No {} population, step current omitted", CLAMP_TARGET);
    }

    for (population, entry) in model.populations().iter().zip(entries) {
        if !population.class.is_excitatory() {
            continue;
        }
        let Some(axon) = axon_compartment(&population.template) else {
            debug!(target: "tcmodel-network",
                "No axonal compartment known for {}, no ectopic spikes", population.template);
            continue;
        };

        let source = if population.stratum == Stratum::Superficial
            && population.class == PrincipalClass::Pyramidal
        {
            SUPERFICIAL_ECTOPIC
        } else {
            DEEP_ECTOPIC
        };
        let label = format!("{}->{}_{}", source, population.layer, population.class);
        if targets.iter().any(|t| t.label == label) {
            continue;
        }

        targets.push(StimulationTarget {
            label,
            source: source.to_string(),
            conds: TargetConditions {
                pop: None,
                cell_type: Some(population.class),
                y_range: Some(entry.y_range),
            },
            sec: format!("comp_{}", axon),
            loc: 0.5,
            weight: Some(1.0),
            delay: Some(0.0),
        });
    }

    StimulationPlan {
        sources: sources(),
        targets,
    }
}
