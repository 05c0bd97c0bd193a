//! Synapse mechanism derivation
//!
//! For every ordered population pair the presynaptic class selects the
//! receptor set:
//!
//! | Presynaptic class | Mechanisms | Emitted conductance |
//! |-------------------|------------|---------------------|
//! | PYR, STEL | AMPA + NMDA | AMPA: `2 g`; NMDA: `0.2 g` onto BASK/AXO/IN, `2.5 g` otherwise |
//! | BASK, AXO, IN | GABA | `g` |
//!
//! An excitatory pair without a tabulated AMPA entry gets neither
//! mechanism. Every population except axo-axonic cells additionally gets
//! one homotypic gap-junction mechanism.

use crate::population::{Population, PopulationModel};
use crate::Result;
use serde::Serialize;
use tcmodel_core::{Conductance, Polarity, PrincipalClass, Receptor, Time};
use tcmodel_synparams::ParameterTables;
use tracing::{debug, info};

/// AMPA conductance multiplier
pub const AMPA_SCALE: f64 = 2.0;
/// NMDA conductance multiplier onto interneurons
pub const NMDA_INTERNEURON_SCALE: f64 = 0.2;
/// NMDA conductance multiplier onto principal cells
pub const NMDA_PRINCIPAL_SCALE: f64 = 2.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum MechanismKind {
    Ampa,
    Nmda,
    Gaba,
    GapJunction,
}

impl MechanismKind {
    /// Name of the NMODL mechanism implementing this kind
    pub fn mod_name(&self) -> &'static str {
        match self {
            MechanismKind::Ampa => "AMPA",
            MechanismKind::Nmda => "NMDA",
            MechanismKind::Gaba => "GABAA",
            MechanismKind::GapJunction => "gGapPar",
        }
    }

    pub fn is_gap_junction(&self) -> bool {
        *self == MechanismKind::GapJunction
    }
}

impl From<Receptor> for MechanismKind {
    fn from(receptor: Receptor) -> Self {
        match receptor {
            Receptor::Ampa => MechanismKind::Ampa,
            Receptor::Nmda => MechanismKind::Nmda,
            Receptor::Gaba => MechanismKind::Gaba,
        }
    }
}

impl From<MechanismKind> for &'static str {
    fn from(kind: MechanismKind) -> Self {
        kind.mod_name()
    }
}

/// One emitted mechanism
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SynapseMechanism {
    pub label: String,
    #[serde(rename = "mod")]
    pub kind: MechanismKind,
    /// Presynaptic population id
    pub pre: String,
    /// Postsynaptic population id (equal to `pre` for gap junctions)
    pub post: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tau: Option<Time>,
    pub g: Conductance,
}

impl SynapseMechanism {
    fn chemical(receptor: Receptor, pre: &Population, post: &Population, tau: Time, g: Conductance) -> Self {
        Self {
            label: format!("{}_{}_to_{}", receptor, pre.id, post.id),
            kind: receptor.into(),
            pre: pre.id.clone(),
            post: post.id.clone(),
            tau: Some(tau),
            g,
        }
    }

    fn gap_junction(population: &Population, g: Conductance) -> Self {
        Self {
            label: format!("GJ_{}", population.id),
            kind: MechanismKind::GapJunction,
            pre: population.id.clone(),
            post: population.id.clone(),
            tau: None,
            g,
        }
    }
}

/// NMDA multiplier for a postsynaptic class
pub fn nmda_scale(post: PrincipalClass) -> f64 {
    if post.is_interneuron() {
        NMDA_INTERNEURON_SCALE
    } else {
        NMDA_PRINCIPAL_SCALE
    }
}

/// Derive every mechanism of the network, in presynaptic-population order
///
/// For each presynaptic population its gap junction (if any) comes first,
/// followed by its chemical mechanisms in postsynaptic-population order.
///
/// # Errors
///
/// Fails on a lookup miss that is not a tolerated absence: a conductance
/// for a tabulated time constant, an NMDA entry for a tabulated AMPA
/// entry, or any gap-junction entry of an eligible population.
pub fn derive_mechanisms(
    model: &PopulationModel,
    tables: &ParameterTables,
    include_gap_junctions: bool,
) -> Result<Vec<SynapseMechanism>> {
    let mut mechanisms = Vec::new();

    for pre in model.populations() {
        if include_gap_junctions {
            if pre.class == PrincipalClass::AxoAxonic {
                debug!(target: "tcmodel-network", "No gap junctions for axo-axonic {}", pre.id);
            } else {
                let gap = tables.gap_junction(&pre.template)?;
                mechanisms.push(SynapseMechanism::gap_junction(pre, gap.g));
            }
        }

        for post in model.populations() {
            match pre.class.polarity() {
                Polarity::Excitatory => {
                    let Some(ampa) = tables.lookup_optional(Receptor::Ampa, &pre.template, &post.template)? else {
                        debug!(target: "tcmodel-network",
                            "No AMPA entry for {} -> {}, skipping pair", pre.template, post.template);
                        continue;
                    };
                    let nmda = tables.require(Receptor::Nmda, &pre.template, &post.template)?;

                    mechanisms.push(SynapseMechanism::chemical(
                        Receptor::Ampa, pre, post, ampa.tau, ampa.g * AMPA_SCALE,
                    ));
                    mechanisms.push(SynapseMechanism::chemical(
                        Receptor::Nmda, pre, post, nmda.tau, nmda.g * nmda_scale(post.class),
                    ));
                }
                Polarity::Inhibitory => {
                    match tables.lookup_optional(Receptor::Gaba, &pre.template, &post.template)? {
                        Some(gaba) => mechanisms.push(SynapseMechanism::chemical(
                            Receptor::Gaba, pre, post, gaba.tau, gaba.g,
                        )),
                        None => debug!(target: "tcmodel-network",
                            "No GABA entry for {} -> {}, skipping pair", pre.template, post.template),
                    }
                }
            }
        }
    }

    let gap_count = mechanisms.iter().filter(|m| m.kind.is_gap_junction()).count();
    info!(target: "tcmodel-network", "Derived {} chemical and {} gap-junction mechanisms",
        mechanisms.len() - gap_count, gap_count);

    Ok(mechanisms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::{ColumnSpec, PopulationSpec, Stratum, StratumSpec};
    use tcmodel_core::ElectroSubtype;
    use tcmodel_synparams::{GapJunctionEntry, SynapseParameterEntry};

    fn column(populations: Vec<PopulationSpec>) -> ColumnSpec {
        let n = populations.len();
        ColumnSpec {
            strata: vec![StratumSpec { stratum: Stratum::Superficial, populations }],
            connection_counts: vec![vec![1; n]; n],
        }
    }

    fn pyr() -> PopulationSpec {
        PopulationSpec::new("L23", ElectroSubtype::RegularSpiking, PrincipalClass::Pyramidal, 100, "T1")
    }

    fn stel() -> PopulationSpec {
        PopulationSpec::new("L4", ElectroSubtype::RegularSpiking, PrincipalClass::Stellate, 100, "T3")
    }

    #[test]
    fn test_nmda_scale_by_target_class() {
        assert_eq!(nmda_scale(PrincipalClass::Basket), 0.2);
        assert_eq!(nmda_scale(PrincipalClass::AxoAxonic), 0.2);
        assert_eq!(nmda_scale(PrincipalClass::Interneuron), 0.2);
        assert_eq!(nmda_scale(PrincipalClass::Pyramidal), 2.5);
        assert_eq!(nmda_scale(PrincipalClass::Stellate), 2.5);
    }

    #[test]
    fn test_stellate_onto_pyramid() {
        let model = PopulationModel::new(&column(vec![pyr(), stel()])).unwrap();
        let mut tables = ParameterTables::new();
        tables
            .insert_synapse(Receptor::Ampa, "T3", "T1", SynapseParameterEntry { tau: 2.0, g: 1.0e-3 })
            .unwrap();
        tables
            .insert_synapse(Receptor::Nmda, "T3", "T1", SynapseParameterEntry { tau: 130.0, g: 0.1e-3 })
            .unwrap();

        let mechanisms = derive_mechanisms(&model, &tables, false).unwrap();
        assert_eq!(mechanisms.len(), 2);
        assert_eq!(mechanisms[0].label, "AMPA_L4_RS_STEL_to_L23_RS_PYR");
        assert_eq!(mechanisms[0].g, 2.0e-3);
        assert_eq!(mechanisms[1].label, "NMDA_L4_RS_STEL_to_L23_RS_PYR");
        assert_eq!(mechanisms[1].g, 0.1e-3 * 2.5);
        assert_eq!(mechanisms[1].tau, Some(130.0));
    }

    #[test]
    fn test_nmda_required_after_ampa() {
        let model = PopulationModel::new(&column(vec![pyr()])).unwrap();
        let mut tables = ParameterTables::new();
        tables
            .insert_synapse(Receptor::Ampa, "T1", "T1", SynapseParameterEntry { tau: 2.0, g: 1.0e-3 })
            .unwrap();

        let err = derive_mechanisms(&model, &tables, false).unwrap_err();
        assert_eq!(err.to_string(), "Missing time constant entry: NMDA_T1_to_T1");
    }

    #[test]
    fn test_gap_junction_mechanism() {
        let model = PopulationModel::new(&column(vec![pyr()])).unwrap();
        let mut tables = ParameterTables::new();
        tables
            .insert_gap_junction("T1", GapJunctionEntry { g: 3.0, junctions_per_cell: 2 }, vec![74])
            .unwrap();

        let mechanisms = derive_mechanisms(&model, &tables, true).unwrap();
        assert_eq!(mechanisms.len(), 1);
        assert_eq!(mechanisms[0].label, "GJ_L23_RS_PYR");
        assert_eq!(mechanisms[0].kind.mod_name(), "gGapPar");
        assert_eq!(mechanisms[0].tau, None);

        // An eligible population must have a gap table entry
        let err = derive_mechanisms(&model, &ParameterTables::new(), true).unwrap_err();
        assert!(err.to_string().contains("gap conductance"));
    }

    #[test]
    fn test_mechanism_json() {
        let model = PopulationModel::new(&column(vec![pyr()])).unwrap();
        let mut tables = ParameterTables::new();
        tables
            .insert_gap_junction("T1", GapJunctionEntry { g: 3.0, junctions_per_cell: 2 }, vec![74])
            .unwrap();

        let mechanisms = derive_mechanisms(&model, &tables, true).unwrap();
        let json = serde_json::to_value(&mechanisms[0]).unwrap();
        assert_eq!(json["mod"], "gGapPar");
        assert!(json.get("tau").is_none());
    }
}
