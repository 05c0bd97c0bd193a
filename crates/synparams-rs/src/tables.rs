//! Structured parameter tables and their lookups

use crate::{ParamsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use tcmodel_core::{Conductance, Receptor, Time};
use tracing::{debug, info, warn};

/// Complete tables shipped with the model
const TRAUB2005: &str = include_str!("../data/traub2005.json");

// ============================================================================
// KEYS
// ============================================================================

/// `(receptor, presynaptic template, postsynaptic template)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SynapseKey {
    pub receptor: Receptor,
    pub pre: String,
    pub post: String,
}

impl SynapseKey {
    pub fn new(receptor: Receptor, pre: &str, post: &str) -> Self {
        Self {
            receptor,
            pre: pre.to_string(),
            post: post.to_string(),
        }
    }
}

impl fmt::Display for SynapseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_to_{}", self.receptor, self.pre, self.post)
    }
}

/// `(presynaptic template, postsynaptic template)`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    pub pre: String,
    pub post: String,
}

impl PairKey {
    pub fn new(pre: &str, post: &str) -> Self {
        Self {
            pre: pre.to_string(),
            post: post.to_string(),
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_to_{}", self.pre, self.post)
    }
}

// ============================================================================
// ENTRIES
// ============================================================================

/// Time constant and unitary conductance of one receptor on one pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SynapseParameterEntry {
    /// Decay time constant (ms)
    pub tau: Time,
    /// Unitary conductance
    pub g: Conductance,
}

/// Electrical coupling of one template with itself
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GapJunctionEntry {
    pub g: Conductance,
    /// Expected junctions between one pair of coupled cells
    pub junctions_per_cell: u32,
}

/// Compartment indices where a synapse may be placed
///
/// Indices refer to the postsynaptic template's own compartment numbering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompartmentList {
    pub allowed: Vec<u32>,
    /// Count stated alongside the list in the source tables, when there is one
    pub declared: Option<usize>,
}

/// A compartment list whose length disagrees with its declared count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountMismatch {
    pub pair: PairKey,
    pub declared: usize,
    pub listed: usize,
}

// ============================================================================
// FILE LAYOUT
// ============================================================================

#[derive(Debug, Deserialize)]
struct ChemicalRow {
    receptor: Receptor,
    pre: String,
    post: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct CompartmentRow {
    pre: String,
    post: String,
    allowed: Vec<u32>,
    #[serde(default)]
    declared: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct GapCompartmentRow {
    template: String,
    allowed: Vec<u32>,
}

#[derive(Debug, Deserialize)]
struct GapValueRow {
    template: String,
    value: f64,
}

#[derive(Debug, Deserialize)]
struct GapCountRow {
    template: String,
    count: u32,
}

#[derive(Debug, Deserialize)]
struct TableFile {
    time_constants: Vec<ChemicalRow>,
    conductances: Vec<ChemicalRow>,
    compartments: Vec<CompartmentRow>,
    gap_compartments: Vec<GapCompartmentRow>,
    gap_conductances: Vec<GapValueRow>,
    gap_counts: Vec<GapCountRow>,
}

// ============================================================================
// TABLES
// ============================================================================

/// Immutable-once-loaded synaptic parameter tables
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterTables {
    time_constants: BTreeMap<SynapseKey, Time>,
    conductances: BTreeMap<SynapseKey, Conductance>,
    compartments: BTreeMap<PairKey, CompartmentList>,
    gap_compartments: BTreeMap<String, Vec<u32>>,
    gap_conductances: BTreeMap<String, Conductance>,
    gap_counts: BTreeMap<String, u32>,
}

impl ParameterTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables of Traub et al. (2005), cortical and thalamic templates
    pub fn traub2005() -> Result<Self> {
        Self::from_json_str(TRAUB2005)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        info!(target: "tcmodel-synparams", "Loading parameter tables from {}", path.display());
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let file: TableFile = serde_json::from_str(content)?;
        let mut tables = Self::new();

        for row in file.time_constants {
            tables.insert_time_constant(SynapseKey::new(row.receptor, &row.pre, &row.post), row.value)?;
        }
        for row in file.conductances {
            tables.insert_conductance(SynapseKey::new(row.receptor, &row.pre, &row.post), row.value)?;
        }
        for row in file.compartments {
            tables.insert_compartments(PairKey::new(&row.pre, &row.post), row.allowed)?;
            if let Some(declared) = row.declared {
                tables.declare_compartment_count(&PairKey::new(&row.pre, &row.post), declared)?;
            }
        }
        for row in file.gap_compartments {
            tables.insert_gap_compartments(&row.template, row.allowed)?;
        }
        for row in file.gap_conductances {
            tables.insert_gap_conductance(&row.template, row.value)?;
        }
        for row in file.gap_counts {
            tables.insert_gap_count(&row.template, row.count)?;
        }

        debug!(target: "tcmodel-synparams",
            "Loaded {} time constants, {} conductances, {} compartment lists, {} gap templates",
            tables.time_constants.len(), tables.conductances.len(),
            tables.compartments.len(), tables.gap_compartments.len());

        Ok(tables)
    }

    // ------------------------------------------------------------------
    // Insertion
    // ------------------------------------------------------------------

    pub fn insert_time_constant(&mut self, key: SynapseKey, tau: Time) -> Result<()> {
        require_positive(&format!("tau{}", key), tau)?;
        insert_unique(&mut self.time_constants, key, tau, "tau")
    }

    pub fn insert_conductance(&mut self, key: SynapseKey, g: Conductance) -> Result<()> {
        require_positive(&format!("g{}", key), g)?;
        insert_unique(&mut self.conductances, key, g, "g")
    }

    /// Time constant and conductance together
    pub fn insert_synapse(
        &mut self,
        receptor: Receptor,
        pre: &str,
        post: &str,
        entry: SynapseParameterEntry,
    ) -> Result<()> {
        let key = SynapseKey::new(receptor, pre, post);
        self.insert_time_constant(key.clone(), entry.tau)?;
        self.insert_conductance(key, entry.g)
    }

    pub fn insert_compartments(&mut self, pair: PairKey, allowed: Vec<u32>) -> Result<()> {
        let list = CompartmentList { allowed, declared: None };
        insert_unique(&mut self.compartments, pair, list, "compallow_")
    }

    /// Attach a stated compartment count to an existing list
    pub fn declare_compartment_count(&mut self, pair: &PairKey, declared: usize) -> Result<()> {
        let list = self
            .compartments
            .get_mut(pair)
            .ok_or_else(|| ParamsError::MissingParameter {
                table: "compartment",
                key: pair.to_string(),
            })?;
        list.declared = Some(declared);
        Ok(())
    }

    pub fn insert_gap_compartments(&mut self, template: &str, allowed: Vec<u32>) -> Result<()> {
        insert_unique(&mut self.gap_compartments, template.to_string(), allowed, "compallow_")
    }

    pub fn insert_gap_conductance(&mut self, template: &str, g: Conductance) -> Result<()> {
        require_positive(&format!("gGAP_{}", template), g)?;
        insert_unique(&mut self.gap_conductances, template.to_string(), g, "gGAP_")
    }

    pub fn insert_gap_count(&mut self, template: &str, count: u32) -> Result<()> {
        insert_unique(&mut self.gap_counts, template.to_string(), count, "nGAP_")
    }

    /// Full gap-junction description of one template
    pub fn insert_gap_junction(
        &mut self,
        template: &str,
        entry: GapJunctionEntry,
        allowed: Vec<u32>,
    ) -> Result<()> {
        self.insert_gap_compartments(template, allowed)?;
        self.insert_gap_conductance(template, entry.g)?;
        self.insert_gap_count(template, entry.junctions_per_cell)
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// The one place where a missing synapse is tolerated
    ///
    /// Returns `Ok(None)` when no time constant is tabulated for the key:
    /// that receptor does not connect that pair. A tabulated time constant
    /// without a conductance is an inconsistent table and an error.
    pub fn lookup_optional(
        &self,
        receptor: Receptor,
        pre: &str,
        post: &str,
    ) -> Result<Option<SynapseParameterEntry>> {
        let key = SynapseKey::new(receptor, pre, post);
        let Some(&tau) = self.time_constants.get(&key) else {
            return Ok(None);
        };
        let g = *self
            .conductances
            .get(&key)
            .ok_or_else(|| ParamsError::MissingParameter {
                table: "conductance",
                key: key.to_string(),
            })?;
        Ok(Some(SynapseParameterEntry { tau, g }))
    }

    /// Like [`lookup_optional`](Self::lookup_optional), but absence is an error
    pub fn require(
        &self,
        receptor: Receptor,
        pre: &str,
        post: &str,
    ) -> Result<SynapseParameterEntry> {
        self.lookup_optional(receptor, pre, post)?
            .ok_or_else(|| ParamsError::MissingParameter {
                table: "time constant",
                key: SynapseKey::new(receptor, pre, post).to_string(),
            })
    }

    pub fn compartments(&self, pre: &str, post: &str) -> Result<&[u32]> {
        let pair = PairKey::new(pre, post);
        self.compartments
            .get(&pair)
            .map(|list| list.allowed.as_slice())
            .ok_or_else(|| ParamsError::MissingParameter {
                table: "compartment",
                key: pair.to_string(),
            })
    }

    pub fn gap_compartments(&self, template: &str) -> Result<&[u32]> {
        self.gap_compartments
            .get(template)
            .map(Vec::as_slice)
            .ok_or_else(|| ParamsError::MissingParameter {
                table: "gap compartment",
                key: template.to_string(),
            })
    }

    pub fn gap_junction(&self, template: &str) -> Result<GapJunctionEntry> {
        let g = *self
            .gap_conductances
            .get(template)
            .ok_or_else(|| ParamsError::MissingParameter {
                table: "gap conductance",
                key: template.to_string(),
            })?;
        let junctions_per_cell = *self
            .gap_counts
            .get(template)
            .ok_or_else(|| ParamsError::MissingParameter {
                table: "gap count",
                key: template.to_string(),
            })?;
        Ok(GapJunctionEntry { g, junctions_per_cell })
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn synapse_count(&self) -> usize {
        self.time_constants.len()
    }

    pub fn compartment_list_count(&self) -> usize {
        self.compartments.len()
    }

    pub fn gap_template_count(&self) -> usize {
        self.gap_compartments.len()
    }

    /// Compartment lists whose length disagrees with their declared count
    pub fn audit(&self) -> Vec<CountMismatch> {
        let mismatches: Vec<CountMismatch> = self
            .compartments
            .iter()
            .filter_map(|(pair, list)| match list.declared {
                Some(declared) if declared != list.allowed.len() => Some(CountMismatch {
                    pair: pair.clone(),
                    declared,
                    listed: list.allowed.len(),
                }),
                _ => None,
            })
            .collect();

        for mismatch in &mismatches {
            warn!(target: "tcmodel-synparams",
                "Compartment list {} declares {} compartments but lists {}",
                mismatch.pair, mismatch.declared, mismatch.listed);
        }

        mismatches
    }
}

fn require_positive(key: &str, value: f64) -> Result<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ParamsError::InvalidParameter {
            key: key.to_string(),
            reason: format!("must be positive, got {}", value),
        })
    }
}

fn insert_unique<K, V>(map: &mut BTreeMap<K, V>, key: K, value: V, prefix: &str) -> Result<()>
where
    K: Ord + fmt::Display,
{
    if map.contains_key(&key) {
        return Err(ParamsError::InvalidParameter {
            key: format!("{}{}", prefix, key),
            reason: "duplicate entry".to_string(),
        });
    }
    map.insert(key, value);
    Ok(())
}
