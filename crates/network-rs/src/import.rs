//! Cell import descriptors: which template file builds each population

use crate::population::PopulationModel;
use serde::Serialize;
use tcmodel_core::PrincipalClass;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellConditions {
    pub cell_type: PrincipalClass,
    pub cell_model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellImport {
    pub population: String,
    pub label: String,
    pub conds: CellConditions,
    pub file_name: String,
    pub cell_name: String,
}

pub fn describe_imports(model: &PopulationModel, cells_dir: &str) -> Vec<CellImport> {
    let dir = cells_dir.trim_end_matches('/');
    model
        .populations()
        .iter()
        .map(|p| CellImport {
            population: p.id.clone(),
            label: format!("{}_rule", p.id),
            conds: CellConditions {
                cell_type: p.class,
                cell_model: format!("{}_mod", p.template),
            },
            file_name: format!("{}/{}.hoc", dir, p.template),
            cell_name: p.template.clone(),
        })
        .collect()
}
