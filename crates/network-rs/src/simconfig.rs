//! Simulation configuration handed to the external runtime

use crate::population::PopulationModel;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tcmodel_core::{ModelConfig, Time};

/// Label of the recorded somatic trace
pub const SOMATIC_TRACE: &str = "Somatic Potential (mv)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceSpec {
    pub sec: String,
    pub loc: f64,
    pub var: String,
}

/// `(population id, cell index within the population)`
pub type CellRef = (String, u32);

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RasterPlot {
    pub order_by: String,
    /// Superficial layers on top
    pub order_inverse: bool,
    pub time_range: [Time; 2],
    pub save_fig: PathBuf,
    pub show_fig: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TracePlot {
    pub include: Vec<CellRef>,
    pub time_range: [Time; 2],
    pub one_fig_per: String,
    pub save_fig: PathBuf,
    pub show_fig: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnPlot {
    pub group_by: String,
    pub save_fig: PathBuf,
    pub show_fig: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis {
    pub plot_raster: RasterPlot,
    pub plot_traces: TracePlot,
    pub plot_conn: ConnPlot,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimConfig {
    pub duration: Time,
    pub dt: Time,
    pub verbose: bool,
    pub record_traces: BTreeMap<String, TraceSpec>,
    pub record_cells: Vec<CellRef>,
    pub record_step: Time,
    pub filename: String,
    pub save_folder: PathBuf,
    pub save_pickle: bool,
    pub print_pop_avg_rates: bool,
    pub analysis: Analysis,
}

pub fn describe_sim_config(config: &ModelConfig, model: &PopulationModel) -> SimConfig {
    let paths = config.output_paths();
    let sim = &config.simulation;

    let first_cells: Vec<CellRef> = model
        .populations()
        .iter()
        .map(|p| (p.id.clone(), 0))
        .collect();

    let mut record_traces = BTreeMap::new();
    record_traces.insert(
        SOMATIC_TRACE.to_string(),
        TraceSpec {
            sec: "comp_1".to_string(),
            loc: 0.5,
            var: "v".to_string(),
        },
    );

    let analysis = Analysis {
        plot_raster: RasterPlot {
            order_by: "y".to_string(),
            order_inverse: true,
            time_range: sim.trace_window,
            save_fig: paths.figures.join("TC_Raster.png"),
            show_fig: false,
        },
        plot_traces: TracePlot {
            include: first_cells.clone(),
            time_range: sim.trace_window,
            one_fig_per: "cell".to_string(),
            save_fig: paths.figures.join("TC_popTraces.png"),
            show_fig: false,
        },
        plot_conn: ConnPlot {
            group_by: "pop".to_string(),
            save_fig: paths.figures.join("TC_synConn.png"),
            show_fig: false,
        },
    };

    SimConfig {
        duration: sim.duration,
        dt: sim.dt,
        verbose: sim.verbose,
        record_traces,
        record_cells: first_cells,
        record_step: sim.record_step,
        filename: sim.filename.clone(),
        save_folder: paths.data,
        save_pickle: config.save_pickle(),
        print_pop_avg_rates: sim.print_pop_avg_rates,
        analysis,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::ColumnSpec;

    #[test]
    fn test_testing_mode_paths() {
        let model = PopulationModel::new(&ColumnSpec::traub2005()).unwrap();
        let sim = describe_sim_config(&ModelConfig::default(), &model);

        assert_eq!(sim.duration, 1000.0);
        assert_eq!(sim.save_folder, PathBuf::from("scratch"));
        assert!(!sim.save_pickle);
        assert_eq!(sim.analysis.plot_raster.save_fig, PathBuf::from("scratch/TC_Raster.png"));
        assert_eq!(sim.record_cells.len(), 12);
        assert_eq!(sim.analysis.plot_traces.include[0], ("L23_RS_PYR".to_string(), 0));
    }

    #[test]
    fn test_full_run_paths() {
        let model = PopulationModel::new(&ColumnSpec::traub2005()).unwrap();
        let config = ModelConfig { testing: false, ..ModelConfig::default() };
        let sim = describe_sim_config(&config, &model);

        assert!(sim.save_pickle);
        assert_eq!(sim.save_folder, PathBuf::from("output/dat"));
        assert_eq!(sim.analysis.plot_conn.save_fig, PathBuf::from("output/figs/TC_synConn.png"));

        let json = serde_json::to_value(&sim).unwrap();
        assert_eq!(json["recordTraces"][SOMATIC_TRACE]["sec"], "comp_1");
        assert_eq!(json["analysis"]["plotRaster"]["orderInverse"], true);
        assert_eq!(json["analysis"]["plotTraces"]["include"][1][0], "L23_FRB_PYR");
    }
}
