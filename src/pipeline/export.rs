//! Rendering of the reduced table: CSV export and the JSON run summary.

use score_consolidation::{Component, ReducedRecord};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use snafu::prelude::*;

use std::collections::BTreeMap;
use std::io::Write;

use crate::pipeline::*;

/// One output row, with the exact column names and order of the published
/// table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputRecord {
    #[serde(rename = "Periodo")]
    pub periodo: String,
    #[serde(rename = "Highest_Score_Year")]
    pub highest_score_year: i32,
    #[serde(rename = "DNI")]
    pub dni: String,
    #[serde(rename = "Nombre")]
    pub nombre: String,
    #[serde(rename = "Apellido(s)")]
    pub apellidos: String,
    pub induccion: f64,
    pub bus_biblioteca: f64,
    pub diseno_sesion: f64,
    #[serde(rename = "Zoom_basico")]
    pub zoom_basico: f64,
    #[serde(rename = "Zoom_Avanzado")]
    pub zoom_avanzado: f64,
    #[serde(rename = "Grupos_Moodle")]
    pub grupos_moodle: f64,
    #[serde(rename = "Rubrica")]
    pub rubrica: f64,
    #[serde(rename = "Padlet")]
    pub padlet: f64,
    #[serde(rename = "Nearpod")]
    pub nearpod: f64,
    #[serde(rename = "Tareas_y_foros")]
    pub tareas_y_foros: f64,
    pub integracion: f64,
    pub rsu: f64,
    pub estress: f64,
    pub hab_comunicacion: f64,
    #[serde(rename = "Average")]
    pub average: f64,
    #[serde(rename = "Marks_Out_Of_20")]
    pub marks_out_of_20: f64,
    #[serde(rename = "Percentage")]
    pub percentage: f64,
}

impl OutputRecord {
    pub fn from_record(r: &ReducedRecord) -> OutputRecord {
        let score = |c: Component| r.scores[c as usize];
        OutputRecord {
            periodo: r.period.clone(),
            highest_score_year: r.highest_score_year,
            dni: r.identifier.clone(),
            nombre: r.given_name.clone(),
            apellidos: r.family_name.clone(),
            induccion: score(Component::Induction),
            bus_biblioteca: score(Component::Library),
            diseno_sesion: score(Component::SessionDesign),
            zoom_basico: score(Component::ZoomBasic),
            zoom_avanzado: score(Component::ZoomAdvanced),
            grupos_moodle: score(Component::MoodleGroups),
            rubrica: score(Component::Rubric),
            padlet: score(Component::Padlet),
            nearpod: score(Component::Nearpod),
            tareas_y_foros: score(Component::TasksForums),
            integracion: score(Component::Integration),
            rsu: score(Component::SocialResponsibility),
            estress: score(Component::StressManagement),
            hab_comunicacion: score(Component::Communication),
            average: r.average,
            marks_out_of_20: r.marks_out_of_20,
            percentage: r.percentage,
        }
    }
}

/// Writes the output table as CSV.
pub fn write_csv<W: Write>(records: &[ReducedRecord], writer: W) -> PipelineResult<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for r in records.iter() {
        wtr.serialize(OutputRecord::from_record(r))
            .context(WritingCsvSnafu {})?;
    }
    wtr.flush().map_err(csv::Error::from).context(WritingCsvSnafu {})?;
    Ok(())
}

/// Assembles the run summary: the aggregates the boundary used to display,
/// plus the records themselves.
pub fn build_summary(records: &[ReducedRecord]) -> PipelineResult<JSValue> {
    let mut by_year: BTreeMap<String, usize> = BTreeMap::new();
    for r in records.iter() {
        *by_year.entry(r.highest_score_year.to_string()).or_insert(0) += 1;
    }

    let n = records.len();
    let mean = |f: fn(&ReducedRecord) -> f64| -> String {
        if n == 0 {
            "0.00".to_string()
        } else {
            format!("{:.2}", records.iter().map(f).sum::<f64>() / n as f64)
        }
    };

    let mut rows: Vec<JSValue> = Vec::new();
    for r in records.iter() {
        let js =
            serde_json::to_value(OutputRecord::from_record(r)).context(ParsingJsonSnafu {})?;
        rows.push(js);
    }

    Ok(json!({
        "totalRecords": n,
        "meanMarksOutOf20": mean(|r| r.marks_out_of_20),
        "meanPercentage": mean(|r| r.percentage),
        "recordsByYear": by_year,
        "records": rows,
    }))
}
