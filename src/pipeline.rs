use log::{debug, info, warn};

use score_consolidation::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::io::Cursor;
use std::time::Duration;

use calamine::{Reader, Xlsx};

use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::pipeline::cache::ResultCache;
use crate::pipeline::contract::load_contract;
use crate::pipeline::sheets::{read_auxiliary_sheets, read_base_rows};

pub mod cache;
pub mod contract;
pub mod export;
pub mod io_xlsx;
pub mod sheets;

#[derive(Debug, Snafu)]
pub enum PipelineError {
    #[snafu(display("Error opening workbook: {origin}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        origin: String,
    },
    #[snafu(display("The workbook is missing the required sheet '{sheet}'"))]
    MissingSheet { sheet: String },
    #[snafu(display("Sheet '{sheet}' is missing the required column '{column}'"))]
    MissingColumn { sheet: String, column: String },
    #[snafu(display("Sheet '{sheet}' is empty"))]
    EmptySheet { sheet: String },
    #[snafu(display("The workbook has no sheets"))]
    EmptyWorkbook {},
    #[snafu(display("Error reading file {path}"))]
    ReadingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening JSON file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing the output table"))]
    WritingCsv { source: csv::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// Core entry point: consolidates the master workbook and the optional
/// contract workbook into one table with exactly one row per person.
///
/// This is a pure function of the two byte buffers. Structural problems (a
/// missing sheet or required column) abort the whole call; no partial output
/// is ever returned. An empty result is a valid outcome, not an error.
pub fn consolidate_workbooks(
    master: &[u8],
    contract: Option<&[u8]>,
) -> PipelineResult<Vec<ReducedRecord>> {
    let contract_mapping: Option<ContractMapping> = match contract {
        Some(bytes) => Some(load_contract(bytes)?),
        None => None,
    };

    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(master)).context(OpeningExcelSnafu {
        origin: "master workbook",
    })?;
    let base = read_base_rows(&mut workbook)?;
    let auxiliary = read_auxiliary_sheets(&mut workbook)?;

    Ok(consolidate_scores(
        base,
        &auxiliary,
        contract_mapping.as_ref(),
    ))
}

pub fn run_app(args: &Args) -> PipelineResult<()> {
    info!("Attempting to read master workbook {:?}", args.master);
    let master = fs::read(&args.master).context(ReadingFileSnafu {
        path: args.master.clone(),
    })?;
    let contract: Option<Vec<u8>> = match &args.contract {
        Some(path) => {
            info!("Attempting to read contract workbook {:?}", path);
            Some(fs::read(path).context(ReadingFileSnafu { path: path.clone() })?)
        }
        None => None,
    };

    // The cache wraps the pipeline call as an atomic unit: repeated identical
    // inputs short-circuit to the stored result.
    let mut cache = ResultCache::with_ttl(Duration::from_secs(600));
    let records = cache.get_or_compute(&master, contract.as_deref(), consolidate_workbooks)?;

    if records.is_empty() {
        warn!("the pipeline produced no records");
        println!(
            "No records with scores found for {} or {}.",
            ACCEPTED_YEARS[0], ACCEPTED_YEARS[1]
        );
        return Ok(());
    }

    let summary = export::build_summary(&records)?;
    let pretty_summary = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;

    match args.summary.as_deref() {
        Some("stdout") => println!("{}", pretty_summary),
        Some(path) => {
            fs::write(path, &pretty_summary).context(WritingFileSnafu { path })?;
            info!("Summary written to {:?}", path);
        }
        None => {}
    }

    match args.out.as_deref() {
        Some("stdout") => export::write_csv(&records, std::io::stdout())?,
        Some(path) => {
            let f = fs::File::create(path).context(WritingFileSnafu { path })?;
            export::write_csv(&records, f)?;
            info!("Output table written to {:?}", path);
        }
        None => {}
    }

    print_recap(&records);

    if let Some(reference_path) = &args.reference {
        let reference = read_reference(reference_path)?;
        let pretty_reference =
            serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
        if pretty_reference != pretty_summary {
            warn!("Found differences with the reference summary");
            print_diff(pretty_reference.as_str(), pretty_summary.as_str(), "\n");
            whatever!("Difference detected between the computed summary and the reference summary");
        }
        info!("Summary matches the reference");
    }

    Ok(())
}

// The console recap mirrors the aggregates of the original preview: total
// count, mean marks, mean completion, counts by winning year.
fn print_recap(records: &[ReducedRecord]) {
    let n = records.len();
    let mean_marks: f64 = records.iter().map(|r| r.marks_out_of_20).sum::<f64>() / n as f64;
    let mean_percentage: f64 = records.iter().map(|r| r.percentage).sum::<f64>() / n as f64;
    println!("Total persons: {}", n);
    println!("Average marks (out of 20): {:.2}", mean_marks);
    println!("Average completion: {:.2}%", mean_percentage);
    for year in ACCEPTED_YEARS {
        let count = records
            .iter()
            .filter(|r| r.highest_score_year == year)
            .count();
        println!("Best period in {}: {} persons", year, count);
    }
}

fn read_reference(path: &str) -> PipelineResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_reference: {} bytes", contents.len());
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

#[cfg(test)]
mod tests {
    use super::*;

    static MASTER: &[u8] = include_bytes!("../tests/data/master_small.xlsx");
    static MASTER_MISSING_SHEET: &[u8] =
        include_bytes!("../tests/data/master_missing_sheet.xlsx");
    static MASTER_MISSING_COLUMN: &[u8] =
        include_bytes!("../tests/data/master_missing_column.xlsx");
    static CONTRACT: &[u8] = include_bytes!("../tests/data/contract_small.xlsx");
    static CONTRACT_EMPTY: &[u8] = include_bytes!("../tests/data/contract_empty.xlsx");

    #[test]
    fn consolidates_a_small_workbook() {
        let records = consolidate_workbooks(MASTER, None).unwrap();
        assert_eq!(records.len(), 2);

        let ana = records.iter().find(|r| r.identifier == "11111111").unwrap();
        assert_eq!(ana.highest_score_year, 2025);
        assert_eq!(ana.period, "2025-II");
        assert_eq!(ana.scores[Component::Library as usize], 15.0);
        // The workbook carries no Padlet column: the component degrades to
        // zero instead of failing the run.
        assert_eq!(ana.scores[Component::Padlet as usize], 0.0);
        assert_eq!(ana.marks_out_of_20, 17.14);

        let berta = records.iter().find(|r| r.identifier == "22222222").unwrap();
        assert_eq!(berta.scores[Component::Communication as usize], 9.0);
        assert_eq!(berta.marks_out_of_20, 2.86);
    }

    #[test]
    fn missing_sheet_is_a_structural_error() {
        match consolidate_workbooks(MASTER_MISSING_SHEET, None) {
            Err(PipelineError::MissingSheet { sheet }) => {
                assert_eq!(sheet, "Bus. biblioteca");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn missing_required_column_is_a_structural_error() {
        match consolidate_workbooks(MASTER_MISSING_COLUMN, None) {
            Err(PipelineError::MissingColumn { sheet, column }) => {
                assert_eq!(sheet, "RSU");
                assert_eq!(column, "Tarea: Producto final");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn contract_restricts_the_output() {
        let mapping = load_contract(CONTRACT).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping["11111111"].given_name, "ANA");
        assert_eq!(mapping["11111111"].family_name, "QUISPE ROJAS");

        let records = consolidate_workbooks(MASTER, Some(CONTRACT)).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].identifier, "11111111");
    }

    #[test]
    fn empty_contract_sheet_is_a_structural_error() {
        match load_contract(CONTRACT_EMPTY) {
            Err(PipelineError::EmptySheet { sheet }) => assert_eq!(sheet, "contract"),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
