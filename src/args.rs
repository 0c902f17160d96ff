use clap::Parser;

/// Consolidates training-course completion scores and keeps, for every
/// person, the single best-scoring period between 2024 and 2025.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The master workbook containing the per-course score sheets.
    #[clap(short, long, value_parser)]
    pub master: String,

    /// (file path or empty) The teacher-contract workbook. When provided, only
    /// identifiers present in the contract are kept in the output, and missing
    /// names are backfilled from it.
    #[clap(short, long, value_parser)]
    pub contract: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the output table will be written
    /// in CSV format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the run summary will be written
    /// in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub summary: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, topmarks will
    /// check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
