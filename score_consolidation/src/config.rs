// ********* Input data structures ***********

use std::collections::HashMap;

/// One of the fixed named sub-scores contributing to the final average.
///
/// The order of the variants is the order of the component columns in the
/// output table.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Component {
    Induction,
    Library,
    SessionDesign,
    ZoomBasic,
    ZoomAdvanced,
    MoodleGroups,
    Rubric,
    Padlet,
    Nearpod,
    TasksForums,
    Integration,
    SocialResponsibility,
    StressManagement,
    Communication,
}

impl Component {
    pub const COUNT: usize = 14;

    pub const ALL: [Component; Component::COUNT] = [
        Component::Induction,
        Component::Library,
        Component::SessionDesign,
        Component::ZoomBasic,
        Component::ZoomAdvanced,
        Component::MoodleGroups,
        Component::Rubric,
        Component::Padlet,
        Component::Nearpod,
        Component::TasksForums,
        Component::Integration,
        Component::SocialResponsibility,
        Component::StressManagement,
        Component::Communication,
    ];

    /// The name of this component's column in the output table.
    pub fn column_name(&self) -> &'static str {
        match self {
            Component::Induction => "induccion",
            Component::Library => "bus_biblioteca",
            Component::SessionDesign => "diseno_sesion",
            Component::ZoomBasic => "Zoom_basico",
            Component::ZoomAdvanced => "Zoom_Avanzado",
            Component::MoodleGroups => "Grupos_Moodle",
            Component::Rubric => "Rubrica",
            Component::Padlet => "Padlet",
            Component::Nearpod => "Nearpod",
            Component::TasksForums => "Tareas_y_foros",
            Component::Integration => "integracion",
            Component::SocialResponsibility => "rsu",
            Component::StressManagement => "estress",
            Component::Communication => "hab_comunicacion",
        }
    }
}

/// One row from one of the two base sheets, already mapped to the canonical
/// schema by the readers but not yet normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseRow {
    pub period: String,
    /// Raw identifier value, as found in the cell.
    pub identifier: String,
    pub given_name: String,
    pub family_name: String,
    pub email: Option<String>,
    /// The induction score carried by the base sheet itself.
    pub induction: Option<f64>,
}

/// The key used to attach an auxiliary sheet to the base. This is a declared
/// property of the sheet, not something inferred from the data.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum JoinKey {
    Identifier,
    NamePair,
}

/// One row of an auxiliary sheet, as parsed by the readers.
///
/// Only the fields relevant to the sheet's join key need to be filled; an
/// identifier-keyed sheet may leave the names empty and vice versa.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliaryRow {
    pub identifier: String,
    pub given_name: String,
    pub family_name: String,
    pub scores: Vec<(Component, Option<f64>)>,
}

/// The component scores contributed by one auxiliary sheet, together with the
/// join policy used to attach them to the base rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AuxiliarySheet {
    pub join_key: JoinKey,
    pub rows: Vec<AuxiliaryRow>,
}

/// Registered names for one person of the contract workbook.
#[derive(Debug, Clone, PartialEq)]
pub struct ContractEntry {
    pub given_name: String,
    pub family_name: String,
}

/// Mapping from normalized identifier to registered names. An empty mapping
/// means that no contract filtering was requested, not that everyone is
/// excluded.
pub type ContractMapping = HashMap<String, ContractEntry>;

// ******** Intermediate data structures *********

/// One evaluation period's results for one person, after reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRow {
    pub period: String,
    pub year: Option<i32>,
    /// Normalized identifier, or None when no digits could be recovered.
    pub identifier: Option<String>,
    pub given_name: String,
    pub family_name: String,
    pub email: Option<String>,
    /// Component scores indexed by `Component as usize`. None means the
    /// component was never observed for this row.
    pub scores: [Option<f64>; Component::COUNT],
}

impl ObservationRow {
    /// The component scores with absent values coerced to zero. "No
    /// submission" and "submission scored zero" are treated identically.
    pub fn coerced_scores(&self) -> [f64; Component::COUNT] {
        let mut res = [0.0; Component::COUNT];
        for (idx, s) in self.scores.iter().enumerate() {
            res[idx] = s.unwrap_or(0.0);
        }
        res
    }
}

/// An observation row annotated with its derived metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRow {
    pub period: String,
    pub year: Option<i32>,
    pub identifier: Option<String>,
    pub given_name: String,
    pub family_name: String,
    pub scores: [f64; Component::COUNT],
    pub average: f64,
    pub percentage: f64,
    pub marks_out_of_20: f64,
}

// ******** Output data structures *********

/// The single best-period row retained for one person.
#[derive(Debug, Clone, PartialEq)]
pub struct ReducedRecord {
    pub period: String,
    /// The year of the winning observation row.
    pub highest_score_year: i32,
    pub identifier: String,
    pub given_name: String,
    pub family_name: String,
    pub scores: [f64; Component::COUNT],
    pub average: f64,
    pub marks_out_of_20: f64,
    pub percentage: f64,
}

// ********* Configuration **********

/// The evaluation years that compete for the best period. Rows with any
/// other year are dropped before the reduction.
pub const ACCEPTED_YEARS: [i32; 2] = [2024, 2025];

/// The year preferred by the final tie-break of the reducer.
pub const PREFERRED_YEAR: i32 = 2025;
