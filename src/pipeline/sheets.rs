//! Schema mapping for the sheets of the master workbook.
//!
//! Every sheet is described by a declarative table: the canonical field each
//! source column maps to, and (for auxiliary sheets) the join policy used to
//! attach the rows to the base. Adding a sheet is a data-table edit, not new
//! branching logic.

use score_consolidation::{AuxiliaryRow, AuxiliarySheet, BaseRow, Component, JoinKey};

use log::{debug, warn};

use crate::pipeline::io_xlsx::*;
use crate::pipeline::*;

// Key columns shared by the sheets that carry them.
const IDENTIFIER_COL: &str = "DNI";
const GIVEN_NAME_COL: &str = "Nombre";
const FAMILY_NAME_COL: &str = "Apellido(s)";
const EMAIL_COL: &str = "Dirección de correo";

// The two base sheets contribute one row per (person, period) each and are
// concatenated after being mapped to the canonical schema.
struct BaseSheetSpec {
    sheet: &'static str,
    period_column: &'static str,
    score_column: &'static str,
}

const BASE_SHEETS: [BaseSheetSpec; 2] = [
    BaseSheetSpec {
        sheet: "Inducción",
        period_column: "Periodo",
        score_column: "Calificación",
    },
    BaseSheetSpec {
        sheet: "nota Inducción",
        period_column: "PERIODO",
        score_column: "Total del curso (Real)",
    },
];

struct ColumnSpec {
    column: &'static str,
    component: Component,
    required: bool,
}

struct AuxSheetSpec {
    sheet: &'static str,
    join_key: JoinKey,
    columns: &'static [ColumnSpec],
}

const AUX_SHEETS: [AuxSheetSpec; 7] = [
    AuxSheetSpec {
        sheet: "Bus. biblioteca",
        join_key: JoinKey::Identifier,
        columns: &[ColumnSpec {
            column: "Promedio",
            component: Component::Library,
            required: true,
        }],
    },
    AuxSheetSpec {
        sheet: "Diseño de sesión",
        join_key: JoinKey::NamePair,
        columns: &[ColumnSpec {
            column: "Promedio",
            component: Component::SessionDesign,
            required: true,
        }],
    },
    AuxSheetSpec {
        sheet: "Comp. Tec",
        join_key: JoinKey::NamePair,
        // The challenge columns vary across workbook exports: a missing one
        // degrades to zero instead of aborting.
        columns: &[
            ColumnSpec {
                column: "Cuestionario:Reto: Zoom básico",
                component: Component::ZoomBasic,
                required: false,
            },
            ColumnSpec {
                column: "Cuestionario:Reto: Zoom Avanzado",
                component: Component::ZoomAdvanced,
                required: false,
            },
            ColumnSpec {
                column: "Cuestionario:Reto: Grupos Moodle",
                component: Component::MoodleGroups,
                required: false,
            },
            ColumnSpec {
                column: "Cuestionario:Reto: Rúbrica",
                component: Component::Rubric,
                required: false,
            },
            ColumnSpec {
                column: "Cuestionario:Reto: Padlet",
                component: Component::Padlet,
                required: false,
            },
            ColumnSpec {
                column: "Cuestionario:Reto: Nearpod",
                component: Component::Nearpod,
                required: false,
            },
            ColumnSpec {
                column: "Cuestionario:Reto: Tareas y foros",
                component: Component::TasksForums,
                required: false,
            },
        ],
    },
    AuxSheetSpec {
        sheet: "Integración",
        join_key: JoinKey::NamePair,
        columns: &[ColumnSpec {
            column: "Tarea:Producto final: Contenido académico, presentación y rúbrica con IA (Real)",
            component: Component::Integration,
            required: true,
        }],
    },
    AuxSheetSpec {
        sheet: "RSU",
        join_key: JoinKey::Identifier,
        columns: &[ColumnSpec {
            column: "Tarea: Producto final",
            component: Component::SocialResponsibility,
            required: true,
        }],
    },
    AuxSheetSpec {
        sheet: "estress",
        join_key: JoinKey::Identifier,
        columns: &[ColumnSpec {
            column: "Tarea:Producto final",
            component: Component::StressManagement,
            required: true,
        }],
    },
    AuxSheetSpec {
        sheet: "Hab. comunicación",
        join_key: JoinKey::Identifier,
        columns: &[ColumnSpec {
            column: "Tarea:Producto final",
            component: Component::Communication,
            required: true,
        }],
    },
];

/// Reads and concatenates the two base sheets in canonical schema.
pub fn read_base_rows(workbook: &mut WorkbookBytes) -> PipelineResult<Vec<BaseRow>> {
    let mut res: Vec<BaseRow> = Vec::new();
    for spec in BASE_SHEETS.iter() {
        let range = sheet_range(workbook, spec.sheet)?;
        let headers = header_row(&range, spec.sheet)?;

        let period_col = require_column(&headers, &[spec.period_column], spec.sheet)?;
        let id_col = require_column(&headers, &[IDENTIFIER_COL], spec.sheet)?;
        let given_col = require_column(&headers, &[GIVEN_NAME_COL], spec.sheet)?;
        let family_col = require_column(&headers, &[FAMILY_NAME_COL], spec.sheet)?;
        let score_col = require_column(&headers, &[spec.score_column], spec.sheet)?;
        let email_col = find_column(&headers, &[EMAIL_COL]);

        let before = res.len();
        for row in range.rows().skip(1) {
            res.push(BaseRow {
                period: cell_to_string(row_cell(row, period_col)),
                identifier: cell_to_string(row_cell(row, id_col)),
                given_name: cell_to_string(row_cell(row, given_col)),
                family_name: cell_to_string(row_cell(row, family_col)),
                email: email_col
                    .map(|idx| cell_to_string(row_cell(row, idx)))
                    .filter(|s| !s.is_empty()),
                induction: cell_to_score(row_cell(row, score_col)),
            });
        }
        debug!(
            "read_base_rows: sheet '{}' contributed {} rows",
            spec.sheet,
            res.len() - before
        );
    }
    Ok(res)
}

enum KeyColumns {
    Identifier(usize),
    NamePair(usize, usize),
}

/// Reads all the auxiliary sheets, each with its declared join policy.
pub fn read_auxiliary_sheets(workbook: &mut WorkbookBytes) -> PipelineResult<Vec<AuxiliarySheet>> {
    let mut res: Vec<AuxiliarySheet> = Vec::new();
    for spec in AUX_SHEETS.iter() {
        let range = sheet_range(workbook, spec.sheet)?;
        let headers = header_row(&range, spec.sheet)?;

        let key_columns = match spec.join_key {
            JoinKey::Identifier => {
                KeyColumns::Identifier(require_column(&headers, &[IDENTIFIER_COL], spec.sheet)?)
            }
            JoinKey::NamePair => KeyColumns::NamePair(
                require_column(&headers, &[GIVEN_NAME_COL], spec.sheet)?,
                require_column(&headers, &[FAMILY_NAME_COL], spec.sheet)?,
            ),
        };

        let mut score_columns: Vec<(usize, Component)> = Vec::new();
        for col in spec.columns.iter() {
            match find_column(&headers, &[col.column]) {
                Some(idx) => score_columns.push((idx, col.component)),
                None if col.required => {
                    return MissingColumnSnafu {
                        sheet: spec.sheet,
                        column: col.column,
                    }
                    .fail();
                }
                None => {
                    warn!(
                        "sheet '{}': optional column '{}' not found, component defaults to zero",
                        spec.sheet, col.column
                    );
                }
            }
        }

        let mut rows: Vec<AuxiliaryRow> = Vec::new();
        for row in range.rows().skip(1) {
            let (identifier, given_name, family_name) = match &key_columns {
                KeyColumns::Identifier(idx) => (
                    cell_to_string(row_cell(row, *idx)),
                    String::new(),
                    String::new(),
                ),
                KeyColumns::NamePair(given_idx, family_idx) => (
                    String::new(),
                    cell_to_string(row_cell(row, *given_idx)),
                    cell_to_string(row_cell(row, *family_idx)),
                ),
            };
            rows.push(AuxiliaryRow {
                identifier,
                given_name,
                family_name,
                scores: score_columns
                    .iter()
                    .map(|(idx, component)| (*component, cell_to_score(row_cell(row, *idx))))
                    .collect(),
            });
        }
        debug!(
            "read_auxiliary_sheets: sheet '{}': {} rows, {} score columns",
            spec.sheet,
            rows.len(),
            score_columns.len()
        );
        res.push(AuxiliarySheet {
            join_key: spec.join_key,
            rows,
        });
    }
    Ok(res)
}
