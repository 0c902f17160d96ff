//! Loader for the optional teacher-contract workbook.
//!
//! The contract exports come from a different system and the headers are not
//! stable, so every logical field has an ordered list of accepted spellings,
//! and the identifier column additionally has a token-based fallback.

use score_consolidation::{collapse_whitespace, normalize_identifier, ContractEntry, ContractMapping};

use calamine::{Reader, Xlsx};
use log::{debug, warn};
use snafu::prelude::*;
use std::io::Cursor;

use crate::pipeline::io_xlsx::*;
use crate::pipeline::*;

const IDENTIFIER_HEADERS: [&str; 4] = [
    "N° DE DOCUMENTO DE IDENTIDAD",
    "N° DE DOCUMENTO DE IDENTIDAD ",
    "NRO DE DOCUMENTO DE IDENTIDAD",
    "NRO DE DOCUMENTO",
];
const GIVEN_NAME_HEADERS: [&str; 2] = ["NOMBRES", "Nombres"];
const PATERNAL_HEADERS: [&str; 2] = ["APELLIDO PATERNO", "Apellido Paterno"];
const MATERNAL_HEADERS: [&str; 2] = ["APELLIDO MATERNO", "Apellido Materno"];

// Fallback predicate for the identifier column.
fn identifier_fallback(header: &str) -> bool {
    let upper = header.to_uppercase();
    upper.contains("DOCUMENTO") && upper.contains("IDENTIDAD")
}

struct ContractColumns {
    identifier: usize,
    given_name: usize,
    paternal: usize,
    maternal: usize,
}

fn locate_columns(headers: &[String]) -> Option<ContractColumns> {
    let identifier = find_column(headers, &IDENTIFIER_HEADERS)
        .or_else(|| headers.iter().position(|h| identifier_fallback(h)))?;
    Some(ContractColumns {
        identifier,
        given_name: find_column(headers, &GIVEN_NAME_HEADERS)?,
        paternal: find_column(headers, &PATERNAL_HEADERS)?,
        maternal: find_column(headers, &MATERNAL_HEADERS)?,
    })
}

/// Reads the contract workbook into an identifier -> names mapping.
///
/// When the required columns cannot be located the result is an empty
/// mapping, which callers treat as "no contract filtering requested". Rows
/// with no usable identifier are skipped; duplicate identifiers keep the
/// first occurrence.
pub fn load_contract(bytes: &[u8]) -> PipelineResult<ContractMapping> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).context(OpeningExcelSnafu {
        origin: "contract workbook",
    })?;
    let range = first_sheet_range(&mut workbook)?;
    let headers = header_row(&range, "contract")?;

    let columns = match locate_columns(&headers) {
        Some(c) => c,
        None => {
            warn!(
                "contract workbook: could not locate the required columns, \
                 skipping contract filtering; headers: {:?}",
                headers
            );
            return Ok(ContractMapping::new());
        }
    };

    let mut mapping = ContractMapping::new();
    for row in range.rows().skip(1) {
        let identifier = match normalize_identifier(&cell_to_string(row_cell(row, columns.identifier))) {
            Some(id) => id,
            None => continue,
        };
        let given_name = collapse_whitespace(&cell_to_string(row_cell(row, columns.given_name)));
        let family_name = collapse_whitespace(&format!(
            "{} {}",
            cell_to_string(row_cell(row, columns.paternal)),
            cell_to_string(row_cell(row, columns.maternal))
        ));
        mapping.entry(identifier).or_insert(ContractEntry {
            given_name,
            family_name,
        });
    }
    debug!("load_contract: {} distinct identifiers", mapping.len());
    Ok(mapping)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn locates_exact_headers() {
        let hs = headers(&[
            "N° DE DOCUMENTO DE IDENTIDAD",
            "NOMBRES",
            "APELLIDO PATERNO",
            "APELLIDO MATERNO",
        ]);
        let cols = locate_columns(&hs).unwrap();
        assert_eq!(cols.identifier, 0);
        assert_eq!(cols.given_name, 1);
        assert_eq!(cols.paternal, 2);
        assert_eq!(cols.maternal, 3);
    }

    #[test]
    fn identifier_falls_back_to_token_match() {
        let hs = headers(&[
            "Nro. de Documento de Identidad (DNI)",
            "Nombres",
            "Apellido Paterno",
            "Apellido Materno",
        ]);
        let cols = locate_columns(&hs).unwrap();
        assert_eq!(cols.identifier, 0);
    }

    #[test]
    fn missing_column_yields_none() {
        let hs = headers(&["N° DE DOCUMENTO DE IDENTIDAD", "NOMBRES", "APELLIDO PATERNO"]);
        assert!(locate_columns(&hs).is_none());
    }

    #[test]
    fn fallback_requires_both_tokens() {
        assert!(identifier_fallback("nro documento de identidad"));
        assert!(!identifier_fallback("NRO DE DOCUMENTO"));
        assert!(!identifier_fallback("IDENTIDAD"));
    }
}
