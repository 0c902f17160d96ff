mod config;
mod normalize;

use log::{debug, info};

use std::collections::{HashMap, HashSet};

pub use crate::config::*;
pub use crate::normalize::{collapse_whitespace, extract_year, normalize_identifier};

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Runs the full consolidation on already-parsed sheet data.
///
/// Arguments:
/// * `base` the union of the rows of the two base sheets, in canonical schema
/// * `auxiliary` the auxiliary sheets, each with its declared join policy
/// * `contract` the optional contract mapping. An empty mapping is treated
///   the same as no mapping at all.
///
/// The result has exactly one row per distinct identifier. An empty result is
/// a valid outcome, not an error: it means no row survived the year and
/// activity filters.
pub fn consolidate_scores(
    base: Vec<BaseRow>,
    auxiliary: &[AuxiliarySheet],
    contract: Option<&ContractMapping>,
) -> Vec<ReducedRecord> {
    info!(
        "consolidate_scores: {} base rows, {} auxiliary sheets, contract: {}",
        base.len(),
        auxiliary.len(),
        contract.map(|m| m.len()).unwrap_or(0)
    );
    let rows = reconcile(base, auxiliary, contract);
    let scored = annotate_metrics(rows);
    let candidates: Vec<ScoredRow> = scored.into_iter().filter(is_candidate).collect();
    debug!("consolidate_scores: {} candidate rows", candidates.len());
    reduce_best_period(candidates)
}

// A row competes for the best period only with an identifier and an accepted
// year.
fn is_candidate(row: &ScoredRow) -> bool {
    row.identifier.is_some() && matches!(row.year, Some(y) if ACCEPTED_YEARS.contains(&y))
}

/// Builds one wide table with one row per (person, period) observation.
///
/// The base rows are never dropped for lack of an auxiliary match; unmatched
/// components stay absent and are coerced to zero later by the metric engine.
pub fn reconcile(
    base: Vec<BaseRow>,
    auxiliary: &[AuxiliarySheet],
    contract: Option<&ContractMapping>,
) -> Vec<ObservationRow> {
    // An empty contract means "no contract filtering requested".
    let contract = contract.filter(|m| !m.is_empty());

    let mut rows: Vec<ObservationRow> = base
        .into_iter()
        .map(|b| {
            let mut scores = [None; Component::COUNT];
            scores[Component::Induction as usize] = b.induction;
            ObservationRow {
                year: extract_year(&b.period),
                period: b.period,
                identifier: normalize_identifier(&b.identifier),
                given_name: collapse_whitespace(&b.given_name),
                family_name: collapse_whitespace(&b.family_name),
                email: b.email,
                scores,
            }
        })
        .collect();

    if let Some(mapping) = contract {
        let before = rows.len();
        rows.retain(|r| matches!(&r.identifier, Some(id) if mapping.contains_key(id)));
        debug!(
            "reconcile: contract filtering kept {} of {} base rows",
            rows.len(),
            before
        );
    }

    for sheet in auxiliary.iter() {
        join_auxiliary(&mut rows, sheet);
    }

    // Contract names only fill gaps, they never override base-supplied names.
    if let Some(mapping) = contract {
        for row in rows.iter_mut() {
            if let Some(entry) = row.identifier.as_ref().and_then(|id| mapping.get(id)) {
                if row.given_name.is_empty() {
                    row.given_name = entry.given_name.clone();
                }
                if row.family_name.is_empty() {
                    row.family_name = entry.family_name.clone();
                }
            }
        }
    }

    rows
}

fn join_auxiliary(rows: &mut [ObservationRow], sheet: &AuxiliarySheet) {
    match sheet.join_key {
        JoinKey::Identifier => {
            let mut lookup: HashMap<String, &AuxiliaryRow> = HashMap::new();
            for aux in sheet.rows.iter() {
                if let Some(id) = normalize_identifier(&aux.identifier) {
                    // First occurrence wins on the auxiliary side.
                    lookup.entry(id).or_insert(aux);
                }
            }
            for row in rows.iter_mut() {
                if let Some(aux) = row.identifier.as_ref().and_then(|id| lookup.get(id)) {
                    apply_scores(row, aux);
                }
            }
        }
        JoinKey::NamePair => {
            let mut lookup: HashMap<(String, String), &AuxiliaryRow> = HashMap::new();
            for aux in sheet.rows.iter() {
                let key = (
                    collapse_whitespace(&aux.given_name),
                    collapse_whitespace(&aux.family_name),
                );
                lookup.entry(key).or_insert(aux);
            }
            for row in rows.iter_mut() {
                // The base names are already collapsed at this point.
                let key = (row.given_name.clone(), row.family_name.clone());
                if let Some(aux) = lookup.get(&key) {
                    apply_scores(row, aux);
                }
            }
        }
    }
}

fn apply_scores(row: &mut ObservationRow, aux: &AuxiliaryRow) {
    for (component, value) in aux.scores.iter() {
        row.scores[*component as usize] = *value;
    }
}

/// Coerces the component scores to numbers and annotates every row with its
/// derived metrics.
///
/// Rows whose coerced score vector does not sum to a positive number are
/// dropped here: a row representing no activity is not a candidate result.
pub fn annotate_metrics(rows: Vec<ObservationRow>) -> Vec<ScoredRow> {
    let mut res: Vec<ScoredRow> = Vec::new();
    for row in rows {
        let scores = row.coerced_scores();
        let total: f64 = scores.iter().sum();
        if total <= 0.0 {
            continue;
        }
        let average = round2(total / Component::COUNT as f64);
        // Completion, not score quality: how many components were attempted.
        let attempted = scores.iter().filter(|s| **s > 0.0).count();
        let percentage = round2(attempted as f64 / Component::COUNT as f64 * 100.0);
        let marks_out_of_20 = round2(percentage / 5.0);
        res.push(ScoredRow {
            period: row.period,
            year: row.year,
            identifier: row.identifier,
            given_name: row.given_name,
            family_name: row.family_name,
            scores,
            average,
            percentage,
            marks_out_of_20,
        });
    }
    res
}

fn year_preference(year: Option<i32>) -> u8 {
    if year == Some(PREFERRED_YEAR) {
        1
    } else {
        0
    }
}

/// Collapses the rows down to exactly one per distinct identifier.
///
/// The ranking is a composite sort key, not a sequence of filters:
/// `marks_out_of_20` descending, then `average` descending, then the year
/// preference (2025 over 2024) descending. The sort is stable, so genuine
/// duplicates within the same year keep their input order and any one of
/// them may win.
pub fn reduce_best_period(mut rows: Vec<ScoredRow>) -> Vec<ReducedRecord> {
    rows.sort_by(|a, b| {
        b.marks_out_of_20
            .total_cmp(&a.marks_out_of_20)
            .then(b.average.total_cmp(&a.average))
            .then(year_preference(b.year).cmp(&year_preference(a.year)))
    });

    let mut seen: HashSet<String> = HashSet::new();
    let mut res: Vec<ReducedRecord> = Vec::new();
    for row in rows {
        let (identifier, year) = match (row.identifier, row.year) {
            (Some(id), Some(y)) => (id, y),
            // Already excluded by the candidate filter.
            _ => continue,
        };
        if !seen.insert(identifier.clone()) {
            continue;
        }
        res.push(ReducedRecord {
            period: row.period,
            highest_score_year: year,
            identifier,
            given_name: row.given_name,
            family_name: row.family_name,
            scores: row.scores,
            average: row.average,
            marks_out_of_20: row.marks_out_of_20,
            percentage: row.percentage,
        });
    }
    info!("reduce_best_period: {} distinct persons", res.len());
    res
}
