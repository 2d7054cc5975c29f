use crate::error::{RefundError, Result};
use crate::ingestion::{looks_like_column_swap, SheetRecord, COLUMN_SWAP_SAMPLE_ROWS};
use crate::schema::{InputTables, MealCount, TableKind, UnitAssignment, UtilityCost};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Months a resident is expected to appear in per fiscal cycle.
pub const EXPECTED_MONTHS_PER_YEAR: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    MissingMonth,
    MissingUtility,
    MissingMeal,
    DuplicateKey,
    ColumnSwap,
}

/// Advisory finding about the input data. Never blocks calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationWarning {
    pub kind: WarningKind,
    pub message: String,
    pub details: String,
}

/// Cross-checks completeness of the monthly tables against unit assignments.
pub struct DataValidator<'a> {
    assignments: &'a [UnitAssignment],
    utility_costs: &'a [UtilityCost],
    meal_counts: &'a [MealCount],
}

impl<'a> DataValidator<'a> {
    pub fn new(
        assignments: &'a [UnitAssignment],
        utility_costs: &'a [UtilityCost],
        meal_counts: &'a [MealCount],
    ) -> Self {
        Self {
            assignments,
            utility_costs,
            meal_counts,
        }
    }

    pub fn validate(&self) -> Vec<ValidationWarning> {
        let mut warnings = self.check_missing_months();
        warnings.extend(self.check_missing_utility());
        warnings.extend(self.check_missing_meals());
        warnings
    }

    fn check_missing_months(&self) -> Vec<ValidationWarning> {
        let mut months: BTreeMap<&str, (&str, BTreeSet<&str>)> = BTreeMap::new();
        for a in self.assignments {
            months
                .entry(a.resident_id.as_str())
                .or_insert_with(|| (a.resident_name.as_str(), BTreeSet::new()))
                .1
                .insert(a.month.as_str());
        }

        months
            .into_iter()
            .filter(|(_, (_, seen))| seen.len() < EXPECTED_MONTHS_PER_YEAR)
            .map(|(id, (name, seen))| ValidationWarning {
                kind: WarningKind::MissingMonth,
                message: format!(
                    "{} ({}): {} month(s) of data missing",
                    name,
                    id,
                    EXPECTED_MONTHS_PER_YEAR - seen.len()
                ),
                details: format!(
                    "Registered months: {}/{}",
                    seen.len(),
                    EXPECTED_MONTHS_PER_YEAR
                ),
            })
            .collect()
    }

    fn check_missing_utility(&self) -> Vec<ValidationWarning> {
        let available: HashSet<(&str, &str)> = self
            .utility_costs
            .iter()
            .map(|u| (u.month.as_str(), u.unit_name.as_str()))
            .collect();

        // (month, unit) -> affected residents, in first-seen order
        let mut missing: Vec<((&str, &str), Vec<&str>)> = Vec::new();
        let mut positions: HashMap<(&str, &str), usize> = HashMap::new();
        for a in self.assignments {
            let key = (a.month.as_str(), a.unit_name.as_str());
            if available.contains(&key) {
                continue;
            }
            let idx = *positions.entry(key).or_insert_with(|| {
                missing.push((key, Vec::new()));
                missing.len() - 1
            });
            missing[idx].1.push(a.resident_id.as_str());
        }

        missing
            .into_iter()
            .map(|((month, unit), residents)| ValidationWarning {
                kind: WarningKind::MissingUtility,
                message: format!("{} {}: no utility cost data", month, unit),
                details: format!("Affected residents: {}", residents.join(", ")),
            })
            .collect()
    }

    fn check_missing_meals(&self) -> Vec<ValidationWarning> {
        let available: HashSet<(&str, &str)> = self
            .meal_counts
            .iter()
            .map(|m| (m.month.as_str(), m.resident_id.as_str()))
            .collect();

        let mut reported = HashSet::new();
        self.assignments
            .iter()
            .filter(|a| !available.contains(&(a.month.as_str(), a.resident_id.as_str())))
            .filter(|a| reported.insert((a.month.as_str(), a.resident_id.as_str())))
            .map(|a| ValidationWarning {
                kind: WarningKind::MissingMeal,
                message: format!("{} {}: no meal count data", a.month, a.resident_name),
                details: format!("Resident ID: {}", a.resident_id),
            })
            .collect()
    }
}

pub fn validate_data(
    assignments: &[UnitAssignment],
    utility_costs: &[UtilityCost],
    meal_counts: &[MealCount],
) -> Vec<ValidationWarning> {
    DataValidator::new(assignments, utility_costs, meal_counts).validate()
}

/// A natural key that appears more than once in a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateKey {
    pub table: TableKind,
    pub key: String,
    pub occurrences: usize,
}

impl DuplicateKey {
    /// Duplicates in these tables make joins ambiguous.
    pub fn affects_joins(&self) -> bool {
        matches!(
            self.table,
            TableKind::UnitMaster | TableKind::UtilityCost | TableKind::MealCount
        )
    }

    pub fn to_warning(&self) -> ValidationWarning {
        ValidationWarning {
            kind: WarningKind::DuplicateKey,
            message: format!("{}: key {} appears {} times", self.table, self.key, self.occurrences),
            details: if self.affects_joins() {
                "The first row in table order is used".to_string()
            } else {
                "Each row is counted as a unit member".to_string()
            },
        }
    }
}

fn duplicates<I>(table: TableKind, keys: I) -> Vec<DuplicateKey>
where
    I: IntoIterator<Item = String>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(key, occurrences)| DuplicateKey {
            table,
            key,
            occurrences,
        })
        .collect()
}

/// Finds repeated natural keys across all input tables.
pub fn find_duplicate_keys(tables: &InputTables) -> Vec<DuplicateKey> {
    let mut found = duplicates(
        TableKind::UnitAssignment,
        tables
            .unit_assignments
            .iter()
            .map(|a| format!("({}, {})", a.month, a.resident_id)),
    );
    found.extend(duplicates(
        TableKind::UnitMaster,
        tables.unit_masters.iter().map(|u| u.unit_name.clone()),
    ));
    found.extend(duplicates(
        TableKind::UtilityCost,
        tables
            .utility_costs
            .iter()
            .map(|u| format!("({}, {})", u.month, u.unit_name)),
    ));
    found.extend(duplicates(
        TableKind::MealCount,
        tables
            .meal_counts
            .iter()
            .map(|m| format!("({}, {})", m.month, m.resident_id)),
    ));
    found
}

/// Fails on the first duplicate join key. Used in strict mode.
pub fn ensure_unique_join_keys(tables: &InputTables) -> Result<()> {
    match find_duplicate_keys(tables)
        .into_iter()
        .find(DuplicateKey::affects_joins)
    {
        Some(dup) => Err(RefundError::DuplicateKey {
            table: dup.table.to_string(),
            key: dup.key,
        }),
        None => Ok(()),
    }
}

/// Re-runs the column-swap heuristic over already-typed records.
///
/// Like the parser, only the first [`COLUMN_SWAP_SAMPLE_ROWS`] records of
/// each table are sampled. Useful for records that did not come through
/// `parse_rows`; loaded sessions already carry the parse diagnostics.
pub fn check_column_swaps(
    assignments: &[UnitAssignment],
    meal_counts: &[MealCount],
) -> Vec<ValidationWarning> {
    sampled_column_swaps(assignments)
        .chain(sampled_column_swaps(meal_counts))
        .collect()
}

fn sampled_column_swaps<T: SheetRecord>(
    records: &[T],
) -> impl Iterator<Item = ValidationWarning> + '_ {
    records
        .iter()
        .take(COLUMN_SWAP_SAMPLE_ROWS)
        .enumerate()
        .filter_map(|(index, record)| {
            let (id, name) = record.identity()?;
            looks_like_column_swap(id, name).then(|| ValidationWarning {
                kind: WarningKind::ColumnSwap,
                message: format!(
                    "{} row {}: ID \"{}\" looks like a name",
                    T::TABLE,
                    index + 2,
                    id
                ),
                details: format!("Name column holds \"{}\"", name),
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::UnitMaster;

    fn assignment(month: &str, id: &str, unit: &str) -> UnitAssignment {
        UnitAssignment {
            month: month.to_string(),
            resident_id: id.to_string(),
            resident_name: format!("Name {}", id),
            unit_name: unit.to_string(),
            ..Default::default()
        }
    }

    fn full_year(id: &str, unit: &str) -> Vec<UnitAssignment> {
        (4..=12)
            .map(|m| format!("2024-{:02}", m))
            .chain((1..=3).map(|m| format!("2025-{:02}", m)))
            .map(|month| assignment(&month, id, unit))
            .collect()
    }

    fn utility(month: &str, unit: &str) -> UtilityCost {
        UtilityCost {
            month: month.to_string(),
            unit_name: unit.to_string(),
            ..Default::default()
        }
    }

    fn meal(month: &str, id: &str) -> MealCount {
        MealCount {
            month: month.to_string(),
            resident_id: id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_complete_year_has_no_warnings() {
        let assignments = full_year("U001", "A");
        let utilities: Vec<_> = assignments.iter().map(|a| utility(&a.month, "A")).collect();
        let meals: Vec<_> = assignments.iter().map(|a| meal(&a.month, "U001")).collect();

        assert!(validate_data(&assignments, &utilities, &meals).is_empty());
    }

    #[test]
    fn test_missing_month() {
        let mut assignments = full_year("U001", "A");
        assignments.truncate(10);
        let utilities: Vec<_> = assignments.iter().map(|a| utility(&a.month, "A")).collect();
        let meals: Vec<_> = assignments.iter().map(|a| meal(&a.month, "U001")).collect();

        let warnings = validate_data(&assignments, &utilities, &meals);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::MissingMonth);
        assert!(warnings[0].message.contains("2 month(s)"));
        assert_eq!(warnings[0].details, "Registered months: 10/12");
    }

    #[test]
    fn test_duplicate_months_do_not_count_twice() {
        let mut assignments = full_year("U001", "A");
        assignments.truncate(11);
        assignments.push(assignments[0].clone());
        let warnings = validate_data(&assignments, &[], &[]);
        assert!(warnings
            .iter()
            .any(|w| w.kind == WarningKind::MissingMonth && w.details == "Registered months: 11/12"));
    }

    #[test]
    fn test_missing_utility_grouped_by_month_and_unit() {
        let assignments = vec![
            assignment("2024-04", "U001", "A"),
            assignment("2024-04", "U002", "A"),
            assignment("2024-04", "U003", "B"),
        ];
        let utilities = vec![utility("2024-04", "B"), utility("2024-05", "A")];
        let meals: Vec<_> = assignments.iter().map(|a| meal(&a.month, &a.resident_id)).collect();

        let warnings: Vec<_> = validate_data(&assignments, &utilities, &meals)
            .into_iter()
            .filter(|w| w.kind == WarningKind::MissingUtility)
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("2024-04 A"));
        assert_eq!(warnings[0].details, "Affected residents: U001, U002");
    }

    #[test]
    fn test_missing_meal_joins_on_id_not_name() {
        let assignments = vec![assignment("2024-04", "U001", "A")];
        let utilities = vec![utility("2024-04", "A")];
        let meals = vec![MealCount {
            month: "2024-04".to_string(),
            resident_id: "U999".to_string(),
            resident_name: "Name U001".to_string(),
            ..Default::default()
        }];

        let warnings = validate_data(&assignments, &utilities, &meals);
        assert!(warnings.iter().any(|w| w.kind == WarningKind::MissingMeal
            && w.details == "Resident ID: U001"));
    }

    #[test]
    fn test_find_duplicate_keys() {
        let tables = InputTables {
            unit_assignments: vec![assignment("2024-04", "U001", "A")],
            unit_masters: vec![
                UnitMaster {
                    unit_name: "A".to_string(),
                    ..Default::default()
                },
                UnitMaster {
                    unit_name: "A".to_string(),
                    ..Default::default()
                },
            ],
            utility_costs: vec![utility("2024-04", "A")],
            meal_counts: vec![meal("2024-04", "U001"), meal("2024-04", "U001")],
        };

        let dups = find_duplicate_keys(&tables);
        assert_eq!(dups.len(), 2);
        assert_eq!(dups[0].table, TableKind::UnitMaster);
        assert_eq!(dups[0].occurrences, 2);
        assert_eq!(dups[1].key, "(2024-04, U001)");

        assert!(matches!(
            ensure_unique_join_keys(&tables),
            Err(RefundError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_duplicate_assignments_do_not_fail_strict_check() {
        let tables = InputTables {
            unit_assignments: vec![
                assignment("2024-04", "U001", "A"),
                assignment("2024-04", "U001", "A"),
            ],
            ..Default::default()
        };
        assert_eq!(find_duplicate_keys(&tables).len(), 1);
        assert!(ensure_unique_join_keys(&tables).is_ok());
    }

    #[test]
    fn test_check_column_swaps_on_typed_records() {
        let mut swapped = assignment("2024-04", "U1", "A");
        swapped.resident_id = "山田 太郎".to_string();
        swapped.resident_name = "U1".to_string();

        let warnings = check_column_swaps(&[swapped, assignment("2024-04", "U002", "A")], &[]);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].kind, WarningKind::ColumnSwap);
        assert!(warnings[0].message.contains("row 2"));
    }

    #[test]
    fn test_column_swaps_sampled_per_table() {
        let swapped = |month: &str| {
            let mut a = assignment(month, "U1", "A");
            a.resident_id = "山田 太郎".to_string();
            a.resident_name = "U1".to_string();
            a
        };
        let mut assignments: Vec<UnitAssignment> = (1..=6)
            .map(|m| assignment(&format!("2024-{:02}", m), "U001", "A"))
            .collect();
        // Seventh data row, outside the sample.
        assignments.push(swapped("2024-07"));
        assert!(check_column_swaps(&assignments, &[]).is_empty());

        let meals = vec![MealCount {
            month: "2024-04".to_string(),
            resident_id: "佐藤 花子".to_string(),
            resident_name: "U2".to_string(),
            ..Default::default()
        }];
        let warnings = check_column_swaps(&assignments, &meals);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.starts_with(&TableKind::MealCount.to_string()));
    }
}
