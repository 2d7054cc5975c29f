use crate::schema::UnitAssignment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferEvent {
    /// First month in the new unit
    pub month: String,
    pub from_unit: String,
    pub to_unit: String,
}

/// Every unit change for one resident, in calendar order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTransfer {
    pub resident_id: String,
    pub resident_name: String,
    pub changes: Vec<TransferEvent>,
}

/// Reports month-over-month unit changes per resident.
///
/// Residents are grouped by ID and returned in ID order; residents who never
/// changed unit are omitted. "YYYY-MM" strings sort chronologically as text.
pub fn detect_unit_transfers(assignments: &[UnitAssignment]) -> Vec<UnitTransfer> {
    let mut history: BTreeMap<&str, Vec<&UnitAssignment>> = BTreeMap::new();
    for a in assignments {
        history.entry(a.resident_id.as_str()).or_default().push(a);
    }

    history
        .into_iter()
        .filter_map(|(resident_id, mut rows)| {
            rows.sort_by(|a, b| a.month.cmp(&b.month));

            let changes: Vec<TransferEvent> = rows
                .windows(2)
                .filter(|pair| pair[0].unit_name != pair[1].unit_name)
                .map(|pair| TransferEvent {
                    month: pair[1].month.clone(),
                    from_unit: pair[0].unit_name.clone(),
                    to_unit: pair[1].unit_name.clone(),
                })
                .collect();

            if changes.is_empty() {
                return None;
            }

            Some(UnitTransfer {
                resident_id: resident_id.to_string(),
                resident_name: rows[0].resident_name.clone(),
                changes,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(month: &str, id: &str, unit: &str) -> UnitAssignment {
        UnitAssignment {
            month: month.to_string(),
            resident_id: id.to_string(),
            resident_name: format!("Name {}", id),
            unit_name: unit.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_two_transfers_over_five_months() {
        let rows = vec![
            assignment("2024-04", "U001", "A"),
            assignment("2024-05", "U001", "A"),
            assignment("2024-06", "U001", "B"),
            assignment("2024-07", "U001", "B"),
            assignment("2024-08", "U001", "C"),
        ];
        let transfers = detect_unit_transfers(&rows);

        assert_eq!(transfers.len(), 1);
        assert_eq!(
            transfers[0].changes,
            vec![
                TransferEvent {
                    month: "2024-06".to_string(),
                    from_unit: "A".to_string(),
                    to_unit: "B".to_string(),
                },
                TransferEvent {
                    month: "2024-08".to_string(),
                    from_unit: "B".to_string(),
                    to_unit: "C".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_unsorted_input_and_stationary_residents() {
        let rows = vec![
            assignment("2024-06", "U002", "B"),
            assignment("2024-05", "U001", "A"),
            assignment("2024-04", "U002", "A"),
            assignment("2024-04", "U001", "A"),
        ];
        let transfers = detect_unit_transfers(&rows);

        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].resident_id, "U002");
        assert_eq!(transfers[0].changes[0].month, "2024-06");
        assert_eq!(transfers[0].changes[0].from_unit, "A");
        // Input untouched.
        assert_eq!(rows[0].month, "2024-06");
    }

    #[test]
    fn test_return_to_previous_unit_counts() {
        let rows = vec![
            assignment("2024-04", "U001", "A"),
            assignment("2024-05", "U001", "B"),
            assignment("2024-06", "U001", "A"),
        ];
        assert_eq!(detect_unit_transfers(&rows)[0].changes.len(), 2);
    }

    #[test]
    fn test_empty_input() {
        assert!(detect_unit_transfers(&[]).is_empty());
    }
}
