use crate::schema::RefundDetail;
use crate::utils::compare_fiscal_months;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Annual totals for one resident plus their monthly records in fiscal order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResidentSummary {
    pub resident_id: String,
    pub resident_name: String,
    pub annual_deposit_total: i64,
    pub annual_expense_total: i64,
    pub annual_refund_total: i64,
    pub monthly: Vec<RefundDetail>,
}

impl ResidentSummary {
    fn new(first: &RefundDetail) -> Self {
        Self {
            resident_id: first.resident_id.clone(),
            resident_name: first.resident_name.clone(),
            annual_deposit_total: 0,
            annual_expense_total: 0,
            annual_refund_total: 0,
            monthly: Vec::new(),
        }
    }

    fn add(&mut self, detail: &RefundDetail) {
        self.annual_deposit_total += detail.deposit_amount;
        self.annual_expense_total += detail.total_expense();
        self.annual_refund_total += detail.net_refund_total;
        self.monthly.push(detail.clone());
    }
}

/// Compares display names by their Unicode lowercase form, falling back to
/// the raw text. This is plain code-point order, not locale collation: kana
/// readings and kanji are not interleaved the way a Japanese collator would.
pub fn compare_display_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Groups refunds by resident ID and totals them.
///
/// Summaries are ordered by display name (ties by ID); the monthly list of
/// each summary is in fiscal-year order.
pub fn summarize_by_resident(refunds: &[RefundDetail]) -> Vec<ResidentSummary> {
    let mut order: Vec<ResidentSummary> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for detail in refunds {
        let idx = *index.entry(detail.resident_id.as_str()).or_insert_with(|| {
            order.push(ResidentSummary::new(detail));
            order.len() - 1
        });
        order[idx].add(detail);
    }

    for summary in &mut order {
        summary
            .monthly
            .sort_by(|a, b| compare_fiscal_months(&a.month, &b.month));
    }

    order.sort_by(|a, b| {
        compare_display_names(&a.resident_name, &b.resident_name)
            .then_with(|| a.resident_id.cmp(&b.resident_id))
    });
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detail(month: &str, id: &str, name: &str, deposit: i64, rent: i64) -> RefundDetail {
        RefundDetail {
            month: month.to_string(),
            resident_id: id.to_string(),
            resident_name: name.to_string(),
            unit_name: "A".to_string(),
            deposit_amount: deposit,
            rent,
            food_total: 1_000,
            carry_over: 50,
            net_refund_total: deposit - rent - 1_000,
            ..Default::default()
        }
    }

    #[test]
    fn test_totals_per_resident() {
        let refunds = vec![
            detail("2024-04", "U001", "Sato", 100_000, 40_000),
            detail("2024-05", "U001", "Sato", 100_000, 40_000),
            detail("2024-04", "U002", "Abe", 80_000, 50_000),
        ];
        let summaries = summarize_by_resident(&refunds);

        assert_eq!(summaries.len(), 2);
        let sato = summaries.iter().find(|s| s.resident_id == "U001").unwrap();
        assert_eq!(sato.annual_deposit_total, 200_000);
        assert_eq!(sato.annual_expense_total, 82_000);
        assert_eq!(sato.annual_refund_total, 118_000);
        assert_eq!(sato.monthly.len(), 2);
    }

    #[test]
    fn test_sorted_by_display_name() {
        let refunds = vec![
            detail("2024-04", "U003", "sato", 1, 0),
            detail("2024-04", "U001", "Yamada", 1, 0),
            detail("2024-04", "U002", "Abe", 1, 0),
        ];
        let names: Vec<String> = summarize_by_resident(&refunds)
            .into_iter()
            .map(|s| s.resident_name)
            .collect();
        assert_eq!(names, vec!["Abe", "sato", "Yamada"]);
    }

    #[test]
    fn test_grouped_by_id_not_name() {
        let refunds = vec![
            detail("2024-04", "U001", "Sato", 1, 0),
            detail("2024-04", "U002", "Sato", 1, 0),
        ];
        let summaries = summarize_by_resident(&refunds);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].resident_id, "U001");
    }

    #[test]
    fn test_monthly_in_fiscal_order() {
        let refunds: Vec<RefundDetail> = ["2025-03", "2024-04", "2025-01", "2024-12", "2024-05"]
            .iter()
            .map(|m| detail(m, "U001", "Sato", 1, 0))
            .collect();
        let summaries = summarize_by_resident(&refunds);
        let months: Vec<&str> = summaries[0].monthly.iter().map(|d| d.month.as_str()).collect();
        assert_eq!(months, vec!["2024-04", "2024-05", "2024-12", "2025-01", "2025-03"]);
    }

    #[test]
    fn test_empty() {
        assert!(summarize_by_resident(&[]).is_empty());
    }
}
