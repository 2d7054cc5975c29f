use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Positional layout of one logical table in the spreadsheet.
///
/// The header occupies row 1; data starts at row 2. Writes always replace the
/// whole data region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableLayout {
    pub sheet_name: &'static str,
    pub range: &'static str,
    pub columns: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    UnitAssignment,
    UnitMaster,
    UtilityCost,
    MealCount,
    RefundDetail,
}

impl TableKind {
    pub const fn layout(self) -> TableLayout {
        match self {
            TableKind::UnitAssignment => TableLayout {
                sheet_name: "ユニット管理",
                range: "A:O",
                columns: 15,
            },
            TableKind::UnitMaster => TableLayout {
                sheet_name: "ユニットマスタ",
                range: "A:C",
                columns: 3,
            },
            TableKind::UtilityCost => TableLayout {
                sheet_name: "ユニット別光熱費",
                range: "A:G",
                columns: 7,
            },
            TableKind::MealCount => TableLayout {
                sheet_name: "食数計算",
                range: "A:I",
                columns: 9,
            },
            TableKind::RefundDetail => TableLayout {
                sheet_name: "還元金明細",
                range: "A:N",
                columns: 14,
            },
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TableKind::UnitAssignment => "UnitAssignment",
            TableKind::UnitMaster => "UnitMaster",
            TableKind::UtilityCost => "UtilityCost",
            TableKind::MealCount => "MealCount",
            TableKind::RefundDetail => "RefundDetail",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single cell written back to the spreadsheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Integer(v) => write!(f, "{}", v),
            CellValue::Number(v) => write!(f, "{}", v),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

/// One resident's unit membership and unit prices for one month.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UnitAssignment {
    #[schemars(description = "Calendar month in YYYY-MM format")]
    pub month: String,

    #[schemars(description = "Stable resident identifier. The only join key for residents.")]
    pub resident_id: String,

    #[schemars(description = "Display name. Never used for joins.")]
    pub resident_name: String,

    pub unit_name: String,
    pub deposit_amount: f64,
    pub rent: f64,

    #[schemars(
        description = "Non-positive adjustment added to the unit's base rent. Effective rent is floored at zero."
    )]
    pub rent_subsidy: f64,

    pub daily_goods_fee: f64,
    pub maintenance_fee: f64,

    #[schemars(description = "Price per breakfast for this resident in this month")]
    pub breakfast_unit_price: f64,
    pub lunch_unit_price: f64,
    pub dinner_unit_price: f64,
    pub event_meal_unit_price: f64,

    pub utility_shared_fee: f64,
    pub management_fee: f64,
    pub fire_insurance_fee: f64,
    pub food_material_fee: f64,
    pub notes: String,
}

/// Reference rent and utility share for a unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UnitMaster {
    pub unit_name: String,
    pub rent: f64,

    #[schemars(
        description = "Percentage (0-100) of the unit's monthly utility total that is shared among its residents"
    )]
    pub utility_allocation_percent: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct UtilityCost {
    pub month: String,
    pub unit_name: String,
    pub electricity: f64,
    pub gas: f64,
    pub water: f64,
    pub sub: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct MealCount {
    pub month: String,
    pub resident_id: String,
    pub resident_name: String,
    pub unit_name: String,
    pub breakfast_count: f64,
    pub lunch_count: f64,
    pub dinner_count: f64,
    pub event_meal_count: f64,
    pub notes: String,
}

/// Computed refund for one resident in one month. Also the persisted record.
///
/// Monetary fields are whole currency units; rounding happens once when the
/// record is produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct RefundDetail {
    pub month: String,
    pub resident_id: String,
    pub resident_name: String,
    pub unit_name: String,
    pub deposit_amount: i64,

    #[schemars(description = "Effective rent charged: max(0, unit rent + rent subsidy)")]
    pub rent: i64,

    #[schemars(description = "Rent subsidy applied. Not part of the persisted column layout.")]
    pub rent_subsidy: i64,

    pub utility_fee: i64,
    pub daily_goods: i64,
    pub maintenance_fee: i64,
    pub food_total: i64,
    pub management_fee: i64,
    pub fire_insurance: i64,
    pub carry_over: i64,

    #[schemars(
        description = "Signed balance: positive is returned to the resident, negative is owed by the resident"
    )]
    pub net_refund_total: i64,
}

impl RefundDetail {
    /// Sum of every monthly charge deducted from the deposit.
    pub fn total_expense(&self) -> i64 {
        self.rent
            + self.daily_goods
            + self.maintenance_fee
            + self.food_total
            + self.utility_fee
            + self.management_fee
            + self.fire_insurance
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(RefundDetail)
    }
}

/// The four input tables a calculation joins over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputTables {
    pub unit_assignments: Vec<UnitAssignment>,
    pub unit_masters: Vec<UnitMaster>,
    pub utility_costs: Vec<UtilityCost>,
    pub meal_counts: Vec<MealCount>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_column_counts() {
        assert_eq!(TableKind::UnitAssignment.layout().columns, 15);
        assert_eq!(TableKind::UnitMaster.layout().columns, 3);
        assert_eq!(TableKind::UtilityCost.layout().columns, 7);
        assert_eq!(TableKind::MealCount.layout().columns, 9);
        assert_eq!(TableKind::RefundDetail.layout().columns, 14);
    }

    #[test]
    fn test_cell_value_serializes_untagged() {
        let row = vec![
            CellValue::from("2024-04"),
            CellValue::from(20500_i64),
            CellValue::from(1.5),
        ];
        let json = serde_json::to_string(&row).unwrap();
        assert_eq!(json, r#"["2024-04",20500,1.5]"#);
    }

    #[test]
    fn test_total_expense() {
        let detail = RefundDetail {
            rent: 40000,
            daily_goods: 1000,
            maintenance_fee: 500,
            food_total: 32000,
            utility_fee: 7500,
            management_fee: 300,
            fire_insurance: 200,
            carry_over: 999,
            ..Default::default()
        };
        assert_eq!(detail.total_expense(), 81500);
    }

    #[test]
    fn test_refund_detail_schema_lists_fields() {
        let schema = RefundDetail::generate_json_schema();
        let json = serde_json::to_value(&schema).unwrap();
        let properties = json["properties"].as_object().unwrap();
        assert!(properties.contains_key("net_refund_total"));
        assert!(properties.contains_key("utility_fee"));
    }
}
