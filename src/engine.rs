use crate::schema::{InputTables, MealCount, RefundDetail, UnitAssignment, UnitMaster, UtilityCost};
use crate::utils::round_currency;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which optional joins found a match for one assignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinStatus {
    pub unit_master: bool,
    pub utility_cost: bool,
    pub meal_count: bool,
}

impl JoinStatus {
    pub fn is_complete(&self) -> bool {
        self.unit_master && self.utility_cost && self.meal_count
    }
}

/// Intermediate values behind one refund, rounded like the stored record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChargeBreakdown {
    pub unit_rent: i64,
    pub rent_subsidy: i64,
    pub breakfast_fee: i64,
    pub lunch_fee: i64,
    pub dinner_fee: i64,
    pub event_meal_fee: i64,
    pub utility_total: i64,
    pub utility_allocation_percent: f64,
    pub unit_member_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedRefund {
    pub detail: RefundDetail,
    pub breakdown: ChargeBreakdown,
    pub joins: JoinStatus,
}

/// Batch-level tallies for one calculation run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationReport {
    pub total: usize,
    pub complete: usize,
    pub partial: usize,
    pub missing_unit_master: usize,
    pub missing_utility: usize,
    pub missing_meal: usize,
    pub total_deposit: i64,
    pub total_expense: i64,
    pub total_refund: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefundCalculation {
    pub refunds: Vec<CalculatedRefund>,
    pub report: CalculationReport,
}

impl RefundCalculation {
    pub fn details(&self) -> Vec<RefundDetail> {
        self.refunds.iter().map(|r| r.detail.clone()).collect()
    }
}

/// Joins the four input tables and computes one refund per assignment row.
///
/// Lookups are indexed once per batch. When a lookup table holds duplicate
/// keys the first row in table order wins.
pub struct RefundCalculator<'a> {
    tables: &'a InputTables,
    unit_members: HashMap<(&'a str, &'a str), usize>,
    unit_masters: HashMap<&'a str, &'a UnitMaster>,
    utility_costs: HashMap<(&'a str, &'a str), &'a UtilityCost>,
    meal_counts: HashMap<(&'a str, &'a str), &'a MealCount>,
}

impl<'a> RefundCalculator<'a> {
    pub fn new(tables: &'a InputTables) -> Self {
        let mut unit_members = HashMap::new();
        for a in &tables.unit_assignments {
            *unit_members
                .entry((a.month.as_str(), a.unit_name.as_str()))
                .or_insert(0) += 1;
        }

        let mut unit_masters = HashMap::new();
        for u in &tables.unit_masters {
            unit_masters.entry(u.unit_name.as_str()).or_insert(u);
        }

        let mut utility_costs = HashMap::new();
        for u in &tables.utility_costs {
            utility_costs
                .entry((u.month.as_str(), u.unit_name.as_str()))
                .or_insert(u);
        }

        let mut meal_counts = HashMap::new();
        for m in &tables.meal_counts {
            meal_counts
                .entry((m.month.as_str(), m.resident_id.as_str()))
                .or_insert(m);
        }

        Self {
            tables,
            unit_members,
            unit_masters,
            utility_costs,
            meal_counts,
        }
    }

    /// Number of residents assigned to `unit_name` in `month`, never below 1.
    pub fn unit_member_count(&self, month: &str, unit_name: &str) -> usize {
        self.unit_members
            .get(&(month, unit_name))
            .copied()
            .unwrap_or(0)
            .max(1)
    }

    pub fn calculate(&self) -> RefundCalculation {
        let mut report = CalculationReport::default();
        let mut refunds = Vec::with_capacity(self.tables.unit_assignments.len());

        for (index, assignment) in self.tables.unit_assignments.iter().enumerate() {
            let refund = self.calculate_row(assignment);

            report.total += 1;
            if refund.joins.is_complete() {
                report.complete += 1;
            } else {
                report.partial += 1;
            }
            if !refund.joins.unit_master {
                report.missing_unit_master += 1;
                warn!(
                    "[{}] {}: no unit master for unit '{}'",
                    index + 1,
                    assignment.resident_id,
                    assignment.unit_name
                );
            }
            if !refund.joins.utility_cost {
                report.missing_utility += 1;
                warn!(
                    "[{}] {}: no utility cost for unit '{}' in {}",
                    index + 1,
                    assignment.resident_id,
                    assignment.unit_name,
                    assignment.month
                );
            }
            if !refund.joins.meal_count {
                report.missing_meal += 1;
                warn!(
                    "[{}] {}: no meal count in {}",
                    index + 1,
                    assignment.resident_id,
                    assignment.month
                );
            }

            debug!(
                "[{}/{}] {} {}: master={} utility={} meals={} members={}",
                index + 1,
                self.tables.unit_assignments.len(),
                assignment.month,
                assignment.resident_id,
                refund.joins.unit_master,
                refund.joins.utility_cost,
                refund.joins.meal_count,
                refund.breakdown.unit_member_count
            );

            report.total_deposit += refund.detail.deposit_amount;
            report.total_expense += refund.detail.total_expense();
            report.total_refund += refund.detail.net_refund_total;

            refunds.push(refund);
        }

        info!(
            "Calculated {} refunds ({} complete, {} partial); total refund {}",
            report.total, report.complete, report.partial, report.total_refund
        );

        RefundCalculation { refunds, report }
    }

    fn calculate_row(&self, a: &UnitAssignment) -> CalculatedRefund {
        let member_count = self.unit_member_count(&a.month, &a.unit_name);
        let unit = self.unit_masters.get(a.unit_name.as_str()).copied();
        let utility = self
            .utility_costs
            .get(&(a.month.as_str(), a.unit_name.as_str()))
            .copied();
        let meal = self
            .meal_counts
            .get(&(a.month.as_str(), a.resident_id.as_str()))
            .copied();

        let unit_rent = unit.map_or(0.0, |u| u.rent);
        let allocation_percent = unit.map_or(0.0, |u| u.utility_allocation_percent);
        let effective_rent = effective_rent(unit_rent, a.rent_subsidy);

        let breakfast_fee = meal.map_or(0.0, |m| m.breakfast_count) * a.breakfast_unit_price;
        let lunch_fee = meal.map_or(0.0, |m| m.lunch_count) * a.lunch_unit_price;
        let dinner_fee = meal.map_or(0.0, |m| m.dinner_count) * a.dinner_unit_price;
        let event_meal_fee = meal.map_or(0.0, |m| m.event_meal_count) * a.event_meal_unit_price;
        let food_total = breakfast_fee + lunch_fee + dinner_fee + event_meal_fee;

        let utility_total = utility.map_or(0.0, |u| u.total);
        let utility_fee = prorated_utility_fee(utility_total, allocation_percent, member_count);

        let net_refund_total = a.deposit_amount
            - effective_rent
            - a.daily_goods_fee
            - a.maintenance_fee
            - food_total
            - utility_fee
            - a.management_fee
            - a.fire_insurance_fee;

        CalculatedRefund {
            detail: RefundDetail {
                month: a.month.clone(),
                resident_id: a.resident_id.clone(),
                resident_name: a.resident_name.clone(),
                unit_name: a.unit_name.clone(),
                deposit_amount: round_currency(a.deposit_amount),
                rent: round_currency(effective_rent),
                rent_subsidy: round_currency(a.rent_subsidy),
                utility_fee: round_currency(utility_fee),
                daily_goods: round_currency(a.daily_goods_fee),
                maintenance_fee: round_currency(a.maintenance_fee),
                food_total: round_currency(food_total),
                management_fee: round_currency(a.management_fee),
                fire_insurance: round_currency(a.fire_insurance_fee),
                carry_over: 0,
                net_refund_total: round_currency(net_refund_total),
            },
            breakdown: ChargeBreakdown {
                unit_rent: round_currency(unit_rent),
                rent_subsidy: round_currency(a.rent_subsidy),
                breakfast_fee: round_currency(breakfast_fee),
                lunch_fee: round_currency(lunch_fee),
                dinner_fee: round_currency(dinner_fee),
                event_meal_fee: round_currency(event_meal_fee),
                utility_total: round_currency(utility_total),
                utility_allocation_percent: allocation_percent,
                unit_member_count: member_count,
            },
            joins: JoinStatus {
                unit_master: unit.is_some(),
                utility_cost: utility.is_some(),
                meal_count: meal.is_some(),
            },
        }
    }
}

/// Unit rent plus the (non-positive) subsidy, never below zero.
pub fn effective_rent(unit_rent: f64, rent_subsidy: f64) -> f64 {
    (unit_rent + rent_subsidy).max(0.0)
}

/// A resident's share of the unit's allocated utility cost.
pub fn prorated_utility_fee(utility_total: f64, allocation_percent: f64, member_count: usize) -> f64 {
    let members = member_count.max(1) as f64;
    (utility_total * allocation_percent / 100.0 / members).max(0.0)
}

pub fn calculate_refunds(tables: &InputTables) -> RefundCalculation {
    RefundCalculator::new(tables).calculate()
}
