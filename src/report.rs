//! Aggregation engine: monthly summaries and category reports.
//!
//! Pure functions of `(expenses, budgets)` - no store access, no state.
//! Accumulation runs on full-precision decimals; rounding to 2 decimal
//! places happens once, when the output structs are built.

use std::collections::{BTreeMap, HashMap};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::store::{Budget, Expense};

/// Monthly budget position.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlySummary {
    pub month: String,
    pub total_expenses: Decimal,
    pub total_budget: Decimal,
    pub remaining_budget: Decimal,
    pub budget_usage_percent: Decimal,
    pub budget_status: BudgetStatus,
    pub expense_count: usize,
    pub budget_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStatus {
    NoBudget,
    UnderBudget,
    OverBudget,
}

/// Per-category spending against its budget.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryBreakdown {
    pub total_amount: Decimal,
    pub count: usize,
    pub budget: Decimal,
    pub over_budget: bool,
    pub percentage: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopCategory {
    pub category: String,
    pub amount: Decimal,
}

/// Chart-ready slice for the category pie.
#[derive(Debug, Clone, Serialize)]
pub struct PieSlice {
    pub name: String,
    pub value: Decimal,
    pub percentage: Decimal,
}

/// Chart-ready entry for the expenses-vs-budget bars.
#[derive(Debug, Clone, Serialize)]
pub struct BarEntry {
    pub category: String,
    pub expenses: Decimal,
    pub budget: Decimal,
    pub over_budget: bool,
}

/// Detailed per-category report with chart projections.
#[derive(Debug, Clone, Serialize)]
pub struct MonthlyReport {
    pub month: String,
    pub expenses_by_category: BTreeMap<String, CategoryBreakdown>,
    pub top_spending_category: Option<TopCategory>,
    pub over_budget_categories_count: usize,
    pub total_expenses: Decimal,
    pub total_categories: usize,
    pub pie_chart_data: Vec<PieSlice>,
    pub bar_chart_data: Vec<BarEntry>,
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Percentage of `part` in `whole`, or zero when the denominator is zero.
fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        part / whole * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Compute the monthly summary over all expenses and budgets of a month.
pub fn compute_summary(month: &str, expenses: &[Expense], budgets: &[Budget]) -> MonthlySummary {
    let total_expenses: Decimal = expenses.iter().map(|e| e.amount).sum();
    let total_budget: Decimal = budgets.iter().map(|b| b.amount).sum();
    let remaining = total_budget - total_expenses;

    let budget_status = if total_budget == Decimal::ZERO {
        BudgetStatus::NoBudget
    } else if remaining >= Decimal::ZERO {
        BudgetStatus::UnderBudget
    } else {
        BudgetStatus::OverBudget
    };

    MonthlySummary {
        month: month.to_string(),
        total_expenses: round2(total_expenses),
        total_budget: round2(total_budget),
        remaining_budget: round2(remaining),
        budget_usage_percent: round2(percent_of(total_expenses, total_budget)),
        budget_status,
        expense_count: expenses.len(),
        budget_count: budgets.len(),
    }
}

/// Compute the per-category report with chart projections.
///
/// Categories are grouped in first-seen expense order, which makes the
/// top-category tie-break deterministic. Categories with a budget but no
/// expenses do not appear - the report is expense-driven.
pub fn compute_report(month: &str, expenses: &[Expense], budgets: &[Budget]) -> MonthlyReport {
    // Budget lookup by category; a later duplicate overwrites an earlier
    // one (uniqueness is enforced at write time).
    let budget_lookup: HashMap<&str, Decimal> = budgets
        .iter()
        .map(|b| (b.category.as_str(), b.amount))
        .collect();

    let mut order: Vec<String> = Vec::new();
    let mut totals: HashMap<String, (Decimal, usize)> = HashMap::new();
    let mut grand_total = Decimal::ZERO;

    for expense in expenses {
        let entry = totals.entry(expense.category.clone()).or_insert_with(|| {
            order.push(expense.category.clone());
            (Decimal::ZERO, 0)
        });
        entry.0 += expense.amount;
        entry.1 += 1;
        grand_total += expense.amount;
    }

    let mut expenses_by_category = BTreeMap::new();
    let mut top: Option<TopCategory> = None;
    let mut over_budget_count = 0;
    let mut pie_chart_data = Vec::with_capacity(order.len());
    let mut bar_chart_data = Vec::with_capacity(order.len());

    for category in &order {
        let (total, count) = totals[category];
        let budget = budget_lookup
            .get(category.as_str())
            .copied()
            .unwrap_or(Decimal::ZERO);
        let over_budget = budget > Decimal::ZERO && total > budget;
        if over_budget {
            over_budget_count += 1;
        }

        // Strictly-greater comparison keeps the first-seen category on ties.
        if top.as_ref().map_or(true, |t| total > t.amount) {
            top = Some(TopCategory {
                category: category.clone(),
                amount: total,
            });
        }

        let percentage = round2(percent_of(total, grand_total));
        let rounded_total = round2(total);

        expenses_by_category.insert(
            category.clone(),
            CategoryBreakdown {
                total_amount: rounded_total,
                count,
                budget,
                over_budget,
                percentage,
            },
        );
        pie_chart_data.push(PieSlice {
            name: category.clone(),
            value: rounded_total,
            percentage,
        });
        bar_chart_data.push(BarEntry {
            category: category.clone(),
            expenses: rounded_total,
            budget,
            over_budget,
        });
    }

    // Descending by amount; the sort is stable, so equal amounts keep
    // first-seen order.
    pie_chart_data.sort_by(|a, b| b.value.cmp(&a.value));
    bar_chart_data.sort_by(|a, b| b.expenses.cmp(&a.expenses));

    MonthlyReport {
        month: month.to_string(),
        total_categories: expenses_by_category.len(),
        expenses_by_category,
        top_spending_category: top.map(|t| TopCategory {
            category: t.category,
            amount: round2(t.amount),
        }),
        over_budget_categories_count: over_budget_count,
        total_expenses: round2(grand_total),
        pie_chart_data,
        bar_chart_data,
    }
}
