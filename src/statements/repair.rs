//! Fills missing line items using accounting identities, only when the
//! target is null and every operand is non-null.
//!
//! Grounded on `item_standardizer.py`'s `CorrectIncomeStatement`/
//! `CorrectBalanceSheetStatement`/`CorrectCashFlowStatement`.

use crate::reconstruct::format::{CellValue, FormattedRow};
use crate::taxonomy::Statement;

fn get(row: &FormattedRow, key: &str) -> Option<f64> {
    match row.get(key) {
        Some(CellValue::Number(Some(v))) => Some(*v),
        _ => None,
    }
}

fn is_null(row: &FormattedRow, key: &str) -> bool {
    matches!(row.get(key), Some(CellValue::Number(None)))
}

fn set(row: &mut FormattedRow, key: &str, value: f64) {
    row.insert(key.to_string(), CellValue::Number(Some(value)));
}

fn repair_income(row: &mut FormattedRow) {
    if is_null(row, "pretax_income") {
        if let (Some(operating), Some(non_operating)) = (get(row, "operating_income"), get(row, "non_operating_income_expense")) {
            set(row, "pretax_income", operating + non_operating);
        }
    }
    if is_null(row, "net_income") {
        if let (Some(pretax), Some(tax)) = (get(row, "pretax_income"), get(row, "tax_provision")) {
            set(row, "net_income", pretax - tax);
        }
    }
}

/// Apply all three symmetric permutations of a three-way identity
/// `total = a + b` to `row`, filling whichever single field is missing.
fn repair_three_way(row: &mut FormattedRow, total: &str, a: &str, b: &str) {
    if is_null(row, a) {
        if let (Some(total_v), Some(b_v)) = (get(row, total), get(row, b)) {
            set(row, a, total_v - b_v);
        }
    }
    if is_null(row, b) {
        if let (Some(total_v), Some(a_v)) = (get(row, total), get(row, a)) {
            set(row, b, total_v - a_v);
        }
    }
    if is_null(row, total) {
        if let (Some(a_v), Some(b_v)) = (get(row, a), get(row, b)) {
            set(row, total, a_v + b_v);
        }
    }
}

fn repair_balance(row: &mut FormattedRow) {
    repair_three_way(row, "total_assets", "current_assets", "non_current_assets");
    repair_three_way(row, "total_liabilities", "current_liabilities", "non_current_liabilities");
}

fn repair_cash_flow(row: &mut FormattedRow) {
    if is_null(row, "change_in_cash") {
        if let (Some(begin), Some(end)) = (get(row, "beginning_cash_position"), get(row, "end_cash_position")) {
            set(row, "change_in_cash", end - begin);
        }
    }
    if is_null(row, "beginning_cash_position") {
        if let (Some(change), Some(end)) = (get(row, "change_in_cash"), get(row, "end_cash_position")) {
            set(row, "beginning_cash_position", end - change);
        }
    }
    if is_null(row, "end_cash_position") {
        if let (Some(change), Some(begin)) = (get(row, "change_in_cash"), get(row, "beginning_cash_position")) {
            set(row, "end_cash_position", begin + change);
        }
    }
}

/// Apply the identity set appropriate for `statement` to `row` in
/// place. Idempotent: a field already non-null is never overwritten.
pub fn repair_row(statement: Statement, row: &mut FormattedRow) {
    match statement {
        Statement::Income => repair_income(row),
        Statement::Balance => repair_balance(row),
        Statement::CashFlow => repair_cash_flow(row),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn row(pairs: &[(&str, Option<f64>)]) -> FormattedRow {
        let mut row: FormattedRow = IndexMap::new();
        for (key, value) in pairs {
            row.insert(key.to_string(), CellValue::Number(*value));
        }
        row
    }

    #[test]
    fn fills_pretax_income_from_operating_components() {
        let mut row = row(&[("operating_income", Some(100.0)), ("non_operating_income_expense", Some(-20.0)), ("pretax_income", None)]);
        repair_row(Statement::Income, &mut row);
        assert_eq!(get(&row, "pretax_income"), Some(80.0));
    }

    #[test]
    fn chains_pretax_into_net_income() {
        let mut row = row(&[
            ("operating_income", Some(100.0)),
            ("non_operating_income_expense", Some(0.0)),
            ("pretax_income", None),
            ("tax_provision", Some(20.0)),
            ("net_income", None),
        ]);
        repair_row(Statement::Income, &mut row);
        assert_eq!(get(&row, "pretax_income"), Some(100.0));
        assert_eq!(get(&row, "net_income"), Some(80.0));
    }

    #[test]
    fn balance_sheet_symmetric_permutation_fills_total() {
        let mut row = row(&[("current_assets", Some(60.0)), ("non_current_assets", Some(40.0)), ("total_assets", None)]);
        repair_row(Statement::Balance, &mut row);
        assert_eq!(get(&row, "total_assets"), Some(100.0));
    }

    #[test]
    fn balance_sheet_fills_missing_component_from_total() {
        let mut row = row(&[("current_assets", None), ("non_current_assets", Some(40.0)), ("total_assets", Some(100.0))]);
        repair_row(Statement::Balance, &mut row);
        assert_eq!(get(&row, "current_assets"), Some(60.0));
    }

    #[test]
    fn cash_flow_change_in_cash_from_positions() {
        let mut row = row(&[("beginning_cash_position", Some(10.0)), ("end_cash_position", Some(25.0)), ("change_in_cash", None)]);
        repair_row(Statement::CashFlow, &mut row);
        assert_eq!(get(&row, "change_in_cash"), Some(15.0));
    }

    #[test]
    fn existing_non_null_value_is_never_overwritten() {
        let mut row = row(&[("operating_income", Some(100.0)), ("non_operating_income_expense", Some(-20.0)), ("pretax_income", Some(999.0))]);
        repair_row(Statement::Income, &mut row);
        assert_eq!(get(&row, "pretax_income"), Some(999.0));
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let mut row = row(&[("operating_income", Some(100.0)), ("non_operating_income_expense", Some(-20.0)), ("pretax_income", None)]);
        repair_row(Statement::Income, &mut row);
        let first_pass = get(&row, "pretax_income");
        repair_row(Statement::Income, &mut row);
        assert_eq!(get(&row, "pretax_income"), first_pass);
    }
}
