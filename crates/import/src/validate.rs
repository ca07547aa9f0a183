use rust_decimal::Decimal;
use serde::Serialize;
use txstore_core::{Money, NormalizedTransaction, RawTransaction, Source};

use crate::normalize::{normalize_fields, CategoryChoice, RecordFields};
use crate::rules::CategoryRuleEngine;

/// A transaction is flagged when its size exceeds this multiple of the batch mean.
pub const OUTLIER_FACTOR: u32 = 5;

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub transactions: Vec<NormalizedTransaction>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn invalid_count(&self) -> usize {
        self.errors.len()
    }
}

/// Re-validates raw transactions and gives each a final category.
pub struct Validator<'a> {
    rules: &'a CategoryRuleEngine,
    source: Source,
}

impl<'a> Validator<'a> {
    pub fn new(rules: &'a CategoryRuleEngine, source: Source) -> Self {
        Self { rules, source }
    }

    /// Output keeps input order. Rejected items leave an indexed error behind.
    pub fn validate(&self, raw: &[RawTransaction]) -> ValidationReport {
        let mut report = ValidationReport::default();
        let mut indices = Vec::new();

        for (idx, tx) in raw.iter().enumerate() {
            let category = match tx.category {
                Some(c) => CategoryChoice::Given(c),
                None => CategoryChoice::Keywords(self.rules),
            };
            let fields = RecordFields {
                description: &tx.description,
                amount: &tx.amount,
                date: &tx.date,
                notes: None,
            };
            match normalize_fields(fields, category, self.source) {
                Ok(normalized) => {
                    indices.push(idx + 1);
                    report.transactions.push(normalized);
                }
                Err(e) => report.errors.push(format!("Transaction {}: {e}", idx + 1)),
            }
        }

        let amounts: Vec<Money> = report.transactions.iter().map(|t| t.amount).collect();
        for pos in large_amount_positions(&amounts) {
            report.warnings.push(format!(
                "Transaction {}: unusually large transaction ({})",
                indices[pos], amounts[pos]
            ));
        }

        report
    }
}

/// Positions whose absolute amount exceeds `OUTLIER_FACTOR` times the mean
/// absolute amount of the whole slice. The mean is computed once.
///
/// Each amount is scaled down before it is summed, and the comparison divides
/// rather than multiplies, so amounts near `Decimal::MAX` stay in range.
pub fn large_amount_positions(amounts: &[Money]) -> Vec<usize> {
    if amounts.is_empty() {
        return Vec::new();
    }
    let count = Decimal::from(amounts.len());
    let mean = amounts
        .iter()
        .try_fold(Decimal::ZERO, |acc, a| acc.checked_add(a.abs().as_decimal() / count));
    let Some(mean) = mean else {
        tracing::warn!("amount total out of range, skipping outlier check");
        return Vec::new();
    };
    let factor = Decimal::from(OUTLIER_FACTOR);

    amounts
        .iter()
        .enumerate()
        .filter(|(_, a)| a.abs().as_decimal() / factor > mean)
        .map(|(i, _)| i)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use txstore_core::{Category, Direction};

    fn raw(desc: &str, amount: &str, date: &str) -> RawTransaction {
        RawTransaction {
            description: desc.to_string(),
            amount: amount.to_string(),
            date: date.to_string(),
            bank_name: None,
            account_number: None,
            balance: None,
            direction: Direction::Debit,
            category: None,
        }
    }

    #[test]
    fn keeps_order_and_reports_rejects() {
        let rules = CategoryRuleEngine::default();
        let v = Validator::new(&rules, Source::PdfImport);
        let report = v.validate(&[
            raw("Coffee", "-4.50", "2024-01-05"),
            raw("", "-1.00", "2024-01-05"),
            raw("Zero", "0", "2024-01-05"),
            raw("Bad date", "-1.00", "2024-02-30"),
            raw("Salary", "2000.00", "2024-01-31"),
        ]);

        assert_eq!(report.transactions.len(), 2);
        assert_eq!(report.transactions[0].description, "Coffee");
        assert_eq!(report.transactions[1].description, "Salary");
        assert_eq!(report.invalid_count(), 3);
        assert!(report.errors[0].starts_with("Transaction 2:"));
        assert!(report.errors[1].contains("non-zero"));
        assert!(report.errors[2].contains("invalid date"));
    }

    #[test]
    fn assigns_keyword_categories() {
        let rules = CategoryRuleEngine::default();
        let report = Validator::new(&rules, Source::PdfImport).validate(&[
            raw("KROGER #44", "-60.12", "2024-01-05"),
            raw("PAYROLL", "1500.00", "2024-01-05"),
            raw("MISC DEBIT", "-9.00", "2024-01-05"),
        ]);
        let cats: Vec<Category> = report.transactions.iter().map(|t| t.category).collect();
        assert_eq!(cats, vec![Category::Groceries, Category::Income, Category::Expense]);
    }

    #[test]
    fn provisional_category_is_kept() {
        let rules = CategoryRuleEngine::default();
        let mut r = raw("KROGER #44", "-60.12", "2024-01-05");
        r.category = Some(Category::Shopping);
        let report = Validator::new(&rules, Source::PdfImport).validate(&[r]);
        assert_eq!(report.transactions[0].category, Category::Shopping);
    }

    #[test]
    fn warns_on_outliers_relative_to_batch() {
        let rules = CategoryRuleEngine::default();
        let mut batch: Vec<RawTransaction> = (0..9).map(|_| raw("Snack", "-10.00", "2024-01-05")).collect();
        batch.push(raw("Car", "-5000.00", "2024-01-06"));
        let report = Validator::new(&rules, Source::PdfImport).validate(&batch);

        assert_eq!(report.transactions.len(), 10);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].starts_with("Transaction 10:"));
        assert!(report.errors.is_empty());
    }

    #[test]
    fn uniform_batch_has_no_outliers() {
        let amounts = vec![Money::from_cents(1000); 4];
        assert!(large_amount_positions(&amounts).is_empty());
        assert!(large_amount_positions(&[]).is_empty());
    }

    #[test]
    fn amounts_near_decimal_max_do_not_overflow() {
        let rules = CategoryRuleEngine::default();
        let report = Validator::new(&rules, Source::PdfImport).validate(&[
            raw("Big", "50000000000000000000000000000", "2024-01-05"),
            raw("Bigger", "50000000000000000000000000000", "2024-01-05"),
            raw("Coffee", "-4.50", "2024-01-05"),
        ]);
        assert_eq!(report.transactions.len(), 3);
        assert!(report.warnings.is_empty());

        let huge: Money = "70000000000000000000000000000".parse().unwrap();
        let large: Money = "1000000000000000000000000000".parse().unwrap();
        let mut amounts = vec![large; 9];
        amounts.push(huge);
        assert_eq!(large_amount_positions(&amounts), vec![9]);
    }
}
