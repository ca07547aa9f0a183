use thiserror::Error;
use txstore_core::{Category, LedgerError, Money, NormalizedTransaction, Source};

use crate::rules::CategoryRuleEngine;
use crate::util::parse_date;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("missing required field '{0}'")]
    MissingField(&'static str),
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
    #[error("amount must be non-zero")]
    ZeroAmount,
    #[error("{0}")]
    InvalidCategory(String),
}

impl From<LedgerError> for NormalizeError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::ZeroAmount => NormalizeError::ZeroAmount,
            LedgerError::EmptyDescription => NormalizeError::MissingField("description"),
        }
    }
}

/// Text fields of one incoming record, before any parsing.
#[derive(Debug, Clone, Copy)]
pub struct RecordFields<'a> {
    pub description: &'a str,
    pub amount: &'a str,
    pub date: &'a str,
    pub notes: Option<&'a str>,
}

/// How the category of a record is decided.
pub enum CategoryChoice<'a> {
    Given(Category),
    /// A category name read from input; must be in the closed set.
    Named(&'a str),
    Keywords(&'a CategoryRuleEngine),
}

/// The one normalization routine behind both the statement and CSV paths.
///
/// Checks run in a fixed order and stop at the first failure: presence,
/// date, amount, non-zero, category.
pub fn normalize_fields(
    fields: RecordFields<'_>,
    category: CategoryChoice<'_>,
    source: Source,
) -> Result<NormalizedTransaction, NormalizeError> {
    let description = fields.description.trim();
    let amount_text = fields.amount.trim();
    let date_text = fields.date.trim();

    if description.is_empty() {
        return Err(NormalizeError::MissingField("description"));
    }
    if amount_text.is_empty() {
        return Err(NormalizeError::MissingField("amount"));
    }
    if date_text.is_empty() {
        return Err(NormalizeError::MissingField("date"));
    }
    if matches!(category, CategoryChoice::Named(name) if name.trim().is_empty()) {
        return Err(NormalizeError::MissingField("category"));
    }

    let date = parse_date(date_text).ok_or_else(|| NormalizeError::InvalidDate(date_text.to_string()))?;
    let amount: Money = amount_text
        .parse()
        .map_err(|_| NormalizeError::InvalidAmount(amount_text.to_string()))?;
    if amount.is_zero() {
        return Err(NormalizeError::ZeroAmount);
    }

    let category = match category {
        CategoryChoice::Given(c) => c,
        CategoryChoice::Named(name) => name.trim().parse::<Category>().map_err(NormalizeError::InvalidCategory)?,
        CategoryChoice::Keywords(engine) => engine.categorize(description, amount),
    };

    Ok(NormalizedTransaction::new(
        description,
        amount,
        category,
        date,
        fields.notes.map(str::to_string),
        source,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fields<'a>(description: &'a str, amount: &'a str, date: &'a str) -> RecordFields<'a> {
        RecordFields { description, amount, date, notes: None }
    }

    #[test]
    fn normalizes_valid_record() {
        let tx = normalize_fields(
            fields("Coffee", "-4.50", "2024-01-05"),
            CategoryChoice::Given(Category::Expense),
            Source::CsvImport,
        )
        .unwrap();
        assert_eq!(tx.amount.to_string(), "-4.50");
        assert_eq!(tx.date, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(tx.category, Category::Expense);
        assert_eq!(tx.source, Source::CsvImport);
    }

    #[test]
    fn missing_fields_checked_first() {
        let r = normalize_fields(fields("", "abc", "nope"), CategoryChoice::Given(Category::Expense), Source::Manual);
        assert_eq!(r, Err(NormalizeError::MissingField("description")));
        let r = normalize_fields(fields("x", " ", "2024-01-01"), CategoryChoice::Given(Category::Expense), Source::Manual);
        assert_eq!(r, Err(NormalizeError::MissingField("amount")));
        let r = normalize_fields(fields("x", "1", ""), CategoryChoice::Given(Category::Expense), Source::Manual);
        assert_eq!(r, Err(NormalizeError::MissingField("date")));
    }

    #[test]
    fn date_checked_before_amount() {
        let r = normalize_fields(fields("x", "abc", "2024-13-01"), CategoryChoice::Given(Category::Expense), Source::Manual);
        assert_eq!(r, Err(NormalizeError::InvalidDate("2024-13-01".into())));
    }

    #[test]
    fn rejects_bad_and_zero_amounts() {
        let r = normalize_fields(fields("x", "ten", "2024-01-01"), CategoryChoice::Given(Category::Expense), Source::Manual);
        assert_eq!(r, Err(NormalizeError::InvalidAmount("ten".into())));
        let r = normalize_fields(fields("x", "0.00", "2024-01-01"), CategoryChoice::Given(Category::Expense), Source::Manual);
        assert_eq!(r, Err(NormalizeError::ZeroAmount));
    }

    #[test]
    fn named_category_must_be_known() {
        let ok = normalize_fields(fields("Rent", "-900", "2024-02-01"), CategoryChoice::Named(" Housing "), Source::CsvImport);
        assert_eq!(ok.unwrap().category, Category::Housing);

        let r = normalize_fields(fields("Rent", "-900", "2024-02-01"), CategoryChoice::Named("vacation"), Source::CsvImport);
        assert!(matches!(r, Err(NormalizeError::InvalidCategory(msg)) if msg.contains("vacation")));

        let r = normalize_fields(fields("Rent", "-900", "2024-02-01"), CategoryChoice::Named(""), Source::CsvImport);
        assert_eq!(r, Err(NormalizeError::MissingField("category")));
    }

    #[test]
    fn keyword_category_uses_sign() {
        let engine = CategoryRuleEngine::default();
        let out = normalize_fields(
            fields("STARBUCKS 1234", "-5.25", "2024-03-01"),
            CategoryChoice::Keywords(&engine),
            Source::PdfImport,
        )
        .unwrap();
        assert_eq!(out.category, Category::Dining);

        let inflow = normalize_fields(
            fields("STARBUCKS 1234", "5.25", "2024-03-01"),
            CategoryChoice::Keywords(&engine),
            Source::PdfImport,
        )
        .unwrap();
        assert_eq!(inflow.category, Category::Income);
    }
}
