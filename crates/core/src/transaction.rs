use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::category::Category;
use super::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Debit,
    Credit,
}

/// Where a normalized transaction entered the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    CsvImport,
    PdfImport,
    Manual,
    Correction,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::CsvImport => write!(f, "csv-import"),
            Source::PdfImport => write!(f, "pdf-import"),
            Source::Manual => write!(f, "manual"),
            Source::Correction => write!(f, "correction"),
        }
    }
}

/// A transaction as it came out of a statement or CSV row, not yet validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub description: String,
    /// Signed decimal string; may still be malformed.
    pub amount: String,
    pub date: String,
    pub bank_name: Option<String>,
    pub account_number: Option<String>,
    pub balance: Option<String>,
    pub direction: Direction,
    /// Provisional category from the parser, if it assigned one.
    pub category: Option<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Amount must be non-zero")]
    ZeroAmount,
    #[error("Description is required")]
    EmptyDescription,
}

/// The canonical validated record shared by every ingestion path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTransaction {
    pub id: Uuid,
    pub description: String,
    pub amount: Money,
    pub category: Category,
    pub date: NaiveDate,
    pub notes: Option<String>,
    pub source: Source,
    pub original_id: Option<Uuid>,
    /// `corrected - original`, fixed when the correction is created.
    pub net_effect: Option<Money>,
}

impl NormalizedTransaction {
    pub fn new(
        description: &str,
        amount: Money,
        category: Category,
        date: NaiveDate,
        notes: Option<String>,
        source: Source,
    ) -> Result<Self, LedgerError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(LedgerError::EmptyDescription);
        }
        if amount.is_zero() {
            return Err(LedgerError::ZeroAmount);
        }

        Ok(NormalizedTransaction {
            id: Uuid::new_v4(),
            description: description.to_string(),
            amount,
            category,
            date,
            notes: notes.filter(|n| !n.trim().is_empty()),
            source,
            original_id: None,
            net_effect: None,
        })
    }

    /// Build a correction of this record. The original is left untouched.
    pub fn correct(
        &self,
        corrected_amount: Money,
        notes: Option<String>,
    ) -> Result<NormalizedTransaction, LedgerError> {
        let mut corrected = NormalizedTransaction::new(
            &self.description,
            corrected_amount,
            self.category,
            self.date,
            notes,
            Source::Correction,
        )?;
        corrected.original_id = Some(self.id);
        corrected.net_effect = Some(corrected_amount - self.amount);
        Ok(corrected)
    }

    pub fn is_correction(&self) -> bool {
        self.original_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn coffee() -> NormalizedTransaction {
        NormalizedTransaction::new(
            "Coffee",
            Money::from_cents(-450),
            Category::Expense,
            date(2024, 1, 5),
            None,
            Source::Manual,
        )
        .unwrap()
    }

    #[test]
    fn new_rejects_zero_amount() {
        let r = NormalizedTransaction::new(
            "Nothing",
            Money::zero(),
            Category::Expense,
            date(2024, 1, 5),
            None,
            Source::Manual,
        );
        assert_eq!(r, Err(LedgerError::ZeroAmount));
    }

    #[test]
    fn new_rejects_blank_description() {
        let r = NormalizedTransaction::new(
            "   ",
            Money::from_cents(100),
            Category::Income,
            date(2024, 1, 5),
            None,
            Source::Manual,
        );
        assert_eq!(r, Err(LedgerError::EmptyDescription));
    }

    #[test]
    fn new_drops_blank_notes() {
        let tx = NormalizedTransaction::new(
            "Coffee",
            Money::from_cents(-450),
            Category::Expense,
            date(2024, 1, 5),
            Some("  ".to_string()),
            Source::Manual,
        )
        .unwrap();
        assert!(tx.notes.is_none());
    }

    #[test]
    fn correction_links_original_and_computes_net_effect() {
        let original = coffee();
        let fixed = original
            .correct(Money::from_cents(-500), Some("receipt said 5.00".to_string()))
            .unwrap();

        assert_ne!(fixed.id, original.id);
        assert_eq!(fixed.original_id, Some(original.id));
        assert_eq!(fixed.source, Source::Correction);
        assert_eq!(fixed.net_effect, Some(Money::from_cents(-50)));
        assert!(fixed.is_correction());
        // Original is untouched.
        assert_eq!(original.amount, Money::from_cents(-450));
        assert!(!original.is_correction());
    }

    #[test]
    fn correction_to_zero_is_rejected() {
        assert_eq!(coffee().correct(Money::zero(), None), Err(LedgerError::ZeroAmount));
    }

    #[test]
    fn source_serializes_kebab_case() {
        assert_eq!(serde_json::to_string(&Source::CsvImport).unwrap(), "\"csv-import\"");
        assert_eq!(Source::PdfImport.to_string(), "pdf-import");
    }

    #[test]
    fn amount_serializes_as_string() {
        let json = serde_json::to_value(coffee()).unwrap();
        assert_eq!(json["amount"], "-4.50");
        assert_eq!(json["category"], "expense");
        assert_eq!(json["date"], "2024-01-05");
    }
}
