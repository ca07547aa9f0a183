use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use txstore_core::{Direction, Money, RawTransaction};

use crate::extract::{ExtractError, TextExtractor};
use crate::formats::{detect_format, AmountLayout, StatementFormat};
use crate::rules::{infer_direction, CategoryRuleEngine};
use crate::util::is_amount_token;

/// Lines shorter than this are labels or stray fragments, never transactions.
pub const MIN_LINE_LENGTH: usize = 10;

#[derive(Debug, Clone, Default, Serialize)]
pub struct StatementParseResult {
    pub success: bool,
    pub transactions: Vec<RawTransaction>,
    pub bank_name: Option<String>,
    pub format_name: Option<String>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Dated lines that could not be turned into a transaction.
    pub invalid_count: usize,
}

fn account_number_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"(?i)\baccount\s*(?:number|no\.?|#)\s*:?\s*([*xX\d][*xX\d-]{3,})")
            .expect("invalid regex")
    })
}

fn column_gap_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"\s{2,}").expect("invalid regex"))
}

/// Amount and balance pulled out of one statement line.
struct LineAmounts {
    amount: Money,
    balance: Option<Money>,
}

pub struct StatementParser<'a> {
    rules: &'a CategoryRuleEngine,
}

impl<'a> StatementParser<'a> {
    pub fn new(rules: &'a CategoryRuleEngine) -> Self {
        Self { rules }
    }

    /// Extract text from document bytes and parse it. Only extraction
    /// failures are returned as `Err`.
    pub fn parse_document<E: TextExtractor + ?Sized>(
        &self,
        extractor: &E,
        data: &[u8],
    ) -> Result<StatementParseResult, ExtractError> {
        let text = extractor.extract_text(data)?;
        Ok(self.parse(&text))
    }

    pub fn parse(&self, raw_text: &str) -> StatementParseResult {
        let mut result = StatementParseResult::default();

        let lines: Vec<&str> = raw_text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let Some(format) = detect_format(&lines) else {
            result
                .errors
                .push("Unrecognized statement format: no known bank layout matched".to_string());
            return result;
        };
        tracing::debug!(format = format.name, lines = lines.len(), "statement format detected");

        result.bank_name = Some(format.bank_name.to_string());
        result.format_name = Some(format.name.to_string());

        let account_number = lines
            .iter()
            .find_map(|l| account_number_re().captures(l))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        for (idx, line) in lines.iter().enumerate() {
            if line.len() < MIN_LINE_LENGTH || format.is_skipped(line) {
                continue;
            }
            // Lines without a leading date are page furniture, not rejects.
            if !format.starts_with_date(line) {
                continue;
            }
            match self.parse_line(format, line) {
                Ok(mut tx) => {
                    tx.account_number = account_number.clone();
                    result.transactions.push(tx);
                }
                Err(reason) => {
                    result.invalid_count += 1;
                    result.warnings.push(format!("Line {}: {reason}", idx + 1));
                }
            }
        }

        if result.transactions.is_empty() {
            result.errors.push(format!(
                "No transactions found in {} statement",
                format.name
            ));
        } else {
            result.success = true;
        }
        if result.invalid_count > 0 {
            tracing::debug!(invalid = result.invalid_count, "statement lines skipped");
        }

        result
    }

    fn parse_line(&self, format: &StatementFormat, line: &str) -> Result<RawTransaction, String> {
        let (date_token, description, amounts) = match format.amount_layout {
            AmountLayout::SeparateColumns => split_separate_columns(line)?,
            AmountLayout::PositiveNegative | AmountLayout::DebitCredit => split_wide_columns(line)?,
        };

        let date = format
            .parse_date(date_token)
            .ok_or_else(|| format!("unparseable date '{date_token}'"))?;

        if !format.is_description(&description) {
            return Err("missing description".to_string());
        }

        if amounts.amount.is_zero() {
            return Err("zero amount".to_string());
        }

        let direction = if amounts.amount.is_negative() {
            Direction::Debit
        } else {
            Direction::Credit
        };

        Ok(RawTransaction {
            category: Some(self.rules.categorize(&description, amounts.amount)),
            description,
            amount: amounts.amount.to_string(),
            date: date.format("%Y-%m-%d").to_string(),
            bank_name: Some(format.bank_name.to_string()),
            account_number: None,
            balance: amounts.balance.map(|b| b.to_string()),
            direction,
        })
    }
}

fn parse_amount_token(token: &str) -> Option<Money> {
    token.parse::<Money>().ok()
}

/// Whitespace tokens: date, description words, then debit / credit / balance.
fn split_separate_columns(line: &str) -> Result<(&str, String, LineAmounts), String> {
    let mut tokens = line.split_whitespace();
    let date = tokens.next().ok_or("empty line")?;

    let mut words = Vec::new();
    let mut candidates = Vec::new();
    for token in tokens {
        if is_amount_token(token) {
            if let Some(value) = parse_amount_token(token) {
                candidates.push(value);
            }
        } else if candidates.is_empty() {
            words.push(token);
        }
    }

    let debit = candidates.first().copied().filter(|d| !d.abs().is_zero());
    let credit = candidates.get(1).copied().filter(|c| !c.abs().is_zero());

    let amount = match (debit, credit) {
        (Some(d), _) => -d.abs(),
        (None, Some(c)) => c.abs(),
        (None, None) => return Err("no debit or credit amount".to_string()),
    };

    Ok((
        date,
        words.join(" "),
        LineAmounts {
            amount,
            balance: candidates.get(2).copied(),
        },
    ))
}

/// Columns separated by two or more spaces; sign comes from the description.
fn split_wide_columns(line: &str) -> Result<(&str, String, LineAmounts), String> {
    let mut columns = column_gap_re().split(line);
    let date = columns.next().ok_or("empty line")?.trim();

    let mut words = Vec::new();
    let mut candidates = Vec::new();
    for column in columns {
        let column = column.trim();
        if is_amount_token(column) {
            if let Some(value) = parse_amount_token(column) {
                candidates.push(value.abs());
            }
        } else if !column.is_empty() {
            words.push(column);
        }
    }

    // With two figures the larger is usually the movement, the other the balance.
    let (magnitude, balance) = match candidates.as_slice() {
        [] => return Err("no amount column".to_string()),
        [only] => (*only, None),
        [first, second, rest @ ..] => {
            let (amount, other) = if second > first { (*second, *first) } else { (*first, *second) };
            let balance = rest.last().copied().or(Some(other));
            (amount, balance)
        }
    };

    let description = words.join(" ");
    let amount = match infer_direction(&description) {
        Direction::Credit => magnitude,
        Direction::Debit => -magnitude,
    };

    Ok((date, description, LineAmounts { amount, balance }))
}
