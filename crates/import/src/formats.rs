//! The fixed catalog of statement layouts the parser knows how to read.
//!
//! Catalog order is detection priority: the first format whose header, date
//! and amount patterns all hit some line of the statement wins.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountLayout {
    /// Debit, credit and balance each get their own column.
    SeparateColumns,
    /// A single signed amount column.
    PositiveNegative,
    /// Paid out / paid in columns separated by wide gaps.
    DebitCredit,
}

/// Declarative description of one layout, compiled into a [`StatementFormat`].
struct FormatSpec {
    name: &'static str,
    bank_name: &'static str,
    date_format: &'static str,
    amount_layout: AmountLayout,
    date_pattern: &'static str,
    amount_pattern: &'static str,
    description_pattern: &'static str,
    header_patterns: &'static [&'static str],
    footer_patterns: &'static [&'static str],
    skip_patterns: &'static [&'static str],
}

const FORMAT_SPECS: &[FormatSpec] = &[
    FormatSpec {
        name: "Standard Bank Format",
        bank_name: "Standard Bank",
        date_format: "%m/%d/%Y",
        amount_layout: AmountLayout::SeparateColumns,
        date_pattern: r"^\d{1,2}/\d{1,2}/\d{4}\b",
        amount_pattern: r"\b\d[\d,]*\.\d{2}\b",
        description_pattern: r"[A-Za-z]",
        header_patterns: &[r"(?i)^date\s+description\s+(?:debit|withdrawals?)\s+(?:credit|deposits?)"],
        footer_patterns: &[r"(?i)^(?:total|closing balance)\b", r"(?i)end of statement"],
        skip_patterns: &[
            r"(?i)^(?:opening|previous) balance\b",
            r"(?i)^balance (?:brought|carried) forward",
            r"(?i)^page \d+",
        ],
    },
    FormatSpec {
        name: "Checking Transaction Detail Format",
        bank_name: "Chase",
        date_format: "%m/%d/%Y",
        amount_layout: AmountLayout::PositiveNegative,
        date_pattern: r"^\d{2}/\d{2}/\d{4}\b",
        amount_pattern: r"-?\d[\d,]*\.\d{2}\b",
        description_pattern: r"[A-Za-z]",
        header_patterns: &[r"(?i)^transaction\s+detail"],
        footer_patterns: &[r"(?i)^total\b", r"(?i)^ending balance"],
        skip_patterns: &[r"(?i)^beginning balance", r"(?i)^date\s+description\s+amount"],
    },
    FormatSpec {
        name: "UK Current Account Format",
        bank_name: "UK Bank",
        date_format: "%d/%m/%Y",
        amount_layout: AmountLayout::DebitCredit,
        date_pattern: r"^\d{2}/\d{2}/\d{4}\b",
        amount_pattern: r"\b\d[\d,]*\.\d{2}\b",
        description_pattern: r"[A-Za-z]",
        header_patterns: &[r"(?i)^date\s+(?:details|description)\s+(?:paid out|money out)"],
        footer_patterns: &[r"(?i)^balance carried forward", r"(?i)^total"],
        skip_patterns: &[r"(?i)^balance brought forward", r"(?i)^page \d+ of \d+"],
    },
    FormatSpec {
        name: "ISO Date Format",
        bank_name: "Generic Bank",
        date_format: "%Y-%m-%d",
        amount_layout: AmountLayout::PositiveNegative,
        date_pattern: r"^\d{4}-\d{2}-\d{2}\b",
        amount_pattern: r"-?\d[\d,]*\.\d{2}\b",
        description_pattern: r"[A-Za-z]",
        header_patterns: &[r"(?i)\b(?:posting|transaction|booking) date\b"],
        footer_patterns: &[r"(?i)^total\b", r"(?i)^closing balance"],
        skip_patterns: &[r"(?i)^opening balance"],
    },
];

#[derive(Debug)]
pub struct StatementFormat {
    pub name: &'static str,
    pub bank_name: &'static str,
    pub date_format: &'static str,
    pub amount_layout: AmountLayout,
    date_pattern: Regex,
    amount_pattern: Regex,
    description_pattern: Regex,
    header_patterns: Vec<Regex>,
    footer_patterns: Vec<Regex>,
    skip_patterns: Vec<Regex>,
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("invalid regex")
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| compile(p)).collect()
}

impl StatementFormat {
    fn from_spec(spec: &FormatSpec) -> Self {
        StatementFormat {
            name: spec.name,
            bank_name: spec.bank_name,
            date_format: spec.date_format,
            amount_layout: spec.amount_layout,
            date_pattern: compile(spec.date_pattern),
            amount_pattern: compile(spec.amount_pattern),
            description_pattern: compile(spec.description_pattern),
            header_patterns: compile_all(spec.header_patterns),
            footer_patterns: compile_all(spec.footer_patterns),
            skip_patterns: compile_all(spec.skip_patterns),
        }
    }

    /// Header, date and amount patterns must each match at least one line.
    pub fn matches(&self, lines: &[&str]) -> bool {
        let hits = |re: &Regex| lines.iter().any(|l| re.is_match(l));
        self.header_patterns.iter().any(hits)
            && hits(&self.date_pattern)
            && hits(&self.amount_pattern)
    }

    pub fn is_skipped(&self, line: &str) -> bool {
        self.skip_patterns
            .iter()
            .chain(&self.header_patterns)
            .chain(&self.footer_patterns)
            .any(|re| re.is_match(line))
    }

    pub fn starts_with_date(&self, line: &str) -> bool {
        self.date_pattern.is_match(line)
    }

    pub fn is_description(&self, text: &str) -> bool {
        self.description_pattern.is_match(text)
    }

    pub fn parse_date(&self, token: &str) -> Option<NaiveDate> {
        let token = token.trim();
        if !self.date_pattern.is_match(token) {
            return None;
        }
        NaiveDate::parse_from_str(token, self.date_format).ok()
    }
}

pub fn catalog() -> &'static [StatementFormat] {
    static CATALOG: OnceLock<Vec<StatementFormat>> = OnceLock::new();
    CATALOG.get_or_init(|| FORMAT_SPECS.iter().map(StatementFormat::from_spec).collect())
}

/// First catalog entry matching the statement, if any.
pub fn detect_format(lines: &[&str]) -> Option<&'static StatementFormat> {
    catalog().iter().find(|f| f.matches(lines))
}
