use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Date layouts accepted when no format-specific layout is known, most
/// specific first. ISO wins so parser output round-trips unchanged.
const DATE_FALLBACKS: &[&str] = &[
    "%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%Y/%m/%d", "%m-%d-%Y", "%d-%m-%Y",
];

pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FALLBACKS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn amount_token_re() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"^\(?[-+]?\$?\d[\d,]*(?:\.\d+)?\)?$").expect("invalid regex")
    })
}

/// True when the whole token looks like a money amount (`1,234.56`, `-15.00`, `(4.23)`).
pub fn is_amount_token(s: &str) -> bool {
    amount_token_re().is_match(s.trim())
}
