use serde::{Deserialize, Serialize};
use txstore_core::{Category, Direction, Money};

/// Which side of the ledger a rule is allowed to fire on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AmountSign {
    #[default]
    Any,
    Positive,
    Negative,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    Regex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub match_type: MatchType,
    pub category: Category,
    #[serde(default)]
    pub applies_to: AmountSign,
}

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<CategoryRule>,
}

/// Keyword groups for outgoing money, evaluated top-down.
const EXPENSE_GROUPS: &[(&str, Category, &[&str])] = &[
    (
        "groceries",
        Category::Groceries,
        &["grocery", "groceries", "supermarket", "whole foods", "trader joe", "safeway", "kroger", "aldi", "costco", "food"],
    ),
    (
        "fuel",
        Category::Fuel,
        &["fuel", "gas station", "petrol", "gasoline", "chevron", "exxon", "shell oil"],
    ),
    (
        "dining",
        Category::Dining,
        &["restaurant", "cafe", "coffee", "starbucks", "mcdonald", "pizza", "diner", "doordash", "uber eats"],
    ),
    (
        "utilities",
        Category::Utilities,
        &["electric", "water bill", "utility", "utilities", "sewer", "gas bill"],
    ),
    (
        "shopping",
        Category::Shopping,
        &["amazon", "target", "walmart", "ebay", "department store", "shopping"],
    ),
    (
        "transport",
        Category::Transport,
        &["uber", "lyft", "taxi", "transit", "metro", "parking", "toll", "airline", "amtrak"],
    ),
    (
        "medical",
        Category::Medical,
        &["pharmacy", "walgreens", "cvs", "hospital", "clinic", "medical", "dental", "doctor"],
    ),
    (
        "insurance",
        Category::Insurance,
        &["insurance", "geico", "allstate", "premium"],
    ),
    (
        "housing",
        Category::Housing,
        &["rent", "mortgage", "lease", "property"],
    ),
    (
        "phone",
        Category::Phone,
        &["phone", "verizon", "t-mobile", "at&t", "wireless", "mobile"],
    ),
    (
        "internet",
        Category::Internet,
        &["internet", "comcast", "xfinity", "broadband", "spectrum", "wifi"],
    ),
    (
        "entertainment",
        Category::Entertainment,
        &["netflix", "spotify", "hulu", "cinema", "movie", "theater", "steam", "concert"],
    ),
];

/// Incoming money that is not income.
const INFLOW_GROUPS: &[(&str, Category, &[&str])] = &[
    ("loan proceeds", Category::Liability, &["loan", "credit line", "cash advance"]),
    ("capital", Category::Equity, &["capital contribution", "owner investment"]),
    ("internal transfer", Category::Asset, &["transfer from", "from savings"]),
];

/// Description keywords that mark a statement line as money coming in.
pub const CREDIT_KEYWORDS: &[&str] = &["credit", "deposit", "interest", "refund"];

/// Best-effort direction guess from a statement description.
pub fn infer_direction(description: &str) -> Direction {
    let text = description.to_lowercase();
    if CREDIT_KEYWORDS.iter().any(|k| text.contains(k)) {
        Direction::Credit
    } else {
        Direction::Debit
    }
}

/// Internal pairing of a rule with its precompiled regexes (if applicable).
struct CompiledRule {
    rule: CategoryRule,
    lowered: Vec<String>,
    compiled_regex: Vec<regex::Regex>,
}

pub struct CategoryRuleEngine {
    rules: Vec<CompiledRule>,
}

impl Default for CategoryRuleEngine {
    fn default() -> Self {
        Self::new(default_rules())
    }
}

impl CategoryRuleEngine {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = if let MatchType::Regex = &rule.match_type {
                    rule.keywords
                        .iter()
                        .filter_map(|k| regex::Regex::new(&format!("(?i){k}")).ok())
                        .collect()
                } else {
                    Vec::new()
                };
                let lowered = rule.keywords.iter().map(|k| k.to_lowercase()).collect();
                CompiledRule { rule, lowered, compiled_regex }
            })
            .collect();
        // Highest priority first; the sort is stable so table order breaks ties.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Self { rules: compiled }
    }

    /// Built-in rules with user rules from a TOML `[[rules]]` list layered on top.
    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        let file: RuleFile =
            toml::from_str(toml_content).map_err(|e| format!("Failed to parse TOML: {e}"))?;
        let mut rules = file.rules;
        rules.extend(default_rules());
        Ok(Self::new(rules))
    }

    pub fn find_matching_rule(&self, description: &str, amount: Money) -> Option<&CategoryRule> {
        self.rules
            .iter()
            .find(|cr| rule_matches(cr, description, amount))
            .map(|cr| &cr.rule)
    }

    /// Final category for a signed amount: the first matching rule, else
    /// income for money in and expense for money out.
    pub fn categorize(&self, description: &str, amount: Money) -> Category {
        match self.find_matching_rule(description, amount) {
            Some(rule) => rule.category,
            None if amount.is_negative() => Category::Expense,
            None => Category::Income,
        }
    }
}

fn rule_matches(cr: &CompiledRule, description: &str, amount: Money) -> bool {
    let rule = &cr.rule;

    let sign_ok = match rule.applies_to {
        AmountSign::Any => true,
        AmountSign::Positive => !amount.is_negative(),
        AmountSign::Negative => amount.is_negative(),
    };
    if !sign_ok {
        return false;
    }

    let text = description.to_lowercase();

    match &rule.match_type {
        MatchType::Contains => cr.lowered.iter().any(|k| text.contains(k.as_str())),
        MatchType::Exact => cr.lowered.iter().any(|k| text.trim() == k),
        MatchType::Regex => cr.compiled_regex.iter().any(|re| re.is_match(description)),
    }
}

fn table_rules(
    groups: &'static [(&'static str, Category, &'static [&'static str])],
    applies_to: AmountSign,
) -> impl Iterator<Item = CategoryRule> {
    groups.iter().map(move |(name, category, keywords)| CategoryRule {
        name: name.to_string(),
        priority: 0,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        match_type: MatchType::Contains,
        category: *category,
        applies_to,
    })
}

pub fn default_rules() -> Vec<CategoryRule> {
    table_rules(EXPENSE_GROUPS, AmountSign::Negative)
        .chain(table_rules(INFLOW_GROUPS, AmountSign::Positive))
        .collect()
}
