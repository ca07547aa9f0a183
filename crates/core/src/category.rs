use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of ledger categories.
///
/// The first five are the classic account types; the rest are expense groups
/// assigned to statement imports by the keyword categorizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Asset,
    Liability,
    Income,
    Expense,
    Equity,
    Groceries,
    Fuel,
    Dining,
    Utilities,
    Shopping,
    Transport,
    Medical,
    Insurance,
    Housing,
    Phone,
    Internet,
    Entertainment,
}

pub const ALL_CATEGORIES: &[Category] = &[
    Category::Asset,
    Category::Liability,
    Category::Income,
    Category::Expense,
    Category::Equity,
    Category::Groceries,
    Category::Fuel,
    Category::Dining,
    Category::Utilities,
    Category::Shopping,
    Category::Transport,
    Category::Medical,
    Category::Insurance,
    Category::Housing,
    Category::Phone,
    Category::Internet,
    Category::Entertainment,
];

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Asset => "asset",
            Category::Liability => "liability",
            Category::Income => "income",
            Category::Expense => "expense",
            Category::Equity => "equity",
            Category::Groceries => "groceries",
            Category::Fuel => "fuel",
            Category::Dining => "dining",
            Category::Utilities => "utilities",
            Category::Shopping => "shopping",
            Category::Transport => "transport",
            Category::Medical => "medical",
            Category::Insurance => "insurance",
            Category::Housing => "housing",
            Category::Phone => "phone",
            Category::Internet => "internet",
            Category::Entertainment => "entertainment",
        }
    }

    /// True for `Expense` and every expense group.
    pub fn is_expense(self) -> bool {
        !matches!(
            self,
            Category::Asset | Category::Liability | Category::Income | Category::Equity
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str() == wanted)
            .ok_or_else(|| format!("Unknown category: '{}'", s.trim()))
    }
}
