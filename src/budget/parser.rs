//! Budget descriptor parsing
//!
//! Turns the free-text budget label chosen in the front end (for example
//! `"Moderate (₹10,000 - ₹25,000)"`) into a single total amount. Parsing never
//! fails: an unrecognized descriptor resolves to the configured default.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};

/// Ordered tier table. First match wins, so more specific names come first
/// and the generic word "budget" is tried last.
pub const BUDGET_TIERS: &[(&str, u64)] = &[
    ("premium", 75_000),
    ("luxury", 40_000),
    ("moderate", 18_000),
    ("budget", 8_000),
];

/// Total used when neither a range nor a tier can be found.
pub const DEFAULT_TOTAL_BUDGET: u64 = 15_000;

static RANGE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(\d[\d.,]*\d|\d)\s*(?:-|–|—|to)\s*(?:\p{Sc}|rs\.?|inr|usd|eur)?\s*(\d[\d.,]*\d|\d)",
    )
    .expect("budget range pattern is valid")
});

/// Currency context for amounts embedded in a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyHint {
    /// Symbol stripped from the descriptor before matching, e.g. `₹` or `$`
    pub symbol: String,
    /// Digit group separator, `,` for `10,000` or `.` for `10.000`
    pub thousands_separator: char,
}

impl CurrencyHint {
    pub fn new(symbol: impl Into<String>, thousands_separator: char) -> Self {
        Self {
            symbol: symbol.into(),
            thousands_separator,
        }
    }

    fn decimal_separator(&self) -> char {
        if self.thousands_separator == '.' { ',' } else { '.' }
    }

    /// Format an amount with this currency's symbol and digit grouping.
    #[must_use]
    pub fn format_amount(&self, amount: u64) -> String {
        let digits = amount.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, c) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(self.thousands_separator);
            }
            grouped.push(c);
        }
        format!("{}{grouped}", self.symbol)
    }
}

impl Default for CurrencyHint {
    fn default() -> Self {
        Self::new("₹", ',')
    }
}

/// Where a parsed total came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetSource {
    /// Midpoint of an explicit numeric range
    Range { low: f64, high: f64 },
    /// Fixed default for a named tier
    Tier { name: &'static str },
    /// Nothing recognizable, global default used
    Default,
}

/// Result of parsing a budget descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedBudget {
    pub total: u64,
    pub source: BudgetSource,
}

impl ParsedBudget {
    #[must_use]
    pub fn is_default(&self) -> bool {
        matches!(self.source, BudgetSource::Default)
    }
}

/// Resolve a budget descriptor into a total amount using the built-in default.
#[must_use]
pub fn parse_budget(descriptor: &str, currency: &CurrencyHint) -> ParsedBudget {
    parse_budget_with_default(descriptor, currency, DEFAULT_TOTAL_BUDGET)
}

/// Resolve a budget descriptor into a total amount.
///
/// Tries, in order: an explicit numeric range (midpoint, rounded), a known
/// tier name, and finally `default_total`.
#[must_use]
pub fn parse_budget_with_default(
    descriptor: &str,
    currency: &CurrencyHint,
    default_total: u64,
) -> ParsedBudget {
    let cleaned = if currency.symbol.is_empty() {
        descriptor.to_string()
    } else {
        descriptor.replace(currency.symbol.as_str(), " ")
    };

    if let Some((low, high)) = find_range(&cleaned, currency) {
        let total = ((low + high) / 2.0).round().max(0.0) as u64;
        debug!(low, high, total, "budget resolved from numeric range");
        return ParsedBudget {
            total,
            source: BudgetSource::Range { low, high },
        };
    }

    let label = descriptor.to_lowercase();
    if let Some(&(name, total)) = BUDGET_TIERS.iter().find(|(name, _)| label.contains(name)) {
        debug!(tier = name, total, "budget resolved from tier");
        return ParsedBudget {
            total,
            source: BudgetSource::Tier { name },
        };
    }

    warn!(
        descriptor,
        default_total, "unrecognized budget descriptor, using default total"
    );
    ParsedBudget {
        total: default_total,
        source: BudgetSource::Default,
    }
}

fn find_range(text: &str, currency: &CurrencyHint) -> Option<(f64, f64)> {
    RANGE_PATTERN.captures_iter(text).find_map(|caps| {
        let low = parse_amount(caps.get(1)?.as_str(), currency)?;
        let high = parse_amount(caps.get(2)?.as_str(), currency)?;
        Some((low.min(high), low.max(high)))
    })
}

fn parse_amount(raw: &str, currency: &CurrencyHint) -> Option<f64> {
    let decimal = currency.decimal_separator();
    let normalized: String = raw
        .chars()
        .filter(|c| *c != currency.thousands_separator)
        .map(|c| if c == decimal { '.' } else { c })
        .collect();
    normalized.parse::<f64>().ok().filter(|v| v.is_finite())
}
