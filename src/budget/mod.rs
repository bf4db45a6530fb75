//! Budget handling: turning a budget descriptor into a per-category breakdown

pub mod allocator;
pub mod parser;

pub use allocator::{Allocation, AllocationWarning, BudgetBreakdown, allocate};
pub use parser::{
    BUDGET_TIERS, BudgetSource, CurrencyHint, DEFAULT_TOTAL_BUDGET, ParsedBudget, parse_budget,
    parse_budget_with_default,
};
