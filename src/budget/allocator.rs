//! Budget allocation across spending categories

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Share of the total per category, in percent. Accommodation is the largest
/// category and absorbs the rounding remainder.
pub const ACCOMMODATION_PERCENT: u64 = 35;
pub const FOOD_PERCENT: u64 = 25;
pub const TRANSPORT_PERCENT: u64 = 20;
pub const ACTIVITIES_PERCENT: u64 = 15;
pub const SHOPPING_PERCENT: u64 = 5;

const _: () = assert!(
    ACCOMMODATION_PERCENT + FOOD_PERCENT + TRANSPORT_PERCENT + ACTIVITIES_PERCENT + SHOPPING_PERCENT
        == 100
);

/// Per-category split of a trip budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetBreakdown {
    pub total_budget: u64,
    pub daily_budget: u64,
    pub accommodation: u64,
    pub food: u64,
    pub transport: u64,
    pub activities: u64,
    pub shopping: u64,
}

impl BudgetBreakdown {
    /// Sum of the five spending categories
    #[must_use]
    pub fn category_sum(&self) -> u64 {
        self.accommodation + self.food + self.transport + self.activities + self.shopping
    }
}

/// Input anomalies the allocator corrected instead of failing on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocationWarning {
    /// Duration was missing, zero or negative and 1 day was used
    DurationClamped,
    /// Total was negative and 0 was used
    NegativeTotalClamped,
}

impl AllocationWarning {
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            AllocationWarning::DurationClamped => "duration_clamped",
            AllocationWarning::NegativeTotalClamped => "negative_total_clamped",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub breakdown: BudgetBreakdown,
    pub warnings: Vec<AllocationWarning>,
}

/// Split `total_budget` over the fixed category weights.
///
/// Each category is `floor(total * percent / 100)`; whatever is left after
/// flooring goes to accommodation so the categories sum to the total exactly.
/// `daily_budget` is the total divided by the duration, rounded half up.
#[must_use]
pub fn allocate(total_budget: i64, duration_days: Option<i64>) -> Allocation {
    let mut warnings = Vec::new();

    let total = u64::try_from(total_budget).unwrap_or_else(|_| {
        warn!(total_budget, "negative total budget, using 0");
        warnings.push(AllocationWarning::NegativeTotalClamped);
        0
    });

    let duration = match duration_days.and_then(|d| u64::try_from(d).ok()) {
        Some(d) if d > 0 => d,
        _ => {
            warn!(?duration_days, "invalid trip duration, allocating for 1 day");
            warnings.push(AllocationWarning::DurationClamped);
            1
        }
    };

    let share = |percent: u64| (u128::from(total) * u128::from(percent) / 100) as u64;
    let food = share(FOOD_PERCENT);
    let transport = share(TRANSPORT_PERCENT);
    let activities = share(ACTIVITIES_PERCENT);
    let shopping = share(SHOPPING_PERCENT);
    let accommodation = total - food - transport - activities - shopping;

    let breakdown = BudgetBreakdown {
        total_budget: total,
        daily_budget: (total + duration / 2) / duration,
        accommodation,
        food,
        transport,
        activities,
        shopping,
    };

    Allocation {
        breakdown,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_week_long_trip_matches_documented_sample() {
        let allocation = allocate(18_000, Some(7));
        assert!(allocation.warnings.is_empty());
        assert_eq!(
            allocation.breakdown,
            BudgetBreakdown {
                total_budget: 18_000,
                daily_budget: 2_571,
                accommodation: 6_300,
                food: 4_500,
                transport: 3_600,
                activities: 2_700,
                shopping: 900,
            }
        );
    }

    #[test]
    fn test_daily_budget_rounds_to_nearest() {
        assert_eq!(allocate(17_500, Some(3)).breakdown.daily_budget, 5_833);
        assert_eq!(allocate(10, Some(4)).breakdown.daily_budget, 3);
        assert_eq!(allocate(11, Some(2)).breakdown.daily_budget, 6);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(7)]
    #[case(99)]
    #[case(17_501)]
    #[case(123_457)]
    #[case(1_000_003)]
    fn test_categories_sum_to_total(#[case] total: i64) {
        for duration in [1, 2, 3, 7, 30] {
            let breakdown = allocate(total, Some(duration)).breakdown;
            assert_eq!(breakdown.category_sum(), breakdown.total_budget);
            assert!(breakdown.accommodation >= breakdown.food);
        }
    }

    #[test]
    fn test_remainder_goes_to_accommodation() {
        let breakdown = allocate(99, Some(1)).breakdown;
        assert_eq!(breakdown.food, 24);
        assert_eq!(breakdown.transport, 19);
        assert_eq!(breakdown.activities, 14);
        assert_eq!(breakdown.shopping, 4);
        assert_eq!(breakdown.accommodation, 38);
    }

    #[rstest]
    #[case(None)]
    #[case(Some(0))]
    #[case(Some(-3))]
    fn test_invalid_duration_treated_as_one_day(#[case] duration: Option<i64>) {
        let allocation = allocate(5_000, duration);
        assert_eq!(allocation.breakdown.daily_budget, 5_000);
        assert_eq!(allocation.warnings, vec![AllocationWarning::DurationClamped]);
    }

    #[test]
    fn test_zero_total_yields_zero_categories() {
        let allocation = allocate(0, Some(5));
        assert_eq!(allocation.breakdown.category_sum(), 0);
        assert_eq!(allocation.breakdown.daily_budget, 0);
        assert!(allocation.warnings.is_empty());
    }

    #[test]
    fn test_negative_total_floored_to_zero() {
        let allocation = allocate(-500, Some(0));
        assert_eq!(allocation.breakdown.total_budget, 0);
        assert_eq!(
            allocation.warnings,
            vec![
                AllocationWarning::NegativeTotalClamped,
                AllocationWarning::DurationClamped
            ]
        );
    }

    #[test]
    fn test_serialized_field_names() {
        let value = serde_json::to_value(allocate(18_000, Some(7)).breakdown).unwrap();
        for field in [
            "total_budget",
            "daily_budget",
            "accommodation",
            "food",
            "transport",
            "activities",
            "shopping",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
    }
}
