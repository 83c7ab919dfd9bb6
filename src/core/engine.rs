use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use super::types::{
    HorizonUnit, PeriodSnapshot, RateBasis, SimulationParameters, SimulationResult,
    SimulationSummary,
};

const CURRENCY_DECIMALS: u32 = 2;
const MONTHS_PER_YEAR: u32 = 12;
const PREALLOCATED_MONTHS: u32 = 1200;

/// Runs the month-by-month projection. The series holds one snapshot per
/// month, so memory grows linearly with the horizon; callers that accept
/// untrusted input should cap it first.
pub fn project(params: &SimulationParameters) -> SimulationResult {
    let horizon_in_months = horizon_in_months(params.horizon, params.horizon_unit);
    let monthly_rate = monthly_rate(params.interest_rate, params.interest_rate_basis);

    let mut series = Vec::with_capacity(horizon_in_months.min(PREALLOCATED_MONTHS) as usize + 1);
    let mut total_amount = params.initial_value;
    let mut total_contributed = params.initial_value;
    series.push(PeriodSnapshot {
        month_index: 0,
        total_contributed,
        total_interest_accrued: Decimal::ZERO,
        total_amount,
    });

    for month_index in 1..=horizon_in_months {
        let snapshot = advance_month(
            total_amount,
            total_contributed,
            monthly_rate,
            params.monthly_contribution,
            month_index,
        );
        // The next month compounds on the rounded balance, never the exact one.
        total_amount = snapshot.total_amount;
        total_contributed = snapshot.total_contributed;
        series.push(snapshot);
    }

    let summary = series
        .last()
        .map(SimulationSummary::from)
        .unwrap_or(SimulationSummary {
            total_contributed,
            total_interest_accrued: Decimal::ZERO,
            total_amount,
        });

    SimulationResult {
        horizon_in_months,
        monthly_rate,
        series,
        summary,
    }
}

pub fn horizon_in_months(horizon: u32, unit: HorizonUnit) -> u32 {
    match unit {
        HorizonUnit::Years => horizon.saturating_mul(MONTHS_PER_YEAR),
        HorizonUnit::Months => horizon,
    }
}

pub fn monthly_rate(interest_rate: Decimal, basis: RateBasis) -> Decimal {
    let fraction = interest_rate / Decimal::ONE_HUNDRED;
    match basis {
        RateBasis::Monthly => fraction,
        RateBasis::Annual => annual_to_monthly(fraction),
    }
}

// Geometric conversion: (1 + annual)^(1/12) - 1. A non-positive growth factor
// has no real twelfth root, so the rate saturates at a total monthly loss.
fn annual_to_monthly(annual_fraction: Decimal) -> Decimal {
    let growth = Decimal::ONE
        .saturating_add(annual_fraction)
        .to_f64()
        .unwrap_or(0.0);
    if growth <= 0.0 {
        return Decimal::NEGATIVE_ONE;
    }

    let monthly = growth.powf(1.0 / f64::from(MONTHS_PER_YEAR)) - 1.0;
    Decimal::from_f64_retain(monthly).unwrap_or(Decimal::ZERO)
}

fn advance_month(
    total_amount: Decimal,
    total_contributed: Decimal,
    monthly_rate: Decimal,
    monthly_contribution: Decimal,
    month_index: u32,
) -> PeriodSnapshot {
    let interest_earned = total_amount.saturating_mul(monthly_rate);
    let total_amount = round_currency(
        total_amount
            .saturating_add(interest_earned)
            .saturating_add(monthly_contribution),
    );
    let total_contributed = round_currency(total_contributed.saturating_add(monthly_contribution));

    PeriodSnapshot {
        month_index,
        total_contributed,
        total_interest_accrued: round_currency(total_amount.saturating_sub(total_contributed)),
        total_amount,
    }
}

pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(CURRENCY_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
}
