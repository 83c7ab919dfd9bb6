use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateBasis {
    Annual,
    Monthly,
}

impl RateBasis {
    pub fn label(self) -> &'static str {
        match self {
            RateBasis::Annual => "anual",
            RateBasis::Monthly => "mensal",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizonUnit {
    Years,
    Months,
}

impl HorizonUnit {
    pub fn label(self) -> &'static str {
        match self {
            HorizonUnit::Years => "anos",
            HorizonUnit::Months => "meses",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    #[serde(with = "rust_decimal::serde::float")]
    pub initial_value: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_contribution: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub interest_rate: Decimal,
    pub interest_rate_basis: RateBasis,
    pub horizon: u32,
    pub horizon_unit: HorizonUnit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSnapshot {
    pub month_index: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_contributed: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_interest_accrued: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationSummary {
    #[serde(with = "rust_decimal::serde::float")]
    pub total_contributed: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_interest_accrued: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
}

impl From<&PeriodSnapshot> for SimulationSummary {
    fn from(value: &PeriodSnapshot) -> Self {
        SimulationSummary {
            total_contributed: value.total_contributed,
            total_interest_accrued: value.total_interest_accrued,
            total_amount: value.total_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationResult {
    pub horizon_in_months: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub monthly_rate: Decimal,
    pub series: Vec<PeriodSnapshot>,
    pub summary: SimulationSummary,
}
