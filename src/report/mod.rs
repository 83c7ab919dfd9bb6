use rust_decimal::Decimal;
use serde::Serialize;
use std::fmt::Write;

use crate::core::{PeriodSnapshot, SimulationResult, SimulationSummary, round_currency};

pub const DEFAULT_MAX_CHART_POINTS: usize = 100;

const CURRENCY_PREFIX: &str = "R$\u{a0}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedSummary {
    pub total_contributed: String,
    pub total_interest_accrued: String,
    pub total_amount: String,
}

impl From<&SimulationSummary> for FormattedSummary {
    fn from(value: &SimulationSummary) -> Self {
        FormattedSummary {
            total_contributed: format_currency(value.total_contributed),
            total_interest_accrued: format_currency(value.total_interest_accrued),
            total_amount: format_currency(value.total_amount),
        }
    }
}

/// Renders a value as Brazilian reais, e.g. `R$ 1.234,56`.
pub fn format_currency(value: Decimal) -> String {
    let rounded = round_currency(value);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let plain = format!("{:.2}", rounded.abs());
    let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (idx, ch) in whole.chars().enumerate() {
        if idx > 0 && (whole.len() - idx) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{CURRENCY_PREFIX}{grouped},{cents}")
}

/// Thins a series for charting while always keeping the final month.
pub fn decimate(series: &[PeriodSnapshot], max_points: usize) -> Vec<PeriodSnapshot> {
    if max_points == 0 || series.len() <= max_points {
        return series.to_vec();
    }

    let step = series.len().div_ceil(max_points);
    let last = series.len() - 1;
    series
        .iter()
        .enumerate()
        .filter(|(idx, _)| idx % step == 0 || *idx == last)
        .map(|(_, snapshot)| *snapshot)
        .collect()
}

pub fn render_table(result: &SimulationResult) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:>5} | {:>20} | {:>20} | {:>20}",
        "Mês", "Total Investido", "Total em Juros", "Montante"
    );
    let _ = writeln!(out, "{}", "-".repeat(74));
    for snapshot in &result.series {
        let _ = writeln!(
            out,
            "{:>5} | {:>20} | {:>20} | {:>20}",
            snapshot.month_index,
            format_currency(snapshot.total_contributed),
            format_currency(snapshot.total_interest_accrued),
            format_currency(snapshot.total_amount),
        );
    }

    let summary = FormattedSummary::from(&result.summary);
    let _ = writeln!(out);
    let _ = writeln!(out, "Total Investido: {}", summary.total_contributed);
    let _ = writeln!(out, "Total em Juros:  {}", summary.total_interest_accrued);
    let _ = writeln!(out, "Montante Final:  {}", summary.total_amount);
    out
}
