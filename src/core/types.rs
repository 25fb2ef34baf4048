use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Strategy {
    Minimum,
    Aggressive,
    Investing,
}

impl Strategy {
    pub const ALL: [Strategy; 3] = [Strategy::Minimum, Strategy::Aggressive, Strategy::Investing];

    pub fn key(self) -> &'static str {
        match self {
            Strategy::Minimum => "minimum",
            Strategy::Aggressive => "aggressive",
            Strategy::Investing => "investing",
        }
    }

    pub(crate) fn index(self) -> u32 {
        match self {
            Strategy::Minimum => 0,
            Strategy::Aggressive => 1,
            Strategy::Investing => 2,
        }
    }

    // The aggressive multiplier is deliberately a fixed accelerated payment,
    // not a function of monthly surplus.
    pub fn debt_payment(self, minimum_payment: f64, debt: f64) -> f64 {
        match self {
            Strategy::Minimum | Strategy::Investing => minimum_payment.min(debt),
            Strategy::Aggressive => debt.min(minimum_payment * 2.5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Params {
    pub monthly_income: f64,
    pub income_std: f64,
    pub monthly_fixed_expenses: f64,
    pub monthly_variable_expenses: f64,
    pub variable_expense_std: f64,
    pub initial_cash: f64,
    pub initial_savings: f64,
    pub debt_principal: f64,
    pub debt_apr: f64,
    pub minimum_debt_payment: f64,
    pub annual_return: f64,
    pub annual_inflation: f64,
    pub horizon_years: u32,
    pub net_worth_goal: f64,
    pub seed: u64,
}

impl Params {
    pub fn horizon_months(&self) -> u32 {
        self.horizon_years * 12
    }

    pub fn validate(&self) -> Result<(), String> {
        for (label, value) in [
            ("monthly_income", self.monthly_income),
            ("income_std", self.income_std),
            ("monthly_fixed_expenses", self.monthly_fixed_expenses),
            ("monthly_variable_expenses", self.monthly_variable_expenses),
            ("variable_expense_std", self.variable_expense_std),
            ("initial_cash", self.initial_cash),
            ("initial_savings", self.initial_savings),
            ("debt_principal", self.debt_principal),
            ("debt_apr", self.debt_apr),
            ("minimum_debt_payment", self.minimum_debt_payment),
            ("annual_return", self.annual_return),
            ("annual_inflation", self.annual_inflation),
            ("net_worth_goal", self.net_worth_goal),
        ] {
            if !value.is_finite() {
                return Err(format!("{label} must be finite"));
            }
        }

        if self.horizon_years == 0 {
            return Err("horizon_years must be >= 1".to_string());
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonthState {
    pub cash: f64,
    pub savings: f64,
    pub debt: f64,
    pub net_worth: f64,
}

#[derive(Debug, Clone)]
pub struct Trajectory {
    pub months: Vec<MonthState>,
    pub ruined: bool,
    pub goal_hit: bool,
    pub debt_free_month: Option<u32>,
}

impl Trajectory {
    pub fn terminal_net_worth(&self) -> f64 {
        self.months.last().map(|m| m.net_worth).unwrap_or(0.0)
    }
}

#[derive(Debug, Clone)]
pub struct StrategyResult {
    pub terminal_net_worths: Vec<f64>,
    pub trajectories: Vec<Trajectory>,
    pub ruin_probability: f64,
    pub goal_probability: f64,
    pub debt_free_probability: f64,
    pub median_debt_free_month: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SimulationResults {
    pub minimum: StrategyResult,
    pub aggressive: StrategyResult,
    pub investing: StrategyResult,
}

impl SimulationResults {
    pub fn get(&self, strategy: Strategy) -> &StrategyResult {
        match strategy {
            Strategy::Minimum => &self.minimum,
            Strategy::Aggressive => &self.aggressive,
            Strategy::Investing => &self.investing,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Strategy, &StrategyResult)> {
        Strategy::ALL.into_iter().map(move |s| (s, self.get(s)))
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptiveStats {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub skewness: f64,
    pub excess_kurtosis: f64,
    pub min: f64,
    pub max: f64,
    pub p5: f64,
    pub p25: f64,
    pub p75: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBands {
    pub p5: Vec<f64>,
    pub p50: Vec<f64>,
    pub p95: Vec<f64>,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

#[derive(Debug, Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
