use super::sampler::{Sampler, SeededSampler, derive_seed};
use super::stats;
use super::types::{
    CancelToken, ConfidenceBands, MonthState, Params, SimulationResults, Strategy, StrategyResult,
    Trajectory,
};

pub const DEFAULT_RUNS: u32 = 5000;

// Cap on retained full trajectories per strategy; terminal outcomes are kept
// for every run regardless.
const RETAINED_TRAJECTORIES: usize = 200;

pub fn simulate_once(params: &Params, strategy: Strategy, sampler: &mut impl Sampler) -> Trajectory {
    let horizon = params.horizon_months();
    let monthly_inflation = params.annual_inflation / 12.0 / 100.0;
    let monthly_debt_rate = params.debt_apr / 100.0 / 12.0;
    let monthly_return = params.annual_return / 100.0 / 12.0;
    let return_std = monthly_return.abs() * 0.4 + 0.005;
    let variable_floor = 0.2 * params.monthly_variable_expenses;

    let mut cash = params.initial_cash;
    let mut savings = params.initial_savings;
    let mut debt = params.debt_principal;

    let mut months = Vec::with_capacity(horizon as usize);
    let mut ruined = false;
    let mut goal_hit = false;
    let mut debt_free_month = None;

    for month in 0..horizon {
        let income = sampler
            .normal(params.monthly_income, params.income_std)
            .max(0.0);
        let variable_drawn = sampler
            .normal(params.monthly_variable_expenses, params.variable_expense_std)
            .max(variable_floor);

        let inflation_factor = (1.0 + monthly_inflation).powi(month as i32);
        let fixed_expense = params.monthly_fixed_expenses * inflation_factor;
        let variable_expense = variable_drawn * inflation_factor;

        let mut payment = 0.0;
        if debt > 0.0 {
            // Interest accrues on the principal before the payment lands.
            debt += debt * monthly_debt_rate;
            payment = strategy.debt_payment(params.minimum_debt_payment, debt);
            debt -= payment;
        }
        if debt <= 0.0 && debt_free_month.is_none() {
            debt_free_month = Some(month);
        }

        let growth = sampler.normal(monthly_return, return_std);
        savings = (savings * (1.0 + growth)).max(0.0);

        let extra_invest = if strategy == Strategy::Investing && debt <= 0.0 {
            0.10 * income
        } else {
            0.0
        };
        savings += extra_invest;

        cash += income - fixed_expense - variable_expense - payment - extra_invest;

        if cash < 0.0 && savings > 0.0 {
            let transfer = (-cash).min(savings);
            savings -= transfer;
            cash += transfer;
        }
        if cash < 0.0 {
            ruined = true;
        }

        cash = round_cents(cash);
        savings = round_cents(savings);
        debt = round_cents(debt);
        let net_worth = cash + savings - debt;
        if net_worth >= params.net_worth_goal {
            goal_hit = true;
        }

        months.push(MonthState {
            cash,
            savings,
            debt,
            net_worth,
        });
    }

    Trajectory {
        months,
        ruined,
        goal_hit,
        debt_free_month,
    }
}

pub fn run_monte_carlo(params: &Params, runs: u32) -> Result<SimulationResults, String> {
    let cancel = CancelToken::new();
    match run_monte_carlo_with_cancel(params, runs, &cancel)? {
        Some(results) => Ok(results),
        None => unreachable!("local cancel token never fires"),
    }
}

/// Cancellation is cooperative and polled once per completed trajectory;
/// `Ok(None)` means the caller cancelled before all runs finished.
pub fn run_monte_carlo_with_cancel(
    params: &Params,
    runs: u32,
    cancel: &CancelToken,
) -> Result<Option<SimulationResults>, String> {
    params.validate()?;
    if runs == 0 {
        return Err("runs must be >= 1".to_string());
    }

    let Some(minimum) = run_strategy(params, Strategy::Minimum, runs, cancel) else {
        return Ok(None);
    };
    let Some(aggressive) = run_strategy(params, Strategy::Aggressive, runs, cancel) else {
        return Ok(None);
    };
    let Some(investing) = run_strategy(params, Strategy::Investing, runs, cancel) else {
        return Ok(None);
    };

    Ok(Some(SimulationResults {
        minimum,
        aggressive,
        investing,
    }))
}

fn run_strategy(
    params: &Params,
    strategy: Strategy,
    runs: u32,
    cancel: &CancelToken,
) -> Option<StrategyResult> {
    let keep_every = (runs as usize / RETAINED_TRAJECTORIES).max(1);

    let mut terminal_net_worths = Vec::with_capacity(runs as usize);
    let mut trajectories = Vec::with_capacity(RETAINED_TRAJECTORIES + 1);
    let mut ruined_count = 0_u32;
    let mut goal_count = 0_u32;
    let mut debt_free_months = Vec::new();

    for run_id in 0..runs {
        if cancel.is_cancelled() {
            return None;
        }

        // One seed per (strategy, run) keeps runs independent and the whole
        // sweep reproducible regardless of execution order.
        let mut sampler = SeededSampler::new(derive_seed(params.seed, strategy.index(), run_id));
        let trajectory = simulate_once(params, strategy, &mut sampler);

        terminal_net_worths.push(trajectory.terminal_net_worth());
        if trajectory.ruined {
            ruined_count += 1;
        }
        if trajectory.goal_hit {
            goal_count += 1;
        }
        if let Some(month) = trajectory.debt_free_month {
            debt_free_months.push(month as f64);
        }
        if run_id as usize % keep_every == 0 {
            trajectories.push(trajectory);
        }
    }

    terminal_net_worths.sort_by(|a, b| a.total_cmp(b));

    let n = runs as f64;
    let median_debt_free_month = if debt_free_months.is_empty() {
        None
    } else {
        Some(stats::median(&debt_free_months))
    };

    Some(StrategyResult {
        ruin_probability: ruined_count as f64 / n,
        goal_probability: goal_count as f64 / n,
        debt_free_probability: debt_free_months.len() as f64 / n,
        median_debt_free_month,
        terminal_net_worths,
        trajectories,
    })
}

/// Per-month 5th/50th/95th percentile envelope of net worth across the
/// retained trajectories.
pub fn build_confidence_bands(trajectories: &[Trajectory]) -> ConfidenceBands {
    let month_count = trajectories
        .iter()
        .map(|t| t.months.len())
        .max()
        .unwrap_or(0);

    let mut p5 = Vec::with_capacity(month_count);
    let mut p50 = Vec::with_capacity(month_count);
    let mut p95 = Vec::with_capacity(month_count);

    for month in 0..month_count {
        let mut values: Vec<f64> = trajectories
            .iter()
            .filter_map(|t| t.months.get(month))
            .map(|state| state.net_worth)
            .collect();
        values.sort_by(|a, b| a.total_cmp(b));

        p5.push(stats::percentile_sorted(&values, 5.0));
        p50.push(stats::percentile_sorted(&values, 50.0));
        p95.push(stats::percentile_sorted(&values, 95.0));
    }

    ConfidenceBands { p5, p50, p95 }
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
