//! Pure statistical estimators over numeric samples. Nothing here mutates its
//! input; empty or degenerate samples yield neutral defaults instead of
//! failing, since a strategy can legitimately produce a degenerate
//! distribution.

use super::types::{DescriptiveStats, Regression};

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample variance (divisor n-1). Zero for fewer than two points.
pub fn variance(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (n as f64 - 1.0)
}

pub fn std_dev(values: &[f64]) -> f64 {
    variance(values).sqrt()
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2]
    } else {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    }
}

/// Fisher-Pearson skewness: third central moment with divisor n over the
/// cubed sample standard deviation. Zero for n < 3 or a constant sample.
pub fn skewness(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 3 {
        return 0.0;
    }
    let sd = std_dev(values);
    if sd == 0.0 {
        return 0.0;
    }
    let m = mean(values);
    let m3 = values.iter().map(|v| (v - m).powi(3)).sum::<f64>() / n as f64;
    m3 / sd.powi(3)
}

/// Fourth standardized moment minus 3. Zero for n < 4 or a constant sample.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 4 {
        return 0.0;
    }
    let sd = std_dev(values);
    if sd == 0.0 {
        return 0.0;
    }
    let m = mean(values);
    let m4 = values.iter().map(|v| (v - m).powi(4)).sum::<f64>() / n as f64;
    m4 / sd.powi(4) - 3.0
}

/// Interpolated percentile over an unsorted sample; `p` ranges 0-100.
pub fn percentile(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    percentile_sorted(&sorted, p)
}

/// Interpolated percentile over an ascending-sorted sample, using the rank
/// `p/100 * (n-1)` with linear interpolation between the two nearest values.
pub fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return sorted[0];
    }

    let rank = (p / 100.0).clamp(0.0, 1.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        sorted[lower]
    } else {
        let w = rank - lower as f64;
        sorted[lower] * (1.0 - w) + sorted[upper] * w
    }
}

/// Historical value-at-risk at confidence `alpha`: the negated
/// `(1-alpha)*100` percentile, so a negative lower tail reads as a positive
/// loss magnitude.
pub fn value_at_risk(values: &[f64], alpha: f64) -> f64 {
    -percentile(values, (1.0 - alpha) * 100.0)
}

/// Expected shortfall (CVaR): negated mean of the sample values at or below
/// the VaR cutoff. Zero when there is no tail to average.
pub fn expected_shortfall(values: &[f64], alpha: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let cutoff = percentile(values, (1.0 - alpha) * 100.0);
    let tail: Vec<f64> = values.iter().copied().filter(|v| *v <= cutoff).collect();
    if tail.is_empty() {
        return 0.0;
    }
    -mean(&tail)
}

/// Pearson correlation over paired points, truncated to the shorter series.
/// Zero for fewer than two pairs or when either side has no variance.
pub fn pearson_correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }

    let x = &x[..n];
    let y = &y[..n];
    let mx = mean(x);
    let my = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        let dy = y[i] - my;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return 0.0;
    }
    sxy / (sxx * syy).sqrt()
}

/// Ordinary least squares fit of y on x, truncated to the shorter series.
pub fn simple_linear_regression(x: &[f64], y: &[f64]) -> Regression {
    let n = x.len().min(y.len());
    if n < 2 {
        return Regression {
            slope: 0.0,
            intercept: mean(&y[..n]),
            r_squared: 0.0,
        };
    }

    let x = &x[..n];
    let y = &y[..n];
    let mx = mean(x);
    let my = mean(y);

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for i in 0..n {
        let dx = x[i] - mx;
        sxy += dx * (y[i] - my);
        sxx += dx * dx;
    }

    if sxx == 0.0 {
        return Regression {
            slope: 0.0,
            intercept: my,
            r_squared: 0.0,
        };
    }

    let slope = sxy / sxx;
    let r = pearson_correlation(x, y);
    Regression {
        slope,
        intercept: my - slope * mx,
        r_squared: r * r,
    }
}

/// Full symmetric matrix of pairwise Pearson correlations for a set of
/// labeled series, in input order, with the diagonal forced to exactly 1.
pub fn correlation_matrix(series: &[(&str, &[f64])]) -> Vec<Vec<f64>> {
    let n = series.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let r = pearson_correlation(series[i].1, series[j].1);
            matrix[i][j] = r;
            matrix[j][i] = r;
        }
    }

    matrix
}

pub fn descriptive_stats(values: &[f64]) -> DescriptiveStats {
    if values.is_empty() {
        return DescriptiveStats {
            count: 0,
            mean: 0.0,
            median: 0.0,
            std_dev: 0.0,
            skewness: 0.0,
            excess_kurtosis: 0.0,
            min: 0.0,
            max: 0.0,
            p5: 0.0,
            p25: 0.0,
            p75: 0.0,
            p95: 0.0,
        };
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    DescriptiveStats {
        count: values.len(),
        mean: mean(values),
        median: percentile_sorted(&sorted, 50.0),
        std_dev: std_dev(values),
        skewness: skewness(values),
        excess_kurtosis: excess_kurtosis(values),
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        p5: percentile_sorted(&sorted, 5.0),
        p25: percentile_sorted(&sorted, 25.0),
        p75: percentile_sorted(&sorted, 75.0),
        p95: percentile_sorted(&sorted, 95.0),
    }
}
