//! Just enough statistics for the mention regression: simple OLS with
//! t-tests, implemented as pure functions.

/// Ordinary least squares of `y` on one predictor `x`, with intercept.
///
/// Inference fields are `None` when the sample leaves no residual degrees
/// of freedom (n <= 2) or the fit is degenerate.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Ols {
    pub n: usize,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: Option<f64>,
    pub adj_r_squared: Option<f64>,
    pub slope_se: Option<f64>,
    pub intercept_se: Option<f64>,
    pub t_slope: Option<f64>,
    pub p_slope: Option<f64>,
    pub f_stat: Option<f64>,
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// `None` when fewer than two points or the predictor has no variance.
pub fn ols(x: &[f64], y: &[f64]) -> Option<Ols> {
    let n = x.len();
    if n != y.len() || n < 2 {
        return None;
    }

    let x_bar = mean(x)?;
    let y_bar = mean(y)?;

    let sxx: f64 = x.iter().map(|v| (v - x_bar).powi(2)).sum();
    let syy: f64 = y.iter().map(|v| (v - y_bar).powi(2)).sum();
    let sxy: f64 = x
        .iter()
        .zip(y.iter())
        .map(|(xi, yi)| (xi - x_bar) * (yi - y_bar))
        .sum();

    if sxx == 0.0 {
        return None;
    }

    let slope = sxy / sxx;
    let intercept = y_bar - slope * x_bar;
    let rss = (syy - slope * sxy).max(0.0);

    let r_squared = if syy > 0.0 { Some(1.0 - rss / syy) } else { None };
    let adj_r_squared = match (r_squared, n > 2) {
        (Some(r2), true) => Some(1.0 - (1.0 - r2) * (n as f64 - 1.0) / (n as f64 - 2.0)),
        _ => None,
    };

    let (slope_se, intercept_se, t_slope, p_slope, f_stat) = if n > 2 {
        let df = (n - 2) as f64;
        let sigma2 = rss / df;
        let se_slope = (sigma2 / sxx).sqrt();
        let se_intercept = (sigma2 * (1.0 / n as f64 + x_bar.powi(2) / sxx)).sqrt();
        if se_slope > 0.0 {
            let t = slope / se_slope;
            (
                Some(se_slope),
                Some(se_intercept),
                Some(t),
                Some(student_t_two_sided(t, df)),
                Some(t * t),
            )
        } else {
            // perfect fit; no sampling variability to test against
            (Some(0.0), Some(se_intercept), None, None, None)
        }
    } else {
        (None, None, None, None, None)
    };

    Some(Ols {
        n,
        slope,
        intercept,
        r_squared,
        adj_r_squared,
        slope_se,
        intercept_se,
        t_slope,
        p_slope,
        f_stat,
    })
}

/// Two-sided p-value for a t statistic with `df` degrees of freedom, via
/// the regularized incomplete beta function.
pub fn student_t_two_sided(t: f64, df: f64) -> f64 {
    inc_beta(df / 2.0, 0.5, df / (df + t * t))
}

/// ln Γ(x), Lanczos approximation.
fn ln_gamma(x: f64) -> f64 {
    const COEFFS: [f64; 6] = [
        76.18009172947146,
        -86.50532032941677,
        24.01409824083091,
        -1.231739572450155,
        0.1208650973866179e-2,
        -0.5395239384953e-5,
    ];
    let mut y = x;
    let tmp = x + 5.5;
    let tmp = tmp - (x + 0.5) * tmp.ln();
    let mut series = 1.000000000190015;
    for coeff in COEFFS {
        y += 1.0;
        series += coeff / y;
    }
    -tmp + (2.5066282746310005 * series / x).ln()
}

/// Continued fraction for the incomplete beta function (Lentz's method).
fn betacf(a: f64, b: f64, x: f64) -> f64 {
    const MAX_ITER: usize = 200;
    const EPS: f64 = 3.0e-12;
    const FPMIN: f64 = 1.0e-300;

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 - qab * x / qap;
    if d.abs() < FPMIN {
        d = FPMIN;
    }
    d = 1.0 / d;
    let mut result = d;

    for m in 1..=MAX_ITER {
        let m = m as f64;
        let m2 = 2.0 * m;

        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        result *= d * c;

        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 + aa * d;
        if d.abs() < FPMIN {
            d = FPMIN;
        }
        c = 1.0 + aa / c;
        if c.abs() < FPMIN {
            c = FPMIN;
        }
        d = 1.0 / d;
        let delta = d * c;
        result *= delta;

        if (delta - 1.0).abs() < EPS {
            break;
        }
    }

    result
}

/// Regularized incomplete beta function I_x(a, b).
fn inc_beta(a: f64, b: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let ln_front =
        ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    if x < (a + 1.0) / (a + b + 2.0) {
        front * betacf(a, b, x) / a
    } else {
        1.0 - front * betacf(b, a, 1.0 - x) / b
    }
}
