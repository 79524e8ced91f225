//! Least-squares polynomial fitting over weekly series.
//!
//! Small fixed-degree fits (1 or 2) over at most a few dozen points, solved
//! directly from the normal equations. Degenerate systems fall back to the
//! lower degree rather than erroring.

use serde::{Deserialize, Serialize};

const EPS: f64 = 1e-9;

/// `a*x^2 + b*x + c`; degree-1 fits have `a == 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Curve {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

/// Shape classification of a fitted curve, thresholded at 0.01 on the
/// leading coefficients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveTrend {
    AcceleratingIncrease,
    Decelerating,
    SteadyIncrease,
    SteadyDecrease,
    Stable,
}

impl CurveTrend {
    pub fn is_rising(&self) -> bool {
        matches!(self, Self::AcceleratingIncrease | Self::SteadyIncrease)
    }
}

impl Curve {
    pub fn eval(&self, x: f64) -> f64 {
        (self.a * x + self.b) * x + self.c
    }

    pub fn trend(&self) -> CurveTrend {
        if self.a > 0.01 {
            CurveTrend::AcceleratingIncrease
        } else if self.a < -0.01 {
            CurveTrend::Decelerating
        } else if self.b > 0.01 {
            CurveTrend::SteadyIncrease
        } else if self.b < -0.01 {
            CurveTrend::SteadyDecrease
        } else {
            CurveTrend::Stable
        }
    }

    /// Smallest `x > after` where the curve equals `target`, if any real
    /// root lies strictly ahead.
    pub fn crossing_after(&self, target: f64, after: f64) -> Option<f64> {
        if self.a.abs() < EPS {
            if self.b.abs() < EPS {
                return None;
            }
            let x = (target - self.c) / self.b;
            return (x > after).then_some(x);
        }
        let shifted_c = self.c - target;
        let discriminant = self.b * self.b - 4.0 * self.a * shifted_c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_d = discriminant.sqrt();
        let x1 = (-self.b + sqrt_d) / (2.0 * self.a);
        let x2 = (-self.b - sqrt_d) / (2.0 * self.a);
        [x1, x2]
            .into_iter()
            .filter(|x| *x > after)
            .min_by(|left, right| left.partial_cmp(right).unwrap_or(std::cmp::Ordering::Equal))
    }
}

/// Least-squares fit of the given degree (1 or 2). Fewer than 3 points, or
/// a singular quadratic system, degrade to the linear fit; a single point
/// yields a constant curve.
pub fn fit(points: &[(f64, f64)], degree: usize) -> Curve {
    if degree >= 2 && points.len() >= 3 {
        if let Some(curve) = fit_quadratic(points) {
            return curve;
        }
    }
    fit_linear(points)
}

fn fit_linear(points: &[(f64, f64)]) -> Curve {
    let n = points.len();
    if n == 0 {
        return Curve { a: 0.0, b: 0.0, c: 0.0 };
    }
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n as f64;
    let mut covariance = 0.0;
    let mut variance = 0.0;
    for (x, y) in points {
        covariance += (x - mean_x) * (y - mean_y);
        variance += (x - mean_x) * (x - mean_x);
    }
    if variance.abs() < EPS {
        return Curve { a: 0.0, b: 0.0, c: mean_y };
    }
    let slope = covariance / variance;
    Curve { a: 0.0, b: slope, c: mean_y - slope * mean_x }
}

fn fit_quadratic(points: &[(f64, f64)]) -> Option<Curve> {
    // Normal equations for [c, b, a] with power sums of x.
    let n = points.len() as f64;
    let (mut sx, mut sx2, mut sx3, mut sx4) = (0.0, 0.0, 0.0, 0.0);
    let (mut sy, mut sxy, mut sx2y) = (0.0, 0.0, 0.0);
    for (x, y) in points {
        let x2 = x * x;
        sx += x;
        sx2 += x2;
        sx3 += x2 * x;
        sx4 += x2 * x2;
        sy += y;
        sxy += x * y;
        sx2y += x2 * y;
    }
    let mut m = [
        [n, sx, sx2, sy],
        [sx, sx2, sx3, sxy],
        [sx2, sx3, sx4, sx2y],
    ];

    // Gaussian elimination with partial pivoting.
    for col in 0..3 {
        let pivot_row = (col..3)
            .max_by(|left, right| {
                m[*left][col]
                    .abs()
                    .partial_cmp(&m[*right][col].abs())
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .unwrap_or(col);
        if m[pivot_row][col].abs() < EPS {
            return None;
        }
        m.swap(col, pivot_row);
        for row in (col + 1)..3 {
            let factor = m[row][col] / m[col][col];
            for k in col..4 {
                m[row][k] -= factor * m[col][k];
            }
        }
    }
    let a = m[2][3] / m[2][2];
    let b = (m[1][3] - m[1][2] * a) / m[1][1];
    let c = (m[0][3] - m[0][2] * a - m[0][1] * b) / m[0][0];
    Some(Curve { a, b, c })
}

/// Coefficient of determination of `curve` against `points`, clamped to
/// [0, 1]. A zero-variance series scores 0.
pub fn r_squared(points: &[(f64, f64)], curve: &Curve) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / points.len() as f64;
    let mut ss_total = 0.0;
    let mut ss_residual = 0.0;
    for (x, y) in points {
        ss_total += (y - mean_y) * (y - mean_y);
        let predicted = curve.eval(*x);
        ss_residual += (y - predicted) * (y - predicted);
    }
    if ss_total.abs() < EPS {
        return 0.0;
    }
    (1.0 - ss_residual / ss_total).clamp(0.0, 1.0)
}

/// Population variance of a series; 0 for fewer than 2 values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean) * (v - mean)).sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-6, "{actual} != {expected}");
    }

    #[test]
    fn linear_fit_recovers_exact_line() {
        let points = [(1.0, 0.3), (2.0, 0.5), (3.0, 0.7)];
        let curve = fit(&points, 1);
        assert_close(curve.a, 0.0);
        assert_close(curve.b, 0.2);
        assert_close(curve.c, 0.1);
        assert_close(curve.eval(4.0), 0.9);
    }

    #[test]
    fn quadratic_fit_recovers_exact_parabola() {
        // y = 0.05x^2 - 0.1x + 0.4
        let points: Vec<(f64, f64)> = (1..=5)
            .map(|x| {
                let x = x as f64;
                (x, 0.05 * x * x - 0.1 * x + 0.4)
            })
            .collect();
        let curve = fit(&points, 2);
        assert_close(curve.a, 0.05);
        assert_close(curve.b, -0.1);
        assert_close(curve.c, 0.4);
    }

    #[test]
    fn quadratic_request_with_two_points_falls_back_to_linear() {
        let points = [(1.0, 0.2), (2.0, 0.6)];
        let curve = fit(&points, 2);
        assert_close(curve.a, 0.0);
        assert_close(curve.b, 0.4);
    }

    #[test]
    fn collinear_points_give_flat_quadratic_term() {
        let points = [(1.0, 0.3), (2.0, 0.5), (3.0, 0.7)];
        let curve = fit(&points, 2);
        assert!(curve.a.abs() < 1e-6);
        assert_close(curve.eval(4.0), 0.9);
    }

    #[test]
    fn linear_crossing_ahead_is_found() {
        let curve = Curve { a: 0.0, b: 0.2, c: 0.1 };
        let crossing = curve.crossing_after(0.8, 3.0).unwrap();
        assert_close(crossing, 3.5);
    }

    #[test]
    fn crossing_behind_current_week_is_rejected() {
        let curve = Curve { a: 0.0, b: 0.2, c: 0.1 };
        assert!(curve.crossing_after(0.3, 3.0).is_none());
    }

    #[test]
    fn quadratic_crossing_picks_nearest_future_root() {
        // Roots of 0.1x^2 - 0.9 = 0 at +-3.
        let curve = Curve { a: 0.1, b: 0.0, c: 0.0 };
        let crossing = curve.crossing_after(0.9, 0.0).unwrap();
        assert_close(crossing, 3.0);
    }

    #[test]
    fn negative_discriminant_means_no_crossing() {
        let curve = Curve { a: 1.0, b: 0.0, c: 0.5 };
        assert!(curve.crossing_after(0.2, 0.0).is_none());
    }

    #[test]
    fn flat_curve_never_crosses() {
        let curve = Curve { a: 0.0, b: 0.0, c: 0.5 };
        assert!(curve.crossing_after(0.8, 0.0).is_none());
    }

    #[test]
    fn r_squared_is_one_for_perfect_fit_zero_for_flat_series() {
        let points = [(1.0, 0.3), (2.0, 0.5), (3.0, 0.7)];
        let curve = fit(&points, 1);
        assert_close(r_squared(&points, &curve), 1.0);

        let flat = [(1.0, 0.5), (2.0, 0.5), (3.0, 0.5)];
        let flat_curve = fit(&flat, 1);
        assert_close(r_squared(&flat, &flat_curve), 0.0);
    }

    #[test]
    fn trend_classification_thresholds() {
        assert_eq!(Curve { a: 0.05, b: 0.0, c: 0.0 }.trend(), CurveTrend::AcceleratingIncrease);
        assert_eq!(Curve { a: -0.05, b: 0.0, c: 0.0 }.trend(), CurveTrend::Decelerating);
        assert_eq!(Curve { a: 0.0, b: 0.05, c: 0.0 }.trend(), CurveTrend::SteadyIncrease);
        assert_eq!(Curve { a: 0.0, b: -0.05, c: 0.0 }.trend(), CurveTrend::SteadyDecrease);
        assert_eq!(Curve { a: 0.0, b: 0.0, c: 0.9 }.trend(), CurveTrend::Stable);
    }

    #[test]
    fn variance_of_constant_series_is_zero() {
        assert_close(variance(&[0.4, 0.4, 0.4]), 0.0);
        assert_close(variance(&[0.2, 0.6]), 0.04);
    }
}
