//! Descriptive statistics over plain `f64` slices.
//!
//! All functions return `None` for inputs that are too short for the
//! statistic instead of producing `NaN`.

/// Arithmetic mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divides by `n`, not `n - 1`).
pub fn variance(values: &[f64]) -> Option<f64> {
    let mean = mean(values)?;
    let sum_sq = values
        .iter()
        .map(|&x| (x - mean).powi(2))
        .sum::<f64>();
    Some(sum_sq / values.len() as f64)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> Option<f64> {
    variance(values).map(f64::sqrt)
}

/// Median; the mean of the two middle values for even lengths.
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Least-squares slope of `ys` against `xs`.
///
/// `None` when there are fewer than two points or all `xs` are equal.
pub fn slope(xs: &[f64], ys: &[f64]) -> Option<f64> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return None;
    }
    let x_mean = mean(xs)?;
    let y_mean = mean(ys)?;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&x, &y) in xs.iter().zip(ys) {
        sxy += (x - x_mean) * (y - y_mean);
        sxx += (x - x_mean).powi(2);
    }

    if sxx == 0.0 {
        return None;
    }
    Some(sxy / sxx)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    #[test]
    fn empty_input_has_no_statistics() {
        assert_eq!(mean(&[]), None);
        assert_eq!(variance(&[]), None);
        assert_eq!(median(&[]), None);
        assert_eq!(min(&[]), None);
    }

    #[test]
    fn variance_is_population_variance() {
        // numpy.var([1, 2, 3, 4]) == 1.25
        assert!((variance(&[1.0, 2.0, 3.0, 4.0]).unwrap() - 1.25).abs() < EPS);
    }

    #[test]
    fn median_handles_odd_and_even_lengths() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[4.0, 1.0, 3.0, 2.0]), Some(2.5));
    }

    #[test]
    fn slope_of_a_line_is_exact() {
        let xs = [1.0, 2.0, 3.0, 4.0];
        let ys = [0.5, 1.0, 1.5, 2.0];
        assert!((slope(&xs, &ys).unwrap() - 0.5).abs() < EPS);
    }

    #[test]
    fn slope_is_undefined_for_constant_x() {
        assert_eq!(slope(&[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(slope(&[1.0], &[1.0]), None);
    }
}
