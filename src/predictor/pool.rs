/// Ordinary least squares over `(x, y)`; `None` with fewer than two distinct x.
pub fn linear_trend(points: &[(f64, f64)]) -> Option<(f64, f64)> {
    let n = points.len() as f64;
    if points.len() < 2 {
        return None;
    }
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / n;
    let sxx: f64 = points.iter().map(|p| (p.0 - mean_x).powi(2)).sum();
    if sxx == 0.0 {
        return None;
    }
    let sxy: f64 = points.iter().map(|p| (p.0 - mean_x) * (p.1 - mean_y)).sum();
    let slope = sxy / sxx;
    Some((slope, mean_y - slope * mean_x))
}

/// Extrapolate the candidate pool to `target_year`.
///
/// `year_totals` holds one total per year, ascending. The result is floored
/// at the largest total observed: the pool is modelled as non-decreasing.
/// That is a policy for this domain, not a law; a shrinking pool will be
/// over-estimated. With fewer than two years, `last_known` is returned.
pub fn extrapolate_pool(year_totals: &[(i32, f64)], target_year: i32, last_known: u64) -> u64 {
    let points: Vec<(f64, f64)> = year_totals.iter().map(|&(y, t)| (y as f64, t)).collect();
    let Some((slope, intercept)) = linear_trend(&points) else {
        return last_known;
    };
    let predicted = slope * target_year as f64 + intercept;
    let observed_max = points.iter().map(|p| p.1).fold(f64::MIN, f64::max);
    predicted.max(observed_max).max(0.0) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn growing_pool_extrapolates_linearly() {
        let totals = [(2022, 150_000.0), (2023, 160_000.0), (2024, 170_000.0)];
        assert_eq!(extrapolate_pool(&totals, 2026, 0), 190_000);
    }

    #[test]
    fn shrinking_pool_is_floored_at_observed_max() {
        let totals = [(2023, 200_000.0), (2024, 180_000.0)];
        assert_eq!(extrapolate_pool(&totals, 2026, 0), 200_000);
    }

    #[test]
    fn single_year_returns_last_known() {
        assert_eq!(extrapolate_pool(&[(2024, 175_000.0)], 2026, 175_000), 175_000);
        assert_eq!(extrapolate_pool(&[], 2026, 200_000), 200_000);
    }
}
