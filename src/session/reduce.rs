// Session reduction: energy average of decibel readings

/// Average decibel values in the power domain
///
/// `10 * log10(mean(10^(r / 10)))`. Loud moments dominate, as they do for
/// the ear. An empty sequence yields the sentinel `0.0`.
pub fn power_average(readings: &[f64]) -> f64 {
    if readings.is_empty() {
        return 0.0;
    }
    let mean_power =
        readings.iter().map(|r| 10f64.powf(r / 10.0)).sum::<f64>() / readings.len() as f64;
    10.0 * mean_power.log10()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(power_average(&[]), 0.0);
    }

    #[test]
    fn test_constant_sequence_is_identity() {
        for level in [10.0, 45.0, 92.0, 130.0] {
            let avg = power_average(&[level; 25]);
            assert!((avg - level).abs() < 1e-9, "{} -> {}", level, avg);
        }
    }

    #[test]
    fn test_loud_reading_dominates() {
        let avg = power_average(&[60.0, 70.0]);
        assert!((avg - 67.403).abs() < 0.01, "got {}", avg);
        assert!(avg > 65.0);
    }

    #[test]
    fn test_bounded_by_extremes() {
        let readings = [41.0, 55.0, 38.0, 77.0];
        let avg = power_average(&readings);
        assert!(avg > 38.0 && avg < 77.0);
    }
}
