pub fn mean(data: &[f64]) -> Option<f64> {
    if data.is_empty() {
        return None;
    }
    Some(data.iter().sum::<f64>() / data.len() as f64)
}

/// Population standard deviation; holds within one session are the whole
/// population, not a sample.
pub fn std_dev(data: &[f64]) -> Option<f64> {
    let m = mean(data)?;
    let variance = data.iter().map(|v| (m - v) * (m - v)).sum::<f64>() / data.len() as f64;
    Some(variance.sqrt())
}

/// Format whole seconds as m:ss for the hold and recovery displays.
pub fn format_mmss(secs: u64) -> String {
    format!("{}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_hold_durations() {
        assert_eq!(mean(&[60., 75., 90.]), Some(75.0));
        assert_eq!(mean(&[30., 45., 62., 88.]), Some(56.25));
    }

    #[test]
    fn mean_of_no_rounds_is_none() {
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn std_dev_of_hold_durations() {
        // Holds of 60/75/90s spread sqrt(150) ≈ 12.25s around the mean.
        let spread = std_dev(&[60., 75., 90.]).unwrap();
        assert!((spread - 150f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn identical_holds_have_no_spread() {
        assert_eq!(std_dev(&[45.0, 45.0, 45.0]), Some(0.0));
    }

    #[test]
    fn std_dev_of_no_rounds_is_none() {
        assert_eq!(std_dev(&[]), None);
    }

    #[test]
    fn test_format_mmss() {
        assert_eq!(format_mmss(0), "0:00");
        assert_eq!(format_mmss(9), "0:09");
        assert_eq!(format_mmss(65), "1:05");
        assert_eq!(format_mmss(600), "10:00");
    }
}
