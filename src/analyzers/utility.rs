/// Arithmetic mean of a slice of values. `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Smallest value. `None` for empty input.
pub fn min_value(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

/// Largest value. `None` for empty input.
pub fn max_value(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_reductions_are_undefined() {
        assert_eq!(mean(&[]), None);
        assert_eq!(min_value(&[]), None);
        assert_eq!(max_value(&[]), None);
    }

    #[test]
    fn test_reductions() {
        let values = [3.5, 3.9, 3.1];
        assert!((mean(&values).unwrap() - 3.5).abs() < 1e-12);
        assert_eq!(min_value(&values), Some(3.1));
        assert_eq!(max_value(&values), Some(3.9));
    }
}
