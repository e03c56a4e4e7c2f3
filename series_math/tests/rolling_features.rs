use approx::assert_relative_eq;
use rstest::rstest;
use series_math::differences::difference;
use series_math::moving_averages::rolling_mean;

#[rstest]
#[case(1, 0)]
#[case(3, 2)]
#[case(5, 4)]
fn test_rolling_mean_warm_up(#[case] period: usize, #[case] undefined: usize) {
    let values: Vec<f64> = (0..10).map(|v| v as f64).collect();
    let means = rolling_mean(&values, period).unwrap();

    assert_eq!(means.iter().filter(|m| m.is_none()).count(), undefined);
    assert!(means[undefined..].iter().all(Option::is_some));
}

#[test]
fn test_features_on_linear_series() {
    let values: Vec<f64> = (0..8).map(|v| 10.0 + 2.0 * v as f64).collect();

    let diff1 = difference(&values, 1).unwrap();
    let ma3 = rolling_mean(&values, 3).unwrap();

    for t in 2..values.len() {
        assert_relative_eq!(diff1[t].unwrap(), 2.0);
        // The 3-period mean of a linear series is its middle point.
        assert_relative_eq!(ma3[t].unwrap(), values[t - 1]);
    }
}
