use core::cmp;

use crate::NodeError;

const MAX_ITERATIONS: usize = 20;

/// Search for a tight upper bound on the gas limit that allows a transaction
/// to execute successfully.
///
/// `lower_bound` is a gas limit known to fail and `upper_bound` one known to
/// succeed. The probe returns whether the transaction succeeds with the
/// provided gas limit. The returned value was either probed successfully or
/// is the initial upper bound.
pub(crate) fn binary_search_estimation(
    mut lower_bound: u64,
    mut upper_bound: u64,
    mut probe: impl FnMut(u64) -> Result<bool, NodeError>,
) -> Result<u64, NodeError> {
    let mut i = 0;

    while upper_bound.saturating_sub(lower_bound) > min_difference(lower_bound)
        && i < MAX_ITERATIONS
    {
        let mut mid = lower_bound + (upper_bound - lower_bound) / 2;
        if i == 0 {
            // Start close to the lower bound as it's assumed to be derived from the gas
            // used by the transaction.
            let initial_mid = lower_bound.saturating_mul(3);
            mid = cmp::min(mid, initial_mid);
        }

        if probe(mid)? {
            upper_bound = mid;
        } else {
            lower_bound = mid;
        }

        i += 1;
    }

    Ok(upper_bound)
}

#[inline]
fn min_difference(lower_bound: u64) -> u64 {
    if lower_bound >= 4_000_000 {
        50_000
    } else if lower_bound >= 1_000_000 {
        10_000
    } else if lower_bound >= 100_000 {
        1_000
    } else if lower_bound >= 50_000 {
        500
    } else if lower_bound >= 30_000 {
        300
    } else {
        200
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn search(lower: u64, upper: u64, required: u64) -> (u64, Vec<u64>) {
        let mut probes = Vec::new();
        let estimation = binary_search_estimation(lower, upper, |gas_limit| {
            probes.push(gas_limit);
            Ok(gas_limit >= required)
        })
        .expect("probe never fails");

        (estimation, probes)
    }

    #[test]
    fn tolerance_table() {
        assert_eq!(min_difference(4_000_000), 50_000);
        assert_eq!(min_difference(3_999_999), 10_000);
        assert_eq!(min_difference(1_000_000), 10_000);
        assert_eq!(min_difference(100_000), 1_000);
        assert_eq!(min_difference(50_000), 500);
        assert_eq!(min_difference(30_000), 300);
        assert_eq!(min_difference(29_999), 200);
    }

    #[test]
    fn first_probe_is_close_to_lower_bound() {
        let (_, probes) = search(21_001, 30_000_000, 40_000);
        assert_eq!(probes.first(), Some(&63_003));
    }

    #[test]
    fn first_probe_is_capped_by_midpoint() {
        let (_, probes) = search(1_000_000, 2_000_000, 1_200_000);
        assert_eq!(probes.first(), Some(&1_500_000));
    }

    #[test]
    fn never_returns_failing_gas_limit() {
        for required in [21_500, 45_000, 99_999, 777_777, 5_000_000, 29_000_000] {
            let (estimation, _) = search(21_001, 30_000_000, required);

            assert!(estimation >= required, "{estimation} < {required}");
        }
    }

    #[test]
    fn result_is_within_tolerance() {
        let required = 123_456;
        let (estimation, _) = search(21_001, 30_000_000, required);

        assert!(estimation - required <= min_difference(required));
    }

    #[test]
    fn bounded_number_of_probes() {
        let (_, probes) = search(21_001, u64::MAX / 2, u64::MAX / 4);
        assert!(probes.len() <= MAX_ITERATIONS);
    }

    #[test]
    fn no_probe_within_tolerance() {
        let (estimation, probes) = search(21_001, 21_100, 21_050);

        assert_eq!(estimation, 21_100);
        assert!(probes.is_empty());
    }

    #[test]
    fn probe_error_is_propagated() {
        let result = binary_search_estimation(21_001, 30_000_000, |_gas_limit| {
            Err(NodeError::TimestampEqualsPrevious { proposed: 0 })
        });

        assert!(matches!(result, Err(NodeError::TimestampEqualsPrevious { .. })));
    }
}
