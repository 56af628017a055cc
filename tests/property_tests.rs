//! Property-based tests for the triangular risk model
//!
//! - parameter ordering and non-negativity
//! - monotone, bounded CDF with the expected anchor values
//! - reporting never leaves [0, 100]

use completion_risk::distribution::{cdf, derive_params, pdf, TriangularParams};
use completion_risk::feature_assembler::{assemble, FeatureSchema};
use completion_risk::types::response::{percent, round_to};
use proptest::prelude::*;
use serde_json::{Map, Value};

/// Non-degenerate triangles a < b < c
fn arb_triangle() -> impl Strategy<Value = TriangularParams> {
    (0.0f64..1000.0, 0.01f64..100.0, 0.01f64..100.0).prop_map(|(a, left, right)| {
        TriangularParams {
            a,
            b: a + left,
            c: a + left + right,
        }
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: derived bounds are ordered and non-negative
    #[test]
    fn prop_params_ordered(e in 0.0f64..1e6) {
        let p = derive_params(e);
        prop_assert!(p.a <= p.b && p.b <= p.c);
        prop_assert!(p.a >= 0.0);
    }

    /// Property: any input, even garbage, yields ordered bounds
    #[test]
    fn prop_params_ordered_for_any_input(e in any::<f64>()) {
        let p = derive_params(e);
        prop_assert!(p.a <= p.b && p.b <= p.c);
        prop_assert!(p.a >= 0.0);
    }

    /// Property: CDF stays in [0, 1]
    #[test]
    fn prop_cdf_bounded(p in arb_triangle(), t in -1e4f64..1e4) {
        let v = cdf(&p, t);
        prop_assert!((0.0..=1.0).contains(&v));
    }

    /// Property: CDF is non-decreasing in the threshold
    #[test]
    fn prop_cdf_monotonic(p in arb_triangle(), t1 in -100.0f64..1300.0, dt in 0.0f64..200.0) {
        prop_assert!(cdf(&p, t1) <= cdf(&p, t1 + dt) + 1e-12);
    }

    /// Property: CDF is 0 at the minimum and 1 at the maximum
    #[test]
    fn prop_cdf_anchors(p in arb_triangle()) {
        prop_assert_eq!(cdf(&p, p.a), 0.0);
        prop_assert!((cdf(&p, p.c) - 1.0).abs() < 1e-9);
    }

    /// Property: both branches meet at the mode with (b - a) / (c - a)
    #[test]
    fn prop_cdf_continuous_at_mode(p in arb_triangle()) {
        let expected = (p.b - p.a) / (p.c - p.a);
        prop_assert!((cdf(&p, p.b) - expected).abs() < 1e-9);

        let upper = 1.0 - (p.c - p.b).powi(2) / ((p.c - p.b) * (p.c - p.a));
        prop_assert!((upper - expected).abs() < 1e-9);
    }

    /// Property: density is non-negative and vanishes outside the support
    #[test]
    fn prop_pdf_support(p in arb_triangle(), x in -100.0f64..1300.0) {
        let d = pdf(&p, x);
        prop_assert!(d >= 0.0);
        if x < p.a || x > p.c {
            prop_assert_eq!(d, 0.0);
        }
    }

    /// Property: the degenerate triangle never fails and is certain at >= 0
    #[test]
    fn prop_degenerate_total(t in 0.0f64..1e6) {
        prop_assert_eq!(cdf(&derive_params(0.0), t), 1.0);
    }

    /// Property: reported percentages stay within [0, 100] and within 0.05 of the truth
    #[test]
    fn prop_percent_rounding(prob in 0.0f64..=1.0) {
        let reported = percent(prob);
        prop_assert!((0.0..=100.0).contains(&reported));
        prop_assert!((reported - prob * 100.0).abs() <= 0.05 + 1e-9);
    }

    /// Property: 3-decimal rounding moves a value by at most half a unit
    #[test]
    fn prop_round_to_three(v in 0.0f64..1e5) {
        prop_assert!((round_to(v, 3) - v).abs() <= 0.0005 + 1e-9);
    }

    /// Property: assembled records hold exactly the schema's names
    #[test]
    fn prop_assemble_matches_schema(
        keys in proptest::collection::vec("[a-e]", 0..6),
        values in proptest::collection::vec(-100i64..100, 6)
    ) {
        let schema = FeatureSchema::try_new(vec!["a".into(), "b".into(), "c".into()]).unwrap();
        let raw: Map<String, Value> = keys
            .iter()
            .zip(&values)
            .map(|(k, v)| (k.clone(), Value::from(*v)))
            .collect();

        let record = assemble(&raw, &schema).unwrap();
        prop_assert_eq!(record.len(), 3);
        for name in schema.names() {
            let expected = raw.get(name).and_then(Value::as_f64).unwrap_or(0.0);
            prop_assert_eq!(record.get(name), Some(expected));
        }
    }
}
