//! Deterministic float ordering.
//!
//! Memo keys and pick tie-breaks compare floats; these helpers give them a
//! total order that does not depend on NaN payloads or the sign of zero.

use core::cmp::Ordering;

/// `-0.0` folds into `0.0` and every NaN into one NaN.
fn fold_f64(v: f64) -> f64 {
    match v {
        v if v == 0.0 => 0.0,
        v if v.is_nan() => f64::NAN,
        v => v,
    }
}

/// Total order over folded values.
pub fn stable_total_cmp_f64(a: f64, b: f64) -> Ordering {
    fold_f64(a).total_cmp(&fold_f64(b))
}

/// A float usable as an `Eq`/`Ord` key, e.g. the radius in a geometry memo.
#[derive(Debug, Copy, Clone, Default)]
pub struct StableF64(pub f64);

impl PartialEq for StableF64 {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for StableF64 {}

impl PartialOrd for StableF64 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StableF64 {
    fn cmp(&self, other: &Self) -> Ordering {
        stable_total_cmp_f64(self.0, other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::{StableF64, stable_total_cmp_f64};
    use core::cmp::Ordering;

    #[test]
    fn signed_zero_is_one_key() {
        assert_eq!(StableF64(-0.0), StableF64(0.0));
    }

    #[test]
    fn radius_keys_order_totally() {
        assert_eq!(stable_total_cmp_f64(3.0, 3.01), Ordering::Less);
        assert_eq!(stable_total_cmp_f64(f64::NAN, -f64::NAN), Ordering::Equal);
        assert!(StableF64(3.01) > StableF64(3.0));
    }
}
