/// Opaque handle for a feature owned by the render surface.
///
/// The viewport subsystem never looks inside a feature; it only carries the
/// handle from a hit-test to whoever subscribed to the notification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeatureId(pub u64);

/// Opaque handle for a layer attached to the render surface.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub u64);

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "feature#{}", self.0)
    }
}

impl std::fmt::Display for LayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layer#{}", self.0)
    }
}

/// Id carried as a JS number. Only non-negative integers below 2^64 qualify;
/// anything else (fractions, negatives, NaN, infinities) yields `None`.
pub fn id_from_number(value: f64) -> Option<u64> {
    let exact = value.is_finite() && value >= 0.0 && value.fract() == 0.0;
    (exact && value < u64::MAX as f64).then_some(value as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_numbers_convert() {
        assert_eq!(id_from_number(0.0), Some(0));
        assert_eq!(id_from_number(42.0), Some(42));
        assert_eq!(id_from_number(9_007_199_254_740_991.0), Some(9_007_199_254_740_991));
    }

    #[test]
    fn rejects_values_that_would_truncate() {
        for v in [-1.0, 2.5, -0.5, f64::NAN, f64::INFINITY, 1e20] {
            assert_eq!(id_from_number(v), None, "{v}");
        }
    }
}
