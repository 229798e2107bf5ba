//! Accessibility classification from a luminance contrast ratio.

use serde::{Deserialize, Serialize};

/// Discrete compliance grade derived from a contrast ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Grade {
    Fail,
    A,
    Aa,
    Aaa,
}

impl Grade {
    /// Classify a contrast ratio with inclusive lower bounds:
    /// ratio >= 7 is AAA, >= 4.5 is AA, >= 3 is A, anything below fails.
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= 7.0 {
            Grade::Aaa
        } else if ratio >= 4.5 {
            Grade::Aa
        } else if ratio >= 3.0 {
            Grade::A
        } else {
            Grade::Fail
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Grade::Aaa => "AAA",
            Grade::Aa => "AA",
            Grade::A => "A",
            Grade::Fail => "Fail",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_inclusive() {
        assert_eq!(Grade::from_ratio(7.0), Grade::Aaa);
        assert_eq!(Grade::from_ratio(4.5), Grade::Aa);
        assert_eq!(Grade::from_ratio(3.0), Grade::A);
    }

    #[test]
    fn test_just_below_boundaries() {
        assert_eq!(Grade::from_ratio(6.999), Grade::Aa);
        assert_eq!(Grade::from_ratio(4.499), Grade::A);
        assert_eq!(Grade::from_ratio(2.999), Grade::Fail);
    }

    #[test]
    fn test_monotone_in_ratio() {
        let ratios = [0.5, 1.0, 2.999, 3.0, 4.499, 4.5, 6.999, 7.0, 21.0];
        let grades: Vec<Grade> = ratios.iter().map(|&r| Grade::from_ratio(r)).collect();
        for pair in grades.windows(2) {
            assert!(pair[0] <= pair[1], "grade must not decrease: {pair:?}");
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Grade::from_ratio(10.0).to_string(), "AAA");
        assert_eq!(Grade::from_ratio(1.0).to_string(), "Fail");
    }
}
