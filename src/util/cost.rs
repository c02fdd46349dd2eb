use num_traits::One;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::iter::Product;
use std::ops::Mul;
use std::str::FromStr;

use crate::error::{PcfgError, Result};

/// The cost of a rule or derivation, i.e. the negative natural logarithm of
/// its probability. A cost of `0` is a probability of `1`, an infinite cost
/// is a probability of `0`.
///
/// Multiplying two costs multiplies the probabilities they stand for, which
/// adds the raw values. `Cost::one()` is the cost of a certain event.
///
/// ```
/// use pcfg_cky::util::cost::Cost;
///
/// let half = Cost::from_probability(0.5).unwrap();
/// let quarter = Cost::from_probability(0.25).unwrap();
///
/// assert!((half * half).value() - quarter.value() < 1e-12);
/// assert!(half < quarter);
/// ```
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Cost(f64);

impl Cost {
    pub fn from_probability(probability: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&probability) {
            // `+ 0.0` turns the `-0.0` of a certain event into `0.0`
            Ok(Cost(-probability.ln() + 0.0))
        } else {
            Err(PcfgError::InvalidProbability { value: probability })
        }
    }

    /// Wraps an already computed negative log probability.
    pub fn from_value(value: f64) -> Result<Self> {
        if value >= 0.0 {
            Ok(Cost(value + 0.0))
        } else {
            Err(PcfgError::InvalidProbability { value: (-value).exp() })
        }
    }

    /// Relative frequency `count / total` as a cost.
    pub fn relative_frequency(count: usize, total: usize) -> Result<Self> {
        if total == 0 || count > total {
            return Err(PcfgError::InvalidProbability {
                value: count as f64 / total as f64,
            });
        }
        Ok(Cost((total as f64).ln() - (count as f64).ln()))
    }

    pub fn infinity() -> Self {
        Cost(f64::INFINITY)
    }

    pub fn value(self) -> f64 {
        self.0
    }

    pub fn probability(self) -> f64 {
        (-self.0).exp()
    }

    pub fn is_finite(self) -> bool {
        self.0.is_finite()
    }
}

impl Default for Cost {
    fn default() -> Self {
        Cost::infinity()
    }
}

/// Cheaper (more probable) costs are smaller.
impl Ord for Cost {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Cost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Cost {}

impl Mul for Cost {
    type Output = Self;

    fn mul(self, other: Self) -> Self {
        Cost(self.0 + other.0)
    }
}

impl Product for Cost {
    fn product<I: Iterator<Item = Cost>>(iter: I) -> Self {
        iter.fold(Cost::one(), Mul::mul)
    }
}

impl One for Cost {
    fn one() -> Self {
        Cost(0.0)
    }
}

impl FromStr for Cost {
    type Err = PcfgError;

    fn from_str(s: &str) -> Result<Self> {
        match s.parse::<f64>() {
            Ok(value) => Cost::from_value(value),
            Err(_) => Err(PcfgError::InvalidProbability { value: f64::NAN }),
        }
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn probabilities() {
        assert_eq!(Cost::from_probability(1.0).unwrap(), Cost::one());
        assert!(!Cost::from_probability(0.0).unwrap().is_finite());
        assert!(Cost::from_probability(1.5).is_err());
        assert!(Cost::from_probability(-0.1).is_err());
        assert!((Cost::from_probability(0.3).unwrap().probability() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn relative_frequency() {
        let c = Cost::relative_frequency(1, 4).unwrap();
        assert!((c.value() - 4f64.ln()).abs() < 1e-12);
        assert_eq!(Cost::relative_frequency(3, 3).unwrap(), Cost::one());
        assert!(Cost::relative_frequency(1, 0).is_err());
        assert!(!Cost::relative_frequency(0, 3).unwrap().is_finite());
    }

    #[test]
    fn mul_adds_values() {
        let a = Cost::from_value(0.5).unwrap();
        let b = Cost::from_value(1.25).unwrap();
        assert_eq!((a * b).value(), 1.75);
        assert_eq!(vec![a, b, a].into_iter().product::<Cost>().value(), 2.25);
        assert_eq!(a * Cost::one(), a);
        assert!(!(a * Cost::infinity()).is_finite());
    }

    #[test]
    fn order() {
        let mut costs: Vec<Cost> = vec![2.0, 0.0, 1.0]
            .into_iter()
            .map(|v| Cost::from_value(v).unwrap())
            .collect();
        costs.push(Cost::infinity());
        costs.sort();
        let values: Vec<f64> = costs.into_iter().map(Cost::value).collect();
        assert_eq!(values, vec![0.0, 1.0, 2.0, f64::INFINITY]);
    }

    #[test]
    fn from_str() {
        assert_eq!("0.5".parse::<Cost>().unwrap().value(), 0.5);
        assert!(!"inf".parse::<Cost>().unwrap().is_finite());
        assert!("-1".parse::<Cost>().is_err());
        assert!("abc".parse::<Cost>().is_err());
    }
}
