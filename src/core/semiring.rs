use std::{cmp::Ordering, fmt};

/// The algebra scores are computed in.
///
/// `plus` accumulates alternative derivations, `times` chains the pieces of a
/// single derivation. `compare` orders elements by the probability they encode,
/// so `Ordering::Greater` always means "more probable" regardless of encoding.
pub trait Semiring: fmt::Debug + Send + Sync {
    type Element: Copy + PartialEq + fmt::Debug + Send + Sync;

    fn zero(&self) -> Self::Element;
    fn one(&self) -> Self::Element;
    fn plus(&self, a: Self::Element, b: Self::Element) -> Self::Element;
    fn times(&self, a: Self::Element, b: Self::Element) -> Self::Element;
    fn from_probability(&self, probability: f64) -> Self::Element;
    fn to_probability(&self, element: Self::Element) -> f64;
    fn compare(&self, a: Self::Element, b: Self::Element) -> Ordering;

    fn is_zero(&self, element: Self::Element) -> bool {
        element == self.zero()
    }
}

/// Plain probabilities: `+` and `×` over `[0, ∞)`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProbabilitySemiring;

impl Semiring for ProbabilitySemiring {
    type Element = f64;

    fn zero(&self) -> f64 {
        0.0
    }

    fn one(&self) -> f64 {
        1.0
    }

    fn plus(&self, a: f64, b: f64) -> f64 {
        a + b
    }

    fn times(&self, a: f64, b: f64) -> f64 {
        a * b
    }

    fn from_probability(&self, probability: f64) -> f64 {
        probability
    }

    fn to_probability(&self, element: f64) -> f64 {
        element
    }

    fn compare(&self, a: f64, b: f64) -> Ordering {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

/// Natural-log probabilities: `log-sum-exp` and `+`.
///
/// Long derivations multiply many small probabilities together, which
/// underflows quickly in the plain encoding. Here zero is `-∞` and one is `0`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LogSemiring;

impl Semiring for LogSemiring {
    type Element = f64;

    fn zero(&self) -> f64 {
        f64::NEG_INFINITY
    }

    fn one(&self) -> f64 {
        0.0
    }

    fn plus(&self, a: f64, b: f64) -> f64 {
        if a == f64::NEG_INFINITY {
            return b;
        }
        if b == f64::NEG_INFINITY {
            return a;
        }

        let (hi, lo) = if a >= b { (a, b) } else { (b, a) };
        hi + (lo - hi).exp().ln_1p()
    }

    fn times(&self, a: f64, b: f64) -> f64 {
        if a == f64::NEG_INFINITY || b == f64::NEG_INFINITY {
            return f64::NEG_INFINITY;
        }
        a + b
    }

    fn from_probability(&self, probability: f64) -> f64 {
        probability.ln()
    }

    fn to_probability(&self, element: f64) -> f64 {
        element.exp()
    }

    fn compare(&self, a: f64, b: f64) -> Ordering {
        a.partial_cmp(&b).unwrap_or(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn probability_identities() {
        //setup
        let sr = ProbabilitySemiring;

        //exercise/verify
        assert_eq!(sr.plus(sr.zero(), 0.3), 0.3);
        assert_eq!(sr.times(sr.one(), 0.3), 0.3);
        assert_eq!(sr.times(sr.zero(), 0.3), 0.0);
        assert!(sr.is_zero(sr.zero()));
    }

    #[test]
    fn log_identities() {
        //setup
        let sr = LogSemiring;
        let x = sr.from_probability(0.3);

        //exercise/verify
        assert_eq!(sr.plus(sr.zero(), x), x);
        assert_eq!(sr.plus(x, sr.zero()), x);
        assert_eq!(sr.times(sr.one(), x), x);
        assert_eq!(sr.times(sr.zero(), x), sr.zero());
        assert!(sr.is_zero(sr.zero()));
    }

    #[test]
    fn log_plus_is_sum_of_probabilities() {
        //setup
        let sr = LogSemiring;

        //exercise
        let sum = sr.plus(sr.from_probability(0.25), sr.from_probability(0.5));
        let product = sr.times(sr.from_probability(0.25), sr.from_probability(0.5));

        //verify
        assert!(close(sr.to_probability(sum), 0.75));
        assert!(close(sr.to_probability(product), 0.125));
    }

    #[test]
    fn plus_is_commutative_and_monotonic() {
        //setup
        let sr = LogSemiring;
        let a = sr.from_probability(0.1);
        let b = sr.from_probability(0.7);

        //exercise/verify
        assert_eq!(sr.plus(a, b), sr.plus(b, a));
        assert_ne!(sr.compare(sr.plus(a, b), a), Ordering::Less);
        assert_ne!(sr.compare(sr.plus(a, b), b), Ordering::Less);
    }

    #[test]
    fn conversions_round_trip() {
        //setup
        let log = LogSemiring;
        let prob = ProbabilitySemiring;

        //exercise/verify
        for &p in &[1.0, 0.5, 0.01, 1e-12] {
            assert!(close(log.to_probability(log.from_probability(p)), p));
            assert_eq!(prob.to_probability(prob.from_probability(p)), p);
        }
        assert_eq!(log.to_probability(log.zero()), 0.0);
    }

    #[test]
    fn compare_orders_by_probability() {
        //setup
        let sr = LogSemiring;

        //exercise/verify
        assert_eq!(
            sr.compare(sr.from_probability(0.6), sr.from_probability(0.4)),
            Ordering::Greater
        );
        assert_eq!(sr.compare(sr.zero(), sr.one()), Ordering::Less);
    }
}
