//! Probabilities of nonterminals deriving the empty string.
//!
//! `e(X) = Σ P(X → Y₁…Yₖ) · e(Y₁) ⋯ e(Yₖ)` over rules whose right-hand side
//! is all nonterminals. The least solution of that system is found by
//! iterating from zero; the best single null derivation per nonterminal is
//! found with Knuth's generalisation of Dijkstra's algorithm.

static TOLERANCE: f64 = 1e-14;
static MAX_ROUNDS: usize = 10_000;
static SLOW_CONVERGENCE: f64 = 1e-6;

/// A rule that can only derive ε if every symbol on its right does.
pub struct NullRule {
    pub id: usize,
    pub lhs: usize,
    pub rhs: Vec<usize>,
    pub probability: f64,
}

/// Returns `None` when the system diverges, i.e. some null cycle carries a
/// mass of one or more.
pub fn null_probabilities(rules: &[NullRule], nonterminals: usize) -> Option<Vec<f64>> {
    let mut current = vec![0.0; nonterminals];
    let mut change = std::f64::INFINITY;

    for round in 0..MAX_ROUNDS {
        let mut next = vec![0.0; nonterminals];
        for rule in rules {
            next[rule.lhs] += rule.probability * rule.rhs.iter().map(|&nt| current[nt]).product::<f64>();
        }

        if next.iter().any(|e| !e.is_finite()) {
            return None;
        }

        change = next
            .iter()
            .zip(&current)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max);
        current = next;

        // Every nullable symbol is positive after `nonterminals` rounds.
        if round >= nonterminals && change <= TOLERANCE {
            return Some(current);
        }
    }

    if change <= SLOW_CONVERGENCE {
        warn!("Null probabilities converged slowly, last change was {}", change);
        Some(current)
    } else {
        None
    }
}

/// The most probable null derivation of each nonterminal as
/// `(probability, rule id)`, `None` for symbols that cannot derive ε.
///
/// A rule is only chosen once every symbol on its right has been settled, so
/// the chosen rules never form a cycle.
pub fn best_null_derivations(rules: &[NullRule], nonterminals: usize) -> Vec<Option<(f64, usize)>> {
    let mut best: Vec<Option<(f64, usize)>> = vec![None; nonterminals];

    loop {
        let mut pick: Option<(usize, f64, usize)> = None;

        for rule in rules {
            if best[rule.lhs].is_some() {
                continue;
            }

            let mut probability = rule.probability;
            let mut ready = true;
            for &nt in &rule.rhs {
                match best[nt] {
                    Some((p, _)) => probability *= p,
                    None => {
                        ready = false;
                        break;
                    }
                }
            }

            let better = match pick {
                None => true,
                Some((_, p, _)) => probability > p,
            };
            if ready && better {
                pick = Some((rule.lhs, probability, rule.id));
            }
        }

        match pick {
            None => return best,
            Some((lhs, probability, id)) => best[lhs] = Some((probability, id)),
        }
    }
}
