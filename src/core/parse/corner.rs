//! Reflexive transitive closures over nonterminal relations.
//!
//! For a relation `P(X, Y)` (the probability that `X` rewrites with `Y` in some
//! fixed position) the star closure is `R = I + P + P² + ... = (I - P)⁻¹`.
//! Prediction uses it over left corners and completion over unit productions,
//! so chains and cycles of either kind are summed in closed form once per
//! grammar instead of being iterated during every parse.

use crate::core::semiring::Semiring;

static PIVOT_EPSILON: f64 = 1e-12;

pub struct StarClosure<W> {
    dense: Vec<Vec<Option<W>>>,
    outgoing: Vec<Vec<(usize, W)>>,
    incoming: Vec<Vec<(usize, W)>>,
}

impl<W: Copy> StarClosure<W> {
    /// Returns `None` when `I - P` is singular or its inverse is not a valid
    /// score matrix, i.e. some cycle in the relation carries a mass of one or more.
    pub fn compute<S: Semiring<Element = W>>(sr: &S, relation: &[Vec<f64>]) -> Option<Self> {
        let n = relation.len();
        let reachable = reachability(relation);
        let inverse = invert_identity_minus(relation)?;

        let mut dense = vec![vec![None; n]; n];
        let mut outgoing = vec![Vec::new(); n];
        let mut incoming = vec![Vec::new(); n];

        for from in 0..n {
            for to in 0..n {
                if !reachable[from][to] {
                    continue;
                }

                let probability = inverse[from][to];
                if !probability.is_finite() || probability <= 0.0 {
                    return None;
                }

                let score = sr.from_probability(probability);
                dense[from][to] = Some(score);
                outgoing[from].push((to, score));
                incoming[to].push((from, score));
            }
        }

        Some(StarClosure {
            dense,
            outgoing,
            incoming,
        })
    }

    pub fn score(&self, from: usize, to: usize) -> Option<W> {
        self.dense.get(from).and_then(|row| row.get(to)).and_then(|s| *s)
    }

    /// All `(to, score)` with a non-zero closure from `from`.
    pub fn outgoing(&self, from: usize) -> &[(usize, W)] {
        &self.outgoing[from]
    }

    /// All `(from, score)` with a non-zero closure into `to`.
    pub fn incoming(&self, to: usize) -> &[(usize, W)] {
        &self.incoming[to]
    }
}

fn reachability(relation: &[Vec<f64>]) -> Vec<Vec<bool>> {
    let n = relation.len();
    let mut reachable: Vec<Vec<bool>> = (0..n)
        .map(|i| (0..n).map(|j| i == j || relation[i][j] > 0.0).collect())
        .collect();

    for k in 0..n {
        for i in 0..n {
            if !reachable[i][k] {
                continue;
            }
            for j in 0..n {
                if reachable[k][j] {
                    reachable[i][j] = true;
                }
            }
        }
    }

    reachable
}

/// Gauss-Jordan elimination with partial pivoting on `I - P`.
fn invert_identity_minus(relation: &[Vec<f64>]) -> Option<Vec<Vec<f64>>> {
    let n = relation.len();
    let mut matrix: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            (0..n)
                .map(|j| if i == j { 1.0 } else { 0.0 } - relation[i][j])
                .collect()
        })
        .collect();
    let mut inverse: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();

    for col in 0..n {
        let mut pivot = col;
        for row in col + 1..n {
            if matrix[row][col].abs() > matrix[pivot][col].abs() {
                pivot = row;
            }
        }
        if matrix[pivot][col].abs() < PIVOT_EPSILON {
            return None;
        }

        matrix.swap(col, pivot);
        inverse.swap(col, pivot);

        let divisor = matrix[col][col];
        for j in 0..n {
            matrix[col][j] /= divisor;
            inverse[col][j] /= divisor;
        }

        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = matrix[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..n {
                matrix[row][j] -= factor * matrix[col][j];
                inverse[row][j] -= factor * inverse[col][j];
            }
        }
    }

    Some(inverse)
}
