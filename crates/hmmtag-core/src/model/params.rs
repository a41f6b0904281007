//! # Parameter Store
//!
//! Owns the transition matrix `A` (k×k, `p(t | s)`) and emission matrix `B`
//! (k×V, `p(w | t)`) together with the structural-zero mask:
//!
//! - column `bos_t` of `A` is zero (nothing transitions into BOS),
//! - row `eos_t` of `A` is zero (nothing transitions out of EOS),
//! - rows `bos_t` and `eos_t` of `B` are zero (sentinels emit no ordinary word).
//!
//! Every writer re-applies the mask as its last step, so the invariants are a
//! postcondition of each mutation rather than a convention callers uphold.

use oorandom::Rand64;

use crate::error::{HmmError, Result};
use crate::model::matrix::Matrix;

/// Scale of the random logits used at initialization.
const INIT_LOGIT_SCALE: f64 = 0.01;

/// Tolerance used when validating explicitly supplied parameters.
pub const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// Transition and emission probabilities with their log-space caches.
#[derive(Debug, Clone)]
pub struct ParameterStore {
    a: Matrix,
    b: Matrix,
    log_a: Matrix,
    log_b: Matrix,
    bos_t: usize,
    eos_t: usize,
    unigram: bool,
    generation: u64,
}

impl ParameterStore {
    /// Small random parameters respecting the structural zeros.
    ///
    /// Each unconstrained row is a softmax over logits drawn uniformly from
    /// `[0, 0.01)`, which breaks ties in fully unsupervised training. In
    /// unigram mode a single transition row is drawn and broadcast.
    pub fn random(
        k: usize,
        v: usize,
        bos_t: usize,
        eos_t: usize,
        unigram: bool,
        seed: u64,
    ) -> Self {
        let mut rng = Rand64::new(u128::from(seed));

        let mut b = Matrix::zeros(k, v);
        for t in 0..k {
            if t == bos_t || t == eos_t {
                continue;
            }
            let logits: Vec<f64> = (0..v)
                .map(|_| INIT_LOGIT_SCALE * rng.rand_float())
                .collect();
            b.row_mut(t).copy_from_slice(&softmax(&logits));
        }

        let draw_row = |rng: &mut Rand64| {
            let logits: Vec<f64> = (0..k)
                .map(|t| {
                    if t == bos_t {
                        f64::NEG_INFINITY
                    } else {
                        INIT_LOGIT_SCALE * rng.rand_float()
                    }
                })
                .collect();
            softmax(&logits)
        };

        let mut a = Matrix::zeros(k, k);
        if unigram {
            let row = draw_row(&mut rng);
            for s in 0..k {
                a.row_mut(s).copy_from_slice(&row);
            }
        } else {
            for s in 0..k {
                if s != eos_t {
                    let row = draw_row(&mut rng);
                    a.row_mut(s).copy_from_slice(&row);
                }
            }
        }

        Self::assemble(a, b, bos_t, eos_t, unigram, 0)
    }

    /// Parameters from explicit matrices.
    ///
    /// The structural mask is applied first; afterwards every ordinary row
    /// must sum to 1 within [`ROW_SUM_TOLERANCE`], and in unigram mode every
    /// ordinary transition row must be identical.
    pub fn from_matrices(
        a: Matrix,
        b: Matrix,
        bos_t: usize,
        eos_t: usize,
        unigram: bool,
    ) -> Result<Self> {
        let k = a.rows();
        if a.cols() != k {
            return Err(HmmError::ShapeMismatch {
                what: "transition matrix",
                expected: (k, k),
                actual: a.shape(),
            });
        }
        if b.rows() != k {
            return Err(HmmError::ShapeMismatch {
                what: "emission matrix",
                expected: (k, b.cols()),
                actual: b.shape(),
            });
        }
        if bos_t >= k || eos_t >= k || bos_t == eos_t {
            return Err(HmmError::InvalidParameters(format!(
                "sentinel tags bos={bos_t}, eos={eos_t} invalid for {k} tags"
            )));
        }

        let store = Self::assemble(a, b, bos_t, eos_t, unigram, 0);
        store.check_invariants(ROW_SUM_TOLERANCE)?;

        if unigram {
            let reference = store.a.row(bos_t);
            for s in (0..k).filter(|&s| s != eos_t) {
                let same = store
                    .a
                    .row(s)
                    .iter()
                    .zip(reference)
                    .all(|(x, y)| (x - y).abs() <= ROW_SUM_TOLERANCE);
                if !same {
                    return Err(HmmError::InvalidParameters(format!(
                        "unigram transition row {s} differs from row {bos_t}"
                    )));
                }
            }
        }
        Ok(store)
    }

    fn assemble(
        mut a: Matrix,
        mut b: Matrix,
        bos_t: usize,
        eos_t: usize,
        unigram: bool,
        generation: u64,
    ) -> Self {
        apply_structural_zeros(&mut a, &mut b, bos_t, eos_t);
        Self {
            log_a: a.ln(),
            log_b: b.ln(),
            a,
            b,
            bos_t,
            eos_t,
            unigram,
            generation,
        }
    }

    /// Swap in re-estimated parameters, re-imposing the mask and bumping
    /// the generation so that outstanding forward trellises become stale.
    pub(crate) fn replace(&mut self, a: Matrix, b: Matrix) {
        let generation = self.generation + 1;
        *self = Self::assemble(a, b, self.bos_t, self.eos_t, self.unigram, generation);
    }

    /// Transition probabilities `A[s, t] = p(t | s)`.
    pub fn a(&self) -> &Matrix {
        &self.a
    }

    /// Emission probabilities `B[t, w] = p(w | t)`.
    pub fn b(&self) -> &Matrix {
        &self.b
    }

    pub fn log_a(&self) -> &Matrix {
        &self.log_a
    }

    pub fn log_b(&self) -> &Matrix {
        &self.log_b
    }

    pub fn bos_t(&self) -> usize {
        self.bos_t
    }

    pub fn eos_t(&self) -> usize {
        self.eos_t
    }

    pub fn is_unigram(&self) -> bool {
        self.unigram
    }

    /// Number of tags `k`, sentinels included.
    pub fn num_tags(&self) -> usize {
        self.a.rows()
    }

    /// Number of emittable words `V`.
    pub fn num_words(&self) -> usize {
        self.b.cols()
    }

    /// Incremented every time the parameters are replaced.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether `t` is neither the BOS nor the EOS tag.
    #[inline]
    pub fn is_ordinary(&self, t: usize) -> bool {
        t != self.bos_t && t != self.eos_t
    }

    /// Ordinary tag ids in ascending order.
    pub fn ordinary_tags(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_tags()).filter(|&t| self.is_ordinary(t))
    }

    /// Verify every structural zero and row-sum invariant.
    pub fn check_invariants(&self, tolerance: f64) -> Result<()> {
        let k = self.num_tags();
        for s in 0..k {
            if self.a.get(s, self.bos_t) != 0.0 {
                return Err(HmmError::InvalidParameters(format!(
                    "A[{s}, BOS] = {} is not zero",
                    self.a.get(s, self.bos_t)
                )));
            }
        }
        if self.a.row(self.eos_t).iter().any(|&p| p != 0.0) {
            return Err(HmmError::InvalidParameters("A[EOS, :] is not zero".into()));
        }
        for t in [self.bos_t, self.eos_t] {
            if self.b.row(t).iter().any(|&p| p != 0.0) {
                return Err(HmmError::InvalidParameters(format!(
                    "B[{t}, :] is not zero for a sentinel tag"
                )));
            }
        }

        for s in (0..k).filter(|&s| s != self.eos_t) {
            check_distribution(self.a.row(s), tolerance)
                .map_err(|msg| HmmError::InvalidParameters(format!("A row {s}: {msg}")))?;
        }
        if self.num_words() > 0 {
            for t in self.ordinary_tags() {
                check_distribution(self.b.row(t), tolerance)
                    .map_err(|msg| HmmError::InvalidParameters(format!("B row {t}: {msg}")))?;
            }
        }
        Ok(())
    }
}

/// Zero the structurally impossible cells of `A` and `B` in place.
pub fn apply_structural_zeros(a: &mut Matrix, b: &mut Matrix, bos_t: usize, eos_t: usize) {
    for s in 0..a.rows() {
        a.set(s, bos_t, 0.0);
    }
    a.row_mut(eos_t).iter_mut().for_each(|p| *p = 0.0);
    b.row_mut(bos_t).iter_mut().for_each(|p| *p = 0.0);
    b.row_mut(eos_t).iter_mut().for_each(|p| *p = 0.0);
}

fn check_distribution(row: &[f64], tolerance: f64) -> std::result::Result<(), String> {
    if let Some(p) = row.iter().find(|p| !p.is_finite() || **p < 0.0) {
        return Err(format!("entry {p} is not a probability"));
    }
    let sum: f64 = row.iter().sum();
    if (sum - 1.0).abs() > tolerance {
        return Err(format!("sums to {sum}, expected ~1.0"));
    }
    Ok(())
}

/// Softmax that maps `-inf` logits to exactly zero.
fn softmax(logits: &[f64]) -> Vec<f64> {
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return vec![0.0; logits.len()];
    }
    let exps: Vec<f64> = logits.iter().map(|&x| (x - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}
