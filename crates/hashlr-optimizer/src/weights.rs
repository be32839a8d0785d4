//! The model's weight store.
//!
//! [`WeightStore`] holds the bias, the optional dense weights, the hashed
//! weights and the bookkeeping lazy regularization needs: for each hashed
//! index, the last step through which it has been brought up to date.
//!
//! A stored hashed weight may lag behind its true value by the decay of the
//! steps since it was last referenced. [`WeightStore::settled_weight`] and
//! [`WeightStore::l2_norm`] account for that lag without mutating the store;
//! [`WeightStore::settle`] applies it.

use serde::{Deserialize, Serialize};

use hashlr_core::{DenseField, FeatureLayout, FeatureVector, HashlrError, LearnerConfig, Result};

use crate::lazy::decay_factor;

/// Weights of the four dense scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DenseWeights {
    values: [f64; 4],
}

impl DenseWeights {
    /// Returns the weight of `field`.
    #[inline]
    pub fn get(&self, field: DenseField) -> f64 {
        self.values[field.slot()]
    }

    /// Returns a mutable reference to the weight of `field`.
    #[inline]
    pub fn get_mut(&mut self, field: DenseField) -> &mut f64 {
        &mut self.values[field.slot()]
    }

    /// Iterates `(field, weight)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DenseField, f64)> + '_ {
        DenseField::ALL.into_iter().map(|f| (f, self.get(f)))
    }
}

/// Model parameters plus lazy-regularization state.
///
/// The store remembers the step size and L2 strength it was created with,
/// since the pending decay of a lagging weight is only meaningful relative to
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightStore {
    layout: FeatureLayout,
    step_size: f64,
    lambda: f64,
    bias: f64,
    dense: Option<DenseWeights>,
    pub(crate) hashed: Vec<f64>,
    pub(crate) last_touched: Vec<Option<u64>>,
    pub(crate) touched: Vec<usize>,
    global_step: u64,
}

impl WeightStore {
    /// Creates a zero-initialized store for `config`.
    pub fn new(config: &LearnerConfig) -> Self {
        let dim = config.dim();
        Self {
            layout: config.layout(),
            step_size: config.step(),
            lambda: config.lambda(),
            bias: 0.0,
            dense: config.layout().has_dense().then(DenseWeights::default),
            hashed: vec![0.0; dim],
            last_touched: vec![None; dim],
            touched: Vec::new(),
            global_step: 0,
        }
    }

    /// Returns the hashed-space size.
    #[inline]
    pub fn dim(&self) -> usize {
        self.hashed.len()
    }

    /// Returns the layout the store was built for.
    #[inline]
    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    /// Returns the SGD step size the store was created with.
    #[inline]
    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    /// Returns the L2 strength the store was created with.
    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Per-step multiplicative decay `1 - step * lambda`.
    #[inline]
    pub fn decay(&self) -> f64 {
        1.0 - self.step_size * self.lambda
    }

    /// Returns the number of events processed so far.
    #[inline]
    pub fn global_step(&self) -> u64 {
        self.global_step
    }

    /// Returns the bias.
    #[inline]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Returns the dense weights, present only for the structured layout.
    #[inline]
    pub fn dense(&self) -> Option<&DenseWeights> {
        self.dense.as_ref()
    }

    /// Returns the raw hashed weights, possibly lagging behind their decay.
    #[inline]
    pub fn hashed(&self) -> &[f64] {
        &self.hashed
    }

    /// Returns the step through which index `i` is up to date, if it has ever
    /// been referenced.
    #[inline]
    pub fn last_touched(&self, i: usize) -> Option<u64> {
        self.last_touched.get(i).copied().flatten()
    }

    /// Returns every index referenced at least once, in first-reference order.
    #[inline]
    pub fn touched_indices(&self) -> &[usize] {
        &self.touched
    }

    /// Number of decay steps index `i` still owes.
    pub fn pending_steps(&self, i: usize) -> u64 {
        match self.last_touched(i) {
            Some(t0) => self.global_step.saturating_sub(t0 + 1),
            None => 0,
        }
    }

    /// Returns `true` if no hashed weight owes any decay.
    pub fn is_settled(&self) -> bool {
        self.touched.iter().all(|&i| self.pending_steps(i) == 0)
    }

    /// Returns the value weight `i` would have after a final sweep.
    ///
    /// Indices outside `[0, dim)` read as `0`.
    pub fn settled_weight(&self, i: usize) -> f64 {
        match self.hashed.get(i) {
            Some(&w) => w * decay_factor(self.decay(), self.pending_steps(i)),
            None => 0.0,
        }
    }

    /// Returns every hashed weight as it would be after a final sweep.
    pub fn settled_hashed(&self) -> Vec<f64> {
        (0..self.dim()).map(|i| self.settled_weight(i)).collect()
    }

    /// Euclidean norm of all settled parameters: bias, dense and hashed.
    pub fn l2_norm(&self) -> f64 {
        let dense: f64 = self
            .dense
            .iter()
            .flat_map(|d| d.iter())
            .map(|(_, w)| w * w)
            .sum();
        let hashed: f64 = (0..self.dim())
            .map(|i| {
                let w = self.settled_weight(i);
                w * w
            })
            .sum();
        (self.bias * self.bias + dense + hashed).sqrt()
    }

    /// Checks that `features` was built for this store.
    ///
    /// # Errors
    ///
    /// Returns [`HashlrError::ConfigurationMismatch`] if the hashed dimension
    /// or the layout differs.
    pub fn check_compatible(&self, features: &FeatureVector) -> Result<()> {
        if features.dim() != self.dim() {
            return Err(HashlrError::mismatch("dim", self.dim(), features.dim()));
        }
        if features.layout() != self.layout {
            return Err(HashlrError::mismatch("layout", self.layout, features.layout()));
        }
        if let Some(max) = features.hashed().max_index() {
            if max >= self.dim() {
                return Err(HashlrError::mismatch("hashed index bound", self.dim(), max + 1));
            }
        }
        Ok(())
    }

    /// Checks that `config` describes this store.
    ///
    /// # Errors
    ///
    /// Returns [`HashlrError::ConfigurationMismatch`] naming the first
    /// setting that differs.
    pub fn check_config(&self, config: &LearnerConfig) -> Result<()> {
        if config.dim() != self.dim() {
            return Err(HashlrError::mismatch("dim", self.dim(), config.dim()));
        }
        if config.layout() != self.layout {
            return Err(HashlrError::mismatch("layout", self.layout, config.layout()));
        }
        if config.step() != self.step_size {
            return Err(HashlrError::mismatch("step", self.step_size, config.step()));
        }
        if config.lambda() != self.lambda {
            return Err(HashlrError::mismatch("lambda", self.lambda, config.lambda()));
        }
        Ok(())
    }

    /// Raw `w . x` over the stored weights.
    ///
    /// No catch-up is applied; callers that need up-to-date weights must
    /// settle the referenced indices first.
    pub fn dot(&self, features: &FeatureVector) -> f64 {
        let mut wx = self.bias;
        if let (Some(weights), Some(values)) = (self.dense.as_ref(), features.dense()) {
            wx += values
                .iter()
                .map(|(field, x)| weights.get(field) * x)
                .sum::<f64>();
        }
        wx + features
            .hashed()
            .iter()
            .map(|(i, v)| self.hashed[i] * v as f64)
            .sum::<f64>()
    }

    /// Validates the internal invariants of a store, e.g. one read from disk.
    ///
    /// # Errors
    ///
    /// Returns [`HashlrError::ConfigurationMismatch`] if the vectors disagree
    /// on the dimension, the dense block disagrees with the layout, a touched
    /// index is out of range, or a last-touched step lies in the future.
    pub fn validate(&self) -> Result<()> {
        if self.last_touched.len() != self.hashed.len() {
            return Err(HashlrError::mismatch(
                "last-touched length",
                self.hashed.len(),
                self.last_touched.len(),
            ));
        }
        if self.dense.is_some() != self.layout.has_dense() {
            return Err(HashlrError::mismatch(
                "dense block",
                self.layout.has_dense(),
                self.dense.is_some(),
            ));
        }
        for &i in &self.touched {
            match self.last_touched.get(i).copied().flatten() {
                Some(t0) if t0 < self.global_step => {}
                Some(t0) => {
                    return Err(HashlrError::mismatch(
                        "last-touched step",
                        self.global_step,
                        t0,
                    ))
                }
                None => return Err(HashlrError::mismatch("touched index", self.dim(), i)),
            }
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn bias_mut(&mut self) -> &mut f64 {
        &mut self.bias
    }

    #[inline]
    pub(crate) fn dense_mut(&mut self) -> Option<&mut DenseWeights> {
        self.dense.as_mut()
    }

    #[inline]
    pub(crate) fn advance(&mut self) {
        self.global_step += 1;
    }
}
