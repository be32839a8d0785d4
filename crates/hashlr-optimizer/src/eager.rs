//! Eagerly regularized SGD.
//!
//! Minimizes the same objective as [`LazySgd`](crate::LazySgd) but multiplies
//! every unreferenced hashed weight by the decay on every step. The cost is
//! `O(dim)` per event, so it is only meant for small spaces and for checking
//! the lazy rule against.

use hashlr_core::{FeatureVector, Label, LearnerConfig, Result};

use crate::logistic::label_counts;
use crate::sgd::apply_update;
use crate::weights::WeightStore;
use crate::{Optimizer, StepReport};

/// L2-regularized SGD that decays every weight on every step.
///
/// A store driven by this optimizer is always settled; its last-touched
/// bookkeeping is left empty.
#[derive(Debug, Clone)]
pub struct EagerSgd {
    config: LearnerConfig,
}

impl Optimizer for EagerSgd {
    fn new(config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn name(&self) -> &'static str {
        "eager_sgd"
    }

    fn config(&self) -> &LearnerConfig {
        &self.config
    }

    fn step(
        &mut self,
        store: &mut WeightStore,
        features: &FeatureVector,
        label: &Label,
    ) -> Result<StepReport> {
        store.check_config(&self.config)?;
        store.check_compatible(features)?;
        let (clicks, impressions) = label_counts(label, store.global_step())?;

        let report = apply_update(store, features, clicks, impressions, &self.config);

        let decay = self.config.decay();
        let mut referenced = features.hashed().indices().peekable();
        for (i, w) in store.hashed.iter_mut().enumerate() {
            if referenced.peek() == Some(&i) {
                referenced.next();
            } else {
                *w *= decay;
            }
        }

        store.advance();
        Ok(report)
    }

    fn settle(&mut self, _store: &mut WeightStore) {}
}
