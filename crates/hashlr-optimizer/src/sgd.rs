//! Stochastic gradient descent with lazy L2 regularization.
//!
//! For each event, in order:
//!
//! 1. every referenced hashed index catches up on the decay it owes
//! 2. the margin `wx` and the gradient `g` are computed
//! 3. the bias moves by `-step * g` and is never regularized
//! 4. each dense weight moves by `-step * (g * x + lambda * w)`
//! 5. each referenced hashed weight moves by `-step * (g * v + lambda * w)`
//!
//! Unreferenced hashed weights are not visited.

use hashlr_core::{FeatureVector, Label, LearnerConfig, Result};

use crate::logistic::{gradient, label_counts, log_loss, sigmoid};
use crate::weights::WeightStore;
use crate::{Optimizer, StepReport};

/// L2-regularized SGD with deferred decay.
#[derive(Debug, Clone)]
pub struct LazySgd {
    config: LearnerConfig,
}

impl Optimizer for LazySgd {
    fn new(config: LearnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    fn name(&self) -> &'static str {
        "lazy_sgd"
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
        let now = store.global_step();
        let (clicks, impressions) = label_counts(label, now)?;

        for i in features.hashed().indices() {
            store.catch_up(i, now);
        }

        let report = apply_update(store, features, clicks, impressions, &self.config);
        store.advance();
        Ok(report)
    }

    fn settle(&mut self, store: &mut WeightStore) {
        store.settle();
    }
}

/// Computes the margin and gradient of an event and applies steps 3 to 5.
///
/// Referenced hashed weights must already be up to date.
pub(crate) fn apply_update(
    store: &mut WeightStore,
    features: &FeatureVector,
    clicks: u32,
    impressions: u32,
    config: &LearnerConfig,
) -> StepReport {
    let step = config.step();
    let lambda = config.lambda();

    let margin = store.dot(features);
    let g = gradient(clicks, impressions, margin);

    *store.bias_mut() -= step * g;

    if let (Some(weights), Some(values)) = (store.dense_mut(), features.dense()) {
        for (field, x) in values.iter() {
            let w = weights.get_mut(field);
            *w -= step * (g * x + lambda * *w);
        }
    }

    for (i, v) in features.hashed().iter() {
        let w = &mut store.hashed[i];
        *w -= step * (g * v as f64 + lambda * *w);
    }

    StepReport {
        step: store.global_step(),
        margin,
        probability: sigmoid(margin),
        gradient: g,
        loss: log_loss(clicks, impressions, margin),
        impressions,
        clicks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashlr_core::{DenseField, Event, EventContext, FeatureLayout, FeatureVectorBuilder};
    use hashlr_core::HashlrError;

    fn config(layout: FeatureLayout, lambda: f64) -> LearnerConfig {
        LearnerConfig::builder()
            .dim(8)
            .step(0.1)
            .lambda(lambda)
            .layout(layout)
            .build()
            .unwrap()
    }

    fn event(clicked: bool, tokens: &[&str]) -> Event {
        Event::binary(
            EventContext::new(1, 2, 3, 1, 0),
            clicked,
            tokens.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[test]
    fn test_first_step_from_zero() {
        let config = config(FeatureLayout::Structured, 0.01);
        let builder = FeatureVectorBuilder::from_config(&config).unwrap();
        let mut store = WeightStore::new(&config);
        let mut sgd = LazySgd::new(config).unwrap();

        let e = event(true, &["a"]);
        let features = builder.build(&e);
        let report = sgd.step(&mut store, &features, &e.label).unwrap();

        assert_eq!(report.step, 0);
        assert_eq!(report.margin, 0.0);
        assert!((report.gradient + 0.5).abs() < 1e-12);
        // bias -= 0.1 * -0.5
        assert!((store.bias() - 0.05).abs() < 1e-12);
        // depth weight -= 0.1 * (-0.5 * 1)
        let dense = store.dense().unwrap();
        assert!((dense.get(DenseField::Depth) - 0.05).abs() < 1e-12);
        assert!((dense.get(DenseField::Age) - 0.15).abs() < 1e-12);

        let (i, v) = features.hashed().iter().next().unwrap();
        assert!((store.hashed()[i] - 0.05 * v as f64).abs() < 1e-12);
        assert_eq!(store.global_step(), 1);
    }

    #[test]
    fn test_bias_is_not_regularized() {
        let config = config(FeatureLayout::FullyHashed, 2.0);
        let builder = FeatureVectorBuilder::from_config(&config).unwrap();
        let mut store = WeightStore::new(&config);
        let mut sgd = LazySgd::new(config).unwrap();

        let e = event(true, &["a"]);
        let features = builder.build(&e);
        sgd.step(&mut store, &features, &e.label).unwrap();
        let bias = store.bias();
        let (i, _) = features.hashed().iter().next().unwrap();
        let w = store.hashed()[i];
        assert!(w != 0.0);

        // A zero-impression label has zero gradient: only regularization acts.
        let zero = Label::Counts {
            clicks: 0,
            impressions: 0,
        };
        let report = sgd.step(&mut store, &features, &zero).unwrap();
        assert_eq!(report.gradient, 0.0);
        assert_eq!(store.bias(), bias);
        assert!((store.hashed()[i] - 0.8 * w).abs() < 1e-12);
    }

    #[test]
    fn test_errors_leave_store_unchanged() {
        let config = config(FeatureLayout::FullyHashed, 0.1);
        let builder = FeatureVectorBuilder::from_config(&config).unwrap();
        let mut store = WeightStore::new(&config);
        let mut sgd = LazySgd::new(config).unwrap();

        let e = event(true, &["x", "y"]);
        let features = builder.build(&e);
        let before = store.clone();

        let err = sgd
            .step(&mut store, &features, &Label::Unlabeled)
            .unwrap_err();
        assert!(matches!(err, HashlrError::MissingLabel { step: 0 }));

        let bad = Label::Counts {
            clicks: 2,
            impressions: 1,
        };
        assert!(matches!(
            sgd.step(&mut store, &features, &bad),
            Err(HashlrError::InvalidLabel { .. })
        ));

        let other = FeatureVectorBuilder::new(16, false, FeatureLayout::FullyHashed).unwrap();
        assert!(matches!(
            sgd.step(&mut store, &other.build(&e), &e.label),
            Err(HashlrError::ConfigurationMismatch { what: "dim", .. })
        ));

        assert_eq!(store, before);
    }

    #[test]
    fn test_store_from_other_config_rejected() {
        let mut store = WeightStore::new(&config(FeatureLayout::FullyHashed, 0.1));
        let mut sgd = LazySgd::new(config(FeatureLayout::FullyHashed, 0.2)).unwrap();
        let features = FeatureVector::new(8, None, Default::default());
        assert!(matches!(
            sgd.step(&mut store, &features, &Label::Clicked(true)),
            Err(HashlrError::ConfigurationMismatch { what: "lambda", .. })
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad: LearnerConfig = serde_json::from_str(r#"{"step": -1.0}"#).unwrap();
        assert!(LazySgd::new(bad).is_err());
    }
}
