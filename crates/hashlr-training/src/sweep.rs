//! Parallel hyperparameter sweeps.
//!
//! A weight store must see its events in order on one thread, but separate
//! stores share nothing. A sweep trains one store per configuration over the
//! same events, in parallel on the rayon pool.

use hashlr_core::{Event, HashlrError, LearnerConfig, LearnerConfigBuilder};
use hashlr_optimizer::WeightStore;
use rayon::prelude::*;
use tracing::info;

use crate::error::Result;
use crate::learner::OnlineLearner;

/// One trained member of a sweep.
#[derive(Debug, Clone)]
pub struct SweepResult {
    /// The configuration of this member.
    pub config: LearnerConfig,
    /// The settled weights.
    pub weights: WeightStore,
}

/// Builds the cross product of `dims` and `lambdas` on top of `base`.
///
/// Configurations are ordered by dimension first, then lambda.
///
/// # Examples
///
/// ```
/// use hashlr_core::LearnerConfig;
/// use hashlr_training::sweep::grid;
///
/// let configs = grid(&LearnerConfig::default(), &[97, 12289], &[0.0, 0.001]).unwrap();
/// assert_eq!(configs.len(), 4);
/// assert_eq!(configs[1].dim(), 97);
/// assert_eq!(configs[1].lambda(), 0.001);
/// ```
///
/// # Errors
///
/// Returns [`HashlrError::InvalidConfig`] if a combination is invalid.
pub fn grid(
    base: &LearnerConfig,
    dims: &[usize],
    lambdas: &[f64],
) -> std::result::Result<Vec<LearnerConfig>, HashlrError> {
    let mut configs = Vec::with_capacity(dims.len() * lambdas.len());
    for &dim in dims {
        for &lambda in lambdas {
            configs.push(
                LearnerConfigBuilder::from_config(base.clone())
                    .dim(dim)
                    .lambda(lambda)
                    .build()?,
            );
        }
    }
    Ok(configs)
}

/// Trains one model per configuration over `events`, in parallel.
///
/// Results are returned in the order of `configs`.
///
/// # Errors
///
/// Returns the first error of any member.
pub fn train_sweep(events: &[Event], configs: &[LearnerConfig]) -> Result<Vec<SweepResult>> {
    configs
        .par_iter()
        .map(|config| -> Result<SweepResult> {
            let mut learner = OnlineLearner::new(config.clone())?;
            learner.train(events.iter().cloned())?;
            let weights = learner.finish()?;
            info!(
                dim = config.dim(),
                lambda = config.lambda(),
                step = config.step(),
                l2_norm = weights.l2_norm(),
                "Sweep member finished"
            );
            Ok(SweepResult {
                config: config.clone(),
                weights,
            })
        })
        .collect()
}
