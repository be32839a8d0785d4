//! Scoring predictions against held-out outcomes.
//!
//! An outcome is a `(clicks, impressions)` pair; its empirical CTR is
//! `clicks / impressions`, or `0` when there were no impressions.

use hashlr_core::HashlrError;

use crate::error::Result;

/// Empirical click-through rate, `0` when `impressions` is `0`.
#[inline]
pub fn ctr(clicks: u32, impressions: u32) -> f64 {
    if impressions == 0 {
        0.0
    } else {
        f64::from(clicks) / f64::from(impressions)
    }
}

fn check_lengths(outcomes: &[(u32, u32)], predictions: &[f64]) -> Result<()> {
    if outcomes.len() != predictions.len() {
        return Err(
            HashlrError::mismatch("prediction count", outcomes.len(), predictions.len()).into(),
        );
    }
    Ok(())
}

/// Root mean squared error between each outcome's CTR and its prediction,
/// averaged over instances.
///
/// # Examples
///
/// ```
/// use hashlr_training::eval::rmse;
///
/// let outcomes = [(1, 2), (0, 4)];
/// let predictions = [0.5, 0.5];
/// // errors: 0 and 0.5
/// assert!((rmse(&outcomes, &predictions).unwrap() - 0.125f64.sqrt()).abs() < 1e-12);
/// ```
///
/// # Errors
///
/// Returns a configuration mismatch if the slices differ in length.
pub fn rmse(outcomes: &[(u32, u32)], predictions: &[f64]) -> Result<f64> {
    check_lengths(outcomes, predictions)?;
    if outcomes.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = outcomes
        .iter()
        .zip(predictions)
        .map(|(&(clicks, impressions), &p)| {
            let err = ctr(clicks, impressions) - p;
            err * err
        })
        .sum();
    Ok((sum / outcomes.len() as f64).sqrt())
}

/// Root mean squared error weighted by each outcome's impressions,
/// `sqrt(sum(imp * err^2) / sum(imp))`.
///
/// This is a true weighted mean and stays on the scale of [`rmse`]. The
/// legacy competition score, which divides unweighted squared errors by the
/// total impressions, is [`per_impression_rmse`].
///
/// Returns `0` when no outcome has impressions.
///
/// # Errors
///
/// Returns a configuration mismatch if the slices differ in length.
pub fn weighted_rmse(outcomes: &[(u32, u32)], predictions: &[f64]) -> Result<f64> {
    check_lengths(outcomes, predictions)?;
    let mut sum = 0.0;
    let mut weight = 0.0;
    for (&(clicks, impressions), &p) in outcomes.iter().zip(predictions) {
        let err = ctr(clicks, impressions) - p;
        sum += f64::from(impressions) * err * err;
        weight += f64::from(impressions);
    }
    if weight == 0.0 {
        return Ok(0.0);
    }
    Ok((sum / weight).sqrt())
}

/// Legacy competition score: `sqrt(sum(err^2) / sum(imp))`.
///
/// Squared errors are not weighted, but the sum is divided by the total
/// impression count rather than the number of instances, so the value shrinks
/// as impressions per instance grow. Kept so that results can be compared with
/// the published leaderboard numbers.
///
/// Returns `0` when no outcome has impressions.
///
/// # Examples
///
/// ```
/// use hashlr_training::eval::per_impression_rmse;
///
/// // squared errors 0.25 and 0.25 over 4 impressions
/// let score = per_impression_rmse(&[(1, 2), (1, 2)], &[0.0, 1.0]).unwrap();
/// assert!((score - 0.125f64.sqrt()).abs() < 1e-12);
/// ```
///
/// # Errors
///
/// Returns a configuration mismatch if the slices differ in length.
pub fn per_impression_rmse(outcomes: &[(u32, u32)], predictions: &[f64]) -> Result<f64> {
    check_lengths(outcomes, predictions)?;
    let mut sum = 0.0;
    let mut impressions = 0u64;
    for (&(clicks, imp), &p) in outcomes.iter().zip(predictions) {
        let err = ctr(clicks, imp) - p;
        sum += err * err;
        impressions += u64::from(imp);
    }
    if impressions == 0 {
        return Ok(0.0);
    }
    Ok((sum / impressions as f64).sqrt())
}
