//! Logistic link, loss and gradient.
//!
//! All functions take the margin `wx = w . x`. The gradient is that of the
//! negative log-likelihood with respect to `wx`; aggregated labels sum the
//! per-impression gradients of `clicks` positives and `impressions - clicks`
//! negatives.

use hashlr_core::{HashlrError, Label, Result};

/// `exp(wx)`, clamped to a finite value.
#[inline]
pub fn clamped_exp(wx: f64) -> f64 {
    let e = wx.exp();
    if e.is_infinite() {
        f64::MAX - 1.0
    } else {
        e
    }
}

/// Click probability `exp(wx) / (1 + exp(wx))`.
#[inline]
pub fn sigmoid(wx: f64) -> f64 {
    let e = clamped_exp(wx);
    e / (1.0 + e)
}

/// Gradient of the loss w.r.t. `wx` for `clicks` out of `impressions`.
///
/// Callers must ensure `clicks <= impressions`. Zero impressions yield `0`.
///
/// # Examples
///
/// ```
/// use hashlr_optimizer::logistic::gradient;
///
/// // At wx = 0 a click pulls with -1/2, a non-click pushes with +1/2.
/// assert!((gradient(1, 1, 0.0) + 0.5).abs() < 1e-12);
/// assert!((gradient(0, 1, 0.0) - 0.5).abs() < 1e-12);
/// assert_eq!(gradient(0, 0, 3.0), 0.0);
/// ```
pub fn gradient(clicks: u32, impressions: u32, wx: f64) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    let e = clamped_exp(wx);
    let positive = -1.0 / (1.0 + e);
    let negative = e / (1.0 + e);
    f64::from(clicks) * positive + f64::from(impressions - clicks) * negative
}

/// Negative log-likelihood of `clicks` out of `impressions` at margin `wx`.
pub fn log_loss(clicks: u32, impressions: u32, wx: f64) -> f64 {
    f64::from(clicks) * softplus(-wx) + f64::from(impressions.saturating_sub(clicks)) * softplus(wx)
}

/// `ln(1 + exp(x))`, stable for large `|x|`.
#[inline]
fn softplus(x: f64) -> f64 {
    if x > 0.0 {
        x + (-x).exp().ln_1p()
    } else {
        x.exp().ln_1p()
    }
}

/// Extracts `(clicks, impressions)` from a training label.
///
/// # Errors
///
/// - [`HashlrError::MissingLabel`] for an unlabeled event.
/// - [`HashlrError::InvalidLabel`] if `clicks > impressions`.
pub fn label_counts(label: &Label, step: u64) -> Result<(u32, u32)> {
    let (clicks, impressions) = label.counts().ok_or(HashlrError::MissingLabel { step })?;
    if clicks > impressions {
        return Err(HashlrError::InvalidLabel {
            clicks,
            impressions,
        });
    }
    Ok((clicks, impressions))
}
