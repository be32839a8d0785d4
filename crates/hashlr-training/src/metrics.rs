//! Per-event metrics and their running aggregation.
//!
//! Every processed event yields a [`Metrics`] record: the log loss of its
//! label under the model *before* the update, the predicted probability and
//! the label counts. A [`MetricsRecorder`] accumulates these into progressive
//! validation figures (loss per impression, observed and predicted CTR).

use hashlr_optimizer::StepReport;
use serde::{Deserialize, Serialize};

/// Metrics of a single training step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Negative log-likelihood of the label, summed over its impressions.
    pub loss: f64,
    /// Predicted click probability before the update.
    pub probability: f64,
    /// Clicks carried by the label.
    pub clicks: u32,
    /// Impressions carried by the label.
    pub impressions: u32,
    /// The global step at which these metrics were recorded.
    pub global_step: u64,
}

impl Metrics {
    /// Creates a new `Metrics` instance with the given loss and step.
    ///
    /// # Examples
    ///
    /// ```
    /// use hashlr_training::metrics::Metrics;
    ///
    /// let metrics = Metrics::new(0.5, 100);
    /// assert_eq!(metrics.loss, 0.5);
    /// assert_eq!(metrics.global_step, 100);
    /// ```
    pub fn new(loss: f64, global_step: u64) -> Self {
        Self {
            loss,
            global_step,
            ..Self::default()
        }
    }

    /// Sets the predicted probability.
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = probability;
        self
    }

    /// Sets the label counts.
    pub fn with_outcome(mut self, clicks: u32, impressions: u32) -> Self {
        self.clicks = clicks;
        self.impressions = impressions;
        self
    }

    /// Builds the metrics of an optimizer step.
    pub fn from_report(report: &StepReport) -> Self {
        Self::new(report.loss, report.step)
            .with_probability(report.probability)
            .with_outcome(report.clicks, report.impressions)
    }
}

/// Accumulates metrics over multiple training steps.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    loss_sum: f64,
    expected_clicks: f64,
    clicks: u64,
    impressions: u64,
    count: u64,
}

impl MetricsRecorder {
    /// Creates a new empty `MetricsRecorder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a set of metrics.
    ///
    /// # Examples
    ///
    /// ```
    /// use hashlr_training::metrics::{Metrics, MetricsRecorder};
    ///
    /// let mut recorder = MetricsRecorder::new();
    /// recorder.record(&Metrics::new(0.7, 0).with_probability(0.5).with_outcome(1, 1));
    /// recorder.record(&Metrics::new(2.1, 1).with_probability(0.5).with_outcome(0, 3));
    /// assert_eq!(recorder.count(), 2);
    /// assert_eq!(recorder.impressions(), 4);
    /// assert!((recorder.average_loss() - 0.7).abs() < 1e-12);
    /// assert!((recorder.observed_ctr() - 0.25).abs() < 1e-12);
    /// assert!((recorder.predicted_ctr() - 0.5).abs() < 1e-12);
    /// ```
    pub fn record(&mut self, metrics: &Metrics) {
        self.loss_sum += metrics.loss;
        self.expected_clicks += metrics.probability * f64::from(metrics.impressions);
        self.clicks += u64::from(metrics.clicks);
        self.impressions += u64::from(metrics.impressions);
        self.count += 1;
    }

    /// Returns the number of metrics recorded.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns the total impressions recorded.
    pub fn impressions(&self) -> u64 {
        self.impressions
    }

    /// Returns the total clicks recorded.
    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    /// Returns the log loss per impression.
    ///
    /// Returns 0.0 if no impressions have been recorded.
    pub fn average_loss(&self) -> f64 {
        self.per_impression(self.loss_sum)
    }

    /// Returns the fraction of recorded impressions that were clicked.
    pub fn observed_ctr(&self) -> f64 {
        self.per_impression(self.clicks as f64)
    }

    /// Returns the impression-weighted mean predicted probability.
    pub fn predicted_ctr(&self) -> f64 {
        self.per_impression(self.expected_clicks)
    }

    /// Resets the recorder to its initial state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    fn per_impression(&self, total: f64) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            total / self.impressions as f64
        }
    }
}
