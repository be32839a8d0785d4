//! Online training and scoring for hashlr.
//!
//! This crate provides:
//!
//! - **Online learner**: [`OnlineLearner`] applies an ordered event stream to
//!   a weight store, one event at a time, and [`train`] wraps a full pass.
//! - **Predictor**: [`predict`] and [`Predictor`] score events without
//!   touching the weights.
//! - **Hooks**: progress logging and periodic checkpoints.
//! - **Metrics**: progressive log loss and CTR.
//! - **Prefetching**: decode events on a producer thread.
//! - **Sweeps**: independent models trained in parallel.
//! - **Evaluation**: RMSE against held-out outcomes.
//!
//! # Example
//!
//! ```
//! use hashlr_core::{Event, EventContext, LearnerConfig};
//! use hashlr_training::{train, Predictor};
//!
//! let config = LearnerConfig::builder().dim(8).step(0.1).lambda(0.01).build().unwrap();
//! let event = Event::binary(EventContext::default(), true, vec!["a".to_string()]);
//!
//! let predictor = Predictor::new(&config).unwrap();
//! let weights = train(vec![event.clone()], config).unwrap();
//! assert!(predictor.predict(&weights, &event).unwrap() > 0.5);
//! ```

pub mod error;
pub mod eval;
pub mod hooks;
pub mod learner;
pub mod metrics;
pub mod predict;
pub mod prefetch;
pub mod sweep;

pub use error::{Result, TrainingError};
pub use hooks::{CheckpointHook, Hook, HookAction, HookError, HookList, HookResult, LoggingHook};
pub use learner::{train, OnlineLearner};
pub use metrics::{Metrics, MetricsRecorder};
pub use predict::{predict, Predictor};
pub use prefetch::{spawn_prefetch, PrefetchQueue, Prefetcher};
pub use sweep::{train_sweep, SweepResult};
