//! Core types for hashlr, a hashed logistic-regression click model.
//!
//! This crate provides the pieces shared by training and prediction:
//!
//! - **Feature hashing**: structured [`FeatureKey`]s mapped to a signed bucket
//!   of a fixed-size weight space by the [`FeatureHasher`].
//! - **Events**: decoded impression events in binary or aggregated mode.
//! - **Feature vectors**: the [`FeatureVectorBuilder`] turning an event into
//!   dense scalars plus a [`HashedFeatureBag`].
//! - **Configuration**: the [`LearnerConfig`] shared by learner and predictor.
//! - **Error types**: [`HashlrError`] and the crate [`Result`] alias.
//!
//! # Example
//!
//! ```
//! use hashlr_core::{Event, EventContext, FeatureLayout, FeatureVectorBuilder};
//!
//! let builder = FeatureVectorBuilder::new(8, false, FeatureLayout::Structured).unwrap();
//! let event = Event::binary(EventContext::default(), true, vec!["a".to_string()]);
//! let features = builder.build(&event);
//! assert_eq!(features.dim(), 8);
//! assert_eq!(features.hashed().len(), 1);
//! ```
//!
//! # Modules
//!
//! - [`hashing`]: feature keys and the hasher.
//! - [`event`]: the event data model.
//! - [`feature`]: feature vectors and their builder.
//! - [`params`]: learner configuration.
//! - [`error`]: error types.

pub mod error;
pub mod event;
pub mod feature;
pub mod hashing;
pub mod params;

pub use error::{HashlrError, Result};
pub use event::{Event, EventContext, Label, TaggedTokens, TokenFields};
pub use feature::{
    DenseFeatures, DenseField, FeatureLayout, FeatureVector, FeatureVectorBuilder,
    HashedFeatureBag,
};
pub use hashing::{FeatureHasher, FeatureKey, FieldTag, UserId};
pub use params::{LearnerConfig, LearnerConfigBuilder};
