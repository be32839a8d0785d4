//! Feature vectors and the feature vector builder.
//!
//! A [`FeatureVector`] is what the learner and the predictor consume: an
//! optional block of named dense scalars and a [`HashedFeatureBag`] of signed
//! counts keyed by hashed index.
//!
//! # Layouts
//!
//! - [`FeatureLayout::Structured`]: depth, position, age and gender are kept as
//!   dense scalars with their own weights; only tokens are hashed.
//! - [`FeatureLayout::FullyHashed`]: the four scalars are hashed under fixed
//!   keys exactly like tokens, with the scalar value as the feature value.
//!
//! Both layouts share the same hashed space, regularization and gradient
//! machinery; they differ only in how the vector is assembled.
//!
//! # Personalization
//!
//! When personalization is on, every hashed term is hashed a second time under
//! a key owned by the event's user, and a per-user intercept with value `1` is
//! added. Per-user and global terms share the same `dim` buckets.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::event::{Event, EventContext};
use crate::hashing::{FeatureHasher, FeatureKey, FieldTag, UserId};
use crate::params::LearnerConfig;

/// How the fixed scalar fields enter the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLayout {
    /// Bias, dense scalar weights and hashed tokens.
    Structured,
    /// Bias and hashed everything.
    #[default]
    FullyHashed,
}

impl FeatureLayout {
    /// Returns the layout name.
    pub fn name(self) -> &'static str {
        match self {
            FeatureLayout::Structured => "structured",
            FeatureLayout::FullyHashed => "fully_hashed",
        }
    }

    /// Returns `true` if the layout keeps dense scalar weights.
    pub fn has_dense(self) -> bool {
        matches!(self, FeatureLayout::Structured)
    }
}

impl std::fmt::Display for FeatureLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for FeatureLayout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "structured" => Ok(FeatureLayout::Structured),
            "fully_hashed" | "fully-hashed" => Ok(FeatureLayout::FullyHashed),
            other => Err(format!("unknown feature layout: {other}")),
        }
    }
}

/// One of the four named scalar fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenseField {
    /// Session depth.
    Depth,
    /// Ad position.
    Position,
    /// Age bucket.
    Age,
    /// Gender indicator.
    Gender,
}

impl DenseField {
    /// All dense fields in storage order.
    pub const ALL: [DenseField; 4] = [
        DenseField::Depth,
        DenseField::Position,
        DenseField::Age,
        DenseField::Gender,
    ];

    /// Returns the field tag used when the field is hashed.
    pub fn tag(self) -> FieldTag {
        match self {
            DenseField::Depth => FieldTag::Depth,
            DenseField::Position => FieldTag::Position,
            DenseField::Age => FieldTag::Age,
            DenseField::Gender => FieldTag::Gender,
        }
    }

    /// Returns the storage slot of this field.
    #[inline]
    pub fn slot(self) -> usize {
        self as usize
    }

    /// Reads this field from an event context.
    pub fn value_of(self, context: &EventContext) -> i32 {
        match self {
            DenseField::Depth => context.depth,
            DenseField::Position => context.position,
            DenseField::Age => context.age,
            DenseField::Gender => context.gender,
        }
    }
}

/// Dense scalar values of one event, indexed by [`DenseField::slot`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct DenseFeatures {
    values: [f64; 4],
}

impl DenseFeatures {
    /// Extracts the dense values of a context.
    pub fn from_context(context: &EventContext) -> Self {
        let mut values = [0.0; 4];
        for field in DenseField::ALL {
            values[field.slot()] = f64::from(field.value_of(context));
        }
        Self { values }
    }

    /// Returns the value of `field`.
    #[inline]
    pub fn get(&self, field: DenseField) -> f64 {
        self.values[field.slot()]
    }

    /// Iterates `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (DenseField, f64)> + '_ {
        DenseField::ALL.into_iter().map(|f| (f, self.get(f)))
    }
}

/// Accumulated signed counts keyed by hashed index.
///
/// Collisions add up. An index that received terms whose signs cancelled keeps
/// a `0` entry: it is still referenced by the event.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HashedFeatureBag {
    entries: BTreeMap<usize, i64>,
}

impl HashedFeatureBag {
    /// Creates an empty bag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` to the entry at `index`.
    #[inline]
    pub fn add(&mut self, index: usize, value: i64) {
        *self.entries.entry(index).or_insert(0) += value;
    }

    /// Returns the accumulated value at `index`, if referenced.
    pub fn get(&self, index: usize) -> Option<i64> {
        self.entries.get(&index).copied()
    }

    /// Returns the number of referenced indices.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if no index is referenced.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(index, value)` pairs in increasing index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, i64)> + '_ {
        self.entries.iter().map(|(&i, &v)| (i, v))
    }

    /// Iterates referenced indices in increasing order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.keys().copied()
    }

    /// Returns the largest referenced index.
    pub fn max_index(&self) -> Option<usize> {
        self.entries.keys().next_back().copied()
    }
}

impl FromIterator<(usize, i64)> for HashedFeatureBag {
    fn from_iter<T: IntoIterator<Item = (usize, i64)>>(iter: T) -> Self {
        let mut bag = HashedFeatureBag::new();
        for (index, value) in iter {
            bag.add(index, value);
        }
        bag
    }
}

/// The model input built from one event.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    dim: usize,
    dense: Option<DenseFeatures>,
    hashed: HashedFeatureBag,
}

impl FeatureVector {
    /// Assembles a feature vector from parts.
    pub fn new(dim: usize, dense: Option<DenseFeatures>, hashed: HashedFeatureBag) -> Self {
        Self { dim, dense, hashed }
    }

    /// Returns the hashed-space size this vector was built for.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the dense block, present only for [`FeatureLayout::Structured`].
    #[inline]
    pub fn dense(&self) -> Option<&DenseFeatures> {
        self.dense.as_ref()
    }

    /// Returns the hashed bag.
    #[inline]
    pub fn hashed(&self) -> &HashedFeatureBag {
        &self.hashed
    }

    /// Returns the layout implied by the presence of the dense block.
    pub fn layout(&self) -> FeatureLayout {
        if self.dense.is_some() {
            FeatureLayout::Structured
        } else {
            FeatureLayout::FullyHashed
        }
    }
}

/// Builds [`FeatureVector`]s from events.
///
/// # Examples
///
/// ```
/// use hashlr_core::event::{Event, EventContext};
/// use hashlr_core::feature::{FeatureLayout, FeatureVectorBuilder};
///
/// let builder = FeatureVectorBuilder::new(97, false, FeatureLayout::Structured).unwrap();
/// let event = Event::binary(EventContext::default(), true, vec!["a".into(), "b".into()]);
/// let features = builder.build(&event);
/// assert!(features.dense().is_some());
/// assert!(features.hashed().len() <= 2);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureVectorBuilder {
    hasher: FeatureHasher,
    personalized: bool,
    layout: FeatureLayout,
}

impl FeatureVectorBuilder {
    /// Creates a builder over a `dim`-sized hashed space.
    ///
    /// # Errors
    ///
    /// Returns an error if `dim` is zero.
    pub fn new(dim: usize, personalized: bool, layout: FeatureLayout) -> Result<Self> {
        Ok(Self {
            hasher: FeatureHasher::new(dim)?,
            personalized,
            layout,
        })
    }

    /// Creates the builder matching a learner configuration.
    pub fn from_config(config: &LearnerConfig) -> Result<Self> {
        Self::new(config.dim(), config.personalized(), config.layout())
    }

    /// Returns the underlying hasher.
    #[inline]
    pub fn hasher(&self) -> &FeatureHasher {
        &self.hasher
    }

    /// Returns the hashed-space size.
    #[inline]
    pub fn dim(&self) -> usize {
        self.hasher.dim()
    }

    /// Returns whether per-user terms are added.
    #[inline]
    pub fn personalized(&self) -> bool {
        self.personalized
    }

    /// Returns the feature layout.
    #[inline]
    pub fn layout(&self) -> FeatureLayout {
        self.layout
    }

    /// Builds the feature vector of `event`.
    pub fn build(&self, event: &Event) -> FeatureVector {
        let context = &event.context;
        let owner = self.personalized.then_some(context.user_id);
        let mut bag = HashedFeatureBag::new();

        if let Some(user) = owner {
            self.hash_into(&mut bag, FeatureKey::intercept(user), 1);
        }

        let dense = match self.layout {
            FeatureLayout::Structured => Some(DenseFeatures::from_context(context)),
            FeatureLayout::FullyHashed => {
                for field in DenseField::ALL {
                    let key = FeatureKey::scalar(field.tag());
                    let value = i64::from(field.value_of(context));
                    self.hash_term(&mut bag, key, value, owner);
                }
                None
            }
        };

        for (field, tokens) in event.tokens.fields() {
            for token in tokens {
                self.hash_term(&mut bag, FeatureKey::token(field, token), 1, owner);
            }
        }

        FeatureVector::new(self.dim(), dense, bag)
    }

    /// Hashes `key` globally and, if `owner` is set, once more under the owner.
    fn hash_term(
        &self,
        bag: &mut HashedFeatureBag,
        key: FeatureKey<'_>,
        value: i64,
        owner: Option<UserId>,
    ) {
        self.hash_into(bag, key, value);
        if let Some(user) = owner {
            self.hash_into(bag, key.owned_by(user), value);
        }
    }

    #[inline]
    fn hash_into(&self, bag: &mut HashedFeatureBag, key: FeatureKey<'_>, value: i64) {
        let (index, sign) = self.hasher.hash(&key);
        bag.add(index, sign * value);
    }
}
