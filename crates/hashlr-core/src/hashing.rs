//! Structured feature keys and the signed feature hasher.
//!
//! Every token, scalar and per-user term of an event is named by a
//! [`FeatureKey`]: a field tag, the token text (empty for scalars), and an
//! optional owning user. The [`FeatureHasher`] maps a key to an index in
//! `[0, dim)` and a sign in `{-1, +1}`.
//!
//! # Key Encoding
//!
//! A key is fed to the hash as:
//! - 1 byte: field tag
//! - 1 byte: owner marker (`0` global, `1` per-user), followed by the 4-byte
//!   little-endian user id when the marker is `1`
//! - remaining bytes: token text
//!
//! The token is the only variable-length part and comes last, so two distinct
//! keys never produce the same byte stream. Keys such as `query` + `"1"` and
//! `title` + `"1"` therefore cannot alias the way concatenated strings can.
//!
//! Index and sign are taken from two xxh3 digests with different seeds, so the
//! sign of a key carries no information about its bucket.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::Xxh3;

use crate::error::{HashlrError, Result};

/// Identifier of the user an event belongs to. `0` means unknown.
pub type UserId = u32;

/// Seed of the digest that selects the bucket.
pub const INDEX_SEED: u64 = 0x9e37_79b9_7f4a_7c15;

/// Seed of the digest that selects the sign.
pub const SIGN_SEED: u64 = 0xc2b2_ae3d_27d4_eb4f;

/// The field a feature key belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum FieldTag {
    /// Untagged token sequence of a binary-mode event.
    Tokens = 1,
    /// Query tokens.
    Query = 2,
    /// Purchased keyword tokens.
    Keyword = 3,
    /// Ad title tokens.
    Title = 4,
    /// Ad description tokens.
    Description = 5,
    /// Session depth scalar.
    Depth = 6,
    /// Ad position scalar.
    Position = 7,
    /// User age bucket scalar.
    Age = 8,
    /// User gender scalar.
    Gender = 9,
    /// Per-user bias term.
    Intercept = 10,
}

impl FieldTag {
    /// Returns the byte this tag is hashed as.
    #[inline]
    pub const fn as_byte(self) -> u8 {
        self as u8
    }

    /// Returns the lowercase field name.
    pub fn name(self) -> &'static str {
        match self {
            FieldTag::Tokens => "tokens",
            FieldTag::Query => "query",
            FieldTag::Keyword => "keyword",
            FieldTag::Title => "title",
            FieldTag::Description => "description",
            FieldTag::Depth => "depth",
            FieldTag::Position => "position",
            FieldTag::Age => "age",
            FieldTag::Gender => "gender",
            FieldTag::Intercept => "intercept",
        }
    }
}

impl std::fmt::Display for FieldTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A structured hash key.
///
/// # Examples
///
/// ```
/// use hashlr_core::hashing::{FeatureKey, FieldTag};
///
/// let global = FeatureKey::token(FieldTag::Query, "42");
/// let personal = global.owned_by(7);
/// assert_eq!(personal.owner(), Some(7));
/// assert_ne!(global, personal);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FeatureKey<'a> {
    field: FieldTag,
    token: &'a str,
    owner: Option<UserId>,
}

impl<'a> FeatureKey<'a> {
    /// Creates a global key for a token of a text field.
    #[inline]
    pub fn token(field: FieldTag, token: &'a str) -> Self {
        Self {
            field,
            token,
            owner: None,
        }
    }

    /// Creates a global key for a scalar field such as `age`.
    #[inline]
    pub fn scalar(field: FieldTag) -> FeatureKey<'static> {
        FeatureKey {
            field,
            token: "",
            owner: None,
        }
    }

    /// Creates the per-user intercept key.
    #[inline]
    pub fn intercept(owner: UserId) -> FeatureKey<'static> {
        FeatureKey {
            field: FieldTag::Intercept,
            token: "",
            owner: Some(owner),
        }
    }

    /// Returns the same key scoped to `owner`.
    #[inline]
    pub fn owned_by(self, owner: UserId) -> Self {
        Self {
            owner: Some(owner),
            ..self
        }
    }

    /// Returns the field tag.
    #[inline]
    pub fn field(&self) -> FieldTag {
        self.field
    }

    /// Returns the token text (empty for scalar and intercept keys).
    #[inline]
    pub fn token_text(&self) -> &'a str {
        self.token
    }

    /// Returns the owning user, if the key is personalized.
    #[inline]
    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    fn digest(&self, seed: u64) -> u64 {
        let mut hasher = Xxh3::with_seed(seed);
        hasher.update(&[self.field.as_byte()]);
        match self.owner {
            Some(owner) => {
                hasher.update(&[1]);
                hasher.update(&owner.to_le_bytes());
            }
            None => hasher.update(&[0]),
        }
        hasher.update(self.token.as_bytes());
        hasher.digest()
    }
}

/// Maps feature keys to a signed slot of a `dim`-sized weight space.
///
/// Both mappings are pure functions of the key and `dim`; the same hasher must
/// be used for training and prediction.
///
/// # Examples
///
/// ```
/// use hashlr_core::hashing::{FeatureHasher, FeatureKey, FieldTag};
///
/// let hasher = FeatureHasher::new(97).unwrap();
/// let key = FeatureKey::token(FieldTag::Title, "1024");
/// let (index, sign) = hasher.hash(&key);
/// assert!(index < 97);
/// assert!(sign == 1 || sign == -1);
/// assert_eq!(hasher.hash(&key), (index, sign));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureHasher {
    dim: usize,
}

impl FeatureHasher {
    /// Creates a hasher over `dim` buckets.
    ///
    /// # Errors
    ///
    /// Returns [`HashlrError::InvalidConfig`] if `dim` is zero.
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(HashlrError::InvalidConfig {
                message: "hashed dimension must be greater than 0".to_string(),
            });
        }
        Ok(Self { dim })
    }

    /// Returns the number of buckets.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Returns the bucket of `key` in `[0, dim)`.
    #[inline]
    pub fn index_of(&self, key: &FeatureKey<'_>) -> usize {
        (key.digest(INDEX_SEED) % self.dim as u64) as usize
    }

    /// Returns the sign of `key`, `+1` or `-1`.
    #[inline]
    pub fn sign_of(&self, key: &FeatureKey<'_>) -> i64 {
        if key.digest(SIGN_SEED) >> 63 == 0 {
            1
        } else {
            -1
        }
    }

    /// Returns `(index_of(key), sign_of(key))`.
    #[inline]
    pub fn hash(&self, key: &FeatureKey<'_>) -> (usize, i64) {
        (self.index_of(key), self.sign_of(key))
    }
}
