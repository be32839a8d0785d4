//! Decoded impression events.
//!
//! An [`Event`] is what the line parser hands to the learner: the scalar
//! context of one ad impression, its label and its token fields. Two token
//! layouts exist:
//!
//! - binary mode: a single untagged token sequence, labelled `clicked` or not
//! - aggregated mode: four tagged sequences (query/keyword/title/description),
//!   labelled with `(clicks, impressions)` counts
//!
//! Test-set events carry [`Label::Unlabeled`].

use serde::{Deserialize, Serialize};

use crate::hashing::{FieldTag, UserId};

/// Scalar fields shared by every event.
///
/// Values are opaque to the core; out-of-range codes are not rejected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventContext {
    /// Number of ads shown in the session.
    pub depth: i32,
    /// Rank of the ad within the session.
    pub position: i32,
    /// User age bucket.
    pub age: i32,
    /// User gender indicator.
    pub gender: i32,
    /// User identifier, `0` when unknown.
    pub user_id: UserId,
}

impl EventContext {
    /// Creates a context from its scalar fields.
    pub fn new(depth: i32, position: i32, age: i32, gender: i32, user_id: UserId) -> Self {
        Self {
            depth,
            position,
            age,
            gender,
            user_id,
        }
    }
}

/// Training label of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    /// Binary mode: a single impression, clicked or not.
    Clicked(bool),
    /// Aggregated mode: `impressions` Bernoulli draws with `clicks` positives.
    Counts {
        /// Number of clicks.
        clicks: u32,
        /// Number of impressions.
        impressions: u32,
    },
    /// No label (held-out data).
    Unlabeled,
}

impl Label {
    /// Returns `true` if the label can drive a gradient step.
    pub fn is_labeled(&self) -> bool {
        !matches!(self, Label::Unlabeled)
    }

    /// Returns `(clicks, impressions)` for either labelled mode.
    pub fn counts(&self) -> Option<(u32, u32)> {
        match *self {
            Label::Clicked(clicked) => Some((u32::from(clicked), 1)),
            Label::Counts {
                clicks,
                impressions,
            } => Some((clicks, impressions)),
            Label::Unlabeled => None,
        }
    }
}

/// Tagged token sequences of an aggregated-mode event.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaggedTokens {
    /// Query tokens.
    pub query: Vec<String>,
    /// Purchased keyword tokens.
    pub keyword: Vec<String>,
    /// Ad title tokens.
    pub title: Vec<String>,
    /// Ad description tokens.
    pub description: Vec<String>,
}

/// Token layout of an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenFields {
    /// One untagged sequence.
    Single(Vec<String>),
    /// Four tagged sequences.
    Tagged(TaggedTokens),
}

impl TokenFields {
    /// Iterates `(field, tokens)` pairs in a fixed order.
    pub fn fields(&self) -> impl Iterator<Item = (FieldTag, &[String])> + '_ {
        let (single, tagged) = match self {
            TokenFields::Single(tokens) => (Some((FieldTag::Tokens, tokens.as_slice())), None),
            TokenFields::Tagged(tagged) => (None, Some(tagged)),
        };
        single.into_iter().chain(tagged.into_iter().flat_map(|t| {
            [
                (FieldTag::Query, t.query.as_slice()),
                (FieldTag::Keyword, t.keyword.as_slice()),
                (FieldTag::Title, t.title.as_slice()),
                (FieldTag::Description, t.description.as_slice()),
            ]
        }))
    }

    /// Total number of tokens across all fields.
    pub fn token_count(&self) -> usize {
        self.fields().map(|(_, tokens)| tokens.len()).sum()
    }
}

/// One decoded impression event.
///
/// # Examples
///
/// ```
/// use hashlr_core::event::{Event, EventContext, Label};
///
/// let event = Event::binary(EventContext::default(), true, vec!["a".to_string()]);
/// assert_eq!(event.label, Label::Clicked(true));
/// assert_eq!(event.tokens.token_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Scalar context.
    pub context: EventContext,
    /// Label, if any.
    pub label: Label,
    /// Token fields.
    pub tokens: TokenFields,
}

impl Event {
    /// Creates a binary-mode event.
    pub fn binary(context: EventContext, clicked: bool, tokens: Vec<String>) -> Self {
        Self {
            context,
            label: Label::Clicked(clicked),
            tokens: TokenFields::Single(tokens),
        }
    }

    /// Creates an aggregated-mode event.
    pub fn aggregated(
        context: EventContext,
        clicks: u32,
        impressions: u32,
        tokens: TaggedTokens,
    ) -> Self {
        Self {
            context,
            label: Label::Counts {
                clicks,
                impressions,
            },
            tokens: TokenFields::Tagged(tokens),
        }
    }

    /// Creates an event without a label.
    pub fn unlabeled(context: EventContext, tokens: TokenFields) -> Self {
        Self {
            context,
            label: Label::Unlabeled,
            tokens,
        }
    }

    /// Returns the same event with `label` replaced.
    pub fn with_label(mut self, label: Label) -> Self {
        self.label = label;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_single_fields() {
        let fields = TokenFields::Single(tokens(&["a", "b"]));
        let collected: Vec<_> = fields.fields().collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].0, FieldTag::Tokens);
        assert_eq!(collected[0].1.len(), 2);
    }

    #[test]
    fn test_tagged_fields_order() {
        let fields = TokenFields::Tagged(TaggedTokens {
            query: tokens(&["1"]),
            keyword: tokens(&["2", "3"]),
            title: vec![],
            description: tokens(&["4"]),
        });
        let tags: Vec<FieldTag> = fields.fields().map(|(tag, _)| tag).collect();
        assert_eq!(
            tags,
            vec![
                FieldTag::Query,
                FieldTag::Keyword,
                FieldTag::Title,
                FieldTag::Description
            ]
        );
        assert_eq!(fields.token_count(), 4);
    }

    #[test]
    fn test_label_counts() {
        assert_eq!(Label::Clicked(true).counts(), Some((1, 1)));
        assert_eq!(Label::Clicked(false).counts(), Some((0, 1)));
        assert_eq!(
            Label::Counts {
                clicks: 2,
                impressions: 9
            }
            .counts(),
            Some((2, 9))
        );
        assert_eq!(Label::Unlabeled.counts(), None);
        assert!(!Label::Unlabeled.is_labeled());
    }

    #[test]
    fn test_with_label() {
        let event = Event::unlabeled(EventContext::default(), TokenFields::Single(vec![]))
            .with_label(Label::Clicked(false));
        assert_eq!(event.label, Label::Clicked(false));
    }

    #[test]
    fn test_event_serde() {
        let event = Event::aggregated(
            EventContext::new(2, 1, 3, -1, 42),
            1,
            5,
            TaggedTokens {
                query: tokens(&["10"]),
                ..Default::default()
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(event, back);
    }
}
