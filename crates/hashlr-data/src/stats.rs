//! One-pass dataset statistics.
//!
//! Used to inspect a training or test file before fitting: click-through
//! rate, vocabulary and user coverage, and the train/test overlap.

use std::collections::{HashMap, HashSet};

use hashlr_core::{Event, UserId};

/// Aggregates gathered over one pass of a dataset.
///
/// # Examples
///
/// ```
/// use hashlr_data::{DatasetStats, EventReader};
///
/// let data = "1|4|1|1|5,6|7|8|9|3,1,2\n0|2|1|1|5|7|10|11|0,0,0\n";
/// let stats = DatasetStats::from_events(
///     EventReader::new(data.as_bytes(), true).map(Result::unwrap),
/// );
/// assert_eq!(stats.count(), 2);
/// assert!((stats.average_ctr() - 1.0 / 6.0).abs() < 1e-12);
/// assert_eq!(stats.unique_users().len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatasetStats {
    count: u64,
    clicks: u64,
    impressions: u64,
    tokens: HashSet<String>,
    users: HashSet<UserId>,
    token_frequency: HashMap<String, u64>,
    max_impressions: Option<(u64, u32)>,
    max_clicks: Option<(u64, u32)>,
}

impl DatasetStats {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulates statistics over `events`.
    pub fn from_events<I: IntoIterator<Item = Event>>(events: I) -> Self {
        let mut stats = Self::new();
        for event in events {
            stats.record(&event);
        }
        stats
    }

    /// Adds one event.
    ///
    /// Unlabeled events contribute tokens and users but no clicks or
    /// impressions. Token frequencies are weighted by `max(impressions, 1)`.
    pub fn record(&mut self, event: &Event) {
        let index = self.count;
        self.count += 1;

        let (clicks, impressions) = event.label.counts().unwrap_or((0, 0));
        self.clicks += u64::from(clicks);
        self.impressions += u64::from(impressions);

        if event.label.is_labeled() {
            if self.max_impressions.map_or(true, |(_, best)| impressions > best) {
                self.max_impressions = Some((index, impressions));
            }
            if self.max_clicks.map_or(true, |(_, best)| clicks > best) {
                self.max_clicks = Some((index, clicks));
            }
        }

        let weight = u64::from(impressions.max(1));
        for (_, tokens) in event.tokens.fields() {
            for token in tokens {
                *self.token_frequency.entry(token.clone()).or_insert(0) += weight;
                if !self.tokens.contains(token) {
                    self.tokens.insert(token.clone());
                }
            }
        }

        if event.context.user_id != 0 {
            self.users.insert(event.context.user_id);
        }
    }

    /// Number of events seen.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total clicks.
    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    /// Total impressions.
    pub fn impressions(&self) -> u64 {
        self.impressions
    }

    /// `clicks / impressions`, or `0` without impressions.
    pub fn average_ctr(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            self.clicks as f64 / self.impressions as f64
        }
    }

    /// Distinct tokens across all token fields.
    pub fn unique_tokens(&self) -> &HashSet<String> {
        &self.tokens
    }

    /// Distinct known users; user `0` (unknown) is excluded.
    pub fn unique_users(&self) -> &HashSet<UserId> {
        &self.users
    }

    /// Impression-weighted frequency of `token`.
    pub fn token_frequency(&self, token: &str) -> u64 {
        self.token_frequency.get(token).copied().unwrap_or(0)
    }

    /// The `n` most frequent tokens, most frequent first; ties by token.
    pub fn top_tokens(&self, n: usize) -> Vec<(&str, u64)> {
        let mut all: Vec<(&str, u64)> = self
            .token_frequency
            .iter()
            .map(|(token, &freq)| (token.as_str(), freq))
            .collect();
        all.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        all.truncate(n);
        all
    }

    /// Position and impressions of the first labeled event with the most
    /// impressions.
    pub fn max_impressions(&self) -> Option<(u64, u32)> {
        self.max_impressions
    }

    /// Position and clicks of the first labeled event with the most clicks.
    pub fn max_clicks(&self) -> Option<(u64, u32)> {
        self.max_clicks
    }
}

/// Number of elements of `a` that also occur in `b`.
///
/// ```
/// use std::collections::HashSet;
/// use hashlr_data::common_count;
///
/// let a: HashSet<u32> = [1, 2, 3].into_iter().collect();
/// let b: HashSet<u32> = [2, 3, 4].into_iter().collect();
/// assert_eq!(common_count(&a, &b), 2);
/// ```
pub fn common_count<T: Eq + std::hash::Hash>(a: &HashSet<T>, b: &HashSet<T>) -> usize {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    small.iter().filter(|x| large.contains(*x)).count()
}
