//! Lazy L2 regularization.
//!
//! Eager L2-regularized SGD multiplies every weight not referenced by the
//! current event by `decay = 1 - step * lambda`. Doing that over millions of
//! buckets per event is the dominant cost, and the decay of a weight between
//! two references only depends on how many steps elapsed. The store therefore
//! records, per index, the step through which the weight is up to date, and
//! applies the owed decay in one multiplication when the index is referenced
//! again ([`WeightStore::catch_up`]) or at the end of training
//! ([`WeightStore::settle`]).
//!
//! Steps are numbered from `0`: the event being processed is step
//! `global_step`, and the counter advances after its update.

use tracing::debug;

use crate::weights::WeightStore;

/// Returns `decay^steps`.
///
/// Uses integer exponentiation while `steps` fits in an `i32`.
#[inline]
pub fn decay_factor(decay: f64, steps: u64) -> f64 {
    if steps == 0 {
        return 1.0;
    }
    match i32::try_from(steps) {
        Ok(n) => decay.powi(n),
        Err(_) => decay.powf(steps as f64),
    }
}

impl WeightStore {
    /// Brings index `i` up to date for the event at step `now`.
    ///
    /// Applies the decay of every step strictly between the last touch and
    /// `now`, then marks `i` as touched at `now`. The first reference of an
    /// index only records it.
    pub fn catch_up(&mut self, i: usize, now: u64) {
        match self.last_touched[i] {
            Some(t0) => {
                let skipped = now.saturating_sub(t0 + 1);
                if skipped > 0 {
                    self.hashed[i] *= decay_factor(self.decay(), skipped);
                }
            }
            None => self.touched.push(i),
        }
        self.last_touched[i] = Some(now);
    }

    /// Applies all pending decay.
    ///
    /// After settling, every touched index is up to date through step
    /// `global_step - 1`, and the raw weights equal those of eager
    /// regularization. Settling twice is a no-op.
    pub fn settle(&mut self) {
        let now = self.global_step();
        if now == 0 {
            return;
        }
        let decay = self.decay();
        let mut settled = 0usize;
        for &i in &self.touched {
            if let Some(t0) = self.last_touched[i] {
                let skipped = now.saturating_sub(t0 + 1);
                if skipped > 0 {
                    self.hashed[i] *= decay_factor(decay, skipped);
                    settled += 1;
                }
                self.last_touched[i] = Some(now - 1);
            }
        }
        debug!(
            global_step = now,
            touched = self.touched.len(),
            settled,
            "Applied pending L2 decay"
        );
    }
}
