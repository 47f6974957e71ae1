//! Scheduling of externally requested notification times.
//!
//! [`ThetaQueue`] maps notification times to the observers waiting on
//! them and keeps a running minimum. Insertion is O(1); popping the
//! minimum bucket rescans the remaining distinct times.

use indexmap::IndexMap;
use smallvec::SmallVec;

use fern_core::ObserverId;

/// Observers waiting on the same notification time.
pub type ThetaBucket = SmallVec<[ObserverId; 2]>;

/// Min-priority structure of observer notification times ("thetas").
///
/// Buckets are kept in insertion order. Observers sharing a time are
/// always delivered together, in the order they registered.
#[derive(Clone, Debug, Default)]
pub struct ThetaQueue {
    buckets: IndexMap<u64, (f64, ThetaBucket)>,
    min: Option<f64>,
}

#[inline]
fn key(time: f64) -> u64 {
    // Fold -0.0 onto 0.0 so both land in one bucket.
    (time + 0.0).to_bits()
}

impl ThetaQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every pending request.
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.min = None;
    }

    /// Number of distinct pending times.
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Whether no request is pending.
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Register `observer` at `time` without merging with earlier requests.
    ///
    /// Non-finite times are ignored. Use [`request`](Self::request) for the
    /// min-merge rule observers rely on.
    pub fn push(&mut self, time: f64, observer: ObserverId) {
        if !time.is_finite() {
            return;
        }
        self.buckets
            .entry(key(time))
            .or_insert_with(|| (time + 0.0, SmallVec::new()))
            .1
            .push(observer);
        self.min = Some(match self.min {
            Some(m) if m <= time => m,
            _ => time + 0.0,
        });
    }

    /// Earliest pending time, or `+inf` if the queue is empty.
    #[inline]
    pub fn peek_min(&self) -> f64 {
        self.min.unwrap_or(f64::INFINITY)
    }

    /// Remove and return every observer waiting on the earliest time.
    pub fn pop_min_bucket(&mut self) -> Option<(f64, ThetaBucket)> {
        let min = self.min?;
        let (time, bucket) = self.buckets.shift_remove(&key(min))?;
        self.min = self
            .buckets
            .values()
            .map(|(t, _)| *t)
            .fold(None, |acc: Option<f64>, t| match acc {
                Some(m) if m <= t => Some(m),
                _ => Some(t),
            });
        Some((time, bucket))
    }

    /// Remove every bucket due at or before `until`, earliest first.
    ///
    /// Requests pushed after the call are left in the queue even when
    /// they are due, so callers delivering the result cannot be kept
    /// busy by observers that re-request the current time.
    pub fn pop_due(&mut self, until: f64) -> Vec<(f64, ThetaBucket)> {
        let mut due = Vec::new();
        while self.peek_min() <= until {
            match self.pop_min_bucket() {
                Some(entry) => due.push(entry),
                None => break,
            }
        }
        due
    }

    /// Earliest pending time of `observer`, if any.
    pub fn pending(&self, observer: ObserverId) -> Option<f64> {
        self.buckets
            .values()
            .filter(|(_, bucket)| bucket.contains(&observer))
            .map(|(t, _)| *t)
            .fold(None, |acc: Option<f64>, t| match acc {
                Some(m) if m <= t => Some(m),
                _ => Some(t),
            })
    }

    /// Register `observer` at `time` under the min-merge rule.
    ///
    /// An outstanding request is replaced by `min(old, new)`: an earlier
    /// time moves the request forward, a later one is ignored. Returns
    /// whether the queue changed.
    pub fn request(&mut self, observer: ObserverId, time: f64) -> bool {
        if !time.is_finite() {
            return false;
        }
        match self.pending(observer) {
            Some(old) if old <= time => false,
            Some(old) => {
                self.remove(observer, old);
                self.push(time, observer);
                true
            }
            None => {
                self.push(time, observer);
                true
            }
        }
    }

    fn remove(&mut self, observer: ObserverId, time: f64) {
        let k = key(time);
        let emptied = match self.buckets.get_mut(&k) {
            Some((_, bucket)) => {
                bucket.retain(|o| *o != observer);
                bucket.is_empty()
            }
            None => false,
        };
        if emptied {
            self.buckets.shift_remove(&k);
        }
        // Only called on a move to an earlier time, which `push` then
        // installs as the new minimum when needed.
        if self.buckets.is_empty() {
            self.min = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn empty_queue_reports_infinity() {
        let mut q = ThetaQueue::new();
        assert_eq!(q.peek_min(), f64::INFINITY);
        assert!(q.pop_min_bucket().is_none());
        assert!(q.is_empty());
    }

    #[test]
    fn push_tracks_running_minimum() {
        let mut q = ThetaQueue::new();
        q.push(5.0, ObserverId(0));
        q.push(2.0, ObserverId(1));
        q.push(9.0, ObserverId(2));
        assert_eq!(q.peek_min(), 2.0);
        assert_eq!(q.len(), 3);
    }

    #[test]
    fn ties_delivered_together_in_registration_order() {
        let mut q = ThetaQueue::new();
        q.push(1.0, ObserverId(3));
        q.push(4.0, ObserverId(0));
        q.push(1.0, ObserverId(1));
        let (t, bucket) = q.pop_min_bucket().unwrap();
        assert_eq!(t, 1.0);
        assert_eq!(bucket.as_slice(), &[ObserverId(3), ObserverId(1)]);
        assert_eq!(q.peek_min(), 4.0);
    }

    #[test]
    fn request_min_merge_never_widens() {
        let mut q = ThetaQueue::new();
        assert!(q.request(ObserverId(0), 5.0));
        assert!(q.request(ObserverId(0), 3.0));
        assert_eq!(q.pending(ObserverId(0)), Some(3.0));
        assert!(!q.request(ObserverId(0), 8.0));
        assert_eq!(q.pending(ObserverId(0)), Some(3.0));
        // The old bucket at 5.0 is gone.
        assert_eq!(q.len(), 1);
        let (t, bucket) = q.pop_min_bucket().unwrap();
        assert_eq!(t, 3.0);
        assert_eq!(bucket.as_slice(), &[ObserverId(0)]);
        assert!(q.is_empty());
    }

    #[test]
    fn request_keeps_other_observers_in_shared_bucket() {
        let mut q = ThetaQueue::new();
        q.request(ObserverId(0), 5.0);
        q.request(ObserverId(1), 5.0);
        q.request(ObserverId(0), 1.0);
        assert_eq!(q.pending(ObserverId(1)), Some(5.0));
        assert_eq!(q.peek_min(), 1.0);
        q.pop_min_bucket();
        assert_eq!(q.peek_min(), 5.0);
    }

    #[test]
    fn non_finite_times_ignored() {
        let mut q = ThetaQueue::new();
        q.push(f64::NAN, ObserverId(0));
        assert!(!q.request(ObserverId(0), f64::INFINITY));
        assert!(q.is_empty());
    }

    #[test]
    fn negative_zero_shares_bucket_with_zero() {
        let mut q = ThetaQueue::new();
        q.push(0.0, ObserverId(0));
        q.push(-0.0, ObserverId(1));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn pop_due_takes_only_due_buckets_in_order() {
        let mut q = ThetaQueue::new();
        q.push(3.0, ObserverId(0));
        q.push(1.0, ObserverId(1));
        q.push(2.0, ObserverId(2));
        let due = q.pop_due(2.0);
        let times: Vec<f64> = due.iter().map(|(t, _)| *t).collect();
        assert_eq!(times, vec![1.0, 2.0]);
        assert_eq!(q.peek_min(), 3.0);
        assert!(q.pop_due(0.5).is_empty());
    }

    proptest! {
        #[test]
        fn pops_come_out_sorted(times in proptest::collection::vec(0.0f64..1000.0, 1..40)) {
            let mut q = ThetaQueue::new();
            for (i, t) in times.iter().enumerate() {
                q.push(*t, ObserverId(i as u32));
            }
            let mut last = f64::NEG_INFINITY;
            let mut delivered = 0;
            while let Some((t, bucket)) = q.pop_min_bucket() {
                prop_assert!(t >= last);
                last = t;
                delivered += bucket.len();
            }
            prop_assert_eq!(delivered, times.len());
        }

        #[test]
        fn pending_is_min_of_requests(reqs in proptest::collection::vec(0.0f64..100.0, 1..20)) {
            let mut q = ThetaQueue::new();
            for t in &reqs {
                q.request(ObserverId(0), *t);
            }
            let expected = reqs.iter().cloned().fold(f64::INFINITY, f64::min);
            prop_assert_eq!(q.pending(ObserverId(0)), Some(expected));
            prop_assert_eq!(q.len(), 1);
        }
    }
}
