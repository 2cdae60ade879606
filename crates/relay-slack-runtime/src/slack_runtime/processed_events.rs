use std::collections::{HashSet, VecDeque};

/// Bounded record of event keys already dispatched.
///
/// Slack retries Events API deliveries and may send both a `message` and an
/// `app_mention` for the same post; both share a `channel:ts` key. The oldest
/// keys are evicted first once `cap` is reached.
#[derive(Debug)]
pub(super) struct ProcessedEventGuard {
    order: VecDeque<String>,
    index: HashSet<String>,
    cap: usize,
}

impl ProcessedEventGuard {
    pub(super) fn new(cap: usize) -> Self {
        Self {
            order: VecDeque::new(),
            index: HashSet::new(),
            cap: cap.max(1),
        }
    }

    /// Records `key`; returns `false` if it was already present.
    pub(super) fn mark_processed(&mut self, key: &str) -> bool {
        if self.index.contains(key) {
            return false;
        }
        self.order.push_back(key.to_string());
        self.index.insert(key.to_string());
        while self.order.len() > self.cap {
            if let Some(evicted) = self.order.pop_front() {
                self.index.remove(&evicted);
            }
        }
        true
    }

    pub(super) fn len(&self) -> usize {
        self.order.len()
    }
}
