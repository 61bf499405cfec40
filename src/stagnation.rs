/// Detects feed exhaustion from repeated anchor observations.
///
/// The anchor is the identifier of the first visible feed slot after each
/// reveal cycle. When it stops changing across consecutive cycles, the feed
/// is no longer advancing and is declared exhausted.
#[derive(Debug)]
pub struct StagnationTracker {
    threshold: u32,
    last_anchor: Option<String>,
    repeats: u32,
}

impl StagnationTracker {
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold,
            last_anchor: None,
            repeats: 0,
        }
    }

    /// Feed one cycle's anchor observation. `None` means the anchor could
    /// not be read this cycle; that counts as a repeat only once an anchor
    /// has actually been seen, so an empty feed that never rendered anything
    /// neither resets nor advances the counter. Returns true when the
    /// consecutive-repeat counter has reached the threshold.
    pub fn observe(&mut self, anchor: Option<&str>) -> bool {
        match anchor {
            Some(current) => {
                if self.last_anchor.as_deref() == Some(current) {
                    self.repeats += 1;
                    ::log::info!(
                        "anchor unchanged ({}), consecutive repeats: {}",
                        current,
                        self.repeats
                    );
                } else {
                    self.repeats = 0;
                    self.last_anchor = Some(current.to_string());
                    ::log::debug!("anchor changed to {}, counter reset", current);
                }
            }
            None => {
                if self.last_anchor.is_some() {
                    self.repeats += 1;
                    ::log::info!(
                        "anchor unreadable, counted as repeat: {}",
                        self.repeats
                    );
                }
            }
        }
        self.is_exhausted()
    }

    pub fn is_exhausted(&self) -> bool {
        self.repeats >= self.threshold
    }

    pub fn repeats(&self) -> u32 {
        self.repeats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_anchor_after_baseline_exhausts_at_threshold() {
        let mut tracker = StagnationTracker::new(3);
        assert!(!tracker.observe(Some("a"))); // baseline
        assert!(!tracker.observe(Some("a"))); // 1
        assert!(!tracker.observe(Some("a"))); // 2
        assert!(tracker.observe(Some("a"))); // 3
    }

    #[test]
    fn changed_anchor_resets_counter() {
        let mut tracker = StagnationTracker::new(3);
        tracker.observe(Some("a"));
        tracker.observe(Some("a"));
        tracker.observe(Some("a"));
        assert_eq!(tracker.repeats(), 2);
        assert!(!tracker.observe(Some("b")));
        assert_eq!(tracker.repeats(), 0);
    }

    #[test]
    fn alternating_anchors_never_exhaust() {
        let mut tracker = StagnationTracker::new(3);
        for _ in 0..10 {
            assert!(!tracker.observe(Some("a")));
            assert!(!tracker.observe(Some("b")));
        }
        assert!(!tracker.is_exhausted());
    }

    #[test]
    fn unreadable_anchor_counts_as_repeat_once_one_exists() {
        let mut tracker = StagnationTracker::new(3);
        tracker.observe(Some("a"));
        assert!(!tracker.observe(None));
        assert!(!tracker.observe(None));
        assert!(tracker.observe(None));
    }

    #[test]
    fn unreadable_anchor_before_any_anchor_never_advances() {
        let mut tracker = StagnationTracker::new(3);
        for _ in 0..10 {
            assert!(!tracker.observe(None));
        }
        assert_eq!(tracker.repeats(), 0);
    }
}
