use crate::{BlinkConfig, CountingMode};

/// Reduces per-frame scores to a blink count.
///
/// In [`CountingMode::Frames`] every score strictly above `threshold` adds one.
/// In [`CountingMode::Events`] the eyes close when a score rises above
/// `threshold` and one blink is counted when a later score drops below
/// `reopen_threshold`; a clip that ends with closed eyes does not count.
pub fn count_blinks(scores: &[f32], cfg: &BlinkConfig) -> u32 {
    match cfg.counting {
        CountingMode::Frames => scores.iter().filter(|&&s| s > cfg.threshold).count() as u32,
        CountingMode::Events => {
            let mut closed = false;
            let mut blinks = 0u32;
            for &score in scores {
                if !closed && score > cfg.threshold {
                    closed = true;
                } else if closed && score < cfg.reopen_threshold {
                    closed = false;
                    blinks += 1;
                }
            }
            blinks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(counting: CountingMode) -> BlinkConfig {
        BlinkConfig {
            counting,
            ..Default::default()
        }
    }

    #[test]
    fn no_scores_means_no_blinks() {
        assert_eq!(count_blinks(&[], &cfg(CountingMode::Frames)), 0);
        assert_eq!(count_blinks(&[], &cfg(CountingMode::Events)), 0);
    }

    #[test]
    fn frames_mode_counts_every_closed_frame() {
        let scores = [0.1, 0.9, 0.95, 0.2, 0.7, 0.5];
        assert_eq!(count_blinks(&scores, &cfg(CountingMode::Frames)), 3);
    }

    #[test]
    fn threshold_is_strict() {
        assert_eq!(count_blinks(&[0.5, 0.5], &cfg(CountingMode::Frames)), 0);
    }

    #[test]
    fn events_mode_counts_transitions() {
        let scores = [0.1, 0.9, 0.95, 0.2, 0.1, 0.7, 0.1];
        assert_eq!(count_blinks(&scores, &cfg(CountingMode::Events)), 2);
    }

    #[test]
    fn events_mode_applies_hysteresis() {
        // 0.45 is between reopen (0.4) and close (0.5): eyes stay closed.
        let scores = [0.9, 0.45, 0.9, 0.45, 0.1];
        assert_eq!(count_blinks(&scores, &cfg(CountingMode::Events)), 1);
    }

    #[test]
    fn unfinished_blink_is_not_counted() {
        let scores = [0.1, 0.9, 0.9];
        assert_eq!(count_blinks(&scores, &cfg(CountingMode::Events)), 0);
    }
}
