use crate::bank::VideoSegment;
use crate::error::{QuizcutError, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// What to do when a cue does not name the next unconsumed segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CuePolicy {
    /// Fail the run
    Strict,
    /// Leave the segment unconsumed and keep the current time
    #[default]
    Lenient,
    /// Consume the next segment regardless of its identifier
    Advance,
}

/// Cumulative playback time over segments consumed in cue order
pub struct Timeline<'a> {
    segments: &'a [VideoSegment],
    cursor: usize,
    elapsed: f64,
    policy: CuePolicy,
}

impl<'a> Timeline<'a> {
    pub fn new(segments: &'a [VideoSegment], policy: CuePolicy) -> Self {
        Self {
            segments,
            cursor: 0,
            elapsed: 0.0,
            policy,
        }
    }

    /// Match `cue` against the next segment and return the cumulative time
    pub fn advance(&mut self, cue: &str) -> Result<f64> {
        let Some(next) = self.segments.get(self.cursor) else {
            return self.mismatch(cue, "no segments left");
        };

        if next.id == cue {
            self.consume();
            log::debug!("cue '{}' matched, elapsed {:.3}s", cue, self.elapsed);
            return Ok(self.elapsed);
        }

        let expected = format!("expected '{}'", next.id);
        self.mismatch(cue, &expected)
    }

    fn mismatch(&mut self, cue: &str, expected: &str) -> Result<f64> {
        match self.policy {
            CuePolicy::Strict => Err(QuizcutError::CueMismatch {
                cue: cue.to_string(),
                expected: expected.to_string(),
            }),
            CuePolicy::Lenient => {
                log::warn!("video cue '{}' skipped: {}", cue, expected);
                Ok(self.elapsed)
            }
            CuePolicy::Advance => {
                if self.cursor < self.segments.len() {
                    log::warn!("video cue '{}' advanced anyway: {}", cue, expected);
                    self.consume();
                } else {
                    log::warn!("video cue '{}' skipped: {}", cue, expected);
                }
                Ok(self.elapsed)
            }
        }
    }

    fn consume(&mut self) {
        self.elapsed += self.segments[self.cursor].duration;
        self.cursor += 1;
    }

    /// Cumulative duration of the segments consumed so far
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Segments not yet consumed by a cue
    pub fn remaining(&self) -> &'a [VideoSegment] {
        &self.segments[self.cursor..]
    }

    /// Length of the merged video
    pub fn total_duration(&self) -> f64 {
        self.segments.iter().map(|s| s.duration).sum()
    }

    pub fn policy(&self) -> CuePolicy {
        self.policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments() -> Vec<VideoSegment> {
        vec![
            VideoSegment::new("a.mp4", 10.0),
            VideoSegment::new("b.mp4", 5.0),
            VideoSegment::new("c.mp4", 2.5),
        ]
    }

    #[test]
    fn test_advance_in_order() {
        let segments = segments();
        let mut timeline = Timeline::new(&segments, CuePolicy::Strict);

        assert_eq!(timeline.advance("a.mp4").unwrap(), 10.0);
        assert_eq!(timeline.advance("b.mp4").unwrap(), 15.0);
        assert_eq!(timeline.advance("c.mp4").unwrap(), 17.5);
        assert!(timeline.remaining().is_empty());
        assert_eq!(timeline.total_duration(), 17.5);
    }

    #[test]
    fn test_lenient_mismatch_leaves_segment() {
        let segments = segments();
        let mut timeline = Timeline::new(&segments, CuePolicy::Lenient);

        assert_eq!(timeline.advance("b.mp4").unwrap(), 0.0);
        assert_eq!(timeline.remaining().len(), 3);

        // The skipped segment is still next in line
        assert_eq!(timeline.advance("a.mp4").unwrap(), 10.0);
    }

    #[test]
    fn test_advance_policy_consumes_on_mismatch() {
        let segments = segments();
        let mut timeline = Timeline::new(&segments, CuePolicy::Advance);

        assert_eq!(timeline.advance("zzz.mp4").unwrap(), 10.0);
        assert_eq!(timeline.advance("b.mp4").unwrap(), 15.0);
        assert_eq!(timeline.remaining().len(), 1);
    }

    #[test]
    fn test_strict_mismatch_errors() {
        let segments = segments();
        let mut timeline = Timeline::new(&segments, CuePolicy::Strict);

        let err = timeline.advance("b.mp4").unwrap_err();
        assert!(matches!(err, QuizcutError::CueMismatch { .. }));
        assert!(err.to_string().contains("expected 'a.mp4'"));
        assert_eq!(timeline.elapsed(), 0.0);
    }

    #[test]
    fn test_exhausted_segments() {
        let segments = vec![VideoSegment::new("a.mp4", 1.0)];

        let mut lenient = Timeline::new(&segments, CuePolicy::Lenient);
        lenient.advance("a.mp4").unwrap();
        assert_eq!(lenient.advance("a.mp4").unwrap(), 1.0);

        let mut advance = Timeline::new(&segments, CuePolicy::Advance);
        advance.advance("a.mp4").unwrap();
        assert_eq!(advance.advance("b.mp4").unwrap(), 1.0);

        let mut strict = Timeline::new(&segments, CuePolicy::Strict);
        strict.advance("a.mp4").unwrap();
        let err = strict.advance("a.mp4").unwrap_err();
        assert!(err.to_string().contains("no segments left"));
    }

    #[test]
    fn test_timelines_are_independent() {
        let segments = segments();
        let mut first = Timeline::new(&segments, CuePolicy::Strict);
        first.advance("a.mp4").unwrap();

        let second = Timeline::new(&segments, CuePolicy::Strict);
        assert_eq!(second.elapsed(), 0.0);
        assert_eq!(second.remaining().len(), 3);
    }
}
