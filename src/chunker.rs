//! Chunk orchestrator: splits a script into bounded segments and reassembles
//! per-segment synthesis output into one ordered audio artifact.
//!
//! Segment boundaries prefer a sentence terminator when one falls within the
//! configured tolerance of the length limit; otherwise the split lands at the
//! limit. Synthesis runs strictly in segment order, so the merged audio
//! preserves narrative order no matter what the synthesis backend does
//! internally. A segment that keeps failing after retries aborts the whole
//! call: partial audio is never emitted as if it were complete.

use tracing::{debug, info};

use crate::contract::SpeechSynthesizer;
use crate::error::SynthesisError;
use crate::retry::RetryPolicy;

/// One merged audio blob for a whole script.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    pub bytes: Vec<u8>,
    pub chunk_count: usize,
}

/// Lazy iterator over the bounded segments of a script. Each yielded segment
/// holds at most `max_chars` characters; concatenating all segments
/// reproduces the script up to whitespace normalization.
pub struct ScriptSegments<'a> {
    rest: &'a str,
    max_chars: usize,
    boundary_tolerance: usize,
}

/// Split `script` into segments of at most `max_chars` characters.
pub fn segments(script: &str, max_chars: usize, boundary_tolerance: usize) -> ScriptSegments<'_> {
    ScriptSegments {
        rest: script,
        max_chars: max_chars.max(1),
        boundary_tolerance,
    }
}

impl<'a> Iterator for ScriptSegments<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            self.rest = "";
            return None;
        }
        // Byte offset of the first character past the limit, if any.
        let limit = match rest.char_indices().nth(self.max_chars) {
            None => {
                self.rest = "";
                return Some(rest.trim_end());
            }
            Some((offset, _)) => offset,
        };
        let head = &rest[..limit];
        let split = sentence_split(head, rest, self.boundary_tolerance).unwrap_or(limit);
        self.rest = &rest[split..];
        Some(rest[..split].trim_end())
    }
}

/// Byte offset just past the last sentence terminator within `tolerance`
/// characters of the end of `head`, provided the terminator is followed by
/// whitespace in the full text (so "3.14" never splits).
fn sentence_split(head: &str, rest: &str, tolerance: usize) -> Option<usize> {
    let mut distance = 0;
    for (i, c) in head.char_indices().rev() {
        if distance > tolerance {
            return None;
        }
        if matches!(c, '.' | '!' | '?') {
            let after = i + c.len_utf8();
            let next = rest[after..].chars().next();
            if next.is_none_or(char::is_whitespace) {
                return Some(after);
            }
        }
        distance += 1;
    }
    None
}

/// Drives per-segment synthesis and concatenation for one script.
pub struct ChunkOrchestrator<'a> {
    synthesizer: &'a dyn SpeechSynthesizer,
    retry: RetryPolicy,
    max_chunk_chars: usize,
    boundary_tolerance: usize,
}

impl<'a> ChunkOrchestrator<'a> {
    pub fn new(
        synthesizer: &'a dyn SpeechSynthesizer,
        retry: RetryPolicy,
        max_chunk_chars: usize,
        boundary_tolerance: usize,
    ) -> Self {
        ChunkOrchestrator {
            synthesizer,
            retry,
            max_chunk_chars,
            boundary_tolerance,
        }
    }

    /// Synthesize the whole script into one ordered artifact.
    pub async fn synthesize(&self, script: &str) -> Result<AudioArtifact, SynthesisError> {
        if script.trim().is_empty() {
            return Err(SynthesisError::EmptyScript);
        }
        let segments: Vec<&str> =
            segments(script, self.max_chunk_chars, self.boundary_tolerance).collect();
        let total = segments.len();
        info!(chunks = total, script_chars = script.len(), "synthesizing script");

        let mut bytes = Vec::new();
        for (i, segment) in segments.iter().enumerate() {
            let audio = self
                .retry
                .run("synthesize_chunk", || {
                    self.synthesizer.synthesize_chunk(segment)
                })
                .await
                .map_err(|e| SynthesisError::ChunkFailed {
                    index: i + 1,
                    total,
                    attempts: self.retry.max_attempts,
                    source: Box::new(e),
                })?;
            debug!(chunk = i + 1, total, bytes = audio.len(), "chunk synthesized");
            bytes.extend_from_slice(&audio);
        }
        Ok(AudioArtifact {
            bytes,
            chunk_count: total,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::MockSpeechSynthesizer;
    use std::time::Duration;

    fn normalized(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn every_segment_is_within_the_limit() {
        let script = "One sentence here. Another sentence follows. And a third one. \
                      Then we keep talking for quite a while without stopping because \
                      the narration is long. Finally it ends."
            .repeat(5);
        for max in [20, 47, 80, 200] {
            for segment in segments(&script, max, 10) {
                assert!(
                    segment.chars().count() <= max,
                    "segment of {} chars exceeds limit {}",
                    segment.chars().count(),
                    max
                );
            }
        }
    }

    #[test]
    fn concatenation_is_lossless_modulo_whitespace() {
        let script = "First sentence. Second sentence is a bit longer! Third? \
                      Fourth sentence closes the paragraph.";
        let joined = segments(script, 30, 10).collect::<Vec<_>>().join(" ");
        assert_eq!(normalized(&joined), normalized(script));
    }

    #[test]
    fn prefers_sentence_boundaries_within_tolerance() {
        let script = "Short intro. Now a much longer second sentence that flows on.";
        let segs: Vec<&str> = segments(script, 20, 10).collect();
        assert_eq!(segs[0], "Short intro.");
    }

    #[test]
    fn splits_at_limit_when_no_boundary_is_near() {
        let script = "abcdefghij".repeat(3);
        let segs: Vec<&str> = segments(&script, 10, 3).collect();
        assert_eq!(segs, vec!["abcdefghij"; 3]);
    }

    #[test]
    fn decimal_points_do_not_split_sentences() {
        let script = "The value was 3.14159 in the end and the story continued onward.";
        for segment in segments(script, 20, 8) {
            assert!(!segment.ends_with("3."), "split inside a number: {segment:?}");
        }
    }

    #[test]
    fn short_script_yields_a_single_segment() {
        let segs: Vec<&str> = segments("Just one short line.", 4500, 500).collect();
        assert_eq!(segs, vec!["Just one short line."]);
    }

    #[tokio::test]
    async fn merged_audio_preserves_segment_order() {
        let mut synth = MockSpeechSynthesizer::new();
        synth
            .expect_synthesize_chunk()
            .returning(|text| Ok(format!("<{text}>").into_bytes()));

        let script = "Alpha sentence one. Beta sentence two. Gamma sentence three.";
        let retry = RetryPolicy::new(2, Duration::from_millis(1));
        let orchestrator = ChunkOrchestrator::new(&synth, retry, 25, 10);
        let artifact = orchestrator.synthesize(script).await.unwrap();

        let expected: Vec<u8> = segments(script, 25, 10)
            .flat_map(|s| format!("<{s}>").into_bytes())
            .collect();
        assert_eq!(artifact.bytes, expected);
        assert_eq!(artifact.chunk_count, 3);
    }

    #[tokio::test]
    async fn short_script_makes_exactly_one_synthesis_call() {
        let mut synth = MockSpeechSynthesizer::new();
        synth
            .expect_synthesize_chunk()
            .times(1)
            .returning(|_| Ok(vec![1, 2, 3]));

        let orchestrator =
            ChunkOrchestrator::new(&synth, RetryPolicy::default(), 4500, 500);
        let artifact = orchestrator.synthesize("Tiny script.").await.unwrap();
        assert_eq!(artifact.chunk_count, 1);
        assert_eq!(artifact.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn empty_script_is_an_error_not_an_empty_artifact() {
        let synth = MockSpeechSynthesizer::new();
        let orchestrator =
            ChunkOrchestrator::new(&synth, RetryPolicy::default(), 4500, 500);
        let err = orchestrator.synthesize("   \n ").await.unwrap_err();
        assert!(matches!(err, SynthesisError::EmptyScript));
    }

    #[tokio::test]
    async fn failing_chunk_aborts_with_chunk_failure_after_retries() {
        let mut synth = MockSpeechSynthesizer::new();
        synth.expect_synthesize_chunk().returning(|text| {
            if text.starts_with("Beta") {
                Err(SynthesisError::Request("backend down".into()))
            } else {
                Ok(vec![0])
            }
        });

        let script = "Alpha sentence one. Beta sentence two. Gamma sentence three.";
        let retry = RetryPolicy::new(3, Duration::from_millis(1));
        let orchestrator = ChunkOrchestrator::new(&synth, retry, 25, 10);
        let err = orchestrator.synthesize(script).await.unwrap_err();
        match err {
            SynthesisError::ChunkFailed {
                index,
                total,
                attempts,
                ..
            } => {
                assert_eq!(index, 2);
                assert_eq!(total, 3);
                assert_eq!(attempts, 3);
            }
            other => panic!("expected ChunkFailed, got {other:?}"),
        }
    }
}
