//! Silence-based auto-cut.
//!
//! Turns the silence intervals reported by audio analysis into the list of
//! spans worth keeping: the gaps between silences, padded on both sides so
//! speech is not clipped, with overlapping padded spans merged.

use cliptrim_common::SilenceSettings;
use cliptrim_edit_model::Segment;

/// Silence boundaries in stream order, in seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SilenceMarkers {
    pub starts: Vec<f64>,
    pub ends: Vec<f64>,
}

impl SilenceMarkers {
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }
}

/// Result of an auto-cut pass.
#[derive(Debug, Clone, PartialEq)]
pub enum SilenceOutcome {
    /// Spans to keep, in milliseconds, ready to replace the timeline.
    Segmented(Vec<Segment>),
    /// Analysis found no silence; the timeline should stay as is.
    NoSilenceFound,
    /// Everything was silence; nothing would be kept.
    NoSpeechFound,
}

/// Padding and minimum-span rules for auto-cut.
#[derive(Debug, Clone, Copy)]
pub struct SilenceSegmenter {
    /// Seconds added before and after each kept span.
    pub padding_s: f64,
    /// Candidate spans at or below this length (before padding) are dropped.
    pub min_span_s: f64,
}

impl Default for SilenceSegmenter {
    fn default() -> Self {
        Self {
            padding_s: 0.2,
            min_span_s: 0.1,
        }
    }
}

impl From<&SilenceSettings> for SilenceSegmenter {
    fn from(settings: &SilenceSettings) -> Self {
        Self {
            padding_s: settings.padding_s.max(0.0),
            min_span_s: settings.min_span_s.max(0.0),
        }
    }
}

impl SilenceSegmenter {
    /// Compute kept spans in seconds.
    ///
    /// For each silence start the span since the previous silence end is a
    /// candidate. The trailing span after the last matched silence end is
    /// considered too.
    pub fn kept_spans(&self, markers: &SilenceMarkers, total_s: f64) -> Vec<(f64, f64)> {
        let mut spans: Vec<(f64, f64)> = Vec::new();
        let mut last_end = 0.0_f64;

        for (i, &start) in markers.starts.iter().enumerate() {
            self.push_candidate(&mut spans, last_end, start, total_s);
            if let Some(&end) = markers.ends.get(i) {
                last_end = end.max(0.0);
            }
        }

        if total_s - last_end > self.min_span_s {
            self.push_candidate(&mut spans, last_end, total_s, total_s);
        }
        spans
    }

    fn push_candidate(&self, spans: &mut Vec<(f64, f64)>, start: f64, end: f64, total_s: f64) {
        if end - start <= self.min_span_s {
            return;
        }
        let padded_start = (start - self.padding_s).max(0.0);
        let padded_end = (end + self.padding_s).min(total_s);

        match spans.last_mut() {
            Some(prev) if padded_start < prev.1 => {
                prev.1 = prev.1.max(padded_end);
            }
            _ => spans.push((padded_start, padded_end)),
        }
    }

    /// Run the full pass and convert to millisecond segments.
    pub fn segment(&self, markers: &SilenceMarkers, total_s: f64) -> SilenceOutcome {
        if markers.is_empty() {
            return SilenceOutcome::NoSilenceFound;
        }

        let total_ms = (total_s * 1000.0).round() as i64;
        let segments: Vec<Segment> = self
            .kept_spans(markers, total_s)
            .into_iter()
            .map(|(s, e)| {
                let start = ((s * 1000.0).round() as i64).clamp(0, total_ms);
                let end = ((e * 1000.0).round() as i64).clamp(0, total_ms);
                (start, end)
            })
            .filter(|(s, e)| s < e)
            .map(|(s, e)| Segment::new(s, e))
            .collect();

        tracing::debug!(
            silences = markers.starts.len(),
            kept = segments.len(),
            "Computed auto-cut spans"
        );

        if segments.is_empty() {
            SilenceOutcome::NoSpeechFound
        } else {
            SilenceOutcome::Segmented(segments)
        }
    }
}

/// Extract `silence_start:` / `silence_end:` values from `silencedetect`
/// log output.
pub fn parse_silence_markers(text: &str) -> SilenceMarkers {
    let mut markers = SilenceMarkers::default();
    for line in text.lines() {
        if let Some(v) = value_after(line, "silence_start:") {
            markers.starts.push(v);
        }
        if let Some(v) = value_after(line, "silence_end:") {
            markers.ends.push(v);
        }
    }
    markers
}

fn value_after(line: &str, key: &str) -> Option<f64> {
    let rest = &line[line.find(key)? + key.len()..];
    rest.split(|c: char| c.is_whitespace() || c == '|')
        .find(|token| !token.is_empty())?
        .parse()
        .ok()
}
