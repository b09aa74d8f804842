//! Progress from ffmpeg's `-progress` key/value stream.

/// Final state of an export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportOutcome {
    Completed,
    Failed { last_percent: u8 },
}

impl ExportOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ExportOutcome::Completed)
    }
}

/// Turns progress chunks into a monotonic 0..=100 percentage.
///
/// Completion is decided only by the process exit status passed to
/// [`ProgressTracker::finish`], never by the last parsed value.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    expected_ms: i64,
    percent: u8,
    complete: bool,
}

impl ProgressTracker {
    pub fn new(expected_ms: i64) -> Self {
        Self {
            expected_ms: expected_ms.max(1),
            percent: 0,
            complete: false,
        }
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Whether ffmpeg reported `progress=end`. Informational only.
    pub fn saw_end(&self) -> bool {
        self.complete
    }

    /// Feed one chunk of output. Returns the updated percentage, or `None`
    /// if the chunk carried no elapsed-time marker.
    pub fn feed(&mut self, chunk: &str) -> Option<u8> {
        let mut elapsed_us = None;
        for line in chunk.lines() {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            match key {
                // out_time_ms is also microseconds, a long-standing ffmpeg quirk.
                "out_time_us" | "out_time_ms" => {
                    if let Ok(us) = value.trim().parse::<i64>() {
                        elapsed_us = Some(us);
                    }
                }
                "progress" => self.complete = value.trim() == "end",
                _ => {}
            }
        }

        let elapsed_ms = elapsed_us? / 1000;
        let raw = (elapsed_ms as f64 / self.expected_ms as f64 * 100.0).clamp(0.0, 100.0);
        self.percent = self.percent.max(raw as u8);
        Some(self.percent)
    }

    /// Close the run with the process exit status.
    pub fn finish(&mut self, exit_success: bool) -> ExportOutcome {
        if exit_success {
            self.percent = 100;
            ExportOutcome::Completed
        } else {
            ExportOutcome::Failed {
                last_percent: self.percent,
            }
        }
    }
}
