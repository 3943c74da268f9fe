//! In-memory accumulation unit for one batch window.
//!
//! A [`ContextChunk`] collects everything that arrived during a batch
//! interval: transcript deltas from the streaming pipeline and frame
//! descriptions posted by visual collaborators. At flush time it renders
//! into a single plain-text document with labelled sections.

use chrono::{DateTime, Utc};

/// One batch window of aggregated context.
#[derive(Debug, Clone)]
pub struct ContextChunk {
    /// Wall-clock moment the window opened (first append).
    pub start: DateTime<Utc>,
    /// Nominal end of the window (`start + batch_duration`).
    pub end: DateTime<Utc>,
    /// Transcript deltas, in arrival order.
    pub transcripts: Vec<String>,
    /// Frame descriptions, in arrival order.
    pub frame_descriptions: Vec<String>,
}

impl ContextChunk {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start,
            end,
            transcripts: Vec::new(),
            frame_descriptions: Vec::new(),
        }
    }

    /// True when nothing has been appended. Empty chunks are skipped at
    /// flush time rather than stored as blank documents.
    pub fn is_empty(&self) -> bool {
        self.transcripts.is_empty() && self.frame_descriptions.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 1000.0
    }

    /// Renders the chunk as a plain-text document. Sections are emitted
    /// only when non-empty, visual context first.
    pub fn combined_text(&self) -> String {
        let mut sections = Vec::with_capacity(2);
        if !self.frame_descriptions.is_empty() {
            sections.push(format!(
                "Visual Context:\n{}",
                self.frame_descriptions.join("\n")
            ));
        }
        if !self.transcripts.is_empty() {
            sections.push(format!("Audio Transcript:\n{}", self.transcripts.join("\n")));
        }
        sections.join("\n\n")
    }
}
