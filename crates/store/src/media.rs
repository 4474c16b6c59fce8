//! Pack media buffers
//!
//! A pack holds at most one text buffer and one audio buffer. Annotation
//! spans index into them:
//! - text spans are byte offsets and must fall on UTF-8 character boundaries
//! - audio spans are sample offsets
//!
//! Buffers are reference counted so payload entries can share them without
//! copying.

use ontopack_core::{InstanceError, InstanceResult, Modality, Span};
use std::sync::Arc;

/// Audio samples with their sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioBuffer {
    /// Wrap samples recorded at `sample_rate` Hz
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Raw samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Samples per second
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether there are no samples
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds, zero when the sample rate is zero
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// Shared handle to one media buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Media {
    /// Text buffer
    Text(Arc<str>),
    /// Audio buffer
    Audio(Arc<AudioBuffer>),
}

impl Media {
    /// Modality of this buffer
    pub fn modality(&self) -> Modality {
        match self {
            Media::Text(_) => Modality::Text,
            Media::Audio(_) => Modality::Audio,
        }
    }

    /// Text content, if this is a text buffer
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Media::Text(t) => Some(t),
            Media::Audio(_) => None,
        }
    }

    /// Audio content, if this is an audio buffer
    pub fn as_audio(&self) -> Option<&AudioBuffer> {
        match self {
            Media::Audio(a) => Some(a),
            Media::Text(_) => None,
        }
    }

    /// Length in span units (bytes or samples)
    pub fn len(&self) -> usize {
        match self {
            Media::Text(t) => t.len(),
            Media::Audio(a) => a.len(),
        }
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether two handles share the same allocation
    pub fn same_buffer(&self, other: &Media) -> bool {
        match (self, other) {
            (Media::Text(a), Media::Text(b)) => Arc::ptr_eq(a, b),
            (Media::Audio(a), Media::Audio(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// The buffers owned by one pack
#[derive(Debug, Clone, Default)]
pub(crate) struct MediaBuffers {
    text: Option<Arc<str>>,
    audio: Option<Arc<AudioBuffer>>,
}

impl MediaBuffers {
    pub(crate) fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub(crate) fn audio(&self) -> Option<&AudioBuffer> {
        self.audio.as_deref()
    }

    pub(crate) fn set_text(&mut self, text: Arc<str>) {
        self.text = Some(text);
    }

    pub(crate) fn set_audio(&mut self, audio: Arc<AudioBuffer>) {
        self.audio = Some(audio);
    }

    /// Shared handle for `modality`, `None` if no buffer is loaded
    pub(crate) fn handle(&self, modality: Modality) -> Option<Media> {
        match modality {
            Modality::Text => self.text.clone().map(Media::Text),
            Modality::Audio => self.audio.clone().map(Media::Audio),
        }
    }

    /// Span units available for `modality`; zero without a buffer
    pub(crate) fn len(&self, modality: Modality) -> usize {
        match modality {
            Modality::Text => self.text.as_ref().map_or(0, |t| t.len()),
            Modality::Audio => self.audio.as_ref().map_or(0, |a| a.len()),
        }
    }

    pub(crate) fn check_span(&self, span: Span, modality: Modality) -> InstanceResult<()> {
        check_span_in(span, modality, self.len(modality), self.text())
    }
}

/// Validate `span` against a buffer of `buffer_len` units
///
/// `text` is consulted for character boundaries when the modality is text.
pub(crate) fn check_span_in(
    span: Span,
    modality: Modality,
    buffer_len: usize,
    text: Option<&str>,
) -> InstanceResult<()> {
    let on_boundary = match (modality, text) {
        (Modality::Text, Some(t)) => t.is_char_boundary(span.begin) && t.is_char_boundary(span.end),
        _ => true,
    };
    if span.is_well_formed() && span.end <= buffer_len && on_boundary {
        Ok(())
    } else {
        Err(InstanceError::InvalidSpan {
            span,
            modality,
            buffer_len,
        })
    }
}
