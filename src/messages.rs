//! Message definitions for communication between the host and the engine threads.
//!
//! [`ControlMessage`] and [`AudioMessage`] are the wire format for messages passed through
//! the ring buffers between the host thread and the real-time audio thread. [`LoaderEvent`]
//! and [`UiEvent`] travel over plain mpsc channels that the host drains by polling.

use pyo3::prelude::*;
use std::sync::Arc;

/// Pre-decoded immutable audio data, interleaved f32 at the output rate.
#[derive(Debug, Clone)]
pub(crate) struct SampleBuffer {
    pub channels: usize,
    pub samples: Arc<[f32]>,
}

/// Message that is emitted from the audio thread.
#[derive(Debug, Clone)]
#[pyclass]
pub enum AudioMessage {
    /// Response to a Ping message.
    Pong(),
}

/// Message that is sent from the host into the real-time audio thread.
#[derive(Debug, Clone)]
pub enum ControlMessage {
    /// Used for testing message passing functionality.
    Ping(),

    /// Publish a loaded sample into an audio-thread slot.
    ///
    /// # Parameters
    /// * `id` - Unique identifier for the sample slot (0..16)
    /// * `sample` - Pre-decoded immutable sample buffer (shared handle)
    LoadSample { id: usize, sample: SampleBuffer },

    /// Play a loaded sample once, on its own voice.
    ///
    /// # Parameters
    /// * `id` - Identifier of the sample to play
    /// * `volume` - Playback volume (0.0 to 1.0), captured at trigger time
    PlaySample { id: usize, volume: f32 },
}

/// Events emitted from background sample loading.
#[derive(Debug, Clone, PartialEq)]
pub enum LoaderEvent {
    /// Loading started for the given sample slot id.
    Started { id: usize },

    /// Loading completed and the sample was published to the audio thread.
    Success { id: usize, duration_sec: f32 },

    /// Loading failed.
    Error { id: usize, error: String },
}

/// Deferred UI state changes the host picks up by polling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    /// The transient flash on `pad` ran out and the pad went inactive.
    FlashCleared { pad: char },
}
