//! Real-time pad mixer.
//!
//! Holds the sixteen-slot sample bank and a pool of one-shot voices, and runs
//! inside the cpal callback. Every operation here must stay non-blocking and
//! allocation-free, so invalid input is dropped silently instead of being
//! signalled.

use cpal::Sample;

use crate::drum_machine::constants::{MAX_VOICES, NUM_SAMPLES, VOLUME_MAX, VOLUME_MIN};
use crate::drum_machine::voice::VoiceSlot;
use crate::messages::SampleBuffer;

/// Real-time mixer for one-shot drum hits.
pub struct PadMixer {
    /// Number of output channels (1 for mono, 2 for stereo).
    channels: usize,

    /// Sample storage with NUM_SAMPLES slots.
    sample_bank: [Option<SampleBuffer>; NUM_SAMPLES],

    /// Voice pool with MAX_VOICES slots.
    voices: [VoiceSlot; MAX_VOICES],
}

impl PadMixer {
    pub fn new(channels: usize) -> Self {
        Self {
            channels,
            sample_bank: std::array::from_fn(|_| None),
            voices: std::array::from_fn(|_| VoiceSlot::default()),
        }
    }

    /// Publish a decoded sample into a bank slot.
    ///
    /// The buffer must match the mixer's channel count. Mismatches and
    /// out-of-range ids are dropped.
    pub fn load_sample(&mut self, id: usize, sample: SampleBuffer) {
        if id >= NUM_SAMPLES || sample.channels != self.channels {
            return;
        }

        self.sample_bank[id] = Some(sample);
    }

    /// Start one voice for a loaded sample.
    ///
    /// Overlapping voices for the same sample are the normal case; each plays
    /// its own run over the shared buffer to the end. With every slot busy the
    /// request is dropped, never queued.
    pub fn play_sample(&mut self, id: usize, volume: f32) {
        if id >= NUM_SAMPLES {
            return;
        }

        if !volume.is_finite() || !(VOLUME_MIN..=VOLUME_MAX).contains(&volume) {
            return;
        }

        let Some(sample) = self.sample_bank[id].as_ref() else {
            return;
        };
        let sample = sample.clone();

        for slot in &mut self.voices {
            if !slot.active {
                slot.start(id, sample, volume);
                return;
            }
        }
    }

    /// Mix all active voices into `output` (interleaved, `channels` per frame).
    ///
    /// Voices are one-shot: a slot frees itself once its final frame has been
    /// rendered, so a finished hit never wraps around.
    pub fn render(&mut self, output: &mut [f32]) {
        output.fill(Sample::EQUILIBRIUM);

        if self.channels == 0 {
            return;
        }

        let frames = output.len() / self.channels;
        if frames == 0 {
            return;
        }

        for voice in &mut self.voices {
            if !voice.active {
                continue;
            }

            let Some(sample) = voice.sample.clone() else {
                voice.stop();
                continue;
            };

            let sample_frames = sample.samples.len() / self.channels;
            if voice.frame_pos >= sample_frames {
                voice.stop();
                continue;
            }

            let take = frames.min(sample_frames - voice.frame_pos);
            for frame in 0..take {
                let src_base = (voice.frame_pos + frame) * self.channels;
                let out_base = frame * self.channels;
                for channel in 0..self.channels {
                    output[out_base + channel] +=
                        sample.samples[src_base + channel] * voice.volume;
                }
            }

            voice.frame_pos += take;
            if voice.frame_pos >= sample_frames {
                voice.stop();
            }
        }
    }

    /// Gets the number of channels configured for this mixer.
    pub fn channels(&self) -> usize {
        self.channels
    }
}
