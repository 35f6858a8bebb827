//! Voice slots for the polyphonic pad mixer.

use crate::messages::SampleBuffer;

/// One polyphonic voice: a single in-flight playback of a sample.
///
/// Slots are pooled by the mixer. `start` claims a free slot, and the slot
/// releases itself once its final frame has been rendered. The volume is
/// captured at trigger time and never changes for the life of the voice.
#[derive(Debug, Default)]
pub struct VoiceSlot {
    pub active: bool,
    pub sample_id: usize,
    pub sample: Option<SampleBuffer>,
    pub frame_pos: usize,
    pub volume: f32,
}

impl VoiceSlot {
    pub fn start(&mut self, sample_id: usize, sample: SampleBuffer, volume: f32) {
        self.active = true;
        self.sample_id = sample_id;
        self.sample = Some(sample);
        self.frame_pos = 0;
        self.volume = volume;
    }

    pub fn stop(&mut self) {
        self.active = false;
        self.sample = None;
        self.frame_pos = 0;
        self.volume = 0.0;
    }
}
