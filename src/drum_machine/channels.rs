//! Interleaved channel-layout adaptation.

use crate::drum_machine::errors::SampleLoadError;

/// Adapt interleaved samples from the file's channel layout to the output
/// stream's.
///
/// Matching layouts pass through untouched; mono fans out to both stereo
/// channels; stereo folds down by averaging each frame. Anything else is
/// rejected.
pub fn adapt_channels(
    samples: Vec<f32>,
    file_channels: usize,
    output_channels: usize,
) -> Result<Vec<f32>, SampleLoadError> {
    match (file_channels, output_channels) {
        _ if file_channels == output_channels => Ok(samples),
        (1, 2) => Ok(samples.iter().flat_map(|&s| [s, s]).collect()),
        (2, 1) => Ok(samples
            .chunks_exact(2)
            .map(|frame| (frame[0] + frame[1]) * 0.5)
            .collect()),
        _ => Err(SampleLoadError::UnsupportedChannels {
            file_channels,
            output_channels,
        }),
    }
}
