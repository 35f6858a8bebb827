//! Audio file loading and decoding.
//!
//! Loading runs on a background thread per request: symphonia decodes the
//! file to interleaved f32, rubato resamples to the device rate when the file
//! rate differs, and the channel layout is adapted to the output stream.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use audioadapter_buffers::direct::InterleavedSlice;
use rubato::{
    Async, FixedAsync, Resampler, SincInterpolationParameters, SincInterpolationType,
    WindowFunction,
};
use symphonia::core::{
    audio::SampleBuffer as SymphoniaSampleBuffer, codecs::DecoderOptions,
    errors::Error as SymphoniaError, formats::FormatOptions, io::MediaSourceStream,
    meta::MetadataOptions, probe::Hint,
};
use symphonia::default::{get_codecs, get_probe};

use crate::drum_machine::channels::adapt_channels;
use crate::drum_machine::errors::SampleLoadError;
use crate::messages::SampleBuffer;

/// Frames fed to the resampler per chunk.
const RESAMPLE_CHUNK_FRAMES: usize = 1024;

/// Sinc length of the resampler. Drum hits are short; a mid-length kernel
/// keeps load latency low without audible cost.
const RESAMPLE_SINC_LEN: usize = 128;

/// Decodes an audio file into a sample buffer with the specified output
/// configuration.
///
/// The file is decoded in full, resampled to `output_rate_hz` when its own
/// rate differs, and channel-mapped to `output_channels`.
///
/// # Errors
///
/// Fails when the file cannot be opened, its format is not recognized or
/// corrupt, the resampler rejects it, or its channel layout has no supported
/// mapping to the output layout.
pub fn load_sample_file(
    path: &Path,
    output_channels: usize,
    output_rate_hz: u32,
) -> Result<SampleBuffer, SampleLoadError> {
    let file = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or(SampleLoadError::NoDefaultTrack)?;
    let file_rate_hz = track
        .codec_params
        .sample_rate
        .ok_or(SampleLoadError::MissingSampleRate)?;
    let file_channels = track
        .codec_params
        .channels
        .ok_or(SampleLoadError::MissingChannels)?
        .count();

    let mut decoder = get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut decoded: Vec<f32> = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(err) => return Err(SampleLoadError::Decode(err)),
        };

        let audio_buf = decoder.decode(&packet)?;
        let spec = *audio_buf.spec();
        let duration = audio_buf.capacity() as u64;

        let mut sample_buf = SymphoniaSampleBuffer::<f32>::new(duration, spec);
        sample_buf.copy_interleaved_ref(audio_buf);
        decoded.extend_from_slice(sample_buf.samples());
    }

    let resampled = resample(decoded, file_channels, file_rate_hz, output_rate_hz)?;
    let mapped = adapt_channels(resampled, file_channels, output_channels)?;

    Ok(SampleBuffer {
        channels: output_channels,
        samples: Arc::from(mapped.into_boxed_slice()),
    })
}

/// Resample interleaved audio to the output rate.
///
/// Pass-through when the rates already match. Otherwise the buffer runs
/// through a fixed-input sinc resampler in whole chunks, with the tail
/// zero-padded up to the chunk boundary.
fn resample(
    samples: Vec<f32>,
    channels: usize,
    file_rate_hz: u32,
    output_rate_hz: u32,
) -> Result<Vec<f32>, SampleLoadError> {
    if file_rate_hz == output_rate_hz || samples.is_empty() || channels == 0 {
        return Ok(samples);
    }

    let params = SincInterpolationParameters {
        sinc_len: RESAMPLE_SINC_LEN,
        f_cutoff: 0.95,
        oversampling_factor: 128,
        interpolation: SincInterpolationType::Linear,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = f64::from(output_rate_hz) / f64::from(file_rate_hz);
    let mut resampler = Async::<f32>::new_sinc(
        ratio,
        2.0,
        &params,
        RESAMPLE_CHUNK_FRAMES,
        channels,
        FixedAsync::Input,
    )?;

    let chunk_len = RESAMPLE_CHUNK_FRAMES * channels;
    let mut padded = samples;
    let partial = padded.len() % chunk_len;
    if partial != 0 {
        padded.resize(padded.len() + chunk_len - partial, 0.0);
    }

    let mut out: Vec<f32> = Vec::with_capacity((padded.len() as f64 * ratio) as usize + chunk_len);
    for chunk in padded.chunks_exact(chunk_len) {
        let input = InterleavedSlice::new(chunk, channels, RESAMPLE_CHUNK_FRAMES)
            .map_err(|e| SampleLoadError::BufferLayout(e.to_string()))?;
        let processed = resampler.process(&input, 0, None)?;
        out.extend_from_slice(&processed.take_data());
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// Helper function to create a PCM16 WAV file for testing.
    fn write_pcm16_wav(
        path: &Path,
        channels: u16,
        sample_rate_hz: u32,
        samples: &[i16],
    ) -> std::io::Result<()> {
        let bits_per_sample = 16u16;
        let block_align = channels * (bits_per_sample / 8);
        let byte_rate = sample_rate_hz * u32::from(block_align);
        let data_len_bytes = u32::try_from(samples.len() * 2).expect("sample data too large");
        let chunk_size = 36 + data_len_bytes;

        let mut file = File::create(path)?;
        file.write_all(b"RIFF")?;
        file.write_all(&chunk_size.to_le_bytes())?;
        file.write_all(b"WAVE")?;

        file.write_all(b"fmt ")?;
        file.write_all(&16u32.to_le_bytes())?;
        file.write_all(&1u16.to_le_bytes())?; // PCM
        file.write_all(&channels.to_le_bytes())?;
        file.write_all(&sample_rate_hz.to_le_bytes())?;
        file.write_all(&byte_rate.to_le_bytes())?;
        file.write_all(&block_align.to_le_bytes())?;
        file.write_all(&bits_per_sample.to_le_bytes())?;

        file.write_all(b"data")?;
        file.write_all(&data_len_bytes.to_le_bytes())?;
        for sample in samples {
            file.write_all(&sample.to_le_bytes())?;
        }

        Ok(())
    }

    #[test]
    fn test_decode_wav_to_f32_buffer() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hit.wav");

        let samples = [0i16, 16_384i16, -16_384i16, 32_767i16];
        write_pcm16_wav(&path, 1, 44_100, &samples).unwrap();

        let decoded = load_sample_file(&path, 1, 44_100).unwrap();
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), samples.len());
        assert!(decoded.samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn test_decode_maps_mono_file_to_stereo_output() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("hit.wav");

        let samples = [0i16, 16_384i16, -16_384i16];
        write_pcm16_wav(&path, 1, 44_100, &samples).unwrap();

        let decoded = load_sample_file(&path, 2, 44_100).unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples.len(), samples.len() * 2);

        for frame in decoded.samples.chunks_exact(2) {
            assert!((frame[0] - frame[1]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_decode_missing_file_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nonexistent.wav");

        let result = load_sample_file(&path, 1, 44_100);
        assert!(matches!(result, Err(SampleLoadError::Io(_))));
    }

    #[test]
    fn test_resample_passes_matching_rates_through() {
        let input = vec![0.25; 300];
        let output = resample(input.clone(), 1, 48_000, 48_000).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_resample_scales_frame_count_by_rate_ratio() {
        // Half a second of a quiet DC offset, mono.
        let input = vec![0.1; 22_050];
        let input_frames = input.len();

        let output = resample(input, 1, 44_100, 88_200).unwrap();

        // Input is padded to the chunk boundary; output lands near twice the
        // padded length, short of it only by the resampler's startup latency.
        let padded_frames = input_frames.div_ceil(RESAMPLE_CHUNK_FRAMES) * RESAMPLE_CHUNK_FRAMES;
        let expected = padded_frames * 2;
        let lower = expected * 9 / 10;
        assert!(
            (lower..=expected + RESAMPLE_CHUNK_FRAMES).contains(&output.len()),
            "expected roughly {expected} frames, got {}",
            output.len()
        );
    }

    #[test]
    fn test_resample_preserves_channel_interleaving_length() {
        let input = vec![0.1; 4096 * 2];
        let output = resample(input, 2, 48_000, 44_100).unwrap();
        assert_eq!(output.len() % 2, 0);
    }
}
