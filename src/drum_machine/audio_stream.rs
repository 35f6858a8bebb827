//! CPAL stream management and the real-time callback.
//!
//! The callback owns the [`PadMixer`] outright; the host reaches it only
//! through the lock-free control ring. Each callback drains pending control
//! messages, then renders the active voices into the output buffer.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Stream, StreamConfig};
use env_logger::{Builder, Env};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::{Arc, Mutex};

use crate::drum_machine::constants::RING_CAPACITY;
use crate::drum_machine::mixer::PadMixer;
use crate::messages::{AudioMessage, ControlMessage};

/// Handle to the audio stream with associated message channels.
pub struct AudioStreamHandle {
    pub stream: Stream,
    pub producer: Arc<Mutex<Producer<ControlMessage>>>,
    pub consumer: Arc<Mutex<Consumer<AudioMessage>>>,
    pub output_channels: usize,
    pub output_sample_rate: u32,
}

/// Setup and configure the logger for audio operations.
pub fn setup_logger() {
    // Default to `info`; override via `RUST_LOG`, e.g. `RUST_LOG=debug`.
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init()
        .unwrap_or(()); // Ignore initialization errors
}

/// Create and configure the audio stream.
///
/// Opens the default output device, allocates the control/status rings, and
/// builds the output stream around a fresh mixer.
pub fn create_audio_stream() -> Result<AudioStreamHandle, Box<dyn std::error::Error>> {
    setup_logger();

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or("No audio device found")?;

    let config = device.default_output_config()?;
    let sample_rate = config.sample_rate();
    let channels = config.channels();

    log::info!(
        "Starting pad engine... ({} ch@{} Hz)",
        channels,
        sample_rate
    );

    // Ring buffer for incoming messages (host -> audio thread)
    let (producer_in, mut consumer_in) = RingBuffer::new(RING_CAPACITY);

    // Ring buffer for outgoing messages (audio thread -> host)
    let (mut producer_out, consumer_out) = RingBuffer::new(RING_CAPACITY);

    let mut mixer = PadMixer::new(channels as usize);

    let stream_config = StreamConfig {
        channels,
        sample_rate,
        buffer_size: BufferSize::Fixed(512),
    };

    let stream = device.build_output_stream(
        &stream_config,
        move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
            // Process incoming messages in real-time
            while let Ok(message) = consumer_in.pop() {
                match message {
                    ControlMessage::Ping() => {
                        let _ = producer_out.push(AudioMessage::Pong());
                    }
                    ControlMessage::LoadSample { id, sample } => {
                        mixer.load_sample(id, sample);
                    }
                    ControlMessage::PlaySample { id, volume } => {
                        mixer.play_sample(id, volume);
                    }
                }
            }

            // Render audio
            mixer.render(data);
        },
        |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    )?;

    Ok(AudioStreamHandle {
        stream,
        producer: Arc::new(Mutex::new(producer_in)),
        consumer: Arc::new(Mutex::new(consumer_out)),
        output_channels: channels as usize,
        output_sample_rate: sample_rate,
    })
}

/// Start playing the audio stream.
pub fn start_stream(stream: &Stream) -> Result<(), Box<dyn std::error::Error>> {
    stream.play()?;
    Ok(())
}
