//! Drum Machine Engine
//!
//! This module provides the trigger-dispatch and playback engine behind the
//! pad instrument. It is organized into sub-modules, each with a specific
//! responsibility:
//!
//! - [`audio_stream`]: CPAL audio stream management and real-time callback
//! - [`banks`]: static pad alphabet, bank mappings, and the label table
//! - [`channels`]: interleaved channel-layout adaptation
//! - [`constants`]: configuration constants and limits
//! - [`dispatcher`]: the pure trigger state machine
//! - [`errors`]: audio-specific error types
//! - [`flash`]: deferred reset of the transient pad flash
//! - [`mixer`]: real-time one-shot voice mixing
//! - [`sample_loader`]: audio file loading and decoding
//! - [`voice`]: voice slot lifecycle
//! - [`volume`]: stepped volume arithmetic
//!
//! The main [`DrumMachine`] struct wires these together into the high-level
//! interface the host UI drives.

use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread;

use crate::drum_machine::audio_stream::{AudioStreamHandle, create_audio_stream, start_stream};
use crate::drum_machine::banks::{PAD_ROWS, SampleId};
use crate::drum_machine::constants::{NUM_SAMPLES, VOLUME_MAX, VOLUME_MIN};
use crate::drum_machine::dispatcher::{Effect, EngineState, Outcome};
use crate::drum_machine::sample_loader::load_sample_file;
use crate::messages::{AudioMessage, ControlMessage, LoaderEvent, UiEvent};

mod audio_stream;
mod banks;
mod channels;
mod constants;
mod dispatcher;
mod errors;
mod flash;
mod mixer;
mod sample_loader;
mod voice;
mod volume;

/// DrumMachine is the engine the host UI drives: it owns the engine state,
/// the audio stream, and the event channels the host polls.
#[pyclass]
pub struct DrumMachine {
    state: Arc<Mutex<EngineState>>,
    stream_handle: Option<AudioStreamHandle>,
    loader_tx: Sender<LoaderEvent>,
    loader_rx: Mutex<Receiver<LoaderEvent>>,
    ui_tx: Sender<UiEvent>,
    ui_rx: Mutex<Receiver<UiEvent>>,
}

#[pymethods]
impl DrumMachine {
    /// Create a new DrumMachine with its initial state; no audio runs yet.
    #[new]
    pub fn new() -> PyResult<Self> {
        let (loader_tx, loader_rx) = std::sync::mpsc::channel();
        let (ui_tx, ui_rx) = std::sync::mpsc::channel();

        Ok(DrumMachine {
            state: Arc::new(Mutex::new(EngineState::new())),
            stream_handle: None,
            loader_tx,
            loader_rx: Mutex::new(loader_rx),
            ui_tx,
            ui_rx: Mutex::new(ui_rx),
        })
    }

    /// Initialize and run the audio engine.
    pub fn run(&mut self) -> PyResult<()> {
        if self.stream_handle.is_some() {
            return Err(PyRuntimeError::new_err("DrumMachine already running"));
        }

        match create_audio_stream() {
            Ok(handle) => {
                start_stream(&handle.stream).map_err(|e| {
                    PyRuntimeError::new_err(format!("Failed to start audio stream: {e}"))
                })?;
                self.stream_handle = Some(handle);
                Ok(())
            }
            Err(e) => Err(PyRuntimeError::new_err(format!(
                "Failed to create audio stream: {e}"
            ))),
        }
    }

    /// Shut down the audio engine, dropping any in-flight voices.
    pub fn shut_down(&mut self) -> PyResult<()> {
        self.stream_handle = None;
        Ok(())
    }

    /// Load an audio file into a sample slot on a background thread.
    pub fn load_sample_async(&self, id: usize, path: String) -> PyResult<()> {
        if id >= NUM_SAMPLES {
            return Err(PyValueError::new_err(format!(
                "id out of range (expected 0..{}, got {id})",
                NUM_SAMPLES - 1
            )));
        }

        let handle = self
            .stream_handle
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("Audio engine not initialized"))?;

        let loader_tx = self.loader_tx.clone();
        let producer = handle.producer.clone();
        let output_channels = handle.output_channels;
        let output_sample_rate = handle.output_sample_rate;

        thread::spawn(move || {
            let _ = loader_tx.send(LoaderEvent::Started { id });

            let sample =
                match load_sample_file(Path::new(&path), output_channels, output_sample_rate) {
                    Ok(sample) => sample,
                    Err(errors::SampleLoadError::Io(err))
                        if err.kind() == std::io::ErrorKind::NotFound =>
                    {
                        let _ = loader_tx.send(LoaderEvent::Error {
                            id,
                            error: format!("File not found: {path}"),
                        });
                        return;
                    }
                    Err(err) => {
                        let _ = loader_tx.send(LoaderEvent::Error {
                            id,
                            error: err.to_string(),
                        });
                        return;
                    }
                };

            let frames = sample.samples.len() / sample.channels;
            let duration_sec = frames as f32 / output_sample_rate as f32;

            let mut producer_guard = match producer.lock() {
                Ok(guard) => guard,
                Err(_) => {
                    let _ = loader_tx.send(LoaderEvent::Error {
                        id,
                        error: "Failed to acquire producer lock".to_string(),
                    });
                    return;
                }
            };

            if producer_guard
                .push(ControlMessage::LoadSample { id, sample })
                .is_err()
            {
                let _ = loader_tx.send(LoaderEvent::Error {
                    id,
                    error: "Failed to send LoadSample - buffer may be full".to_string(),
                });
                return;
            }

            let _ = loader_tx.send(LoaderEvent::Success { id, duration_sec });
        });

        Ok(())
    }

    /// Poll for pending background loader events.
    ///
    /// Returns `None` when no events are available.
    pub fn poll_loader_events(&self, py: Python<'_>) -> PyResult<Option<Py<PyAny>>> {
        let loader_rx = self
            .loader_rx
            .lock()
            .map_err(|_| PyRuntimeError::new_err("Failed to acquire loader receiver lock"))?;

        let event = match loader_rx.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => return Ok(None),
            Err(TryRecvError::Disconnected) => return Ok(None),
        };

        let dict = PyDict::new(py);
        match event {
            LoaderEvent::Started { id } => {
                dict.set_item("type", "started")?;
                dict.set_item("id", id)?;
            }
            LoaderEvent::Success { id, duration_sec } => {
                dict.set_item("type", "success")?;
                dict.set_item("id", id)?;
                dict.set_item("duration_sec", duration_sec)?;
            }
            LoaderEvent::Error { id, error } => {
                dict.set_item("type", "error")?;
                dict.set_item("id", id)?;
                dict.set_item("msg", error)?;
            }
        }

        Ok(Some(dict.into_any().unbind()))
    }

    /// Dispatch a host keyboard event.
    ///
    /// Single-character keys are uppercased and dispatched; named keys
    /// ("Shift", "Enter", ...) fall through the dispatcher as unmapped
    /// symbols and are ignored there.
    pub fn handle_key(&mut self, key: &str) -> PyResult<()> {
        let mut chars = key.chars();
        match (chars.next(), chars.next()) {
            (Some(symbol), None) => self.dispatch_trigger(symbol.to_ascii_uppercase()),
            _ => Ok(()),
        }
    }

    /// Dispatch a pointer press on a pad control. Same path as [`handle_key`].
    pub fn press_pad(&mut self, pad: &str) -> PyResult<()> {
        self.handle_key(pad)
    }

    /// Flip the power switch. Works with or without a running stream.
    pub fn toggle_power(&mut self) -> PyResult<()> {
        self.apply_control(dispatcher::toggle_power)
    }

    /// Flip the bank switch. Inert while power is off.
    pub fn toggle_bank(&mut self) -> PyResult<()> {
        self.apply_control(dispatcher::toggle_bank)
    }

    /// Absolute volume from the slider. Inert while power is off.
    pub fn set_volume(&mut self, volume: f32) -> PyResult<()> {
        if !volume.is_finite() || !(VOLUME_MIN..=VOLUME_MAX).contains(&volume) {
            return Err(PyValueError::new_err("volume out of range"));
        }

        self.apply_control(|state| dispatcher::set_volume(state, volume))
    }

    /// Poll for pending UI events (deferred flash clears).
    ///
    /// Returns `None` when no events are available.
    pub fn poll_ui_events(&self, py: Python<'_>) -> PyResult<Option<Py<PyAny>>> {
        let ui_rx = self
            .ui_rx
            .lock()
            .map_err(|_| PyRuntimeError::new_err("Failed to acquire UI receiver lock"))?;

        let event = match ui_rx.try_recv() {
            Ok(event) => event,
            Err(TryRecvError::Empty) => return Ok(None),
            Err(TryRecvError::Disconnected) => return Ok(None),
        };

        let dict = PyDict::new(py);
        match event {
            UiEvent::FlashCleared { pad } => {
                dict.set_item("type", "flash_cleared")?;
                dict.set_item("pad", pad.to_string())?;
            }
        }

        Ok(Some(dict.into_any().unbind()))
    }

    /// Send a ping message to the audio thread.
    pub fn ping(&mut self) -> PyResult<()> {
        let handle = self
            .stream_handle
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("Audio engine not initialized"))?;

        let mut producer_guard = handle
            .producer
            .lock()
            .map_err(|_| PyRuntimeError::new_err("Failed to acquire producer lock"))?;

        producer_guard
            .push(ControlMessage::Ping())
            .map_err(|_| PyRuntimeError::new_err("Failed to send Ping - buffer may be full"))
    }

    /// Receive a message from the audio thread.
    pub fn receive_msg(&mut self) -> PyResult<Option<AudioMessage>> {
        let handle = self
            .stream_handle
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("Audio engine not initialized"))?;

        let mut consumer_guard = handle
            .consumer
            .lock()
            .map_err(|_| PyRuntimeError::new_err("Failed to acquire consumer lock"))?;

        match consumer_guard.pop() {
            Ok(msg) => Ok(Some(msg)),
            Err(_) => Ok(None),
        }
    }

    /// Whether the power switch is on.
    pub fn power(&self) -> PyResult<bool> {
        Ok(self.state()?.power)
    }

    /// Active bank, "left" or "right".
    pub fn bank(&self) -> PyResult<String> {
        Ok(self.state()?.bank.as_str().to_string())
    }

    /// Current trigger volume on the 0.1 grid.
    pub fn volume(&self) -> PyResult<f32> {
        Ok(self.state()?.volume)
    }

    /// Pad currently showing its flash, if any.
    pub fn active_pad(&self) -> PyResult<Option<String>> {
        Ok(self.state()?.active_pad.map(|pad| pad.to_string()))
    }

    /// Text for the host's display region.
    pub fn display_text(&self) -> PyResult<String> {
        Ok(self.state()?.display_text)
    }

    /// The pad alphabet in its fixed 3x3 layout, for the host to build the
    /// grid from.
    #[staticmethod]
    pub fn pad_grid() -> Vec<Vec<String>> {
        PAD_ROWS
            .iter()
            .map(|row| row.iter().map(|pad| pad.to_string()).collect())
            .collect()
    }

    /// Number of sample slots the host should preload.
    #[staticmethod]
    pub fn sample_count() -> usize {
        NUM_SAMPLES
    }

    /// Display label of a sample slot.
    #[staticmethod]
    pub fn sample_label(id: usize) -> PyResult<String> {
        SampleId::from_index(id)
            .map(|sample| sample.label().to_string())
            .ok_or_else(|| PyValueError::new_err("id out of range"))
    }
}

impl DrumMachine {
    /// Run one trigger through the dispatcher and execute its effects.
    ///
    /// The state swap happens under the lock; effects run after it is
    /// released so the flash timer threads can take it themselves.
    fn dispatch_trigger(&mut self, symbol: char) -> PyResult<()> {
        let handle = self
            .stream_handle
            .as_ref()
            .ok_or_else(|| PyRuntimeError::new_err("Audio engine not initialized"))?;

        let effects = {
            let mut state_guard = self
                .state
                .lock()
                .map_err(|_| PyRuntimeError::new_err("Failed to acquire state lock"))?;
            let Outcome { state, effects } = dispatcher::handle_trigger(&state_guard, symbol);
            *state_guard = state;
            effects
        };

        for effect in effects {
            match effect {
                Effect::PlaySample { sample, volume } => {
                    let mut producer_guard = handle.producer.lock().map_err(|_| {
                        PyRuntimeError::new_err("Failed to acquire producer lock")
                    })?;
                    producer_guard
                        .push(ControlMessage::PlaySample {
                            id: sample.index(),
                            volume,
                        })
                        .map_err(|_| {
                            PyRuntimeError::new_err(
                                "Failed to send PlaySample - buffer may be full",
                            )
                        })?;
                }
                Effect::ScheduleFlashClear { seq } => {
                    flash::schedule_clear(Arc::clone(&self.state), self.ui_tx.clone(), seq);
                }
            }
        }

        Ok(())
    }

    /// Apply a pure control-surface operation to the state cell.
    fn apply_control(&mut self, op: impl FnOnce(&EngineState) -> Outcome) -> PyResult<()> {
        let mut state_guard = self
            .state
            .lock()
            .map_err(|_| PyRuntimeError::new_err("Failed to acquire state lock"))?;
        let Outcome { state, .. } = op(&state_guard);
        *state_guard = state;
        Ok(())
    }

    fn state(&self) -> PyResult<EngineState> {
        self.state
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| PyRuntimeError::new_err("Failed to acquire state lock"))
    }
}
