use pyo3::pymodule;

mod drum_machine;
mod messages;

/// The Python module implemented in Rust.
#[pymodule]
mod beatpad_audio {
    #[pymodule_export]
    use super::drum_machine::DrumMachine;

    #[pymodule_export]
    use super::messages::AudioMessage;
}
