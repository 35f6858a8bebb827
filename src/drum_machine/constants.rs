//! Engine configuration constants and limits.

/// Number of sound banks.
pub const NUM_BANKS: usize = 2;

/// Size of the pad grid (GRID_SIZE x GRID_SIZE).
pub const GRID_SIZE: usize = 3;

/// Total number of pads in the grid.
pub const NUM_PADS: usize = GRID_SIZE.pow(2);

/// Total number of unique samples across all banks.
pub const NUM_SAMPLES: usize = 16;

/// Maximum number of voices that can be active simultaneously.
pub const MAX_VOICES: usize = 32;

/// Minimum volume level (silence).
pub const VOLUME_MIN: f32 = 0.0;

/// Maximum volume level (100%).
pub const VOLUME_MAX: f32 = 1.0;

/// Step size of the volume shortcuts and the slider.
pub const VOLUME_STEP: f32 = 0.1;

/// Volume of a freshly created engine.
pub const VOLUME_DEFAULT: f32 = 0.3;

/// How long a triggered pad stays visually active, in milliseconds.
pub const PAD_FLASH_MS: u64 = 120;

/// Capacity of the control/status ring buffers.
pub const RING_CAPACITY: usize = 1024;
