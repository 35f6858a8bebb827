//! Deferred reset of the transient pad flash.
//!
//! Each pad trigger schedules its own one-shot clear; there is no cancellation
//! token and no repeat. Safety comes from the generation guard in
//! [`dispatcher::clear_flash`], not from gating: a clear whose generation is
//! no longer current simply does nothing, however late it fires.

use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::drum_machine::constants::PAD_FLASH_MS;
use crate::drum_machine::dispatcher::{self, EngineState};
use crate::messages::UiEvent;

/// Schedule the one-shot clear for the flash generation `seq`.
///
/// Spawns a short-lived timer thread. When the clear actually lands, the host
/// is notified through `ui_tx`; stale clears stay silent.
pub fn schedule_clear(state: Arc<Mutex<EngineState>>, ui_tx: Sender<UiEvent>, seq: u64) {
    thread::spawn(move || {
        thread::sleep(Duration::from_millis(PAD_FLASH_MS));

        let cleared = {
            let Ok(mut state) = state.lock() else {
                return;
            };
            let pad = state.active_pad;
            if dispatcher::clear_flash(&mut state, seq) {
                pad
            } else {
                None
            }
        };

        if let Some(pad) = cleared {
            let _ = ui_tx.send(UiEvent::FlashCleared { pad });
        }
    });
}
