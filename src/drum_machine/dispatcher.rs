//! Trigger dispatch state machine.
//!
//! Dispatch is pure: every operation takes the current [`EngineState`] and
//! returns the successor state together with the effects the caller must
//! execute (start a voice, schedule the flash reset). The host surface in
//! [`super`] owns the single state cell and the side-effect plumbing, so
//! everything in here is testable without audio hardware or a host process.

use crate::drum_machine::banks::{BankSide, SampleId, sample_for};
use crate::drum_machine::constants::VOLUME_DEFAULT;
use crate::drum_machine::volume;

/// Mutable engine state. One instance per machine, held behind a single cell
/// that every entry point reads through.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineState {
    /// Master gate: while off, every trigger is ignored.
    pub power: bool,

    /// Bank the next trigger resolves through.
    pub bank: BankSide,

    /// Trigger volume, always on the 0.1 grid.
    pub volume: f32,

    /// Pad currently showing its transient "pressed" flash.
    pub active_pad: Option<char>,

    /// Sample label or volume readout shown by the host.
    pub display_text: String,

    /// Bumped on every pad trigger. A deferred clear carries the seq it was
    /// scheduled under and only applies while it still matches, so an old
    /// clear cannot cut a newer flash short.
    pub flash_seq: u64,
}

impl EngineState {
    pub fn new() -> Self {
        Self {
            power: true,
            bank: BankSide::Left,
            volume: VOLUME_DEFAULT,
            active_pad: None,
            display_text: String::new(),
            flash_seq: 0,
        }
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

/// Side effect requested by a dispatch step.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Start one voice for `sample` at the volume captured at trigger time.
    PlaySample { sample: SampleId, volume: f32 },

    /// Arrange for [`clear_flash`] to run with `seq` after the flash duration.
    ScheduleFlashClear { seq: u64 },
}

/// Result of one dispatch step: the successor state plus effects to run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub state: EngineState,
    pub effects: Vec<Effect>,
}

impl Outcome {
    fn unchanged(state: &EngineState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
        }
    }
}

/// Dispatch one trigger symbol (keyboard or pad press, already uppercased).
///
/// Pad symbols resolve through the active bank and come back with a playback
/// effect and a freshly scheduled flash reset. `'-'`, `'='` and `'+'` are
/// reserved for the volume shortcuts. Anything else is ignored, and while
/// power is off so is everything, volume shortcuts included.
pub fn handle_trigger(state: &EngineState, symbol: char) -> Outcome {
    if !state.power {
        return Outcome::unchanged(state);
    }

    if let Some(sample) = sample_for(state.bank, symbol) {
        let mut next = state.clone();
        next.flash_seq += 1;
        next.active_pad = Some(symbol);
        next.display_text = sample.label().to_string();

        let seq = next.flash_seq;
        let volume = next.volume;
        return Outcome {
            state: next,
            effects: vec![
                Effect::PlaySample { sample, volume },
                Effect::ScheduleFlashClear { seq },
            ],
        };
    }

    match symbol {
        '-' => adjust_volume(state, volume::decrement),
        '=' | '+' => adjust_volume(state, volume::increment),
        _ => Outcome::unchanged(state),
    }
}

fn adjust_volume(state: &EngineState, step: fn(f32) -> Option<f32>) -> Outcome {
    match step(state.volume) {
        Some(volume) => {
            let mut next = state.clone();
            next.volume = volume;
            next.display_text = volume::display_text(volume);
            Outcome {
                state: next,
                effects: Vec::new(),
            }
        }
        None => Outcome::unchanged(state),
    }
}

/// Flip the power switch.
///
/// Turning off wipes the display; nothing else moves, so volume and bank
/// survive a power cycle. Never gated.
pub fn toggle_power(state: &EngineState) -> Outcome {
    let mut next = state.clone();
    next.power = !state.power;
    if !next.power {
        next.display_text.clear();
    }

    Outcome {
        state: next,
        effects: Vec::new(),
    }
}

/// Flip the bank switch. Inert while power is off; the flash and display are
/// untouched either way, only future triggers see the other bank.
pub fn toggle_bank(state: &EngineState) -> Outcome {
    if !state.power {
        return Outcome::unchanged(state);
    }

    let mut next = state.clone();
    next.bank = state.bank.toggled();

    Outcome {
        state: next,
        effects: Vec::new(),
    }
}

/// Absolute volume from the slider, re-rounded to the 0.1 grid. Inert while
/// power is off.
pub fn set_volume(state: &EngineState, value: f32) -> Outcome {
    if !state.power {
        return Outcome::unchanged(state);
    }

    let volume = volume::round_to_step(value);
    let mut next = state.clone();
    next.volume = volume;
    next.display_text = volume::display_text(volume);

    Outcome {
        state: next,
        effects: Vec::new(),
    }
}

/// Deferred flash reset.
///
/// Applies only while `seq` is still the most recent trigger generation and a
/// pad is actually lit; anything else is a no-op, so running late is always
/// safe. Not power-gated on purpose: the reset is state-internal, not a
/// trigger. Returns whether a pad went inactive.
pub fn clear_flash(state: &mut EngineState, seq: u64) -> bool {
    if state.flash_seq == seq && state.active_pad.is_some() {
        state.active_pad = None;
        true
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn powered_off() -> EngineState {
        let mut state = EngineState::new();
        state.power = false;
        state
    }

    #[test]
    fn test_pad_trigger_sets_flash_display_and_effects() {
        let state = EngineState::new();
        let Outcome { state: next, effects } = handle_trigger(&state, 'Q');

        assert_eq!(next.active_pad, Some('Q'));
        assert_eq!(next.display_text, "Heater 1");
        assert_eq!(next.flash_seq, state.flash_seq + 1);
        assert_eq!(
            effects,
            vec![
                Effect::PlaySample {
                    sample: SampleId::Heater1,
                    volume: 0.3,
                },
                Effect::ScheduleFlashClear { seq: next.flash_seq },
            ]
        );
    }

    #[test]
    fn test_same_pad_resolves_per_bank() {
        let state = EngineState::new();
        assert_eq!(handle_trigger(&state, 'Q').state.display_text, "Heater 1");

        let flipped = toggle_bank(&state).state;
        assert_eq!(flipped.bank, BankSide::Right);
        assert_eq!(handle_trigger(&flipped, 'Q').state.display_text, "Chord 1");
    }

    #[test]
    fn test_bank_toggle_relabels_the_s_pad() {
        let state = EngineState::new();

        let after_s = handle_trigger(&state, 'S').state;
        assert_eq!(after_s.display_text, "Clap");

        let flipped = toggle_bank(&after_s).state;
        let after_s_again = handle_trigger(&flipped, 'S').state;
        assert_eq!(after_s_again.display_text, "Open HH");
    }

    #[test]
    fn test_unmapped_symbols_are_noops() {
        let state = EngineState::new();
        for symbol in ['F', 'J', '1', '0', ' ', '*', 'q'] {
            let outcome = handle_trigger(&state, symbol);
            assert_eq!(outcome.state, state, "symbol {symbol:?} changed state");
            assert!(outcome.effects.is_empty());
        }
    }

    #[test]
    fn test_power_off_gates_every_symbol() {
        let state = powered_off();
        for symbol in ['Q', 'W', 'E', 'A', 'S', 'D', 'Z', 'X', 'C', '-', '=', '+'] {
            let outcome = handle_trigger(&state, symbol);
            assert_eq!(outcome.state, state, "symbol {symbol:?} not gated");
            assert!(outcome.effects.is_empty());
        }
    }

    #[test]
    fn test_power_off_after_trigger_keeps_display_empty_on_next_press() {
        let state = EngineState::new();
        let after_q = handle_trigger(&state, 'Q').state;
        let off = toggle_power(&after_q).state;

        assert!(!off.power);
        assert_eq!(off.display_text, "");

        let pressed = handle_trigger(&off, 'W');
        assert_eq!(pressed.state.display_text, "");
        assert_eq!(pressed.state.active_pad, off.active_pad);
    }

    #[test]
    fn test_volume_and_bank_survive_a_power_cycle() {
        let mut state = EngineState::new();
        state = toggle_bank(&state).state;
        state = handle_trigger(&state, '=').state;
        assert_eq!(state.volume, 0.4);

        let off = toggle_power(&state).state;
        let back_on = toggle_power(&off).state;

        assert!(back_on.power);
        assert_eq!(back_on.bank, BankSide::Right);
        assert_eq!(back_on.volume, 0.4);
    }

    #[test]
    fn test_bank_toggle_is_inert_while_off() {
        let state = powered_off();
        let outcome = toggle_bank(&state);
        assert_eq!(outcome.state, state);
    }

    #[test]
    fn test_volume_keys_do_not_flash_or_play() {
        let state = EngineState::new();
        for symbol in ['-', '=', '+'] {
            let outcome = handle_trigger(&state, symbol);
            assert_eq!(outcome.state.active_pad, None);
            assert_eq!(outcome.state.flash_seq, state.flash_seq);
            assert!(outcome.effects.is_empty());
        }
    }

    #[test]
    fn test_both_increment_symbols_step_up() {
        let state = EngineState::new();
        assert_eq!(handle_trigger(&state, '=').state.volume, 0.4);
        assert_eq!(handle_trigger(&state, '+').state.volume, 0.4);
    }

    #[test]
    fn test_ten_decrements_floor_at_exact_zero() {
        let mut state = EngineState::new();
        for _ in 0..10 {
            state = handle_trigger(&state, '-').state;
        }

        assert_eq!(state.volume, 0.0);
        assert_eq!(state.display_text, "Volume: 0");

        // Floored: one more press changes nothing, not even the display.
        let again = handle_trigger(&state, '-');
        assert_eq!(again.state, state);
    }

    #[test]
    fn test_increments_saturate_at_one() {
        let mut state = EngineState::new();
        for _ in 0..20 {
            state = handle_trigger(&state, '=').state;
            assert!((0.0..=1.0).contains(&state.volume));
        }

        assert_eq!(state.volume, 1.0);
        assert_eq!(state.display_text, "Volume: 100");
    }

    #[test]
    fn test_trigger_plays_at_current_volume() {
        let mut state = EngineState::new();
        state = handle_trigger(&state, '-').state;

        let outcome = handle_trigger(&state, 'X');
        assert_eq!(
            outcome.effects[0],
            Effect::PlaySample {
                sample: SampleId::Kick,
                volume: 0.2,
            }
        );
    }

    #[test]
    fn test_set_volume_rounds_and_updates_display() {
        let state = EngineState::new();
        let next = set_volume(&state, 0.66).state;

        assert_eq!(next.volume, 0.7);
        assert_eq!(next.display_text, "Volume: 70");
    }

    #[test]
    fn test_set_volume_is_inert_while_off() {
        let state = powered_off();
        let outcome = set_volume(&state, 0.9);
        assert_eq!(outcome.state, state);
    }

    #[test]
    fn test_clear_flash_applies_only_to_matching_seq() {
        let mut state = handle_trigger(&EngineState::new(), 'Q').state;
        let first_seq = state.flash_seq;

        // Second trigger lands before the first clear fires.
        state = handle_trigger(&state, 'W').state;
        assert_eq!(state.active_pad, Some('W'));

        // The stale clear is a no-op against the newer flash.
        assert!(!clear_flash(&mut state, first_seq));
        assert_eq!(state.active_pad, Some('W'));

        // The matching clear lands.
        let current = state.flash_seq;
        assert!(clear_flash(&mut state, current));
        assert_eq!(state.active_pad, None);

        // Clearing an already-cleared pad is harmless.
        assert!(!clear_flash(&mut state, current));
        assert_eq!(state.active_pad, None);
    }

    #[test]
    fn test_clear_flash_is_safe_after_power_off() {
        let mut state = handle_trigger(&EngineState::new(), 'C').state;
        let seq = state.flash_seq;
        state = toggle_power(&state).state;

        // The reset is state-internal, not a trigger: it still lands.
        assert!(clear_flash(&mut state, seq));
        assert_eq!(state.active_pad, None);
    }

    #[test]
    fn test_rapid_retrigger_restarts_the_flash() {
        let state = EngineState::new();
        let first = handle_trigger(&state, 'Z');
        let second = handle_trigger(&first.state, 'Z');

        assert_eq!(second.state.active_pad, Some('Z'));
        assert!(second.state.flash_seq > first.state.flash_seq);
        assert!(
            second
                .effects
                .contains(&Effect::ScheduleFlashClear { seq: second.state.flash_seq })
        );
    }
}
