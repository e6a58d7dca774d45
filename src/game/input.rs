//! Input Capture and Edge Buffering
//!
//! Raw device state is sampled once per simulation step and folded into
//! per-button counters. A press or release edge stays queryable for a fixed
//! number of steps (the buffer window) so short taps are never lost between
//! steps.
//!
//! ```text
//!   RawDeviceState ──advance()──► ButtonState[9] ──► is_down / was_pressed
//!   (keys, mouse, pad)            pressed  down        consume / was_released
//!                                 released
//! ```
//!
//! Keyboard/mouse wins over the gamepad on the keyboard slot: when a key or
//! mouse button drives a logical button, the pad is not consulted for that
//! button in that step.

use serde::{Deserialize, Serialize};

use crate::core::fixed::{Fixed, STICK_DEADZONE};
use crate::core::hash::{StateHash, StateHasher};

// =============================================================================
// LOGICAL BUTTONS
// =============================================================================

/// Logical buttons gameplay code reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Button {
    MenuConfirm = 0,
    MenuBack = 1,
    Start = 2,
    Up = 3,
    Down = 4,
    Left = 5,
    Right = 6,
    Jump = 7,
    Interact = 8,
}

impl Button {
    /// Number of logical buttons.
    pub const COUNT: usize = 9;

    /// All buttons in index order.
    pub const ALL: [Button; Button::COUNT] = [
        Button::MenuConfirm,
        Button::MenuBack,
        Button::Start,
        Button::Up,
        Button::Down,
        Button::Left,
        Button::Right,
        Button::Jump,
        Button::Interact,
    ];

    /// Dense index into per-button tables.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Button for a dense index.
    ///
    /// # Panics
    ///
    /// Panics if `index >= Button::COUNT`; callers must only pass indices
    /// obtained from [`Button::index`].
    pub fn from_index(index: usize) -> Button {
        assert!(index < Button::COUNT, "button index {index} out of range");
        Button::ALL[index]
    }
}

// =============================================================================
// PHYSICAL DEVICES
// =============================================================================

/// Keyboard keys the default and rebindable layouts use.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Key {
    Enter,
    Escape,
    Space,
    Tab,
    LeftShift,
    Up,
    Down,
    Left,
    Right,
    A,
    C,
    D,
    E,
    F,
    J,
    K,
    Q,
    R,
    S,
    W,
    X,
    Z,
}

impl Key {
    #[inline]
    const fn bit(self) -> u64 {
        1 << (self as u8)
    }
}

/// Mouse buttons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    #[inline]
    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// Gamepad buttons, including virtual left-stick directions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PadButton {
    A,
    B,
    X,
    Y,
    Start,
    Back,
    LeftShoulder,
    RightShoulder,
    DPadUp,
    DPadDown,
    DPadLeft,
    DPadRight,
    /// Left stick pushed up past the deadzone (or d-pad up)
    LStickUp,
    /// Left stick pushed down past the deadzone (or d-pad down)
    LStickDown,
    /// Left stick pushed left past the deadzone (or d-pad left)
    LStickLeft,
    /// Left stick pushed right past the deadzone (or d-pad right)
    LStickRight,
}

impl PadButton {
    #[inline]
    const fn bit(self) -> u32 {
        1 << (self as u8)
    }

    /// Face-button swap for pads that report a Nintendo layout.
    pub fn nintendo_swapped(self) -> PadButton {
        match self {
            PadButton::A => PadButton::B,
            PadButton::B => PadButton::A,
            PadButton::X => PadButton::Y,
            PadButton::Y => PadButton::X,
            other => other,
        }
    }
}

/// Raw device snapshot for one controller slot at one step.
///
/// Stick axes are fixed-point in `[-1, 1]`; `stick_y` is positive up.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RawDeviceState {
    /// Held keys (bit per [`Key`])
    pub keys: u64,
    /// Held mouse buttons (bit per [`MouseButton`])
    pub mouse: u8,
    /// Whether a gamepad is attached to this slot
    pub pad_connected: bool,
    /// Held pad buttons (bit per [`PadButton`], stick directions excluded)
    pub pad_buttons: u32,
    pub stick_x: Fixed,
    pub stick_y: Fixed,
    /// Pad reports Nintendo face-button positions
    pub nintendo_layout: bool,
}

impl RawDeviceState {
    /// Nothing held, no pad.
    pub const fn idle() -> Self {
        Self {
            keys: 0,
            mouse: 0,
            pad_connected: false,
            pad_buttons: 0,
            stick_x: 0,
            stick_y: 0,
            nintendo_layout: false,
        }
    }

    /// Builder: hold a key.
    pub fn with_key(mut self, key: Key) -> Self {
        self.set_key(key, true);
        self
    }

    /// Builder: hold a mouse button.
    pub fn with_mouse(mut self, button: MouseButton) -> Self {
        self.mouse |= button.bit();
        self
    }

    /// Builder: connect a pad and hold a button on it.
    pub fn with_pad_button(mut self, button: PadButton) -> Self {
        self.pad_connected = true;
        self.pad_buttons |= button.bit();
        self
    }

    /// Builder: connect a pad and set the left stick.
    pub fn with_stick(mut self, x: Fixed, y: Fixed) -> Self {
        self.pad_connected = true;
        self.stick_x = x;
        self.stick_y = y;
        self
    }

    pub fn set_key(&mut self, key: Key, held: bool) {
        if held {
            self.keys |= key.bit();
        } else {
            self.keys &= !key.bit();
        }
    }

    #[inline]
    pub fn key_held(&self, key: Key) -> bool {
        self.keys & key.bit() != 0
    }

    #[inline]
    pub fn mouse_held(&self, button: MouseButton) -> bool {
        self.mouse & button.bit() != 0
    }

    /// Physical pad button test (no layout correction, no stick).
    #[inline]
    pub fn pad_held(&self, button: PadButton) -> bool {
        self.pad_connected && self.pad_buttons & button.bit() != 0
    }

    /// Logical pad test: applies layout correction and maps stick
    /// directions to the analog stick or the matching d-pad button.
    pub fn pad_reads(&self, button: PadButton, deadzone: Fixed) -> bool {
        if !self.pad_connected {
            return false;
        }
        match button {
            PadButton::LStickUp => self.stick_y > deadzone || self.pad_held(PadButton::DPadUp),
            PadButton::LStickDown => {
                self.stick_y < -deadzone || self.pad_held(PadButton::DPadDown)
            }
            PadButton::LStickLeft => {
                self.stick_x < -deadzone || self.pad_held(PadButton::DPadLeft)
            }
            PadButton::LStickRight => {
                self.stick_x > deadzone || self.pad_held(PadButton::DPadRight)
            }
            other if self.nintendo_layout => self.pad_held(other.nintendo_swapped()),
            other => self.pad_held(other),
        }
    }

    fn hash_into(&self, hasher: &mut StateHasher) {
        hasher.update_u64(self.keys);
        hasher.update_u8(self.mouse);
        hasher.update_bool(self.pad_connected);
        hasher.update_u32(self.pad_buttons);
        hasher.update_fixed(self.stick_x);
        hasher.update_fixed(self.stick_y);
        hasher.update_bool(self.nintendo_layout);
    }
}

// =============================================================================
// BINDINGS
// =============================================================================

/// Physical sources feeding one logical button.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputBinding {
    pub key: Key,
    pub pad: PadButton,
    pub mouse: Option<MouseButton>,
}

impl InputBinding {
    pub const fn new(key: Key, pad: PadButton) -> Self {
        Self {
            key,
            pad,
            mouse: None,
        }
    }
}

/// Default layout, indexed by [`Button::index`].
pub const DEFAULT_BINDINGS: [InputBinding; Button::COUNT] = [
    InputBinding::new(Key::Enter, PadButton::A),
    InputBinding::new(Key::Escape, PadButton::B),
    InputBinding::new(Key::Escape, PadButton::Start),
    InputBinding::new(Key::W, PadButton::LStickUp),
    InputBinding::new(Key::S, PadButton::LStickDown),
    InputBinding::new(Key::A, PadButton::LStickLeft),
    InputBinding::new(Key::D, PadButton::LStickRight),
    InputBinding::new(Key::Space, PadButton::B),
    InputBinding::new(Key::E, PadButton::A),
];

// =============================================================================
// BUTTON STATE
// =============================================================================

/// Edge counters for one logical button.
///
/// `pressed` and `released` are never both non-zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ButtonState {
    /// Steps left in the press window
    pub pressed: u8,
    /// Physically held as of the last sample
    pub down: bool,
    /// Steps left in the release window
    pub released: u8,
}

/// Buffered logical input for one controller slot.
#[derive(Clone, Debug)]
pub struct InputState {
    buttons: [ButtonState; Button::COUNT],
    bindings: [InputBinding; Button::COUNT],
    buffer_steps: u8,
    deadzone: Fixed,
    /// Slot reads keyboard and mouse in addition to its pad
    uses_keyboard: bool,
    keyboard_priority: bool,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(3, STICK_DEADZONE, true)
    }
}

impl InputState {
    /// New state with the default layout.
    pub fn new(buffer_steps: u8, deadzone: Fixed, uses_keyboard: bool) -> Self {
        assert!(buffer_steps > 0, "input buffer window must be at least one step");
        Self {
            buttons: [ButtonState::default(); Button::COUNT],
            bindings: DEFAULT_BINDINGS,
            buffer_steps,
            deadzone,
            uses_keyboard,
            keyboard_priority: uses_keyboard,
        }
    }

    /// Sample devices once for this step.
    ///
    /// Edges are always detected. While `frozen` (hitpause) the existing
    /// windows do not count down.
    pub fn advance(&mut self, raw: &RawDeviceState, frozen: bool) {
        for button in Button::ALL {
            let binding = self.bindings[button.index()];
            let from_keyboard = self.uses_keyboard
                && (raw.key_held(binding.key)
                    || binding.mouse.is_some_and(|m| raw.mouse_held(m)));

            let held = if from_keyboard {
                self.keyboard_priority = true;
                true
            } else if raw.pad_reads(binding.pad, self.deadzone) {
                self.keyboard_priority = false;
                true
            } else {
                false
            };

            let buffer = self.buffer_steps;
            let state = &mut self.buttons[button.index()];
            if !frozen {
                state.pressed = state.pressed.saturating_sub(1);
                state.released = state.released.saturating_sub(1);
            }
            if held && !state.down {
                state.pressed = buffer;
                state.released = 0;
            } else if !held && state.down {
                state.released = buffer;
                state.pressed = 0;
            }
            state.down = held;
        }
    }

    /// Held, or released within the buffer window.
    #[inline]
    pub fn is_down(&self, button: Button) -> bool {
        let state = &self.buttons[button.index()];
        state.down || state.released > 0
    }

    /// Pressed within the buffer window.
    #[inline]
    pub fn was_pressed(&self, button: Button) -> bool {
        self.buttons[button.index()].pressed > 0
    }

    /// Released within the buffer window.
    #[inline]
    pub fn was_released(&self, button: Button) -> bool {
        self.buttons[button.index()].released > 0
    }

    /// Like [`was_pressed`](Self::was_pressed), but clears both windows on
    /// success so the same press cannot be read twice.
    pub fn consume(&mut self, button: Button) -> bool {
        let state = &mut self.buttons[button.index()];
        if state.pressed > 0 {
            state.pressed = 0;
            state.released = 0;
            true
        } else {
            false
        }
    }

    /// Release-edge counterpart of [`consume`](Self::consume).
    pub fn consume_release(&mut self, button: Button) -> bool {
        let state = &mut self.buttons[button.index()];
        if state.released > 0 {
            state.pressed = 0;
            state.released = 0;
            true
        } else {
            false
        }
    }

    /// Inject a synthetic press. The button reads held until the next
    /// sample re-derives it from the devices.
    pub fn press(&mut self, button: Button) {
        let state = &mut self.buttons[button.index()];
        state.pressed = self.buffer_steps;
        state.released = 0;
        state.down = true;
    }

    /// Drop every pending edge; held flags survive.
    pub fn clear_buffers(&mut self) {
        for state in &mut self.buttons {
            state.pressed = 0;
            state.released = 0;
        }
    }

    /// Drop all state including held flags.
    pub fn clear_all(&mut self) {
        self.buttons = [ButtonState::default(); Button::COUNT];
    }

    /// Take the current device state as the baseline without producing
    /// edges. Used when gameplay resumes after a context switch.
    pub fn resync(&mut self, raw: &RawDeviceState) {
        self.advance(raw, true);
        self.clear_buffers();
    }

    /// Whether the keyboard family drove input most recently.
    #[inline]
    pub fn keyboard_priority(&self) -> bool {
        self.keyboard_priority
    }

    /// Raw counters for one button.
    #[inline]
    pub fn state(&self, button: Button) -> ButtonState {
        self.buttons[button.index()]
    }

    /// Current binding for a button.
    #[inline]
    pub fn binding(&self, button: Button) -> InputBinding {
        self.bindings[button.index()]
    }

    pub fn rebind_key(&mut self, button: Button, key: Key) {
        self.bindings[button.index()].key = key;
    }

    pub fn rebind_pad(&mut self, button: Button, pad: PadButton) {
        self.bindings[button.index()].pad = pad;
    }

    pub fn rebind_mouse(&mut self, button: Button, mouse: Option<MouseButton>) {
        self.bindings[button.index()].mouse = mouse;
    }

    /// Restore the default layout.
    pub fn reset_bindings(&mut self) {
        self.bindings = DEFAULT_BINDINGS;
    }

    /// Fold counters into a state hash.
    pub fn hash_into(&self, hasher: &mut StateHasher) {
        for state in &self.buttons {
            hasher.update_u8(state.pressed);
            hasher.update_bool(state.down);
            hasher.update_u8(state.released);
        }
        hasher.update_bool(self.keyboard_priority);
    }
}

// =============================================================================
// RECORDING
// =============================================================================

/// A device state that began at `step`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDelta {
    pub step: u32,
    pub state: RawDeviceState,
}

/// Delta-compressed device recording for one controller slot.
///
/// Only stores steps where the raw state changed.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DeviceRecording {
    /// Last recorded step
    pub end_step: u32,
    deltas: Vec<DeviceDelta>,
    #[serde(skip)]
    last_state: RawDeviceState,
}

impl DeviceRecording {
    pub fn new() -> Self {
        Self {
            end_step: 0,
            deltas: Vec::with_capacity(256),
            last_state: RawDeviceState::idle(),
        }
    }

    /// Record the device state sampled at `step`.
    pub fn record(&mut self, step: u32, state: RawDeviceState) {
        self.end_step = step;
        if self.deltas.is_empty() || state != self.last_state {
            self.deltas.push(DeviceDelta { step, state });
            self.last_state = state;
        }
    }

    /// Device state in effect at `step`.
    pub fn get_at(&self, step: u32) -> RawDeviceState {
        let idx = self.deltas.partition_point(|d| d.step <= step);
        if idx == 0 {
            RawDeviceState::idle()
        } else {
            self.deltas[idx - 1].state
        }
    }

    pub fn deltas(&self) -> &[DeviceDelta] {
        &self.deltas
    }

    pub fn delta_count(&self) -> usize {
        self.deltas.len()
    }

    /// Every step from 0 through `end_step` with its device state.
    pub fn replay_iter(&self) -> ReplayIterator<'_> {
        ReplayIterator {
            recording: self,
            current_step: 0,
            delta_idx: 0,
            current: RawDeviceState::idle(),
            done: self.deltas.is_empty(),
        }
    }

    /// Digest of the recorded deltas.
    pub fn compute_hash(&self) -> StateHash {
        let mut hasher = StateHasher::for_recording();
        hasher.update_u32(self.end_step);
        hasher.update_u32(self.deltas.len() as u32);
        for delta in &self.deltas {
            hasher.update_u32(delta.step);
            delta.state.hash_into(&mut hasher);
        }
        hasher.finalize()
    }
}

/// Step-by-step replay of a [`DeviceRecording`].
pub struct ReplayIterator<'a> {
    recording: &'a DeviceRecording,
    current_step: u32,
    delta_idx: usize,
    current: RawDeviceState,
    done: bool,
}

impl<'a> Iterator for ReplayIterator<'a> {
    type Item = (u32, RawDeviceState);

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.current_step > self.recording.end_step {
            return None;
        }

        while let Some(delta) = self.recording.deltas.get(self.delta_idx) {
            if delta.step > self.current_step {
                break;
            }
            self.current = delta.state;
            self.delta_idx += 1;
        }

        let item = (self.current_step, self.current);
        match self.current_step.checked_add(1) {
            Some(next) => self.current_step = next,
            None => self.done = true,
        }
        Some(item)
    }
}

// =============================================================================
// TESTS
// =============================================================================
