//! Actuator boundary that hands assembled prompts to the Cursor desktop app.
//!
//! The relay only depends on the two-call [`Actuator`] contract. The desktop
//! implementation drives Cursor through `osascript`, and [`ActuatorQueue`]
//! serializes access so concurrent chat events never interleave UI automation.

pub mod actuator_contract;
pub mod actuator_queue;
pub mod applescript;
pub mod cursor_desktop;

pub use actuator_contract::{Actuator, ActuatorError};
pub use actuator_queue::ActuatorQueue;
pub use cursor_desktop::{CursorDesktopActuator, CursorDesktopConfig, DEFAULT_CURSOR_CLI_PATH};
