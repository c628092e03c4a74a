//! Automated keyboard-accessibility exploration
//!
//! Walks a live page with simulated Tab/Enter/Escape presses and reports
//! keyboard traps, interactive elements the keyboard cannot reach, and
//! unexpected navigation or dialog behaviour. Nothing about the page
//! structure is assumed up front: the Tab order is discovered one press at a
//! time.
//!
//! Components:
//! - [`survey`]: focusable census and unfocusable-interactive scan
//! - [`dialog`]: dialog signature matching over the focus ancestor chain
//! - [`prober`]: Enter activation of button-like elements
//! - [`walk`]: the Tab-walk state machine
//! - [`violations`]: flattening findings into violation records
//! - [`page`]: typed projection over a browser [`PageHandle`](crate::browser::PageHandle)
//! - [`sim`]: in-memory page model for exercising the walk without a browser

pub mod dialog;
pub mod page;
pub mod prober;
mod scripts;
pub mod sim;
pub mod survey;
pub mod violations;
pub mod walk;

pub use dialog::{DialogDetector, DialogInfo, DialogSignature, DialogState, HeuristicSignature};
pub use page::DomPage;
pub use prober::{ActivationProber, ProbeOutcome};
pub use violations::keyboard_violations;
pub use walk::{run_keyboard_test, DoneReason, KeyboardWalk, Observation, WalkContext, WalkState};

use std::time::Duration;

use crate::browser::Key;
use crate::error::Result;
use crate::types::{ActiveElement, AriaState, FocusableElement, UnfocusableElement};

/// What the keyboard walk needs from a page
///
/// Every method returns typed data; untyped script results never cross this
/// trait.
pub trait KeyboardPage {
    /// Simulate one key press
    fn press(&mut self, key: Key) -> Result<()>;

    /// Wait for the page to react to the last input
    fn settle(&mut self, wait: Duration);

    /// The element that currently has focus
    fn active_element(&mut self) -> Result<ActiveElement>;

    /// ARIA state of the first element matching `selector`, if any
    fn aria_state(&mut self, selector: &str) -> Result<Option<AriaState>>;

    /// Visible elements matching the focusability predicate, in document order
    fn focusable_elements(&mut self) -> Result<Vec<FocusableElement>>;

    /// Visible interactive elements with a negative effective tab index
    fn unfocusable_interactive(&mut self) -> Result<Vec<UnfocusableElement>>;

    fn current_url(&mut self) -> Result<String>;

    /// Navigate back to `url` and reset focus to the document start
    fn restore(&mut self, url: &str) -> Result<()>;

    /// Blur whatever has focus so the next Tab starts from the top
    fn reset_focus(&mut self) -> Result<()>;

    /// Abort page-leaving navigations while enabled
    fn set_navigation_guard(&mut self, enabled: bool) -> Result<()>;
}
