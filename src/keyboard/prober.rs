//! Enter-key activation of button-like elements

use crate::browser::Key;
use crate::config::WalkTuning;
use crate::error::Result;
use crate::types::{ActiveElement, AriaState, ButtonActivation, DialogEscape};

use super::dialog::{DialogDetector, DialogInfo};
use super::KeyboardPage;

/// Roles whose activation is worth probing
const ACTIVATION_ROLES: &[&str] = &["button", "tab", "menuitem"];

/// Whether the focused element is button-like enough to press Enter on
pub fn qualifies(active: &ActiveElement) -> bool {
    if active.is_document {
        return false;
    }
    active.tag_name.eq_ignore_ascii_case("button")
        || active
            .role
            .as_deref()
            .map(|role| role.split_whitespace().any(|r| ACTIVATION_ROLES.contains(&r)))
            .unwrap_or(false)
        || active.aria_expanded.is_some()
        || active.aria_pressed.is_some()
}

/// Result of one probe
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    pub activation: ButtonActivation,
    /// Escape attempted against a dialog the activation opened
    pub escape: Option<DialogEscape>,
    /// The activation left the page; the original URL has been restored
    pub navigated: bool,
}

/// Presses Enter on a focused element and classifies what happened
pub struct ActivationProber<'a> {
    detector: &'a DialogDetector,
    tuning: &'a WalkTuning,
}

impl<'a> ActivationProber<'a> {
    pub fn new(detector: &'a DialogDetector, tuning: &'a WalkTuning) -> Self {
        Self { detector, tuning }
    }

    /// Probe `active`. The navigation guard is lifted for the activation and
    /// re-armed afterwards, whatever the outcome.
    pub fn probe<P: KeyboardPage + ?Sized>(
        &self,
        page: &mut P,
        active: &ActiveElement,
    ) -> Result<ProbeOutcome> {
        let original_url = page.current_url()?;
        page.set_navigation_guard(false)?;
        let outcome = self.activate(page, active, &original_url);
        let rearmed = page.set_navigation_guard(true);
        let outcome = outcome?;
        rearmed?;
        Ok(outcome)
    }

    fn activate<P: KeyboardPage + ?Sized>(
        &self,
        page: &mut P,
        active: &ActiveElement,
        original_url: &str,
    ) -> Result<ProbeOutcome> {
        let before = active.aria_state();
        let was_in_dialog = self.detector.detect(active).in_dialog;

        page.press(Key::Enter)?;
        page.settle(self.tuning.activation_settle());

        let url = page.current_url()?;
        if url != original_url {
            tracing::debug!(selector = %active.selector, %url, "Activation navigated away");
            page.restore(original_url)?;
            return Ok(ProbeOutcome {
                activation: ButtonActivation {
                    selector: active.selector.clone(),
                    html: active.html.clone(),
                    activated: true,
                    triggered_dialog: false,
                    expanded_content: false,
                    note: format!(
                        "Activation navigated to {}; page restored to {} and this element is skipped for the rest of the test",
                        url, original_url
                    ),
                },
                escape: None,
                navigated: true,
            });
        }

        let after = page.active_element()?;
        let dialog = self.detector.detect(&after);
        let opened_dialog = dialog.dialog.filter(|_| !was_in_dialog);

        let expanded = page
            .aria_state(&active.selector)?
            .map(|state| state_changed(&before, &state))
            .unwrap_or(false);

        let escape = match &opened_dialog {
            Some(info) => Some(self.escape_dialog(page, info)?),
            None => None,
        };

        if expanded && opened_dialog.is_none() {
            // Best effort: put the content back the way it was. Not verified.
            page.press(Key::Enter)?;
            page.settle(self.tuning.activation_settle());
        }

        let note = match (&opened_dialog, expanded) {
            (Some(info), _) => format!("Enter opened dialog {}", info.selector),
            (None, true) => "Enter toggled aria-expanded/aria-pressed/aria-selected".to_string(),
            (None, false) => "No observable change after Enter".to_string(),
        };

        Ok(ProbeOutcome {
            activation: ButtonActivation {
                selector: active.selector.clone(),
                html: active.html.clone(),
                activated: opened_dialog.is_some() || expanded,
                triggered_dialog: opened_dialog.is_some(),
                expanded_content: expanded,
                note,
            },
            escape,
            navigated: false,
        })
    }

    fn escape_dialog<P: KeyboardPage + ?Sized>(
        &self,
        page: &mut P,
        dialog: &DialogInfo,
    ) -> Result<DialogEscape> {
        page.press(Key::Escape)?;
        page.settle(self.tuning.escape_settle());

        let still_open = self.detector.detect(&page.active_element()?).in_dialog;
        Ok(DialogEscape {
            dialog_selector: dialog.selector.clone(),
            dialog_html: dialog.html.clone(),
            escaped_successfully: !still_open,
            note: if still_open {
                "Dialog opened by activation stayed open after Escape".to_string()
            } else {
                "Dialog opened by activation closed with Escape".to_string()
            },
        })
    }
}

fn state_changed(before: &AriaState, after: &AriaState) -> bool {
    before.expanded != after.expanded
        || before.pressed != after.pressed
        || before.selected != after.selected
}
