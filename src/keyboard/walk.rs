//! Tab-walk state machine
//!
//! [`WalkContext`] holds every piece of state that drives control flow and
//! decides what each focus observation means without touching the page.
//! [`KeyboardWalk`] performs the I/O around it: press Tab, read focus, feed
//! the observation in, act on the answer.

use std::collections::HashSet;

use crate::browser::Key;
use crate::config::WalkTuning;
use crate::error::Result;
use crate::types::{ActiveElement, DialogEscape, FocusOrderItem, KeyboardTestResult, KeyboardTrap};

use super::dialog::DialogDetector;
use super::prober::{self, ActivationProber};
use super::KeyboardPage;

/// Walk states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    Walking,
    TrapSuspected,
    /// Terminal: focus could not leave an element
    TrapConfirmed,
    /// Terminal
    Done(DoneReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    /// Focus came back around to where the walk started
    Wraparound,
    /// The Tab press budget ran out
    BudgetExhausted,
    /// A page operation failed mid-walk; findings so far are kept
    Interrupted,
}

/// What one focus read means
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Focus sits on the document itself
    LeftContent,
    /// Same element as last read, below the trap threshold
    Repeated { count: u32 },
    /// Same element for `trap_repeat_threshold` consecutive reads
    TrapSuspected,
    /// Focus is back on the first element after leaving content
    Wraparound,
    /// An element already recorded, reached again while Tab retraces the
    /// page after a navigation restore
    Replayed,
    /// A different element than last read
    NewElement,
}

/// Identity of one focused element: its selector plus where it sits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FocusKey {
    selector: String,
    locator: String,
}

impl FocusKey {
    fn of(active: &ActiveElement) -> Self {
        Self {
            selector: active.selector.clone(),
            locator: active.locator().to_string(),
        }
    }

    fn matches(&self, active: &ActiveElement) -> bool {
        self.selector == active.selector && self.locator == active.locator()
    }
}

/// Explicit state of one walk
#[derive(Debug, Clone)]
pub struct WalkContext {
    total_focusable: usize,
    trap_threshold: u32,
    repeat_count: u32,
    previous: Option<FocusKey>,
    first: Option<FocusKey>,
    left_content: bool,
    navigation_triggers: HashSet<String>,
    /// Elements already in the focus order
    recorded: HashSet<FocusKey>,
    /// Set after a navigation restore until focus is back on the trigger
    resume_after: Option<FocusKey>,
    trap_escape_attempts: u32,
    tested: usize,
}

impl WalkContext {
    pub fn new(total_focusable: usize, tuning: &WalkTuning) -> Self {
        Self {
            total_focusable,
            trap_threshold: tuning.trap_repeat_threshold,
            repeat_count: 0,
            previous: None,
            first: None,
            left_content: false,
            navigation_triggers: HashSet::new(),
            recorded: HashSet::new(),
            resume_after: None,
            trap_escape_attempts: 0,
            tested: 0,
        }
    }

    /// Classify a focus read. Only repeat counting, the document flag and
    /// the replay position change here; new elements are taken on by
    /// [`commit`](Self::commit).
    pub fn observe(&mut self, active: &ActiveElement) -> Observation {
        if active.is_document {
            self.reset_tracking();
            self.resume_after = None;
            self.left_content = true;
            return Observation::LeftContent;
        }

        if self.previous.as_ref().is_some_and(|key| key.matches(active)) {
            self.repeat_count += 1;
            if self.repeat_count >= self.trap_threshold {
                return Observation::TrapSuspected;
            }
            return Observation::Repeated {
                count: self.repeat_count,
            };
        }

        if let Some(trigger) = &self.resume_after {
            let key = FocusKey::of(active);
            if !trigger.matches(active) && self.recorded.contains(&key) {
                self.repeat_count = 1;
                self.previous = Some(key);
                return Observation::Replayed;
            }
            self.resume_after = None;
        }

        if self.left_content && self.first.as_ref().is_some_and(|key| key.matches(active)) {
            return Observation::Wraparound;
        }

        Observation::NewElement
    }

    /// Take a new element as tested. Returns true once more elements have
    /// been tested than the census counted.
    pub fn commit(&mut self, active: &ActiveElement) -> bool {
        let key = FocusKey::of(active);
        self.repeat_count = 1;
        if self.first.is_none() {
            self.first = Some(key.clone());
        }
        self.recorded.insert(key.clone());
        self.previous = Some(key);
        self.tested += 1;
        self.tested > self.total_focusable
    }

    /// Forget the repeat streak
    pub fn reset_tracking(&mut self) {
        self.repeat_count = 0;
        self.previous = None;
    }

    /// Whether the prober should run on this element
    pub fn should_probe(&self, active: &ActiveElement) -> bool {
        prober::qualifies(active) && !self.navigation_triggers.contains(&active.selector)
    }

    /// Remember a navigation-triggering selector for the rest of the walk.
    /// The restored page starts over from the top, so elements already
    /// recorded are passed over until focus reaches `active` again.
    pub fn mark_navigation_trigger(&mut self, active: &ActiveElement) {
        self.navigation_triggers.insert(active.selector.clone());
        self.resume_after = Some(FocusKey::of(active));
        self.reset_tracking();
    }

    pub fn is_navigation_trigger(&self, selector: &str) -> bool {
        self.navigation_triggers.contains(selector)
    }

    /// Whether recorded elements are being passed over after a restore
    pub fn is_replaying(&self) -> bool {
        self.resume_after.is_some()
    }

    /// Spend one trap-path Escape attempt if the budget allows
    pub fn take_escape_attempt(&mut self, max: u32) -> bool {
        if self.trap_escape_attempts >= max {
            return false;
        }
        self.trap_escape_attempts += 1;
        true
    }

    pub fn total_focusable(&self) -> usize {
        self.total_focusable
    }

    pub fn tested(&self) -> usize {
        self.tested
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }
}

/// Keyboard walk over one page
pub struct KeyboardWalk {
    tuning: WalkTuning,
    detector: DialogDetector,
}

impl KeyboardWalk {
    pub fn new(tuning: WalkTuning) -> Self {
        Self {
            tuning,
            detector: DialogDetector::default(),
        }
    }

    /// Swap the dialog detector (and with it the dialog signature)
    pub fn with_detector(mut self, detector: DialogDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Run the census, the unfocusable scan and the walk.
    ///
    /// Failures before the walk starts are returned as errors. Once it has
    /// started, a failing page operation ends the walk and everything found
    /// so far is returned.
    pub fn run<P: KeyboardPage + ?Sized>(&self, page: &mut P) -> Result<KeyboardTestResult> {
        let focusable = page.focusable_elements()?;
        let unfocusable = page.unfocusable_interactive()?;

        let mut result = KeyboardTestResult {
            total_focusable_elements: focusable.len(),
            unfocusable_interactive: unfocusable,
            ..Default::default()
        };

        page.set_navigation_guard(true)?;
        page.reset_focus()?;

        let mut ctx = WalkContext::new(focusable.len(), &self.tuning);
        let state = self.walk(page, &mut ctx, &mut result).unwrap_or_else(|e| {
            tracing::warn!("Keyboard walk interrupted: {}", e);
            WalkState::Done(DoneReason::Interrupted)
        });

        if let Err(e) = page.set_navigation_guard(false) {
            tracing::debug!("Failed to lift navigation guard: {}", e);
        }

        result.tested_elements = ctx.tested();
        tracing::info!(
            ?state,
            total = result.total_focusable_elements,
            tested = result.tested_elements,
            traps = result.keyboard_traps.len(),
            activations = result.button_activations.len(),
            "Keyboard walk finished"
        );
        Ok(result)
    }

    fn walk<P: KeyboardPage + ?Sized>(
        &self,
        page: &mut P,
        ctx: &mut WalkContext,
        result: &mut KeyboardTestResult,
    ) -> Result<WalkState> {
        let prober = ActivationProber::new(&self.detector, &self.tuning);
        let budget = self.tuning.step_budget(ctx.total_focusable());

        for step in 0..budget {
            page.press(Key::Tab)?;
            page.settle(self.tuning.tab_settle());
            let active = page.active_element()?;

            match ctx.observe(&active) {
                Observation::LeftContent => {
                    tracing::debug!(step, "Focus left page content");
                }
                Observation::Repeated { count } => {
                    tracing::debug!(step, selector = %active.selector, count, "Focus did not move");
                }
                Observation::Wraparound => {
                    tracing::debug!(step, "Focus wrapped around to the first element");
                    return Ok(WalkState::Done(DoneReason::Wraparound));
                }
                Observation::Replayed => {
                    tracing::debug!(
                        step,
                        selector = %active.selector,
                        "Passing over a recorded element"
                    );
                }
                Observation::NewElement => {
                    tracing::debug!(step, selector = %active.selector, "Focus moved");

                    if ctx.should_probe(&active) {
                        let outcome = prober.probe(page, &active)?;
                        result.button_activations.push(outcome.activation);
                        result.dialog_escapes.extend(outcome.escape);
                        if outcome.navigated {
                            ctx.mark_navigation_trigger(&active);
                            continue;
                        }
                    }

                    // Recorded after activation: a navigating element is listed on its next visit
                    result.focus_order.push(FocusOrderItem {
                        index: result.focus_order.len() + 1,
                        selector: active.selector.clone(),
                        html: active.html.clone(),
                        tag_name: active.tag_name.clone(),
                    });

                    if ctx.commit(&active) {
                        return Ok(WalkState::Done(DoneReason::Wraparound));
                    }
                }
                Observation::TrapSuspected => {
                    tracing::debug!(step, selector = %active.selector, "Keyboard trap suspected");
                    let state = self.resolve_trap(page, ctx, &active, result)?;
                    if state != WalkState::Walking {
                        return Ok(state);
                    }
                }
            }
        }

        Ok(WalkState::Done(DoneReason::BudgetExhausted))
    }

    /// TrapSuspected -> Walking (escaped a dialog) or TrapConfirmed
    fn resolve_trap<P: KeyboardPage + ?Sized>(
        &self,
        page: &mut P,
        ctx: &mut WalkContext,
        active: &ActiveElement,
        result: &mut KeyboardTestResult,
    ) -> Result<WalkState> {
        let repeats = ctx.repeat_count();
        let issue = match self.detector.detect(active).dialog {
            Some(dialog) if ctx.take_escape_attempt(self.tuning.max_dialog_escapes) => {
                page.press(Key::Escape)?;
                page.settle(self.tuning.escape_settle());
                let after = page.active_element()?;
                let escaped = !self.detector.detect(&after).in_dialog;

                result.dialog_escapes.push(DialogEscape {
                    dialog_selector: dialog.selector.clone(),
                    dialog_html: dialog.html.clone(),
                    escaped_successfully: escaped,
                    note: if escaped {
                        "Escape released focus held inside the dialog".to_string()
                    } else {
                        "Focus stayed inside the dialog after Escape".to_string()
                    },
                });

                if escaped {
                    ctx.reset_tracking();
                    if after.is_document || after.tab_index < 0 {
                        page.reset_focus()?;
                    }
                    return Ok(WalkState::Walking);
                }

                format!(
                    "Focus is trapped inside dialog {}: Tab does not leave it and Escape does not close it",
                    dialog.selector
                )
            }
            Some(dialog) => format!(
                "Focus is trapped inside dialog {} after {} consecutive Tab presses; Escape attempts exhausted",
                dialog.selector, repeats
            ),
            None => format!(
                "Cannot Tab away from this element: focus stayed here for {} consecutive Tab presses",
                repeats
            ),
        };

        result.keyboard_traps.push(KeyboardTrap {
            selector: active.selector.clone(),
            html: active.html.clone(),
            issue,
        });
        Ok(WalkState::TrapConfirmed)
    }
}

/// Run the keyboard walk with the default dialog detector
pub fn run_keyboard_test<P: KeyboardPage + ?Sized>(
    page: &mut P,
    tuning: &WalkTuning,
) -> Result<KeyboardTestResult> {
    KeyboardWalk::new(tuning.clone()).run(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(selector: &str) -> ActiveElement {
        ActiveElement {
            selector: selector.to_string(),
            tag_name: "div".to_string(),
            tab_index: 0,
            ..Default::default()
        }
    }

    fn at(selector: &str, dom_path: &str) -> ActiveElement {
        ActiveElement {
            dom_path: dom_path.to_string(),
            ..element(selector)
        }
    }

    fn context(total: usize) -> WalkContext {
        WalkContext::new(total, &WalkTuning::default())
    }

    #[test]
    fn test_three_identical_reads_suspect_trap() {
        let mut ctx = context(5);
        let a = element("div#a");
        assert_eq!(ctx.observe(&a), Observation::NewElement);
        assert!(!ctx.commit(&a));
        assert_eq!(ctx.observe(&a), Observation::Repeated { count: 2 });
        assert_eq!(ctx.observe(&a), Observation::TrapSuspected);
    }

    #[test]
    fn test_selector_change_resets_repeats() {
        let mut ctx = context(5);
        let (a, b) = (element("div#a"), element("div#b"));
        ctx.observe(&a);
        ctx.commit(&a);
        assert_eq!(ctx.observe(&a), Observation::Repeated { count: 2 });
        assert_eq!(ctx.observe(&b), Observation::NewElement);
        ctx.commit(&b);
        // a again: a fresh element, not a third repeat
        assert_eq!(ctx.observe(&a), Observation::NewElement);
        ctx.commit(&a);
        assert_eq!(ctx.observe(&a), Observation::Repeated { count: 2 });
    }

    #[test]
    fn test_siblings_with_one_selector_are_distinct() {
        let mut ctx = context(5);
        let first = at("button.btn", "1/0");
        let second = at("button.btn", "1/1");
        ctx.observe(&first);
        ctx.commit(&first);
        assert_eq!(ctx.observe(&second), Observation::NewElement);
        ctx.commit(&second);
        assert_eq!(ctx.observe(&second), Observation::Repeated { count: 2 });
    }

    #[test]
    fn test_snippet_identifies_when_path_unknown() {
        let mut ctx = context(5);
        let first = ActiveElement {
            html: "<li>One</li>".into(),
            ..element("li.item")
        };
        let second = ActiveElement {
            html: "<li>Two</li>".into(),
            ..element("li.item")
        };
        ctx.observe(&first);
        ctx.commit(&first);
        assert_eq!(ctx.observe(&second), Observation::NewElement);
    }

    #[test]
    fn test_document_focus_resets_and_enables_wraparound() {
        let mut ctx = context(3);
        let a = element("a#first");
        ctx.observe(&a);
        ctx.commit(&a);
        assert_eq!(
            ctx.observe(&ActiveElement::document()),
            Observation::LeftContent
        );
        assert_eq!(ctx.repeat_count(), 0);
        assert_eq!(ctx.observe(&a), Observation::Wraparound);
    }

    #[test]
    fn test_commit_reports_census_exhaustion() {
        let mut ctx = context(1);
        assert!(!ctx.commit(&element("a")));
        assert!(ctx.commit(&element("b")));
        assert_eq!(ctx.tested(), 2);
    }

    #[test]
    fn test_navigation_memo() {
        let mut ctx = context(2);
        let button = ActiveElement {
            tag_name: "button".into(),
            ..element("button#go")
        };
        assert!(ctx.should_probe(&button));
        ctx.mark_navigation_trigger(&button);
        assert!(ctx.is_navigation_trigger("button#go"));
        assert!(!ctx.should_probe(&button));
    }

    #[test]
    fn test_restore_passes_over_recorded_elements() {
        let mut ctx = context(4);
        let (a, b, go, c) = (
            element("a#a"),
            element("a#b"),
            element("button#go"),
            element("a#c"),
        );
        for el in [&a, &b] {
            assert_eq!(ctx.observe(el), Observation::NewElement);
            ctx.commit(el);
        }
        assert_eq!(ctx.observe(&go), Observation::NewElement);
        ctx.mark_navigation_trigger(&go);
        assert!(ctx.is_replaying());

        // Tab starts over from the top of the restored page
        assert_eq!(ctx.observe(&a), Observation::Replayed);
        assert_eq!(ctx.observe(&b), Observation::Replayed);
        assert_eq!(ctx.tested(), 2);

        assert_eq!(ctx.observe(&go), Observation::NewElement);
        assert!(!ctx.is_replaying());
        assert!(!ctx.commit(&go));
        assert_eq!(ctx.observe(&c), Observation::NewElement);
        assert!(!ctx.commit(&c));
        assert_eq!(ctx.tested(), 4);
    }

    #[test]
    fn test_replay_still_counts_repeats() {
        let mut ctx = context(3);
        let (a, go) = (element("a#a"), element("button#go"));
        ctx.observe(&a);
        ctx.commit(&a);
        ctx.observe(&go);
        ctx.mark_navigation_trigger(&go);

        assert_eq!(ctx.observe(&a), Observation::Replayed);
        assert_eq!(ctx.observe(&a), Observation::Repeated { count: 2 });
        assert_eq!(ctx.observe(&a), Observation::TrapSuspected);
    }

    #[test]
    fn test_unrecorded_element_ends_replay() {
        let mut ctx = context(3);
        let (a, go, fresh) = (element("a#a"), element("button#go"), element("a#new"));
        ctx.observe(&a);
        ctx.commit(&a);
        ctx.observe(&go);
        ctx.mark_navigation_trigger(&go);

        assert_eq!(ctx.observe(&fresh), Observation::NewElement);
        assert!(!ctx.is_replaying());
        // Without the replay a recorded element is new again
        ctx.commit(&fresh);
        assert_eq!(ctx.observe(&a), Observation::NewElement);
    }

    #[test]
    fn test_escape_budget() {
        let mut ctx = context(1);
        for _ in 0..5 {
            assert!(ctx.take_escape_attempt(5));
        }
        assert!(!ctx.take_escape_attempt(5));
    }

    #[test]
    fn test_custom_threshold() {
        let tuning = WalkTuning {
            trap_repeat_threshold: 5,
            ..WalkTuning::default()
        };
        let mut ctx = WalkContext::new(3, &tuning);
        let a = element("span#x");
        ctx.observe(&a);
        ctx.commit(&a);
        for count in 2..5 {
            assert_eq!(ctx.observe(&a), Observation::Repeated { count });
        }
        assert_eq!(ctx.observe(&a), Observation::TrapSuspected);
    }
}
