//! In-memory page model
//!
//! [`SimulatedPage`] implements [`KeyboardPage`] over a flat list of
//! elements with parent links. It models sequential focus navigation
//! (positive `tabindex` first, then document order, focus leaving to the
//! document after the last element), elements that pull focus back, dialogs
//! that confine focus and close on Escape, ARIA toggles and navigation.
//! It exists so the walk can be driven deterministically without a browser.

use std::time::Duration;

use crate::browser::Key;
use crate::error::{ProbeError, Result};
use crate::types::{
    derive_selector, truncate_snippet, ActiveElement, AriaState, FocusableElement, NodeInfo,
    UnfocusableElement,
};

use super::survey::{effective_tab_index, is_interactive, is_natively_focusable};
use super::KeyboardPage;

/// What pressing Enter on an element does
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EnterAction {
    #[default]
    None,
    /// Leave the page for another URL
    Navigate(String),
    /// Show the element at this index and move focus into it
    OpenDialog(usize),
    /// Flip `aria-expanded`
    ToggleExpanded,
    /// Flip `aria-pressed`
    TogglePressed,
}

/// One simulated element
#[derive(Debug, Clone, Default)]
pub struct SimElement {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub role: Option<String>,
    pub href: Option<String>,
    pub tab_index: Option<i32>,
    pub aria_modal: bool,
    pub aria: AriaState,
    /// Carries an inline event handler attribute
    pub handler: bool,
    /// Not rendered (also hides descendants)
    pub hidden: bool,
    /// Pulls focus back to itself whenever it loses it
    pub traps_focus: bool,
    /// Tab cycles within this element's descendants while focus is inside
    pub confines_focus: bool,
    /// Escape hides this element while focus is inside it
    pub closes_on_escape: bool,
    pub on_enter: EnterAction,
    pub parent: Option<usize>,
}

impl SimElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_lowercase(),
            ..Default::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.push(class.to_string());
        self
    }

    pub fn role(mut self, role: &str) -> Self {
        self.role = Some(role.to_string());
        self
    }

    pub fn href(mut self, href: &str) -> Self {
        self.href = Some(href.to_string());
        self
    }

    pub fn tab_index(mut self, tab_index: i32) -> Self {
        self.tab_index = Some(tab_index);
        self
    }

    pub fn aria_modal(mut self) -> Self {
        self.aria_modal = true;
        self
    }

    pub fn expanded(mut self, expanded: bool) -> Self {
        self.aria.expanded = Some(expanded.to_string());
        self
    }

    pub fn pressed(mut self, pressed: bool) -> Self {
        self.aria.pressed = Some(pressed.to_string());
        self
    }

    pub fn handler(mut self) -> Self {
        self.handler = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn traps_focus(mut self) -> Self {
        self.traps_focus = true;
        self
    }

    pub fn confines_focus(mut self) -> Self {
        self.confines_focus = true;
        self
    }

    pub fn closes_on_escape(mut self) -> Self {
        self.closes_on_escape = true;
        self
    }

    pub fn on_enter(mut self, action: EnterAction) -> Self {
        self.on_enter = action;
        self
    }

    pub fn within(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn selector(&self) -> String {
        let classes: Vec<&str> = self.classes.iter().map(String::as_str).collect();
        derive_selector(&self.tag, self.id.as_deref(), &classes)
    }

    pub fn html(&self) -> String {
        let mut attrs = String::new();
        if let Some(id) = &self.id {
            attrs.push_str(&format!(" id=\"{}\"", id));
        }
        if !self.classes.is_empty() {
            attrs.push_str(&format!(" class=\"{}\"", self.classes.join(" ")));
        }
        if let Some(role) = &self.role {
            attrs.push_str(&format!(" role=\"{}\"", role));
        }
        if let Some(href) = &self.href {
            attrs.push_str(&format!(" href=\"{}\"", href));
        }
        if let Some(tab_index) = self.tab_index {
            attrs.push_str(&format!(" tabindex=\"{}\"", tab_index));
        }
        if self.handler {
            attrs.push_str(" onclick=\"handle()\"");
        }
        truncate_snippet(&format!("<{}{}></{}>", self.tag, attrs, self.tag))
    }

    fn effective_tab_index(&self) -> i32 {
        effective_tab_index(&self.tag, self.href.is_some(), self.tab_index)
    }

    /// Matches the census focusability predicate
    fn matches_focusable(&self) -> bool {
        is_natively_focusable(&self.tag, self.href.is_some())
            || self.tab_index.map(|t| t >= 0).unwrap_or(false)
    }

    fn node_info(&self) -> NodeInfo {
        NodeInfo {
            selector: self.selector(),
            html: self.html(),
            tag_name: self.tag.clone(),
            id: self.id.clone(),
            class_name: (!self.classes.is_empty()).then(|| self.classes.join(" ")),
            role: self.role.clone(),
            aria_modal: self.aria_modal.then(|| "true".to_string()),
        }
    }
}

/// In-memory [`KeyboardPage`]
#[derive(Debug, Clone)]
pub struct SimulatedPage {
    url: String,
    initial: Vec<SimElement>,
    elements: Vec<SimElement>,
    focus: Option<usize>,
    opener: Option<usize>,
    guard: bool,
    presses: Vec<Key>,
    navigations: Vec<String>,
    blocked_navigations: usize,
}

impl SimulatedPage {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            initial: Vec::new(),
            elements: Vec::new(),
            focus: None,
            opener: None,
            guard: false,
            presses: Vec::new(),
            navigations: Vec::new(),
            blocked_navigations: 0,
        }
    }

    /// Append an element and return its index
    pub fn add(&mut self, element: SimElement) -> usize {
        self.initial.push(element.clone());
        self.elements.push(element);
        self.elements.len() - 1
    }

    pub fn with(mut self, element: SimElement) -> Self {
        self.add(element);
        self
    }

    pub fn element(&self, index: usize) -> &SimElement {
        &self.elements[index]
    }

    /// Number of times `key` was pressed
    pub fn presses(&self, key: Key) -> usize {
        self.presses.iter().filter(|k| **k == key).count()
    }

    /// URLs the page navigated to
    pub fn navigations(&self) -> &[String] {
        &self.navigations
    }

    /// Navigations aborted by the guard
    pub fn blocked_navigations(&self) -> usize {
        self.blocked_navigations
    }

    pub fn guard_enabled(&self) -> bool {
        self.guard
    }

    /// The element itself, then its ancestors
    fn lineage(&self, index: usize) -> Vec<usize> {
        let mut lineage = vec![index];
        let mut current = self.elements[index].parent;
        while let Some(parent) = current {
            if lineage.contains(&parent) {
                break;
            }
            lineage.push(parent);
            current = self.elements[parent].parent;
        }
        lineage
    }

    fn is_visible(&self, index: usize) -> bool {
        self.lineage(index).iter().all(|&i| !self.elements[i].hidden)
    }

    fn is_tabbable(&self, index: usize) -> bool {
        self.elements[index].effective_tab_index() >= 0 && self.is_visible(index)
    }

    /// Innermost focus-confining ancestor of the focused element
    fn confinement(&self) -> Option<usize> {
        let focus = self.focus?;
        self.lineage(focus)
            .into_iter()
            .find(|&i| self.elements[i].confines_focus)
    }

    fn tab_sequence(&self, scope: Option<usize>) -> Vec<usize> {
        let mut sequence: Vec<usize> = (0..self.elements.len())
            .filter(|&i| self.is_tabbable(i))
            .filter(|&i| scope.map(|s| i != s && self.lineage(i).contains(&s)).unwrap_or(true))
            .collect();
        // Positive tabindex first (ascending), then document order; the sort is stable
        sequence.sort_by_key(|&i| match self.elements[i].effective_tab_index() {
            t if t > 0 => (0, t),
            _ => (1, 0),
        });
        sequence
    }

    fn press_tab(&mut self) {
        if let Some(focus) = self.focus {
            if self.elements[focus].traps_focus {
                return;
            }
        }

        let scope = self.confinement();
        let sequence = self.tab_sequence(scope);
        self.focus = match self.focus {
            None => sequence.first().copied(),
            Some(focus) => match sequence.iter().position(|&i| i == focus) {
                Some(pos) if pos + 1 < sequence.len() => Some(sequence[pos + 1]),
                Some(_) if scope.is_some() => sequence.first().copied(),
                Some(_) => None,
                // Focused but not in the sequence: continue from its document position
                None => sequence
                    .iter()
                    .copied()
                    .find(|&i| i > focus)
                    .or_else(|| scope.and_then(|_| sequence.first().copied())),
            },
        };
    }

    fn press_enter(&mut self) {
        let Some(focus) = self.focus else {
            return;
        };

        match self.elements[focus].on_enter.clone() {
            EnterAction::None => {}
            EnterAction::Navigate(url) => {
                if self.guard {
                    self.blocked_navigations += 1;
                } else {
                    self.url = url.clone();
                    self.navigations.push(url);
                    self.focus = None;
                }
            }
            EnterAction::OpenDialog(dialog) => {
                if dialog < self.elements.len() {
                    self.elements[dialog].hidden = false;
                    self.opener = Some(focus);
                    self.focus = self
                        .tab_sequence(Some(dialog))
                        .first()
                        .copied()
                        .or(Some(dialog));
                }
            }
            EnterAction::ToggleExpanded => {
                let aria = &mut self.elements[focus].aria;
                aria.expanded = Some(flip(aria.expanded.as_deref()));
            }
            EnterAction::TogglePressed => {
                let aria = &mut self.elements[focus].aria;
                aria.pressed = Some(flip(aria.pressed.as_deref()));
            }
        }
    }

    fn press_escape(&mut self) {
        let Some(focus) = self.focus else {
            return;
        };

        let closable = self
            .lineage(focus)
            .into_iter()
            .find(|&i| self.elements[i].closes_on_escape && !self.elements[i].hidden);
        if let Some(dialog) = closable {
            self.elements[dialog].hidden = true;
            self.focus = self.opener.take().filter(|&o| self.is_visible(o));
        }
    }
}

fn flip(value: Option<&str>) -> String {
    if value == Some("true") {
        "false".to_string()
    } else {
        "true".to_string()
    }
}

impl KeyboardPage for SimulatedPage {
    fn press(&mut self, key: Key) -> Result<()> {
        self.presses.push(key);
        match key {
            Key::Tab => self.press_tab(),
            Key::Enter => self.press_enter(),
            Key::Escape => self.press_escape(),
        }
        Ok(())
    }

    fn settle(&mut self, _wait: Duration) {}

    fn active_element(&mut self) -> Result<ActiveElement> {
        let Some(focus) = self.focus else {
            return Ok(ActiveElement::document());
        };

        let element = &self.elements[focus];
        Ok(ActiveElement {
            is_document: false,
            selector: element.selector(),
            html: element.html(),
            tag_name: element.tag.clone(),
            tab_index: element.effective_tab_index(),
            role: element.role.clone(),
            aria_expanded: element.aria.expanded.clone(),
            aria_pressed: element.aria.pressed.clone(),
            aria_selected: element.aria.selected.clone(),
            dom_path: self
                .lineage(focus)
                .iter()
                .rev()
                .map(|i| i.to_string())
                .collect::<Vec<_>>()
                .join("/"),
            chain: self
                .lineage(focus)
                .into_iter()
                .map(|i| self.elements[i].node_info())
                .collect(),
        })
    }

    fn aria_state(&mut self, selector: &str) -> Result<Option<AriaState>> {
        Ok(self
            .elements
            .iter()
            .find(|e| e.selector() == selector)
            .map(|e| e.aria.clone()))
    }

    fn focusable_elements(&mut self) -> Result<Vec<FocusableElement>> {
        Ok((0..self.elements.len())
            .filter(|&i| self.elements[i].matches_focusable() && self.is_visible(i))
            .map(|i| {
                let e = &self.elements[i];
                FocusableElement {
                    selector: e.selector(),
                    html: e.html(),
                    tag_name: e.tag.clone(),
                    tab_index: e.effective_tab_index(),
                    aria_role: e.role.clone(),
                }
            })
            .collect())
    }

    fn unfocusable_interactive(&mut self) -> Result<Vec<UnfocusableElement>> {
        Ok((0..self.elements.len())
            .filter(|&i| {
                let e = &self.elements[i];
                is_interactive(e.role.as_deref(), e.handler)
                    && e.effective_tab_index() < 0
                    && self.is_visible(i)
            })
            .map(|i| {
                let e = &self.elements[i];
                UnfocusableElement {
                    selector: e.selector(),
                    html: e.html(),
                    role: e.role.clone(),
                }
            })
            .collect())
    }

    fn current_url(&mut self) -> Result<String> {
        Ok(self.url.clone())
    }

    fn restore(&mut self, url: &str) -> Result<()> {
        if url.is_empty() {
            return Err(ProbeError::InvalidInput("empty restore URL".to_string()));
        }
        self.url = url.to_string();
        self.elements = self.initial.clone();
        self.focus = None;
        self.opener = None;
        Ok(())
    }

    fn reset_focus(&mut self) -> Result<()> {
        self.focus = None;
        Ok(())
    }

    fn set_navigation_guard(&mut self, enabled: bool) -> Result<()> {
        self.guard = enabled;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector_after_tab(page: &mut SimulatedPage) -> String {
        page.press(Key::Tab).unwrap();
        page.active_element().unwrap().selector
    }

    #[test]
    fn test_tab_order_positive_tabindex_first() {
        let mut page = SimulatedPage::new("https://example.test/")
            .with(SimElement::new("a").id("one").href("/1"))
            .with(SimElement::new("button").id("two").tab_index(2))
            .with(SimElement::new("input").id("three"))
            .with(SimElement::new("div").id("four").tab_index(1));

        assert_eq!(selector_after_tab(&mut page), "div#four");
        assert_eq!(selector_after_tab(&mut page), "button#two");
        assert_eq!(selector_after_tab(&mut page), "a#one");
        assert_eq!(selector_after_tab(&mut page), "input#three");
        assert_eq!(selector_after_tab(&mut page), "body");
        assert_eq!(selector_after_tab(&mut page), "div#four");
    }

    #[test]
    fn test_hidden_and_negative_tabindex_are_skipped() {
        let mut page = SimulatedPage::new("https://example.test/")
            .with(SimElement::new("button").id("skip").tab_index(-1))
            .with(SimElement::new("div").class("wrap").hidden())
            .with(SimElement::new("button").id("inside").within(1))
            .with(SimElement::new("button").id("shown"));

        assert_eq!(selector_after_tab(&mut page), "button#shown");
        assert_eq!(page.focusable_elements().unwrap().len(), 2);
    }

    #[test]
    fn test_dialog_open_and_escape() {
        let mut page = SimulatedPage::new("https://example.test/");
        let opener = page.add(SimElement::new("button").id("open").on_enter(EnterAction::OpenDialog(1)));
        let dialog = page.add(SimElement::new("div").id("dlg").role("dialog").hidden().closes_on_escape());
        page.add(SimElement::new("button").class("close").within(dialog));

        page.press(Key::Tab).unwrap();
        page.press(Key::Enter).unwrap();
        let active = page.active_element().unwrap();
        assert_eq!(active.selector, "button.close");
        assert_eq!(active.chain[1].selector, "div#dlg");

        page.press(Key::Escape).unwrap();
        assert!(page.element(dialog).hidden);
        assert_eq!(page.active_element().unwrap().selector, page.element(opener).selector());
    }

    #[test]
    fn test_guard_blocks_navigation() {
        let mut page = SimulatedPage::new("https://example.test/")
            .with(SimElement::new("button").on_enter(EnterAction::Navigate("https://example.test/other".into())));
        page.set_navigation_guard(true).unwrap();
        page.press(Key::Tab).unwrap();
        page.press(Key::Enter).unwrap();
        assert_eq!(page.blocked_navigations(), 1);
        assert_eq!(page.current_url().unwrap(), "https://example.test/");

        page.set_navigation_guard(false).unwrap();
        page.press(Key::Enter).unwrap();
        assert_eq!(page.current_url().unwrap(), "https://example.test/other");
        assert_eq!(page.navigations().len(), 1);
    }

    #[test]
    fn test_confined_focus_cycles() {
        let mut page = SimulatedPage::new("https://example.test/");
        let modal = page.add(SimElement::new("div").class("modal").confines_focus());
        page.add(SimElement::new("input").id("a").within(modal));
        page.add(SimElement::new("input").id("b").within(modal));
        page.add(SimElement::new("a").id("outside").href("/x"));

        assert_eq!(selector_after_tab(&mut page), "input#a");
        assert_eq!(selector_after_tab(&mut page), "input#b");
        assert_eq!(selector_after_tab(&mut page), "input#a");
    }
}
