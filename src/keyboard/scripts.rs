//! Page-context scripts used by the keyboard walk
//!
//! Every script returns `JSON.stringify(...)` so the result survives the
//! DevTools round trip as a plain string regardless of object identity.
//! Selector and snippet derivation here must stay in line with
//! [`derive_selector`](crate::types::derive_selector) and
//! [`truncate_snippet`](crate::types::truncate_snippet).

use super::survey::{INTERACTIVE_ROLES, NATIVE_FOCUSABLE_TAGS};

/// Helpers shared by every script
const PRELUDE: &str = r#"
const __snippet = (el) => (el.outerHTML || '').substring(0, 200);
const __classes = (el) => {
  const raw = typeof el.className === 'string' ? el.className : (el.getAttribute('class') || '');
  return raw.trim().split(/\s+/).filter(Boolean);
};
const __selector = (el) => {
  let s = el.tagName.toLowerCase();
  if (el.id) s += '#' + el.id;
  for (const c of __classes(el).slice(0, 3)) s += '.' + c;
  return s;
};
const __visible = (el) => {
  const rect = el.getBoundingClientRect();
  const style = window.getComputedStyle(el);
  return rect.width > 0 && rect.height > 0
    && style.display !== 'none'
    && style.visibility !== 'hidden'
    && parseFloat(style.opacity || '1') > 0;
};
const __attr = (el, name) => el.getAttribute(name);
const __path = (el) => {
  const parts = [];
  for (let node = el; node && node.parentElement; node = node.parentElement) {
    parts.push(Array.prototype.indexOf.call(node.parentElement.children, node));
  }
  return parts.reverse().join('/');
};
"#;

/// Focusability predicate of the census
pub const FOCUSABLE_SELECTOR: &str = concat!(
    "a[href], area[href], button, input:not([type=\"hidden\"]), select, textarea, ",
    "iframe, summary, [tabindex]:not([tabindex^=\"-\"]), audio[controls], video[controls], ",
    "[contenteditable]:not([contenteditable=\"false\"])"
);

/// Inline handler attributes that signal interactivity
const HANDLER_ATTRIBUTES: &[&str] = &["onclick", "onkeydown", "onkeyup", "onkeypress"];

/// Handler attributes, plus roles matched as whitespace-separated tokens
pub fn interactive_selector() -> String {
    HANDLER_ATTRIBUTES
        .iter()
        .map(|attr| format!("[{}]", attr))
        .chain(INTERACTIVE_ROLES.iter().map(|role| format!("[role~=\"{}\"]", role)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn wrap(body: &str) -> String {
    format!("(() => {{\n{}\n{}\n}})()", PRELUDE, body)
}

pub fn focusable_elements() -> String {
    wrap(&format!(
        r#"
const found = Array.from(document.querySelectorAll('{}')).filter(__visible);
return JSON.stringify(found.map((el) => ({{
  selector: __selector(el),
  html: __snippet(el),
  tagName: el.tagName.toLowerCase(),
  tabIndex: el.tabIndex,
  ariaRole: __attr(el, 'role'),
}})));
"#,
        FOCUSABLE_SELECTOR
    ))
}

/// Effective tab index: an explicit `tabindex` wins, otherwise only native
/// controls and `a`/`area` with `href` are focusable. `el.tabIndex` alone
/// reports 0 for `<a>` without `href`.
pub fn unfocusable_interactive() -> String {
    let native_tags =
        serde_json::to_string(NATIVE_FOCUSABLE_TAGS).unwrap_or_else(|_| "[]".to_string());
    wrap(&format!(
        r#"
const nativeTags = {};
const isNative = (el) => {{
  const tag = el.tagName.toLowerCase();
  return nativeTags.includes(tag) || ((tag === 'a' || tag === 'area') && el.hasAttribute('href'));
}};
const effectiveTabIndex = (el) => el.hasAttribute('tabindex') ? el.tabIndex : (isNative(el) ? 0 : -1);
const found = Array.from(document.querySelectorAll('{}'))
  .filter((el) => effectiveTabIndex(el) < 0 && __visible(el));
return JSON.stringify(found.map((el) => ({{
  selector: __selector(el),
  html: __snippet(el),
  role: __attr(el, 'role'),
}})));
"#,
        native_tags,
        interactive_selector()
    ))
}

pub fn active_element() -> String {
    wrap(
        r#"
const el = document.activeElement;
if (!el || el === document.body || el === document.documentElement) {
  return JSON.stringify({ isDocument: true, selector: 'body', tagName: 'body', tabIndex: -1 });
}
const chain = [];
for (let node = el; node && node !== document.body && node !== document.documentElement; node = node.parentElement) {
  chain.push({
    selector: __selector(node),
    html: __snippet(node),
    tagName: node.tagName.toLowerCase(),
    id: node.id || null,
    className: __classes(node).join(' ') || null,
    role: __attr(node, 'role'),
    ariaModal: __attr(node, 'aria-modal'),
  });
}
return JSON.stringify({
  isDocument: false,
  selector: __selector(el),
  html: __snippet(el),
  tagName: el.tagName.toLowerCase(),
  tabIndex: el.tabIndex,
  role: __attr(el, 'role'),
  ariaExpanded: __attr(el, 'aria-expanded'),
  ariaPressed: __attr(el, 'aria-pressed'),
  ariaSelected: __attr(el, 'aria-selected'),
  domPath: __path(el),
  chain,
});
"#,
    )
}

pub fn aria_state(selector: &str) -> String {
    // serde_json string encoding is a valid JS string literal
    let literal = serde_json::to_string(selector).unwrap_or_else(|_| "\"\"".to_string());
    wrap(&format!(
        r#"
let el = null;
try {{ el = document.querySelector({}); }} catch (e) {{ el = null; }}
if (!el) return JSON.stringify(null);
return JSON.stringify({{
  expanded: __attr(el, 'aria-expanded'),
  pressed: __attr(el, 'aria-pressed'),
  selected: __attr(el, 'aria-selected'),
}});
"#,
        literal
    ))
}

pub fn reset_focus() -> String {
    wrap(
        r#"
const active = document.activeElement;
if (active && active !== document.body && typeof active.blur === 'function') active.blur();
if (document.body) {
  const hadTabIndex = document.body.hasAttribute('tabindex');
  if (!hadTabIndex) document.body.setAttribute('tabindex', '-1');
  document.body.focus();
  if (!hadTabIndex) document.body.removeAttribute('tabindex');
}
return JSON.stringify(true);
"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripts_are_wrapped_iifes() {
        for script in [
            focusable_elements(),
            unfocusable_interactive(),
            active_element(),
            aria_state("button#x"),
            reset_focus(),
        ] {
            assert!(script.starts_with("(() => {"));
            assert!(script.ends_with("})()"));
            assert!(script.contains("JSON.stringify"));
        }
    }

    #[test]
    fn test_aria_state_escapes_selector() {
        let script = aria_state("div[data-x=\"1\"]");
        assert!(script.contains(r#"document.querySelector("div[data-x=\"1\"]")"#));
    }

    #[test]
    fn test_unfocusable_scan_uses_effective_tab_index() {
        let script = unfocusable_interactive();
        // Anchors without href report tabIndex 0, so the raw property is not enough
        assert!(script.contains("el.hasAttribute('tabindex') ? el.tabIndex"));
        assert!(script.contains("(tag === 'a' || tag === 'area') && el.hasAttribute('href')"));
        assert!(script.contains(r#"["button","input","select","textarea","iframe","summary"]"#));
        assert!(!script.contains("el.tabIndex < 0"));
    }

    #[test]
    fn test_interactive_selector_matches_role_tokens() {
        let selector = interactive_selector();
        for role in INTERACTIVE_ROLES {
            assert!(selector.contains(&format!("[role~=\"{}\"]", role)), "{}", role);
        }
        assert!(selector.starts_with("[onclick], [onkeydown], [onkeyup], [onkeypress]"));
        assert!(!selector.contains("[role=\""));
        assert!(unfocusable_interactive().contains(&selector));
    }

    #[test]
    fn test_active_element_reports_dom_path() {
        assert!(active_element().contains("domPath: __path(el)"));
    }
}
