//! JavaScript snippets evaluated in the page
//!
//! Every snippet is a function body ending in `return`. Backends wrap it with
//! [`wrap`] so the page hands back a JSON string, which [`decode`] turns into
//! a [`serde_json::Value`]. Selectors and texts are embedded as JSON string
//! literals, never spliced raw.

use nutri_core::config::Locator;
use nutri_core::{NutriError, Result};
use serde_json::Value;

pub const READY_STATE: &str = "return document.readyState;";

pub const SCROLL_TO_BOTTOM: &str =
    "window.scrollTo(0, document.body ? document.body.scrollHeight : 0); return true;";

const TEXT_OF: &str = "(el.innerText || el.textContent || '').trim()";

/// JSON string literal for embedding in a script
fn literal(text: &str) -> String {
    Value::String(text.to_string()).to_string()
}

/// Expression evaluating to the located element or `null`
pub fn resolve(locator: &Locator) -> String {
    match locator {
        Locator::Css { css } => format!("document.querySelector({})", literal(css)),
        Locator::Text { scope, text } => format!(
            "(Array.from(document.querySelectorAll({})).find(function (el) {{ return (el.textContent || '').trim() === {}; }}) || null)",
            literal(scope),
            literal(text)
        ),
    }
}

pub fn count(selector: &str) -> String {
    format!(
        "return document.querySelectorAll({}).length;",
        literal(selector)
    )
}

pub fn exists(locator: &Locator) -> String {
    format!("return {} !== null;", resolve(locator))
}

pub fn text_of(locator: &Locator) -> String {
    format!(
        "var el = {}; return el ? {} : null;",
        resolve(locator),
        TEXT_OF
    )
}

pub fn link_targets(selector: &str) -> String {
    format!(
        "return Array.from(document.querySelectorAll({})).map(function (a) {{ return a.href; }}).filter(function (h) {{ return !!h; }});",
        literal(selector)
    )
}

/// Header cell text plus the cell texts of every row, or `null` without a table
pub fn table(table: &str, header_cell: &str, rows: &str) -> String {
    format!(
        "var table = document.querySelector({table}); \
         if (!table) {{ return null; }} \
         var head = table.querySelector({header}); \
         var cells = function (row) {{ return Array.from(row.querySelectorAll('td')).map(function (el) {{ return {text}; }}); }}; \
         return {{ header: head ? (function (el) {{ return {text}; }})(head) : null, rows: Array.from(table.querySelectorAll({rows})).map(cells) }};",
        table = literal(table),
        header = literal(header_cell),
        rows = literal(rows),
        text = TEXT_OF,
    )
}

/// Calls `element.click()` on the located element
pub fn element_click(locator: &Locator) -> String {
    format!(
        "var el = {}; if (!el) {{ return false; }} el.click(); return true;",
        resolve(locator)
    )
}

/// Dispatches a bubbling mouse click event on the located element
pub fn mouse_event_click(locator: &Locator) -> String {
    format!(
        "var el = {}; if (!el) {{ return false; }} \
         el.dispatchEvent(new MouseEvent('click', {{ bubbles: true, cancelable: true, view: window }})); \
         return true;",
        resolve(locator)
    )
}

pub fn scroll_into_view(locator: &Locator) -> String {
    format!(
        "var el = {}; if (!el) {{ return false; }} el.scrollIntoView(true); return true;",
        resolve(locator)
    )
}

pub fn set_zoom(percent: u32) -> String {
    format!(
        "if (!document.body) {{ return false; }} document.body.style.zoom = '{}%'; return true;",
        percent
    )
}

pub fn remove_all(selector: &str) -> String {
    format!(
        "var nodes = document.querySelectorAll({}); nodes.forEach(function (n) {{ n.remove(); }}); return nodes.length;",
        literal(selector)
    )
}

/// Expression form of a snippet: its result as a JSON string
pub fn wrap(body: &str) -> String {
    format!("JSON.stringify((function () {{ {} }})())", body)
}

/// Decode what a backend got back from a [`wrap`]ped snippet
pub fn decode(raw: Option<Value>) -> Result<Value> {
    match raw {
        None | Some(Value::Null) => Ok(Value::Null),
        Some(Value::String(json)) => serde_json::from_str(&json)
            .map_err(|e| NutriError::Script(format!("Unreadable script result: {}", e))),
        Some(other) => Ok(other),
    }
}
