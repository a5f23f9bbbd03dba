use scraper::{ElementRef, Selector};

use crate::normalize::clean_text;

/// Compiles a selector written in this crate. Only for string literals.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|err| panic!("invalid built-in selector {css:?}: {err}"))
}

pub fn element_text(el: ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<String>())
}

/// Cleaned text of the first match under `el`, `None` when absent or blank.
pub fn first_text(el: ElementRef<'_>, sel: &Selector) -> Option<String> {
    el.select(sel).next().map(element_text).and_then(non_empty)
}

pub fn first_attr(el: ElementRef<'_>, sel: &Selector, attr: &str) -> Option<String> {
    el.select(sel)
        .next()
        .and_then(|node| node.value().attr(attr))
        .map(|value| value.trim().to_string())
        .and_then(non_empty)
}

pub fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
