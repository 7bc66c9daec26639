//! Small helpers over `scraper` shared by the extractors.

use scraper::{ElementRef, Selector};

use crate::error::AurionError;

pub(crate) fn selector(css: &str) -> Result<Selector, AurionError> {
    Selector::parse(css).map_err(|e| AurionError::shape(css, format!("invalid selector: {e}")))
}

/// Attribute-equality selector; ids such as `form:j_idt193_data` contain
/// colons that would otherwise need CSS escaping.
pub(crate) fn by_attr(tag: &str, attr: &str, value: &str) -> Result<Selector, AurionError> {
    selector(&format!("{tag}[{attr}=\"{value}\"]"))
}

/// Trimmed text content of `element`.
pub(crate) fn text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Trimmed text of the first match of `sel` under `element`, if any.
pub(crate) fn first_text(element: ElementRef<'_>, sel: &Selector) -> Option<String> {
    element.select(sel).next().map(text)
}

/// Text of `element` skipping any `span.<class>` subtree.
pub(crate) fn text_without(element: ElementRef<'_>, class: &str) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .ancestors()
            .take_while(|ancestor| ancestor.id() != element.id())
            .filter_map(ElementRef::wrap)
            .any(|el| el.value().name() == "span" && el.value().classes().any(|c| c == class));
        if !hidden {
            out.push_str(fragment);
        }
    }
    out.trim().to_string()
}

/// Period labels come with non-breaking spaces between day, month and year.
pub(crate) fn normalize_spaces(value: &str) -> String {
    value.replace('\u{a0}', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn test_text_without_skips_decoration() {
        let doc = Html::parse_fragment(
            r#"<div id="c"><span class="ui-column-title">Ville</span> Brest <b>Centre</b></div>"#,
        );
        let sel = selector("div").unwrap();
        let cell = doc.select(&sel).next().unwrap();
        assert_eq!(text_without(cell, "ui-column-title"), "Brest Centre");
        assert_eq!(text(cell), "Ville Brest Centre");
    }

    #[test]
    fn test_by_attr_handles_colons() {
        let doc = Html::parse_document(
            r#"<table><tbody id="form:j_idt193_data"><tr><td>x</td></tr></tbody></table>"#,
        );
        let sel = by_attr("tbody", "id", "form:j_idt193_data").unwrap();
        assert_eq!(doc.select(&sel).count(), 1);
    }

    #[test]
    fn test_normalize_spaces() {
        assert_eq!(normalize_spaces("2024\u{a0}-\u{a0}2025"), "2024 - 2025");
    }
}
