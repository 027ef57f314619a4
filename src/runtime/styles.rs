//! Style isolation for rendered shadow roots

use super::document::{LiveDocument, NodeData};

/// Default `display` of native elements, as user agents ship it
const NATIVE_DISPLAY: &[(&str, &str)] = &[
    ("address", "block"),
    ("article", "block"),
    ("aside", "block"),
    ("blockquote", "block"),
    ("body", "block"),
    ("details", "block"),
    ("dialog", "block"),
    ("dd", "block"),
    ("div", "block"),
    ("dl", "block"),
    ("dt", "block"),
    ("fieldset", "block"),
    ("figcaption", "block"),
    ("figure", "block"),
    ("footer", "block"),
    ("form", "block"),
    ("h1", "block"),
    ("h2", "block"),
    ("h3", "block"),
    ("h4", "block"),
    ("h5", "block"),
    ("h6", "block"),
    ("header", "block"),
    ("hgroup", "block"),
    ("hr", "block"),
    ("html", "block"),
    ("main", "block"),
    ("menu", "block"),
    ("nav", "block"),
    ("ol", "block"),
    ("p", "block"),
    ("pre", "block"),
    ("section", "block"),
    ("summary", "block"),
    ("ul", "block"),
    ("li", "list-item"),
    ("table", "table"),
    ("caption", "table-caption"),
    ("colgroup", "table-column-group"),
    ("col", "table-column"),
    ("thead", "table-header-group"),
    ("tbody", "table-row-group"),
    ("tfoot", "table-footer-group"),
    ("tr", "table-row"),
    ("td", "table-cell"),
    ("th", "table-cell"),
    ("button", "inline-block"),
    ("input", "inline-block"),
    ("meter", "inline-block"),
    ("progress", "inline-block"),
    ("select", "inline-block"),
    ("textarea", "inline-block"),
    ("ruby", "ruby"),
    ("rt", "ruby-text"),
    ("head", "none"),
    ("link", "none"),
    ("meta", "none"),
    ("script", "none"),
    ("style", "none"),
    ("template", "none"),
    ("title", "none"),
];

/// Native display of `tag`; unknown and custom tags are `inline`
pub fn native_display(tag: &str) -> &'static str {
    let tag = tag.to_ascii_lowercase();
    NATIVE_DISPLAY
        .iter()
        .find(|(name, _)| *name == tag)
        .map(|(_, display)| *display)
        .unwrap_or("inline")
}

/// Sheet giving a custom-tag host the display of its wrapper element
pub fn reset_sheet(wrapper: &str) -> String {
    format!(":host {{ display: {}; }}", native_display(wrapper))
}

/// Sheets of the page itself: `<style>` text, and local stylesheet links as
/// `@import` rules. Shadow trees are not searched.
pub fn ambient_styles(document: &LiveDocument) -> Vec<String> {
    let mut sheets = Vec::new();
    for id in document.descendants(document.root()) {
        match document.tag(id) {
            Some("style") => {
                let text: String = document
                    .children(id)
                    .iter()
                    .filter_map(|child| match document.data(*child) {
                        Some(NodeData::Text(text)) => Some(text.as_str()),
                        _ => None,
                    })
                    .collect();
                sheets.push(text);
            }
            Some("link") if is_local_stylesheet(document, id) => {
                if let Some(href) = document.attr(id, "href") {
                    sheets.push(format!("@import url(\"{}\");", href));
                }
            }
            _ => {}
        }
    }
    sheets
}

fn is_local_stylesheet(document: &LiveDocument, id: super::document::NodeId) -> bool {
    let rel = document.attr(id, "rel").unwrap_or("");
    let href = document.attr(id, "href").unwrap_or("");
    rel.split_ascii_whitespace()
        .any(|r| r.eq_ignore_ascii_case("stylesheet"))
        && !href.is_empty()
        && !href.contains("://")
        && !href.starts_with("//")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_native_display() {
        assert_eq!(native_display("div"), "block");
        assert_eq!(native_display("LI"), "list-item");
        assert_eq!(native_display("span"), "inline");
        assert_eq!(native_display("x-card"), "inline");
    }

    #[test]
    fn test_reset_sheet() {
        assert_eq!(reset_sheet("section"), ":host { display: block; }");
        assert_eq!(reset_sheet("button"), ":host { display: inline-block; }");
    }

    #[test]
    fn test_ambient_styles_skip_remote_links() {
        let doc = LiveDocument::parse(
            r#"<head><style>body { margin: 0 }</style><link rel="stylesheet" href="/site.css"><link rel="stylesheet" href="https://cdn.test/x.css"><link rel="icon" href="/f.ico"></head>"#,
        )
        .unwrap();
        assert_eq!(
            ambient_styles(&doc),
            vec![
                "body { margin: 0 }".to_string(),
                "@import url(\"/site.css\");".to_string()
            ]
        );
    }
}
