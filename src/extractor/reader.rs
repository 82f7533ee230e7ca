use scraper::{ElementRef, Html, Node, Selector};

use crate::extractor::model::ExtractedPage;

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: [&str; 3] = ["script", "style", "template"];

/// Reduce an HTML document to its title and visible text.
///
/// The title falls back to `url` when the document has no non-blank
/// `<title>`. Text nodes are trimmed, blank ones dropped, and the rest joined
/// with single spaces.
pub fn extract(html: &str, url: &str) -> ExtractedPage {
    let document = Html::parse_document(html);

    let title = extract_title(&document).unwrap_or_else(|| url.to_string());
    let text = visible_text(document.root_element());

    ExtractedPage {
        url: url.to_string(),
        title,
        text,
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;
    let element = document.select(&selector).next()?;
    let title = element.text().collect::<String>().trim().to_string();
    (!title.is_empty()).then_some(title)
}

fn visible_text(root: ElementRef<'_>) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in root.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| HIDDEN_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(" ")
}
