use scraper::{Html, Node};

/// Elements whose text never reaches the reader.
const HIDDEN_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];

/// Visible text of an HTML page, one chunk per line.
///
/// Runs of two or more spaces inside a line are treated as chunk breaks, which
/// keeps layout-heavy event pages from collapsing into one long line.
pub fn extract_text(html: &str) -> String {
    let document = Html::parse_document(html);

    let mut pieces: Vec<&str> = Vec::new();
    for node in document.tree.root().descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node.ancestors().any(|ancestor| match ancestor.value() {
                Node::Element(element) => HIDDEN_ELEMENTS.contains(&element.name()),
                _ => false,
            });
            if !hidden {
                pieces.push(&**text);
            }
        }
    }

    pieces
        .join("\n")
        .lines()
        .flat_map(|line| line.trim().split("  "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Cut `text` to at most `max_chars` characters without splitting a code point.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
