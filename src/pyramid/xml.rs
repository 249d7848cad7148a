//! Minimal attribute extraction for the two pyramid descriptor dialects.
//!
//! Both descriptors are tiny, fixed-shape XML documents (a handful of
//! attributes, no nesting ambiguity, no namespaces to resolve), so they are
//! scanned directly instead of pulling in an XML parser.

/// Extract the value of `name="value"` (or single-quoted) from a document.
///
/// The attribute name must be preceded by whitespace so that `Size` never
/// matches inside `TileSize`. Matching is case-sensitive; both descriptor
/// dialects use fixed casing.
pub(crate) fn attribute(document: &str, name: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(relative) = document[search_from..].find(name) {
        let start = search_from + relative;
        search_from = start + name.len();

        // Attribute names are delimited by whitespace on the left
        let preceded_ok = document[..start]
            .chars()
            .next_back()
            .is_some_and(|c| c.is_whitespace());
        if !preceded_ok {
            continue;
        }

        let rest = document[start + name.len()..].trim_start();
        let Some(rest) = rest.strip_prefix('=') else {
            continue;
        };
        let rest = rest.trim_start();

        let quote = rest.chars().next()?;
        if quote != '"' && quote != '\'' {
            continue;
        }
        let rest = &rest[1..];
        let end = rest.find(quote)?;
        return Some(rest[..end].to_string());
    }
    None
}

/// Extract an attribute and parse it as an integer.
pub(crate) fn attribute_u32(document: &str, name: &str) -> Option<u32> {
    attribute(document, name)?.trim().parse().ok()
}
