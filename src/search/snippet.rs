//! Context snippet extraction for display.

/// Extract a bounded excerpt of `text` positioned around the query's first
/// lexical occurrence.
///
/// The anchor is the first word of the query (case-insensitive), falling back
/// to the whole query string, falling back to the leading `max_length`
/// characters. The window is asymmetric: a quarter of `max_length` before the
/// match and three quarters after it, so the matched phrase's continuation
/// stays readable. Ellipses mark clipped edges. All arithmetic is performed
/// on char positions, never raw byte offsets.
#[inline]
pub fn context_snippet(text: &str, query: &str, max_length: usize) -> String {
    if text.is_empty() {
        return String::new();
    }

    let lower_text = text.to_lowercase();
    let lower_query = query.to_lowercase();
    let text_chars: Vec<char> = text.chars().collect();

    let mut match_index = lower_query
        .split_whitespace()
        .next()
        .and_then(|first_word| lower_text.find(first_word));

    if match_index.is_none() && !lower_query.is_empty() {
        match_index = lower_text.find(&lower_query);
    }

    let Some(byte_index) = match_index else {
        // No lexical overlap at all: lead with the start of the text.
        if text_chars.len() > max_length {
            let head: String = text_chars.iter().take(max_length).collect();
            return format!("{head}...");
        }
        return text.to_string();
    };

    let match_char = lower_text
        .get(..byte_index)
        .map_or(0, |prefix| prefix.chars().count())
        .min(text_chars.len());
    let query_chars = query.chars().count();

    let start = match_char.saturating_sub(max_length / 4);
    let end = (match_char + query_chars + max_length * 3 / 4).min(text_chars.len());

    let mut snippet: String = text_chars
        .get(start..end)
        .unwrap_or_default()
        .iter()
        .collect();

    if start > 0 {
        snippet = format!("...{snippet}");
    }
    if end < text_chars.len() {
        snippet.push_str("...");
    }
    snippet
}
