//! Static text measurement.
//!
//! Charts are rendered without a font stack, so label sizing relies on a
//! per-character width table calibrated for the theme font at a 1px
//! baseline. Widths scale linearly with font size; characters outside the
//! table fall back to the average character width.

const AVG_CHAR_WIDTH: f64 = 0.556;

fn char_width_factor(ch: char) -> f64 {
    // Advance widths sampled from the Roboto/Arial metrics tables,
    // normalized to the em size.
    match ch {
        ' ' | '.' | ',' | ':' | ';' | '!' | '/' | '\\' => 0.278,
        '\'' => 0.191,
        '"' => 0.355,
        '-' | '(' | ')' | '[' | ']' | 'r' => 0.333,
        '|' => 0.260,
        'A' | 'B' | 'E' | 'K' | 'P' | 'S' | 'V' | 'X' | 'Y' => 0.667,
        'C' | 'D' | 'H' | 'N' | 'R' | 'U' => 0.722,
        'F' | 'T' | 'Z' => 0.611,
        'G' | 'O' | 'Q' => 0.778,
        'I' => 0.278,
        'J' => 0.500,
        'L' => 0.556,
        'M' => 0.833,
        'W' => 0.944,
        'a' | 'b' | 'd' | 'e' | 'g' | 'h' | 'n' | 'o' | 'p' | 'q' | 'u' => 0.556,
        'c' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 0.500,
        'f' | 't' => 0.278,
        'i' | 'j' | 'l' => 0.222,
        'm' => 0.833,
        'w' => 0.722,
        '0'..='9' | '$' | '#' | '_' => 0.556,
        '%' => 0.889,
        '&' => 0.667,
        '@' => 1.015,
        '+' | '=' | '<' | '>' | '~' => 0.584,
        '…' => 0.889,
        _ => AVG_CHAR_WIDTH,
    }
}

/// Estimated pixel width of `text` at `font_size`.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    text.chars().map(char_width_factor).sum::<f64>() * font_size
}

/// Shortens `text` with a trailing ellipsis so it fits in `max_width`.
pub fn truncate_label(text: &str, max_width: f64, font_size: f64) -> String {
    if text_width(text, font_size) <= max_width {
        return text.to_string();
    }
    let ellipsis_width = char_width_factor('…') * font_size;
    if ellipsis_width > max_width {
        return String::new();
    }
    let budget = max_width - ellipsis_width;
    let mut kept = String::new();
    let mut used = 0.0;
    for ch in text.chars() {
        let width = char_width_factor(ch) * font_size;
        if used + width > budget {
            break;
        }
        kept.push(ch);
        used += width;
    }
    while kept.ends_with(' ') {
        kept.pop();
    }
    format!("{kept}…")
}

/// Greedy word wrap against a pixel budget. Words longer than the budget
/// get a line of their own rather than being split.
pub fn wrap_text(text: &str, max_width: f64, font_size: f64) -> Vec<String> {
    if text_width(text, font_size) <= max_width {
        return vec![text.to_string()];
    }

    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if text_width(&candidate, font_size) > max_width {
            if !current.is_empty() {
                lines.push(current.clone());
                current.clear();
            }
            current.push_str(word);
        } else {
            current = candidate;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
