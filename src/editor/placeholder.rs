//! Sentinel characters that keep empty nodes focusable, and the whitespace rules built on them.

/// Zero-width placeholder that gives an otherwise empty node a caret position.
pub const ZERO_WIDTH: char = '\u{FEFF}';
pub const NBSP: char = '\u{00A0}';
pub const TAB: &str = "\u{00A0}\u{00A0}\u{00A0}\u{00A0}";

/// Any whitespace, the zero-width placeholder included.
pub fn is_space(ch: char) -> bool {
    ch.is_whitespace() || ch == ZERO_WIDTH
}

/// Whitespace a renderer may collapse or wrap at.
pub fn is_breakable_space(ch: char) -> bool {
    is_space(ch) && ch != NBSP && ch != ZERO_WIDTH
}

pub fn is_visible_char(ch: char) -> bool {
    !is_space(ch) || ch == NBSP || ch == ZERO_WIDTH
}

pub fn has_visible_char(text: &str) -> bool {
    text.chars().any(is_visible_char)
}

/// Only breakable whitespace (or nothing).
pub fn is_blank(text: &str) -> bool {
    text.chars().all(is_breakable_space)
}

/// Only whitespace, NBSP and placeholders (or nothing).
pub fn is_only_spaces(text: &str) -> bool {
    text.chars().all(is_space)
}

/// A caret holder: one or more zero-width chars and nothing else.
pub fn is_placeholder_text(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| ch == ZERO_WIDTH)
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn char_at(text: &str, index: usize) -> Option<char> {
    text.chars().nth(index)
}

pub fn slice_chars(text: &str, start: usize, end: usize) -> String {
    text.chars()
        .skip(start)
        .take(end.saturating_sub(start))
        .collect()
}

pub fn remove_char(text: &str, index: usize) -> String {
    text.chars()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, ch)| ch)
        .collect()
}

pub fn insert_str_at(text: &str, index: usize, insert: &str) -> String {
    let mut out = slice_chars(text, 0, index);
    out.push_str(insert);
    out.push_str(&slice_chars(text, index, char_len(text)));
    out
}

pub fn count_leading(text: &str, pred: impl Fn(char) -> bool) -> usize {
    text.chars().take_while(|ch| pred(*ch)).count()
}

pub fn count_trailing(text: &str, pred: impl Fn(char) -> bool) -> usize {
    text.chars().rev().take_while(|ch| pred(*ch)).count()
}

/// A lone space at either end, next to a visible char, turns into NBSP.
pub fn secure_extreme_single_space(text: &str) -> String {
    let mut chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    if len >= 2 && is_space(chars[len - 1]) && is_visible_char(chars[len - 2]) {
        chars[len - 1] = NBSP;
    }
    if len >= 2 && is_space(chars[0]) && is_visible_char(chars[1]) {
        chars[0] = NBSP;
    }
    chars.into_iter().collect()
}

/// Secures lone extreme spaces, then strips the remaining breakable runs at both ends.
/// Returns the new text and the number of chars removed at the start and at the end.
pub fn remove_extreme_breakable_space(text: &str) -> (String, usize, usize) {
    let secured = secure_extreme_single_space(text);
    let start = count_leading(&secured, is_breakable_space);
    let total = char_len(&secured);
    if start == total {
        return (String::new(), start, 0);
    }
    let end = count_trailing(&secured, is_breakable_space);
    (slice_chars(&secured, start, total - end), start, end)
}

/// Replaces the leading whitespace run with `with`.
pub fn replace_leading_spaces(text: &str, with: &str) -> String {
    let count = count_leading(text, is_space);
    if count == 0 {
        return text.to_string();
    }
    let mut out = with.to_string();
    out.push_str(&slice_chars(text, count, char_len(text)));
    out
}

/// Replaces the trailing whitespace run with `with`.
pub fn replace_trailing_spaces(text: &str, with: &str) -> String {
    let count = count_trailing(text, is_space);
    if count == 0 {
        return text.to_string();
    }
    let mut out = slice_chars(text, 0, char_len(text) - count);
    out.push_str(with);
    out
}

/// Whitespace space followed by something other than whitespace or `<`.
pub fn starts_with_space_before_char(text: &str) -> bool {
    let count = count_leading(text, is_space);
    count > 0 && char_at(text, count).is_some_and(|ch| ch != '<')
}

/// Something other than whitespace or `>`, then a whitespace run up to the end.
pub fn ends_with_space_after_char(text: &str) -> bool {
    let count = count_trailing(text, is_space);
    let len = char_len(text);
    count > 0 && count < len && char_at(text, len - count - 1).is_some_and(|ch| ch != '>')
}

/// Tidies whitespace after typing. Leading and trailing blank runs are kept. Inside, NBSP becomes
/// a plain space and every run of two or more spaces becomes the same number of NBSP.
/// The char count never changes.
pub fn normalize_typed_whitespace(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let start = chars.iter().take_while(|ch| is_space(**ch)).count();
    if start == chars.len() {
        return text.to_string();
    }
    let end = chars.iter().rev().take_while(|ch| is_space(**ch)).count();
    let middle: Vec<char> = chars[start..chars.len() - end]
        .iter()
        .map(|ch| if *ch == NBSP { ' ' } else { *ch })
        .collect();

    let mut cleaned = Vec::with_capacity(middle.len());
    let mut idx = 0;
    while idx < middle.len() {
        if is_space(middle[idx]) {
            let run = middle[idx..].iter().take_while(|ch| is_space(**ch)).count();
            if run >= 2 {
                cleaned.extend(std::iter::repeat_n(NBSP, run));
            } else {
                cleaned.push(middle[idx]);
            }
            idx += run;
        } else {
            cleaned.push(middle[idx]);
            idx += 1;
        }
    }

    chars[..start]
        .iter()
        .chain(cleaned.iter())
        .chain(chars[chars.len() - end..].iter())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_width_counts_as_visible_but_not_as_blank() {
        assert!(is_visible_char(ZERO_WIDTH));
        assert!(is_visible_char(NBSP));
        assert!(!is_visible_char(' '));
        assert!(is_blank(" \n\t"));
        assert!(!is_blank("\u{FEFF}"));
        assert!(is_only_spaces("\u{FEFF} \u{00A0}"));
    }

    #[test]
    fn placeholder_text_is_only_zero_width() {
        assert!(is_placeholder_text("\u{FEFF}"));
        assert!(is_placeholder_text("\u{FEFF}\u{FEFF}"));
        assert!(!is_placeholder_text(""));
        assert!(!is_placeholder_text("\u{FEFF} "));
    }

    #[test]
    fn single_extreme_spaces_are_secured() {
        assert_eq!(secure_extreme_single_space(" a b "), "\u{00A0}a b\u{00A0}");
        assert_eq!(secure_extreme_single_space("  a"), "  a");
    }

    #[test]
    fn extreme_breakable_runs_are_stripped() {
        let (text, start, end) = remove_extreme_breakable_space("  ab   ");
        assert_eq!(text, "ab");
        assert_eq!((start, end), (2, 3));

        let (text, start, end) = remove_extreme_breakable_space(" ab");
        assert_eq!(text, "\u{00A0}ab");
        assert_eq!((start, end), (0, 0));
    }

    #[test]
    fn typed_whitespace_keeps_edges_and_expands_runs() {
        assert_eq!(normalize_typed_whitespace("a\u{00A0}b"), "a b");
        assert_eq!(normalize_typed_whitespace("a   b"), "a\u{00A0}\u{00A0}\u{00A0}b");
        assert_eq!(normalize_typed_whitespace("\u{00A0}a\u{00A0}"), "\u{00A0}a\u{00A0}");
        assert_eq!(normalize_typed_whitespace("\u{00A0}"), "\u{00A0}");
    }

    #[test]
    fn seam_space_detection() {
        assert!(starts_with_space_before_char("  to edit"));
        assert!(!starts_with_space_before_char("   "));
        assert!(ends_with_space_after_char("dom  "));
        assert!(!ends_with_space_after_char("  "));
    }
}
