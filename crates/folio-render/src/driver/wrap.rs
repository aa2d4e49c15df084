//! Line breaking for character-cell text.
//!
//! [`delineate`] walks a string and hands each output line to a callback.
//! Measuring and drawing run the same walk, so a measured extent always
//! matches what gets drawn.

use unicode_width::UnicodeWidthChar;

use super::Extent;

/// Display width of one character; control characters take no space.
pub fn char_width(c: char) -> usize {
    if c == '\t' {
        return 1;
    }
    c.width().unwrap_or(0)
}

/// Display width of a string.
pub fn str_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

/// Break `text` into lines no wider than `width` columns.
///
/// Explicit newlines always break; a single trailing newline ends the last
/// line without starting another. Within a paragraph the break falls on the
/// last whitespace at or before the limit; a word longer than the limit is
/// cut at the limit. Whitespace following a break is skipped. At most
/// `max_lines` lines are emitted.
///
/// `emit` receives the line index and the line text. Returns the widest line
/// and the number of lines emitted.
pub fn delineate<'a, F>(text: &'a str, width: usize, max_lines: Option<usize>, mut emit: F) -> Extent
where
    F: FnMut(usize, &'a str),
{
    let limit = width.max(1);
    let max_lines = max_lines.unwrap_or(usize::MAX);
    let mut extent = Extent::default();
    if text.is_empty() {
        return extent;
    }

    let text = text.strip_suffix('\n').unwrap_or(text);
    for paragraph in text.split('\n') {
        let mut rest = paragraph;
        loop {
            if extent.height >= max_lines {
                return extent;
            }
            let (line, next) = next_line(rest, limit);
            let line = line.trim_end();
            extent.width = extent.width.max(str_width(line));
            emit(extent.height, line);
            extent.height += 1;

            rest = next.trim_start();
            if rest.is_empty() {
                break;
            }
        }
    }
    extent
}

/// Split off the first line of `text`: `(line, remainder)`.
fn next_line(text: &str, limit: usize) -> (&str, &str) {
    let mut used = 0;
    let mut fit = text.len();
    for (index, c) in text.char_indices() {
        let w = char_width(c);
        if used + w > limit {
            fit = index;
            break;
        }
        used += w;
    }
    if fit == text.len() {
        return (text, "");
    }

    if text[fit..].starts_with(char::is_whitespace) {
        return text.split_at(fit);
    }
    if let Some((index, _)) = text[..fit]
        .char_indices()
        .rev()
        .find(|(index, c)| *index > 0 && c.is_whitespace())
    {
        return text.split_at(index);
    }

    // No break opportunity: cut at the limit, but always make progress.
    let fit = if fit == 0 {
        text.chars().next().map_or(text.len(), char::len_utf8)
    } else {
        fit
    };
    text.split_at(fit)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn words(text: &str) -> String {
        text.split_whitespace().collect()
    }

    proptest! {
        #[test]
        fn lines_fit_the_width(
            text in "[a-z]{1,12}( [a-z]{1,12}){0,12}",
            width in 1usize..30,
        ) {
            let mut widest = 0;
            delineate(&text, width, None, |_, line| widest = widest.max(str_width(line)));
            prop_assert!(widest <= width, "line of width {} exceeds {}", widest, width);
        }

        #[test]
        fn wrapping_keeps_every_character(
            text in "[a-zA-Z0-9]{0,10}([ \n][a-zA-Z0-9]{0,10}){0,10}",
            width in 1usize..25,
        ) {
            let mut joined = String::new();
            let extent = delineate(&text, width, None, |_, line| joined.push_str(line));
            prop_assert_eq!(words(&joined), words(&text));
            prop_assert!(extent.width <= width);
        }

        #[test]
        fn line_count_is_capped(
            text in "[a-z ]{0,80}",
            width in 1usize..10,
            cap in 1usize..6,
        ) {
            let mut count = 0;
            let extent = delineate(&text, width, Some(cap), |_, _| count += 1);
            prop_assert!(count <= cap);
            prop_assert_eq!(count, extent.height);
        }
    }
}
