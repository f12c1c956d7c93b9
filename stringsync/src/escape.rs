//! Escaping of translated text before it is written into `strings.xml`.
//!
//! Android resource strings need unescaped `'` and `"` to be backslash-escaped
//! and literal line breaks written as `\n`. Markup is left intact. When the
//! base-language text is available, backslash sequences in the translation are
//! aligned with the ones used there, so a source that writes `\\n` keeps
//! writing `\\n` in every language.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref TAG: Regex = Regex::new(r"<[^>]+>").unwrap();
    static ref SINGLE_QUOTED_ATTRIBUTE: Regex = Regex::new(r"(\s+[\w:-]+)='([^']*)'").unwrap();
    static ref REDUNDANT_QUOTE_BACKSLASHES: Regex = Regex::new(r#"\\{2,}(["'])"#).unwrap();
}

/// Characters that form a meaningful escape when preceded by backslashes.
const SEQUENCE_FOLLOWERS: &[char] = &['n', 'r', 't', 'b', 'f', '"', '\'', 'd', 's', 'D', 'S'];

/// Escapes every `target` that is not already escaped.
///
/// A character preceded by an odd run of backslashes is already escaped; an
/// even run (including none) gets one more backslash.
fn escape_character(text: &str, target: char) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut backslash_run = 0usize;
    for ch in text.chars() {
        if ch == '\\' {
            backslash_run += 1;
        } else {
            if ch == target && backslash_run % 2 == 0 {
                out.push('\\');
            }
            backslash_run = 0;
        }
        out.push(ch);
    }
    out
}

/// Escapes apostrophes with a single backslash, preserving existing escapes.
pub fn escape_apostrophes(text: &str) -> String {
    escape_character(text, '\'')
}

/// Escapes double quotes with a single backslash, preserving existing escapes.
pub fn escape_double_quotes(text: &str) -> String {
    escape_character(text, '"')
}

fn escape_quotes(text: &str) -> String {
    escape_double_quotes(&escape_apostrophes(text))
}

fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

/// Turns literal line breaks into the two-character `\n` escape.
fn escape_line_breaks(text: &str) -> String {
    normalize_newlines(text).replace('\n', "\\n")
}

fn requote_attributes(tag: &str) -> String {
    SINGLE_QUOTED_ATTRIBUTE
        .replace_all(tag, "$1=\"$2\"")
        .into_owned()
}

fn has_balanced_markup(text: &str) -> bool {
    TAG.is_match(text) && text.matches('<').count() == text.matches('>').count()
}

/// Escapes the text between tags, leaving the tags themselves untouched apart
/// from single-quoted attributes, which are rewritten with double quotes.
fn escape_outside_tags(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut last = 0;
    for tag in TAG.find_iter(text) {
        out.push_str(&escape_quotes(&text[last..tag.start()]));
        out.push_str(&requote_attributes(tag.as_str()));
        last = tag.end();
    }
    out.push_str(&escape_quotes(&text[last..]));
    out
}

/// Backslash sequences of `text` as (follower, number of backslashes).
fn backslash_sequences(text: &str) -> Vec<(char, usize)> {
    let chars: Vec<char> = text.chars().collect();
    let mut sequences = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i] == '\\' {
            i += 1;
        }
        let Some(&follower) = chars.get(i) else {
            break;
        };
        if SEQUENCE_FOLLOWERS.contains(&follower) {
            sequences.push((follower, i - start));
        }
        i += 1;
    }
    sequences
}

/// Rewrites the backslash count of each escape sequence in `text` to the count
/// used by the next sequence with the same follower in `reference`.
fn align_with_reference(text: &str, reference: &str) -> String {
    let reference = normalize_newlines(reference);
    let reference_sequences = backslash_sequences(&reference);
    if reference_sequences.is_empty() {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut ref_index = 0;
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '\\' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i] == '\\' {
            i += 1;
        }
        let run = i - start;
        let Some(&follower) = chars.get(i) else {
            out.extend(std::iter::repeat_n('\\', run));
            break;
        };

        if SEQUENCE_FOLLOWERS.contains(&follower) {
            let found = reference_sequences[ref_index..]
                .iter()
                .position(|(c, _)| *c == follower);
            if let Some(offset) = found {
                let (_, wanted) = reference_sequences[ref_index + offset];
                ref_index += offset + 1;
                out.extend(std::iter::repeat_n('\\', wanted));
                out.push(follower);
                i += 1;
                continue;
            }
        }
        out.extend(std::iter::repeat_n('\\', run));
    }
    out
}

fn collapse_quote_backslashes(text: &str) -> String {
    REDUNDANT_QUOTE_BACKSLASHES
        .replace_all(text, "\\$1")
        .into_owned()
}

/// Escapes translated text for storage in a `<string>` or `<item>` element.
///
/// `reference` is the base-language text of the same resource; when given,
/// escape sequences are aligned with it. Never fails: text with unbalanced
/// angle brackets is escaped as plain text.
pub fn escape(text: &str, reference: Option<&str>) -> String {
    if text.is_empty() {
        return String::new();
    }

    let value = escape_line_breaks(text);
    let value = if has_balanced_markup(&value) {
        escape_outside_tags(&value)
    } else {
        escape_quotes(&value)
    };

    let value = match reference {
        Some(reference) if !reference.is_empty() => align_with_reference(&value, reference),
        _ => value,
    };
    collapse_quote_backslashes(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_apostrophes() {
        assert_eq!(escape_apostrophes("Don't"), r"Don\'t");
        assert_eq!(escape_apostrophes(r"Don\'t"), r"Don\'t");
        assert_eq!(escape_apostrophes(r"Don\\'t"), r"Don\\\'t");
        assert_eq!(escape_apostrophes(""), "");
    }

    #[test]
    fn test_escape_double_quotes() {
        assert_eq!(escape_double_quotes(r#"Say "hi""#), r#"Say \"hi\""#);
        assert_eq!(escape_double_quotes(r#"Say \"hi\""#), r#"Say \"hi\""#);
    }

    #[test]
    fn test_plain_text() {
        assert_eq!(escape("It's \"fine\"", None), r#"It\'s \"fine\""#);
        assert_eq!(escape("", None), "");
        assert_eq!(escape("Nothing to do", None), "Nothing to do");
    }

    #[test]
    fn test_line_breaks_become_escapes() {
        assert_eq!(escape("one\ntwo\r\nthree\rfour", None), r"one\ntwo\nthree\nfour");
    }

    #[test]
    fn test_markup_is_preserved() {
        assert_eq!(
            escape("Don't miss <a href='x'>this</a>", None),
            r#"Don\'t miss <a href="x">this</a>"#
        );
        assert_eq!(
            escape(r#"<b>"Bold"</b> isn't <i>italic</i>"#, None),
            r#"<b>\"Bold\"</b> isn\'t <i>italic</i>"#
        );
    }

    #[test]
    fn test_tag_attributes_are_not_escaped() {
        assert_eq!(
            escape(r#"<font color="red">Red's</font>"#, None),
            r#"<font color="red">Red\'s</font>"#
        );
    }

    #[test]
    fn test_unbalanced_brackets_fall_back_to_plain() {
        assert_eq!(escape("5 < 6 isn't <b>news", None), r"5 < 6 isn\'t <b>news");
        assert_eq!(escape("a > b's", None), r"a > b\'s");
    }

    #[test]
    fn test_redundant_backslashes_collapse() {
        assert_eq!(escape(r"Don\\'t", None), r"Don\'t");
        assert_eq!(escape(r#"\\\"quoted\\\""#, None), r#"\"quoted\""#);
    }

    #[test]
    fn test_alignment_with_reference() {
        // Reference writes a double-escaped newline; the translation follows it.
        assert_eq!(
            escape(r"Temporal\nDesbloqueo", Some(r"Temporary\\nUnblock")),
            r"Temporal\\nDesbloqueo"
        );
        assert_eq!(
            escape("Línea uno\nLínea dos", Some(r"Line one\\nLine two")),
            r"Línea uno\\nLínea dos"
        );
    }

    #[test]
    fn test_alignment_consumes_reference_in_order() {
        assert_eq!(
            escape(r"a\nb\nc", Some(r"x\\ny\nz")),
            r"a\\nb\nc"
        );
    }

    #[test]
    fn test_alignment_without_matching_reference_sequence() {
        assert_eq!(escape(r"tab\there", Some(r"new\nline")), r"tab\there");
        assert_eq!(escape(r"end\", Some(r"x\ny")), r"end\");
    }

    #[test]
    fn test_alignment_never_unescapes_quotes() {
        assert_eq!(escape("It's", Some(r"It\'s")), r"It\'s");
        assert_eq!(escape("It's", Some("Its")), r"It\'s");
    }

    #[test]
    fn test_escape_is_idempotent_for_plain_text() {
        for text in ["It's", r"\\'", "a\nb", r#"He said "x""#, r#"\\\\\""#, "\\"] {
            let once = escape(text, None);
            assert_eq!(escape(&once, None), once, "input: {:?}", text);
        }
    }
}
