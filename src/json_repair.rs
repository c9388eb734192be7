//! Locate and repair the JSON object inside a model's free-text answer.
//!
//! Models wrap JSON in prose or code fences and, when they hit the output
//! token limit, stop in the middle of a structure. [`extract_json`] finds the
//! first parseable object and closes whatever a truncated answer left open.

use log::{debug, warn};
use std::fmt;

/// Raw delimiter counts of a piece of text, used as failure diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BraceBalance {
    pub open_braces: usize,
    pub close_braces: usize,
    pub open_brackets: usize,
    pub close_brackets: usize,
}

impl BraceBalance {
    pub fn of(text: &str) -> Self {
        let mut balance = BraceBalance::default();
        for c in text.chars() {
            match c {
                '{' => balance.open_braces += 1,
                '}' => balance.close_braces += 1,
                '[' => balance.open_brackets += 1,
                ']' => balance.close_brackets += 1,
                _ => {}
            }
        }
        balance
    }

    pub fn is_balanced(&self) -> bool {
        self.open_braces == self.close_braces && self.open_brackets == self.close_brackets
    }
}

impl fmt::Display for BraceBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "braces {}/{}, brackets {}/{}",
            self.open_braces, self.close_braces, self.open_brackets, self.close_brackets
        )
    }
}

/// Remove a surrounding ```` ```json ```` / ```` ``` ```` fence
pub fn strip_code_fences(text: &str) -> &str {
    let mut t = text.trim();
    if let Some(rest) = t.strip_prefix("```") {
        let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        t = rest.strip_prefix('\n').unwrap_or(rest);
        if let Some(body) = t.trim_end().strip_suffix("```") {
            t = body;
        }
        t = t.trim();
    }
    t
}

enum Scan {
    /// Object closed; value is the byte length of the object
    Complete(usize),
    /// Text ended with delimiters still open
    Truncated(Truncation),
}

struct Truncation {
    open: Vec<char>,
    in_string: bool,
    /// A lone `\` ended the text inside a string
    escaped: bool,
    /// Byte offset just after the innermost opener or at its last `,`
    last_boundary: usize,
}

/// Walk an object starting at `text[0] == '{'`, ignoring delimiters inside strings
fn scan_object(text: &str) -> Scan {
    let mut open: Vec<char> = Vec::new();
    let mut boundaries: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' | '[' => {
                open.push(c);
                boundaries.push(i + 1);
            }
            ',' => {
                if let Some(last) = boundaries.last_mut() {
                    *last = i;
                }
            }
            '}' | ']' => {
                let expected = if c == '}' { '{' } else { '[' };
                if open.last() == Some(&expected) {
                    open.pop();
                    boundaries.pop();
                }
                if open.is_empty() {
                    return Scan::Complete(i + c.len_utf8());
                }
            }
            _ => {}
        }
    }

    Scan::Truncated(Truncation {
        open,
        in_string,
        escaped,
        last_boundary: boundaries.last().copied().unwrap_or(text.len()),
    })
}

fn parses(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(candidate).is_ok()
}

fn push_closers(repaired: &mut String, open: &[char]) {
    for c in open.iter().rev() {
        repaired.push(if *c == '{' { '}' } else { ']' });
    }
}

/// Close a truncated object: finish an open string, drop a dangling comma,
/// then close arrays and objects innermost first.
///
/// When the tail is a half-written member (a bare key, a cut key or a cut
/// literal) the member is dropped back to the last `,` or opener instead.
fn close_truncated(fragment: &str, cut: &Truncation) -> String {
    let mut repaired = fragment.trim_end().to_string();

    if cut.in_string {
        if cut.escaped {
            repaired.pop();
        }
        repaired.push('"');
    }

    let trimmed_len = repaired.trim_end_matches(|c: char| c == ',' || c.is_whitespace()).len();
    repaired.truncate(trimmed_len);

    if repaired.ends_with(':') {
        repaired.push_str("null");
    }

    let unmatched_brackets = cut.open.iter().filter(|&&c| c == '[').count();
    let unmatched_braces = cut.open.len() - unmatched_brackets;
    warn!(
        "JSON appears to be truncated, closing {} bracket(s) and {} brace(s)",
        unmatched_brackets, unmatched_braces
    );

    push_closers(&mut repaired, &cut.open);
    if parses(&repaired) {
        return repaired;
    }

    debug!("Dropping incomplete trailing member at byte {}", cut.last_boundary);
    let mut shortened = fragment[..cut.last_boundary].trim_end().to_string();
    push_closers(&mut shortened, &cut.open);
    shortened
}

/// Return the JSON object embedded in `text`, repairing truncation.
///
/// Falls back to the greedy first-`{`-to-last-`}` span and finally to the
/// trimmed input, leaving the final verdict to the validator.
pub fn extract_json(text: &str) -> String {
    let t = strip_code_fences(text);

    let mut search_from = 0;
    while let Some(offset) = t[search_from..].find('{') {
        let start = search_from + offset;
        match scan_object(&t[start..]) {
            Scan::Complete(len) => {
                let candidate = &t[start..start + len];
                if parses(candidate) {
                    debug!("Found balanced JSON candidate at byte {}", start);
                    return candidate.to_string();
                }
                debug!("Balanced candidate at byte {} does not parse, scanning on", start);
                search_from = start + len;
            }
            Scan::Truncated(cut) => return close_truncated(&t[start..], &cut),
        }
    }

    if let (Some(first), Some(last)) = (t.find('{'), t.rfind('}')) {
        if first < last {
            return t[first..=last].to_string();
        }
    }

    t.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn parsed(text: &str) -> Value {
        serde_json::from_str(&extract_json(text)).unwrap()
    }

    #[test]
    fn test_plain_object() {
        assert_eq!(extract_json(r#"{"a":1}"#), r#"{"a":1}"#);
    }

    #[test]
    fn test_prose_wrapped() {
        let text = r#"Đây là kết quả: {"dish_name":"Bún chả","ingredients":[]} Chúc ngon miệng!"#;
        assert_eq!(parsed(text), json!({"dish_name": "Bún chả", "ingredients": []}));
    }

    #[test]
    fn test_code_fence() {
        let text = "```json\n{\"dish_name\": \"Cơm tấm\"}\n```";
        assert_eq!(strip_code_fences(text), "{\"dish_name\": \"Cơm tấm\"}");
        assert_eq!(parsed(text), json!({"dish_name": "Cơm tấm"}));
    }

    #[test]
    fn test_truncated_ingredient_list() {
        let text = r#"{"dish_name":"Phở bò","ingredients":[{"name":"bánh phở","quantity":"200","unit":"g""#;
        assert_eq!(
            parsed(text),
            json!({
                "dish_name": "Phở bò",
                "ingredients": [{"name": "bánh phở", "quantity": "200", "unit": "g"}]
            })
        );
    }

    #[test]
    fn test_truncated_after_comma() {
        let text = r#"{"ingredients":[{"name":"gừng","quantity":"1","unit":"củ"},"#;
        assert_eq!(
            parsed(text),
            json!({"ingredients": [{"name": "gừng", "quantity": "1", "unit": "củ"}]})
        );
    }

    #[test]
    fn test_truncated_inside_string() {
        let text = r#"{"dish_name":"Phở b"#;
        assert_eq!(parsed(text), json!({"dish_name": "Phở b"}));
    }

    #[test]
    fn test_truncated_after_escaped_backslash() {
        assert_eq!(parsed(r#"{"dish_name":"a\\"#), json!({"dish_name": "a\\"}));
        assert_eq!(parsed(r#"{"dish_name":"a\"#), json!({"dish_name": "a"}));
    }

    #[test]
    fn test_truncated_member_is_dropped() {
        let head = r#"{"ingredients":[{"name":"hành","quantity":"2""#;
        let expected = json!({"ingredients": [{"name": "hành", "quantity": "2"}]});

        for tail in [r#","unit""#, r#","un"#, r#","unit":nu"#, r#","unit"   "#] {
            let text = format!("{head}{tail}");
            assert_eq!(parsed(&text), expected, "{text}");
        }
    }

    #[test]
    fn test_truncated_first_member_leaves_empty_object() {
        assert_eq!(
            parsed(r#"{"ingredients":[{"na"#),
            json!({"ingredients": [{}]})
        );
    }

    #[test]
    fn test_braces_inside_strings_are_ignored() {
        let text = r#"{"notes":["dùng {tùy ý}"],"ingredients":[]} trailing }"#;
        assert_eq!(
            parsed(text),
            json!({"notes": ["dùng {tùy ý}"], "ingredients": []})
        );
    }

    #[test]
    fn test_skips_invalid_candidate() {
        let text = r#"{not json} then {"dish_name":"Chả giò"}"#;
        assert_eq!(parsed(text), json!({"dish_name": "Chả giò"}));
    }

    #[test]
    fn test_no_object_returns_trimmed_input() {
        assert_eq!(extract_json("  no json here  "), "no json here");
    }

    #[test]
    fn test_brace_balance() {
        let balance = BraceBalance::of(r#"{"a":[{"b":1}"#);
        assert_eq!(balance.open_braces, 2);
        assert_eq!(balance.close_braces, 1);
        assert_eq!(balance.open_brackets, 1);
        assert_eq!(balance.close_brackets, 0);
        assert!(!balance.is_balanced());
        assert_eq!(balance.to_string(), "braces 2/1, brackets 1/0");
    }
}
