use crate::config::JoinPolicy;
use crate::constants::LINE_BREAK;
use crate::utils::strip_tags;

/// Reassemble the markup fragments of one question or solution.
///
/// The first fragment is kept verbatim. Each later fragment either starts a new
/// line (images, and under [`JoinPolicy::Strict`] long prose) or is inlined with
/// one space, which keeps formulas that the converter split across paragraphs
/// in one piece.
pub fn smart_join(fragments: &[String], policy: JoinPolicy, long_fragment_chars: usize) -> String {
    let mut joined = String::new();

    for fragment in fragments.iter().filter(|f| !f.trim().is_empty()) {
        if joined.is_empty() {
            joined.push_str(fragment);
            continue;
        }

        let separator = if breaks_line(&joined, fragment, policy, long_fragment_chars) {
            LINE_BREAK
        } else {
            " "
        };
        joined.push_str(separator);
        joined.push_str(fragment);
    }

    joined
}

fn breaks_line(joined: &str, fragment: &str, policy: JoinPolicy, long_fragment_chars: usize) -> bool {
    if fragment.contains("<img") {
        return true;
    }
    if inside_inline_math(joined) {
        return false;
    }
    let text = strip_tags(fragment);
    let text = text.trim();
    if looks_like_formula_start(text) {
        return false;
    }
    policy == JoinPolicy::Strict && text.chars().count() > long_fragment_chars
}

/// True while an unescaped `$` is still waiting for its closing partner.
fn inside_inline_math(markup: &str) -> bool {
    let mut open = false;
    let mut escaped = false;
    for c in markup.chars() {
        match c {
            '\\' => escaped = !escaped,
            '$' if !escaped => open = !open,
            _ => escaped = false,
        }
        if c == '$' {
            escaped = false;
        }
    }
    open
}

/// Fragments opening with math or an operator continue the previous expression.
pub fn looks_like_formula_start(text: &str) -> bool {
    if text.starts_with("\\(") || text.starts_with("\\[") {
        return true;
    }
    text.chars().next().is_some_and(|c| {
        matches!(
            c,
            '$' | '\\'
                | '='
                | '+'
                | '-'
                | '*'
                | '/'
                | '^'
                | '_'
                | ')'
                | ']'
                | '}'
                | '<'
                | '>'
                | '≤'
                | '≥'
                | '≠'
                | '±'
                | '×'
                | '÷'
                | ','
                | ';'
                | ':'
                | '.'
        )
    })
}
