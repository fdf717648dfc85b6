//! Named predicates for the loose textual conventions of exam documents:
//! question headers ("Câu 1:"), solution headers ("Lời giải"), option markers
//! ("A.") and the answer / duration phrases found in free text.

use lazy_regex::regex;

use crate::models::ExamOption;
use crate::utils::{decode_entities, strip_tags};

/// A recognized question header at the start of a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionStart {
    /// Number written in the header, if any ("Câu 12:" -> 12)
    pub number: Option<u32>,
    /// Header text as matched, e.g. "Câu 12:"
    pub label: String,
}

/// A recognized solution / answer-key header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionStart {
    pub keyword: String,
}

/// One `<Label>.` marker inside a block's text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionMarker {
    pub label: String,
    /// Byte offset of the label
    pub start: usize,
    /// Byte offset just past the terminating dot
    pub end: usize,
}

/// Detect "Câu 1:", "Bài 2.", "Question 3:" or a bare "4." header.
pub fn is_question_start(plain_text: &str) -> Option<QuestionStart> {
    let re = regex!(
        r"(?i)^\s*(?:(?:câu|bài|question|problem|item|exercise)\s*(\d+)?\s*[:.]|(\d+)\s*[:.](?:\s|$))"
    );
    let caps = re.captures(plain_text)?;
    let number = caps
        .get(1)
        .or_else(|| caps.get(2))
        .and_then(|m| m.as_str().parse::<u32>().ok());
    let label = caps.get(0).map(|m| m.as_str().trim().to_string())?;
    Some(QuestionStart { number, label })
}

/// Detect a header opening the solution / answer-key region.
pub fn is_solution_start(plain_text: &str) -> Option<SolutionStart> {
    let re = regex!(
        r"(?i)^\s*(lời\s+giải|hướng\s+dẫn|bảng\s+đáp\s+án|hết|solution|explanation|answer\s+key|end)\b"
    );
    re.captures(plain_text).and_then(|caps| {
        caps.get(1).map(|m| SolutionStart {
            keyword: m.as_str().to_string(),
        })
    })
}

/// Find every `<Label>.` marker, left to right. Labels glued to a preceding
/// letter ("DNA.") are not markers.
pub fn find_option_markers(text: &str, labels: &[String]) -> Vec<OptionMarker> {
    let mut candidates: Vec<&String> = labels.iter().filter(|l| !l.is_empty()).collect();
    // Longest first so "AB" wins over "A".
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut markers = Vec::new();
    let mut next_allowed = 0usize;

    for (idx, _) in text.char_indices() {
        if idx < next_allowed {
            continue;
        }
        let glued = text[..idx]
            .chars()
            .next_back()
            .is_some_and(|prev| prev.is_alphabetic());
        if glued {
            continue;
        }
        let rest = &text[idx..];
        if let Some(label) = candidates
            .iter()
            .find(|l| rest.starts_with(l.as_str()) && rest[l.len()..].starts_with('.'))
        {
            let end = idx + label.len() + 1;
            markers.push(OptionMarker {
                label: (*label).clone(),
                start: idx,
                end,
            });
            next_allowed = end;
        }
    }

    markers
}

/// A block carries options when it opens with the first label's marker or
/// holds markers for at least two distinct labels.
pub fn is_option_bearing(markers: &[OptionMarker], labels: &[String]) -> bool {
    let Some(first) = markers.first() else {
        return false;
    };
    let opens_with_first = first.start == 0 && labels.first().is_some_and(|l| *l == first.label);
    if opens_with_first {
        return true;
    }
    let mut distinct: Vec<&str> = markers.iter().map(|m| m.label.as_str()).collect();
    distinct.sort_unstable();
    distinct.dedup();
    distinct.len() >= 2
}

/// Split an option-bearing block into options in the order they appear.
/// Returns `None` when the block is ordinary question text.
pub fn extract_options(plain_text: &str, labels: &[String]) -> Option<Vec<ExamOption>> {
    let text = plain_text.trim();
    let markers = find_option_markers(text, labels);
    if !is_option_bearing(&markers, labels) {
        return None;
    }

    let options = markers
        .iter()
        .enumerate()
        .map(|(idx, marker)| {
            let stop = markers.get(idx + 1).map_or(text.len(), |next| next.start);
            ExamOption {
                id: marker.label.clone(),
                text: text[marker.end..stop].trim().to_string(),
            }
        })
        .collect();

    Some(options)
}

/// Find "Chọn B", "Đáp án: C", "Answer is D" in solution markup.
/// Returns the canonical label from `labels`.
pub fn detect_answer(solution_markup: &str, labels: &[String]) -> Option<String> {
    let text = decode_entities(&strip_tags(solution_markup));
    let header = regex!(
        r"(?i)(?:chọn|đáp\s+án|answer|choose)(?:\s+(?:đúng|correct))?(?:\s+(?:là|is))?\s*[:.]?\s*"
    );

    let mut candidates: Vec<&String> = labels.iter().filter(|l| !l.is_empty()).collect();
    candidates.sort_by(|a, b| b.len().cmp(&a.len()));

    for m in header.find_iter(&text) {
        let rest = &text[m.end()..];
        for label in &candidates {
            let width = label.chars().count();
            let head: String = rest.chars().take(width).collect();
            if head.chars().count() != width || head.to_lowercase() != label.to_lowercase() {
                continue;
            }
            let followed_by_letter = rest
                .chars()
                .nth(width)
                .is_some_and(|c| c.is_alphabetic());
            if !followed_by_letter {
                return Some((*label).clone());
            }
        }
    }
    None
}

/// Find "Thời gian làm bài: 90 phút" (or "Time allowed: 90 minutes").
pub fn detect_duration(full_text: &str) -> Option<u32> {
    let vietnamese = regex!(r"(?i)thời\s+gian(?:\s+làm\s+bài)?\s*[:.]?\s*(\d+)\s*(?:phút|phut|')");
    let english = regex!(
        r"(?i)(?:time(?:\s+allowed|\s+limit)?|duration)\s*[:.]?\s*(\d+)\s*(?:minutes|minute|mins|min)\b"
    );

    vietnamese
        .captures_iter(full_text)
        .chain(english.captures_iter(full_text))
        .filter_map(|caps| caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok()))
        .find(|minutes| *minutes >= 1)
}

/// Remove a header whose text is `label` from the front of `markup`,
/// keeping any formatting tags and dropping the ones left empty.
pub fn strip_label_prefix(markup: &str, label: &str) -> String {
    let mut remaining = label.chars().filter(|c| !c.is_whitespace()).count();
    let mut out = String::with_capacity(markup.len());
    let mut in_tag = false;
    let mut leading_space = true;
    let mut chars = markup.chars().peekable();

    while let Some(c) = chars.next() {
        if in_tag {
            out.push(c);
            if c == '>' {
                in_tag = false;
            }
            continue;
        }
        if c == '<' {
            in_tag = true;
            out.push(c);
            continue;
        }
        if remaining > 0 {
            if c == '&' {
                // an entity stands for one character
                let mut entity = String::new();
                while let Some(&next) = chars.peek() {
                    chars.next();
                    if next == ';' || entity.len() > 8 {
                        break;
                    }
                    entity.push(next);
                }
                if entity != "nbsp" && entity != "#160" {
                    remaining -= 1;
                }
            } else if !c.is_whitespace() {
                remaining -= 1;
            }
            continue;
        }
        if leading_space {
            if c.is_whitespace() {
                continue;
            }
            leading_space = false;
        }
        out.push(c);
    }

    drop_empty_tags(&out).trim().to_string()
}

fn drop_empty_tags(markup: &str) -> String {
    let empty = regex!(r"<(?:b|strong|em|i|u|span)(?:\s[^>]*)?>\s*</(?:b|strong|em|i|u|span)>");
    let mut current = markup.to_string();
    loop {
        let next = empty.replace_all(&current, "").into_owned();
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> Vec<String> {
        ["A", "B", "C", "D"].iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn test_detect_question_start() {
        let start = is_question_start("Câu 1: What is 2+2?").unwrap();
        assert_eq!(start.number, Some(1));
        assert_eq!(start.label, "Câu 1:");

        assert_eq!(is_question_start("CÂU 12. Tính").unwrap().number, Some(12));
        assert_eq!(is_question_start("Bài 3: Giải").unwrap().number, Some(3));
        assert_eq!(is_question_start("Question 7: Pick one").unwrap().number, Some(7));
        assert_eq!(is_question_start("Problem: untitled").unwrap().number, None);
        assert_eq!(is_question_start("4. Cho hàm số").unwrap().number, Some(4));
        assert_eq!(is_question_start("5:").unwrap().number, Some(5));
    }

    #[test]
    fn test_reject_non_question_lines() {
        assert!(is_question_start("Câu hỏi phụ").is_none());
        assert!(is_question_start("3.5 là số thập phân").is_none());
        assert!(is_question_start("Questionnaire: fill in").is_none());
        assert!(is_question_start("A. 3  B. 4").is_none());
        assert!(is_question_start("Cho câu 1: không phải đầu dòng").is_none());
    }

    #[test]
    fn test_detect_solution_start() {
        assert_eq!(is_solution_start("Lời giải").unwrap().keyword, "Lời giải");
        assert!(is_solution_start("Hướng dẫn giải chi tiết").is_some());
        assert!(is_solution_start("BẢNG ĐÁP ÁN").is_some());
        assert!(is_solution_start("HẾT").is_some());
        assert!(is_solution_start("Answer key").is_some());
        assert!(is_solution_start("End of paper").is_some());
        assert!(is_solution_start("Endless loop").is_none());
        assert!(is_solution_start("Chọn B vì 2+2=4.").is_none());
    }

    #[test]
    fn test_extract_options_single_line() {
        let options = extract_options("A. 3  B. 4  C. 5  D. 6", &labels()).unwrap();
        let texts: Vec<_> = options.iter().map(|o| (o.id.as_str(), o.text.as_str())).collect();
        assert_eq!(texts, vec![("A", "3"), ("B", "4"), ("C", "5"), ("D", "6")]);
    }

    #[test]
    fn test_extract_options_keeps_math() {
        let options = extract_options("A. $x = 3$ B. $x=\\frac{9}{2}$", &labels()).unwrap();
        assert_eq!(options[0].text, "$x = 3$");
        assert_eq!(options[1].text, "$x=\\frac{9}{2}$");
    }

    #[test]
    fn test_option_bearing_rules() {
        // opens with the first label
        assert_eq!(extract_options("A. only one", &labels()).unwrap().len(), 1);
        // two distinct labels anywhere
        assert!(extract_options("Chọn giữa B. đúng và C. sai", &labels()).is_some());
        // one non-first label is not enough
        assert!(extract_options("C. 5", &labels()).is_none());
        // glued to a word
        assert!(extract_options("Phân tử DNA. Và RNA.", &labels()).is_none());
        // outside the alphabet
        assert!(extract_options("E. 1 F. 2", &labels()).is_none());
        assert!(extract_options("Plain question text", &labels()).is_none());
    }

    #[test]
    fn test_adjacent_markers() {
        let markers = find_option_markers("A.1B.2", &labels());
        assert_eq!(markers.len(), 2);
        assert_eq!(markers[1].label, "B");
        assert_eq!(markers[1].start, 3);
    }

    #[test]
    fn test_detect_answer() {
        assert_eq!(detect_answer("Chọn B vì 2+2=4.", &labels()), Some("B".to_string()));
        assert_eq!(detect_answer("<p>Đáp án: <strong>c</strong></p>", &labels()), Some("C".to_string()));
        assert_eq!(detect_answer("Vậy đáp án đúng là D.", &labels()), Some("D".to_string()));
        assert_eq!(detect_answer("Answer is A", &labels()), Some("A".to_string()));
        assert_eq!(detect_answer("Đáp án các câu ở cuối. Chọn A", &labels()), Some("A".to_string()));
        assert_eq!(detect_answer("Không có gợi ý", &labels()), None);
        assert_eq!(detect_answer("Chọn E", &labels()), None);
    }

    #[test]
    fn test_detect_answer_around_inequalities() {
        assert_eq!(
            detect_answer("Ta có $a < b$, chọn C vì $c > 0$.", &labels()),
            Some("C".to_string())
        );
        assert_eq!(
            detect_answer("Vì x <strong>&lt;</strong> 2 nên <em>chọn D</em> (x > 1)", &labels()),
            Some("D".to_string())
        );
    }

    #[test]
    fn test_detect_answer_decodes_entities() {
        assert_eq!(detect_answer("Chọn&nbsp;B", &labels()), Some("B".to_string()));
        assert_eq!(detect_answer("Đáp án:&#160;C", &labels()), Some("C".to_string()));
    }

    #[test]
    fn test_detect_duration() {
        assert_eq!(detect_duration("Đề thi\nThời gian làm bài: 60 phút\nCâu 1"), Some(60));
        assert_eq!(detect_duration("thời gian 90'"), Some(90));
        assert_eq!(detect_duration("Time allowed: 30 minutes"), Some(30));
        assert_eq!(detect_duration("Thời gian: 0 phút"), None);
        assert_eq!(detect_duration("Không có thông tin"), None);
    }

    #[test]
    fn test_strip_label_prefix() {
        assert_eq!(strip_label_prefix("<strong>Câu 1:</strong> Tính $x$", "Câu 1:"), "Tính $x$");
        assert_eq!(
            strip_label_prefix("<strong>Câu 2: Tìm</strong> nghiệm", "Câu 2:"),
            "<strong>Tìm</strong> nghiệm"
        );
        assert_eq!(strip_label_prefix("Câu&nbsp;3: Hỏi", "Câu 3:"), "Hỏi");
        assert_eq!(strip_label_prefix("<b>Câu 4.</b>", "Câu 4."), "");
    }
}
