//! Recover plain source text from a possibly fenced oracle response.

const FENCE: &str = "```";

/// Extract source text from an oracle response.
///
/// - No fence lines: the whole response (trimmed) is the source.
/// - Two or more fence lines: everything between the first and the last fence
///   line. A language tag on the opening fence (```` ```python ````) is dropped.
/// - Exactly one fence line: the non-blank side after the fence wins, otherwise
///   the side before it. A single-line ```` ```code``` ```` keeps its inner text.
///
/// Prose outside the outermost fences is discarded.
pub fn extract_source(response: &str) -> String {
    let lines: Vec<&str> = response.lines().collect();
    let fences: Vec<usize> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| line.trim_start().starts_with(FENCE))
        .map(|(idx, _)| idx)
        .collect();

    match fences.as_slice() {
        [] => join_trimmed(&lines),
        [only] => extract_single_fence(&lines, *only),
        [first, .., last] => join_trimmed(&lines[first + 1..*last]),
    }
}

fn extract_single_fence(lines: &[&str], idx: usize) -> String {
    if let Some(inline) = inline_fenced(lines[idx]) {
        return inline.to_string();
    }
    let after = join_trimmed(&lines[idx + 1..]);
    if !after.is_empty() {
        return after;
    }
    join_trimmed(&lines[..idx])
}

/// Inner text of a fence that opens and closes on the same line.
fn inline_fenced(line: &str) -> Option<&str> {
    let trimmed = line.trim();
    if trimmed.len() <= FENCE.len() * 2 || !trimmed.ends_with(FENCE) {
        return None;
    }
    let inner = trimmed[FENCE.len()..trimmed.len() - FENCE.len()].trim();
    (!inner.is_empty()).then_some(inner)
}

/// Join lines, dropping blank lines at either end but keeping indentation.
fn join_trimmed(lines: &[&str]) -> String {
    let Some(start) = lines.iter().position(|line| !line.trim().is_empty()) else {
        return String::new();
    };
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .unwrap_or(start);
    lines[start..=end].join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unfenced_response_is_returned_trimmed() {
        let response = "\n\nprint('hi')\nassert 1 == 1\n\n";
        assert_eq!(extract_source(response), "print('hi')\nassert 1 == 1");
    }

    #[test]
    fn fenced_block_with_language_tag_and_prose() {
        let response = "Here you go:\n```python\ndef f():\n    return 1\n```\nEnjoy!";
        assert_eq!(extract_source(response), "def f():\n    return 1");
    }

    #[test]
    fn keeps_inner_fences_between_first_and_last() {
        let response = "```python\ns = '```'\nprint(s)\n```";
        assert_eq!(extract_source(response), "s = '```'\nprint(s)");
    }

    #[test]
    fn multiple_blocks_span_first_to_last_fence() {
        let response = "```\na = 1\n```\ntext\n```\nb = 2\n```";
        assert_eq!(extract_source(response), "a = 1\n```\ntext\n```\nb = 2");
    }

    #[test]
    fn unclosed_opening_fence_keeps_the_tail() {
        let response = "```python\nx = 1\nprint(x)\n";
        assert_eq!(extract_source(response), "x = 1\nprint(x)");
    }

    #[test]
    fn dangling_closing_fence_keeps_the_head() {
        let response = "x = 1\nprint(x)\n```\n";
        assert_eq!(extract_source(response), "x = 1\nprint(x)");
    }

    #[test]
    fn single_line_fence_keeps_inner_text() {
        assert_eq!(extract_source("```print(1)```"), "print(1)");
    }

    #[test]
    fn empty_fenced_block_is_empty() {
        assert_eq!(extract_source("```python\n```"), "");
        assert_eq!(extract_source(""), "");
    }

    #[test]
    fn indented_code_is_preserved() {
        let response = "```\n    indented = True\n```";
        assert_eq!(extract_source(response), "    indented = True");
    }
}
