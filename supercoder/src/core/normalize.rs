//! Local normalization pass run before escalating lint findings to the oracle.
//!
//! The pass is a lightweight textual scan, not a parser. It must be idempotent:
//! `normalize(&normalize(x)) == normalize(x)` for every input.

use std::sync::LazyLock;

use regex::Regex;

static DECLARATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\s*)(?:async\s+def|def|class)\s+([A-Za-z_][A-Za-z0-9_]*)")
        .expect("declaration regex should be valid")
});

static STRING_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[rRuUbBfF]{0,2}("""|'''|"|')"#).expect("string regex should be valid")
});

static CODING_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^#.*coding[:=]").expect("coding regex should be valid"));

const MODULE_DOC: &str = "\"\"\"Generated module.\"\"\"";
const BODY_INDENT: &str = "    ";

/// Normalize candidate source text.
///
/// - trailing whitespace is trimmed on every line
/// - the text ends with exactly one newline
/// - undocumented `def`/`class` declarations get a placeholder docstring as the
///   first statement of their body
/// - a module docstring is added when the first statement is not one
pub fn normalize(source: &str) -> String {
    let mut lines: Vec<String> = source
        .lines()
        .map(|line| line.trim_end().to_string())
        .collect();
    while lines.last().is_some_and(|line| line.is_empty()) {
        lines.pop();
    }
    if lines.is_empty() {
        return "\n".to_string();
    }

    let mut lines = document_declarations(&lines);
    document_module(&mut lines);

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn document_declarations(lines: &[String]) -> Vec<String> {
    let in_string = open_triple_quotes(lines);
    let mut out = Vec::with_capacity(lines.len());
    let mut idx = 0;
    while idx < lines.len() {
        let line = &lines[idx];
        let caps = match DECLARATION_RE.captures(line) {
            Some(caps) if !in_string[idx] => caps,
            _ => {
                out.push(line.clone());
                idx += 1;
                continue;
            }
        };
        let Some(header_end) =
            find_header_end(lines, idx).filter(|end| !in_string[end + 1])
        else {
            out.push(line.clone());
            idx += 1;
            continue;
        };

        out.extend(lines[idx..=header_end].iter().cloned());
        let next = next_non_blank(lines, header_end + 1);
        if !next.is_some_and(is_string_statement) {
            let decl_indent = caps.get(1).map_or("", |m| m.as_str());
            let name = caps.get(2).map_or("", |m| m.as_str());
            let indent = match next {
                Some(next) if leading_ws(next).len() > decl_indent.len() => {
                    leading_ws(next).to_string()
                }
                _ => format!("{decl_indent}{BODY_INDENT}"),
            };
            out.push(format!(
                "{indent}\"\"\"{name} placeholder documentation.\"\"\""
            ));
        }
        idx = header_end + 1;
    }
    out
}

fn document_module(lines: &mut Vec<String>) {
    let mut insert_at = 0;
    while insert_at < lines.len().min(2)
        && (lines[insert_at].starts_with("#!") || CODING_RE.is_match(&lines[insert_at]))
    {
        insert_at += 1;
    }

    let first_statement = lines[insert_at..].iter().find(|line| {
        let trimmed = line.trim();
        !trimmed.is_empty() && !trimmed.starts_with('#')
    });
    match first_statement {
        Some(line) if !is_string_statement(line) => {
            lines.insert(insert_at, MODULE_DOC.to_string());
        }
        _ => {}
    }
}

/// Index of the line that closes the declaration header starting at `start`.
///
/// The header ends on the first line where brackets balance. It only counts
/// when that line ends with `:`; single-line bodies (`def f(): pass`) and
/// unterminated headers yield `None`.
fn find_header_end(lines: &[String], start: usize) -> Option<usize> {
    let mut depth = 0i32;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        depth += bracket_delta(line);
        if depth <= 0 {
            return strip_comment(line)
                .trim_end()
                .ends_with(':')
                .then_some(idx);
        }
    }
    None
}

/// For each line boundary, whether a triple-quoted string is open there.
///
/// Entry `i` is the state at the start of line `i`; the extra last entry is the
/// state after the final line.
fn open_triple_quotes(lines: &[String]) -> Vec<bool> {
    let mut states = Vec::with_capacity(lines.len() + 1);
    let mut triple: Option<&[u8]> = None;
    for line in lines {
        states.push(triple.is_some());
        let bytes = line.as_bytes();
        let mut single: Option<u8> = None;
        let mut i = 0;
        while i < bytes.len() {
            let b = bytes[i];
            if let Some(delim) = triple {
                if b == b'\\' {
                    i += 2;
                } else if bytes[i..].starts_with(delim) {
                    triple = None;
                    i += 3;
                } else {
                    i += 1;
                }
                continue;
            }
            if let Some(q) = single {
                if b == b'\\' {
                    i += 2;
                    continue;
                }
                if b == q {
                    single = None;
                }
                i += 1;
                continue;
            }
            match b {
                b'#' => break,
                b'"' | b'\'' => {
                    let delim: &[u8] = if b == b'"' { b"\"\"\"" } else { b"'''" };
                    if bytes[i..].starts_with(delim) {
                        triple = Some(delim);
                        i += 3;
                    } else {
                        single = Some(b);
                        i += 1;
                    }
                }
                _ => i += 1,
            }
        }
    }
    states.push(triple.is_some());
    states
}

fn next_non_blank(lines: &[String], from: usize) -> Option<&str> {
    lines
        .iter()
        .skip(from)
        .map(String::as_str)
        .find(|line| !line.trim().is_empty())
}

fn is_string_statement(line: &str) -> bool {
    STRING_START_RE.is_match(line.trim_start())
}

fn leading_ws(line: &str) -> &str {
    &line[..line.len() - line.trim_start().len()]
}

/// Net bracket depth change on a line, ignoring string contents and comments.
fn bracket_delta(line: &str) -> i32 {
    let mut delta = 0;
    for (ch, in_string) in scan(line) {
        if in_string {
            continue;
        }
        match ch {
            '#' => break,
            '(' | '[' | '{' => delta += 1,
            ')' | ']' | '}' => delta -= 1,
            _ => {}
        }
    }
    delta
}

fn strip_comment(line: &str) -> &str {
    let mut offset = 0;
    for (ch, in_string) in scan(line) {
        if ch == '#' && !in_string {
            return &line[..offset];
        }
        offset += ch.len_utf8();
    }
    line
}

/// Walk a line's characters, flagging those inside single-line string literals.
fn scan(line: &str) -> Vec<(char, bool)> {
    let mut out = Vec::with_capacity(line.len());
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in line.chars() {
        match quote {
            Some(q) => {
                out.push((ch, true));
                if escaped {
                    escaped = false;
                } else if ch == '\\' {
                    escaped = true;
                } else if ch == q {
                    quote = None;
                }
            }
            None => {
                if ch == '"' || ch == '\'' {
                    quote = Some(ch);
                    out.push((ch, true));
                } else {
                    out.push((ch, false));
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn trims_trailing_whitespace_and_newlines() {
        let source = "\"\"\"Doc.\"\"\"\nx = 1   \ny = 2\t\n\n\n";
        assert_eq!(normalize(source), "\"\"\"Doc.\"\"\"\nx = 1\ny = 2\n");
    }

    #[test]
    fn empty_input_becomes_single_newline() {
        assert_eq!(normalize(""), "\n");
        assert_eq!(normalize("   \n\n\t\n"), "\n");
    }

    #[test]
    fn adds_module_docstring_after_shebang() {
        let source = "#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\nimport sys\n";
        assert_eq!(
            normalize(source),
            "#!/usr/bin/env python3\n# -*- coding: utf-8 -*-\n\"\"\"Generated module.\"\"\"\nimport sys\n"
        );
    }

    #[test]
    fn comment_only_file_gets_no_module_docstring() {
        assert_eq!(normalize("# just a note\n"), "# just a note\n");
    }

    #[test]
    fn documents_undocumented_function_and_class() {
        let source = "\"\"\"Mod.\"\"\"\n\ndef is_prime(n):\n    return n > 1\n\nclass Tree:\n    pass\n";
        let expected = "\"\"\"Mod.\"\"\"\n\ndef is_prime(n):\n    \"\"\"is_prime placeholder documentation.\"\"\"\n    return n > 1\n\nclass Tree:\n    \"\"\"Tree placeholder documentation.\"\"\"\n    pass\n";
        assert_eq!(normalize(source), expected);
    }

    #[test]
    fn keeps_existing_docstrings() {
        let source = "\"\"\"Mod.\"\"\"\nclass A:\n    '''Doc.'''\n    def m(self):\n        r\"\"\"Raw.\"\"\"\n        return 1\n";
        assert_eq!(normalize(source), source);
    }

    #[test]
    fn multi_line_header_gets_docstring_after_colon() {
        let source = "\"\"\"Mod.\"\"\"\ndef add(a,\n        b):  # sum\n    return a + b\n";
        let expected = "\"\"\"Mod.\"\"\"\ndef add(a,\n        b):  # sum\n    \"\"\"add placeholder documentation.\"\"\"\n    return a + b\n";
        assert_eq!(normalize(source), expected);
    }

    #[test]
    fn single_line_body_is_left_alone() {
        let source = "\"\"\"Mod.\"\"\"\ndef f(): return 1\n";
        assert_eq!(normalize(source), source);
    }

    #[test]
    fn nested_method_uses_body_indentation() {
        let source = "\"\"\"Mod.\"\"\"\nclass A:\n    \"\"\"A.\"\"\"\n    async def run(self):\n      pass\n";
        let out = normalize(source);
        assert!(out.contains(
            "    async def run(self):\n      \"\"\"run placeholder documentation.\"\"\"\n      pass\n"
        ));
    }

    #[test]
    fn colon_inside_string_does_not_end_header() {
        let source = "\"\"\"Mod.\"\"\"\ndef f(x=\"):\",\n      y=1):\n    return x\n";
        let out = normalize(source);
        assert!(out.contains("      y=1):\n    \"\"\"f placeholder documentation.\"\"\"\n"));
    }

    #[test]
    fn declarations_inside_triple_quoted_strings_are_left_alone() {
        let source = "\"\"\"Mod.\"\"\"\nTEMPLATE = '''\ndef name():\n    pass\n'''\nSNIPPET = \"\"\"class A:\n\"\"\"\n";
        assert_eq!(normalize(source), source);
    }

    #[test]
    fn declaration_after_closed_triple_quote_is_documented() {
        let source = "\"\"\"Mod.\"\"\"\nX = '''\ndef inner():\n'''\ndef outer():\n    return X\n";
        let expected = "\"\"\"Mod.\"\"\"\nX = '''\ndef inner():\n'''\ndef outer():\n    \"\"\"outer placeholder documentation.\"\"\"\n    return X\n";
        assert_eq!(normalize(source), expected);
    }

    #[test]
    fn header_that_opens_a_triple_quote_gets_no_docstring() {
        let source = "\"\"\"Mod.\"\"\"\nclass A: s = '''x:\n'''\n";
        assert_eq!(normalize(source), source);
    }

    #[test]
    fn normalize_is_idempotent_on_samples() {
        let samples = [
            "",
            "x=1",
            "def f():\n  return 1   \n\n",
            "class A:\nclass B:\n",
            "def f(a,\ndef g():\n",
            "#!/bin/python\nasync def go():\n    await x\n",
            "def f(): pass\ndef g():\n    pass",
            "    indented = 1\n",
            "s = '''\ndef f():\n'''\ndef g():\n    pass\n",
            "class A: t = \"\"\"x:\ndef f():\n\"\"\"\n",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "sample: {sample:?}");
        }
    }

    fn python_line() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("def f(x):".to_string()),
            Just("    return x  ".to_string()),
            Just("class A(Base):".to_string()),
            Just("    def m(self,".to_string()),
            Just("          y):  # tail".to_string()),
            Just("\"\"\"Doc.\"\"\"".to_string()),
            Just("#!/usr/bin/env python3".to_string()),
            Just("# -*- coding: utf-8 -*-".to_string()),
            Just("def g(): pass".to_string()),
            Just("x = (1,".to_string()),
            Just("s = '''".to_string()),
            Just("'''".to_string()),
            Just("t = \"\"\"doc:".to_string()),
            Just("\t".to_string()),
            Just(String::new()),
            "[ -~\t]{0,24}",
        ]
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent_for_python_like_text(lines in prop::collection::vec(python_line(), 0..16)) {
            let source = lines.join("\n");
            let once = normalize(&source);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_for_arbitrary_text(source in "(?s).{0,200}") {
            let once = normalize(&source);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
