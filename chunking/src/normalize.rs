/// Collapses horizontal whitespace runs to a single space, normalizes line
/// endings to `\n`, collapses three-or-more consecutive newlines to exactly
/// two (preserving paragraph boundaries), strips control characters outside
/// `{\n, \t}`, and trims the result.
pub fn normalize(text: &str) -> String {
    let unified_newlines = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut result = String::with_capacity(unified_newlines.len());
    let mut whitespace_run = String::new();
    for ch in unified_newlines.chars() {
        if ch == '\n' {
            flush_whitespace_run(&mut whitespace_run, &mut result);
            result.push('\n');
            continue;
        }
        if ch.is_control() && ch != '\t' {
            continue;
        }
        if ch == ' ' || ch == '\t' || ch.is_whitespace() {
            whitespace_run.push(ch);
            continue;
        }
        flush_whitespace_run(&mut whitespace_run, &mut result);
        result.push(ch);
    }
    flush_whitespace_run(&mut whitespace_run, &mut result);

    let collapsed_blank_lines = collapse_excess_newlines(&result);
    collapsed_blank_lines.trim().to_string()
}

/// A lone horizontal-whitespace char (e.g. a single tab) is kept as-is; a run
/// of two or more collapses to one space.
fn flush_whitespace_run(run: &mut String, result: &mut String) {
    match run.chars().count() {
        0 => {}
        1 => result.push_str(run),
        _ => result.push(' '),
    }
    run.clear();
}

fn collapse_excess_newlines(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut newline_run = 0usize;
    for ch in text.chars() {
        if ch == '\n' {
            newline_run += 1;
            if newline_run <= 2 {
                result.push(ch);
            }
        } else {
            newline_run = 0;
            result.push(ch);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapses_runs_of_spaces_and_tabs() {
        assert_eq!(normalize("hello    \t  world"), "hello world");
    }

    #[test]
    fn normalizes_crlf_and_cr_to_lf() {
        assert_eq!(normalize("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn collapses_three_or_more_newlines_to_two() {
        assert_eq!(normalize("para one\n\n\n\npara two"), "para one\n\npara two");
    }

    #[test]
    fn strips_control_characters_but_keeps_newline_and_tab() {
        let input = "a\u{0007}b\tc\nd";
        assert_eq!(normalize(input), "ab\tc\nd");
    }

    #[test]
    fn trims_leading_and_trailing_whitespace() {
        assert_eq!(normalize("  hello world  \n"), "hello world");
    }
}
