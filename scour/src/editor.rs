use std::process::Command;

use tracing::debug;

/// Escape '/' and '\'' so the pattern survives the editor's search command.
pub fn sanitize_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    for c in pattern.chars() {
        if c == '/' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Expand a printf-style editor template. The four arguments are, in
/// order: line number, file path, sanitized pattern, case-flag suffix.
/// `%d`/`%s` consume the next argument; `%N$d`/`%N$s` pick one explicitly;
/// `%%` is a literal percent. Anything else is copied through.
pub fn expand_template(
    template: &str,
    line_number: usize,
    file_path: &str,
    pattern: &str,
    case_suffix: &str,
) -> String {
    let line_number = line_number.to_string();
    let args = [line_number.as_str(), file_path, pattern, case_suffix];

    let mut out = String::with_capacity(template.len() + 32);
    let mut next_arg = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some('%') => {
                chars.next();
                out.push('%');
            }
            Some(&d) if d.is_ascii_digit() => {
                // positional form %N$d / %N$s
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    digits.push(d);
                    chars.next();
                }
                if chars.peek() == Some(&'$') {
                    chars.next();
                    let conv = chars.next();
                    let index = digits.parse::<usize>().unwrap_or(0);
                    if matches!(conv, Some('d') | Some('s'))
                        && (1..=args.len()).contains(&index)
                    {
                        out.push_str(args[index - 1]);
                        continue;
                    }
                }
                // not a recognized conversion; restore what was consumed
                out.push('%');
                out.push_str(&digits);
            }
            Some('d') | Some('s') => {
                chars.next();
                if next_arg < args.len() {
                    out.push_str(args[next_arg]);
                    next_arg += 1;
                }
            }
            _ => out.push('%'),
        }
    }

    out
}

/// Run the expanded editor command through the shell, synchronously. The
/// editor's exit status is deliberately ignored.
pub fn launch(command: &str) {
    debug!(%command, "launching editor");
    let _ = Command::new("sh").arg("-c").arg(command).status();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_escapes_slash_and_quote() {
        assert_eq!(sanitize_pattern("a/b"), "a\\/b");
        assert_eq!(sanitize_pattern("it's"), "it\\'s");
        assert_eq!(sanitize_pattern("plain"), "plain");
    }

    #[test]
    fn sequential_conversions_consume_in_order() {
        let cmd = expand_template("vim +%d %s", 42, "src/main.c", "pat", "");
        assert_eq!(cmd, "vim +42 src/main.c");
    }

    #[test]
    fn positional_conversions_pick_arguments() {
        let cmd = expand_template(
            "vim '+silent /%3$s%4$s' +%1$d %2$s",
            7,
            "a.c",
            "needle",
            "\\c",
        );
        assert_eq!(cmd, "vim '+silent /needle\\c' +7 a.c");
    }

    #[test]
    fn double_percent_is_literal() {
        assert_eq!(expand_template("100%% +%d", 3, "f", "p", ""), "100% +3");
    }

    #[test]
    fn unknown_conversions_pass_through() {
        assert_eq!(expand_template("%x %q", 1, "f", "p", ""), "%x %q");
    }

    #[test]
    fn out_of_range_positional_is_left_alone() {
        assert_eq!(expand_template("%9$s", 1, "f", "p", ""), "%9");
    }
}
