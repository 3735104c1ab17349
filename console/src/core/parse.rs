//! Tokenizing raw input lines into a command name and arguments.

/// A non-empty input line split into its parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLine {
    /// First token, lower-cased.
    pub name: String,
    /// Remaining tokens, case preserved.
    pub args: Vec<String>,
    /// First argument lower-cased, if any.
    pub arg1: Option<String>,
}

/// Split `raw` on whitespace. Returns `None` for blank input.
pub fn parse_line(raw: &str) -> Option<ParsedLine> {
    let mut tokens = raw.split_whitespace();
    let name = tokens.next()?.to_lowercase();
    let args: Vec<String> = tokens.map(str::to_string).collect();
    let arg1 = args.first().map(|arg| arg.to_lowercase());
    Some(ParsedLine { name, args, arg1 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_do_not_parse() {
        assert_eq!(parse_line(""), None);
        assert_eq!(parse_line("   \t "), None);
    }

    #[test]
    fn name_and_first_arg_are_lowercased() {
        let parsed = parse_line("  PING  LocalHost Extra ").expect("parsed");
        assert_eq!(parsed.name, "ping");
        assert_eq!(parsed.args, vec!["LocalHost", "Extra"]);
        assert_eq!(parsed.arg1.as_deref(), Some("localhost"));
    }

    #[test]
    fn missing_args_leave_arg1_empty() {
        let parsed = parse_line("help").expect("parsed");
        assert!(parsed.args.is_empty());
        assert_eq!(parsed.arg1, None);
    }
}
