//! Command line tokenizing and argument parsing

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("Text ended before matching quote was found for {0}.")]
    UnterminatedQuote(char),

    #[error("Text ended just after a '\\' character.")]
    TrailingBackslash,
}

/// Splits a line into words with shell-like quoting
///
/// Single quotes are literal, double quotes allow `\"`, `\\`, `\$` and `` \` ``
/// escapes, a backslash outside quotes escapes the next character, and `#` at
/// the start of a word comments out the rest of the line.
pub fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match c {
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            '#' if !in_word => break,
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(ParseError::UnterminatedQuote('\'')),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => current.push(c),
                            Some('\n') => {}
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => return Err(ParseError::UnterminatedQuote('"')),
                        },
                        Some(c) => current.push(c),
                        None => return Err(ParseError::UnterminatedQuote('"')),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some('\n') => {}
                    Some(c) => current.push(c),
                    None => return Err(ParseError::TrailingBackslash),
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }
    Ok(words)
}

/// Parses a hexadecimal attribute handle, with or without `0x`
pub fn parse_handle(text: &str) -> Option<u16> {
    let digits = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if digits.is_empty() {
        return None;
    }
    u16::from_str_radix(digits, 16).ok()
}

/// Parses an integer in C notation: `0x` hex, leading `0` octal, else decimal
pub fn parse_number(text: &str) -> Option<i64> {
    let (negative, body) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };

    let value = if let Some(hex) = body.strip_prefix("0x").or_else(|| body.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()?
    } else if body.len() > 1 && body.starts_with('0') {
        i64::from_str_radix(&body[1..], 8).ok()?
    } else {
        body.parse::<i64>().ok()?
    };

    Some(if negative { -value } else { value })
}

/// Parses an attribute value given as hex octets, e.g. `0100` or `deadbeef`
pub fn parse_value(text: &str) -> Option<Vec<u8>> {
    match hex::decode(text) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("connect 00:11:22:33:44:55", &["connect", "00:11:22:33:44:55"])]
    #[case("  char-desc   1  ff ", &["char-desc", "1", "ff"])]
    #[case("primary '0000180a-0000-1000-8000-00805f9b34fb'", &["primary", "0000180a-0000-1000-8000-00805f9b34fb"])]
    #[case(r#"help "a \"b\" c""#, &["help", r#"a "b" c"#])]
    #[case(r"a\ b", &["a b"])]
    #[case("mtu 100 # comment", &["mtu", "100"])]
    #[case("a#b", &["a#b"])]
    #[case("# only a comment", &[])]
    #[case("", &[])]
    fn tokenizes_lines(#[case] line: &str, #[case] expected: &[&str]) {
        assert_eq!(tokenize(line).unwrap(), expected);
    }

    #[rstest]
    #[case("connect 'abc", ParseError::UnterminatedQuote('\''))]
    #[case("connect \"abc", ParseError::UnterminatedQuote('"'))]
    #[case("connect abc\\", ParseError::TrailingBackslash)]
    fn rejects_unbalanced_lines(#[case] line: &str, #[case] expected: ParseError) {
        assert_eq!(tokenize(line).unwrap_err(), expected);
    }

    #[rstest]
    #[case("0010", Some(0x0010))]
    #[case("0x2a", Some(0x002a))]
    #[case("ffff", Some(0xffff))]
    #[case("10000", None)]
    #[case("", None)]
    #[case("0x", None)]
    #[case("-1", None)]
    #[case("12g", None)]
    fn parses_handles(#[case] text: &str, #[case] expected: Option<u16>) {
        assert_eq!(parse_handle(text), expected);
    }

    #[rstest]
    #[case("100", Some(100))]
    #[case("0x100", Some(256))]
    #[case("010", Some(8))]
    #[case("0", Some(0))]
    #[case("-5", Some(-5))]
    #[case("09", None)]
    #[case("abc", None)]
    #[case("", None)]
    fn parses_numbers(#[case] text: &str, #[case] expected: Option<i64>) {
        assert_eq!(parse_number(text), expected);
    }

    #[test]
    fn parses_values() {
        assert_eq!(parse_value("0100"), Some(vec![0x01, 0x00]));
        assert_eq!(parse_value("DEADbeef"), Some(vec![0xde, 0xad, 0xbe, 0xef]));
        assert_eq!(parse_value(""), None);
        assert_eq!(parse_value("1"), None);
        assert_eq!(parse_value("zz"), None);
    }
}
