// Tokenizer for the tabular format
//
// Lexes one physical line at a time, so every token carries its line
// number for free. `#` comments run to end of line; blank lines vanish.

use super::{Result, TabularError};
use nom::{
    branch::alt,
    bytes::complete::take_while,
    character::complete::{char, digit1, one_of, satisfy},
    combinator::{map, opt, recognize},
    sequence::{delimited, pair},
    IResult, Parser,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare word: section keyword or enum value (`digital`, `high`).
    Keyword(String),
    /// Double-quoted string, no escapes.
    Str(String),
    /// Unsigned decimal number.
    Number(f64),
    /// Explicitly signed decimal number (`-7.6`, `+0.6`); transmit
    /// columns read these as offsets relative to RX.
    Offset(f64),
    /// DCS code token `n023` / `i023`; digits kept as the octal-read
    /// decimal the rest of the codebase uses.
    Dcs { octal: u16, inverted: bool },
    /// APRS address `CALL-SSID`.
    Call { call: String, ssid: u8 },
    Colon,
    /// `-` alone: not set / flag disabled.
    Dash,
    /// `+` alone: flag enabled.
    Plus,
    Comma,
}

/// One non-empty source line: its 1-based number and its tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub number: usize,
    pub tokens: Vec<Token>,
}

/// Tokenize a whole file.
pub fn lex(text: &str) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    for (i, raw) in text.lines().enumerate() {
        let number = i + 1;
        let tokens = lex_line(raw).map_err(|message| TabularError::Lex { line: number, message })?;
        if !tokens.is_empty() {
            lines.push(Line { number, tokens });
        }
    }
    Ok(lines)
}

fn lex_line(raw: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut rest = raw;
    loop {
        rest = rest.trim_start_matches([' ', '\t']);
        if rest.is_empty() || rest.starts_with('#') {
            return Ok(tokens);
        }
        match token(rest) {
            Ok((remaining, tok)) => {
                tokens.push(tok);
                rest = remaining;
            }
            Err(_) => {
                return Err(format!("unexpected character {:?}", rest.chars().next()));
            }
        }
    }
}

fn token(input: &str) -> IResult<&str, Token> {
    alt((quoted, number, word, punct)).parse(input)
}

fn quoted(input: &str) -> IResult<&str, Token> {
    map(
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
        |s: &str| Token::Str(s.to_string()),
    )
    .parse(input)
}

fn number(input: &str) -> IResult<&str, Token> {
    let (rest, (sign, text)) = pair(
        opt(one_of("+-")),
        recognize(pair(digit1, opt(pair(char('.'), digit1)))),
    )
    .parse(input)?;
    let value: f64 = text.parse().map_err(|_| {
        nom::Err::Error(nom::error::Error::new(input, nom::error::ErrorKind::Float))
    })?;
    Ok((
        rest,
        match sign {
            Some('-') => Token::Offset(-value),
            Some(_) => Token::Offset(value),
            None => Token::Number(value),
        },
    ))
}

/// A bare word, reclassified: `n`/`i` + 3 digits is a DCS token, a word
/// directly followed by `-digits` is an APRS address.
fn word(input: &str) -> IResult<&str, Token> {
    let (rest, text) = recognize(pair(
        satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
    ))
    .parse(input)?;

    if text.len() == 4 {
        let (head, digits) = text.split_at(1);
        if (head == "n" || head == "i") && digits.chars().all(|c| c.is_ascii_digit()) {
            if let Ok(octal) = digits.parse() {
                return Ok((
                    rest,
                    Token::Dcs {
                        octal,
                        inverted: head == "i",
                    },
                ));
            }
        }
    }

    if let Ok((after, (_, ssid))) = pair(char::<&str, nom::error::Error<&str>>('-'), digit1).parse(rest)
    {
        if let Ok(ssid) = ssid.parse() {
            return Ok((
                after,
                Token::Call {
                    call: text.to_string(),
                    ssid,
                },
            ));
        }
    }

    Ok((rest, Token::Keyword(text.to_string())))
}

fn punct(input: &str) -> IResult<&str, Token> {
    map(one_of(":-+,"), |c| match c {
        ':' => Token::Colon,
        '-' => Token::Dash,
        '+' => Token::Plus,
        _ => Token::Comma,
    })
    .parse(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(line: &str) -> Vec<Token> {
        let lines = lex(line).unwrap();
        assert_eq!(lines.len(), 1);
        lines.into_iter().next().unwrap().tokens
    }

    #[test]
    fn test_record_line() {
        assert_eq!(
            tokens("contact 1: group \"WW\" 91 -"),
            vec![
                Token::Keyword("contact".into()),
                Token::Number(1.0),
                Token::Colon,
                Token::Keyword("group".into()),
                Token::Str("WW".into()),
                Token::Number(91.0),
                Token::Dash,
            ]
        );
    }

    #[test]
    fn test_signed_number_vs_dash() {
        assert_eq!(
            tokens("-7.6 - +0.6 +"),
            vec![
                Token::Offset(-7.6),
                Token::Dash,
                Token::Offset(0.6),
                Token::Plus,
            ]
        );
    }

    #[test]
    fn test_dcs_and_call_tokens() {
        assert_eq!(
            tokens("n023 i754 DL1XYZ-7 wide"),
            vec![
                Token::Dcs { octal: 23, inverted: false },
                Token::Dcs { octal: 754, inverted: true },
                Token::Call { call: "DL1XYZ".into(), ssid: 7 },
                Token::Keyword("wide".into()),
            ]
        );
    }

    #[test]
    fn test_comma_lists_and_comments() {
        assert_eq!(
            tokens("1,2,3  # trailing comment"),
            vec![
                Token::Number(1.0),
                Token::Comma,
                Token::Number(2.0),
                Token::Comma,
                Token::Number(3.0),
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_dropped() {
        let lines = lex("# header\n\nid 1: \"A\" 1\n").unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].number, 3);
    }

    #[test]
    fn test_bad_character_reports_line() {
        let err = lex("id 1: @\n").unwrap_err();
        assert!(matches!(err, TabularError::Lex { line: 1, .. }));
    }
}
