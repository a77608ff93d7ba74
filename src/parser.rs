use crate::ast::*;
use crate::error::ParseError;
use crate::token::{Span, Spanned, Token};

/// Parses a token stream into pipeline steps, one command per line.
///
/// ```text
/// # comment
/// mix $2 10      # mix with slot 2 starting at 10 s
/// mute 5 10
/// resample 200%
/// vocoder $3
/// ```
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Parser { tokens, pos: 0 }
    }

    // ── Helpers ──────────────────────────────────────────────

    fn peek(&self) -> Token {
        self.tokens
            .get(self.pos)
            .map_or(Token::EOF, |s| s.token.clone())
    }

    fn span(&self) -> Span {
        match self.tokens.get(self.pos).or(self.tokens.last()) {
            Some(s) => s.span,
            None => Span {
                start: 0,
                end: 0,
                line: 1,
                column: 1,
            },
        }
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek(), Token::EOF)
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: self.peek(),
            span: self.span(),
        }
    }

    fn expect_number(&mut self) -> Result<u64, ParseError> {
        match self.peek() {
            Token::Number(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("number")),
        }
    }

    fn expect_slot(&mut self) -> Result<usize, ParseError> {
        match self.peek() {
            Token::Slot(n) => {
                self.advance();
                Ok(n)
            }
            _ => Err(self.unexpected("slot id (like $2)")),
        }
    }

    /// Skip blank lines and comment-only lines.
    fn skip_blank(&mut self) {
        while matches!(self.peek(), Token::Newline | Token::Comment(_)) {
            self.advance();
        }
    }

    /// A command must be followed by an optional comment and a line break.
    fn expect_end_of_line(&mut self) -> Result<(), ParseError> {
        if matches!(self.peek(), Token::Comment(_)) {
            self.advance();
        }
        match self.peek() {
            Token::Newline => {
                self.advance();
                Ok(())
            }
            Token::EOF => Ok(()),
            _ => Err(self.unexpected("end of line")),
        }
    }

    // ── Script ───────────────────────────────────────────────

    pub fn parse_script(&mut self) -> Result<Vec<Step>, ParseError> {
        let mut steps = Vec::new();
        self.skip_blank();

        while !self.is_at_end() {
            steps.push(self.parse_step()?);
            self.expect_end_of_line()?;
            self.skip_blank();
        }

        Ok(steps)
    }

    fn parse_step(&mut self) -> Result<Step, ParseError> {
        let span = self.span();
        let name = match self.peek() {
            Token::Word(name) => name,
            _ => return Err(self.unexpected("command")),
        };
        self.advance();

        let operation = match name.as_str() {
            "mix" => {
                let slot = self.expect_slot()?;
                let insert_at = match self.peek() {
                    Token::Number(_) => self.expect_number()?,
                    _ => 0,
                };
                Operation::Mix { slot, insert_at }
            }
            "mute" => {
                let start = self.expect_number()?;
                let end = self.expect_number()?;
                Operation::Mute { start, end }
            }
            "resample" => {
                let percent = self.expect_number()?;
                if self.peek() != Token::Percent {
                    return Err(self.unexpected("'%'"));
                }
                self.advance();
                Operation::Resample { percent }
            }
            "vocoder" => Operation::Vocoder {
                slot: self.expect_slot()?,
            },
            _ => return Err(ParseError::UnknownCommand { name, span }),
        };

        Ok(Step { operation, span })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(input: &str) -> Result<Vec<Operation>, Box<dyn std::error::Error>> {
        let tokens = Lexer::new(input).tokenize()?;
        let steps = Parser::new(tokens).parse_script()?;
        Ok(steps.into_iter().map(|s| s.operation).collect())
    }

    #[test]
    fn test_empty_script() {
        assert!(parse("").unwrap().is_empty());
        assert!(parse("\n\n# only a comment\n").unwrap().is_empty());
    }

    #[test]
    fn test_mix_with_and_without_offset() {
        assert_eq!(
            parse("mix $2").unwrap(),
            vec![Operation::Mix { slot: 2, insert_at: 0 }]
        );
        assert_eq!(
            parse("mix $2 10").unwrap(),
            vec![Operation::Mix { slot: 2, insert_at: 10 }]
        );
    }

    #[test]
    fn test_fixture_scripts() {
        assert_eq!(
            parse("mute 1 2\nvocoder $2").unwrap(),
            vec![
                Operation::Mute { start: 1, end: 2 },
                Operation::Vocoder { slot: 2 },
            ]
        );
        assert_eq!(
            parse("# ...\nmute 10 20 # mute\nresample 50%\n\n\n").unwrap(),
            vec![
                Operation::Mute { start: 10, end: 20 },
                Operation::Resample { percent: 50 },
            ]
        );
    }

    #[test]
    fn test_step_spans() {
        let tokens = Lexer::new("mute 1 2\n  vocoder $2").tokenize().unwrap();
        let steps = Parser::new(tokens).parse_script().unwrap();
        assert_eq!(steps[1].span.line, 2);
        assert_eq!(steps[1].span.column, 3);
    }

    #[test]
    fn test_unknown_command() {
        let tokens = Lexer::new("reverse $2").tokenize().unwrap();
        let err = Parser::new(tokens).parse_script().unwrap_err();
        assert!(matches!(err, ParseError::UnknownCommand { ref name, .. } if name == "reverse"));
    }

    #[test]
    fn test_missing_percent() {
        let tokens = Lexer::new("resample 50").tokenize().unwrap();
        let err = Parser::new(tokens).parse_script().unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedToken { found: Token::EOF, .. }
        ));
    }

    #[test]
    fn test_trailing_garbage() {
        let tokens = Lexer::new("vocoder $2 $3").tokenize().unwrap();
        let err = Parser::new(tokens).parse_script().unwrap_err();
        match err {
            ParseError::UnexpectedToken { expected, found, .. } => {
                assert_eq!(expected, "end of line");
                assert_eq!(found, Token::Slot(3));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_mute_needs_two_numbers() {
        let tokens = Lexer::new("mute 1\n").tokenize().unwrap();
        let err = Parser::new(tokens).parse_script().unwrap_err();
        assert!(matches!(
            err,
            ParseError::UnexpectedToken { found: Token::Newline, .. }
        ));
    }
}
