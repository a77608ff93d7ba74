use crate::error::LexError;
use crate::token::{Span, Spanned, Token};

pub struct Lexer {
    chars: Vec<char>,
    /// Precomputed byte offset for each char index.
    /// `byte_offsets[chars.len()]` = total byte length (sentinel for EOF).
    byte_offsets: Vec<usize>,
    pos: usize,
    line: usize,
    line_start: usize,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let mut byte_offsets = Vec::with_capacity(chars.len() + 1);
        let mut offset = 0;
        for ch in &chars {
            byte_offsets.push(offset);
            offset += ch.len_utf8();
        }
        byte_offsets.push(offset);
        Lexer {
            chars,
            byte_offsets,
            pos: 0,
            line: 1,
            line_start: 0,
        }
    }

    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let spanned = self.next_token()?;
            let is_eof = spanned.token == Token::EOF;
            tokens.push(spanned);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_at(0) {
            if ch == ' ' || ch == '\t' || ch == '\r' {
                self.pos += 1;
            } else {
                break;
            }
        }
    }

    fn byte_pos_of(&self, char_idx: usize) -> usize {
        self.byte_offsets[char_idx.min(self.chars.len())]
    }

    fn span_from(&self, start: usize) -> Span {
        Span {
            start: self.byte_pos_of(start),
            end: self.byte_pos_of(self.pos),
            line: self.line,
            column: start - self.line_start + 1,
        }
    }

    fn spanned(&self, token: Token, start: usize) -> Spanned {
        Spanned {
            token,
            span: self.span_from(start),
        }
    }

    fn next_token(&mut self) -> Result<Spanned, LexError> {
        self.skip_whitespace();

        let start = self.pos;
        let Some(ch) = self.peek_at(0) else {
            return Ok(self.spanned(Token::EOF, start));
        };

        match ch {
            '\n' => {
                self.pos += 1;
                let token = self.spanned(Token::Newline, start);
                self.line += 1;
                self.line_start = self.pos;
                Ok(token)
            }
            '#' => self.lex_comment(start),
            '%' => {
                self.pos += 1;
                Ok(self.spanned(Token::Percent, start))
            }
            '$' => self.lex_slot(start),
            c if c.is_ascii_digit() => {
                let (_, value) = self.lex_digits(start)?;
                Ok(self.spanned(Token::Number(value), start))
            }
            c if c.is_ascii_alphabetic() || c == '_' => self.lex_word(start),
            _ => Err(LexError::UnexpectedChar {
                ch,
                span: self.span_from(start),
            }),
        }
    }

    fn lex_comment(&mut self, start: usize) -> Result<Spanned, LexError> {
        self.pos += 1; // skip #
        let text_start = self.pos;
        while self.peek_at(0).is_some_and(|c| c != '\n') {
            self.pos += 1;
        }
        let text: String = self.chars[text_start..self.pos].iter().collect();
        Ok(self.spanned(Token::Comment(text.trim().to_string()), start))
    }

    /// Consume a run of ASCII digits starting at the current position.
    fn lex_digits(&mut self, start: usize) -> Result<(String, u64), LexError> {
        let digits_start = self.pos;
        while self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let text: String = self.chars[digits_start..self.pos].iter().collect();
        let value = text.parse().map_err(|_| LexError::InvalidNumber {
            text: text.clone(),
            span: self.span_from(start),
        })?;
        Ok((text, value))
    }

    fn lex_slot(&mut self, start: usize) -> Result<Spanned, LexError> {
        self.pos += 1; // skip $
        if !self.peek_at(0).is_some_and(|c| c.is_ascii_digit()) {
            return Err(LexError::InvalidSlot {
                span: self.span_from(start),
            });
        }
        let (text, value) = self.lex_digits(start)?;
        let slot = usize::try_from(value).map_err(|_| LexError::InvalidNumber {
            text,
            span: self.span_from(start),
        })?;
        Ok(self.spanned(Token::Slot(slot), start))
    }

    fn lex_word(&mut self, start: usize) -> Result<Spanned, LexError> {
        while self
            .peek_at(0)
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        Ok(self.spanned(Token::Word(text), start))
    }
}
