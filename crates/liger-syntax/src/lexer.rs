//! Tokenizer for Crystal source code.
//!
//! Produces a stream of tokens with significant newlines (`;` counts as a
//! newline). The lexer understands enough of Crystal's literal syntax —
//! strings with `#{}` interpolation, character and percent literals,
//! regexes, heredocs — that block keywords inside literals never leak into
//! the token stream.

use crate::token::{Keyword, Token, TokenKind};
use crate::{Span, SyntaxError};

/// The lexer for Crystal source code.
#[derive(Debug)]
pub struct Lexer<'src> {
    source: &'src str,
    chars: std::iter::Peekable<std::str::CharIndices<'src>>,
    current_pos: usize,
    line: u32,
    column: u32,
    tokens: Vec<Token>,
    /// Tag of a heredoc opened on the current line, consumed after the
    /// next newline.
    pending_heredoc: Option<String>,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source code.
    pub fn new(source: &'src str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            current_pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            pending_heredoc: None,
        }
    }

    /// Tokenize the entire source and return all tokens.
    pub fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        while !self.is_at_end() {
            self.skip_blanks();
            if self.is_at_end() {
                break;
            }
            let token = self.scan_token()?;
            self.tokens.push(token);
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            Span::new(self.current_pos, self.current_pos, self.line, self.column),
        ));

        Ok(self.tokens)
    }

    fn is_at_end(&mut self) -> bool {
        self.chars.peek().is_none()
    }

    fn advance(&mut self) -> Option<(usize, char)> {
        let result = self.chars.next();
        if let Some((pos, ch)) = result {
            self.current_pos = pos + ch.len_utf8();
            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
        result
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, ch)| *ch)
    }

    fn peek_next(&self) -> Option<char> {
        let mut iter = self.chars.clone();
        iter.next();
        iter.next().map(|(_, ch)| ch)
    }

    fn here(&self) -> (usize, u32, u32) {
        (self.current_pos, self.line, self.column)
    }

    fn span_from(&self, start: (usize, u32, u32)) -> Span {
        Span::new(start.0, self.current_pos, start.1, start.2)
    }

    fn error(&self, message: impl Into<String>, start: (usize, u32, u32)) -> SyntaxError {
        SyntaxError::new(message, self.span_from(start))
    }

    /// Skip spaces, tabs, carriage returns, comments, and escaped newlines.
    fn skip_blanks(&mut self) {
        while let Some(ch) = self.peek() {
            match ch {
                ' ' | '\t' | '\r' => {
                    self.advance();
                }
                '\\' if self.peek_next() == Some('\n') => {
                    // Line continuation
                    self.advance();
                    self.advance();
                }
                '#' => {
                    while let Some(ch) = self.peek() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    /// The last non-newline token, used to disambiguate `/` and keyword
    /// positions.
    fn prev_significant(&self) -> Option<&TokenKind> {
        self.tokens
            .iter()
            .rev()
            .find(|t| !matches!(t.kind, TokenKind::Newline))
            .map(|t| &t.kind)
    }

    /// Whether the previous token ends a value, so that `/` or `%` must be
    /// a binary operator rather than a literal opener.
    fn after_value(&self) -> bool {
        matches!(
            self.prev_significant(),
            Some(
                TokenKind::Ident(_)
                    | TokenKind::Const(_)
                    | TokenKind::InstanceVar(_)
                    | TokenKind::Number
                    | TokenKind::Str
                    | TokenKind::Char
                    | TokenKind::Symbol(_)
                    | TokenKind::Regex
                    | TokenKind::RParen
                    | TokenKind::RBracket
                    | TokenKind::RBrace
                    | TokenKind::Keyword(Keyword::End)
                    | TokenKind::Keyword(Keyword::SelfKw)
            )
        )
    }

    /// Whether the previous token puts us in method-name position, where
    /// keywords are ordinary names (`1.class`, `def end`).
    fn in_name_position(&self) -> bool {
        match self.prev_significant() {
            Some(TokenKind::Dot) | Some(TokenKind::Keyword(Keyword::Def)) => true,
            Some(TokenKind::Op(op)) => op == "&.",
            _ => false,
        }
    }

    fn scan_token(&mut self) -> Result<Token, SyntaxError> {
        let start = self.here();
        let ch = match self.peek() {
            Some(ch) => ch,
            None => {
                return Ok(Token::new(TokenKind::Eof, self.span_from(start)));
            }
        };

        match ch {
            '\n' | ';' => {
                self.advance();
                let token = Token::new(TokenKind::Newline, self.span_from(start));
                if ch == '\n' {
                    self.consume_pending_heredoc(start)?;
                }
                Ok(token)
            }
            'a'..='z' | '_' => self.scan_word(start),
            'A'..='Z' => self.scan_const(start),
            '0'..='9' => self.scan_number(start),
            '@' => self.scan_ivar(start),
            '"' | '`' => {
                self.scan_quoted(ch, start)?;
                Ok(Token::new(TokenKind::Str, self.span_from(start)))
            }
            '\'' => self.scan_char(start),
            ':' => self.scan_colon(start),
            '%' => self.scan_percent(start),
            '/' => self.scan_slash(start),
            '<' => self.scan_angle(start),
            '=' => {
                self.advance();
                match self.peek() {
                    Some('=') => {
                        self.advance();
                        if self.peek() == Some('=') {
                            self.advance();
                            Ok(Token::new(TokenKind::Op("===".into()), self.span_from(start)))
                        } else {
                            Ok(Token::new(TokenKind::Op("==".into()), self.span_from(start)))
                        }
                    }
                    Some('~') => {
                        self.advance();
                        Ok(Token::new(TokenKind::Op("=~".into()), self.span_from(start)))
                    }
                    Some('>') => {
                        self.advance();
                        Ok(Token::new(TokenKind::Op("=>".into()), self.span_from(start)))
                    }
                    _ => Ok(Token::new(TokenKind::Eq, self.span_from(start))),
                }
            }
            '(' => self.single(TokenKind::LParen, start),
            ')' => self.single(TokenKind::RParen, start),
            '[' => self.single(TokenKind::LBracket, start),
            ']' => self.single(TokenKind::RBracket, start),
            '{' => self.single(TokenKind::LBrace, start),
            '}' => self.single(TokenKind::RBrace, start),
            ',' => self.single(TokenKind::Comma, start),
            '.' => {
                self.advance();
                if self.peek() == Some('.') {
                    self.advance();
                    if self.peek() == Some('.') {
                        self.advance();
                        Ok(Token::new(TokenKind::Op("...".into()), self.span_from(start)))
                    } else {
                        Ok(Token::new(TokenKind::Op("..".into()), self.span_from(start)))
                    }
                } else {
                    Ok(Token::new(TokenKind::Dot, self.span_from(start)))
                }
            }
            '|' => {
                self.advance();
                match self.peek() {
                    Some('|') => {
                        self.advance();
                        if self.peek() == Some('=') {
                            self.advance();
                        }
                        Ok(Token::new(TokenKind::Op("||".into()), self.span_from(start)))
                    }
                    Some('=') => {
                        self.advance();
                        Ok(Token::new(TokenKind::Op("|=".into()), self.span_from(start)))
                    }
                    _ => Ok(Token::new(TokenKind::Pipe, self.span_from(start))),
                }
            }
            _ => self.scan_operator(start),
        }
    }

    fn single(&mut self, kind: TokenKind, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        self.advance();
        Ok(Token::new(kind, self.span_from(start)))
    }

    fn scan_word(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        // Trailing `?` / `!` belong to the identifier unless they begin a
        // two-character operator like `!=`.
        if let Some(ch) = self.peek() {
            if (ch == '?' || ch == '!') && self.peek_next() != Some('=') {
                self.advance();
            }
        }

        let span = self.span_from(start);
        let word = &self.source[span.start..span.end];

        let kind = match Keyword::from_str(word) {
            Some(keyword) if !self.in_name_position() => TokenKind::Keyword(keyword),
            _ => TokenKind::Ident(word.to_string()),
        };
        Ok(Token::new(kind, span))
    }

    fn scan_const(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let span = self.span_from(start);
        let word = self.source[span.start..span.end].to_string();
        Ok(Token::new(TokenKind::Const(word), span))
    }

    fn scan_number(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        // Fractional part only when followed by a digit, so `1..10` and
        // `1.abs` stay intact.
        if self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
            while let Some(ch) = self.peek() {
                if ch.is_ascii_digit() || ch == '_' {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        // Exponent and type suffixes (e.g. `e10`, `_i64`, `f32`, hex body).
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else if (ch == '+' || ch == '-')
                && matches!(
                    self.source[..self.current_pos].chars().next_back(),
                    Some('e') | Some('E')
                )
            {
                self.advance();
            } else {
                break;
            }
        }
        Ok(Token::new(TokenKind::Number, self.span_from(start)))
    }

    fn scan_ivar(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        self.advance(); // `@`
        if self.peek() == Some('@') {
            self.advance();
        }
        if !self.peek().is_some_and(|c| c.is_ascii_alphabetic() || c == '_') {
            // `@[Annotation]` and friends
            return Ok(Token::new(TokenKind::Op("@".into()), self.span_from(start)));
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                self.advance();
            } else {
                break;
            }
        }
        let span = self.span_from(start);
        let word = self.source[span.start..span.end].to_string();
        Ok(Token::new(TokenKind::InstanceVar(word), span))
    }

    /// Scan a double-quoted or backtick literal, including `#{}`
    /// interpolation.
    fn scan_quoted(&mut self, quote: char, start: (usize, u32, u32)) -> Result<(), SyntaxError> {
        self.advance(); // opening quote
        while let Some(ch) = self.peek() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(());
                }
                '\\' => {
                    self.advance();
                    self.advance();
                }
                '#' if self.peek_next() == Some('{') => {
                    self.advance();
                    self.advance();
                    self.skip_interpolation(start)?;
                }
                _ => {
                    self.advance();
                }
            }
        }
        Err(self.error("unterminated string literal", start))
    }

    /// Skip a `#{...}` interpolation body, tolerating nested braces and
    /// nested string literals.
    fn skip_interpolation(&mut self, start: (usize, u32, u32)) -> Result<(), SyntaxError> {
        let mut depth = 1usize;
        while let Some(ch) = self.peek() {
            match ch {
                '{' => {
                    depth += 1;
                    self.advance();
                }
                '}' => {
                    depth -= 1;
                    self.advance();
                    if depth == 0 {
                        return Ok(());
                    }
                }
                '"' => {
                    self.scan_quoted('"', start)?;
                }
                '\\' => {
                    self.advance();
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }
        Err(self.error("unterminated string interpolation", start))
    }

    fn scan_char(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        self.advance(); // opening `'`
        match self.peek() {
            Some('\\') => {
                self.advance();
                self.advance();
                // Unicode escapes: `'\u{1F600}'`
                if self.peek() == Some('{') {
                    while let Some(ch) = self.peek() {
                        self.advance();
                        if ch == '}' {
                            break;
                        }
                    }
                }
            }
            Some('\'') | None => {
                return Err(self.error("empty character literal", start));
            }
            Some(_) => {
                self.advance();
            }
        }
        if self.peek() == Some('\'') {
            self.advance();
            Ok(Token::new(TokenKind::Char, self.span_from(start)))
        } else {
            Err(self.error("unterminated character literal", start))
        }
    }

    fn scan_colon(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        self.advance(); // `:`
        match self.peek() {
            Some(':') => {
                self.advance();
                Ok(Token::new(TokenKind::ColonColon, self.span_from(start)))
            }
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                while let Some(ch) = self.peek() {
                    if ch.is_ascii_alphanumeric() || ch == '_' {
                        self.advance();
                    } else {
                        break;
                    }
                }
                if matches!(self.peek(), Some('?') | Some('!')) {
                    self.advance();
                }
                let span = self.span_from(start);
                let name = self.source[span.start + 1..span.end].to_string();
                Ok(Token::new(TokenKind::Symbol(name), span))
            }
            Some('"') => {
                self.scan_quoted('"', start)?;
                let span = self.span_from(start);
                let name = self.source[span.start + 2..span.end - 1].to_string();
                Ok(Token::new(TokenKind::Symbol(name), span))
            }
            Some(c) if "+-*/<>=!~%&|^[".contains(c) => {
                while let Some(ch) = self.peek() {
                    if "+-*/<>=!~%&|^[]".contains(ch) {
                        self.advance();
                    } else {
                        break;
                    }
                }
                let span = self.span_from(start);
                let name = self.source[span.start + 1..span.end].to_string();
                Ok(Token::new(TokenKind::Symbol(name), span))
            }
            _ => Ok(Token::new(TokenKind::Colon, self.span_from(start))),
        }
    }

    fn scan_percent(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        if self.after_value() {
            self.advance();
            if self.peek() == Some('=') {
                self.advance();
            }
            return Ok(Token::new(TokenKind::Op("%".into()), self.span_from(start)));
        }

        // Percent literal: `%w(...)`, `%i[...]`, `%q{...}`, `%(...)` etc.
        let mut lookahead = self.chars.clone();
        lookahead.next(); // `%`
        let mut opener = lookahead.next().map(|(_, c)| c);
        if matches!(opener, Some('w' | 'i' | 'q' | 'Q' | 'r' | 'x')) {
            opener = lookahead.next().map(|(_, c)| c);
        }
        let closer = match opener {
            Some('(') => ')',
            Some('[') => ']',
            Some('{') => '}',
            Some('<') => '>',
            Some('|') => '|',
            _ => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                }
                return Ok(Token::new(TokenKind::Op("%".into()), self.span_from(start)));
            }
        };
        let open = opener.unwrap_or(')');

        self.advance(); // `%`
        while self.peek() != Some(open) {
            self.advance();
        }
        self.advance(); // opening delimiter
        let mut depth = 1usize;
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.advance();
                self.advance();
                continue;
            }
            if ch == closer {
                depth -= 1;
                self.advance();
                if depth == 0 {
                    return Ok(Token::new(TokenKind::Str, self.span_from(start)));
                }
            } else if ch == open && open != closer {
                depth += 1;
                self.advance();
            } else {
                self.advance();
            }
        }
        Err(self.error("unterminated percent literal", start))
    }

    fn scan_slash(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        // `/` right after a value is division; otherwise try a regex
        // literal, falling back to an operator when no closing slash exists
        // on the line.
        if !self.after_value() {
            let rest = self.source.get(self.current_pos + 1..).unwrap_or("");
            let line_end = rest.find('\n').unwrap_or(rest.len());
            let mut escaped = false;
            let mut closes = false;
            for c in rest[..line_end].chars() {
                if escaped {
                    escaped = false;
                } else if c == '\\' {
                    escaped = true;
                } else if c == '/' {
                    closes = true;
                    break;
                }
            }
            if closes {
                self.advance(); // `/`
                loop {
                    match self.peek() {
                        Some('\\') => {
                            self.advance();
                            self.advance();
                        }
                        Some('/') => {
                            self.advance();
                            // modifier flags
                            while matches!(self.peek(), Some('i') | Some('m') | Some('x')) {
                                self.advance();
                            }
                            return Ok(Token::new(TokenKind::Regex, self.span_from(start)));
                        }
                        Some(_) => {
                            self.advance();
                        }
                        None => return Err(self.error("unterminated regex literal", start)),
                    }
                }
            }
        }

        self.advance();
        if matches!(self.peek(), Some('/') | Some('=')) {
            self.advance();
            if self.peek() == Some('=') {
                self.advance();
            }
        }
        Ok(Token::new(TokenKind::Op("/".into()), self.span_from(start)))
    }

    fn scan_angle(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        self.advance(); // `<`
        match self.peek() {
            Some('<') => {
                self.advance();
                match self.peek() {
                    Some('-') | Some('~') => {
                        // Heredoc marker `<<-TAG` / `<<~TAG`
                        self.advance();
                        let tag_start = self.current_pos;
                        let quoted = matches!(self.peek(), Some('\'') | Some('"'));
                        if quoted {
                            self.advance();
                        }
                        while let Some(ch) = self.peek() {
                            if ch.is_ascii_alphanumeric() || ch == '_' {
                                self.advance();
                            } else {
                                break;
                            }
                        }
                        if quoted {
                            self.advance();
                        }
                        let raw = &self.source[tag_start..self.current_pos];
                        let tag = raw.trim_matches(|c| c == '\'' || c == '"').to_string();
                        if tag.is_empty() {
                            return Err(self.error("malformed heredoc marker", start));
                        }
                        self.pending_heredoc = Some(tag);
                        Ok(Token::new(TokenKind::Str, self.span_from(start)))
                    }
                    Some('=') => {
                        self.advance();
                        Ok(Token::new(TokenKind::Op("<<=".into()), self.span_from(start)))
                    }
                    _ => Ok(Token::new(TokenKind::Op("<<".into()), self.span_from(start))),
                }
            }
            Some('=') => {
                self.advance();
                if self.peek() == Some('>') {
                    self.advance();
                    Ok(Token::new(TokenKind::Op("<=>".into()), self.span_from(start)))
                } else {
                    Ok(Token::new(TokenKind::Op("<=".into()), self.span_from(start)))
                }
            }
            _ => Ok(Token::new(TokenKind::Lt, self.span_from(start))),
        }
    }

    /// After the newline that follows a `<<-TAG` marker, consume body lines
    /// through the terminator line.
    fn consume_pending_heredoc(
        &mut self,
        start: (usize, u32, u32),
    ) -> Result<(), SyntaxError> {
        let tag = match self.pending_heredoc.take() {
            Some(tag) => tag,
            None => return Ok(()),
        };
        loop {
            let line_start = self.current_pos;
            let rest = &self.source[line_start..];
            let line_end = rest.find('\n').map(|i| line_start + i);
            let line_text = match line_end {
                Some(end) => &self.source[line_start..end],
                None => rest,
            };
            let terminates = line_text.trim() == tag;
            // Consume the line including its newline
            loop {
                match self.advance() {
                    Some((_, '\n')) | None => break,
                    Some(_) => {}
                }
            }
            if terminates {
                return Ok(());
            }
            if self.is_at_end() {
                return Err(self.error(format!("unterminated heredoc `{tag}`"), start));
            }
        }
    }

    fn scan_operator(&mut self, start: (usize, u32, u32)) -> Result<Token, SyntaxError> {
        const OP_CHARS: &str = "+-*&^~!?>";
        let first = self.peek().unwrap_or('\0');
        self.advance();
        // Greedy multi-char operators: `**`, `&&`, `->`, `>=`, `!=`, `&.`,
        // compound assignments.
        if OP_CHARS.contains(first) {
            if first == '&' && self.peek() == Some('.') {
                self.advance();
                return Ok(Token::new(TokenKind::Op("&.".into()), self.span_from(start)));
            }
            if first == '-' && self.peek() == Some('>') {
                self.advance();
                return Ok(Token::new(TokenKind::Op("->".into()), self.span_from(start)));
            }
            if (first == '*' || first == '&') && self.peek() == Some(first) {
                self.advance();
            }
            if first == '>' && self.peek() == Some('>') {
                self.advance();
            }
            if first == '!' && self.peek() == Some('~') {
                self.advance();
            }
            if self.peek() == Some('=') {
                self.advance();
            }
        }
        let span = self.span_from(start);
        let text = self.source[span.start..span.end].to_string();
        Ok(Token::new(TokenKind::Op(text), span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .expect("lex failure")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_identifiers_keep_question_and_bang() {
        let toks = kinds("empty? nil! @var");
        assert_eq!(toks[0], TokenKind::Ident("empty?".into()));
        assert_eq!(toks[1], TokenKind::Ident("nil!".into()));
        assert_eq!(toks[2], TokenKind::InstanceVar("@var".into()));
    }

    #[test]
    fn test_bang_equal_is_operator() {
        let toks = kinds("a != b");
        assert_eq!(toks[0], TokenKind::Ident("a".into()));
        assert_eq!(toks[1], TokenKind::Op("!=".into()));
    }

    #[test]
    fn test_keywords_and_name_position() {
        let toks = kinds("def end_of_stream\nend");
        assert_eq!(toks[0], TokenKind::Keyword(Keyword::Def));
        assert_eq!(toks[1], TokenKind::Ident("end_of_stream".into()));
        assert_eq!(toks[2], TokenKind::Newline);
        assert_eq!(toks[3], TokenKind::Keyword(Keyword::End));

        // After a dot, `class` is a method name
        let toks = kinds("x.class");
        assert_eq!(toks[2], TokenKind::Ident("class".into()));
    }

    #[test]
    fn test_string_hides_keywords() {
        let toks = kinds("s = \"class end def\"");
        assert!(toks.iter().all(|k| !matches!(k, TokenKind::Keyword(_))));
        assert!(toks.contains(&TokenKind::Str));
    }

    #[test]
    fn test_string_interpolation_with_braces() {
        let toks = kinds("\"a #{ {1 => 2}.size } b\"");
        assert_eq!(toks[0], TokenKind::Str);
        assert_eq!(toks[1], TokenKind::Eof);
    }

    #[test]
    fn test_unterminated_string_is_error() {
        let err = Lexer::new("x = \"oops").tokenize().unwrap_err();
        assert!(err.message.contains("unterminated string"));
    }

    #[test]
    fn test_char_literal() {
        let toks = kinds("c = 'x'\nd = '\\n'");
        assert_eq!(toks[2], TokenKind::Char);
        assert_eq!(toks[6], TokenKind::Char);
    }

    #[test]
    fn test_symbols() {
        let toks = kinds(":foo :bar? :<=>");
        assert_eq!(toks[0], TokenKind::Symbol("foo".into()));
        assert_eq!(toks[1], TokenKind::Symbol("bar?".into()));
        assert_eq!(toks[2], TokenKind::Symbol("<=>".into()));
    }

    #[test]
    fn test_double_colon_path() {
        let toks = kinds("Foo::Bar");
        assert_eq!(toks[0], TokenKind::Const("Foo".into()));
        assert_eq!(toks[1], TokenKind::ColonColon);
        assert_eq!(toks[2], TokenKind::Const("Bar".into()));
    }

    #[test]
    fn test_numbers() {
        let toks = kinds("1_000 3.14 0xff 1e10 1..10");
        assert_eq!(toks[0], TokenKind::Number);
        assert_eq!(toks[1], TokenKind::Number);
        assert_eq!(toks[2], TokenKind::Number);
        assert_eq!(toks[3], TokenKind::Number);
        // Range does not absorb the dots
        assert_eq!(toks[4], TokenKind::Number);
        assert_eq!(toks[5], TokenKind::Op("..".into()));
        assert_eq!(toks[6], TokenKind::Number);
    }

    #[test]
    fn test_percent_literal_hides_content() {
        let toks = kinds("words = %w(class end def)");
        assert_eq!(toks[2], TokenKind::Str);
        assert_eq!(toks[3], TokenKind::Eof);
    }

    #[test]
    fn test_percent_after_value_is_modulo() {
        let toks = kinds("x % 2");
        assert_eq!(toks[1], TokenKind::Op("%".into()));
    }

    #[test]
    fn test_regex_vs_division() {
        let toks = kinds("r = /end/");
        assert_eq!(toks[2], TokenKind::Regex);

        let toks = kinds("x = a / b");
        assert_eq!(toks[3], TokenKind::Op("/".into()));
    }

    #[test]
    fn test_heredoc_consumes_body() {
        let source = "s = <<-EOS\nclass inside heredoc\nend\nEOS\nx = 1\n";
        let toks = kinds(source);
        // No keyword token leaks from the heredoc body
        assert!(toks.iter().all(|k| !matches!(k, TokenKind::Keyword(_))));
        assert!(toks.contains(&TokenKind::Ident("x".into())));
    }

    #[test]
    fn test_semicolon_is_newline() {
        let toks = kinds("a = 1; b = 2");
        assert_eq!(
            toks.iter()
                .filter(|k| matches!(k, TokenKind::Newline))
                .count(),
            1
        );
    }

    #[test]
    fn test_annotation_at_sign() {
        let toks = kinds("@[Link(\"m\")]");
        assert_eq!(toks[0], TokenKind::Op("@".into()));
        assert_eq!(toks[1], TokenKind::LBracket);
    }

    #[test]
    fn test_line_and_column_tracking() {
        let tokens = Lexer::new("abc\n  def foo").tokenize().unwrap();
        let def_tok = &tokens[2];
        assert_eq!(def_tok.kind, TokenKind::Keyword(Keyword::Def));
        assert_eq!(def_tok.span.line, 2);
        assert_eq!(def_tok.span.column, 3);
    }
}
