//! Rule DSL parser.
//!
//! Recursive descent over the grammar
//!
//! ```text
//! rule    := CROSS_ABOVE(op, op) | CROSS_BELOW(op, op) | ABOVE(op, op) | BELOW(op, op)
//!          | BETWEEN(op, num, num) | AND(rule, rule, ...) | OR(rule, rule, ...)
//!          | NOT(rule) | CONSECUTIVE(rule, int) | ANY_OF(rule, int)
//! op      := open | high | low | close | volume | num | instance.plot
//! ```
//!
//! Errors carry the character offset of the offending token. Rules may nest
//! at most [`MAX_DEPTH`] levels deep.

use crate::domain::error::EngineError;
use crate::domain::rule::{Operand, Rule};

pub const MAX_DEPTH: usize = 64;

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> EngineError {
        self.error_at(self.pos, message)
    }

    fn error_at(&self, position: usize, message: impl Into<String>) -> EngineError {
        EngineError::RuleParse {
            position,
            message: message.into(),
        }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), EngineError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(self.error(format!("expected '{}', found '{}'", expected, ch))),
            None => Err(self.error(format!("expected '{}', found end of input", expected))),
        }
    }

    /// Identifier characters, including the `-` of generated instance ids.
    fn is_word_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || ch == '-'
    }

    fn peek_word(&self) -> &'a str {
        let rest = self.remaining();
        let end = rest
            .char_indices()
            .find(|&(_, ch)| !Self::is_word_char(ch))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        &rest[..end]
    }

    fn describe_next(&self) -> String {
        let word = self.peek_word();
        if !word.is_empty() {
            word.to_string()
        } else {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        }
    }

    fn take_word(&mut self) -> &'a str {
        let word = self.peek_word();
        self.pos += word.len();
        word
    }

    fn parse_number(&mut self) -> Result<f64, EngineError> {
        self.skip_whitespace();
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        if self.peek() == Some('-') {
            self.advance();
        }
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(self.error_at(start, "expected number"));
        }
        let text = &self.input[start..self.pos];
        text.parse::<f64>()
            .map_err(|_| self.error_at(start, format!("invalid number: {}", text)))
    }

    fn parse_count(&mut self) -> Result<usize, EngineError> {
        self.skip_whitespace();
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        let text = &self.input[start..self.pos];
        match text.parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(self.error_at(start, "expected a positive integer")),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, EngineError> {
        self.skip_whitespace();
        if self
            .peek()
            .is_some_and(|ch| ch.is_ascii_digit() || ch == '-' || ch == '.')
        {
            return Ok(Operand::Constant(self.parse_number()?));
        }

        let start = self.pos;
        let word = self.take_word();
        if word.is_empty() {
            return Err(self.error(format!("expected operand, found '{}'", self.describe_next())));
        }

        if self.peek() == Some('.') {
            self.advance();
            let plot = self.take_word();
            if plot.is_empty() {
                return Err(self.error("expected plot name after '.'"));
            }
            return Ok(Operand::plot(word, plot));
        }

        match word {
            "open" => Ok(Operand::Open),
            "high" => Ok(Operand::High),
            "low" => Ok(Operand::Low),
            "close" => Ok(Operand::Close),
            "volume" => Ok(Operand::Volume),
            _ => Err(self.error_at(
                start,
                format!(
                    "expected price field or instance.plot, found '{}'",
                    word
                ),
            )),
        }
    }

    fn parse_rule_list(&mut self, keyword: &str) -> Result<Vec<Rule>, EngineError> {
        let mut rules = vec![self.parse_rule()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some(')') {
                self.advance();
                break;
            }
            self.expect_char(',')?;
            rules.push(self.parse_rule()?);
        }
        if rules.len() < 2 {
            return Err(self.error(format!("{} requires at least 2 rules", keyword)));
        }
        Ok(rules)
    }

    fn parse_rule(&mut self) -> Result<Rule, EngineError> {
        self.skip_whitespace();
        if self.depth == MAX_DEPTH {
            return Err(self.error("rule nested too deeply"));
        }
        self.depth += 1;
        let rule = self.parse_rule_body();
        self.depth -= 1;
        rule
    }

    fn parse_rule_body(&mut self) -> Result<Rule, EngineError> {
        let start = self.pos;
        let keyword = self.take_word();
        if keyword.is_empty() {
            return Err(self.error(format!("expected rule, found '{}'", self.describe_next())));
        }
        self.expect_char('(')?;

        let rule = match keyword {
            "CROSS_ABOVE" | "CROSS_BELOW" | "ABOVE" | "BELOW" => {
                let left = self.parse_operand()?;
                self.expect_char(',')?;
                let right = self.parse_operand()?;
                self.expect_char(')')?;
                match keyword {
                    "CROSS_ABOVE" => Rule::CrossAbove { left, right },
                    "CROSS_BELOW" => Rule::CrossBelow { left, right },
                    "ABOVE" => Rule::Above { left, right },
                    _ => Rule::Below { left, right },
                }
            }
            "BETWEEN" => {
                let operand = self.parse_operand()?;
                self.expect_char(',')?;
                let lower = self.parse_number()?;
                self.expect_char(',')?;
                let upper = self.parse_number()?;
                self.expect_char(')')?;
                if lower > upper {
                    return Err(self.error_at(start, "BETWEEN lower bound exceeds upper bound"));
                }
                Rule::Between {
                    operand,
                    lower,
                    upper,
                }
            }
            "AND" => Rule::And(self.parse_rule_list(keyword)?),
            "OR" => Rule::Or(self.parse_rule_list(keyword)?),
            "NOT" => {
                let rule = self.parse_rule()?;
                self.expect_char(')')?;
                Rule::Not(Box::new(rule))
            }
            "CONSECUTIVE" | "ANY_OF" => {
                let rule = Box::new(self.parse_rule()?);
                self.expect_char(',')?;
                let count = self.parse_count()?;
                self.expect_char(')')?;
                if keyword == "CONSECUTIVE" {
                    Rule::Consecutive { rule, count }
                } else {
                    Rule::AnyOf { rule, count }
                }
            }
            other => return Err(self.error_at(start, format!("expected rule, found '{}'", other))),
        };
        Ok(rule)
    }

    fn parse(&mut self) -> Result<Rule, EngineError> {
        let rule = self.parse_rule()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(self.error(format!(
                "unexpected input after rule: '{}'",
                self.remaining()
            )));
        }
        Ok(rule)
    }
}

pub fn parse(input: &str) -> Result<Rule, EngineError> {
    Parser::new(input).parse()
}
