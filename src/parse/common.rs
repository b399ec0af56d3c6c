//! Parser primitives shared by the textual import dialects.

use winnow::combinator::{not, opt};
use winnow::error::{ContextError, ErrMode, ModalResult};
use winnow::prelude::*;
use winnow::token::{any, one_of, take_while};

use crate::types::RuleValue;

// -- Whitespace -------------------------------------------------------------

pub(crate) fn ws(input: &mut &str) -> ModalResult<()> {
    take_while(0.., |c: char| c.is_ascii_whitespace())
        .void()
        .parse_next(input)
}

// -- Keywords ---------------------------------------------------------------

/// Succeeds when the next character cannot extend an identifier.
pub(crate) fn word_boundary(input: &mut &str) -> ModalResult<()> {
    not(one_of(|c: char| c.is_ascii_alphanumeric() || c == '_')).parse_next(input)
}

/// A case-sensitive keyword that must end at a word boundary, so `and` does
/// not match the prefix of `android`.
pub(crate) fn word<'i>(tag: &'static str) -> impl Parser<&'i str, (), ErrMode<ContextError>> {
    (tag, word_boundary).void()
}

// -- Identifiers ------------------------------------------------------------

/// A bare field identifier: letter or underscore, then letters, digits,
/// underscores, or dots (`table.column`, `user.address.city`).
pub(crate) fn ident<'i>(input: &mut &'i str) -> ModalResult<&'i str> {
    (
        take_while(1.., |c: char| c.is_ascii_alphabetic() || c == '_'),
        take_while(0.., |c: char| {
            c.is_ascii_alphanumeric() || c == '_' || c == '.'
        }),
    )
        .take()
        .parse_next(input)
}

// -- String literals --------------------------------------------------------

/// Single-quoted string with `''` escaping the quote (SQL, SpEL).
pub(crate) fn single_quoted(input: &mut &str) -> ModalResult<String> {
    '\''.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        if ch == '\'' {
            if opt('\'').parse_next(input)?.is_some() {
                s.push('\'');
            } else {
                return Ok(s);
            }
        } else {
            s.push(ch);
        }
    }
}

/// Double-quoted string with backslash escapes (CEL, JSONata).
pub(crate) fn double_quoted(input: &mut &str) -> ModalResult<String> {
    '"'.parse_next(input)?;
    let mut s = String::new();
    loop {
        let ch = any.parse_next(input)?;
        match ch {
            '"' => return Ok(s),
            '\\' => {
                let esc = any.parse_next(input)?;
                match esc {
                    '"' => s.push('"'),
                    '\\' => s.push('\\'),
                    'n' => s.push('\n'),
                    't' => s.push('\t'),
                    other => {
                        s.push('\\');
                        s.push(other);
                    }
                }
            }
            c => s.push(c),
        }
    }
}

// -- Numbers ----------------------------------------------------------------

/// A signed numeric literal: digits with optional fraction and exponent.
/// Integers parse to `Int`, everything else (including integers too large
/// for `i64`) to `Float`.
pub(crate) fn number(input: &mut &str) -> ModalResult<RuleValue> {
    let literal = (
        opt(one_of(['-', '+'])),
        take_while(1.., |c: char| c.is_ascii_digit()),
        opt(('.', take_while(1.., |c: char| c.is_ascii_digit()))),
        opt((
            one_of(['e', 'E']),
            opt(one_of(['-', '+'])),
            take_while(1.., |c: char| c.is_ascii_digit()),
        )),
    )
        .take()
        .parse_next(input)?;

    if literal.contains('.') || literal.contains('e') || literal.contains('E') {
        let f: f64 = literal
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(RuleValue::Float(f))
    } else if let Ok(i) = literal.parse::<i64>() {
        Ok(RuleValue::Int(i))
    } else {
        let f: f64 = literal
            .parse()
            .map_err(|_| ErrMode::from_input(input).cut())?;
        Ok(RuleValue::Float(f))
    }
}

/// Recognize a string that is a complete numeric literal (surrounding
/// whitespace allowed). `inf` and `NaN` are not literals.
pub(crate) fn numeric_value(text: &str) -> Option<RuleValue> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    number.parse(trimmed).ok()
}
