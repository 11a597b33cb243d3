//! Splitting of manifest command lines into argument vectors using `nom`.
//!
//! Words are separated by whitespace. Single quotes keep their content
//! literally, double quotes allow backslash escapes, and a backslash outside
//! quotes escapes the next character. No variable expansion is performed.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_while, take_while1},
    character::complete::{anychar, char, multispace0},
    multi::{many0, many1},
    sequence::{delimited, preceded},
};
use thiserror::Error;

/// A command line could not be split into words.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unterminated quote or escape at byte {offset} of command line")]
pub struct CommandLineError {
    /// Byte offset where the unparsable word begins.
    pub offset: usize,
}

fn single_quoted(input: &str) -> IResult<&str, String> {
    delimited(char('\''), take_while(|c: char| c != '\''), char('\''))
        .map(str::to_owned)
        .parse(input)
}

fn escaped(input: &str) -> IResult<&str, String> {
    preceded(char('\\'), anychar)
        .map(String::from)
        .parse(input)
}

fn double_quoted(input: &str) -> IResult<&str, String> {
    let plain = take_while1(|c: char| c != '"' && c != '\\').map(str::to_owned);
    delimited(char('"'), many0(alt((escaped, plain))), char('"'))
        .map(|parts: Vec<String>| parts.concat())
        .parse(input)
}

fn bare(input: &str) -> IResult<&str, String> {
    take_while1(|c: char| !c.is_whitespace() && !matches!(c, '\'' | '"' | '\\'))
        .map(str::to_owned)
        .parse(input)
}

/// Parses one word, which may be glued from several quoted and bare pieces.
fn word(input: &str) -> IResult<&str, String> {
    many1(alt((single_quoted, double_quoted, escaped, bare)))
        .map(|parts: Vec<String>| parts.concat())
        .parse(input)
}

/// Splits a command line into its argument vector.
///
/// # Errors
///
/// Returns [`CommandLineError`] on an unterminated quote or a trailing backslash.
pub fn split(line: &str) -> Result<Vec<String>, CommandLineError> {
    let mut words = Vec::new();
    let mut remaining = line;

    loop {
        let (rest, _) = multispace0::<&str, nom::error::Error<&str>>(remaining)
            .map_err(|_| CommandLineError {
                offset: line.len() - remaining.len(),
            })?;
        remaining = rest;
        if remaining.is_empty() {
            break;
        }

        let (rest, token) = word(remaining).map_err(|_| CommandLineError {
            offset: line.len() - remaining.len(),
        })?;
        words.push(token);
        remaining = rest;
    }

    Ok(words)
}
