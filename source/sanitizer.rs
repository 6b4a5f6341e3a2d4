// Pure string operations used while loading mapping rows: defanging text that is about to be
// wrapped in a block comment, decoding the source language's unicode escapes, and validating that
// a renamed name is actually usable as an identifier.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections;

static UNICODE_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\u+([0-9a-fA-F]{4})").unwrap());

// An asterisk, then a slash, each of which may be spelled literally or as a \u escape of its code
// point (0x2a, 0x2f). Only the slash half of the pair is captured: it's the half we replace.
static COMMENT_TERMINATOR: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?:\*|\\u+002[aA])(/|\\u+002[fF])").unwrap());

static RESERVED_WORDS: Lazy<collections::HashSet<&'static str>> = Lazy::new(|| {
  [
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "final", "finally", "float",
    "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "package", "private", "protected", "public", "return", "short", "static",
    "strictfp", "super", "switch", "synchronized", "this", "throw", "throws", "transient", "try",
    "void", "volatile", "while", "true", "false", "null", "var", "record", "yield", "sealed",
    "permits", "non-sealed",
  ]
  .into_iter()
  .collect()
});

/// Replaces the slash half of every comment-terminating `*/` (literal or `\u`-escaped) with
/// `&#x2f;`, so the text can be safely embedded inside a `/* ... */` block.
pub fn escape_comment_terminators(input: &str) -> String {
  let mut output = String::with_capacity(input.len());
  let mut consumed = 0;
  for captures in COMMENT_TERMINATOR.captures_iter(input) {
    let slash = captures.get(1).unwrap();
    output.push_str(&input[consumed..slash.start()]);
    output.push_str("&#x2f;");
    consumed = slash.end();
  }
  output.push_str(&input[consumed..]);
  output
}

/// Decodes every `\u+XXXX` escape (any number of leading `u`s, four hex digits) into the
/// character at that code point. Text with no such escapes passes through unchanged.
pub fn decode_unicode_escapes(input: &str) -> String {
  UNICODE_ESCAPE
    .replace_all(input, |captures: &Captures| {
      let code = u32::from_str_radix(&captures[1], 16).unwrap();
      match char::from_u32(code) {
        Some(c) => c.to_string(),
        // A lone surrogate half: not representable as a char, leave the escape as-is.
        None => captures[0].to_string(),
      }
    })
    .into_owned()
}

fn is_identifier_start(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_part(c: char) -> bool {
  is_identifier_start(c) || c.is_ascii_digit()
}

/// Whether `candidate` (optionally unicode-escape-decoded first) is a valid identifier: starts
/// with an identifier-start character, continues with identifier-part characters, and isn't one
/// of the target language's reserved words.
pub fn is_valid_identifier(candidate: &str, decode_escapes: bool) -> bool {
  let decoded;
  let name = if decode_escapes {
    decoded = decode_unicode_escapes(candidate);
    decoded.as_str()
  } else {
    candidate
  };
  let mut chars = name.chars();
  match chars.next() {
    Some(c) if is_identifier_start(c) => (),
    _ => return false,
  }
  if !chars.clone().all(is_identifier_part) {
    return false;
  }
  !RESERVED_WORDS.contains(name)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn comment_terminator_literal() {
    assert_eq!("a*&#x2f;b", escape_comment_terminators("a*/b"));
  }

  #[test]
  fn comment_terminator_no_match() {
    assert_eq!("a*b/c", escape_comment_terminators("a*b/c"));
  }

  #[test]
  fn comment_terminator_escaped_slash() {
    assert_eq!(r"a*&#x2f;b", escape_comment_terminators(r"a*/b"));
  }

  #[test]
  fn comment_terminator_escaped_asterisk() {
    assert_eq!(r"a*&#x2f;b", escape_comment_terminators(r"a*/b"));
  }

  #[test]
  fn comment_terminator_multiple() {
    assert_eq!("x*&#x2f;*&#x2f;y", escape_comment_terminators("x*/*/y"));
  }

  #[test]
  fn comment_terminator_defang_property() {
    for input in ["*/", r"*/", r"*/", "a*/b*/c", "no terminators here"] {
      let escaped = escape_comment_terminators(input);
      assert!(!escaped.contains("*/"));
    }
  }

  #[test]
  fn unicode_escape_decode() {
    assert_eq!("newa", decode_unicode_escapes(r"\u006eewa"));
  }

  #[test]
  fn unicode_escape_round_trip_without_escapes() {
    for input in ["plain", "", "with spaces and *stuff*"] {
      assert_eq!(input, decode_unicode_escapes(input));
    }
  }

  #[test]
  fn identifier_validity() {
    assert!(is_valid_identifier(r"\u006eewa", true));
    assert!(!is_valid_identifier("new", false));
    assert!(is_valid_identifier("foo", false));
    assert!(is_valid_identifier("_foo$1", false));
    assert!(!is_valid_identifier("1foo", false));
    assert!(!is_valid_identifier("fo o", false));
    assert!(!is_valid_identifier("", false));
  }
}
