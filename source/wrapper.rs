// Wraps a block of free text to a maximum line length, re-applying a fixed prefix (the comment
// continuation marker, e.g. "     * ") to every line it produces.

use std::{error, fmt};

#[derive(Debug)]
pub struct PrefixTooLong;

impl fmt::Display for PrefixTooLong {
  fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(formatter, "prefix is not shorter than the maximum line length")
  }
}

impl error::Error for PrefixTooLong {}

pub struct Wrapper {
  max_line_length: usize,
  prefix: String,
  line_break: String,
}

impl Wrapper {
  pub fn new(
    max_line_length: usize,
    prefix: impl Into<String>,
    line_break: impl Into<String>,
  ) -> Result<Self, PrefixTooLong> {
    let prefix = prefix.into();
    if prefix.chars().count() >= max_line_length {
      return Err(PrefixTooLong);
    }
    Ok(Self { max_line_length, prefix, line_break: line_break.into() })
  }

  /// Wraps `text`, prefixing every output line and joining them with the configured line break.
  /// Existing line breaks in `text` are treated as forced breaks.
  pub fn wrap(&self, text: &str) -> String {
    let prefix_len = self.prefix.chars().count();
    let mut pending: std::collections::VecDeque<String> = text.split('\n').map(String::from).collect();
    let mut lines = Vec::new();
    while let Some(line) = pending.pop_front() {
      let candidate = format!("{}{}", self.prefix, line);
      let chars: Vec<char> = candidate.chars().collect();
      if chars.len() <= self.max_line_length {
        lines.push(candidate);
        continue;
      }

      let upper = (self.max_line_length - 1).min(chars.len().saturating_sub(1));
      let mut split_at = None;
      if upper >= prefix_len {
        for index in (prefix_len..=upper).rev() {
          if chars[index] == ' ' {
            split_at = Some(index + 1);
            break;
          }
        }
      }
      if split_at.is_none() {
        for index in self.max_line_length..chars.len().saturating_sub(1) {
          if chars[index] == ' ' {
            split_at = Some(index + 1);
            break;
          }
        }
      }

      match split_at {
        Some(at) => {
          lines.push(chars[..at].iter().collect());
          let remainder: String = chars[at..].iter().collect();
          pending.push_front(remainder);
        }
        None => lines.push(candidate),
      }
    }
    lines.join(&self.line_break)
  }
}
