// A hand-rolled, pull-based reader for the RFC4180-ish tabular files the mapping loaders consume.
// No crate does the parsing: the format is small and the caller needs exact (char, row, column)
// positions on failure, which a general-purpose CSV crate doesn't hand back in this shape.

use std::{error, fmt};

/// Supplies chunks of the underlying text on demand. Chunk boundaries carry no meaning; a reader
/// must behave identically no matter how the same text is split across calls to `pull`.
pub trait Source {
  /// Returns the next chunk, or `None` once the source is exhausted. Must keep returning `None`
  /// after the first `None`.
  fn pull(&mut self) -> anyhow::Result<Option<String>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
  pub char_index: usize,
  pub row_index: usize,
  pub column_index: usize,
}

#[derive(Debug)]
pub enum Error {
  /// The underlying `Source` failed.
  Source(anyhow::Error),
  /// The text isn't valid tabular data at this position.
  Parse { position: Position, message: String },
  /// The reader was driven out of its documented protocol (a caller bug, not a data problem).
  Internal(String),
}

impl fmt::Display for Error {
  fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::Source(error) => write!(formatter, "source error: {error}"),
      Error::Parse { position, message } => write!(
        formatter,
        "{message} (char {}, row {}, column {})",
        position.char_index, position.row_index, position.column_index
      ),
      Error::Internal(message) => write!(formatter, "internal error: {message}"),
    }
  }
}

impl error::Error for Error {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peek {
  Value,
  Row,
  End,
}

pub struct Reader<S> {
  source: S,
  buffer: String,
  reached_end: bool,
  char_index: usize,
  row_index: usize,
  column_index: usize,
}

impl<S: Source> Reader<S> {
  pub fn new(source: S) -> Self {
    Self {
      source,
      buffer: String::new(),
      reached_end: false,
      char_index: 0,
      row_index: 0,
      column_index: 0,
    }
  }

  pub fn position(&self) -> Position {
    Position { char_index: self.char_index, row_index: self.row_index, column_index: self.column_index }
  }

  fn parse_error(&self, message: impl Into<String>) -> Error {
    Error::Parse { position: self.position(), message: message.into() }
  }

  fn internal_error(&self, message: impl Into<String>) -> Error {
    Error::Internal(message.into())
  }

  fn pull_more(&mut self) -> Result<(), Error> {
    match self.source.pull().map_err(Error::Source)? {
      Some(chunk) => {
        self.buffer.push_str(&chunk);
        Ok(())
      }
      None => {
        self.reached_end = true;
        Ok(())
      }
    }
  }

  fn ensure(&mut self, bytes: usize) -> Result<(), Error> {
    while self.buffer.len() < bytes && !self.reached_end {
      self.pull_more()?;
    }
    Ok(())
  }

  fn advance(&mut self, bytes: usize) {
    self.char_index += self.buffer[..bytes].chars().count();
    self.buffer.drain(..bytes);
  }

  fn row_terminator_len(&mut self) -> Result<Option<usize>, Error> {
    self.ensure(2)?;
    if self.buffer.starts_with("\r\n") {
      Ok(Some(2))
    } else if self.buffer.starts_with('\n') {
      Ok(Some(1))
    } else {
      Ok(None)
    }
  }

  /// What's next in the stream: a value, a row terminator, or the end of input.
  pub fn peek_next(&mut self) -> Result<Peek, Error> {
    self.ensure(2)?;
    if self.buffer.is_empty() && self.reached_end {
      return Ok(Peek::End);
    }
    if self.row_terminator_len()?.is_some() {
      return Ok(Peek::Row);
    }
    Ok(Peek::Value)
  }

  pub fn has_more(&mut self) -> Result<bool, Error> {
    Ok(self.peek_next()? != Peek::End)
  }

  pub fn is_next_value(&mut self) -> Result<bool, Error> {
    Ok(self.peek_next()? == Peek::Value)
  }

  pub fn is_next_new_row(&mut self) -> Result<bool, Error> {
    Ok(self.peek_next()? == Peek::Row)
  }

  /// True when, at the start of a row, nothing but the end of input follows: the row terminator
  /// that got us here was just a trailing newline, not an empty record.
  pub fn is_trailing_empty_row(&mut self) -> Result<bool, Error> {
    Ok(self.column_index == 0 && self.peek_next()? == Peek::End)
  }

  /// Consumes the row terminator that must be next. Requires at least one value to have been
  /// read on the current row.
  pub fn next_row(&mut self) -> Result<(), Error> {
    if self.column_index == 0 {
      return Err(self.internal_error("next_row called before any value was read on this row"));
    }
    match self.row_terminator_len()? {
      Some(len) => {
        self.advance(len);
        self.row_index += 1;
        self.column_index = 0;
        Ok(())
      }
      None => Err(self.internal_error("next_row called but the next token isn't a row terminator")),
    }
  }

  /// Peeks what's next; if it's a row terminator, consumes it. When `expect_trailing_empty_row`
  /// is set and consuming it leaves nothing but the end of input, reports `End` instead of `Row`
  /// so the caller doesn't treat a file's trailing newline as one more empty record.
  pub fn peek_or_consume_next(&mut self, expect_trailing_empty_row: bool) -> Result<Peek, Error> {
    match self.peek_next()? {
      Peek::Row => {
        self.next_row()?;
        if expect_trailing_empty_row && self.is_trailing_empty_row()? {
          Ok(Peek::End)
        } else {
          Ok(Peek::Row)
        }
      }
      other => Ok(other),
    }
  }

  fn consume_unquoted(&mut self, sink: &mut String) -> Result<(), Error> {
    loop {
      match memchr::memchr3(b',', b'"', b'\n', self.buffer.as_bytes()) {
        Some(index) => {
          if self.buffer.as_bytes()[index] == b'"' {
            return Err(self.parse_error("unexpected quote inside an unquoted value"));
          }
          let mut end = index;
          if self.buffer.as_bytes()[index] == b'\n' && end > 0 && self.buffer.as_bytes()[end - 1] == b'\r' {
            end -= 1;
          }
          sink.push_str(&self.buffer[..end]);
          self.advance(end);
          return Ok(());
        }
        None => {
          if self.reached_end {
            sink.push_str(&self.buffer);
            let remaining = self.buffer.len();
            self.advance(remaining);
            return Ok(());
          }
          self.pull_more()?;
        }
      }
    }
  }

  fn consume_quoted(&mut self, sink: &mut String) -> Result<(), Error> {
    loop {
      self.ensure(1)?;
      if self.buffer.is_empty() {
        return Err(self.parse_error("unterminated quoted value"));
      }
      match memchr::memchr(b'"', self.buffer.as_bytes()) {
        Some(index) => {
          sink.push_str(&self.buffer[..index]);
          self.advance(index);
          self.advance(1);
          self.ensure(1)?;
          if self.buffer.starts_with('"') {
            sink.push('"');
            self.advance(1);
            continue;
          }
          if !(self.buffer.is_empty() || self.buffer.starts_with(',') || self.row_terminator_len()?.is_some()) {
            return Err(self.parse_error("quoted value followed by an unexpected character"));
          }
          return Ok(());
        }
        None => {
          sink.push_str(&self.buffer);
          let remaining = self.buffer.len();
          self.advance(remaining);
          if self.reached_end {
            return Err(self.parse_error("unterminated quoted value"));
          }
          self.pull_more()?;
        }
      }
    }
  }

  /// Reads one value into `sink`, consuming a leading separator first if this isn't the row's
  /// first column.
  pub fn read_value(&mut self, sink: &mut String) -> Result<(), Error> {
    if self.column_index > 0 {
      self.ensure(1)?;
      if !self.buffer.starts_with(',') {
        return Err(self.internal_error("read_value called but the next character isn't a separator"));
      }
      self.advance(1);
    }
    self.ensure(1)?;
    if self.buffer.starts_with('"') {
      self.advance(1);
      self.consume_quoted(sink)?;
    } else {
      self.consume_unquoted(sink)?;
    }
    self.column_index += 1;
    Ok(())
  }

  pub fn skip_value(&mut self) -> Result<(), Error> {
    let mut discard = String::new();
    self.read_value(&mut discard)
  }

  /// Reads an entire row, or `None` if the reader is already at the end of input.
  pub fn read_row(&mut self) -> Result<Option<Vec<String>>, Error> {
    if !self.has_more()? {
      return Ok(None);
    }
    let mut row = Vec::new();
    loop {
      let mut value = String::new();
      self.read_value(&mut value)?;
      row.push(value);
      match self.peek_or_consume_next(true)? {
        Peek::Value => continue,
        Peek::Row | Peek::End => break,
      }
    }
    Ok(Some(row))
  }
}
