// The streaming rewriter: fed arbitrary chunks of source text via `append`, it recognizes
// obfuscated-name declarations and references and rewrites them in place, writing output to a
// sink as soon as it's sure a span of buffered text can no longer change.
//
// The `regex` crate has no lookbehind and no signal for "this might still extend given more
// input", so both are emulated here: override suppression is checked by hand against the text
// just before a declaration match, and a match that ends exactly at the tail of the buffer is
// treated as possibly still growing and held back until more text (or `finish`) arrives.

use crate::{
  mapping::Store,
  wrapper::Wrapper,
};
use once_cell::sync::Lazy;
use regex::{Captures, Match, Regex};
use std::{error, fmt, io};

/// Declarations and references never span more than this many bytes; below this much buffered
/// text we can't yet be sure a match found near the tail wouldn't grow if given more input.
const MIN_LOOKAHEAD: usize = 4096;

const DOC_WIDTH: usize = 80;

static PATTERN: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?P<brk>\r?\n)(?P<indent> {4}|\t)(?:[\w$.\[\]]+ )*(?:(?P<declfield>field_[0-9]+_\w+)[ ]*(?:=|;)|(?P<declmethod>func_[0-9]+_\w+)\()|(?P<reffield>field_[0-9]+_\w+)|(?P<refmethod>func_[0-9]+_\w+)|(?P<refparam>p_\w+_[0-9]+_)",
  )
  .unwrap()
});

#[derive(Debug)]
pub enum Error {
  AppendAfterFinish,
  Io(io::Error),
}

impl fmt::Display for Error {
  fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::AppendAfterFinish => write!(formatter, "append called after finish"),
      Error::Io(error) => write!(formatter, "{error}"),
    }
  }
}

impl error::Error for Error {}

#[derive(Clone, Copy)]
enum Category {
  Field,
  Method,
}

pub struct Rewriter<'store, W> {
  store: &'store Store,
  sink: W,
  buffer: String,
  finished: bool,
}

impl<'store, W: io::Write> Rewriter<'store, W> {
  pub fn new(store: &'store Store, sink: W) -> Self {
    Self { store, sink, buffer: String::new(), finished: false }
  }

  /// Feeds another chunk of source text in. Chunk boundaries are arbitrary: the same input fed
  /// through any split into `append` calls produces the same output.
  pub fn append(&mut self, chunk: &str) -> Result<(), Error> {
    if self.finished {
      return Err(Error::AppendAfterFinish);
    }
    self.buffer.push_str(chunk);
    self.drain(false)
  }

  /// Signals that no more input is coming, flushing everything buffered and returning the sink.
  pub fn finish(mut self) -> Result<W, Error> {
    if self.finished {
      return Err(Error::AppendAfterFinish);
    }
    self.drain(true)?;
    self.finished = true;
    Ok(self.sink)
  }

  fn drain(&mut self, finishing: bool) -> Result<(), Error> {
    loop {
      if !finishing && self.buffer.len() < MIN_LOOKAHEAD {
        return Ok(());
      }
      match PATTERN.captures(&self.buffer) {
        None => {
          if finishing {
            self.flush_prefix(self.buffer.len())?;
          } else {
            let mut cut = self.buffer.len().saturating_sub(MIN_LOOKAHEAD);
            while cut > 0 && !self.buffer.is_char_boundary(cut) {
              cut -= 1;
            }
            self.flush_prefix(cut)?;
          }
          return Ok(());
        }
        Some(captures) => {
          let whole = captures.get(0).unwrap();
          if !finishing && whole.end() == self.buffer.len() {
            self.flush_prefix(whole.start())?;
            return Ok(());
          }
          let start = whole.start();
          let end = whole.end();
          let segment = self.render(&captures);
          self.sink.write_all(self.buffer[..start].as_bytes()).map_err(Error::Io)?;
          self.sink.write_all(segment.as_bytes()).map_err(Error::Io)?;
          self.buffer.drain(..end);
        }
      }
    }
  }

  fn flush_prefix(&mut self, end: usize) -> Result<(), Error> {
    self.sink.write_all(self.buffer[..end].as_bytes()).map_err(Error::Io)?;
    self.buffer.drain(..end);
    Ok(())
  }

  fn render(&self, captures: &Captures) -> String {
    if let Some(ident) = captures.name("declfield") {
      self.render_declaration(captures, ident, Category::Field)
    } else if let Some(ident) = captures.name("declmethod") {
      self.render_declaration(captures, ident, Category::Method)
    } else if let Some(ident) = captures.name("reffield") {
      self.render_reference(ident, Category::Field)
    } else if let Some(ident) = captures.name("refmethod") {
      self.render_reference(ident, Category::Method)
    } else if let Some(ident) = captures.name("refparam") {
      self.store.param_rename(ident.as_str()).unwrap_or(ident.as_str()).to_string()
    } else {
      unreachable!("the composite pattern always has exactly one active alternative")
    }
  }

  fn lookup(&self, category: Category, name: &str) -> (Option<&str>, Option<&str>) {
    match category {
      Category::Field => (self.store.field_rename(name), self.store.field_doc(name)),
      Category::Method => (self.store.method_rename(name), self.store.method_doc(name)),
    }
  }

  fn render_reference(&self, ident: Match, category: Category) -> String {
    let (renamed, _doc) = self.lookup(category, ident.as_str());
    renamed.unwrap_or(ident.as_str()).to_string()
  }

  fn render_declaration(&self, captures: &Captures, ident: Match, category: Category) -> String {
    let whole = captures.get(0).unwrap();
    let brk = captures.name("brk").unwrap().as_str();
    let indent = captures.name("indent").unwrap().as_str();
    let original = ident.as_str();
    let (renamed, doc) = self.lookup(category, original);

    let overridden = self.buffer[..whole.start()].trim_end_matches(' ').ends_with("@Override");

    let mut out = String::new();
    if !overridden {
      if let Some(doc) = doc {
        out.push_str(&render_doc_block(brk, indent, doc));
      }
    }
    out.push_str(&self.buffer[whole.start()..ident.start()]);
    out.push_str(renamed.unwrap_or(original));
    out.push_str(&self.buffer[ident.end()..whole.end()]);
    out
  }
}

fn render_doc_block(brk: &str, indent: &str, doc: &str) -> String {
  let mut out = String::new();
  out.push_str(brk);
  out.push_str(indent);
  out.push_str("/**");
  out.push_str(brk);
  let wrapper = Wrapper::new(DOC_WIDTH, format!("{indent} * "), brk.to_string())
    .expect("captured indentation is always far shorter than the doc width");
  out.push_str(&wrapper.wrap(doc));
  out.push_str(brk);
  out.push_str(indent);
  out.push_str(" */");
  out
}
