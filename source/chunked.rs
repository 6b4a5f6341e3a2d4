// A tabular::Source that feeds off a std::io::Read in fixed-size chunks, carrying over any
// trailing incomplete UTF-8 sequence to the next pull. Modeled after the carry-over buffer a
// chunked async decoder needs when a multi-byte character straddles two reads.

use std::io;

const CHUNK_SIZE: usize = 64 * 1024;

pub struct FileSource<R> {
  reader: R,
  leftover: Vec<u8>,
  done: bool,
}

impl<R: io::Read> FileSource<R> {
  pub fn new(reader: R) -> Self {
    Self { reader, leftover: Vec::new(), done: false }
  }

  pub fn pull(&mut self) -> anyhow::Result<Option<String>> {
    if self.done {
      return Ok(None);
    }
    let mut buf = vec![0u8; CHUNK_SIZE];
    let read = self.reader.read(&mut buf)?;
    buf.truncate(read);

    let mut data = std::mem::take(&mut self.leftover);
    data.extend_from_slice(&buf);

    if read == 0 {
      self.done = true;
      if data.is_empty() {
        return Ok(None);
      }
      return match String::from_utf8(data) {
        Ok(text) => Ok(Some(text)),
        Err(_) => anyhow::bail!("invalid UTF-8 at the end of the input"),
      };
    }

    match std::str::from_utf8(&data) {
      Ok(text) => Ok(Some(text.to_string())),
      Err(error) => {
        let valid_up_to = error.valid_up_to();
        let (valid, rest) = data.split_at(valid_up_to);
        let text = std::str::from_utf8(valid).unwrap().to_string();
        self.leftover = rest.to_vec();
        Ok(Some(text))
      }
    }
  }
}

impl<R: io::Read> crate::tabular::Source for FileSource<R> {
  fn pull(&mut self) -> anyhow::Result<Option<String>> {
    FileSource::pull(self)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_everything_in_one_go_when_the_buffer_suffices() {
    let mut source = FileSource::new(io::Cursor::new(b"hello world".to_vec()));
    let mut collected = String::new();
    while let Some(chunk) = source.pull().unwrap() {
      collected.push_str(&chunk);
    }
    assert_eq!(collected, "hello world");
  }

  #[test]
  fn carries_over_a_split_multibyte_character() {
    struct OneByteAtATime(std::vec::IntoIter<u8>);
    impl io::Read for OneByteAtATime {
      fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.next() {
          Some(byte) => {
            buf[0] = byte;
            Ok(1)
          }
          None => Ok(0),
        }
      }
    }
    let bytes = "é".as_bytes().to_vec();
    let mut source = FileSource::new(OneByteAtATime(bytes.into_iter()));
    let mut collected = String::new();
    while let Some(chunk) = source.pull().unwrap() {
      collected.push_str(&chunk);
    }
    assert_eq!(collected, "é");
  }
}
