// One shared row-reading skeleton, parameterized by a per-file row transform, rather than three
// near-identical copy-pasted loaders. Each of fields.csv/methods.csv/params.csv gets its own thin
// wrapper supplying the header it expects and what to do with a row.

use super::store::{Entry, ProjectType};
use crate::{chunked, diagnostics::Diagnostics, sanitizer, tabular};
use std::{collections::HashMap, error, fmt, fs, path::Path, path::PathBuf};

#[derive(Debug)]
pub enum Error {
  Io(PathBuf, std::io::Error),
  Header { path: PathBuf, expected: Vec<String>, found: Vec<String> },
  Tabular(tabular::Error),
}

impl fmt::Display for Error {
  fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::Io(path, error) => write!(formatter, "{}: {error}", path.display()),
      Error::Header { path, expected, found } => write!(
        formatter,
        "{}: expected header {expected:?}, found {found:?}",
        path.display()
      ),
      Error::Tabular(error) => write!(formatter, "{error}"),
    }
  }
}

impl error::Error for Error {}

impl From<tabular::Error> for Error {
  fn from(error: tabular::Error) -> Self {
    Error::Tabular(error)
  }
}

pub enum RowOutcome<T> {
  Insert(String, T),
  Skip,
}

/// Reads `path` as a header row followed by data rows, calling `transform` on each data row.
/// Returns `Ok(None)` when `path` doesn't exist: the caller treats a missing mapping file as
/// "this category contributes nothing", not an error.
fn load_rows<T>(
  path: &Path,
  expected_header: &[&str],
  label: &str,
  diagnostics: &dyn Diagnostics,
  mut transform: impl FnMut(&[String]) -> Result<RowOutcome<T>, String>,
) -> Result<Option<HashMap<String, T>>, Error> {
  if !path.exists() {
    return Ok(None);
  }
  let file = fs::File::open(path).map_err(|error| Error::Io(path.to_path_buf(), error))?;
  let mut reader = tabular::Reader::new(chunked::FileSource::new(file));

  let header = reader.read_row()?.unwrap_or_default();
  if header != expected_header {
    return Err(Error::Header {
      path: path.to_path_buf(),
      expected: expected_header.iter().map(|s| s.to_string()).collect(),
      found: header,
    });
  }

  let mut table = HashMap::new();
  while let Some(row) = reader.read_row()? {
    match transform(&row) {
      Ok(RowOutcome::Insert(key, value)) => {
        if table.contains_key(&key) {
          diagnostics.warn(&format!("{label}: duplicate key {key:?}, keeping the last occurrence"));
        }
        table.insert(key, value);
      }
      Ok(RowOutcome::Skip) => (),
      Err(reason) => diagnostics.warn(&format!("{label}: dropping row {row:?}: {reason}")),
    }
  }
  Ok(Some(table))
}

fn parse_side(value: &str) -> Result<u8, String> {
  value.parse().map_err(|_| format!("invalid side {value:?}"))
}

fn field_or_method_row(
  columns: &[String],
  project_type: ProjectType,
) -> Result<RowOutcome<Entry>, String> {
  let [searge, name, side, desc] = columns else {
    return Err(format!("expected 4 columns, found {}", columns.len()));
  };
  let side = parse_side(side)?;
  if !project_type.accepts(side) {
    return Ok(RowOutcome::Skip);
  }
  if !sanitizer::is_valid_identifier(name, true) {
    return Err(format!("{name:?} is not a valid identifier"));
  }
  let renamed = sanitizer::decode_unicode_escapes(name);
  let doc = if desc.is_empty() {
    None
  } else {
    Some(sanitizer::escape_comment_terminators(&desc.replace("\\n", "\n")))
  };
  Ok(RowOutcome::Insert(searge.clone(), Entry { renamed, doc }))
}

pub fn load_fields(
  path: &Path,
  project_type: ProjectType,
  diagnostics: &dyn Diagnostics,
) -> Result<Option<HashMap<String, Entry>>, Error> {
  load_rows(path, &["searge", "name", "side", "desc"], "fields.csv", diagnostics, |row| {
    field_or_method_row(row, project_type)
  })
}

pub fn load_methods(
  path: &Path,
  project_type: ProjectType,
  diagnostics: &dyn Diagnostics,
) -> Result<Option<HashMap<String, Entry>>, Error> {
  load_rows(path, &["searge", "name", "side", "desc"], "methods.csv", diagnostics, |row| {
    field_or_method_row(row, project_type)
  })
}

pub fn load_params(
  path: &Path,
  project_type: ProjectType,
  diagnostics: &dyn Diagnostics,
) -> Result<Option<HashMap<String, String>>, Error> {
  load_rows(path, &["param", "name", "side"], "params.csv", diagnostics, |columns| {
    let [param, name, side] = columns else {
      return Err(format!("expected 3 columns, found {}", columns.len()));
    };
    let side = parse_side(side)?;
    if !project_type.accepts(side) {
      return Ok(RowOutcome::Skip);
    }
    if !sanitizer::is_valid_identifier(name, true) {
      return Err(format!("{name:?} is not a valid identifier"));
    }
    Ok(RowOutcome::Insert(param.clone(), sanitizer::decode_unicode_escapes(name)))
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::diagnostics::Collected;

  #[test]
  fn missing_file_is_none() {
    let diagnostics = Collected::new();
    let result = load_fields(Path::new("/nonexistent/fields.csv"), ProjectType::Joined, &diagnostics).unwrap();
    assert!(result.is_none());
  }

  #[test]
  fn header_mismatch_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fields.csv");
    std::fs::write(&path, "wrong,header\r\n").unwrap();
    let diagnostics = Collected::new();
    let error = load_fields(&path, ProjectType::Joined, &diagnostics).unwrap_err();
    assert!(matches!(error, Error::Header { .. }));
  }

  #[test]
  fn loads_and_filters_by_side() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fields.csv");
    std::fs::write(
      &path,
      "searge,name,side,desc\r\nfield_1_a,foo,0,hello\r\nfield_2_b,bar,1,world\r\n",
    )
    .unwrap();
    let diagnostics = Collected::new();
    let fields = load_fields(&path, ProjectType::Client, &diagnostics).unwrap().unwrap();
    assert_eq!(fields.len(), 1);
    assert_eq!(fields["field_1_a"].renamed, "foo");
    assert_eq!(fields["field_1_a"].doc.as_deref(), Some("hello"));
  }

  #[test]
  fn duplicate_key_keeps_the_last_and_warns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.csv");
    std::fs::write(&path, "param,name,side\r\np_1_a_,first,2\r\np_1_a_,second,2\r\n").unwrap();
    let diagnostics = Collected::new();
    let params = load_params(&path, ProjectType::Joined, &diagnostics).unwrap().unwrap();
    assert_eq!(params["p_1_a_"], "second");
    assert!(diagnostics.messages().iter().any(|m| m.contains("duplicate key")));
  }

  #[test]
  fn invalid_identifier_is_dropped_with_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fields.csv");
    std::fs::write(&path, "searge,name,side,desc\r\nfield_1_a,new,2,\r\n").unwrap();
    let diagnostics = Collected::new();
    let fields = load_fields(&path, ProjectType::Joined, &diagnostics).unwrap().unwrap();
    assert!(fields.is_empty());
    assert!(diagnostics.messages().iter().any(|m| m.contains("not a valid identifier")));
  }
}
