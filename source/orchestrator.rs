// Wires the pieces together: validates the three directories, loads the three mapping files in
// parallel, mirrors the source tree into the output directory, then rewrites every file using a
// bounded pool of worker threads.

use crate::{chunked, diagnostics::Diagnostics, mapping, mapping::ProjectType, rewriter, Arguments};
use anyhow::Context;
use std::{
  error, fmt, fs,
  io::{BufWriter, Write},
  path::{Path, PathBuf},
};

#[derive(Debug)]
pub enum Error {
  NotADirectory(PathBuf),
  NestedDirectories(PathBuf, PathBuf),
  NoMappingFiles(PathBuf),
  WorkerPanicked,
}

impl fmt::Display for Error {
  fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Error::NotADirectory(path) => write!(formatter, "{} is not a directory", path.display()),
      Error::NestedDirectories(a, b) => {
        write!(formatter, "{} and {} may not be nested within one another", a.display(), b.display())
      }
      Error::NoMappingFiles(path) => {
        write!(formatter, "none of fields.csv, methods.csv, params.csv were found under {}", path.display())
      }
      Error::WorkerPanicked => write!(formatter, "a worker thread panicked"),
    }
  }
}

impl error::Error for Error {}

fn require_directory(path: &Path) -> anyhow::Result<()> {
  if !path.is_dir() {
    return Err(Error::NotADirectory(path.to_path_buf()).into());
  }
  Ok(())
}

fn require_unrelated(a: &Path, b: &Path) -> anyhow::Result<()> {
  let canonical_a = a.canonicalize().with_context(|| format!("couldn't resolve {}", a.display()))?;
  let canonical_b = b.canonicalize().with_context(|| format!("couldn't resolve {}", b.display()))?;
  if canonical_a.starts_with(&canonical_b) || canonical_b.starts_with(&canonical_a) {
    return Err(Error::NestedDirectories(a.to_path_buf(), b.to_path_buf()).into());
  }
  Ok(())
}

fn reset_output_directory(path: &Path) -> anyhow::Result<()> {
  if path.exists() {
    fs::remove_dir_all(path).with_context(|| format!("couldn't clear {}", path.display()))?;
  }
  fs::create_dir_all(path).with_context(|| format!("couldn't create {}", path.display()))?;
  Ok(())
}

/// Walks `src`, creating every directory under `out` and returning the file paths (relative to
/// `src`) that need rewriting.
fn mirror_tree(src: &Path, out: &Path) -> anyhow::Result<Vec<PathBuf>> {
  let mut files = Vec::new();
  for entry in walkdir::WalkDir::new(src) {
    let entry = entry?;
    let relative = entry.path().strip_prefix(src).expect("walkdir yields paths under its root");
    if entry.file_type().is_dir() {
      fs::create_dir_all(out.join(relative))
        .with_context(|| format!("couldn't create {}", out.join(relative).display()))?;
    } else if entry.file_type().is_file() {
      files.push(relative.to_path_buf());
    }
  }
  Ok(files)
}

fn load_mappings(
  csv_directory: &Path,
  project_type: ProjectType,
  diagnostics: &dyn Diagnostics,
) -> anyhow::Result<mapping::Store> {
  let (fields, methods, params) = crossbeam_utils::thread::scope(|scope| -> anyhow::Result<_> {
    let fields = scope.spawn(|_| mapping::load_fields(&csv_directory.join("fields.csv"), project_type, diagnostics));
    let methods = scope.spawn(|_| mapping::load_methods(&csv_directory.join("methods.csv"), project_type, diagnostics));
    let params = scope.spawn(|_| mapping::load_params(&csv_directory.join("params.csv"), project_type, diagnostics));
    Ok((
      fields.join().map_err(|_| Error::WorkerPanicked)??,
      methods.join().map_err(|_| Error::WorkerPanicked)??,
      params.join().map_err(|_| Error::WorkerPanicked)??,
    ))
  })
  .map_err(|_| Error::WorkerPanicked)??;

  if fields.is_none() && methods.is_none() && params.is_none() {
    return Err(Error::NoMappingFiles(csv_directory.to_path_buf()).into());
  }

  let store = mapping::Store::new(fields.unwrap_or_default(), methods.unwrap_or_default(), params.unwrap_or_default());
  diagnostics.info(&format!(
    "loaded mappings from {} ({})",
    csv_directory.display(),
    if store.is_empty() { "empty" } else { "non-empty" }
  ));
  Ok(store)
}

fn rewrite_file(relative: &Path, src_directory: &Path, out_directory: &Path, store: &mapping::Store) -> anyhow::Result<()> {
  let input_path = src_directory.join(relative);
  let output_path = out_directory.join(relative);

  let input = fs::File::open(&input_path).with_context(|| format!("couldn't open {}", input_path.display()))?;
  let output = fs::File::create(&output_path).with_context(|| format!("couldn't create {}", output_path.display()))?;
  let mut writer = BufWriter::new(output);

  let mut source = chunked::FileSource::new(input);
  let mut rewriter = rewriter::Rewriter::new(store, &mut writer);
  while let Some(chunk) = source.pull()? {
    rewriter.append(&chunk)?;
  }
  rewriter.finish()?;
  writer.flush().with_context(|| format!("couldn't flush {}", output_path.display()))?;
  Ok(())
}

fn rewrite_tree(
  files: &[PathBuf],
  src_directory: &Path,
  out_directory: &Path,
  store: &mapping::Store,
  threads: usize,
  diagnostics: &dyn Diagnostics,
) -> anyhow::Result<usize> {
  if files.is_empty() {
    return Ok(0);
  }
  let worker_count = threads.max(1).min(files.len());
  let chunk_size = (files.len() + worker_count - 1) / worker_count;

  let failures = crossbeam_utils::thread::scope(|scope| -> Result<usize, Error> {
    let mut handles = Vec::new();
    for chunk in files.chunks(chunk_size.max(1)) {
      handles.push(scope.spawn(move |_| -> usize {
        let mut failed = 0;
        for relative in chunk {
          if let Err(error) = rewrite_file(relative, src_directory, out_directory, store) {
            diagnostics.error(&format!("{}: {error:#}", relative.display()));
            failed += 1;
          }
        }
        failed
      }));
    }
    let mut total_failures = 0;
    for handle in handles {
      total_failures += handle.join().map_err(|_| Error::WorkerPanicked)?;
    }
    Ok(total_failures)
  })
  .map_err(|_| Error::WorkerPanicked)??;

  Ok(failures)
}

pub fn run(arguments: &Arguments, diagnostics: &dyn Diagnostics) -> anyhow::Result<()> {
  require_directory(&arguments.csv_directory)?;
  require_directory(&arguments.src_directory)?;
  require_unrelated(&arguments.src_directory, &arguments.csv_directory)?;
  require_unrelated(&arguments.src_directory, &arguments.src_out_directory)?;

  let store = load_mappings(&arguments.csv_directory, arguments.project_type, diagnostics)?;

  reset_output_directory(&arguments.src_out_directory)?;
  let files = mirror_tree(&arguments.src_directory, &arguments.src_out_directory)?;
  diagnostics.info(&format!("rewriting {} files", files.len()));

  let failures = rewrite_tree(
    &files,
    &arguments.src_directory,
    &arguments.src_out_directory,
    &store,
    arguments.threads.get(),
    diagnostics,
  )?;

  anyhow::ensure!(failures == 0, "{failures} file(s) failed to rewrite, see the log for details");
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::diagnostics::Collected;
  use crate::mapping::ProjectType;
  use std::num::NonZeroUsize;

  fn write(path: &Path, contents: &str) {
    fs::write(path, contents).unwrap();
  }

  #[test]
  fn end_to_end_rewrite() {
    let root = tempfile::tempdir().unwrap();
    let csv_directory = root.path().join("csv");
    let src_directory = root.path().join("src");
    let out_directory = root.path().join("out");
    fs::create_dir_all(&csv_directory).unwrap();
    fs::create_dir_all(src_directory.join("pkg")).unwrap();

    write(&csv_directory.join("fields.csv"), "searge,name,side,desc\r\nfield_1_a,foo,2,a field\r\n");
    write(&csv_directory.join("methods.csv"), "searge,name,side,desc\r\n");
    write(&csv_directory.join("params.csv"), "param,name,side\r\n");
    write(
      &src_directory.join("pkg").join("A.java"),
      "class A {\r\n    int field_1_a = field_1_a;\r\n}\r\n",
    );

    let arguments = Arguments {
      project_type: ProjectType::Joined,
      csv_directory,
      src_directory,
      src_out_directory: out_directory.clone(),
      threads: NonZeroUsize::new(2).unwrap(),
    };
    let diagnostics = Collected::new();
    run(&arguments, &diagnostics).unwrap();

    let rewritten = fs::read_to_string(out_directory.join("pkg").join("A.java")).unwrap();
    assert!(rewritten.contains("foo"));
    assert!(rewritten.contains("/**"));
  }

  #[test]
  fn nested_directories_are_rejected() {
    let root = tempfile::tempdir().unwrap();
    let src_directory = root.path().to_path_buf();
    let csv_directory = root.path().join("csv");
    fs::create_dir_all(&csv_directory).unwrap();
    assert!(require_unrelated(&src_directory, &csv_directory).is_err());
  }

  #[test]
  fn missing_mapping_files_is_fatal() {
    let root = tempfile::tempdir().unwrap();
    let csv_directory = root.path().join("csv");
    let src_directory = root.path().join("src");
    fs::create_dir_all(&csv_directory).unwrap();
    fs::create_dir_all(&src_directory).unwrap();
    let diagnostics = Collected::new();
    let error = load_mappings(&csv_directory, ProjectType::Joined, &diagnostics).unwrap_err();
    assert!(error.downcast_ref::<Error>().is_some());
  }
}
