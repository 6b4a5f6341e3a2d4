use pretty_assertions::assert_eq;
use std::{fs, num::NonZeroUsize};

fn write(path: &std::path::Path, contents: &str) {
  fs::create_dir_all(path.parent().unwrap()).unwrap();
  fs::write(path, contents).unwrap();
}

#[test]
fn rewrites_a_small_tree() -> anyhow::Result<()> {
  let root = tempfile::tempdir()?;
  let csv_directory = root.path().join("csv");
  let src_directory = root.path().join("src");
  let src_out_directory = root.path().join("out");

  write(
    &csv_directory.join("fields.csv"),
    "searge,name,side,desc\r\nfield_1_a,width,2,the width in pixels\r\n",
  );
  write(
    &csv_directory.join("methods.csv"),
    "searge,name,side,desc\r\nfunc_1_a,resize,2,Resizes the widget\r\n",
  );
  write(&csv_directory.join("params.csv"), "param,name,side\r\np_1_a_,newWidth,2\r\n");

  write(
    &src_directory.join("widget").join("Widget.java"),
    "package widget;\r\n\r\nclass Widget {\r\n    int field_1_a;\r\n\r\n    void func_1_a(int p_1_a_) {\r\n        field_1_a = p_1_a_;\r\n    }\r\n}\r\n",
  );
  write(&src_directory.join("widget").join("notes.txt"), "nothing to rewrite here\r\n");

  let arguments = tabrename::Arguments {
    project_type: tabrename::ProjectType::Joined,
    csv_directory,
    src_directory,
    src_out_directory: src_out_directory.clone(),
    threads: NonZeroUsize::new(2).unwrap(),
  };
  tabrename::run(&arguments)?;

  let rewritten = fs::read_to_string(src_out_directory.join("widget").join("Widget.java"))?;
  assert!(rewritten.contains("int width;"));
  assert!(rewritten.contains("void resize(int newWidth)"));
  assert!(rewritten.contains("width = newWidth;"));
  assert!(rewritten.contains("/**"));
  assert!(rewritten.contains("Resizes the widget"));

  let untouched = fs::read_to_string(src_out_directory.join("widget").join("notes.txt"))?;
  assert_eq!(untouched, "nothing to rewrite here\r\n");

  Ok(())
}

#[test]
fn missing_source_directory_is_an_error() {
  let root = tempfile::tempdir().unwrap();
  let arguments = tabrename::Arguments {
    project_type: tabrename::ProjectType::Joined,
    csv_directory: root.path().join("csv"),
    src_directory: root.path().join("does-not-exist"),
    src_out_directory: root.path().join("out"),
    threads: NonZeroUsize::new(1).unwrap(),
  };
  assert!(tabrename::run(&arguments).is_err());
}

#[test]
fn rerunning_on_its_own_output_is_a_no_op() -> anyhow::Result<()> {
  let root = tempfile::tempdir()?;
  let csv_directory = root.path().join("csv");
  let src_directory = root.path().join("src");
  let first_pass = root.path().join("out1");
  let second_pass = root.path().join("out2");

  write(&csv_directory.join("fields.csv"), "searge,name,side,desc\r\nfield_1_a,width,2,\r\n");
  write(&csv_directory.join("methods.csv"), "searge,name,side,desc\r\n");
  write(&csv_directory.join("params.csv"), "param,name,side\r\n");
  write(&src_directory.join("Widget.java"), "class Widget {\r\n    int field_1_a;\r\n}\r\n");

  let base = tabrename::Arguments {
    project_type: tabrename::ProjectType::Joined,
    csv_directory: csv_directory.clone(),
    src_directory: src_directory.clone(),
    src_out_directory: first_pass.clone(),
    threads: NonZeroUsize::new(1).unwrap(),
  };
  tabrename::run(&base)?;

  let second = tabrename::Arguments {
    project_type: tabrename::ProjectType::Joined,
    csv_directory,
    src_directory: first_pass.clone(),
    src_out_directory: second_pass.clone(),
    threads: NonZeroUsize::new(1).unwrap(),
  };
  tabrename::run(&second)?;

  let once = fs::read_to_string(first_pass.join("Widget.java"))?;
  let twice = fs::read_to_string(second_pass.join("Widget.java"))?;
  assert_eq!(once, twice);

  Ok(())
}
