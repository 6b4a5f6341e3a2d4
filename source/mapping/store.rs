use std::collections::HashMap;

/// The project side(s) a mapping row applies to, mirroring the `side` column (0 = client,
/// 1 = server, 2 = both) carried by each row of fields.csv/methods.csv/params.csv.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ProjectType {
  Client,
  Server,
  Joined,
}

impl ProjectType {
  pub fn accepts(self, side: u8) -> bool {
    match self {
      ProjectType::Client => matches!(side, 0 | 2),
      ProjectType::Server => matches!(side, 1 | 2),
      ProjectType::Joined => matches!(side, 0 | 1 | 2),
    }
  }
}

#[derive(Debug, Clone)]
pub struct Entry {
  pub renamed: String,
  pub doc: Option<String>,
}

/// All three mapping categories, built once and never mutated again: every lookup method takes
/// `&self`, and there is no method anywhere on this type that takes `&mut self`.
pub struct Store {
  fields: HashMap<String, Entry>,
  methods: HashMap<String, Entry>,
  params: HashMap<String, String>,
}

impl Store {
  pub fn new(
    fields: HashMap<String, Entry>,
    methods: HashMap<String, Entry>,
    params: HashMap<String, String>,
  ) -> Self {
    Self { fields, methods, params }
  }

  pub fn field_rename(&self, name: &str) -> Option<&str> {
    self.fields.get(name).map(|entry| entry.renamed.as_str())
  }

  pub fn field_doc(&self, name: &str) -> Option<&str> {
    self.fields.get(name).and_then(|entry| entry.doc.as_deref())
  }

  pub fn method_rename(&self, name: &str) -> Option<&str> {
    self.methods.get(name).map(|entry| entry.renamed.as_str())
  }

  pub fn method_doc(&self, name: &str) -> Option<&str> {
    self.methods.get(name).and_then(|entry| entry.doc.as_deref())
  }

  pub fn param_rename(&self, name: &str) -> Option<&str> {
    self.params.get(name).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.fields.is_empty() && self.methods.is_empty() && self.params.is_empty()
  }
}
