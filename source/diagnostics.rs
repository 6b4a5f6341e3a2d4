// The diagnostic sink the rest of the crate reports through. A trait rather than direct calls to
// `log::*` so tests can capture what would otherwise go to the logger.

pub trait Diagnostics: Sync {
  fn info(&self, message: &str);
  fn warn(&self, message: &str);
  fn error(&self, message: &str);
}

/// Forwards straight to the `log` facade; `main` wires the actual appenders.
pub struct Log;

impl Diagnostics for Log {
  fn info(&self, message: &str) {
    log::info!("{message}");
  }

  fn warn(&self, message: &str) {
    log::warn!("{message}");
  }

  fn error(&self, message: &str) {
    log::error!("{message}");
  }
}

#[cfg(test)]
pub struct Collected(std::sync::Mutex<Vec<String>>);

#[cfg(test)]
impl Collected {
  pub fn new() -> Self {
    Self(std::sync::Mutex::new(Vec::new()))
  }

  pub fn messages(&self) -> Vec<String> {
    self.0.lock().unwrap().clone()
  }
}

#[cfg(test)]
impl Diagnostics for Collected {
  fn info(&self, message: &str) {
    self.0.lock().unwrap().push(format!("info: {message}"));
  }

  fn warn(&self, message: &str) {
    self.0.lock().unwrap().push(format!("warn: {message}"));
  }

  fn error(&self, message: &str) {
    self.0.lock().unwrap().push(format!("error: {message}"));
  }
}
