//! In-place editing of a parsed [`EnvFile`].
//!
//! Lookups and updates target the first variable with a matching key.
//! Removal collapses runs of blank lines left behind by the deleted entry.

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

use crate::parse::{EnvEntry, EnvFile, EnvVariable};

/// Optional field changes applied by [`EnvFile::set`].
///
/// `None` leaves a field untouched. For `inline_comment`, `Some(None)` or
/// `Some(Some(""))` clears the comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableUpdate {
  pub inline_comment: Option<Option<String>>,
  pub comments_above: Option<Vec<String>>,
  pub exported: Option<bool>,
}

impl VariableUpdate {
  pub fn new() -> Self {
    Self::default()
  }

  /// An empty string clears the inline comment.
  pub fn inline_comment(mut self, comment: impl Into<String>) -> Self {
    self.inline_comment = Some(Some(comment.into()));
    self
  }

  pub fn clear_inline_comment(mut self) -> Self {
    self.inline_comment = Some(None);
    self
  }

  pub fn comments_above<I, S>(mut self, comments: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.comments_above = Some(comments.into_iter().map(Into::into).collect());
    self
  }

  pub fn exported(mut self, exported: bool) -> Self {
    self.exported = Some(exported);
    self
  }

  fn apply_to(self, var: &mut EnvVariable) {
    if let Some(comment) = self.inline_comment {
      var.inline_comment = comment.filter(|c| !c.is_empty());
    }
    if let Some(comments) = self.comments_above {
      var.comments_above = comments;
    }
    if let Some(exported) = self.exported {
      var.exported = exported;
    }
  }
}

impl EnvFile {
  pub fn has(&self, key: &str) -> bool {
    self.variable(key).is_some()
  }

  pub fn get(&self, key: &str) -> Option<&str> {
    self.variable(key).map(|var| var.value.as_str())
  }

  pub fn get_or<'s>(&'s self, key: &str, default: &'s str) -> &'s str {
    self.get(key).unwrap_or(default)
  }

  /// First variable named `key`.
  pub fn variable(&self, key: &str) -> Option<&EnvVariable> {
    self.variables().find(|var| var.key == key)
  }

  fn variable_mut(&mut self, key: &str) -> Option<&mut EnvVariable> {
    self.entries.iter_mut().find_map(|entry| match entry {
      EnvEntry::Variable(var) if var.key == key => Some(var),
      _ => None,
    })
  }

  /// Sets `key` to `value`, returning the previous value if the key existed.
  ///
  /// An existing variable keeps every field the update leaves as `None`. A new
  /// variable is appended at the end, after a separating blank line unless the
  /// document is empty, already ends with one, or comments above are given.
  pub fn set(&mut self, key: &str, value: impl Into<String>, update: VariableUpdate) -> Option<String> {
    let value = value.into();

    if let Some(var) = self.variable_mut(key) {
      #[cfg(feature = "tracing")]
      trace!("Updating existing variable: {}", key);

      let old_value = std::mem::replace(&mut var.value, value);
      update.apply_to(var);
      return Some(old_value);
    }

    let mut var = EnvVariable::new(key, value);
    update.apply_to(&mut var);

    let needs_separator = self
      .entries
      .last()
      .is_some_and(|last| !last.is_empty_line())
      && var.comments_above.is_empty();

    #[cfg(feature = "tracing")]
    debug!(
      "Appending new variable: {} (separator: {})",
      key, needs_separator
    );

    if needs_separator {
      self.entries.push(EnvEntry::Empty);
    }
    self.entries.push(EnvEntry::Variable(var));

    None
  }

  /// Removes the first variable named `key` and collapses blank-line runs.
  ///
  /// Later duplicates of the key are left in place. Nothing changes when the
  /// key is absent.
  pub fn remove(&mut self, key: &str) -> Option<EnvVariable> {
    let index = self
      .entries
      .iter()
      .position(|entry| matches!(entry, EnvEntry::Variable(var) if var.key == key))?;

    let removed = match self.entries.remove(index) {
      EnvEntry::Variable(var) => var,
      _ => unreachable!("position matched a variable entry"),
    };

    #[cfg(feature = "tracing")]
    debug!("Removed variable: {}", key);

    self.collapse_empty_lines();
    Some(removed)
  }

  /// Reduces every run of consecutive blank lines to a single one.
  pub fn collapse_empty_lines(&mut self) {
    #[cfg(feature = "tracing")]
    let before = self.entries.len();

    self
      .entries
      .dedup_by(|current, previous| current.is_empty_line() && previous.is_empty_line());

    #[cfg(feature = "tracing")]
    trace!("Collapsed {} blank lines", before - self.entries.len());
  }
}
