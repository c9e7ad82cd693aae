//! Batch building for setting several variables at once.
//!
//! A [`Batch`] is a plain list of pending set operations. Comment and export
//! modifiers apply to the most recently added item, and calling one before any
//! item exists is a usage error rather than a data error.
//!
//! ```rust
//! use env_editor::batch::Batch;
//! use env_editor::parse::EnvFile;
//!
//! let mut env = EnvFile::parse("APP_ENV=local\n");
//! let batch = Batch::new()
//!   .set_item("APP_ENV", "production")
//!   .set_item("APP_URL", "https://example.com")
//!   .comment_line("public url")
//!   .unwrap();
//!
//! batch.apply(&mut env);
//! assert_eq!(env.get("APP_ENV"), Some("production"));
//! ```

#[cfg(feature = "tracing")]
use tracing::debug;

use crate::editor::VariableUpdate;
use crate::parse::EnvFile;

/// One queued `set` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSet {
  pub key: String,
  pub value: String,
  pub update: VariableUpdate,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
  operations: Vec<PendingSet>,
}

impl Batch {
  pub fn new() -> Self {
    Self::default()
  }

  /// Queues `key = value`. Following modifiers apply to this item.
  pub fn set_item(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.operations.push(PendingSet {
      key: key.into(),
      value: value.into(),
      update: VariableUpdate::new(),
    });
    self
  }

  /// Sets the inline comment of the current item. An empty string clears it.
  pub fn comment_line(self, comment: impl Into<String>) -> Result<Self, BatchError> {
    let comment = comment.into();
    self.modify_current("comment_line", |update| update.inline_comment(comment))
  }

  pub fn comments_above<I, S>(self, comments: I) -> Result<Self, BatchError>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.modify_current("comments_above", |update| update.comments_above(comments))
  }

  pub fn exported(self, exported: bool) -> Result<Self, BatchError> {
    self.modify_current("exported", |update| update.exported(exported))
  }

  fn modify_current(
    mut self,
    operation: &'static str,
    modify: impl FnOnce(VariableUpdate) -> VariableUpdate,
  ) -> Result<Self, BatchError> {
    let current = self
      .operations
      .last_mut()
      .ok_or(BatchError::NoActiveItem(operation))?;
    current.update = modify(std::mem::take(&mut current.update));
    Ok(self)
  }

  pub fn operations(&self) -> &[PendingSet] {
    &self.operations
  }

  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }

  pub fn len(&self) -> usize {
    self.operations.len()
  }

  /// Applies every queued operation in order, consuming the batch.
  pub fn apply(self, env: &mut EnvFile) {
    #[cfg(feature = "tracing")]
    debug!("Applying batch of {} operations", self.operations.len());

    for PendingSet { key, value, update } in self.operations {
      env.set(&key, value, update);
    }
  }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BatchError {
  /// A modifier was called before `set_item`.
  #[error("set_item() must be called before {0}()")]
  NoActiveItem(&'static str),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_modifier_without_item_is_usage_error() {
    assert_eq!(
      Batch::new().comment_line("x").unwrap_err(),
      BatchError::NoActiveItem("comment_line")
    );
    assert_eq!(
      Batch::new().comments_above(["# x"]).unwrap_err(),
      BatchError::NoActiveItem("comments_above")
    );
    assert_eq!(
      Batch::new().exported(true).unwrap_err(),
      BatchError::NoActiveItem("exported")
    );
  }

  #[test]
  fn test_modifiers_apply_to_latest_item() -> Result<(), BatchError> {
    let batch = Batch::new()
      .set_item("FIRST", "1")
      .comment_line("first")?
      .set_item("SECOND", "2")
      .comments_above(["# second"])?
      .exported(true)?;

    let ops = batch.operations();
    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].update, VariableUpdate::new().inline_comment("first"));
    assert_eq!(
      ops[1].update,
      VariableUpdate::new()
        .comments_above(["# second"])
        .exported(true)
    );
    Ok(())
  }

  #[test]
  fn test_apply_sets_in_order() -> Result<(), BatchError> {
    let mut env = EnvFile::parse("# App\nAPP_ENV=local # env\n");

    Batch::new()
      .set_item("APP_ENV", "production")
      .set_item("NEW_ONE", "with space")
      .comment_line("added")?
      .set_item("NEW_TWO", "2")
      .comments_above(["# Second new"])?
      .apply(&mut env);

    assert_eq!(
      env.to_string(),
      "# App\nAPP_ENV=production # env\n\nNEW_ONE=\"with space\" # added\n# Second new\nNEW_TWO=2\n"
    );
    Ok(())
  }

  #[test]
  fn test_empty_batch_is_a_no_op() {
    let mut env = EnvFile::parse("A=1\n");
    let batch = Batch::new();
    assert!(batch.is_empty());
    batch.apply(&mut env);
    assert_eq!(env.to_string(), "A=1\n");
  }
}
