//! Line-oriented `.env` parser.
//!
//! Text is split into lines and each line is classified as blank, comment or
//! variable assignment. Comment lines directly above a variable are attached to
//! it; anything the grammar does not recognize is kept verbatim as a comment so
//! that no content is ever dropped.

use std::{convert::Infallible, convert::TryFrom, str::FromStr};

#[cfg(feature = "tracing")]
use tracing::{debug, trace};

pub(crate) const COMMENT_PREFIX: char = '#';
pub(crate) const ASSIGNMENT_OPERATOR: char = '=';
pub(crate) const EXPORT_KEYWORD: &str = "export";

/// An ordered sequence of line records, in file order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvFile {
  pub entries: Vec<EnvEntry>,
}

impl EnvFile {
  pub fn new() -> Self {
    Self::default()
  }

  /// Parses `.env` content. Parsing never fails: unrecognized lines become
  /// [`EnvEntry::Comment`] records holding the raw line.
  pub fn parse(content: &str) -> Self {
    let lines = split_lines(content);

    #[cfg(feature = "tracing")]
    debug!("Parsing env file with {} lines", lines.len());

    let mut entries = Vec::new();
    let mut pending_comments: Vec<String> = Vec::new();

    for line in lines {
      #[cfg(feature = "tracing")]
      trace!("Parsing line: {:?}", line);

      match EnvEntry::try_from(line) {
        Ok(EnvEntry::Variable(mut var)) => {
          #[cfg(feature = "tracing")]
          trace!(
            "Found variable: {} with {} pending comments",
            var.key,
            pending_comments.len()
          );

          var.comments_above = std::mem::take(&mut pending_comments);
          entries.push(EnvEntry::Variable(var));
        }
        Ok(EnvEntry::Comment(comment)) => pending_comments.push(comment),
        Ok(EnvEntry::Empty) => {
          flush_comments(&mut entries, &mut pending_comments);
          entries.push(EnvEntry::Empty);
        }
        Err(_err) => {
          #[cfg(feature = "tracing")]
          debug!("Keeping unrecognized line as comment: {}", _err);

          flush_comments(&mut entries, &mut pending_comments);
          entries.push(EnvEntry::Comment(line.to_string()));
        }
      }
    }

    flush_comments(&mut entries, &mut pending_comments);

    // Blank lines after the last content line never survive formatting, so
    // they are folded here to keep parse and format inverse to each other.
    if entries.iter().any(|entry| !entry.is_empty_line()) {
      while entries.last().is_some_and(EnvEntry::is_empty_line) {
        entries.pop();
      }
    } else {
      entries.truncate(1);
    }

    #[cfg(feature = "tracing")]
    debug!("Parsed {} entries", entries.len());

    Self { entries }
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Iterates over the variable records in file order, duplicates included.
  pub fn variables(&self) -> impl Iterator<Item = &EnvVariable> {
    self.entries.iter().filter_map(|entry| match entry {
      EnvEntry::Variable(var) => Some(var),
      _ => None,
    })
  }
}

impl From<&str> for EnvFile {
  fn from(s: &str) -> Self {
    Self::parse(s)
  }
}

impl FromStr for EnvFile {
  type Err = Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self::parse(s))
  }
}

fn flush_comments(entries: &mut Vec<EnvEntry>, pending: &mut Vec<String>) {
  #[cfg(feature = "tracing")]
  trace!("Flushing {} pending comments as standalone", pending.len());

  entries.extend(pending.drain(..).map(EnvEntry::Comment));
}

/// Splits on `\r\n`, `\n` or `\r`. A trailing line break ends the last line
/// rather than opening a new one.
fn split_lines(content: &str) -> Vec<&str> {
  let bytes = content.as_bytes();
  let mut lines = Vec::new();
  let mut start = 0;
  let mut i = 0;

  while i < bytes.len() {
    match bytes[i] {
      b'\n' => {
        lines.push(&content[start..i]);
        i += 1;
        start = i;
      }
      b'\r' => {
        lines.push(&content[start..i]);
        i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
        start = i;
      }
      _ => i += 1,
    }
  }

  if start < content.len() {
    lines.push(&content[start..]);
  }

  lines
}

/// One classified line of a `.env` document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvEntry {
  Variable(EnvVariable),
  /// Raw line text, leading whitespace and `#` included.
  Comment(String),
  Empty,
}

impl EnvEntry {
  pub fn is_empty_line(&self) -> bool {
    matches!(self, EnvEntry::Empty)
  }

  pub fn as_variable(&self) -> Option<&EnvVariable> {
    match self {
      EnvEntry::Variable(var) => Some(var),
      _ => None,
    }
  }
}

impl TryFrom<&str> for EnvEntry {
  type Error = ParseError;

  fn try_from(s: &str) -> Result<Self, Self::Error> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
      Ok(EnvEntry::Empty)
    } else if trimmed.starts_with(COMMENT_PREFIX) {
      Ok(EnvEntry::Comment(s.to_string()))
    } else {
      Ok(EnvEntry::Variable(s.try_into()?))
    }
  }
}

/// A `KEY=value` assignment together with the comments bound to it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvVariable {
  pub key: String,
  /// Logical value: quotes removed, escapes resolved.
  pub value: String,
  /// Text after the `#`, trimmed. Never `Some("")` when produced by the parser.
  pub inline_comment: Option<String>,
  /// Raw comment lines directly above the assignment, top to bottom.
  pub comments_above: Vec<String>,
  pub exported: bool,
}

impl EnvVariable {
  pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      key: key.into(),
      value: value.into(),
      ..Self::default()
    }
  }
}

impl TryFrom<&str> for EnvVariable {
  type Error = ParseError;

  fn try_from(s: &str) -> Result<Self, Self::Error> {
    #[cfg(feature = "tracing")]
    trace!("Parsing variable from: {:?}", s);

    let trimmed = s.trim();

    // `export` is only a keyword when what follows is itself an assignment;
    // `export=1` and `export =1` assign to a variable named `export`.
    if let Some(rest) = strip_export(trimmed)
      && let Ok(mut var) = parse_assignment(rest)
    {
      var.exported = true;
      return Ok(var);
    }

    parse_assignment(trimmed)
  }
}

fn strip_export(s: &str) -> Option<&str> {
  let rest = s.strip_prefix(EXPORT_KEYWORD)?;
  let stripped = rest.trim_start();
  (stripped.len() < rest.len()).then_some(stripped)
}

fn parse_assignment(s: &str) -> Result<EnvVariable, ParseError> {
  let (key, raw_value) = s
    .split_once(ASSIGNMENT_OPERATOR)
    .ok_or_else(|| ParseError::InvalidLine(s.to_string()))?;

  let key = key.trim_end();
  if !is_valid_key(key) {
    return Err(ParseError::InvalidKey(key.to_string()));
  }

  let (value, inline_comment) = parse_value(raw_value.trim_start());

  #[cfg(feature = "tracing")]
  trace!(
    "Parsed variable: key={}, value={}, has_inline_comment={}",
    key,
    value,
    inline_comment.is_some()
  );

  Ok(EnvVariable {
    key: key.to_string(),
    value,
    inline_comment,
    comments_above: Vec::new(),
    exported: false,
  })
}

/// Keys follow `[A-Za-z_][A-Za-z0-9_]*`. A leading digit is rejected.
pub fn is_valid_key(key: &str) -> bool {
  let mut chars = key.chars();
  match chars.next() {
    Some(first) if first.is_ascii_alphabetic() || first == '_' => {
      chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
    _ => false,
  }
}

fn parse_value(raw: &str) -> (String, Option<String>) {
  parse_quoted(raw, '"')
    .or_else(|| parse_quoted(raw, '\''))
    .unwrap_or_else(|| parse_unquoted(raw))
}

/// Returns `None` when `raw` is not a well-formed quoted value: no opening
/// quote, no closing quote, or trailing text that is not a comment.
fn parse_quoted(raw: &str, quote: char) -> Option<(String, Option<String>)> {
  let body = raw.strip_prefix(quote)?;
  let mut value = String::with_capacity(body.len());
  let mut chars = body.char_indices();

  while let Some((idx, c)) = chars.next() {
    match c {
      '\\' => match chars.next() {
        Some((_, escaped @ ('\\' | '"' | '\''))) => value.push(escaped),
        Some((_, other)) => {
          value.push('\\');
          value.push(other);
        }
        None => return None,
      },
      c if c == quote => {
        let rest = body[idx + c.len_utf8()..].trim();
        if rest.is_empty() {
          return Some((value, None));
        }
        let comment = rest.strip_prefix(COMMENT_PREFIX)?;
        return Some((value, non_empty(comment)));
      }
      c => value.push(c),
    }
  }

  None
}

fn parse_unquoted(raw: &str) -> (String, Option<String>) {
  let mut escaped = false;

  for (idx, c) in raw.char_indices() {
    if c == COMMENT_PREFIX && !escaped {
      let value = raw[..idx].trim();
      return (value.to_string(), non_empty(&raw[idx + 1..]));
    }
    escaped = c == '\\' && !escaped;
  }

  (raw.trim().to_string(), None)
}

fn non_empty(comment: &str) -> Option<String> {
  let comment = comment.trim();
  (!comment.is_empty()).then(|| comment.to_string())
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
  #[error("Invalid line: {0}")]
  InvalidLine(String),
  #[error("Invalid variable name: {0:?}")]
  InvalidKey(String),
}

#[cfg(test)]
mod tests {
  use super::*;

  fn variable(entry: &EnvEntry) -> &EnvVariable {
    match entry {
      EnvEntry::Variable(var) => var,
      other => panic!("Expected variable, got {:?}", other),
    }
  }

  #[test]
  fn test_parse_empty_input() {
    assert!(EnvFile::parse("").is_empty());
  }

  #[test]
  fn test_parse_single_line_break() {
    assert_eq!(EnvFile::parse("\n").entries, vec![EnvEntry::Empty]);
    assert_eq!(EnvFile::parse("\r\n").entries, vec![EnvEntry::Empty]);
    assert_eq!(EnvFile::parse("\r").entries, vec![EnvEntry::Empty]);
  }

  #[test]
  fn test_parse_simple() {
    let env = EnvFile::parse("KEY=value\nANOTHER=test");

    assert_eq!(env.entries.len(), 2);
    let first = variable(&env.entries[0]);
    assert_eq!(first.key, "KEY");
    assert_eq!(first.value, "value");
    assert!(!first.exported);
    let second = variable(&env.entries[1]);
    assert_eq!(second.key, "ANOTHER");
    assert_eq!(second.value, "test");
  }

  #[test]
  fn test_parse_mixed_line_endings() {
    let env = EnvFile::parse("A=1\r\nB=2\rC=3\n");
    let keys: Vec<_> = env.variables().map(|var| var.key.as_str()).collect();
    assert_eq!(keys, ["A", "B", "C"]);
    assert_eq!(env.len(), 3);
  }

  #[test]
  fn test_parse_with_comments() {
    let input = "# This is a comment\nKEY=value\n# Another comment\n# Multi line\nTEST=123";
    let env = EnvFile::parse(input);

    assert_eq!(env.entries.len(), 2);

    let key = variable(&env.entries[0]);
    assert_eq!(key.key, "KEY");
    assert_eq!(key.comments_above, ["# This is a comment"]);

    let test = variable(&env.entries[1]);
    assert_eq!(test.key, "TEST");
    assert_eq!(test.value, "123");
    assert_eq!(test.comments_above, ["# Another comment", "# Multi line"]);
  }

  #[test]
  fn test_comments_separated_by_blank_line_stay_standalone() {
    let env = EnvFile::parse("# Section\n\n# Bound\nKEY=v");

    assert_eq!(
      env.entries[..2],
      [EnvEntry::Comment("# Section".to_string()), EnvEntry::Empty]
    );
    assert_eq!(variable(&env.entries[2]).comments_above, ["# Bound"]);
  }

  #[test]
  fn test_comment_text_is_kept_raw() {
    let env = EnvFile::parse("   # indented  \n");
    assert_eq!(
      env.entries,
      vec![EnvEntry::Comment("   # indented  ".to_string())]
    );
  }

  #[test]
  fn test_trailing_comments_are_flushed() {
    let env = EnvFile::parse("KEY=v\n# trailing one\n# trailing two\n");
    assert_eq!(env.entries.len(), 3);
    assert_eq!(
      env.entries[1..],
      [
        EnvEntry::Comment("# trailing one".to_string()),
        EnvEntry::Comment("# trailing two".to_string())
      ]
    );
    assert!(variable(&env.entries[0]).comments_above.is_empty());
  }

  #[test]
  fn test_interior_blank_runs_are_preserved() {
    let env = EnvFile::parse("A=1\n\n\n\nB=2\n\n\n");
    assert_eq!(env.entries.len(), 5);
    assert!(env.entries[1..4].iter().all(EnvEntry::is_empty_line));
    assert_eq!(variable(&env.entries[4]).key, "B");
  }

  #[test]
  fn test_blank_only_input_keeps_one_empty_line() {
    assert_eq!(EnvFile::parse("\n\n  \n").entries, vec![EnvEntry::Empty]);
  }

  #[test]
  fn test_parse_inline_comments() {
    let env = EnvFile::parse("KEY=value # This is inline\nTEST=123");

    let key = variable(&env.entries[0]);
    assert_eq!(key.value, "value");
    assert_eq!(key.inline_comment.as_deref(), Some("This is inline"));
    assert!(variable(&env.entries[1]).inline_comment.is_none());
  }

  #[test]
  fn test_empty_inline_comment_is_dropped() {
    let var = EnvVariable::try_from("KEY=value #   ").unwrap();
    assert_eq!(var.value, "value");
    assert!(var.inline_comment.is_none());
  }

  #[test]
  fn test_parse_export() {
    let var = EnvVariable::try_from("export MY_VAR=exported_value").unwrap();
    assert!(var.exported);
    assert_eq!(var.key, "MY_VAR");
    assert_eq!(var.value, "exported_value");

    let var = EnvVariable::try_from("export=1").unwrap();
    assert!(!var.exported);
    assert_eq!(var.key, "export");

    let var = EnvVariable::try_from("exportED=1").unwrap();
    assert!(!var.exported);
    assert_eq!(var.key, "exportED");
  }

  #[test]
  fn test_parse_double_quoted() {
    let var = EnvVariable::try_from(r#"APP_NAME="My Application""#).unwrap();
    assert_eq!(var.value, "My Application");

    let var = EnvVariable::try_from(r#"MSG="say \"hi\" # not a comment" # real"#).unwrap();
    assert_eq!(var.value, r#"say "hi" # not a comment"#);
    assert_eq!(var.inline_comment.as_deref(), Some("real"));
  }

  #[test]
  fn test_parse_single_quoted() {
    let var = EnvVariable::try_from("APP_ENV='staging'").unwrap();
    assert_eq!(var.value, "staging");

    let var = EnvVariable::try_from(r"QUOTE='it\'s \\ here'").unwrap();
    assert_eq!(var.value, r"it's \ here");
  }

  #[test]
  fn test_unknown_escapes_are_kept() {
    let var = EnvVariable::try_from(r#"PATH_LIKE="C:\Program Files\app""#).unwrap();
    assert_eq!(var.value, r"C:\Program Files\app");
  }

  #[test]
  fn test_quoted_value_with_trailing_text_falls_back_to_unquoted() {
    let var = EnvVariable::try_from(r#"KEY="a" b"#).unwrap();
    assert_eq!(var.value, r#""a" b"#);

    let var = EnvVariable::try_from(r#"KEY="unterminated"#).unwrap();
    assert_eq!(var.value, r#""unterminated"#);
  }

  #[test]
  fn test_empty_values() {
    assert_eq!(EnvVariable::try_from("KEY=").unwrap().value, "");
    assert_eq!(EnvVariable::try_from("KEY=   ").unwrap().value, "");
    assert_eq!(EnvVariable::try_from(r#"KEY="""#).unwrap().value, "");

    let var = EnvVariable::try_from("KEY=#only comment").unwrap();
    assert_eq!(var.value, "");
    assert_eq!(var.inline_comment.as_deref(), Some("only comment"));
  }

  #[test]
  fn test_escaped_hash_in_unquoted_value() {
    let var = EnvVariable::try_from(r"COLOR=\#fff # hex").unwrap();
    assert_eq!(var.value, r"\#fff");
    assert_eq!(var.inline_comment.as_deref(), Some("hex"));
  }

  #[test]
  fn test_whitespace_around_assignment() {
    let var = EnvVariable::try_from("  KEY   =   spaced value   ").unwrap();
    assert_eq!(var.key, "KEY");
    assert_eq!(var.value, "spaced value");
  }

  #[test]
  fn test_unrecognized_lines_are_kept_as_comments() {
    let env = EnvFile::parse("# lead\nnot a variable\n1KEY=digit\nKEY=v");

    assert_eq!(
      env.entries[..3],
      [
        EnvEntry::Comment("# lead".to_string()),
        EnvEntry::Comment("not a variable".to_string()),
        EnvEntry::Comment("1KEY=digit".to_string()),
      ]
    );
    assert!(variable(&env.entries[3]).comments_above.is_empty());
  }

  #[test]
  fn test_env_entry_try_from() {
    assert_eq!(EnvEntry::try_from("").unwrap(), EnvEntry::Empty);
    assert_eq!(EnvEntry::try_from("  \t").unwrap(), EnvEntry::Empty);
    assert_eq!(
      EnvEntry::try_from("# This is a comment").unwrap(),
      EnvEntry::Comment("# This is a comment".to_string())
    );
    assert!(matches!(
      EnvEntry::try_from("KEY=value").unwrap(),
      EnvEntry::Variable(_)
    ));
    assert_eq!(
      EnvEntry::try_from("invalid line without equals"),
      Err(ParseError::InvalidLine(
        "invalid line without equals".to_string()
      ))
    );
    assert_eq!(
      EnvEntry::try_from("BAD-KEY=1"),
      Err(ParseError::InvalidKey("BAD-KEY".to_string()))
    );
  }

  #[test]
  fn test_is_valid_key() {
    assert!(is_valid_key("APP_NAME"));
    assert!(is_valid_key("_private"));
    assert!(is_valid_key("a1"));
    assert!(!is_valid_key(""));
    assert!(!is_valid_key("1ABC"));
    assert!(!is_valid_key("WITH SPACE"));
    assert!(!is_valid_key("DASH-KEY"));
  }

  #[test]
  fn test_from_str() {
    let env: EnvFile = "A=1".parse().unwrap();
    assert_eq!(env, EnvFile::from("A=1"));
  }
}
