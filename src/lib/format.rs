//! Serialization of an [`EnvFile`] back to text.
//!
//! Formatting goes through [`std::fmt::Display`], so `env.to_string()` is the
//! formatter entry point. Output is deterministic and ends with exactly one
//! line break unless the document is empty.

use std::{
  borrow::Cow,
  fmt::{self, Write},
};

use crate::parse::{ASSIGNMENT_OPERATOR, EXPORT_KEYWORD, EnvEntry, EnvFile, EnvVariable};

const LINE_BREAK: char = '\n';
const QUOTE: char = '"';
const CHARS_REQUIRING_QUOTES: [char; 5] = [' ', '#', '=', '"', '\''];
const KEYWORDS_REQUIRING_QUOTES: [&str; 3] = ["true", "false", "null"];

impl fmt::Display for EnvFile {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut content = String::new();
    for entry in &self.entries {
      write!(content, "{}", entry)?;
    }

    if content.is_empty() {
      return Ok(());
    }

    f.write_str(content.trim_end_matches(LINE_BREAK))?;
    f.write_char(LINE_BREAK)
  }
}

impl fmt::Display for EnvEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      EnvEntry::Variable(var) => {
        write!(f, "{}", var)?;
        writeln!(f)
      }
      EnvEntry::Comment(comment) => {
        writeln!(f, "{}", comment)
      }
      EnvEntry::Empty => {
        writeln!(f)
      }
    }
  }
}

/// Writes the comments above, then the assignment line without its line break.
impl fmt::Display for EnvVariable {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for comment in &self.comments_above {
      writeln!(f, "{}", comment)?;
    }
    if self.exported {
      write!(f, "{} ", EXPORT_KEYWORD)?;
    }
    write!(
      f,
      "{}{}{}",
      self.key,
      ASSIGNMENT_OPERATOR,
      quote_value(&self.value)
    )?;
    if let Some(comment) = self.inline_comment.as_deref().filter(|c| !c.is_empty()) {
      write!(f, " # {}", comment)?;
    }
    Ok(())
  }
}

/// Whether `value` has to be written inside double quotes.
///
/// Empty values, values containing a space, `#`, `=`, `"` or `'`, and the
/// words `true`/`false`/`null` in any case are quoted. Values with leading or
/// trailing whitespace are quoted as well, since the parser trims unquoted
/// values.
pub fn needs_quotes(value: &str) -> bool {
  value.is_empty()
    || value.contains(CHARS_REQUIRING_QUOTES)
    || KEYWORDS_REQUIRING_QUOTES
      .iter()
      .any(|keyword| value.eq_ignore_ascii_case(keyword))
    || value.trim() != value
}

/// Applies the quoting policy to `value`.
///
/// Inside quotes `"` becomes `\"`. A backslash is doubled only where the
/// parser would otherwise read it as an escape, so `C:\dir` stays as written.
pub fn quote_value(value: &str) -> Cow<'_, str> {
  if !needs_quotes(value) {
    return Cow::Borrowed(value);
  }

  let mut quoted = String::with_capacity(value.len() + 2);
  quoted.push(QUOTE);

  let mut chars = value.chars().peekable();
  while let Some(c) = chars.next() {
    match c {
      QUOTE => quoted.push_str("\\\""),
      '\\' if matches!(chars.peek(), None | Some('\\' | '"' | '\'')) => quoted.push_str("\\\\"),
      c => quoted.push(c),
    }
  }

  quoted.push(QUOTE);
  Cow::Owned(quoted)
}
