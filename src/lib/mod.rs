//! Format-preserving `.env` file editing library.
//!
//! This library parses `.env` files into an ordered list of line records,
//! edits variables in place, and writes the result back without disturbing
//! comments, blank lines or `export` prefixes of the variables it did not touch.
//!
//! # Features
//!
//! - **Lossless line model**: blank lines, standalone comments and unparseable
//!   lines are all kept, in order
//! - **Comment binding**: comment blocks directly above a variable move with it
//! - **Deterministic quoting**: values are re-quoted by a fixed policy on output
//! - **Backups**: optional timestamped copies with a retention window
//! - **Optional tracing**: Detailed logging when the `tracing` feature is enabled
//!
//! # Example
//!
//! ```rust
//! use env_editor::editor::VariableUpdate;
//! use env_editor::parse::EnvFile;
//!
//! let mut env = EnvFile::parse("# Application\nAPP_NAME=Laravel\n");
//! env.set("APP_NAME", "My App", VariableUpdate::new());
//! env.set("APP_DEBUG", "true", VariableUpdate::new().inline_comment("dev only"));
//!
//! assert_eq!(
//!     env.to_string(),
//!     "# Application\nAPP_NAME=\"My App\"\n\nAPP_DEBUG=\"true\" # dev only\n"
//! );
//! ```

pub mod backup;
pub mod batch;
pub mod editor;
pub mod format;
pub mod manager;
pub mod parse;
pub mod storage;
