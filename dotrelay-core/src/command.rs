//! Argument vectors and their single-string rendering.
//!
//! Arguments are always handed to the child process as discrete tokens, so a
//! value such as a connection string can never be re-split. The rendered form
//! exists for results and logs and follows POSIX shell-word quoting: a quoted
//! value escapes `\` and `"` with a backslash, which keeps the rendering
//! reversible through [`CommandLine::parse`].

use crate::{DotrelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a token is rendered in the joined command line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Quote {
    /// Quote only when the value would otherwise split or be misread.
    #[default]
    Auto,
    /// Always wrap the value in quotes (connection strings).
    Always,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Argument {
    pub value: String,
    pub quote: Quote,
}

impl Argument {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote: Quote::Auto,
        }
    }

    pub fn quoted(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            quote: Quote::Always,
        }
    }

    fn needs_quotes(&self) -> bool {
        match self.quote {
            Quote::Always => true,
            Quote::Auto => {
                self.value.is_empty()
                    || self
                        .value
                        .chars()
                        .any(|c| c.is_whitespace() || c == '"' || c == '\\')
            }
        }
    }
}

impl fmt::Display for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.needs_quotes() {
            return f.write_str(&self.value);
        }

        let mut rendered = String::with_capacity(self.value.len() + 2);
        rendered.push('"');
        for c in self.value.chars() {
            if c == '"' || c == '\\' {
                rendered.push('\\');
            }
            rendered.push(c);
        }
        rendered.push('"');
        f.write_str(&rendered)
    }
}

/// Ordered argument tokens for one invocation of the external tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommandLine {
    args: Vec<Argument>,
}

impl CommandLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a pre-joined argument string into tokens.
    pub fn parse(line: &str) -> Result<Self> {
        let tokens = shell_words::split(line)
            .map_err(|e| DotrelayError::InvalidCommandLine(format!("{}: {}", line, e)))?;
        Ok(tokens.into_iter().map(Argument::new).collect())
    }

    pub fn push(&mut self, arg: Argument) {
        self.args.push(arg);
    }

    pub fn arg(mut self, value: impl Into<String>) -> Self {
        self.args.push(Argument::new(value));
        self
    }

    pub fn args(&self) -> &[Argument] {
        &self.args
    }

    /// Raw tokens as passed to the child process.
    pub fn argv(&self) -> Vec<&str> {
        self.args.iter().map(|a| a.value.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }
}

impl FromIterator<Argument> for CommandLine {
    fn from_iter<I: IntoIterator<Item = Argument>>(iter: I) -> Self {
        Self {
            args: iter.into_iter().collect(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, arg) in self.args.iter().enumerate() {
            if idx > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", arg)?;
        }
        Ok(())
    }
}
