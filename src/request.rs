//! # Spawn request: what to launch.
//!
//! [`SpawnRequest`] is a value-like description of the root child: program,
//! already-tokenized arguments, optional working directory. There is no
//! shell involved at any point; arguments are passed to the OS as discrete
//! strings.

use std::path::PathBuf;

/// Describes the root child to supervise.
///
/// The program is a path or a `PATH`-resolved name. Arguments are discrete
/// tokens, never a shell string.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,
    pub(crate) working_dir: Option<PathBuf>,
}

impl SpawnRequest {
    /// Creates a request for the given program with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Replaces the argument list.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the working directory (defaults to the supervisor's CWD).
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// The program to launch.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// The argument list.
    pub fn argv(&self) -> &[String] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_collects_tokens() {
        let req = SpawnRequest::new("payload")
            .arg("--depth")
            .arg("3")
            .working_dir("/tmp");
        assert_eq!(req.program(), "payload");
        assert_eq!(req.argv(), ["--depth", "3"]);
        assert_eq!(req.working_dir.as_deref(), Some(std::path::Path::new("/tmp")));
    }

    #[test]
    fn args_replaces_the_list() {
        let req = SpawnRequest::new("payload").arg("x").args(["a", "b"]);
        assert_eq!(req.argv(), ["a", "b"]);
    }
}
