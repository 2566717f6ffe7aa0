//! Recursive self-invocation.
//!
//! Module builds and matrix runs re-execute this program as a separate
//! process, one at a time, and wait for it. [`Invoker`] is the seam that lets
//! tests record those sub-builds instead of spawning them.

use std::path::PathBuf;

use super::executor;
use crate::error::BuildError;
use crate::options::Request;

pub trait Invoker {
    /// Runs one sub-build to completion and returns its exit code.
    fn invoke(&mut self, request: &Request) -> Result<i32, BuildError>;
}

/// Spawns the running executable again.
pub struct SelfInvoker {
    exe: PathBuf,
}

impl SelfInvoker {
    pub fn new(exe: PathBuf) -> Self {
        Self { exe }
    }

    pub fn current() -> Result<Self, BuildError> {
        Ok(Self::new(std::env::current_exe()?))
    }

    pub fn command_line(&self, request: &Request) -> Vec<String> {
        let mut argv = vec![self.exe.to_string_lossy().to_string()];
        argv.extend(request.to_args());
        argv
    }
}

impl Invoker for SelfInvoker {
    fn invoke(&mut self, request: &Request) -> Result<i32, BuildError> {
        let argv = self.command_line(request);
        Ok(executor::spawn(&argv, None)?.exit_code)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_line_starts_with_exe() {
        let invoker = SelfInvoker::new(PathBuf::from("/bin/compile-cpp"));
        let req = Request {
            files: vec!["main.cpp".into()],
            ..Default::default()
        };
        let argv = invoker.command_line(&req);
        assert_eq!(argv[0], "/bin/compile-cpp");
        assert_eq!(argv.last().unwrap(), "main.cpp");
    }
}
