//! Error kinds for option resolution, module builds and compilation.
//!
//! Every fatal condition ends the invocation; [`BuildError::exit_code`] decides
//! what the process reports to its parent.

use std::fmt;

/// Exit code used when no usable compiler is installed.
pub const EXIT_NO_BACKEND: i32 = 3;

/// Exit code used when the options cannot be resolved.
pub const EXIT_BAD_OPTIONS: i32 = 2;

#[derive(Debug)]
pub enum BuildError {
    /// No supported compiler was found (or the requested one is missing)
    NoBackend(String),
    /// A `--module` value that is not `name=source[,dep...]`
    InvalidModuleSpec(String),
    /// `auto` was requested for the std module but it could not be located
    StdModuleNotFound(String),
    /// Malformed `compile_cpp.toml`
    Config(String),
    /// `--clean` without an explicit build directory, or one that holds the project
    CleanRefused(String),
    /// A recursive module build exited with a non-zero code
    ModuleFailed { name: String, code: i32 },
    /// The main compilation exited with a non-zero code
    CompileFailed { code: i32 },
    /// The compiled program exited with a non-zero code
    RunFailed { code: i32 },
    /// The process could not be started at all
    Launch {
        program: String,
        source: std::io::Error,
    },
    /// IO error
    Io(std::io::Error),
}

impl BuildError {
    /// Process exit code for this error. Child exit codes are passed through verbatim.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::NoBackend(_) => EXIT_NO_BACKEND,
            BuildError::InvalidModuleSpec(_)
            | BuildError::StdModuleNotFound(_)
            | BuildError::Config(_)
            | BuildError::CleanRefused(_) => EXIT_BAD_OPTIONS,
            BuildError::ModuleFailed { code, .. }
            | BuildError::CompileFailed { code }
            | BuildError::RunFailed { code } => *code,
            BuildError::Launch { .. } | BuildError::Io(_) => 1,
        }
    }
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::NoBackend(msg) => write!(f, "No compiler found: {}", msg),
            BuildError::InvalidModuleSpec(spec) => write!(
                f,
                "Invalid module specification '{}' (expected name=source[,dependency...])",
                spec
            ),
            BuildError::StdModuleNotFound(compiler) => write!(
                f,
                "\"auto\" specified for the standard library module path, but it could not be located for {}. Please specify the path manually.",
                compiler
            ),
            BuildError::Config(msg) => write!(f, "Invalid compile_cpp.toml: {}", msg),
            BuildError::CleanRefused(msg) => write!(f, "Refusing to clean: {}", msg),
            BuildError::ModuleFailed { name, code } => write!(
                f,
                "Module \"{}\" compilation failed with return code: {}",
                name, code
            ),
            BuildError::CompileFailed { code } => {
                write!(f, "Compilation failed with return code: {}", code)
            }
            BuildError::RunFailed { code } => {
                write!(f, "Program failed with return code: {}", code)
            }
            BuildError::Launch { program, source } => {
                write!(f, "Could not launch '{}': {}", program, source)
            }
            BuildError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for BuildError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            BuildError::Launch { source, .. } => Some(source),
            BuildError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BuildError {
    fn from(e: std::io::Error) -> Self {
        BuildError::Io(e)
    }
}
