use clap::ValueEnum;
use std::fmt;
use std::path::PathBuf;

use super::backend::{self, Backend};

/// Supported compiler types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
#[allow(clippy::upper_case_acronyms)]
pub enum CompilerType {
    /// Microsoft Visual C++ (cl.exe)
    #[value(name = "cl")]
    MSVC,
    /// Clang/LLVM (clang++)
    #[value(name = "clang++")]
    Clang,
    /// GNU Compiler Collection (g++)
    #[value(name = "g++")]
    GCC,
}

impl CompilerType {
    /// Name of the compiler executable, also used as the key in `compile_cpp.toml`.
    pub fn command_name(&self) -> &'static str {
        match self {
            CompilerType::MSVC => "cl",
            CompilerType::Clang => "clang++",
            CompilerType::GCC => "g++",
        }
    }

    /// Short name embedded in artifact file names.
    pub fn short_name(&self) -> &'static str {
        match self {
            CompilerType::MSVC => "msvc",
            CompilerType::Clang => "clang",
            CompilerType::GCC => "gcc",
        }
    }

    /// Flag syntax and module model for this compiler.
    pub fn backend(&self) -> &'static dyn Backend {
        match self {
            CompilerType::MSVC => &backend::Msvc,
            CompilerType::Clang => &backend::Clang,
            CompilerType::GCC => &backend::Gcc,
        }
    }
}

impl fmt::Display for CompilerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command_name())
    }
}

/// A compiler that was found on this machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub compiler_type: CompilerType,

    /// Absolute path to the compiler executable. For MSVC this is just `cl`,
    /// which only resolves inside the developer shell.
    pub cxx_path: PathBuf,
}

impl Toolchain {
    pub fn new(compiler_type: CompilerType, cxx_path: PathBuf) -> Self {
        Self {
            compiler_type,
            cxx_path,
        }
    }

    pub fn backend(&self) -> &'static dyn Backend {
        self.compiler_type.backend()
    }
}
