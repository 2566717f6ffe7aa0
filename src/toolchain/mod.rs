//! Toolchain discovery.
//!
//! Finds the installed compilers, picks one for a build, and locates the
//! standard library module source when `--std-module=auto` is used.

pub mod backend;
pub mod types;

pub use backend::{Backend, GCC_STD_MODULE_TOKEN, VS_DEV_SHELL};
pub use types::{CompilerType, Toolchain};

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use walkdir::WalkDir;

use crate::error::BuildError;

/// Homebrew LLVM; Apple Clang does not support modules.
const HOMEBREW_CLANG: &str = "/usr/local/opt/llvm/bin/clang++";

const VC_TOOLS_VERSION_FILE: &str = r"C:\Program Files\Microsoft Visual Studio\2022\Community\VC\Auxiliary\Build\Microsoft.VCToolsVersion.default.txt";
const VC_TOOLS_ROOT: &str = r"C:\Program Files\Microsoft Visual Studio\2022\Community\VC\Tools\MSVC";

/// Look a command up on PATH with `which` (`where` on Windows).
pub fn find_executable(cmd: &str) -> Option<PathBuf> {
    let finder = if cfg!(windows) { "where" } else { "which" };
    let output = Command::new(finder).arg(cmd).output().ok()?;
    if !output.status.success() {
        return None;
    }
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(PathBuf::from)
}

/// Find one specific compiler.
pub fn find_toolchain(compiler_type: CompilerType) -> Option<Toolchain> {
    match compiler_type {
        CompilerType::MSVC => Path::new(VS_DEV_SHELL)
            .exists()
            .then(|| Toolchain::new(CompilerType::MSVC, PathBuf::from("cl"))),
        CompilerType::Clang => {
            if cfg!(target_os = "macos") && Path::new(HOMEBREW_CLANG).exists() {
                return Some(Toolchain::new(
                    CompilerType::Clang,
                    PathBuf::from(HOMEBREW_CLANG),
                ));
            }
            find_executable("clang++").map(|p| Toolchain::new(CompilerType::Clang, p))
        }
        CompilerType::GCC => {
            find_executable("g++").map(|p| Toolchain::new(CompilerType::GCC, p))
        }
    }
}

/// Order in which compilers are tried when none is requested.
fn preference_order() -> &'static [CompilerType] {
    if cfg!(windows) {
        &[CompilerType::MSVC, CompilerType::Clang, CompilerType::GCC]
    } else if cfg!(target_os = "macos") {
        &[CompilerType::Clang]
    } else {
        &[CompilerType::GCC, CompilerType::Clang]
    }
}

/// Pick the compiler for a build: the requested one, or the best available.
pub fn detect_toolchain(preferred: Option<CompilerType>) -> Result<Toolchain, BuildError> {
    if let Some(compiler_type) = preferred {
        return find_toolchain(compiler_type).ok_or_else(|| {
            BuildError::NoBackend(format!("'{}' is not installed", compiler_type))
        });
    }
    preference_order()
        .iter()
        .find_map(|ct| find_toolchain(*ct))
        .ok_or_else(|| {
            BuildError::NoBackend("Please install clang++ or g++ (or Visual Studio).".to_string())
        })
}

/// Every installed compiler, in the order the test matrix runs them.
pub fn available_toolchains() -> Vec<Toolchain> {
    let mut order = vec![CompilerType::MSVC, CompilerType::Clang];
    // On macOS g++ is an alias for Apple Clang.
    if !cfg!(target_os = "macos") {
        order.push(CompilerType::GCC);
    }
    order.into_iter().filter_map(find_toolchain).collect()
}

/// Finds the standard library module source for `toolchain`.
pub fn locate_std_module(toolchain: &Toolchain) -> Option<PathBuf> {
    match toolchain.compiler_type {
        CompilerType::MSVC => locate_msvc_std_module(),
        CompilerType::Clang => locate_clang_std_module(&toolchain.cxx_path),
        CompilerType::GCC => Some(PathBuf::from(GCC_STD_MODULE_TOKEN)),
    }
}

fn locate_msvc_std_module() -> Option<PathBuf> {
    if !cfg!(windows) {
        return None;
    }
    let version = fs::read_to_string(VC_TOOLS_VERSION_FILE).ok()?;
    Some(
        Path::new(VC_TOOLS_ROOT)
            .join(version.trim())
            .join("modules")
            .join("std.ixx"),
    )
}

// The Clang std module ships with libc++ only.
fn locate_clang_std_module(cxx_path: &Path) -> Option<PathBuf> {
    if cfg!(windows) {
        // MSYS2 layout: <root>/bin/clang++.exe next to <root>/share/libc++/v1/std.cppm
        let candidate = cxx_path
            .parent()?
            .parent()?
            .join("share")
            .join("libc++")
            .join("v1")
            .join("std.cppm");
        return candidate.exists().then_some(candidate);
    }
    let root = if cfg!(target_os = "macos") {
        "/usr/local/Cellar/llvm"
    } else {
        "/usr/lib"
    };
    find_file_named(Path::new(root), "std.cppm")
}

fn find_file_named(root: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .find(|e| e.file_type().is_file() && e.file_name() == name)
        .map(|e| e.into_path())
}
