//! Per-compiler flag syntax and module model.
//!
//! Each backend is a unit type implementing [`Backend`]; the rest of the
//! pipeline never branches on the compiler kind.
//!
//! | Backend | Module artifact | Import flag |
//! |---------|-----------------|-------------|
//! | MSVC    | `.ifc` (+ `.obj`) | `/reference name=path` |
//! | Clang   | `.pcm`          | `-fmodule-file=name=path` |
//! | GCC     | `.o` (+ `.gcm` via mapper) | `-fmodules-ts -fmodule-mapper=...` |

use std::path::Path;

use crate::build::command::windows_command_line;
use crate::options::{BuildOptions, BuildType, ExceptionPolicy, STD_MODULE_NAME, Standard};

/// GCC's standard library module source, resolved through GCC's own include path.
pub const GCC_STD_MODULE_TOKEN: &str = "bits/std.cc";

/// Visual Studio developer shell that sets up the MSVC environment.
pub const VS_DEV_SHELL: &str =
    r"C:\Program Files\Microsoft Visual Studio\2022\Community\Common7\Tools\Launch-VsDevShell.ps1";

/// A module the current compilation imports.
#[derive(Debug, Clone, Copy)]
pub struct ModuleImport<'a> {
    pub name: &'a str,
    pub artifact: &'a Path,
    pub build_folder: &'a Path,
    /// The importing compilation is itself a module build
    pub importer_is_module: bool,
}

/// Everything needed to produce one compiler invocation.
#[derive(Debug, Clone, Copy)]
pub struct CommandContext<'a> {
    pub exe: &'a Path,
    pub options: &'a BuildOptions,
    pub imports: &'a [String],
    /// Binary, or module artifact when `options.as_module` is set
    pub output: &'a Path,
    pub build_folder: &'a Path,
}

pub trait Backend: Sync {
    /// Extension of the file a module build produces (and that staleness checks look at).
    fn module_extension(&self) -> &'static str;

    /// Flags that switch the compiler from normal compilation to module production.
    fn module_mode_flags(&self, build_folder: &Path) -> Vec<String>;

    /// Flags that let a compilation find one precompiled module.
    fn import_flags(&self, import: &ModuleImport<'_>) -> Vec<String>;

    fn exception_flags(&self, policy: ExceptionPolicy) -> Vec<String>;

    fn optimization_flags(&self, options: &BuildOptions, output: &Path) -> Vec<String>;

    fn std_flag(&self, std: Standard) -> String;

    fn warnings_as_errors(&self) -> &'static str;

    /// Full argument vector, program first. Flag order matters to some compilers.
    fn command(&self, ctx: &CommandContext<'_>) -> Vec<String>;
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

fn gcc_mapper_flag(build_folder: &Path) -> String {
    format!("-fmodule-mapper=|@g++-mapper-server -r{}", build_folder.display())
}

/// Source arguments. GCC's std module token is looked up on the include path.
fn source_args(ctx: &CommandContext<'_>) -> Vec<String> {
    let mut args = Vec::new();
    for file in &ctx.options.files {
        if file == Path::new(GCC_STD_MODULE_TOKEN) {
            args.push("-fsearch-include-path".to_string());
        }
        args.push(path_arg(file));
    }
    args
}

/// Shared layout of Clang and GCC command lines.
fn gnu_command(backend: &dyn Backend, ctx: &CommandContext<'_>) -> Vec<String> {
    let opts = ctx.options;
    let mut cmd = vec![path_arg(ctx.exe)];
    cmd.extend(opts.flags.iter().cloned());
    if opts.as_module {
        cmd.extend(backend.module_mode_flags(ctx.build_folder));
    }
    cmd.extend(ctx.imports.iter().cloned());
    cmd.extend(source_args(ctx));
    cmd.push(backend.std_flag(opts.std));
    cmd.extend(backend.optimization_flags(opts, ctx.output));
    cmd.push("-o".to_string());
    cmd.push(path_arg(ctx.output));
    if !cfg!(windows) {
        cmd.push("-pthread".to_string());
    }
    for include in &opts.includes {
        cmd.push("-I".to_string());
        cmd.push(path_arg(include));
    }
    cmd.extend(opts.defines.iter().map(|d| format!("-D{}", d)));
    cmd.extend(backend.exception_flags(opts.exceptions));
    cmd
}

pub struct Clang;

impl Backend for Clang {
    fn module_extension(&self) -> &'static str {
        ".pcm"
    }

    fn module_mode_flags(&self, _build_folder: &Path) -> Vec<String> {
        vec![
            "--precompile".to_string(),
            "-Wno-include-angled-in-module-purview".to_string(),
            "-Wno-reserved-module-identifier".to_string(),
            "-xc++-module".to_string(),
        ]
    }

    fn import_flags(&self, import: &ModuleImport<'_>) -> Vec<String> {
        vec![format!(
            "-fmodule-file={}={}",
            import.name,
            import.artifact.display()
        )]
    }

    fn exception_flags(&self, policy: ExceptionPolicy) -> Vec<String> {
        match policy {
            ExceptionPolicy::Enabled => Vec::new(),
            ExceptionPolicy::Disabled => vec!["-fno-exceptions".to_string()],
        }
    }

    fn optimization_flags(&self, options: &BuildOptions, _output: &Path) -> Vec<String> {
        match options.build_type {
            BuildType::Debug => vec!["-g3".to_string()],
            BuildType::Release => vec!["-O3".to_string()],
        }
    }

    fn std_flag(&self, std: Standard) -> String {
        format!("-std={}", std)
    }

    fn warnings_as_errors(&self) -> &'static str {
        "-Werror"
    }

    fn command(&self, ctx: &CommandContext<'_>) -> Vec<String> {
        gnu_command(self, ctx)
    }
}

pub struct Gcc;

impl Backend for Gcc {
    // GCC names the .gcm itself; the object file is what we can timestamp.
    fn module_extension(&self) -> &'static str {
        ".o"
    }

    fn module_mode_flags(&self, build_folder: &Path) -> Vec<String> {
        vec![
            "-fmodules-ts".to_string(),
            "-xc++".to_string(),
            "-c".to_string(),
            gcc_mapper_flag(build_folder),
        ]
    }

    fn import_flags(&self, import: &ModuleImport<'_>) -> Vec<String> {
        vec![
            "-fmodules-ts".to_string(),
            gcc_mapper_flag(import.build_folder),
        ]
    }

    fn exception_flags(&self, policy: ExceptionPolicy) -> Vec<String> {
        match policy {
            ExceptionPolicy::Enabled => Vec::new(),
            ExceptionPolicy::Disabled => vec!["-fno-exceptions".to_string()],
        }
    }

    // Optimized module builds hit an internal compiler error, so modules get -Og.
    fn optimization_flags(&self, options: &BuildOptions, _output: &Path) -> Vec<String> {
        match options.build_type {
            BuildType::Debug => vec!["-ggdb3".to_string()],
            BuildType::Release if options.uses_modules() => vec!["-Og".to_string()],
            BuildType::Release => vec!["-O3".to_string()],
        }
    }

    fn std_flag(&self, std: Standard) -> String {
        format!("-std={}", std)
    }

    fn warnings_as_errors(&self) -> &'static str {
        "-Werror"
    }

    fn command(&self, ctx: &CommandContext<'_>) -> Vec<String> {
        gnu_command(self, ctx)
    }
}

pub struct Msvc;

impl Backend for Msvc {
    fn module_extension(&self) -> &'static str {
        ".ifc"
    }

    fn module_mode_flags(&self, _build_folder: &Path) -> Vec<String> {
        vec!["/interface".to_string(), "/TP".to_string(), "/c".to_string()]
    }

    fn import_flags(&self, import: &ModuleImport<'_>) -> Vec<String> {
        let mut flags = vec![
            "/reference".to_string(),
            format!("{}={}", import.name, import.artifact.display()),
        ];
        // The std object is linked by whoever imports std last, not by other modules.
        if import.name != STD_MODULE_NAME || !import.importer_is_module {
            let stem = import
                .artifact
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_default();
            flags.push(path_arg(&import.build_folder.join(format!("{}.obj", stem))));
        }
        flags
    }

    fn exception_flags(&self, policy: ExceptionPolicy) -> Vec<String> {
        match policy {
            ExceptionPolicy::Enabled => vec!["/EHsc".to_string()],
            ExceptionPolicy::Disabled => {
                vec!["/EHs-c-".to_string(), "/D_HAS_EXCEPTIONS=0".to_string()]
            }
        }
    }

    fn optimization_flags(&self, options: &BuildOptions, output: &Path) -> Vec<String> {
        match options.build_type {
            BuildType::Debug => vec![
                "/Zi".to_string(),
                format!("/Fd:{}", output.with_extension("pdb").display()),
            ],
            BuildType::Release => vec!["/O2".to_string()],
        }
    }

    fn std_flag(&self, std: Standard) -> String {
        match std {
            Standard::Cxx23 => "/std:c++latest".to_string(),
            other => format!("/std:{}", other),
        }
    }

    fn warnings_as_errors(&self) -> &'static str {
        "/WX"
    }

    /// `cl` only works inside the developer shell, so the real command line is
    /// forwarded through `Launch-VsDevShell.ps1`.
    fn command(&self, ctx: &CommandContext<'_>) -> Vec<String> {
        let opts = ctx.options;
        let mut cmd = vec![path_arg(ctx.exe)];
        cmd.extend(opts.flags.iter().cloned());
        if opts.as_module {
            cmd.extend(self.module_mode_flags(ctx.build_folder));
        }
        cmd.extend(ctx.imports.iter().cloned());
        cmd.extend(source_args(ctx));
        cmd.push(self.std_flag(opts.std));
        cmd.extend(self.optimization_flags(opts, ctx.output));
        if opts.as_module {
            cmd.push("/ifcOutput".to_string());
            cmd.push(path_arg(ctx.output));
        } else {
            cmd.push(format!("/Fe:{}", ctx.output.display()));
        }
        cmd.push(format!("/Fo:{}", ctx.output.with_extension("obj").display()));
        for include in &opts.includes {
            cmd.push("/I".to_string());
            cmd.push(path_arg(include));
        }
        cmd.push("/permissive-".to_string());
        cmd.extend(self.exception_flags(opts.exceptions));
        cmd.push("/nologo".to_string());
        cmd.push("/Zc:__cplusplus".to_string());
        cmd.extend(opts.defines.iter().map(|d| format!("/D{}", d)));

        let arch = opts.arch.as_str();
        vec![
            "pwsh.exe".to_string(),
            "-NoProfile".to_string(),
            "-ExecutionPolicy".to_string(),
            "Bypass".to_string(),
            "-Command".to_string(),
            format!(
                "& '{}' -Arch {} -HostArch {} | Out-Null; {}",
                VS_DEV_SHELL,
                arch,
                arch,
                windows_command_line(&cmd)
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_module_extensions() {
        assert_eq!(Clang.module_extension(), ".pcm");
        assert_eq!(Gcc.module_extension(), ".o");
        assert_eq!(Msvc.module_extension(), ".ifc");
    }

    #[test]
    fn test_clang_import_flag() {
        let artifact = PathBuf::from("/b/util_module_debug-clang-cpp23.pcm");
        let import = ModuleImport {
            name: "util",
            artifact: &artifact,
            build_folder: Path::new("/b"),
            importer_is_module: false,
        };
        assert_eq!(
            Clang.import_flags(&import),
            ["-fmodule-file=util=/b/util_module_debug-clang-cpp23.pcm"]
        );
    }

    #[test]
    fn test_gcc_import_uses_mapper() {
        let artifact = PathBuf::from("/b/util_module_debug-gcc-cpp23.o");
        let import = ModuleImport {
            name: "util",
            artifact: &artifact,
            build_folder: Path::new("/b"),
            importer_is_module: false,
        };
        assert_eq!(
            Gcc.import_flags(&import),
            ["-fmodules-ts", "-fmodule-mapper=|@g++-mapper-server -r/b"]
        );
    }

    #[test]
    fn test_msvc_std_object_only_linked_by_non_modules() {
        let artifact = PathBuf::from("/b/std_module_debug-msvc-cpp23.ifc");
        let mut import = ModuleImport {
            name: "std",
            artifact: &artifact,
            build_folder: Path::new("/b"),
            importer_is_module: false,
        };
        let flags = Msvc.import_flags(&import);
        assert_eq!(flags.len(), 3);
        assert_eq!(flags[0], "/reference");
        assert_eq!(flags[1], "std=/b/std_module_debug-msvc-cpp23.ifc");
        assert!(flags[2].ends_with("std_module_debug-msvc-cpp23.obj"));

        import.importer_is_module = true;
        assert_eq!(Msvc.import_flags(&import).len(), 2);

        import.name = "util";
        assert_eq!(Msvc.import_flags(&import).len(), 3);
    }

    #[test]
    fn test_exception_flags() {
        assert!(Clang.exception_flags(ExceptionPolicy::Enabled).is_empty());
        assert_eq!(Gcc.exception_flags(ExceptionPolicy::Disabled), ["-fno-exceptions"]);
        assert_eq!(Msvc.exception_flags(ExceptionPolicy::Enabled), ["/EHsc"]);
        assert_eq!(
            Msvc.exception_flags(ExceptionPolicy::Disabled),
            ["/EHs-c-", "/D_HAS_EXCEPTIONS=0"]
        );
    }

    #[test]
    fn test_std_flags() {
        assert_eq!(Clang.std_flag(Standard::Cxx20), "-std=c++20");
        assert_eq!(Msvc.std_flag(Standard::Cxx17), "/std:c++17");
        assert_eq!(Msvc.std_flag(Standard::Cxx23), "/std:c++latest");
    }

    #[test]
    fn test_warnings_as_errors() {
        assert_eq!(Msvc.warnings_as_errors(), "/WX");
        assert_eq!(Gcc.warnings_as_errors(), "-Werror");
    }
}
