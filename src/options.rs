//! Build options.
//!
//! A [`Request`] is what the user typed (or what a parent invocation passes to
//! a child). [`resolve`] merges it with `compile_cpp.toml` into one immutable
//! [`BuildOptions`] that every later stage borrows.

use clap::ValueEnum;
use regex::Regex;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;

use crate::config::CompileConfig;
use crate::error::BuildError;
use crate::toolchain::{self, CompilerType, GCC_STD_MODULE_TOKEN, Toolchain};

/// Reserved module name for the C++ standard library module.
pub const STD_MODULE_NAME: &str = "std";

/// C++ standard versions, oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, ValueEnum)]
pub enum Standard {
    #[value(name = "c++17")]
    Cxx17,
    #[value(name = "c++20")]
    Cxx20,
    #[default]
    #[value(name = "c++23")]
    Cxx23,
}

impl Standard {
    pub const ALL: [Standard; 3] = [Standard::Cxx17, Standard::Cxx20, Standard::Cxx23];

    pub fn as_str(&self) -> &'static str {
        match self {
            Standard::Cxx17 => "c++17",
            Standard::Cxx20 => "c++20",
            Standard::Cxx23 => "c++23",
        }
    }

    /// Two-digit year, as used in artifact names.
    pub fn year(&self) -> &'static str {
        &self.as_str()[3..]
    }

    /// Named modules need C++20.
    pub fn supports_modules(&self) -> bool {
        *self >= Standard::Cxx20
    }

    /// `import std;` needs C++23.
    pub fn supports_std_module(&self) -> bool {
        *self >= Standard::Cxx23
    }
}

impl fmt::Display for Standard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum BuildType {
    #[default]
    Debug,
    Release,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Release => "release",
        }
    }
}

/// Target architecture (only MSVC's developer shell cares).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Arch {
    #[default]
    Amd64,
    Arm64,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::Amd64 => "amd64",
            Arch::Arm64 => "arm64",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExceptionPolicy {
    #[default]
    Enabled,
    Disabled,
}

/// Where the binary goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLocation {
    /// Working directory, name derived from the first source file
    Auto,
    /// Given directory, name derived from the first source file
    Directory(PathBuf),
    /// Exact binary path
    Binary(PathBuf),
}

impl OutputLocation {
    /// A value ending with a path separator, or naming an existing directory,
    /// is a directory; anything else is the binary itself.
    pub fn parse(raw: &str, cwd: &Path) -> Self {
        let path = absolute_path(cwd, raw);
        if raw.ends_with('/') || raw.ends_with('\\') || path.is_dir() {
            OutputLocation::Directory(path)
        } else {
            OutputLocation::Binary(path)
        }
    }
}

/// Value of `--std-module`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StdModuleSetting {
    Auto,
    /// Explicit marker that stops std module lookup (used for the std module's own build)
    Disabled,
    Path(String),
}

impl StdModuleSetting {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "auto" => StdModuleSetting::Auto,
            "disable" => StdModuleSetting::Disabled,
            other => StdModuleSetting::Path(other.to_string()),
        }
    }
}

/// A named module: its source, then files that only feed the staleness check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSpec {
    pub name: String,
    pub source: PathBuf,
    pub dependencies: Vec<PathBuf>,
}

impl ModuleSpec {
    /// Parses `name=source,dep1,dep2`. Paths are kept as written.
    pub fn parse(spec: &str) -> Result<Self, BuildError> {
        let invalid = || BuildError::InvalidModuleSpec(spec.to_string());
        let (name, files) = spec.split_once('=').ok_or_else(invalid)?;
        let files: Vec<&str> = files.split(',').map(str::trim).collect();
        Self::from_parts(name.trim(), &files).map_err(|_| invalid())
    }

    /// Builds a spec from a name and its file list (first entry is the source).
    pub fn from_parts<S: AsRef<str>>(name: &str, files: &[S]) -> Result<Self, BuildError> {
        let invalid = || BuildError::InvalidModuleSpec(name.to_string());
        if !module_name_regex().is_match(name) {
            return Err(invalid());
        }
        let (source, deps) = files.split_first().ok_or_else(invalid)?;
        let source = source.as_ref().trim();
        if source.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            source: PathBuf::from(source),
            dependencies: deps
                .iter()
                .map(|d| d.as_ref().trim())
                .filter(|d| !d.is_empty())
                .map(PathBuf::from)
                .collect(),
        })
    }

    pub fn is_std(&self) -> bool {
        self.name == STD_MODULE_NAME
    }

    /// Every path whose change makes the module stale.
    pub fn inputs(&self) -> Vec<PathBuf> {
        std::iter::once(self.source.clone())
            .chain(self.dependencies.iter().cloned())
            .collect()
    }
}

fn module_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*(:[A-Za-z_][A-Za-z0-9_.]*)?$")
            .expect("static regex")
    })
}

/// Options exactly as given on the command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub files: Vec<String>,
    pub arch: Arch,
    pub compiler: Option<CompilerType>,
    pub std: Standard,
    pub build_type: BuildType,
    pub defines: Vec<String>,
    pub dependencies: Vec<String>,
    pub flags: Vec<String>,
    pub includes: Vec<String>,
    pub modules: Vec<String>,
    pub output: Option<String>,
    pub pass_args: Vec<String>,
    pub std_module: Option<String>,
    pub as_module: bool,
    pub ignore_config: bool,
    pub exceptions: ExceptionPolicy,
    pub force: bool,
    pub run: bool,
    pub verbose: bool,
}

impl Request {
    /// Command-line arguments that reproduce this request in a child process.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("--arch={}", self.arch.as_str()),
            format!("--std={}", self.std),
            format!("--type={}", self.build_type.as_str()),
        ];
        if let Some(compiler) = self.compiler {
            args.push(format!("--compiler={}", compiler));
        }
        let repeated = [
            ("define", &self.defines),
            ("dependency", &self.dependencies),
            ("include", &self.includes),
            ("flag", &self.flags),
            ("module", &self.modules),
            ("pass", &self.pass_args),
        ];
        for (name, values) in repeated {
            args.extend(values.iter().map(|v| format!("--{}={}", name, v)));
        }
        if let Some(output) = &self.output {
            args.push(format!("--output={}", output));
        }
        if let Some(std_module) = &self.std_module {
            args.push(format!("--std-module={}", std_module));
        }
        let switches = [
            ("--as-module", self.as_module),
            ("--ignore-config", self.ignore_config),
            ("--no-exceptions", self.exceptions == ExceptionPolicy::Disabled),
            ("--force", self.force),
            ("--run", self.run),
            ("--verbose", self.verbose),
        ];
        args.extend(
            switches
                .into_iter()
                .filter(|(_, on)| *on)
                .map(|(flag, _)| flag.to_string()),
        );
        args.push("--".to_string());
        args.extend(self.files.iter().cloned());
        args
    }
}

/// Fully resolved, immutable options for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOptions {
    pub work_dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub std: Standard,
    pub build_type: BuildType,
    pub arch: Arch,
    pub defines: Vec<String>,
    pub includes: Vec<PathBuf>,
    pub flags: Vec<String>,
    pub exceptions: ExceptionPolicy,
    pub dependencies: Vec<PathBuf>,
    /// Declared modules other than `std`, in declaration order
    pub modules: Vec<ModuleSpec>,
    /// The standard library module, if it is in use
    pub std_module: Option<ModuleSpec>,
    pub as_module: bool,
    pub output: OutputLocation,
    pub force: bool,
    pub verbose: bool,
    pub run: bool,
    pub pass_args: Vec<String>,
}

impl BuildOptions {
    /// True when named modules take part in this build at all, including
    /// when this build produces one.
    pub fn uses_modules(&self) -> bool {
        self.std.supports_modules()
            && (self.as_module || self.std_module.is_some() || !self.modules.is_empty())
    }
}

/// Merges the request with the configuration file.
///
/// Lists are the command-line values followed by the configuration values. A
/// module declared on the command line overrides a configured one with the
/// same name. `output` and `std_module` come from the configuration only when
/// the command line leaves them out.
pub fn resolve(
    request: &Request,
    config: Option<&CompileConfig>,
    toolchain: &Toolchain,
    cwd: &Path,
) -> Result<BuildOptions, BuildError> {
    let compiler = toolchain.compiler_type;
    let empty = CompileConfig::default();
    let config = config.unwrap_or(&empty);

    let abs_all = |paths: Vec<String>| -> Vec<PathBuf> {
        paths.iter().map(|p| absolute_path(cwd, p)).collect()
    };

    let mut declared: Vec<ModuleSpec> = Vec::new();
    for spec in &request.modules {
        let module = ModuleSpec::parse(spec)?;
        declared.retain(|m| m.name != module.name);
        declared.push(module);
    }
    for (name, files) in &config.modules {
        if declared.iter().any(|m| &m.name == name) {
            continue;
        }
        declared.push(ModuleSpec::from_parts(name, files)?);
    }
    let declared: Vec<ModuleSpec> = declared
        .into_iter()
        .map(|m| ModuleSpec {
            source: module_source_path(cwd, &m.source, compiler),
            dependencies: m.dependencies.iter().map(|d| cwd.join(d)).map(normalize).collect(),
            name: m.name,
        })
        .collect();
    let (std_declared, modules): (Vec<ModuleSpec>, Vec<ModuleSpec>) =
        declared.into_iter().partition(ModuleSpec::is_std);

    let setting = request
        .std_module
        .as_deref()
        .or_else(|| config.std_module_for(std::env::consts::OS, compiler))
        .map(StdModuleSetting::parse);

    let std_module = if !request.std.supports_std_module() {
        None
    } else {
        match (setting, std_declared.into_iter().next()) {
            (Some(StdModuleSetting::Disabled), _) => None,
            (_, Some(declared)) => Some(declared),
            (None, None) => None,
            (Some(StdModuleSetting::Path(p)), None) => Some(std_module_spec(
                module_source_path(cwd, Path::new(&p), compiler),
            )),
            (Some(StdModuleSetting::Auto), None) => {
                let located = toolchain::locate_std_module(toolchain)
                    .ok_or_else(|| BuildError::StdModuleNotFound(compiler.to_string()))?;
                Some(std_module_spec(located))
            }
        }
    };

    let output = match request.output.as_deref().or(config.output.as_deref()) {
        Some(raw) => OutputLocation::parse(raw, cwd),
        None => OutputLocation::Auto,
    };

    Ok(BuildOptions {
        work_dir: cwd.to_path_buf(),
        files: request
            .files
            .iter()
            .map(|f| module_source_path(cwd, Path::new(f), compiler))
            .collect(),
        std: request.std,
        build_type: request.build_type,
        arch: request.arch,
        defines: concat(&request.defines, &config.defines),
        includes: abs_all(concat(&request.includes, &config.includes)),
        flags: concat(&request.flags, config.flags_for(compiler)),
        exceptions: request.exceptions,
        dependencies: abs_all(concat(&request.dependencies, &config.dependencies)),
        modules,
        std_module,
        as_module: request.as_module,
        output,
        force: request.force,
        verbose: request.verbose,
        run: request.run,
        pass_args: concat(&request.pass_args, &config.pass_args),
    })
}

fn concat(cli: &[String], cfg: &[String]) -> Vec<String> {
    cli.iter().chain(cfg.iter()).cloned().collect()
}

fn std_module_spec(source: PathBuf) -> ModuleSpec {
    ModuleSpec {
        name: STD_MODULE_NAME.to_string(),
        source,
        dependencies: Vec::new(),
    }
}

/// GCC finds its std module source through its own include path, so the
/// `bits/std.cc` token must not be turned into a filesystem path.
fn module_source_path(cwd: &Path, source: &Path, compiler: CompilerType) -> PathBuf {
    if compiler == CompilerType::GCC && source == Path::new(GCC_STD_MODULE_TOKEN) {
        return source.to_path_buf();
    }
    normalize(cwd.join(source))
}

/// Joins `raw` onto `cwd` (absolute paths win) and removes `.` and `..`.
pub fn absolute_path(cwd: &Path, raw: &str) -> PathBuf {
    normalize(cwd.join(raw))
}

fn normalize(path: PathBuf) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}
