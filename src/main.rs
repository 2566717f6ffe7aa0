//! # compile-cpp CLI Entry Point
//!
//! Parses the command line with clap, merges it with `compile_cpp.toml`, and
//! either compiles once or runs the compatibility matrix. Module builds and
//! matrix combinations re-execute this binary with explicit arguments.

use anyhow::{Context, Result};
use clap::Parser;

use compile_cpp::build::{self, SelfInvoker};
use compile_cpp::config::CompileConfig;
use compile_cpp::error::BuildError;
use compile_cpp::options::{self, Arch, BuildType, ExceptionPolicy, Request, Standard};
use compile_cpp::toolchain::{self, CompilerType};
use compile_cpp::ui;

#[cfg(windows)]
#[link(name = "kernel32")]
unsafe extern "system" {
    fn SetConsoleOutputCP(wCodePageID: u32) -> i32;
}

/// Status glyphs are UTF-8.
#[cfg(windows)]
fn enable_windows_utf8_console() {
    unsafe {
        SetConsoleOutputCP(65001);
    }
}

#[cfg(not(windows))]
fn enable_windows_utf8_console() {}

#[derive(Parser)]
#[command(name = "compile-cpp")]
#[command(about = "Compile C++ programs with MSVC, Clang or GCC, including C++20 modules", version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
struct Cli {
    /// Source files to compile (the first one names the binary)
    #[arg(required_unless_present = "clean")]
    files: Vec<String>,

    /// Target architecture (MSVC only)
    #[arg(short, long, value_enum, default_value_t = Arch::Amd64)]
    arch: Arch,

    /// Compiler to use (auto-detected if omitted)
    #[arg(short, long, value_enum, conflicts_with = "matrix")]
    compiler: Option<CompilerType>,

    /// Macro to define (repeatable) [in addition to compile_cpp.toml]
    #[arg(short, long = "define")]
    define: Vec<String>,

    /// Extra file to check when deciding whether to recompile (repeatable)
    #[arg(short = 'D', long = "dependency")]
    dependency: Vec<String>,

    /// Extra compiler flag (repeatable)
    #[arg(short, long = "flag", allow_hyphen_values = true)]
    flag: Vec<String>,

    /// Ignore compile_cpp.toml
    #[arg(short = 'g', long)]
    ignore_config: bool,

    /// Include directory (repeatable)
    #[arg(short, long = "include")]
    include: Vec<String>,

    /// Compile the file as a module
    #[arg(short = 'l', long)]
    as_module: bool,

    /// Module as name=source[,dependency...] (repeatable)
    #[arg(short, long = "module")]
    module: Vec<String>,

    /// Output directory (ends with a separator or exists) or binary path
    #[arg(short, long)]
    output: Option<String>,

    /// Argument for the program when run with -r (repeatable)
    #[arg(short, long = "pass", allow_hyphen_values = true)]
    pass: Vec<String>,

    /// Run the program after compiling it
    #[arg(short, long)]
    run: bool,

    /// C++ standard
    #[arg(short, long, value_enum, default_value_t = Standard::Cxx23, conflicts_with = "matrix")]
    std: Standard,

    /// Build type
    #[arg(short = 't', long = "type", value_enum, default_value_t = BuildType::Debug)]
    build_type: BuildType,

    /// Standard library module source: a path, "auto", or "disable"
    #[arg(short = 'u', long)]
    std_module: Option<String>,

    /// Disable C++ exceptions
    #[arg(short = 'x', long)]
    no_exceptions: bool,

    /// Recompile even if everything is up to date
    #[arg(short = 'F', long)]
    force: bool,

    /// Print diagnostic messages
    #[arg(short, long)]
    verbose: bool,

    /// Compile with every available compiler and every standard
    #[arg(long)]
    matrix: bool,

    /// Clear the build directory given with -o and exit
    #[arg(long, conflicts_with = "matrix")]
    clean: bool,
}

impl Cli {
    fn request(&self) -> Request {
        Request {
            files: self.files.clone(),
            arch: self.arch,
            compiler: self.compiler,
            std: self.std,
            build_type: self.build_type,
            defines: self.define.clone(),
            dependencies: self.dependency.clone(),
            flags: self.flag.clone(),
            includes: self.include.clone(),
            modules: self.module.clone(),
            output: self.output.clone(),
            pass_args: self.pass.clone(),
            std_module: self.std_module.clone(),
            as_module: self.as_module,
            ignore_config: self.ignore_config,
            exceptions: if self.no_exceptions {
                ExceptionPolicy::Disabled
            } else {
                ExceptionPolicy::Enabled
            },
            force: self.force,
            run: self.run,
            verbose: self.verbose,
        }
    }
}

fn main() {
    enable_windows_utf8_console();

    let cli = Cli::parse();
    let code = match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            ui::error(format!("{:#}", e));
            e.downcast_ref::<BuildError>()
                .map(BuildError::exit_code)
                .unwrap_or(1)
        }
    };
    std::process::exit(code);
}

fn run(cli: &Cli) -> Result<i32> {
    let cwd = std::env::current_dir().context("Failed to read the working directory")?;
    let request = cli.request();
    let mut invoker = SelfInvoker::current().context("Failed to locate the compile-cpp executable")?;

    if cli.matrix {
        let compilers: Vec<CompilerType> = toolchain::available_toolchains()
            .iter()
            .map(|tc| tc.compiler_type)
            .collect();
        return Ok(build::run_matrix(
            &compilers,
            &Standard::ALL,
            &request,
            &mut invoker,
        )?);
    }

    let config = if request.ignore_config {
        None
    } else {
        CompileConfig::load(&cwd)?
    };
    let toolchain = toolchain::detect_toolchain(request.compiler)?;
    let options = options::resolve(&request, config.as_ref(), &toolchain, &cwd)?;

    if cli.clean {
        build::clean(&options)?;
        return Ok(0);
    }

    build::compile(&options, &toolchain, &mut invoker)?;
    if options.run && !options.as_module {
        build::run_program(&options, &toolchain)?;
    }
    Ok(0)
}
