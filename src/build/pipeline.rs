//! One invocation, start to finish.

use std::fs;
use std::path::Path;
use std::time::Instant;

use super::artifact::ArtifactLayout;
use super::command::{synthesize, windows_command_line};
use super::executor;
use super::invoke::Invoker;
use super::modules::{PreparedModules, precompile_modules};
use super::staleness::needs_rebuild;
use crate::error::BuildError;
use crate::options::{BuildOptions, BuildType, OutputLocation};
use crate::toolchain::{CompilerType, Toolchain};
use crate::ui::{self, Log, Summary};

/// What [`compile`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compiled {
    Built,
    UpToDate,
}

/// Builds the modules, then the program (or module), if anything is stale.
pub fn compile(
    options: &BuildOptions,
    toolchain: &Toolchain,
    invoker: &mut dyn Invoker,
) -> Result<Compiled, BuildError> {
    let log = Log::new(options.verbose);
    let layout = ArtifactLayout::new(options, toolchain.compiler_type);

    // 1. Build folder
    if !layout.build_folder.exists() {
        log.verbose(format!(
            "Creating build folder {}",
            layout.build_folder.display()
        ));
        fs::create_dir_all(&layout.build_folder)?;
    }

    // 2. Modules
    let modules = precompile_modules(options, toolchain, &layout, invoker, &log)?;

    // 3. Command
    if toolchain.compiler_type == CompilerType::GCC
        && options.build_type == BuildType::Release
        && options.uses_modules()
    {
        log.verbose(
            "NOTE: GCC may fail with an internal compiler error when optimizing programs that use modules, so -Og is used instead of -O3.",
        );
    }
    let command = synthesize(toolchain, options, &modules.import_flags, &layout);
    if log.is_verbose() {
        log.separator();
        summary(options, toolchain, &layout, &modules, &command).print();
    }

    // 4. Staleness gate
    let inputs: Vec<_> = options
        .files
        .iter()
        .chain(options.dependencies.iter())
        .chain(modules.artifacts.iter())
        .collect();
    if !needs_rebuild(&layout.binary, &inputs, options.force || modules.rebuilt) {
        log.verbose(format!(
            "{} is up to date, skipping compilation.",
            file_name(&layout.binary)
        ));
        return Ok(Compiled::UpToDate);
    }

    // 5. Compile
    log.separator();
    log.verbose("Compiling...");
    let outcome = executor::execute(&command, &layout.binary)?;
    if !outcome.success() {
        return Err(BuildError::CompileFailed {
            code: outcome.exit_code,
        });
    }
    log.verbose(format!(
        "Compilation completed successfully in {:.2} seconds.",
        outcome.elapsed.as_secs_f64()
    ));
    Ok(Compiled::Built)
}

/// Runs the freshly built program inside the build folder.
pub fn run_program(options: &BuildOptions, toolchain: &Toolchain) -> Result<(), BuildError> {
    let log = Log::new(options.verbose);
    let layout = ArtifactLayout::new(options, toolchain.compiler_type);

    let mut argv = vec![layout.binary.to_string_lossy().to_string()];
    argv.extend(options.pass_args.iter().cloned());
    if options.pass_args.is_empty() {
        log.verbose("Running program...");
    } else {
        log.verbose(format!(
            "Running program with arguments {}...",
            options.pass_args.join(" ")
        ));
    }
    log.separator();

    let start = Instant::now();
    let outcome = executor::spawn(&argv, Some(&layout.build_folder))?;
    log.separator();
    if !outcome.success() {
        return Err(BuildError::RunFailed {
            code: outcome.exit_code,
        });
    }
    log.verbose(format!(
        "Program executed successfully in {:.2} seconds.",
        start.elapsed().as_secs_f64()
    ));
    Ok(())
}

/// Empties the build folder named with `-o <dir>/` (or `output` in the
/// configuration file), then recreates it.
///
/// Without an explicit directory the build folder is the working directory,
/// which also holds the sources, so that is refused. So is any folder that
/// contains the working directory.
pub fn clean(options: &BuildOptions) -> Result<(), BuildError> {
    let OutputLocation::Directory(folder) = &options.output else {
        return Err(BuildError::CleanRefused(
            "no build folder given; pass one with -o <dir>/".to_string(),
        ));
    };
    if contains_work_dir(folder, &options.work_dir) {
        return Err(BuildError::CleanRefused(format!(
            "{} contains the working directory",
            folder.display()
        )));
    }
    if !folder.is_dir() {
        ui::warn(format!("Folder {} does not exist.", folder.display()));
        return Ok(());
    }
    fs::remove_dir_all(folder)?;
    fs::create_dir_all(folder)?;
    ui::success(format!("Cleared {}", folder.display()));
    Ok(())
}

fn contains_work_dir(folder: &Path, work_dir: &Path) -> bool {
    if work_dir.starts_with(folder) {
        return true;
    }
    // Symlinked paths
    match (fs::canonicalize(folder), fs::canonicalize(work_dir)) {
        (Ok(folder), Ok(work_dir)) => work_dir.starts_with(folder),
        _ => false,
    }
}

fn summary(
    options: &BuildOptions,
    toolchain: &Toolchain,
    layout: &ArtifactLayout,
    modules: &PreparedModules,
    command: &[String],
) -> Summary {
    let mut table = Summary::new();
    table
        .row("Compiler", toolchain.cxx_path.display())
        .row("C++ Standard", options.std.as_str().to_uppercase())
        .row("Type", options.build_type.as_str())
        .list(
            "Source file(s)",
            &options
                .files
                .iter()
                .map(|f| f.display().to_string())
                .collect::<Vec<_>>(),
        )
        .list("Defines", &options.defines)
        .list("Flags", &options.flags)
        .list(
            "Includes",
            &options
                .includes
                .iter()
                .map(|i| i.display().to_string())
                .collect::<Vec<_>>(),
        );
    if options.std.supports_modules() {
        let names: Vec<String> = super::modules::build_order(options)
            .iter()
            .map(|m| format!("{}={}", m.name, m.source.display()))
            .collect();
        table.list("Modules", &names);
    } else {
        table.row("Modules", "<Unused in C++17 mode>");
    }
    table
        .row("Module imports", modules.import_flags.len())
        .row("Build folder", layout.build_folder.display())
        .row("Binary file", file_name(&layout.binary))
        .row("Command", windows_command_line(command));
    table
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
