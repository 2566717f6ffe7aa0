//! Named module precompilation.
//!
//! Every module that is out of date is compiled by a child invocation of this
//! program in `--as-module` mode, strictly one after another: the standard
//! library module first, then the declared modules in declaration order. The
//! user orders modules so that dependencies come first.
//!
//! A module build never precompiles user modules itself. It only builds or
//! imports `std`, which bounds the recursion at one level.

use std::path::PathBuf;

use super::artifact::ArtifactLayout;
use super::invoke::Invoker;
use super::staleness::needs_rebuild;
use crate::error::BuildError;
use crate::options::{BuildOptions, ModuleSpec, Request};
use crate::toolchain::Toolchain;
use crate::toolchain::backend::ModuleImport;
use crate::ui::Log;

/// What the main compilation needs from the module stage.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PreparedModules {
    /// Import flags for every module, rebuilt or not, in build order
    pub import_flags: Vec<String>,
    /// Artifacts in build order
    pub artifacts: Vec<PathBuf>,
    /// At least one module was compiled in this run
    pub rebuilt: bool,
}

/// Modules this invocation is responsible for, in build order.
pub fn build_order(options: &BuildOptions) -> Vec<&ModuleSpec> {
    if !options.std.supports_modules() {
        return Vec::new();
    }
    let mut order: Vec<&ModuleSpec> = options.std_module.iter().collect();
    if !options.as_module {
        order.extend(options.modules.iter());
    }
    order
}

pub fn precompile_modules(
    options: &BuildOptions,
    toolchain: &Toolchain,
    layout: &ArtifactLayout,
    invoker: &mut dyn Invoker,
    log: &Log,
) -> Result<PreparedModules, BuildError> {
    let backend = toolchain.backend();
    let mut prepared = PreparedModules::default();
    // A module child is always forced by its parent; passing that on to std
    // would rebuild it for every module.
    let force = options.force && !options.as_module;

    for module in build_order(options) {
        let artifact = layout.module_artifact(&module.source, backend);
        prepared.import_flags.extend(backend.import_flags(&ModuleImport {
            name: &module.name,
            artifact: &artifact,
            build_folder: &layout.build_folder,
            importer_is_module: options.as_module,
        }));

        if !needs_rebuild(&artifact, &module.inputs(), force) {
            log.verbose(format!(
                "Module \"{}\" is up to date, skipping compilation.",
                module.name
            ));
            prepared.artifacts.push(artifact);
            continue;
        }

        log.verbose(format!(
            "Compiling module \"{}\" from {}",
            module.name,
            module.source.display()
        ));
        let request = module_request(options, toolchain, module, &artifact);
        let code = invoker.invoke(&request)?;
        if code != 0 {
            return Err(BuildError::ModuleFailed {
                name: module.name.clone(),
                code,
            });
        }
        prepared.rebuilt = true;
        prepared.artifacts.push(artifact);
    }

    Ok(prepared)
}

/// The child invocation that produces one module artifact.
///
/// Configuration has already been merged into `options`, so the child skips
/// the config file. It is always forced: only the parent sees the module's
/// extra dependencies, and it already decided the module is stale.
fn module_request(
    options: &BuildOptions,
    toolchain: &Toolchain,
    module: &ModuleSpec,
    artifact: &std::path::Path,
) -> Request {
    let std_module = if module.is_std() {
        Some("disable".to_string())
    } else {
        options
            .std_module
            .as_ref()
            .map(|std| std.source.to_string_lossy().to_string())
    };
    Request {
        files: vec![module.source.to_string_lossy().to_string()],
        arch: options.arch,
        compiler: Some(toolchain.compiler_type),
        std: options.std,
        build_type: options.build_type,
        defines: options.defines.clone(),
        dependencies: Vec::new(),
        flags: options.flags.clone(),
        includes: options
            .includes
            .iter()
            .map(|i| i.to_string_lossy().to_string())
            .collect(),
        modules: Vec::new(),
        output: Some(artifact.to_string_lossy().to_string()),
        pass_args: Vec::new(),
        std_module,
        as_module: true,
        ignore_config: true,
        exceptions: options.exceptions,
        force: true,
        run: false,
        verbose: options.verbose,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::invoke::testing::RecordingInvoker;
    use crate::options::{self, Standard};
    use crate::toolchain::CompilerType;
    use std::fs::File;
    use std::path::Path;
    use std::time::{Duration, SystemTime};

    struct Project {
        dir: tempfile::TempDir,
    }

    impl Project {
        fn new() -> Self {
            Self {
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        /// Creates (or touches) a file with a fixed modification time.
        fn touch(&self, name: &str, secs: u64) -> PathBuf {
            let path = self.path().join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            let file = File::create(&path).unwrap();
            file.set_modified(SystemTime::UNIX_EPOCH + Duration::from_secs(secs))
                .unwrap();
            path
        }

        fn artifact(&self, stem: &str) -> String {
            format!("build/{}_module_debug-clang-cpp23.pcm", stem)
        }

        fn options(&self, req: &Request) -> BuildOptions {
            options::resolve(req, None, &clang(), self.path()).unwrap()
        }
    }

    fn clang() -> Toolchain {
        Toolchain::new(CompilerType::Clang, PathBuf::from("/usr/bin/clang++"))
    }

    fn request(modules: &[&str], std_module: Option<&str>) -> Request {
        Request {
            files: vec!["main.cpp".into()],
            modules: modules.iter().map(|m| m.to_string()).collect(),
            std_module: std_module.map(String::from),
            output: Some("build/".into()),
            ..Default::default()
        }
    }

    fn run(
        opts: &BuildOptions,
        invoker: &mut RecordingInvoker,
    ) -> Result<PreparedModules, BuildError> {
        let tc = clang();
        let layout = ArtifactLayout::new(opts, tc.compiler_type);
        precompile_modules(opts, &tc, &layout, invoker, &Log::default())
    }

    #[test]
    fn test_fresh_build_compiles_std_first_then_declared_order() {
        let p = Project::new();
        p.touch("std.cppm", 10);
        p.touch("b.ixx", 10);
        p.touch("a.ixx", 10);
        std::fs::create_dir_all(p.path().join("build")).unwrap();
        let req = request(&["b=b.ixx", "a=a.ixx"], Some("std.cppm"));
        let opts = p.options(&req);

        let mut invoker = RecordingInvoker::default();
        let prepared = run(&opts, &mut invoker).unwrap();

        assert_eq!(invoker.compiled(), ["std.cppm", "b.ixx", "a.ixx"]);
        assert!(prepared.rebuilt);
        assert_eq!(prepared.import_flags.len(), 3);
        assert!(prepared.import_flags[0].starts_with("-fmodule-file=std="));
        assert!(prepared.import_flags[1].starts_with("-fmodule-file=b="));
    }

    #[test]
    fn test_only_stale_module_is_rebuilt_but_all_are_imported() {
        let p = Project::new();
        p.touch("std.cppm", 10);
        p.touch("a.ixx", 10);
        p.touch("b.ixx", 30);
        p.touch("c.ixx", 10);
        p.touch(&p.artifact("std"), 20);
        p.touch(&p.artifact("a"), 20);
        p.touch(&p.artifact("b"), 20);
        p.touch(&p.artifact("c"), 20);
        let req = request(&["a=a.ixx", "b=b.ixx", "c=c.ixx"], Some("std.cppm"));
        let opts = p.options(&req);

        let mut invoker = RecordingInvoker::default();
        let prepared = run(&opts, &mut invoker).unwrap();

        assert_eq!(invoker.compiled(), ["b.ixx"]);
        assert_eq!(prepared.import_flags.len(), 4);
        assert_eq!(prepared.artifacts.len(), 4);
        assert!(prepared.rebuilt);
    }

    #[test]
    fn test_newer_dependency_makes_module_stale() {
        // util.ixx and util_impl.cpp feed the util module
        let p = Project::new();
        p.touch("util.ixx", 100);
        p.touch("util_impl.cpp", 100);
        p.touch(&p.artifact("util"), 200);
        let req = request(&["util=util.ixx,util_impl.cpp"], None);
        let opts = p.options(&req);

        let mut invoker = RecordingInvoker::default();
        let prepared = run(&opts, &mut invoker).unwrap();
        assert!(invoker.calls.is_empty());
        assert!(!prepared.rebuilt);
        assert_eq!(prepared.import_flags.len(), 1);

        p.touch("util_impl.cpp", 300);
        let mut invoker = RecordingInvoker::default();
        let prepared = run(&opts, &mut invoker).unwrap();
        assert_eq!(invoker.compiled(), ["util.ixx"]);
        assert!(prepared.rebuilt);
    }

    #[test]
    fn test_force_rebuilds_everything() {
        let p = Project::new();
        p.touch("a.ixx", 10);
        p.touch(&p.artifact("a"), 20);
        let mut req = request(&["a=a.ixx"], None);
        req.force = true;
        let opts = p.options(&req);

        let mut invoker = RecordingInvoker::default();
        run(&opts, &mut invoker).unwrap();
        assert_eq!(invoker.compiled(), ["a.ixx"]);
    }

    #[test]
    fn test_module_build_only_handles_std() {
        let p = Project::new();
        p.touch("std.cppm", 10);
        let mut req = request(&["a=a.ixx", "b=b.ixx"], Some("std.cppm"));
        req.files = vec!["a.ixx".into()];
        req.output = Some(p.artifact("a"));
        req.as_module = true;
        req.force = true;
        let opts = p.options(&req);

        let mut invoker = RecordingInvoker::default();
        let prepared = run(&opts, &mut invoker).unwrap();
        assert_eq!(invoker.compiled(), ["std.cppm"]);
        assert_eq!(prepared.import_flags.len(), 1);

        // Forced children do not rebuild an up-to-date std module.
        p.touch(&p.artifact("std"), 20);
        let mut invoker = RecordingInvoker::default();
        run(&opts, &mut invoker).unwrap();
        assert!(invoker.calls.is_empty());
    }

    #[test]
    fn test_child_requests() {
        let p = Project::new();
        let mut req = request(&["util=util.ixx,util.hpp"], Some("std.cppm"));
        req.defines = vec!["FOO".into()];
        req.includes = vec!["include".into()];
        let opts = p.options(&req);

        let mut invoker = RecordingInvoker::default();
        run(&opts, &mut invoker).unwrap();
        let (std_req, util_req) = (&invoker.calls[0], &invoker.calls[1]);

        assert_eq!(std_req.std_module.as_deref(), Some("disable"));
        let std_source = p.path().join("std.cppm").to_string_lossy().to_string();
        assert_eq!(util_req.std_module.as_deref(), Some(std_source.as_str()));
        for child in &invoker.calls {
            assert!(child.as_module && child.ignore_config && child.force);
            assert!(!child.run);
            assert_eq!(child.compiler, Some(CompilerType::Clang));
            assert_eq!(child.defines, ["FOO"]);
            assert!(child.modules.is_empty());
        }
        let expected = p.path().join(p.artifact("util"));
        assert_eq!(
            util_req.output.as_deref(),
            Some(expected.to_string_lossy().as_ref())
        );
    }

    #[test]
    fn test_failure_stops_the_sequence() {
        let p = Project::new();
        let req = request(&["a=a.ixx", "b=b.ixx", "c=c.ixx"], None);
        let opts = p.options(&req);

        let mut invoker = RecordingInvoker::failing_on(2, 7);
        let err = run(&opts, &mut invoker).unwrap_err();
        assert_eq!(invoker.compiled(), ["a.ixx", "b.ixx"]);
        match err {
            BuildError::ModuleFailed { name, code } => {
                assert_eq!(name, "b");
                assert_eq!(code, 7);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_cxx17_has_no_module_stage() {
        let p = Project::new();
        let mut req = request(&["a=a.ixx"], None);
        req.std = Standard::Cxx17;
        let opts = p.options(&req);

        let mut invoker = RecordingInvoker::default();
        let prepared = run(&opts, &mut invoker).unwrap();
        assert!(invoker.calls.is_empty());
        assert_eq!(prepared, PreparedModules::default());
    }
}
