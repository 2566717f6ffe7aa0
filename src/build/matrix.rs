//! Compatibility matrix.
//!
//! Compiles the same request with every available backend and every standard,
//! warnings as errors, and stops at the first failure.

use std::time::Instant;

use super::invoke::Invoker;
use crate::error::BuildError;
use crate::options::{Request, Standard};
use crate::toolchain::CompilerType;
use crate::ui;

/// Runs every `backends` x `standards` combination, backends outermost.
///
/// Returns the exit code of the first failing combination, or 0.
pub fn run_matrix(
    backends: &[CompilerType],
    standards: &[Standard],
    shared: &Request,
    invoker: &mut dyn Invoker,
) -> Result<i32, BuildError> {
    if backends.is_empty() {
        return Err(BuildError::NoBackend(
            "none of cl, clang++ or g++ is available".to_string(),
        ));
    }

    let start = Instant::now();
    for &compiler in backends {
        for &std in standards {
            ui::banner(format!(
                "Compiling with {} using {} standard...",
                compiler,
                std.as_str().to_uppercase()
            ));
            let code = invoker.invoke(&combination(shared, compiler, std))?;
            if code != 0 {
                ui::banner("Compilation failed, aborting!");
                return Ok(code);
            }
        }
    }
    ui::banner(format!(
        "All combinations completed successfully in {:.2} seconds.",
        start.elapsed().as_secs_f64()
    ));
    Ok(0)
}

fn combination(shared: &Request, compiler: CompilerType, std: Standard) -> Request {
    let mut request = shared.clone();
    request.compiler = Some(compiler);
    request.std = std;
    // Artifact names do not encode flags, so a binary built without the
    // warnings flag would otherwise pass as fresh.
    request.force = true;
    request
        .flags
        .push(compiler.backend().warnings_as_errors().to_string());
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::invoke::testing::RecordingInvoker;

    fn shared() -> Request {
        Request {
            files: vec!["tests/pool_test.cpp".into()],
            flags: vec!["-Wall".into()],
            run: true,
            pass_args: vec!["log".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_all_combinations_in_order() {
        let mut invoker = RecordingInvoker::default();
        let code = run_matrix(
            &[CompilerType::Clang, CompilerType::GCC],
            &Standard::ALL,
            &shared(),
            &mut invoker,
        )
        .unwrap();
        assert_eq!(code, 0);
        let seen: Vec<(Option<CompilerType>, Standard)> =
            invoker.calls.iter().map(|r| (r.compiler, r.std)).collect();
        assert_eq!(seen, [
            (Some(CompilerType::Clang), Standard::Cxx17),
            (Some(CompilerType::Clang), Standard::Cxx20),
            (Some(CompilerType::Clang), Standard::Cxx23),
            (Some(CompilerType::GCC), Standard::Cxx17),
            (Some(CompilerType::GCC), Standard::Cxx20),
            (Some(CompilerType::GCC), Standard::Cxx23),
        ]);
    }

    #[test]
    fn test_fail_fast_returns_failing_code() {
        let mut invoker = RecordingInvoker::failing_on(4, 3);
        let code = run_matrix(
            &[CompilerType::Clang, CompilerType::GCC],
            &Standard::ALL,
            &shared(),
            &mut invoker,
        )
        .unwrap();
        assert_eq!(code, 3);
        assert_eq!(invoker.calls.len(), 4);
        assert_eq!(invoker.calls[3].compiler, Some(CompilerType::GCC));
        assert_eq!(invoker.calls[3].std, Standard::Cxx17);
    }

    #[test]
    fn test_warnings_as_errors_appended_per_backend() {
        let mut invoker = RecordingInvoker::default();
        run_matrix(
            &[CompilerType::MSVC, CompilerType::Clang],
            &[Standard::Cxx20],
            &shared(),
            &mut invoker,
        )
        .unwrap();
        assert_eq!(invoker.calls[0].flags, ["-Wall", "/WX"]);
        assert_eq!(invoker.calls[1].flags, ["-Wall", "-Werror"]);
        // The rest of the request is passed through untouched.
        assert!(invoker.calls.iter().all(|r| r.run && r.pass_args == ["log"]));
        // Every combination is compiled, even over an existing binary.
        assert!(invoker.calls.iter().all(|r| r.force));
    }

    #[test]
    fn test_no_backend() {
        let mut invoker = RecordingInvoker::default();
        let err = run_matrix(&[], &Standard::ALL, &shared(), &mut invoker).unwrap_err();
        assert_eq!(err.exit_code(), crate::error::EXIT_NO_BACKEND);
        assert!(invoker.calls.is_empty());
    }
}
