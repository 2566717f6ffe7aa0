//! # compile-cpp - C++ compilation driver
//!
//! Compiles small C++ programs (a few sources and headers) with MSVC, Clang or
//! GCC from one command line, including C++20 named modules and the C++23
//! standard library module.
//!
//! ## Features
//!
//! - **One Interface**: The same options drive `cl`, `clang++` and `g++`
//! - **Modules**: Declared modules are precompiled in order, `std` first
//! - **Incremental**: Anything whose inputs are older than its artifact is skipped
//! - **Matrix**: Every available compiler with every standard, warnings as errors
//!
//! ## Quick Start
//!
//! ```bash
//! compile-cpp main.cpp -m util=util.ixx,util_impl.cpp -o build/ -r
//! compile-cpp tests/pool_test.cpp --matrix -t release
//! ```
//!
//! ## Module Organization
//!
//! - [`build`] - Module precompilation, staleness, command synthesis, execution
//! - [`config`] - Configuration parsing (`compile_cpp.toml`)
//! - [`options`] - Command line and configuration merged into build options
//! - [`toolchain`] - Compiler detection and per-compiler flag syntax

/// Compilation pipeline.
pub mod build;

/// Configuration file parsing (`compile_cpp.toml`).
pub mod config;

/// Error kinds and exit codes.
pub mod error;

/// Resolved build options.
pub mod options;

/// Toolchain detection and backends.
pub mod toolchain;

/// Terminal output (status lines, summary table).
pub mod ui;
