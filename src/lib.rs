//! # jarc Core Library
//!
//! This crate provides the core functionality for the `jarc` archiver: it
//! builds manifest-carrying ZIP container archives from filesystem inputs,
//! updates existing archives in place by reconciling them against a new
//! input set, and computes the transitive classpath index across archives.
//!
//! It is designed to be used by the `jarc` command-line application, but the
//! public API in [`ops`] can also be driven programmatically.
//!
//! ## Key Modules
//!
//! - [`names`]: Entry name normalization and relocation-prefix stripping.
//! - [`manifest`]: The block-structured manifest model.
//! - [`expand`]: Recursive input expansion and the replacement index.
//! - [`builder`]: New-archive emission and the shared entry write rules.
//! - [`update`]: The incremental, atomic update state machine.
//! - [`classpath`]: Cycle-safe transitive `Class-Path` indexing.
//! - [`ops`]: The operation facade consumed by the CLI.

pub mod builder;
pub mod classpath;
pub mod cli;
pub mod expand;
pub mod manifest;
pub mod names;
pub mod ops;
pub mod update;

pub mod error;
pub use error::JarError;
