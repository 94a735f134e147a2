//! # classpath-scanner
//!
//! Indexes a classpath by parsing classfile binary headers directly, without
//! loading or executing any class. Scans directories and jar/zip archives,
//! builds a queryable graph of class, interface and annotation relations,
//! extracts selected static final constants, and streams matching
//! non-classfile paths to caller callbacks.
//!
//! ## Architecture
//!
//! - **pool**: classfile prelude and constant pool reader with two-pass
//!   string indirection resolution
//! - **classfile**: header parser extracting names, relations, class-level
//!   annotations and `ConstantValue` field literals
//! - **graph**: direct relation tables finalized into cached transitive
//!   closures keyed by qualified name
//! - **filter**: package whitelist/blacklist translated into path prefixes
//! - **scan**: classpath traversal with shadowing, timestamps and scoped
//!   streams
//! - **matcher**: registered match callbacks and the type loader seam
//! - **scanner**: the facade tying registration, scanning and queries
//!   together
//! - **error**: the scan and classfile error taxonomy

pub mod classfile;
pub mod cli;
pub mod error;
pub mod filter;
pub mod graph;
pub mod matcher;
pub mod pool;
pub mod scan;
pub mod scanner;
