//! # docsift core
//!
//! Pure logic shared by the `docsift` application: the document data model,
//! the assembler that turns extracted pages into a [`models::Document`], the
//! result ranker, the theme policy filter, and the [`embedding::Embedder`]
//! trait with its vector helpers.
//!
//! This crate performs no filesystem, database, or network I/O.

pub mod assemble;
pub mod embedding;
pub mod models;
pub mod rank;
pub mod theme;
