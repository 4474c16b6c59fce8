//! End-to-end tests for the ontopack facade
//!
//! Each module drives the full path: an ontology document is compiled into
//! a type table, packs are filled the way an annotation pipeline would fill
//! them, and the results are read back through queries and the registry.

mod common;

mod configuration;
mod multi_document;
mod pipeline;
