//! # Storage Backends
//!
//! Persistent implementations of the repository contract.

pub mod redb_repository;

pub use redb_repository::RedbRepository;
