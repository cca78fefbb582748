//! Level 3: Feature Integration Tests
//!
//! Archives are assembled on disk and read back through [`mpq_reader::Archive`].

pub mod sectors;
