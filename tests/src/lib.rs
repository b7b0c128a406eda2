//! # Record Sharding Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Schemas, services, tracing setup, gated backend
//! └── integration/      # End-to-end lifecycle flows
//!     ├── lifecycle.rs  # attach → mutate → detach → re-attach, shutdown
//!     ├── contention.rs # Global root locks while a save is in flight
//!     └── recovery.rs   # Interrupted operations, backend outages
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p record-tests
//!
//! # By category
//! cargo test -p record-tests integration::contention::
//!
//! # Benchmarks
//! cargo bench -p record-tests
//! ```

pub mod fixtures;
pub mod integration;
