//! Integration test crate for the Kiyeovo protocol.
//!
//! This crate has no library code — it only contains integration tests
//! that exercise end-to-end protocol flows across multiple workspace crates
//! (spec §8: direct offline round trip, group invite/accept/activate, key
//! rotation on join, gap detection, epoch retirement, corrupted-message
//! rejection).
//!
//! Run all integration tests:
//! ```sh
//! cargo test -p kiyeovo-integration-tests -- --ignored
//! ```
