//! End-to-end behavior of the registry against temporary file sets.

mod concurrent_readers;
mod invariants;
mod overlay;
mod round_trip;
mod scenarios;
mod support;
