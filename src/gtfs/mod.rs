//! GTFS reference table support: CSV tokenizing, lookup building, caching,
//! and line resolution.
//!
//! The lookup is built offline from a static GTFS feed and consumed read-only
//! at request time to turn opaque carrier line identifiers into display
//! names, transport modes, and operators.

pub mod builder;
pub mod csv;
pub mod lookup;
pub mod resolve;
