pub mod connection;
pub mod decision;
pub mod gtfs;
pub mod timefmt;
