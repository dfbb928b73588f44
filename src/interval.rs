//! Interval records: the unit of the track precursor files.

pub mod record;

pub use record::Record;
