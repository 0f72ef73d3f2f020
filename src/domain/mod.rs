//! Domain primitives that do not touch the database.

pub mod calendar;
