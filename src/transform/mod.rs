//! Text primitives used when cleaning customer fields.

pub mod string_ops;
