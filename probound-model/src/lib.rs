//! Basic data types used by the probound probability bounds engine.

pub mod prob;
pub mod problem;

pub use prob::{format_decimal, parse_decimal, to_f64, DecimalParseError};
pub use problem::{Problem, Rule, RuleProb};

pub use num_rational::BigRational;
