//! TPTP input

pub mod tptp;

pub use tptp::{parse_tptp, parse_tptp_file, ParsedProblem};
