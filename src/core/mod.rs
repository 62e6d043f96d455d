pub mod config;
pub mod parse;
pub mod scan;
pub mod semiring;
pub mod util;
