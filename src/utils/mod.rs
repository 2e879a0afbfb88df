pub mod formatting;
pub mod paths;
pub mod truncation;
