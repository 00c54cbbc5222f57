mod problem;

pub use problem::{Language, Problem};
