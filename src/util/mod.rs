pub mod cost;
pub mod tree;
