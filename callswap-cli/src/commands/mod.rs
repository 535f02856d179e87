pub mod common;
pub mod find;
pub mod rewrite;
