pub mod fitted;
pub mod forest;
pub mod tree;
