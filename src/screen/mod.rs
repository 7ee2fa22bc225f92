pub mod matcher;
pub mod scanner;
pub mod ui_tree;
