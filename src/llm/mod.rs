pub mod completion;
pub mod instruction;
