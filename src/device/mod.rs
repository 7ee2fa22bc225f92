pub mod adb;
pub mod cache;
