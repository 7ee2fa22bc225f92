pub mod args;
pub mod catalog;
pub mod dispatcher;
pub mod open_app;
pub mod search;
pub mod take_screenshot;
pub mod wait_for_screen;
