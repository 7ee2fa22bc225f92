pub mod capability;
pub mod driver_model;
pub mod remote;
pub mod session;
pub mod wait;
