pub mod session;
pub mod user;
pub mod video;
