pub mod home;
pub mod pdf;
pub mod profile;
pub mod system;
