pub mod education;
pub mod profile;
pub mod submission;
