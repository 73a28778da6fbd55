pub mod db;
pub mod pdf;
pub mod templates;
pub mod utils;
