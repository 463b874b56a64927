pub mod devlog;
pub mod logger;
pub mod num;
pub mod json;
