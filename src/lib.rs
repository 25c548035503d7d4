pub mod docx;
pub mod error;
pub mod progress;
pub mod segment;
