pub mod command;
pub mod error;
pub mod temp_files;
