// Route handler modules

pub mod chat;
pub mod health;
pub mod static_files;
