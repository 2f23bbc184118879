#![forbid(unsafe_code)]

pub mod files;
pub mod records;
pub mod repository;
pub mod sqlite;
