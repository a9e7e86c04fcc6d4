pub mod repository;
pub mod rest;
pub mod sqlite;
