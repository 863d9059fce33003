pub mod db;
pub mod middleware;
pub mod orm;
pub mod session;
pub mod tree;
pub mod user;
pub mod web;

pub use crate::db::get_db_pool;
