pub mod middleware;
pub mod repo;
