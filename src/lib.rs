pub mod aggregate;
pub mod db;
pub mod enroll;
pub mod http;
pub mod identity;
pub mod org;
pub mod scores;
