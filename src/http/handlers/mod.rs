pub mod conversations;
pub mod core;
pub mod enrollments;
pub mod overview;
pub mod skills;
pub mod streaks;
pub mod students;
pub mod webhook;
