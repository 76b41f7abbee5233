pub mod check_ins;
pub mod enrollments;
pub mod health;
pub mod stats;
pub mod tokens;
pub mod ws;
