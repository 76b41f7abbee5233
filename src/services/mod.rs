pub mod calendar;
pub mod check_ins;
pub mod clock;
pub mod enrollments;
pub mod events;
pub mod streaks;
pub mod tokens;
pub mod weekly;
