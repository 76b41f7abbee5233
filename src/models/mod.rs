pub mod challenge;
pub mod check_in;
pub mod enrollment;
pub mod stats;
pub mod token;
