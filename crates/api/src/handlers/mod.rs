pub mod course;
pub mod enrollment;
pub mod section;
pub mod user;
pub mod waitlist;
