//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods.
//! Plain reads and CRUD accept `&PgPool`; methods used inside an engine
//! transaction accept `&mut PgConnection` (pass `&mut *tx`).

pub mod course_repo;
pub mod enrollment_repo;
pub mod section_repo;
pub mod waitlist_repo;

pub use course_repo::CourseRepo;
pub use enrollment_repo::EnrollmentRepo;
pub use section_repo::SectionRepo;
pub use waitlist_repo::WaitlistRepo;
