//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that take a
//! pool, a connection or a generic SQLite executor as the first argument.

pub mod track_repo;
pub mod user_repo;

pub use track_repo::TrackRepo;
pub use user_repo::UserRepo;
