//! Domain logic for the audiotracks service.
//!
//! Everything in this crate is independent of HTTP and the database: slug
//! allocation rules, audio format detection, the tag codec, the on-disk media
//! layout, M3U rendering, and pagination arithmetic.

pub mod audio;
pub mod error;
pub mod images;
pub mod pagination;
pub mod playlist;
pub mod slug;
pub mod storage;
pub mod tags;
pub mod types;
pub mod users;
