pub mod auth;
pub mod playlist;
pub mod track;
