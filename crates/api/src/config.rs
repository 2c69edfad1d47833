use std::path::PathBuf;

use audiotracks_core::pagination::DEFAULT_PER_PAGE;

use crate::auth::jwt::JwtConfig;

/// Where uploaded media live on disk and how they are addressed over HTTP.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Filesystem root for stored audio files and images (default: `./media`).
    pub root: PathBuf,
    /// URL prefix the media root is served under (default: `/media`).
    pub url: String,
    /// Scheme and host used for absolute URLs in playlists, e.g.
    /// `https://music.example.com`. When unset, the request's `Host` header
    /// is used with `http`.
    pub public_base_url: Option<String>,
}

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// SQLite connection URL (default: `sqlite://audiotracks.db`).
    pub database_url: String,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Media storage and URL layout.
    pub media: MediaConfig,
    /// Tracks per listing page (default: `10`).
    pub tracks_per_page: i64,
    /// Largest accepted request body in bytes (default: 100 MiB).
    pub max_upload_bytes: usize,
    /// Whether `POST /auth/register` is open (default: `true`).
    pub allow_registration: bool,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `DATABASE_URL`         | `sqlite://audiotracks.db`  |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `MEDIA_ROOT`           | `./media`                  |
    /// | `MEDIA_URL`            | `/media`                   |
    /// | `PUBLIC_BASE_URL`      | unset                      |
    /// | `TRACKS_PER_PAGE`      | `10`                       |
    /// | `MAX_UPLOAD_BYTES`     | `104857600`                |
    /// | `ALLOW_REGISTRATION`   | `true`                     |
    ///
    /// # Panics
    ///
    /// Panics on unparsable numeric or boolean values so misconfiguration
    /// fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://audiotracks.db".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let media = MediaConfig {
            root: std::env::var("MEDIA_ROOT")
                .unwrap_or_else(|_| "./media".into())
                .into(),
            url: normalize_media_url(
                &std::env::var("MEDIA_URL").unwrap_or_else(|_| "/media".into()),
            ),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
        };

        let tracks_per_page: i64 = std::env::var("TRACKS_PER_PAGE")
            .unwrap_or_else(|_| DEFAULT_PER_PAGE.to_string())
            .parse()
            .expect("TRACKS_PER_PAGE must be a valid i64");
        assert!(tracks_per_page > 0, "TRACKS_PER_PAGE must be positive");

        let max_upload_bytes: usize = std::env::var("MAX_UPLOAD_BYTES")
            .unwrap_or_else(|_| "104857600".into())
            .parse()
            .expect("MAX_UPLOAD_BYTES must be a valid usize");

        let allow_registration: bool = std::env::var("ALLOW_REGISTRATION")
            .unwrap_or_else(|_| "true".into())
            .parse()
            .expect("ALLOW_REGISTRATION must be `true` or `false`");

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            database_url,
            cors_origins,
            request_timeout_secs,
            media,
            tracks_per_page,
            max_upload_bytes,
            allow_registration,
            jwt,
        }
    }
}

/// Force a leading `/` and drop any trailing one (`media/` -> `/media`).
/// The bare root stays `/`.
pub fn normalize_media_url(url: &str) -> String {
    let trimmed = url.trim().trim_matches('/');
    format!("/{trimmed}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_url_normalization() {
        assert_eq!(normalize_media_url("/media"), "/media");
        assert_eq!(normalize_media_url("media/"), "/media");
        assert_eq!(normalize_media_url("/"), "/");
        assert_eq!(normalize_media_url(""), "/");
    }
}
