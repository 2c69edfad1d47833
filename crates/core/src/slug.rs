//! Slug normalisation and collision-suffix candidates for tracks.
//!
//! Slugs are unique per owner, not globally. This module only produces
//! candidates; the repository layer probes them against the owner's existing
//! tracks (see `TrackRepo::allocate_slug` in the db crate).

use unicode_normalization::UnicodeNormalization;

/// Maximum slug length in characters (and bytes, slugs are ASCII).
pub const SLUG_MAX_LEN: usize = 50;

/// Slug used when normalisation leaves nothing behind (e.g. a title made only
/// of punctuation or non-ASCII characters).
pub const FALLBACK_SLUG: &str = "track";

/// Upper bound on suffix probing before giving up with a conflict.
pub const MAX_SLUG_PROBES: u32 = 10_000;

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Convert arbitrary text into a URL-safe slug.
///
/// The text is NFKD-decomposed first so accented letters keep their base
/// letter (`Café` -> `cafe`); whatever is still non-ASCII is dropped, as is
/// anything that is not alphanumeric, `_`, `-` or whitespace. The result is
/// lowercased, runs of whitespace and hyphens collapse into a single `-`, and
/// leading/trailing `-`/`_` are trimmed. Underscores inside the slug survive: `audio_file` stays
/// `audio_file`.
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_separator = false;

    for c in text.nfkd() {
        if !c.is_ascii() {
            continue;
        }
        if c.is_ascii_whitespace() || c == '-' {
            pending_separator = true;
        } else if c.is_ascii_alphanumeric() || c == '_' {
            if pending_separator && !out.is_empty() {
                out.push('-');
            }
            pending_separator = false;
            out.push(c.to_ascii_lowercase());
        }
    }

    out.trim_matches(|c| c == '-' || c == '_').to_string()
}

/// Normalise `text` and cut it to [`SLUG_MAX_LEN`], substituting
/// [`FALLBACK_SLUG`] when nothing usable remains.
pub fn base_slug(text: &str) -> String {
    let slug = slugify(text);
    if slug.is_empty() {
        return FALLBACK_SLUG.to_string();
    }
    truncate(&slug, SLUG_MAX_LEN).to_string()
}

fn truncate(slug: &str, max: usize) -> &str {
    // Slugs are pure ASCII, so byte offsets are char offsets.
    &slug[..slug.len().min(max)]
}

// ---------------------------------------------------------------------------
// Collision candidates
// ---------------------------------------------------------------------------

/// The `n`-th candidate for `base`.
///
/// `n == 1` is the base itself; `n >= 2` appends `-n`, shortening the base so
/// the whole candidate stays within [`SLUG_MAX_LEN`].
pub fn candidate(base: &str, n: u32) -> String {
    if n <= 1 {
        return truncate(base, SLUG_MAX_LEN).to_string();
    }
    let suffix = format!("-{n}");
    let keep = SLUG_MAX_LEN.saturating_sub(suffix.len());
    format!("{}{suffix}", truncate(base, keep))
}

/// Iterate candidates `base`, `base-2`, `base-3`, … up to [`MAX_SLUG_PROBES`].
pub fn candidates(base: &str) -> impl Iterator<Item = String> + '_ {
    (1..=MAX_SLUG_PROBES).map(move |n| candidate(base, n))
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- slugify -------------------------------------------------------------

    #[test]
    fn slug_from_title() {
        assert_eq!(slugify("audiotracks test file"), "audiotracks-test-file");
    }

    #[test]
    fn slug_keeps_underscores() {
        assert_eq!(slugify("audio_file"), "audio_file");
    }

    #[test]
    fn slug_strips_punctuation_and_collapses_separators() {
        assert_eq!(
            slugify("Steinregen Dubsystem ls. Zongosound - Outernational Fire Dub"),
            "steinregen-dubsystem-ls-zongosound-outernational-fire-dub"
        );
    }

    #[test]
    fn slug_trims_edge_separators() {
        assert_eq!(slugify("  --Hello World__ "), "hello-world");
    }

    #[test]
    fn slug_transliterates_accents() {
        assert_eq!(slugify("Café del Mar"), "cafe-del-mar");
        assert_eq!(slugify("Björk – Jóga"), "bjork-joga");
    }

    #[test]
    fn slug_decomposes_compatibility_forms() {
        assert_eq!(slugify("ﬁre Ⅱ"), "fire-ii");
    }

    #[test]
    fn slug_drops_scripts_without_ascii_base() {
        assert_eq!(slugify("日本の歌"), "");
        assert_eq!(base_slug("日本の歌"), FALLBACK_SLUG);
    }

    // -- base_slug -----------------------------------------------------------

    #[test]
    fn base_slug_truncates_to_max_length() {
        let slug = base_slug("Steinregen Dubsystem ls. Zongosound - Outernational Fire Dub");
        assert_eq!(slug, "steinregen-dubsystem-ls-zongosound-outernational-f");
        assert_eq!(slug.len(), SLUG_MAX_LEN);
    }

    #[test]
    fn base_slug_falls_back_when_empty() {
        assert_eq!(base_slug("!!!"), FALLBACK_SLUG);
        assert_eq!(base_slug(""), FALLBACK_SLUG);
    }

    // -- candidates ----------------------------------------------------------

    #[test]
    fn first_candidate_is_base() {
        assert_eq!(candidate("my-song", 1), "my-song");
    }

    #[test]
    fn later_candidates_get_numeric_suffix() {
        let all: Vec<String> = candidates("my-song").take(3).collect();
        assert_eq!(all, vec!["my-song", "my-song-2", "my-song-3"]);
    }

    #[test]
    fn suffixed_candidate_stays_within_max_length() {
        let base = "a".repeat(SLUG_MAX_LEN);
        let c = candidate(&base, 2);
        assert_eq!(c.len(), SLUG_MAX_LEN);
        assert!(c.ends_with("-2"));

        let c = candidate(&base, 123);
        assert_eq!(c.len(), SLUG_MAX_LEN);
        assert!(c.ends_with("-123"));
    }
}
