//! Slug assignment.
//!
//! Derives a URL-safe, unique identifier for a post from its title. The
//! storage-level unique constraint stays the authority; this only picks a
//! candidate that is free in the snapshot it was given.

use std::collections::HashMap;

use uuid::Uuid;

/// Upper bound on slug length, matching the `posts.slug` column.
pub const MAX_SLUG_LEN: usize = 255;

/// Used when a title has no sluggable characters at all.
pub const FALLBACK_SLUG: &str = "untitled";

/// Longest numeric suffix we can ever append: `-` plus the digits of `u64::MAX`.
const MAX_SUFFIX_LEN: usize = 21;

/// Normalize a title into a slug base: lowercase ASCII, runs of other
/// characters collapsed into a single `-`, no leading or trailing `-`.
pub fn normalize(title: &str) -> String {
    let slugged = slug::slugify(title);
    let base = truncate(&slugged, MAX_SLUG_LEN);
    if base.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        base.to_string()
    }
}

/// Prefix shared by every candidate [`assign_slug`] can produce for `base`.
///
/// Repositories are queried with this to fetch the relevant existing slugs.
pub fn lookup_prefix(base: &str) -> &str {
    truncate(base, MAX_SLUG_LEN - MAX_SUFFIX_LEN)
}

/// Pick a slug for `title` that is not taken in `existing`.
///
/// `existing` maps live slugs to the id of the post holding them. A slug held
/// by `current_id` counts as free, so re-saving a post keeps its slug.
/// Collisions are resolved with the smallest free `-N` suffix.
pub fn assign_slug(
    title: &str,
    existing: &HashMap<String, Uuid>,
    current_id: Option<Uuid>,
) -> String {
    let base = normalize(title);
    let taken = |candidate: &str| {
        existing
            .get(candidate)
            .is_some_and(|owner| Some(*owner) != current_id)
    };

    if !taken(&base) {
        return base;
    }

    let mut n: u64 = 1;
    loop {
        let suffix = format!("-{n}");
        let candidate = format!("{}{}", truncate(&base, MAX_SLUG_LEN - suffix.len()), suffix);
        if !taken(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

/// Cut a slug to at most `max` bytes without leaving a trailing separator.
/// Slugs are ASCII, so byte indices are char boundaries.
fn truncate(slug: &str, max: usize) -> &str {
    if slug.len() <= max {
        slug
    } else {
        slug[..max].trim_end_matches('-')
    }
}
