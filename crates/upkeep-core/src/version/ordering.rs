//! Version-aware ordering of tag names.

use std::cmp::Ordering;

/// Parse a tag as semver, accepting a `v`/`V` prefix and missing
/// minor/patch components (`v2` is `2.0.0`, `1.4` is `1.4.0`).
pub fn parse_tag(tag: &str) -> Option<semver::Version> {
    let trimmed = tag.trim();
    let bare = trimmed
        .strip_prefix('v')
        .or_else(|| trimmed.strip_prefix('V'))
        .unwrap_or(trimmed);

    if let Ok(version) = semver::Version::parse(bare) {
        return Some(version);
    }

    let split_at = bare.find(['-', '+']).unwrap_or(bare.len());
    let (core, rest) = bare.split_at(split_at);
    let parts: Vec<&str> = core.split('.').collect();
    if parts.is_empty()
        || parts.len() > 3
        || parts
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    let mut padded = parts.join(".");
    for _ in parts.len()..3 {
        padded.push_str(".0");
    }
    padded.push_str(rest);
    semver::Version::parse(&padded).ok()
}

/// Total order over tag names: semver tags rank above everything else and
/// compare by precedence; ties and non-semver names compare lexically.
pub fn compare_tags(a: &str, b: &str) -> Ordering {
    match (parse_tag(a), parse_tag(b)) {
        (Some(va), Some(vb)) => va.cmp(&vb).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Greater,
        (None, Some(_)) => Ordering::Less,
        (None, None) => a.cmp(b),
    }
}

/// Highest tag under [`compare_tags`].
pub fn highest_tag<I, S>(tags: I) -> Option<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter()
        .map(|t| t.as_ref().to_string())
        .max_by(|a, b| compare_tags(a, b))
}
