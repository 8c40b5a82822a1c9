// GNU Affero General Public License v3.0 or later (see LICENSE or https://www.gnu.org/licenses/agpl.txt)
//! Version comparison and classification for OpenShift releases and RHCOS builds
//!
//! OpenShift release versions (e.g. "4.12.10", "4.13.0-rc.2") and RHCOS build
//! identifiers (e.g. "4.12.3", "413.92.202305021736-0") are both ordered by
//! comparing their dotted segments as integers, never lexically.

use std::cmp::Ordering;

/// Compare two version strings segment by segment
///
/// The base version (everything before the first '-') is compared numerically,
/// one dotted segment at a time, with missing segments treated as zero.
/// A version with a pre-release suffix sorts before the same base version
/// without one, and two suffixes are compared with the same segment rules
/// (numeric where both segments are numbers, lexical otherwise).
///
/// # Examples
/// ```
/// use std::cmp::Ordering;
/// use ocpcat::version::compare_versions;
/// assert_eq!(compare_versions("4.12.9", "4.12.10"), Ordering::Less);
/// assert_eq!(compare_versions("4.2", "4.10"), Ordering::Less);
/// assert_eq!(compare_versions("4.13.0-rc.2", "4.13.0"), Ordering::Less);
/// ```
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let (a_base, a_suffix) = split_suffix(a);
    let (b_base, b_suffix) = split_suffix(b);

    let a_parts = numeric_segments(a_base);
    let b_parts = numeric_segments(b_base);

    let max_len = a_parts.len().max(b_parts.len());
    for i in 0..max_len {
        let a_part = a_parts.get(i).unwrap_or(&0);
        let b_part = b_parts.get(i).unwrap_or(&0);
        match a_part.cmp(b_part) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    match (a_suffix, b_suffix) {
        (Some(_), None) => Ordering::Less,    // 4.13.0-rc.1 < 4.13.0
        (None, Some(_)) => Ordering::Greater, // 4.13.0 > 4.13.0-rc.1
        (Some(a_suffix), Some(b_suffix)) => compare_suffixes(a_suffix, b_suffix),
        (None, None) => a.cmp(b),
    }
}

fn split_suffix(version: &str) -> (&str, Option<&str>) {
    match version.split_once('-') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (version, None),
    }
}

fn numeric_segments(base: &str) -> Vec<u64> {
    base.split('.')
        .filter_map(|part| part.trim().parse::<u64>().ok())
        .collect()
}

fn compare_suffixes(a: &str, b: &str) -> Ordering {
    let mut a_parts = a.split(['.', '-']);
    let mut b_parts = b.split(['.', '-']);
    loop {
        match (a_parts.next(), b_parts.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(a_part), Some(b_part)) => {
                let ordering = match (a_part.parse::<u64>(), b_part.parse::<u64>()) {
                    (Ok(a_num), Ok(b_num)) => a_num.cmp(&b_num),
                    _ => a_part.cmp(b_part),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// Extract "major.minor" from a full version string
///
/// Splits on both '.' and '-' so that release versions, nightly versions and
/// RHCOS build identifiers are handled the same way. Both components must be
/// numeric.
///
/// # Examples
/// ```
/// use ocpcat::version::extract_major_minor;
/// assert_eq!(extract_major_minor("4.12.0-0.nightly-multi-2022-09-08-131900"), Some("4.12".to_string()));
/// assert_eq!(extract_major_minor("4.13.0-rc.2"), Some("4.13".to_string()));
/// assert_eq!(extract_major_minor("latest"), None);
/// ```
pub fn extract_major_minor(version: &str) -> Option<String> {
    let mut parts = version.split(['.', '-']);
    let major = parts.next()?;
    let minor = parts.next()?;
    if is_number(major) && is_number(minor) {
        Some(format!("{major}.{minor}"))
    } else {
        None
    }
}

fn is_number(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_digit())
}

/// Check whether a string is a well-formed catalog key ("major.minor")
pub fn is_minor_key(key: &str) -> bool {
    key.split_once('.')
        .is_some_and(|(major, minor)| is_number(major) && is_number(minor))
}

/// Check whether a version belongs to the given minor release line
pub fn matches_minor(version: &str, minor_key: &str) -> bool {
    extract_major_minor(version).is_some_and(|mm| mm == minor_key)
}

/// Classify an RHCOS build identifier as a pre-release build
///
/// Feature-candidate and release-candidate builds are pre-releases; nightly
/// builds are not, even when they carry one of those markers.
///
/// # Examples
/// ```
/// use ocpcat::version::is_pre_release;
/// assert!(is_pre_release("4.13.0-rc.0"));
/// assert!(is_pre_release("4.11.0-fc.3"));
/// assert!(!is_pre_release("4.12.2"));
/// assert!(!is_pre_release("4.12.0-rc.0-nightly"));
/// ```
pub fn is_pre_release(build_id: &str) -> bool {
    (build_id.contains("-fc") || build_id.contains("-rc")) && !build_id.contains("nightly")
}

/// Return the greatest version of an iterator under `compare_versions`
pub fn latest<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions.into_iter().max_by(|a, b| compare_versions(a, b))
}
