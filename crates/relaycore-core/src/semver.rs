//! Minimal semver parsing and comparison for update-availability checks.
//!
//! This is deliberately permissive: component version strings come from a
//! `VERSION` file or a container image tag, both of which are written by
//! humans and occasionally malformed. Parse failures degrade to a
//! best-effort default rather than propagating, matching the comparisons
//! this type feeds (update-available checks should never crash the
//! orchestrator over a bad tag).

use std::cmp::Ordering;
use std::fmt;

/// Parsed, totally-ordered representation of a component version string.
///
/// Ordering is `(base, is_release, pre)` compared lexicographically in that
/// order: release versions (no prerelease suffix) always sort above any
/// prerelease with the same base, and `.dev*`/`.dirty*` suffixes are
/// stripped before comparison so that `1.0.0.dev7` and `1.0.0` compare
/// equal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Semver {
    base: (u64, u64, u64),
    is_release: bool,
    pre: (String, u64),
}

impl Semver {
    /// Parse a version string per the rules in spec §4.2.
    ///
    /// Splits at the first `-` into base and prerelease. The base is parsed
    /// as `major.minor.patch`; on failure it defaults to `(0, 0, 0)` rather
    /// than erroring. The prerelease (if any) has `.dev*`/`.dirty*` suffixes
    /// stripped, then is split at the last `.` into `(name, number)`, with
    /// the number defaulting to `0` if absent or unparsable.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let (base_str, pre_str) = strip_prefix_and_split(s);

        let base = parse_base(base_str).unwrap_or((0, 0, 0));
        let is_release = pre_str.is_none();
        let pre = pre_str.map(parse_prerelease).unwrap_or_default();

        Self {
            base,
            is_release,
            pre,
        }
    }

    /// Compare two versions, returning -1/0/1 per spec §4.2 (`cmp`).
    #[must_use]
    pub fn cmp_spec(&self, other: &Self) -> i32 {
        match self.cmp(other) {
            Ordering::Less => -1,
            Ordering::Equal => 0,
            Ordering::Greater => 1,
        }
    }

    /// Returns `current >= minimum`; permissive on parse failure of
    /// `current` specifically (spec §4.2: "on parse failure it returns
    /// true"). A malformed `current` can't be meaningfully compared at all,
    /// so it short-circuits to `true` before the tuple comparison runs —
    /// comparing two defaulted `(0,0,0)` tuples would otherwise hide the
    /// failure behind a coincidental `current >= minimum`.
    #[must_use]
    pub fn is_compatible(current: &str, minimum: &str) -> bool {
        if parse_base(strip_prefix_and_split(current).0).is_none() {
            return true;
        }
        Self::parse(current) >= Self::parse(minimum)
    }
}

fn strip_prefix_and_split(s: &str) -> (&str, Option<&str>) {
    let s = s.trim().trim_start_matches('v');
    match s.split_once('-') {
        Some((b, p)) => (b, Some(p)),
        None => (s, None),
    }
}

fn parse_base(s: &str) -> Option<(u64, u64, u64)> {
    let mut parts = s.split('.');
    let major = parts.next().and_then(|p| p.parse().ok());
    let minor = parts.next().and_then(|p| p.parse().ok());
    let patch = parts.next().and_then(|p| p.parse().ok());
    match (major, minor, patch) {
        (Some(ma), Some(mi), Some(pa)) => Some((ma, mi, pa)),
        _ => None,
    }
}

fn parse_prerelease(s: &str) -> (String, u64) {
    let stripped = strip_dev_dirty(s);
    match stripped.rsplit_once('.') {
        Some((name, num)) => (name.to_string(), num.parse().unwrap_or(0)),
        None => (stripped.to_string(), 0),
    }
}

/// Strips a trailing `.dev<digits>` or `.dirty<digits>` suffix, if present.
fn strip_dev_dirty(s: &str) -> &str {
    for marker in [".dev", ".dirty"] {
        if let Some(idx) = s.rfind(marker) {
            let rest = &s[idx + marker.len()..];
            if rest.chars().all(|c| c.is_ascii_digit()) {
                return &s[..idx];
            }
        }
    }
    s
}

impl PartialOrd for Semver {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Semver {
    fn cmp(&self, other: &Self) -> Ordering {
        self.base
            .cmp(&other.base)
            .then_with(|| self.is_release.cmp(&other.is_release))
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl fmt::Display for Semver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.base.0, self.base.1, self.base.2)?;
        if !self.is_release {
            write!(f, "-{}.{}", self.pre.0, self.pre.1)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_beta_ordering() {
        // spec.md §8 scenario 1
        let beta2 = Semver::parse("1.0.0-beta.2");
        let beta3 = Semver::parse("1.0.0-beta.3");
        let release = Semver::parse("1.0.0");
        let dev7 = Semver::parse("1.0.0.dev7");

        assert!(beta2 < beta3);
        assert!(beta3 < release);
        assert_eq!(dev7, release);
    }

    #[test]
    fn release_outranks_prerelease_same_base() {
        assert!(Semver::parse("1.0.0-rc.1") < Semver::parse("1.0.0"));
    }

    #[test]
    fn parse_failure_defaults_to_zero() {
        let v = Semver::parse("not-a-version");
        assert_eq!(v.base, (0, 0, 0));
    }

    #[test]
    fn leading_v_is_stripped() {
        assert_eq!(Semver::parse("v1.2.3"), Semver::parse("1.2.3"));
    }

    #[test]
    fn cmp_spec_returns_sign() {
        let a = Semver::parse("1.0.0");
        let b = Semver::parse("2.0.0");
        assert_eq!(a.cmp_spec(&b), -1);
        assert_eq!(b.cmp_spec(&a), 1);
        assert_eq!(a.cmp_spec(&a), 0);
    }

    #[test]
    fn is_compatible_true_when_current_at_least_minimum() {
        assert!(Semver::is_compatible("1.2.0", "1.0.0"));
        assert!(Semver::is_compatible("1.0.0", "1.0.0"));
        assert!(!Semver::is_compatible("0.9.0", "1.0.0"));
    }

    #[test]
    fn is_compatible_permissive_on_parse_failure() {
        assert!(Semver::is_compatible("garbage", "also garbage"));
    }

    #[test]
    fn is_compatible_permissive_when_only_current_fails_to_parse() {
        // A malformed current against a real, higher minimum would compare
        // as (0,0,0) < 2.0.0 if it fell through to the tuple comparison —
        // the spec requires the parse failure itself to short-circuit to
        // `true` instead.
        assert!(Semver::is_compatible("garbage", "2.0.0"));
    }

    #[test]
    fn display_roundtrips_release() {
        let v = Semver::parse("3.4.5");
        assert_eq!(v.to_string(), "3.4.5");
    }

    #[test]
    fn prerelease_number_defaults_to_zero_without_dot() {
        let v = Semver::parse("1.0.0-beta");
        assert!(v < Semver::parse("1.0.0-beta.1"));
    }
}
