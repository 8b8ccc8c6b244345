//! Version constraint evaluation
//!
//! Supports semver range expressions:
//! - `1.2.3`, `=1.2.3` - exact match (`1.2` and `1` match the whole minor/major)
//! - `!=1.2.3` - anything but the given version
//! - `>=1.2.3`, `>1.2.3`, `<=1.2.3`, `<1.2.3` - comparison operators
//! - `^1.2.3` - compatible with version (>=1.2.3 <2.0.0)
//! - `~1.2.3`, `~>1.2.3` - approximately equivalent (>=1.2.3 <1.3.0)
//! - `1.2.x`, `1.x`, `*` - wildcards
//! - `1.0.0 - 2.0.0` - inclusive hyphen range
//! - `>=1.0.0 <2.0.0`, `>=1.0.0, <2.0.0` - AND (space or comma separated)
//! - `^1.0.0 || ^2.0.0` - OR
//!
//! A leading `v` is accepted on constraints and versions. Pre-release
//! versions only satisfy a range when one of its comparators names a
//! pre-release of the same `major.minor.patch`.

use std::fmt;
use std::str::FromStr;

use semver::Version;

use crate::version::error::ConstraintError;
use crate::version::semver::parse_version;

/// A parsed constraint expression
#[derive(Debug, Clone)]
pub struct Constraint {
    expr: String,
    /// OR of AND-groups
    alternatives: Vec<Vec<Comparator>>,
}

impl Constraint {
    /// Parse a constraint expression
    pub fn parse(expr: &str) -> Result<Self, ConstraintError> {
        let invalid = || ConstraintError::InvalidConstraint(expr.to_string());

        if expr.trim().is_empty() {
            return Err(invalid());
        }

        let alternatives = expr
            .split("||")
            .map(|alt| parse_and_group(alt).ok_or_else(invalid))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            expr: expr.trim().to_string(),
            alternatives,
        })
    }

    /// Check whether a version string satisfies this constraint
    pub fn satisfies(&self, version: &str) -> Result<bool, ConstraintError> {
        let parsed = parse_version(version)
            .ok_or_else(|| ConstraintError::InvalidVersion(version.to_string()))?;
        Ok(self.matches(&parsed))
    }

    /// Check whether a parsed version satisfies this constraint
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives
            .iter()
            .any(|group| group_matches(group, version))
    }

    pub fn as_str(&self) -> &str {
        &self.expr
    }
}

impl FromStr for Constraint {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expr)
    }
}

fn group_matches(group: &[Comparator], version: &Version) -> bool {
    if !version.pre.is_empty() && !group.iter().any(|c| c.allows_prerelease_of(version)) {
        return false;
    }
    group.iter().all(|c| c.matches(version))
}

/// Parse one `||` alternative into its AND-ed comparators
fn parse_and_group(spec: &str) -> Option<Vec<Comparator>> {
    let spec = spec.replace(',', " ");
    let tokens: Vec<&str> = spec.split_whitespace().collect();
    if tokens.is_empty() {
        return None;
    }

    let mut comparators = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        // Operator separated from its version by whitespace, e.g. ">= 1.0.0"
        let token = if is_operator(tokens[i]) {
            let version = tokens.get(i + 1)?;
            i += 2;
            format!("{}{}", tokens[i - 2], version)
        } else {
            i += 1;
            tokens[i - 1].to_string()
        };

        if tokens.get(i) == Some(&"-") {
            let to = tokens.get(i + 1)?;
            i += 2;
            comparators.push(Comparator::Hyphen {
                from: PartialVersion::parse(&token)?,
                to: PartialVersion::parse(to)?,
            });
            continue;
        }

        comparators.push(Comparator::parse(&token)?);
    }

    Some(comparators)
}

fn is_operator(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| matches!(c, '<' | '>' | '=' | '!' | '~' | '^'))
}

/// A version with possibly omitted components (`1`, `1.2`, `1.x`, `*`)
#[derive(Debug, Clone, PartialEq, Eq)]
struct PartialVersion {
    version: Version,
    /// Number of components given explicitly (0 for `*`)
    parts: usize,
}

impl PartialVersion {
    fn parse(spec: &str) -> Option<Self> {
        let spec = spec.trim();
        let spec = spec
            .strip_prefix('v')
            .or_else(|| spec.strip_prefix('V'))
            .unwrap_or(spec);
        if spec.is_empty() {
            return None;
        }

        let core_end = spec.find(['-', '+']).unwrap_or(spec.len());
        let core = &spec[..core_end];
        let has_suffix = core_end < spec.len();

        let components: Vec<&str> = core.split('.').collect();
        if components.len() > 3 {
            return None;
        }

        let parts = components.iter().take_while(|c| !is_wildcard(c)).count();
        if components[parts..].iter().any(|c| !is_wildcard(c)) {
            return None;
        }

        if parts == 3 {
            return Some(Self {
                version: Version::parse(spec).ok()?,
                parts,
            });
        }

        if has_suffix {
            return None;
        }

        let mut numbers = [0u64; 3];
        for (slot, component) in numbers.iter_mut().zip(&components[..parts]) {
            *slot = component.parse().ok()?;
        }

        Some(Self {
            version: Version::new(numbers[0], numbers[1], numbers[2]),
            parts,
        })
    }

    /// Exclusive upper bound of the versions this partial version covers,
    /// `None` when unbounded
    fn upper(&self) -> Option<Version> {
        let v = &self.version;
        match self.parts {
            0 => None,
            1 => next_major(v),
            2 => next_minor(v),
            _ => next_patch(v),
        }
    }

    /// True when `version` falls inside the range this partial version covers
    fn covers(&self, version: &Version) -> bool {
        if self.parts == 3 {
            return version == &self.version;
        }
        version >= &self.version && self.upper().is_none_or(|upper| version < &upper)
    }
}

fn next_major(v: &Version) -> Option<Version> {
    Some(Version::new(v.major.checked_add(1)?, 0, 0))
}

fn next_minor(v: &Version) -> Option<Version> {
    Some(Version::new(v.major, v.minor.checked_add(1)?, 0))
}

fn next_patch(v: &Version) -> Option<Version> {
    Some(Version::new(v.major, v.minor, v.patch.checked_add(1)?))
}

fn is_wildcard(component: &str) -> bool {
    matches!(component, "x" | "X" | "*")
}

/// A single range comparator
#[derive(Debug, Clone)]
enum Comparator {
    Exact(PartialVersion),
    NotEqual(PartialVersion),
    Gt(PartialVersion),
    Gte(PartialVersion),
    Lt(PartialVersion),
    Lte(PartialVersion),
    /// ^1.2.3 means >=1.2.3 <2.0.0 (or special cases for 0.x)
    Caret(PartialVersion),
    /// ~1.2.3 means >=1.2.3 <1.3.0, ~1 means >=1.0.0 <2.0.0
    Tilde(PartialVersion),
    Hyphen {
        from: PartialVersion,
        to: PartialVersion,
    },
}

impl Comparator {
    fn parse(spec: &str) -> Option<Self> {
        const OPERATORS: &[(&str, fn(PartialVersion) -> Comparator)] = &[
            (">=", Comparator::Gte),
            ("<=", Comparator::Lte),
            ("!=", Comparator::NotEqual),
            ("~>", Comparator::Tilde),
            (">", Comparator::Gt),
            ("<", Comparator::Lt),
            ("=", Comparator::Exact),
            ("^", Comparator::Caret),
            ("~", Comparator::Tilde),
        ];

        for (op, build) in OPERATORS {
            if let Some(rest) = spec.strip_prefix(op) {
                return PartialVersion::parse(rest).map(*build);
            }
        }

        PartialVersion::parse(spec).map(Comparator::Exact)
    }

    fn matches(&self, version: &Version) -> bool {
        match self {
            Comparator::Exact(p) => p.covers(version),
            Comparator::NotEqual(p) => !p.covers(version),
            Comparator::Gt(p) => match p.parts {
                0 => false,
                3 => version > &p.version,
                _ => p.upper().is_some_and(|upper| version >= &upper),
            },
            Comparator::Gte(p) => version >= &p.version,
            Comparator::Lt(p) => p.parts > 0 && version < &p.version,
            Comparator::Lte(p) => match p.parts {
                0 => true,
                3 => version <= &p.version,
                _ => p.upper().is_none_or(|upper| version < &upper),
            },
            Comparator::Caret(p) => {
                let v = &p.version;
                let upper = if p.parts == 0 {
                    return true;
                } else if v.major > 0 || p.parts == 1 {
                    next_major(v)
                } else if v.minor > 0 || p.parts == 2 {
                    next_minor(v)
                } else {
                    next_patch(v)
                };
                version >= v && upper.is_none_or(|upper| version < &upper)
            }
            Comparator::Tilde(p) => {
                let v = &p.version;
                let upper = match p.parts {
                    0 => return true,
                    1 => next_major(v),
                    _ => next_minor(v),
                };
                version >= v && upper.is_none_or(|upper| version < &upper)
            }
            Comparator::Hyphen { from, to } => {
                let below_to = match to.parts {
                    3 => version <= &to.version,
                    _ => to.upper().is_none_or(|upper| version < &upper),
                };
                version >= &from.version && below_to
            }
        }
    }

    /// True when this comparator names a pre-release of the same core version
    fn allows_prerelease_of(&self, version: &Version) -> bool {
        let same_core = |p: &PartialVersion| {
            !p.version.pre.is_empty()
                && p.version.major == version.major
                && p.version.minor == version.minor
                && p.version.patch == version.patch
        };
        match self {
            Comparator::Exact(p)
            | Comparator::NotEqual(p)
            | Comparator::Gt(p)
            | Comparator::Gte(p)
            | Comparator::Lt(p)
            | Comparator::Lte(p)
            | Comparator::Caret(p)
            | Comparator::Tilde(p) => same_core(p),
            Comparator::Hyphen { from, to } => same_core(from) || same_core(to),
        }
    }
}
