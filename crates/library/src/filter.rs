//! Target and architecture filters.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use pacstage_extract::{PackageRecord, vercmp};
use regex::Regex;
use std::cmp::Ordering;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::Path;
use std::str::FromStr;
use std::sync::LazyLock;

/// The pseudo-architecture of packages that run anywhere.
pub const ARCH_ANY: &str = "any";

// Operators are listed longest first so `<=` is not read as `<` then `=`.
static TARGET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^<>=\s]+)(?:(<=|>=|<|>|=)(\S+))?$").expect("target regex is valid"));

/// Version comparison attached to a [`Target`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    fn accepts(&self, ordering: Ordering) -> bool {
        match self {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Le => ordering != Ordering::Greater,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Ge => ordering != Ordering::Less,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

/// A package selector: `name`, `name<op>version`, or an archive filename.
///
/// ```
/// use pacstage_library::filter::Target;
///
/// let target: Target = "zlib>=1.3".parse().unwrap();
/// assert_eq!(target.name(), "zlib");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    raw: String,
    name: String,
    constraint: Option<(Operator, String)>,
}

impl Target {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether `record` is selected: either its archive filename is exactly
    /// this target, or its name matches and its version satisfies the
    /// constraint (if any).
    pub fn matches(&self, record: &PackageRecord) -> bool {
        if record.filename.as_deref() == Some(self.raw.as_str()) {
            return true;
        }
        if !record.has_name(&self.name) {
            return false;
        }
        match &self.constraint {
            None => true,
            Some((operator, version)) => operator.accepts(vercmp(record.version(), version)),
        }
    }
}

impl FromStr for Target {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let Some(captures) = TARGET_REGEX.captures(s) else {
            exn::bail!(ErrorKind::InvalidTarget(s.to_string()));
        };
        let constraint = match (captures.get(2), captures.get(3)) {
            (Some(operator), Some(version)) => {
                let operator = match operator.as_str() {
                    "=" => Operator::Eq,
                    "<" => Operator::Lt,
                    "<=" => Operator::Le,
                    ">" => Operator::Gt,
                    _ => Operator::Ge,
                };
                Some((operator, version.as_str().to_string()))
            },
            _ => None,
        };
        Ok(Self {
            raw: s.to_string(),
            name: captures[1].to_string(),
            constraint,
        })
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.constraint {
            None => write!(f, "{}", self.name),
            Some((operator, version)) => write!(f, "{}{}{}", self.name, operator.as_str(), version),
        }
    }
}

/// Whether `record` passes a list of targets. An empty list selects everything.
pub fn matches_targets(targets: &[Target], record: &PackageRecord) -> bool {
    targets.is_empty() || targets.iter().any(|target| target.matches(record))
}

/// Whether `record` is installable on `arch`.
///
/// Packages built for [`ARCH_ANY`], and packages that do not declare an
/// architecture at all, match every filter.
pub fn matches_arch(record: &PackageRecord, arch: &str) -> bool {
    match record.architecture.as_deref() {
        None => true,
        Some(declared) => declared == arch || declared == ARCH_ANY,
    }
}

/// Read targets from a file, one per line. Blank lines are skipped.
pub fn read_targets(path: &Path) -> Result<Vec<Target>> {
    let content = std::fs::read_to_string(path).map_err(|e| ErrorKind::io(e, path))?;
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.parse::<Target>().or_raise(|| ErrorKind::InvalidTarget(path.display().to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pacstage_extract::Field;
    use rstest::rstest;

    fn record(name: &str, version: &str, arch: Option<&str>) -> PackageRecord {
        let mut record = PackageRecord::new(format!("{name}-{version}-{}.pkg.tar.zst", arch.unwrap_or("any")));
        record.set(Field::Name, name.as_bytes()).unwrap();
        record.set(Field::Version, version.as_bytes()).unwrap();
        if let Some(arch) = arch {
            record.set(Field::Architecture, arch.as_bytes()).unwrap();
        }
        record
    }

    #[rstest]
    #[case("zlib", true)]
    #[case("bzip2", false)]
    #[case("zlib=1.3.1-2", true)]
    #[case("zlib=1.3.1", true)]
    #[case("zlib=1.3.0", false)]
    #[case("zlib<1.4", true)]
    #[case("zlib<1.3.1-2", false)]
    #[case("zlib<=1.3.1-2", true)]
    #[case("zlib>1.3", true)]
    #[case("zlib>=2.0", false)]
    #[case("zlib-1.3.1-2-x86_64.pkg.tar.zst", true)]
    #[case("zlib-1.3.1-2-any.pkg.tar.zst", false)]
    fn target_matching(#[case] target: &str, #[case] expected: bool) {
        let target: Target = target.parse().unwrap();
        assert_eq!(target.matches(&record("zlib", "1.3.1-2", Some("x86_64"))), expected);
    }

    #[rstest]
    #[case("zlib>=1.3", "zlib", Some((Operator::Ge, "1.3")))]
    #[case("zlib<=1.3", "zlib", Some((Operator::Le, "1.3")))]
    #[case("lib32-zlib", "lib32-zlib", None)]
    #[case("  zlib  ", "zlib", None)]
    fn target_parsing(#[case] raw: &str, #[case] name: &str, #[case] constraint: Option<(Operator, &str)>) {
        let target: Target = raw.parse().unwrap();
        assert_eq!(target.name(), name);
        assert_eq!(target.constraint.as_ref().map(|(op, v)| (*op, v.as_str())), constraint);
    }

    #[rstest]
    #[case("")]
    #[case("zlib>=")]
    #[case(">=1.0")]
    #[case("zlib 1.0")]
    fn invalid_targets(#[case] raw: &str) {
        let err = raw.parse::<Target>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::InvalidTarget(_)));
    }

    #[test]
    fn target_display_round_trips_constraint() {
        let target: Target = "zlib>=1.3".parse().unwrap();
        assert_eq!(target.to_string(), "zlib>=1.3");
    }

    #[test]
    fn empty_target_list_selects_everything() {
        assert!(matches_targets(&[], &record("zlib", "1.0-1", None)));
        let targets = vec!["bzip2".parse().unwrap()];
        assert!(!matches_targets(&targets, &record("zlib", "1.0-1", None)));
    }

    #[rstest]
    #[case(Some("x86_64"), true)]
    #[case(Some("any"), true)]
    #[case(Some("i686"), false)]
    #[case(None, true)]
    fn arch_matching(#[case] arch: Option<&str>, #[case] expected: bool) {
        assert_eq!(matches_arch(&record("zlib", "1.0-1", arch), "x86_64"), expected);
    }

    #[test]
    fn reads_target_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("core.manifest");
        std::fs::write(&path, "zlib\n\n  bzip2>=1.0  \nxz\n").unwrap();
        let targets = read_targets(&path).unwrap();
        let names: Vec<_> = targets.iter().map(Target::name).collect();
        assert_eq!(names, ["zlib", "bzip2", "xz"]);
    }
}
