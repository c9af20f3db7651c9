use crate::prelude::*;

use std::cmp::Ordering;

// The constraint algebra: sets of versions, closed under union,
// intersection, complement, and difference. A set is a sorted list of
// disjoint intervals; each bound is a Version or missing (unbounded), plus
// an inclusive flag. Keeping bounds exactly as the user wrote them (instead
// of rewriting ">=2.13, <3.0" into half-open tricks) is what lets canonical
// serialization round-trip.

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CompareOp {
    LessThanEqual,
    StrictlyLessThan,
    NotEqual,
    Equal,
    GreaterThanEqual,
    StrictlyGreaterThan,
    Compatible,
    ArbitraryEqual,
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use CompareOp::*;
        write!(
            f,
            "{}",
            match self {
                LessThanEqual => "<=",
                StrictlyLessThan => "<",
                NotEqual => "!=",
                Equal => "==",
                GreaterThanEqual => ">=",
                StrictlyGreaterThan => ">",
                Compatible => "~=",
                ArbitraryEqual => "===",
            }
        )
    }
}

impl TryFrom<&str> for CompareOp {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        use CompareOp::*;
        Ok(match value {
            "==" => Equal,
            "!=" => NotEqual,
            "<=" => LessThanEqual,
            "<" => StrictlyLessThan,
            ">=" => GreaterThanEqual,
            ">" => StrictlyGreaterThan,
            "~=" => Compatible,
            "===" => ArbitraryEqual,
            _ => bail!("unrecognized operator: {:?}", value),
        })
    }
}

try_from_str_boilerplate!(CompareOp);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Interval {
    pub lower: Option<Version>,
    pub lower_inclusive: bool,
    pub upper: Option<Version>,
    pub upper_inclusive: bool,
}

fn cmp_lower(a: (Option<&Version>, bool), b: (Option<&Version>, bool)) -> Ordering {
    match (a.0, b.0) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.cmp(y).then(match (a.1, b.1) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        }),
    }
}

fn cmp_upper(a: (Option<&Version>, bool), b: (Option<&Version>, bool)) -> Ordering {
    match (a.0, b.0) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => x.cmp(y).then(match (a.1, b.1) {
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            _ => Ordering::Equal,
        }),
    }
}

impl Interval {
    fn lower_bound(&self) -> (Option<&Version>, bool) {
        (self.lower.as_ref(), self.lower_inclusive)
    }

    fn upper_bound(&self) -> (Option<&Version>, bool) {
        (self.upper.as_ref(), self.upper_inclusive)
    }

    fn is_empty(&self) -> bool {
        match (&self.lower, &self.upper) {
            (Some(l), Some(u)) => match l.cmp(u) {
                Ordering::Greater => true,
                Ordering::Equal => {
                    !(self.lower_inclusive && self.upper_inclusive)
                }
                Ordering::Less => false,
            },
            _ => false,
        }
    }

    /// Whether two canonical-ordered intervals (self before other) overlap
    /// or share an endpoint that at least one side includes, i.e. whether
    /// their union is a single interval.
    fn touches(&self, other: &Interval) -> bool {
        match (&self.upper, &other.lower) {
            (None, _) | (_, None) => true,
            (Some(u), Some(l)) => match l.cmp(u) {
                Ordering::Less => true,
                Ordering::Equal => self.upper_inclusive || other.lower_inclusive,
                Ordering::Greater => false,
            },
        }
    }

    fn intersect(&self, other: &Interval) -> Option<Interval> {
        let (lower, lower_inclusive) =
            if cmp_lower(self.lower_bound(), other.lower_bound())
                == Ordering::Greater
            {
                (self.lower.clone(), self.lower_inclusive)
            } else {
                (other.lower.clone(), other.lower_inclusive)
            };
        let (upper, upper_inclusive) =
            if cmp_upper(self.upper_bound(), other.upper_bound()) == Ordering::Less
            {
                (self.upper.clone(), self.upper_inclusive)
            } else {
                (other.upper.clone(), other.upper_inclusive)
            };
        let candidate = Interval {
            lower,
            lower_inclusive,
            upper,
            upper_inclusive,
        };
        if candidate.is_empty() {
            None
        } else {
            Some(candidate)
        }
    }

    /// Pre-release admission is per-interval: a pre-release bound written
    /// into the constraint opts that interval in.
    fn has_prerelease_bound(&self) -> bool {
        let is_pre = |b: &Option<Version>| matches!(b, Some(v) if v.is_prerelease());
        is_pre(&self.lower) || is_pre(&self.upper)
    }

    fn contains(&self, version: &Version, allow_prereleases: bool) -> bool {
        if let Some(lower) = &self.lower {
            match version.cmp(lower) {
                Ordering::Less => return false,
                Ordering::Equal if !self.lower_inclusive => return false,
                _ => {}
            }
        }
        if let Some(upper) = &self.upper {
            match version.cmp(upper) {
                Ordering::Greater => return false,
                Ordering::Equal if !self.upper_inclusive => return false,
                _ => {}
            }
        }
        if version.is_prerelease()
            && !allow_prereleases
            && !self.has_prerelease_bound()
        {
            return false;
        }
        true
    }
}

impl Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.lower, &self.upper) {
            (None, None) => write!(f, "*"),
            (Some(l), Some(u)) if l == u => write!(f, "=={}", l),
            (Some(l), None) => {
                write!(f, "{}{}", if self.lower_inclusive { ">=" } else { ">" }, l)
            }
            (None, Some(u)) => {
                write!(f, "{}{}", if self.upper_inclusive { "<=" } else { "<" }, u)
            }
            (Some(l), Some(u)) => write!(
                f,
                "{}{},{}{}",
                if self.lower_inclusive { ">=" } else { ">" },
                l,
                if self.upper_inclusive { "<=" } else { "<" },
                u,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct VersionSet {
    intervals: Vec<Interval>,
    allow_prereleases: bool,
}

impl VersionSet {
    pub fn any() -> VersionSet {
        VersionSet {
            intervals: vec![Interval {
                lower: None,
                lower_inclusive: false,
                upper: None,
                upper_inclusive: false,
            }],
            allow_prereleases: false,
        }
    }

    pub fn empty() -> VersionSet {
        VersionSet {
            intervals: vec![],
            allow_prereleases: false,
        }
    }

    pub fn exactly(version: Version) -> VersionSet {
        VersionSet::from_intervals(vec![Interval {
            lower: Some(version.clone()),
            lower_inclusive: true,
            upper: Some(version),
            upper_inclusive: true,
        }])
    }

    pub fn from_intervals(intervals: Vec<Interval>) -> VersionSet {
        VersionSet {
            intervals: canonicalize(intervals),
            allow_prereleases: false,
        }
    }

    pub fn with_prereleases(mut self, allow: bool) -> VersionSet {
        self.allow_prereleases = allow;
        self
    }

    pub fn allows_prereleases(&self) -> bool {
        self.allow_prereleases
            || self.intervals.iter().any(Interval::has_prerelease_bound)
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn is_any(&self) -> bool {
        matches!(
            self.intervals.as_slice(),
            [Interval {
                lower: None,
                upper: None,
                ..
            }]
        )
    }

    pub fn contains(&self, version: &Version) -> bool {
        self.intervals
            .iter()
            .any(|interval| interval.contains(version, self.allow_prereleases))
    }

    pub fn union(&self, other: &VersionSet) -> VersionSet {
        let mut intervals = self.intervals.clone();
        intervals.extend(other.intervals.iter().cloned());
        VersionSet {
            intervals: canonicalize(intervals),
            allow_prereleases: self.allow_prereleases || other.allow_prereleases,
        }
    }

    pub fn intersect(&self, other: &VersionSet) -> VersionSet {
        let mut intervals = Vec::new();
        for a in &self.intervals {
            for b in &other.intervals {
                if let Some(joined) = a.intersect(b) {
                    intervals.push(joined);
                }
            }
        }
        VersionSet {
            intervals: canonicalize(intervals),
            allow_prereleases: self.allow_prereleases || other.allow_prereleases,
        }
    }

    pub fn complement(&self) -> VersionSet {
        let mut out = Vec::new();
        // `gap` is the open lower edge of the next hole; None once an
        // interval has run off to +∞.
        let mut gap: Option<(Option<Version>, bool)> = Some((None, false));
        for interval in &self.intervals {
            if let Some(v) = &interval.lower {
                if let Some((lower, lower_inclusive)) = gap.take() {
                    out.push(Interval {
                        lower,
                        lower_inclusive,
                        upper: Some(v.clone()),
                        upper_inclusive: !interval.lower_inclusive,
                    });
                }
            }
            gap = interval
                .upper
                .as_ref()
                .map(|v| (Some(v.clone()), !interval.upper_inclusive));
        }
        if let Some((lower, lower_inclusive)) = gap {
            out.push(Interval {
                lower,
                lower_inclusive,
                upper: None,
                upper_inclusive: false,
            });
        }
        VersionSet {
            intervals: canonicalize(out),
            allow_prereleases: self.allow_prereleases,
        }
    }

    pub fn difference(&self, other: &VersionSet) -> VersionSet {
        self.intersect(&other.complement())
    }

    /// Does self cover every version other covers?
    pub fn allows_all(&self, other: &VersionSet) -> bool {
        other.difference(self).is_empty()
    }

    /// Do self and other share any version?
    pub fn allows_any(&self, other: &VersionSet) -> bool {
        !self.intersect(other).is_empty()
    }
}

fn canonicalize(mut intervals: Vec<Interval>) -> Vec<Interval> {
    intervals.retain(|interval| !interval.is_empty());
    intervals.sort_by(|a, b| {
        cmp_lower(a.lower_bound(), b.lower_bound())
            .then_with(|| cmp_upper(a.upper_bound(), b.upper_bound()))
    });
    let mut out: Vec<Interval> = Vec::new();
    for interval in intervals {
        match out.last_mut() {
            Some(last) if last.touches(&interval) => {
                if cmp_upper(interval.upper_bound(), last.upper_bound())
                    == Ordering::Greater
                {
                    last.upper = interval.upper;
                    last.upper_inclusive = interval.upper_inclusive;
                }
            }
            _ => out.push(interval),
        }
    }
    out
}

impl Display for VersionSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.intervals.is_empty() {
            return write!(f, "<empty>");
        }
        let mut first = true;
        for interval in &self.intervals {
            if !first {
                write!(f, " || ")?;
            }
            first = false;
            write!(f, "{}", interval)?;
        }
        Ok(())
    }
}

impl CompareOp {
    /// Converts one comparison like ">= 1.2" into intervals. Takes the
    /// operand as a string, not a Version, because == and != accept
    /// wildcards, which are not versions.
    pub fn to_intervals(&self, operand: &str) -> Result<Vec<Interval>> {
        use CompareOp::*;
        let operand = operand.trim();
        if let Some(stem) = operand.strip_suffix(".*") {
            let base: Version = stem
                .try_into()
                .with_context(|| format!("bad wildcard operand {:?}", operand))?;
            if base.0.pre.is_some()
                || base.0.post.is_some()
                || base.0.dev.is_some()
                || base.has_local()
            {
                bail!("wildcard operand {:?} must be a plain release", operand);
            }
            let wildcard = Interval {
                lower: Some(base.clone()),
                lower_inclusive: true,
                upper: Some(base.bump_last()),
                upper_inclusive: false,
            };
            return match self {
                Equal => Ok(vec![wildcard]),
                NotEqual => {
                    Ok(VersionSet::from_intervals(vec![wildcard])
                        .complement()
                        .intervals
                        .clone())
                }
                _ => bail!("can't use wildcard with operator {}", self),
            };
        }
        if operand.contains('*') {
            bail!("misplaced wildcard in {:?}", operand);
        }
        let version: Version = operand.try_into()?;
        Ok(match self {
            Equal => vec![Interval {
                lower: Some(version.clone()),
                lower_inclusive: true,
                upper: Some(version),
                upper_inclusive: true,
            }],
            NotEqual => VersionSet::exactly(version)
                .complement()
                .intervals
                .clone(),
            LessThanEqual => vec![Interval {
                lower: None,
                lower_inclusive: false,
                upper: Some(version),
                upper_inclusive: true,
            }],
            StrictlyLessThan => vec![Interval {
                lower: None,
                lower_inclusive: false,
                upper: Some(version),
                upper_inclusive: false,
            }],
            GreaterThanEqual => vec![Interval {
                lower: Some(version),
                lower_inclusive: true,
                upper: None,
                upper_inclusive: false,
            }],
            StrictlyGreaterThan => vec![Interval {
                lower: Some(version),
                lower_inclusive: false,
                upper: None,
                upper_inclusive: false,
            }],
            Compatible => {
                if version.0.release.len() < 2 {
                    bail!("~= requires a version with at least two segments");
                }
                vec![Interval {
                    lower: Some(version.clone()),
                    lower_inclusive: true,
                    upper: Some(version.next_compatible()),
                    upper_inclusive: false,
                }]
            }
            ArbitraryEqual => {
                bail!("=== does not participate in version set algebra")
            }
        })
    }
}

impl Version {
    fn bump_last(&self) -> Version {
        let mut release = self.0.release.clone();
        *release.last_mut().unwrap() += 1;
        Version(pep440::Version {
            epoch: self.0.epoch,
            release,
            pre: None,
            post: None,
            dev: None,
            local: vec![],
        })
    }
}

// The constraint grammar: PEP 440 operator forms plus the caret/tilde/
// wildcard shortcuts, "," to intersect, "||" to union. Parsed into raw
// items first so error messages can point at the real operand.
#[derive(Debug)]
enum RawItem {
    Caret(String),
    Tilde(String),
    Cmp(CompareOp, String),
    Bare(String),
    Star,
}

peg::parser! {
    grammar constraints() for str {
        rule _() = quiet!{ [' ' | '\t']* }

        rule version_str() -> &'input str
            = $(quiet!{['A'..='Z' | 'a'..='z' | '0'..='9' | '-' | '_' | '.' | '+' | '!' | '*']+})
              / expected!("version")

        rule cmp_op() -> &'input str
            = $("<=" / "<" / "!=" / "==" / ">=" / ">" / "~=")

        rule item() -> RawItem
            = "^" _ v:version_str() { RawItem::Caret(v.into()) }
            / op:cmp_op() _ v:version_str() {?
                Ok(RawItem::Cmp(op.try_into().or(Err("operator"))?, v.into()))
              }
            / "~" _ v:version_str() { RawItem::Tilde(v.into()) }
            / "*" { RawItem::Star }
            / v:version_str() { RawItem::Bare(v.into()) }

        rule group() -> Vec<RawItem>
            = items:(( _ i:item() _ { i }) ++ ",") { items }

        pub rule constraint_set() -> Vec<Vec<RawItem>>
            = groups:(group() ++ "||") { groups }
    }
}

fn item_to_set(item: RawItem) -> Result<VersionSet> {
    Ok(match item {
        RawItem::Star => VersionSet::any(),
        RawItem::Caret(operand) => {
            let version: Version = (&*operand).try_into()?;
            VersionSet::from_intervals(vec![Interval {
                lower: Some(version.clone()),
                lower_inclusive: true,
                upper: Some(version.next_breaking()),
                upper_inclusive: false,
            }])
        }
        RawItem::Tilde(operand) => {
            let version: Version = (&*operand).try_into()?;
            VersionSet::from_intervals(vec![Interval {
                lower: Some(version.clone()),
                lower_inclusive: true,
                upper: Some(version.next_tilde()),
                upper_inclusive: false,
            }])
        }
        RawItem::Cmp(op, operand) => {
            VersionSet::from_intervals(op.to_intervals(&operand)?)
        }
        RawItem::Bare(operand) => {
            if operand.ends_with(".*") {
                VersionSet::from_intervals(
                    CompareOp::Equal.to_intervals(&operand)?,
                )
            } else {
                VersionSet::exactly((&*operand).try_into()?)
            }
        }
    })
}

impl TryFrom<&str> for VersionSet {
    type Error = anyhow::Error;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        if input.contains("===") {
            bail!(
                "arbitrary equality (===) can't be combined with ordered \
                 constraints: {:?}",
                input
            );
        }
        let groups = constraints::constraint_set(input.trim())
            .with_context(|| format!("failed to parse constraint {:?}", input))?;
        let mut result = VersionSet::empty();
        for group in groups {
            let mut combined = VersionSet::any();
            for item in group {
                combined = combined.intersect(&item_to_set(item)?);
            }
            result = result.union(&combined);
        }
        Ok(result)
    }
}

try_from_str_boilerplate!(VersionSet);

/// A registry dependency's constraint. `===` is carried separately from the
/// interval algebra: it matches by literal string comparison and never
/// participates in ordering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum VersionConstraint {
    Set(VersionSet),
    Arbitrary(String),
}

impl VersionConstraint {
    pub fn any() -> VersionConstraint {
        VersionConstraint::Set(VersionSet::any())
    }

    pub fn is_any(&self) -> bool {
        matches!(self, VersionConstraint::Set(s) if s.is_any())
    }

    pub fn contains(&self, version: &Version) -> bool {
        match self {
            VersionConstraint::Set(set) => set.contains(version),
            VersionConstraint::Arbitrary(literal) => {
                version.to_string() == *literal
            }
        }
    }

    pub fn with_prereleases(self, allow: bool) -> VersionConstraint {
        match self {
            VersionConstraint::Set(set) => {
                VersionConstraint::Set(set.with_prereleases(allow))
            }
            other => other,
        }
    }
}

impl Display for VersionConstraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VersionConstraint::Set(set) => write!(f, "{}", set),
            VersionConstraint::Arbitrary(literal) => write!(f, "==={}", literal),
        }
    }
}

impl TryFrom<&str> for VersionConstraint {
    type Error = anyhow::Error;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        let trimmed = input.trim();
        if let Some(rest) = trimmed.strip_prefix("===") {
            if rest.contains(',') || rest.contains("||") {
                bail!(
                    "arbitrary equality (===) must be the only constraint: {:?}",
                    input
                );
            }
            return Ok(VersionConstraint::Arbitrary(rest.trim().to_owned()));
        }
        Ok(VersionConstraint::Set(trimmed.try_into()?))
    }
}

try_from_str_boilerplate!(VersionConstraint);

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_util::from_commented_json;

    fn v(s: &str) -> Version {
        s.try_into().unwrap()
    }

    fn set(s: &str) -> VersionSet {
        s.try_into().unwrap()
    }

    #[test]
    fn test_matching_constraints_table() {
        let examples: Vec<(String, String)> =
            from_commented_json(include_str!("test-data/matching-constraints.txt"));
        for (version_str, constraint_str) in examples {
            let version = v(&version_str);
            let constraint = set(&constraint_str);
            assert!(
                constraint.contains(&version),
                "{} should match {}",
                version_str,
                constraint_str
            );
        }
    }

    #[test]
    fn test_failing_constraints_table() {
        let examples: Vec<(String, String)> =
            from_commented_json(include_str!("test-data/failing-constraints.txt"));
        for (version_str, constraint_str) in examples {
            let version = v(&version_str);
            let constraint = set(&constraint_str);
            assert!(
                !constraint.contains(&version),
                "{} should not match {}",
                version_str,
                constraint_str
            );
        }
    }

    #[test]
    fn test_invalid_constraints_table() {
        let examples: Vec<String> =
            from_commented_json(include_str!("test-data/invalid-constraints.txt"));
        for example in examples {
            let got: Result<VersionSet> = (&*example).try_into();
            assert!(got.is_err(), "{:?} should fail to parse", example);
        }
    }

    #[test]
    fn test_caret() {
        assert_eq!(set("^1.2.3"), set(">=1.2.3, <2.0.0"));
        assert_eq!(set("^0.2.3"), set(">=0.2.3, <0.3.0"));
        assert_eq!(set("^0.0.3"), set(">=0.0.3, <0.0.4"));
        assert_eq!(set("^0.0.0"), set(">=0.0.0, <0.0.1"));
        assert!(!set("^1.2.3").contains(&v("2.0.0rc1")));
        assert!(set("^1.2.3rc1").contains(&v("1.2.3rc2")));
    }

    #[test]
    fn test_tilde_and_compatible() {
        assert_eq!(set("~1.2.3"), set(">=1.2.3, <1.3.0"));
        assert_eq!(set("~1.2"), set(">=1.2, <1.3"));
        assert_eq!(set("~=1.2.3"), set(">=1.2.3, <1.3.0"));
        assert_eq!(set("~=1.2"), set(">=1.2, <2"));
        assert!(VersionSet::try_from("~=1").is_err());
    }

    #[test]
    fn test_wildcard() {
        assert_eq!(set("1.2.*"), set(">=1.2, <1.3"));
        assert_eq!(set("==1.2.*"), set(">=1.2, <1.3"));
        assert_eq!(set("!=1.2.*"), set("<1.2 || >=1.3"));
        assert!(VersionSet::try_from(">=1.2.*").is_err());
    }

    #[test]
    fn test_union_and_intersection_parse() {
        let s = set(">=1.0, <2.0 || >=3.0");
        assert!(s.contains(&v("1.5")));
        assert!(!s.contains(&v("2.5")));
        assert!(s.contains(&v("3.1")));

        // Touching intervals merge.
        assert_eq!(set(">=1.0, <2.0 || >=2.0"), set(">=1.0"));
        // Non-touching ones don't.
        assert_eq!(
            set(">=1.0, <2.0 || >2.0").intervals().len(),
            2,
        );
    }

    #[test]
    fn test_algebra_identities() {
        let samples = [
            set("*"),
            VersionSet::empty(),
            set(">=1.0, <2.0"),
            set("^0.5.1"),
            set("!=1.3"),
            set(">=1.0, <2.0 || >=3.0, <4.0"),
        ];
        let any = VersionSet::any();
        let empty = VersionSet::empty();
        for a in &samples {
            assert_eq!(&a.intersect(&any), a);
            assert_eq!(&a.union(&empty), a);
            assert_eq!(&a.complement().complement(), a);
            assert!(a.intersect(&a.complement()).is_empty());
            assert!(a.union(&a.complement()).is_any());
            assert!(any.allows_all(a));
            assert!(a.allows_all(&empty));
        }

        assert!(set(">=1.0, <2.0").allows_any(&set(">=1.5")));
        assert!(!set("<1.0").allows_any(&set(">=1.5")));
        assert!(set(">=1.0").allows_all(&set(">=1.5, <2.0")));
        assert!(!set(">=1.0, <2.0").allows_all(&set(">=1.5")));
    }

    #[test]
    fn test_contains_distributes_over_union() {
        let a = set(">=1.0, <2.0");
        let b = set(">=1.5, <3.0");
        let u = a.union(&b);
        for version in ["0.9", "1.0", "1.7", "2.5", "3.0", "3.1"] {
            let version = v(version);
            assert_eq!(
                u.contains(&version),
                a.contains(&version) || b.contains(&version),
            );
        }
    }

    #[test]
    fn test_prerelease_admission() {
        let plain = set(">=1.0, <2.0");
        assert!(!plain.contains(&v("1.5rc1")));
        assert!(!plain.contains(&v("1.5.dev3")));
        assert!(plain.clone().with_prereleases(true).contains(&v("1.5rc1")));

        let pre_bound = set(">=1.5b2, <2.0");
        assert!(pre_bound.contains(&v("1.5rc1")));
        assert!(pre_bound.contains(&v("1.6")));

        assert!(set("==1.2.3rc1").contains(&v("1.2.3rc1")));
    }

    #[test]
    fn test_difference() {
        let d = set(">=1.0, <3.0").difference(&set(">=2.0, <2.5"));
        assert!(d.contains(&v("1.5")));
        assert!(!d.contains(&v("2.2")));
        assert!(d.contains(&v("2.7")));
    }

    #[test]
    fn test_display_roundtrip() {
        for s in [
            "*",
            ">=2.13,<3.0",
            "==1.2.3",
            "<1.2 || >=1.3",
            ">1.0",
            "<=4.5",
        ] {
            let parsed = set(s);
            assert_eq!(parsed.to_string(), s);
            assert_eq!(set(&parsed.to_string()), parsed);
        }
        assert_eq!(VersionSet::empty().to_string(), "<empty>");
    }

    #[test]
    fn test_arbitrary_equality() {
        let c: VersionConstraint = "=== 1.0+weird.build".try_into().unwrap();
        assert!(matches!(&c, VersionConstraint::Arbitrary(s) if s == "1.0+weird.build"));
        assert!(c.contains(&v("1.0+weird.build")));
        assert!(!c.contains(&v("1.0")));
        assert!(VersionConstraint::try_from("===1.0, >2").is_err());
        assert!(VersionSet::try_from("===1.0").is_err());

        let normal: VersionConstraint = ">=2.13,<3.0".try_into().unwrap();
        assert_eq!(normal.to_string(), ">=2.13,<3.0");
    }
}
