use crate::prelude::*;

// Environment markers: boolean expressions over deployment attributes,
// attached to dependencies. The interesting part is the algebra --
// intersecting two markers and simplifying the result -- which works by
// normalizing to disjunctive normal form and then eliminating redundant or
// contradictory atoms pair-wise. Atoms over the python version attributes
// are projected onto VersionSets so the full interval machinery applies.

pub const PYTHON_VERSION_ATTRIBUTES: &[&str] =
    &["python_version", "python_full_version"];

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerValue {
    Variable(String),
    Literal(String),
}

impl MarkerValue {
    fn eval(&self, env: &HashMap<String, String>) -> Result<String> {
        match self {
            MarkerValue::Variable(name) => env
                .get(name)
                .cloned()
                .ok_or_else(|| anyhow!("no environment marker named {:?}", name)),
            MarkerValue::Literal(s) => Ok(s.clone()),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum MarkerOp {
    Compare(CompareOp),
    In,
    NotIn,
}

impl Display for MarkerOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerOp::Compare(op) => write!(f, "{}", op),
            MarkerOp::In => write!(f, "in"),
            MarkerOp::NotIn => write!(f, "not in"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MarkerAtom {
    pub lhs: MarkerValue,
    pub op: MarkerOp,
    pub rhs: MarkerValue,
}

/// `in`/`not in` test membership when the right side reads as a list of
/// alternatives (separated by `|` or whitespace), and fall back to a
/// substring test otherwise.
fn membership(needle: &str, haystack: &str) -> bool {
    let alternatives: Vec<&str> = haystack
        .split(|c: char| c == '|' || c.is_whitespace())
        .filter(|piece| !piece.is_empty())
        .collect();
    if alternatives.len() > 1 {
        alternatives.contains(&needle)
    } else {
        haystack.contains(needle)
    }
}

fn compare_values(op: CompareOp, lhs: &str, rhs: &str) -> Result<bool> {
    // If both sides can be parsed as versions (or the RHS as a wildcard with
    // a wildcard-accepting op), this is a version comparison; otherwise a
    // plain string comparison.
    if let Ok(lhs_version) = Version::try_from(lhs) {
        if let Ok(intervals) = op.to_intervals(rhs) {
            return Ok(VersionSet::from_intervals(intervals)
                .with_prereleases(true)
                .contains(&lhs_version));
        }
    }
    use CompareOp::*;
    Ok(match op {
        LessThanEqual => lhs <= rhs,
        StrictlyLessThan => lhs < rhs,
        NotEqual => lhs != rhs,
        Equal => lhs == rhs,
        GreaterThanEqual => lhs >= rhs,
        StrictlyGreaterThan => lhs > rhs,
        ArbitraryEqual => lhs == rhs,
        Compatible => bail!("~= requires valid version strings"),
    })
}

impl MarkerAtom {
    fn eval(&self, env: &HashMap<String, String>) -> Result<bool> {
        let lhs = self.lhs.eval(env)?;
        let rhs = self.rhs.eval(env)?;
        match self.op {
            MarkerOp::In => Ok(membership(&lhs, &rhs)),
            MarkerOp::NotIn => Ok(!membership(&lhs, &rhs)),
            MarkerOp::Compare(op) => compare_values(op, &lhs, &rhs),
        }
    }

    fn variable(&self) -> Option<&str> {
        match (&self.lhs, &self.rhs) {
            (MarkerValue::Variable(name), MarkerValue::Literal(_)) => Some(name),
            (MarkerValue::Literal(_), MarkerValue::Variable(name)) => Some(name),
            _ => None,
        }
    }

    fn literal(&self) -> Option<&str> {
        match (&self.lhs, &self.rhs) {
            (MarkerValue::Variable(_), MarkerValue::Literal(s)) => Some(s),
            (MarkerValue::Literal(s), MarkerValue::Variable(_)) => Some(s),
            _ => None,
        }
    }

    fn reversed(&self) -> bool {
        matches!(&self.lhs, MarkerValue::Literal(_))
    }

    pub fn mentions(&self, variable: &str) -> bool {
        self.variable() == Some(variable)
    }

    fn is_extra_equal(&self, name: &Extra) -> bool {
        if !self.mentions("extra") {
            return false;
        }
        if self.op != MarkerOp::Compare(CompareOp::Equal) {
            return false;
        }
        match self.literal().map(Extra::try_from) {
            Some(Ok(extra)) => &extra == name,
            _ => false,
        }
    }

    /// Projects a python-version atom onto a VersionSet. None when the atom
    /// doesn't constrain the python version (or can't be projected).
    fn python_set(&self) -> Option<VersionSet> {
        let variable = self.variable()?;
        if !PYTHON_VERSION_ATTRIBUTES.contains(&variable) {
            return None;
        }
        let literal = self.literal()?;
        match self.op {
            MarkerOp::Compare(op) => {
                let op = if self.reversed() { op.swapped()? } else { op };
                op.to_intervals(literal)
                    .ok()
                    .map(VersionSet::from_intervals)
            }
            MarkerOp::In if !self.reversed() => {
                python_alternatives_set(literal)
            }
            MarkerOp::NotIn if !self.reversed() => {
                python_alternatives_set(literal).map(|s| s.complement())
            }
            _ => None,
        }
    }

    /// Given that `variable` is pinned to `value`, does this atom hold?
    /// None when we can't tell.
    fn eval_pinned(&self, value: &str) -> Option<bool> {
        let literal = self.literal()?;
        let (lhs, rhs) = if self.reversed() {
            (literal, value)
        } else {
            (value, literal)
        };
        match self.op {
            MarkerOp::In => Some(membership(lhs, rhs)),
            MarkerOp::NotIn => Some(!membership(lhs, rhs)),
            MarkerOp::Compare(op) => compare_values(op, lhs, rhs).ok(),
        }
    }
}

fn python_alternatives_set(literal: &str) -> Option<VersionSet> {
    let mut set = VersionSet::empty();
    for piece in literal
        .split(|c: char| c == '|' || c.is_whitespace())
        .filter(|piece| !piece.is_empty())
    {
        let version: Version = piece.try_into().ok()?;
        set = set.union(&VersionSet::exactly(version));
    }
    Some(set)
}

impl CompareOp {
    /// The operator with its operands exchanged: `"3.7" < python_version`
    /// is `python_version > "3.7"`.
    fn swapped(self) -> Option<CompareOp> {
        use CompareOp::*;
        Some(match self {
            Equal => Equal,
            NotEqual => NotEqual,
            LessThanEqual => GreaterThanEqual,
            StrictlyLessThan => StrictlyGreaterThan,
            GreaterThanEqual => LessThanEqual,
            StrictlyGreaterThan => StrictlyLessThan,
            Compatible | ArbitraryEqual => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Marker {
    /// Trivially true: the result of simplifying away every condition.
    Always,
    /// Trivially false: an unsatisfiable marker.
    Never,
    Atom(MarkerAtom),
    And(Vec<Marker>),
    Or(Vec<Marker>),
}

impl Marker {
    pub fn atom(lhs: MarkerValue, op: MarkerOp, rhs: MarkerValue) -> Marker {
        Marker::Atom(MarkerAtom { lhs, op, rhs })
    }

    /// Conjunction with the trivial simplifications applied eagerly.
    pub fn and(children: Vec<Marker>) -> Marker {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Marker::Always => {}
                Marker::Never => return Marker::Never,
                Marker::And(grandchildren) => flat.extend(grandchildren),
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => Marker::Always,
            1 => flat.pop().unwrap(),
            _ => Marker::And(flat),
        }
    }

    /// Disjunction with the trivial simplifications applied eagerly.
    pub fn or(children: Vec<Marker>) -> Marker {
        let mut flat = Vec::new();
        for child in children {
            match child {
                Marker::Never => {}
                Marker::Always => return Marker::Always,
                Marker::Or(grandchildren) => flat.extend(grandchildren),
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => Marker::Never,
            1 => flat.pop().unwrap(),
            _ => Marker::Or(flat),
        }
    }

    pub fn evaluate(&self, env: &HashMap<String, String>) -> Result<bool> {
        Ok(match self {
            Marker::Always => true,
            Marker::Never => false,
            Marker::Atom(atom) => atom.eval(env)?,
            Marker::And(children) => {
                for child in children {
                    if !child.evaluate(env)? {
                        return Ok(false);
                    }
                }
                true
            }
            Marker::Or(children) => {
                for child in children {
                    if child.evaluate(env)? {
                        return Ok(true);
                    }
                }
                false
            }
        })
    }

    /// A simplified marker equivalent to `self AND other`.
    pub fn intersect(&self, other: &Marker) -> Marker {
        Marker::and(vec![self.clone(), other.clone()]).simplify()
    }

    /// A simplified marker equivalent to `self OR other`.
    pub fn union(&self, other: &Marker) -> Marker {
        Marker::or(vec![self.clone(), other.clone()]).simplify()
    }

    /// DNF normalization plus pair-wise redundancy elimination.
    pub fn simplify(&self) -> Marker {
        let mut clauses = Vec::new();
        for clause in self.dnf() {
            match simplify_clause(clause) {
                Some(atoms) if atoms.is_empty() => return Marker::Always,
                Some(atoms) => {
                    let clause = Marker::and(
                        atoms.into_iter().map(Marker::Atom).collect(),
                    );
                    if !clauses.contains(&clause) {
                        clauses.push(clause);
                    }
                }
                None => {}
            }
        }
        Marker::or(clauses)
    }

    fn dnf(&self) -> Vec<Vec<MarkerAtom>> {
        match self {
            Marker::Always => vec![vec![]],
            Marker::Never => vec![],
            Marker::Atom(atom) => vec![vec![atom.clone()]],
            Marker::Or(children) => {
                children.iter().flat_map(|child| child.dnf()).collect()
            }
            Marker::And(children) => {
                let mut clauses: Vec<Vec<MarkerAtom>> = vec![vec![]];
                for child in children {
                    let child_clauses = child.dnf();
                    let mut next = Vec::new();
                    for clause in &clauses {
                        for child_clause in &child_clauses {
                            let mut joined = clause.clone();
                            joined.extend(child_clause.iter().cloned());
                            next.push(joined);
                        }
                    }
                    clauses = next;
                }
                clauses
            }
        }
    }

    /// Removes `extra == name` conjuncts, leaving the residual condition.
    /// Used when bucketing a dependency under Provides-Extra, so the extra
    /// test isn't emitted twice.
    pub fn exclude_extra(&self, name: &Extra) -> Marker {
        self.drop_conjuncts(&|atom| atom.is_extra_equal(name))
    }

    /// Removes every conjunct over the `extra` attribute.
    pub fn without_extras(&self) -> Marker {
        self.drop_conjuncts(&|atom| atom.mentions("extra"))
    }

    fn drop_conjuncts(&self, doomed: &dyn Fn(&MarkerAtom) -> bool) -> Marker {
        match self {
            Marker::Atom(atom) if doomed(atom) => Marker::Always,
            Marker::And(children) => Marker::and(
                children
                    .iter()
                    .map(|child| child.drop_conjuncts(doomed))
                    .collect(),
            ),
            // Inside a disjunction the atom isn't a conjunct; removal only
            // applies within nested conjunctions.
            Marker::Or(children) => Marker::or(
                children
                    .iter()
                    .map(|child| match child {
                        Marker::And(_) => child.drop_conjuncts(doomed),
                        other => other.clone(),
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// Projects the marker onto the python version axis: the set of python
    /// versions for which this marker can hold.
    pub fn only_python(&self) -> VersionSet {
        match self {
            Marker::Always => VersionSet::any(),
            Marker::Never => VersionSet::empty(),
            Marker::Atom(atom) => {
                atom.python_set().unwrap_or_else(VersionSet::any)
            }
            Marker::And(children) => children
                .iter()
                .fold(VersionSet::any(), |acc, child| {
                    acc.intersect(&child.only_python())
                }),
            Marker::Or(children) => children
                .iter()
                .fold(VersionSet::empty(), |acc, child| {
                    acc.union(&child.only_python())
                }),
        }
    }

    /// The reverse projection: a marker holding exactly on the given python
    /// version set. Used at serialization boundaries.
    pub fn for_python_set(set: &VersionSet) -> Marker {
        if set.is_any() {
            return Marker::Always;
        }
        if set.is_empty() {
            return Marker::Never;
        }
        // python_version only carries two release segments; anything finer
        // needs python_full_version.
        let needs_full = set.intervals().iter().any(|interval| {
            [&interval.lower, &interval.upper].into_iter().any(|bound| {
                matches!(bound, Some(v) if v.0.release.len() > 2)
            })
        });
        let attribute = if needs_full {
            "python_full_version"
        } else {
            "python_version"
        };
        let atom = |op: CompareOp, version: &Version| {
            Marker::atom(
                MarkerValue::Variable(attribute.to_owned()),
                MarkerOp::Compare(op),
                MarkerValue::Literal(version.to_string()),
            )
        };
        let mut clauses = Vec::new();
        for interval in set.intervals() {
            let mut conjuncts = Vec::new();
            match (&interval.lower, &interval.upper) {
                (Some(l), Some(u)) if l == u => {
                    conjuncts.push(atom(CompareOp::Equal, l));
                }
                (lower, upper) => {
                    if let Some(l) = lower {
                        let op = if interval.lower_inclusive {
                            CompareOp::GreaterThanEqual
                        } else {
                            CompareOp::StrictlyGreaterThan
                        };
                        conjuncts.push(atom(op, l));
                    }
                    if let Some(u) = upper {
                        let op = if interval.upper_inclusive {
                            CompareOp::LessThanEqual
                        } else {
                            CompareOp::StrictlyLessThan
                        };
                        conjuncts.push(atom(op, u));
                    }
                }
            }
            clauses.push(Marker::and(conjuncts));
        }
        Marker::or(clauses)
    }
}

/// Simplify one DNF clause. None means the clause is contradictory.
fn simplify_clause(atoms: Vec<MarkerAtom>) -> Option<Vec<MarkerAtom>> {
    let mut python: IndexMap<&str, Vec<MarkerAtom>> = IndexMap::new();
    let mut rest: Vec<MarkerAtom> = Vec::new();
    for atom in &atoms {
        match atom.variable() {
            Some(variable)
                if PYTHON_VERSION_ATTRIBUTES.contains(&variable)
                    && atom.python_set().is_some() =>
            {
                let key = PYTHON_VERSION_ATTRIBUTES
                    .iter()
                    .copied()
                    .find(|a| *a == variable)
                    .unwrap();
                python.entry(key).or_default().push(atom.clone());
            }
            _ => {
                if !rest.contains(atom) {
                    rest.push(atom.clone());
                }
            }
        }
    }

    let mut out: Vec<MarkerAtom> = Vec::new();

    // Python-version atoms: intersect as ranges. When the result collapses
    // to a single interval we re-render it; otherwise the original atoms
    // were already as tight as we can say.
    for (_, group) in &python {
        let combined = group
            .iter()
            .fold(VersionSet::any(), |acc, atom| {
                acc.intersect(&atom.python_set().unwrap())
            });
        if combined.is_empty() {
            return None;
        }
        if combined.is_any() {
            continue;
        }
        if combined.intervals().len() == 1 {
            match Marker::for_python_set(&combined) {
                Marker::Atom(atom) => out.push(atom),
                Marker::And(children) => {
                    for child in children {
                        if let Marker::Atom(atom) = child {
                            out.push(atom);
                        }
                    }
                }
                _ => {}
            }
        } else {
            out.extend(group.iter().cloned());
        }
    }

    // Everything else: equality pins decide the other atoms on the same
    // attribute. `extra` is exempt from contradiction detection because a
    // conjunction of extras tests is how multi-extra dependencies look.
    let mut keep = vec![true; rest.len()];
    for i in 0..rest.len() {
        let pin = &rest[i];
        if pin.op != MarkerOp::Compare(CompareOp::Equal) || pin.reversed() {
            continue;
        }
        let Some(variable) = pin.variable() else {
            continue;
        };
        if variable == "extra" {
            continue;
        }
        let Some(value) = pin.literal() else {
            continue;
        };
        for j in 0..rest.len() {
            if i == j || !keep[j] || rest[j].variable() != Some(variable) {
                continue;
            }
            match rest[j].eval_pinned(value) {
                Some(true) => keep[j] = false,
                Some(false) => return None,
                None => {}
            }
        }
    }
    out.extend(
        rest.into_iter()
            .zip(keep)
            .filter_map(|(atom, kept)| kept.then_some(atom)),
    );
    Some(out)
}

fn quote(literal: &str) -> String {
    if literal.contains('"') {
        format!("'{}'", literal)
    } else {
        format!("\"{}\"", literal)
    }
}

impl Display for MarkerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MarkerValue::Variable(name) => write!(f, "{}", name),
            MarkerValue::Literal(s) => write!(f, "{}", quote(s)),
        }
    }
}

impl Display for Marker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Marker::Always => Ok(()),
            Marker::Never => write!(f, "<unsatisfiable>"),
            Marker::Atom(atom) => {
                write!(f, "{} {} {}", atom.lhs, atom.op, atom.rhs)
            }
            Marker::And(children) => {
                let mut first = true;
                for child in children {
                    if !first {
                        write!(f, " and ")?;
                    }
                    first = false;
                    match child {
                        Marker::Or(_) => write!(f, "({})", child)?,
                        _ => write!(f, "{}", child)?,
                    }
                }
                Ok(())
            }
            Marker::Or(children) => {
                let mut first = true;
                for child in children {
                    if !first {
                        write!(f, " or ")?;
                    }
                    first = false;
                    write!(f, "{}", child)?;
                }
                Ok(())
            }
        }
    }
}

impl TryFrom<&str> for Marker {
    type Error = anyhow::Error;

    fn try_from(input: &str) -> Result<Self, Self::Error> {
        super::reqparse::marker(input, ParseExtra::Allowed)
            .with_context(|| format!("failed to parse marker {:?}", input))
    }
}

try_from_str_boilerplate!(Marker);

#[cfg(test)]
mod test {
    use super::*;

    fn m(s: &str) -> Marker {
        s.try_into().unwrap()
    }

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_evaluate() {
        let environment = env(&[
            ("python_version", "3.9"),
            ("python_full_version", "3.9.1"),
            ("sys_platform", "linux"),
            ("os_name", "posix"),
        ]);
        assert!(m("python_version >= '3.8'").evaluate(&environment).unwrap());
        assert!(!m("python_version < '3.9'").evaluate(&environment).unwrap());
        assert!(m("sys_platform == 'linux' and os_name == 'posix'")
            .evaluate(&environment)
            .unwrap());
        assert!(m("sys_platform == 'win32' or os_name == 'posix'")
            .evaluate(&environment)
            .unwrap());
        assert!(m("'3.7' < python_version").evaluate(&environment).unwrap());
        // version comparison, not string comparison
        assert!(m("python_full_version > '3.9.0'")
            .evaluate(&environment)
            .unwrap());
        assert!(!m("python_full_version > '3.10'")
            .evaluate(&environment)
            .unwrap());
    }

    #[test]
    fn test_evaluate_membership() {
        let environment = env(&[("sys_platform", "linux")]);
        assert!(m("sys_platform in 'linux|darwin'")
            .evaluate(&environment)
            .unwrap());
        assert!(m("sys_platform in 'linux darwin'")
            .evaluate(&environment)
            .unwrap());
        assert!(!m("sys_platform in 'darwin win32'")
            .evaluate(&environment)
            .unwrap());
        // single alternative: substring semantics
        assert!(m("sys_platform in 'linux2'").evaluate(&environment).unwrap());
        assert!(m("sys_platform not in 'darwin|win32'")
            .evaluate(&environment)
            .unwrap());
        // unknown attribute is an error, not false
        assert!(m("python_version >= '3.8'").evaluate(&environment).is_err());
    }

    #[test]
    fn test_trivial_simplifications() {
        let atom = m("os_name == 'posix'");
        assert_eq!(Marker::and(vec![Marker::Always, atom.clone()]), atom);
        assert_eq!(Marker::or(vec![Marker::Never, atom.clone()]), atom);
        assert_eq!(
            Marker::or(vec![Marker::Always, atom.clone()]),
            Marker::Always
        );
        assert_eq!(Marker::and(vec![Marker::Never, atom.clone()]), Marker::Never);
        assert_eq!(atom.intersect(&Marker::Always), atom);
    }

    #[test]
    fn test_intersect_python_ranges() {
        let joined = m("python_version >= '3.8' and python_version < '4.0'")
            .intersect(&m("python_version < '3.10'"));
        assert_eq!(
            joined,
            m("python_version >= '3.8' and python_version < '3.10'")
        );
    }

    #[test]
    fn test_intersect_contradiction() {
        assert_eq!(
            m("python_version < '3.0'").intersect(&m("python_version >= '3.6'")),
            Marker::Never
        );
        assert_eq!(
            m("sys_platform == 'linux'").intersect(&m("sys_platform == 'darwin'")),
            Marker::Never
        );
    }

    #[test]
    fn test_intersect_redundancy() {
        assert_eq!(
            m("sys_platform == 'linux'").intersect(&m("sys_platform != 'win32'")),
            m("sys_platform == 'linux'")
        );
        let extras = m("extra == 'tls'").intersect(&m("extra == 'http2'"));
        assert_eq!(extras, m("extra == 'tls' and extra == 'http2'"));
    }

    #[test]
    fn test_union() {
        let a = m("sys_platform == 'linux'");
        let b = m("sys_platform == 'darwin'");
        assert_eq!(
            a.union(&b),
            m("sys_platform == 'linux' or sys_platform == 'darwin'")
        );
        assert_eq!(a.union(&Marker::Never), a);
        assert_eq!(a.union(&Marker::Always), Marker::Always);
    }

    #[test]
    fn test_intersect_agrees_with_evaluate() {
        let m1 = m("python_version >= '3.8' and sys_platform == 'linux'");
        let m2 = m("python_version < '3.11'");
        let joined = m1.intersect(&m2);
        for python in ["3.7", "3.8", "3.10", "3.11"] {
            for platform in ["linux", "darwin"] {
                let environment = env(&[
                    ("python_version", python),
                    ("sys_platform", platform),
                ]);
                assert_eq!(
                    joined.evaluate(&environment).unwrap(),
                    m1.evaluate(&environment).unwrap()
                        && m2.evaluate(&environment).unwrap(),
                );
            }
        }
    }

    #[test]
    fn test_only_python() {
        let set = m("python_version >= '3.9' and python_version < '4.0'")
            .only_python();
        assert_eq!(set, ">=3.9, <4.0".try_into().unwrap());

        let either = m("python_version >= '3.10' or sys_platform == 'linux'")
            .only_python();
        assert!(either.is_any());

        let narrow =
            m("python_full_version >= '3.9.2' and os_name == 'posix'")
                .only_python();
        assert_eq!(narrow, ">=3.9.2".try_into().unwrap());
    }

    #[test]
    fn test_for_python_set_roundtrip() {
        let set: VersionSet = ">=3.9, <4.0".try_into().unwrap();
        let marker = Marker::for_python_set(&set);
        assert_eq!(
            marker,
            m("python_version >= '3.9' and python_version < '4.0'")
        );
        assert_eq!(marker.only_python(), set);

        let fine: VersionSet = ">=3.9.2".try_into().unwrap();
        assert_eq!(
            Marker::for_python_set(&fine),
            m("python_full_version >= '3.9.2'")
        );
    }

    #[test]
    fn test_exclude_extra() {
        let marker = m("extra == 'tls' and sys_platform == 'linux'");
        let tls: Extra = "tls".try_into().unwrap();
        assert_eq!(marker.exclude_extra(&tls), m("sys_platform == 'linux'"));

        let only = m("extra == 'tls'");
        assert_eq!(only.exclude_extra(&tls), Marker::Always);

        let other: Extra = "http2".try_into().unwrap();
        assert_eq!(only.exclude_extra(&other), only);

        // normalization applies to the comparison
        let spelled = m("extra == 'TLS'");
        assert_eq!(spelled.exclude_extra(&tls), Marker::Always);
    }

    #[test]
    fn test_without_extras() {
        let marker =
            m("extra == 'tls' and extra == 'http2' and os_name == 'posix'");
        assert_eq!(marker.without_extras(), m("os_name == 'posix'"));
    }

    #[test]
    fn test_display_roundtrip() {
        for s in [
            "python_version >= \"3.8\"",
            "sys_platform == \"linux\" and os_name == \"posix\"",
            "python_version >= \"3.8\" and (sys_platform == \"linux\" or sys_platform == \"darwin\")",
            "extra == \"tls\"",
            "platform_machine not in \"x86_64 aarch64\"",
        ] {
            let parsed = m(s);
            assert_eq!(parsed.to_string(), s);
            assert_eq!(m(&parsed.to_string()), parsed);
        }
    }
}
