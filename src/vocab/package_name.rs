use crate::prelude::*;

#[derive(Debug, Clone, DeserializeFromStr, SerializeDisplay, Derivative)]
#[derivative(Hash, PartialEq, Eq)]
pub struct PackageName {
    #[derivative(Hash = "ignore", PartialEq = "ignore")]
    as_given: String,
    normalized: String,
}

impl PackageName {
    pub fn as_given(&self) -> &str {
        &self.as_given
    }

    /// Canonical form: lowercase, with runs of `-`, `_`, `.` collapsed to a
    /// single `-`.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// The form used inside artifact filenames and the `.dist-info`
    /// directory name: like `normalized()`, but with `_` as the separator so
    /// the name can't collide with the `-` field separators in the filename.
    pub fn filename(&self) -> String {
        self.normalized.replace('-', "_")
    }

    /// The importable module name this distribution most likely ships, used
    /// for default package discovery.
    pub fn module(&self) -> String {
        self.filename()
    }
}

impl Display for PackageName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_given)
    }
}

impl TryFrom<&str> for PackageName {
    type Error = anyhow::Error;

    fn try_from(as_given: &str) -> Result<Self, Self::Error> {
        // https://packaging.python.org/specifications/core-metadata/#name
        static NAME_VALIDATE: Lazy<Regex> = Lazy::new(|| {
            Regex::new(r"(?i-u)^([A-Z0-9]|[A-Z0-9][A-Z0-9._-]*[A-Z0-9])$").unwrap()
        });
        static NAME_NORMALIZE: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"[-_.]+").unwrap());

        if !NAME_VALIDATE.is_match(as_given) {
            bail!("invalid package name {:?}", as_given);
        }
        let as_given = as_given.to_owned();

        let mut normalized = NAME_NORMALIZE.replace_all(&as_given, "-").to_string();
        normalized.make_ascii_lowercase();

        Ok(PackageName {
            as_given,
            normalized,
        })
    }
}

try_from_str_boilerplate!(PackageName);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_packagename_basics() {
        let name1: PackageName = "Foo-Bar-Baz".try_into().unwrap();
        assert_eq!(name1.as_given(), "Foo-Bar-Baz");
        assert_eq!(name1.normalized(), "foo-bar-baz");

        let name2: PackageName = "foo_bar.baz".try_into().unwrap();
        assert_eq!(name2.as_given(), "foo_bar.baz");
        assert_eq!(name2.normalized(), "foo-bar-baz");

        assert_eq!(name1, name2);

        let name3: PackageName = "foo-barbaz".try_into().unwrap();
        assert_ne!(name1, name3);
    }

    #[test]
    fn test_packagename_collapses_separator_runs() {
        let name: PackageName = "foo-_.bar".try_into().unwrap();
        assert_eq!(name.normalized(), "foo-bar");
        assert_eq!(name.filename(), "foo_bar");
    }

    #[test]
    fn test_packagename_validation() {
        let name: Result<PackageName> = "foobar baz".try_into();
        assert!(name.is_err());

        let name: Result<PackageName> = "foobarbaz!".parse();
        assert!(name.is_err());

        let name: Result<PackageName> = "-leading".parse();
        assert!(name.is_err());
    }

    #[test]
    fn test_packagename_hash() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        fn calculate_hash<T: Hash>(t: &T) -> u64 {
            let mut s = DefaultHasher::new();
            t.hash(&mut s);
            s.finish()
        }

        let name1: PackageName = "foo_bar".try_into().unwrap();
        let name2: PackageName = "foo.bar".try_into().unwrap();

        let name_other: PackageName = "foobar".try_into().unwrap();

        assert_eq!(calculate_hash(&name1), calculate_hash(&name2));
        assert_ne!(calculate_hash(&name1), calculate_hash(&name_other));
    }
}
