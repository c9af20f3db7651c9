use crate::prelude::*;

use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

// We lean on the 'pep440' crate for the heavy lifting of parsing and
// normalizing versions, but wrap it in our own type so we can define the
// comparison semantics the constraint algebra needs: "1.0" and "1.0.0" are
// equal (and hash equal) even though their textual forms differ, dev sorts
// below pre sorts below the release sorts below post, and a local version
// sorts just above its public form.
#[derive(Clone, Debug, SerializeDisplay, DeserializeFromStr)]
pub struct Version(pub pep440::Version);

/// Where the suffix-free part of a version sorts relative to its own
/// pre/dev/post variants: 1.0.dev0 < 1.0a1 < 1.0 < 1.0.post0.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum PreKey {
    OnlyDev,
    Pre(u8, u32),
    Release,
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum SegmentKey {
    Min,
    Num(u32),
    Max,
}

// Per the ordering standard, a numeric local segment always sorts above an
// alphanumeric one. Derived enum ordering gives us that for free.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
enum LocalKey {
    Str(String),
    Num(u32),
}

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash)]
struct VersionKey {
    epoch: u32,
    release: Vec<u32>,
    pre: PreKey,
    post: SegmentKey,
    dev: SegmentKey,
    local: Vec<LocalKey>,
}

impl Version {
    fn key(&self) -> VersionKey {
        let v = &self.0;
        let mut release = v.release.clone();
        // Trailing zeroes are significant only for the textual form; for
        // ordering 1.0 and 1.0.0 are the same version.
        while release.len() > 1 && release.last() == Some(&0) {
            release.pop();
        }
        let pre = match (&v.pre, v.post, v.dev) {
            (Some(pre), _, _) => {
                use pep440::PreRelease::*;
                match pre {
                    A(n) => PreKey::Pre(0, *n),
                    B(n) => PreKey::Pre(1, *n),
                    RC(n) => PreKey::Pre(2, *n),
                }
            }
            (None, None, Some(_)) => PreKey::OnlyDev,
            _ => PreKey::Release,
        };
        VersionKey {
            epoch: v.epoch,
            release,
            pre,
            post: match v.post {
                Some(n) => SegmentKey::Num(n),
                None => SegmentKey::Min,
            },
            dev: match v.dev {
                Some(n) => SegmentKey::Num(n),
                None => SegmentKey::Max,
            },
            local: v
                .local
                .iter()
                .map(|piece| match piece {
                    pep440::LocalVersion::NumericComponent(n) => LocalKey::Num(*n),
                    pep440::LocalVersion::StringComponent(s) => {
                        LocalKey::Str(s.clone())
                    }
                })
                .collect(),
        }
    }

    pub fn is_prerelease(&self) -> bool {
        self.0.pre.is_some() || self.0.dev.is_some()
    }

    pub fn has_local(&self) -> bool {
        !self.0.local.is_empty()
    }

    pub fn without_local(&self) -> Version {
        let mut new = self.clone();
        new.0.local = vec![];
        new
    }

    /// Normalized public form plus local segment, with `+` escaped to `_`:
    /// the shape versions take inside artifact filenames.
    pub fn filename(&self) -> String {
        self.to_string().replace('+', "_")
    }

    /// Returns the smallest version that is strictly larger than self.
    pub fn next(&self) -> Version {
        // The suffix ordering rules mean:
        //
        // - You can't attach a .postN after a .devN. So if you have a .devN,
        //   then the next possible version is .dev(N+1)
        //
        // - You can't attach a .postN after a .postN. So if you already have
        //   a .postN, then the next possible value is .post(N+1).
        //
        // - You *can* attach a .postN after anything else. And a .devN after
        //   that. So to get the next possible value, attach a .post0.dev0.
        let mut new = self.without_local();
        if let Some(dev) = &mut new.0.dev {
            *dev += 1;
        } else if let Some(post) = &mut new.0.post {
            *post += 1;
        } else {
            new.0.post = Some(0);
            new.0.dev = Some(0);
        }
        new
    }

    fn plain_release(&self, what: &str) -> Result<&[u32]> {
        if self.0.pre.is_some() || self.0.post.is_some() || self.0.dev.is_some() {
            bail!(
                "{} of {} is ambiguous: it only makes sense for a plain release",
                what,
                self
            );
        }
        Ok(&self.0.release)
    }

    fn bump_at(&self, index: usize) -> Version {
        let mut release: Vec<u32> = self.0.release.clone();
        while release.len() <= index {
            release.push(0);
        }
        release[index] += 1;
        for segment in release.iter_mut().skip(index + 1) {
            *segment = 0;
        }
        Version(pep440::Version {
            epoch: self.0.epoch,
            release,
            pre: None,
            post: None,
            dev: None,
            local: vec![],
        })
    }

    pub fn next_major(&self) -> Result<Version> {
        self.plain_release("next_major")?;
        Ok(self.bump_at(0))
    }

    pub fn next_minor(&self) -> Result<Version> {
        self.plain_release("next_minor")?;
        Ok(self.bump_at(1))
    }

    pub fn next_patch(&self) -> Result<Version> {
        self.plain_release("next_patch")?;
        Ok(self.bump_at(2))
    }

    /// The upper bound of a caret constraint: bump the first non-zero
    /// release segment and zero everything after it. An all-zero release
    /// bumps its last segment, so `^0.0` still spans something.
    pub fn next_breaking(&self) -> Version {
        let release = &self.0.release;
        let index = release
            .iter()
            .position(|&segment| segment != 0)
            .unwrap_or(release.len() - 1);
        self.bump_at(index)
    }

    /// `~=X.Y(.Z)` compatible-release upper bound: bump the second-to-last
    /// given segment, so `~=1.2` spans up to `<2` and `~=1.2.3` up to
    /// `<1.3`.
    pub fn next_compatible(&self) -> Version {
        let index = self.0.release.len().saturating_sub(2);
        self.bump_at(index)
    }

    /// `~X.Y.Z` tilde-shortcut upper bound: bump the minor segment when one
    /// is given, otherwise the major, so `~1.2` spans up to `<1.3`.
    pub fn next_tilde(&self) -> Version {
        let index = 1.min(self.0.release.len().saturating_sub(1));
        self.bump_at(index)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl TryFrom<&str> for Version {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        if trimmed.contains('*') {
            // Wildcards only mean something inside a constraint; a bare
            // "1.2.*" is not a version.
            bail!("wildcard is not valid outside a version constraint: {:?}", value);
        }
        pep440::Version::parse(trimmed)
            .map(Version)
            .ok_or_else(|| anyhow!("failed to parse version {:?}", value))
    }
}

try_from_str_boilerplate!(Version);

impl Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn v(s: &str) -> Version {
        s.try_into().unwrap()
    }

    #[test]
    fn test_parse_normalizes() {
        assert_eq!(v("1.0.0-alpha.1").to_string(), "1.0.0a1");
        assert_eq!(v(" v1.2 ").to_string(), "1.2");
        assert_eq!(v("1.0.0.PREVIEW2").to_string(), "1.0.0rc2");
        assert_eq!(v("2!1.0-rev3+ubuntu-1").to_string(), "2!1.0.post3+ubuntu.1");
        assert!(Version::try_from("1.2.*").is_err());
        assert!(Version::try_from("1.0.").is_err());
        assert!(Version::try_from("").is_err());
    }

    #[test]
    fn test_roundtrip_preserves_fields() {
        for s in [
            "1!2.3.4rc0.post5.dev6+local.7",
            "0.1",
            "1.0.0",
            "2020.12",
            "1.0a0",
        ] {
            let first = v(s);
            let second = v(&first.to_string());
            assert_eq!(first.0, second.0);
        }
    }

    #[test]
    fn test_ordering() {
        let mut versions = vec![
            v("1.0.dev0"),
            v("1.0a1"),
            v("1.0a1.post0"),
            v("1.0b2"),
            v("1.0rc1"),
            v("1.0"),
            v("1.0+abc"),
            v("1.0+abc.5"),
            v("1.0+5"),
            v("1.0.post1.dev0"),
            v("1.0.post1"),
            v("1.1.dev1"),
            v("1!0.5"),
        ];
        let shuffled: Vec<Version> = versions.iter().rev().cloned().collect();
        let mut sorted = shuffled;
        sorted.sort();
        versions.sort();
        assert_eq!(sorted, versions);

        assert!(v("1.0.dev0") < v("1.0a1"));
        assert!(v("1.0a1.dev0") < v("1.0a1"));
        assert!(v("1.0") < v("1.0.post0"));
        assert!(v("1.0") < v("1.0+any.local"));
        assert!(v("1.0+abc") < v("1.0+5"));
    }

    #[test]
    fn test_trailing_zeroes_equal() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        assert_eq!(v("1.0"), v("1.0.0"));
        assert_ne!(v("1.0").to_string(), v("1.0.0").to_string());

        let mut h1 = DefaultHasher::new();
        v("1.0").hash(&mut h1);
        let mut h2 = DefaultHasher::new();
        v("1.0.0").hash(&mut h2);
        assert_eq!(h1.finish(), h2.finish());
    }

    #[test]
    fn test_next() {
        assert_eq!(v("1.0").next(), v("1.0.post0.dev0"));
        assert_eq!(v("1.0.post2").next(), v("1.0.post3"));
        assert_eq!(v("1.0.dev4").next(), v("1.0.dev5"));
        assert!(v("1.0") < v("1.0").next());
        assert!(v("1.0").next() < v("1.0.post0"));
    }

    #[test]
    fn test_release_bumps() {
        assert_eq!(v("1.2.3").next_major().unwrap(), v("2.0.0"));
        assert_eq!(v("1.2.3").next_minor().unwrap(), v("1.3.0"));
        assert_eq!(v("1.2.3").next_patch().unwrap(), v("1.2.4"));
        assert_eq!(v("1").next_minor().unwrap(), v("1.1"));
        assert!(v("1.2.3rc1").next_major().is_err());
        assert!(v("1.2.3.post0").next_patch().is_err());
        assert!(v("1.2.3.dev0").next_minor().is_err());
    }

    #[test]
    fn test_next_breaking() {
        assert_eq!(v("1.2.3").next_breaking(), v("2.0.0"));
        assert_eq!(v("0.2.3").next_breaking(), v("0.3.0"));
        assert_eq!(v("0.0.3").next_breaking(), v("0.0.4"));
        assert_eq!(v("0.0.0").next_breaking(), v("0.0.1"));
        assert_eq!(v("0").next_breaking(), v("1"));
        assert_eq!(v("0.0").next_breaking(), v("0.1"));
    }

    #[test]
    fn test_next_compatible() {
        assert_eq!(v("1.2.3").next_compatible(), v("1.3.0"));
        assert_eq!(v("1.2").next_compatible(), v("2"));
        assert_eq!(v("1").next_compatible(), v("2"));
    }

    #[test]
    fn test_next_tilde() {
        assert_eq!(v("1.2.3").next_tilde(), v("1.3.0"));
        assert_eq!(v("1.2").next_tilde(), v("1.3"));
        assert_eq!(v("1").next_tilde(), v("2"));
    }

    #[test]
    fn test_filename_form() {
        assert_eq!(v("1.0+ubuntu.1").filename(), "1.0_ubuntu.1");
        assert_eq!(v("1.0").filename(), "1.0");
    }
}
