// Extras names get the same canonicalization as package names: lowercase,
// runs of [-_.]+ collapsed to a single '-'. That's what modern installers
// compare against, so it's what we store.

use crate::prelude::*;

#[derive(
    Debug, Clone, DeserializeFromStr, SerializeDisplay, Hash, PartialEq, Eq,
)]
pub struct Extra(PackageName);

impl Extra {
    pub fn as_given(&self) -> &str {
        self.0.as_given()
    }

    pub fn normalized(&self) -> &str {
        self.0.normalized()
    }
}

impl Display for Extra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.normalized())
    }
}

impl TryFrom<&str> for Extra {
    type Error = anyhow::Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        let p: PackageName = s
            .try_into()
            .with_context(|| format!("invalid extras name {:?}", s))?;
        Ok(Extra(p))
    }
}

try_from_str_boilerplate!(Extra);

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_extra_normalization() {
        let e: Extra = "Some_Extra.name".try_into().unwrap();
        assert_eq!(e.normalized(), "some-extra-name");
        assert_eq!(e.to_string(), "some-extra-name");

        let e2: Extra = "some-extra_name".try_into().unwrap();
        assert_eq!(e, e2);
    }
}
