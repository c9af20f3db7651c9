use crate::prelude::*;

use std::slice::SliceIndex;
use typed_path::unix::UnixComponent;
use typed_path::UnixPath;

// Paths inside archives: guaranteed relative, contained within the archive
// root, normalized, made of filenames that are valid across
// Windows/macOS/Linux, valid utf8. Always rendered with '/' separators.
#[derive(Debug, PartialEq, Eq, Hash, Clone, DeserializeFromStr, SerializeDisplay)]
pub struct ArchivePath {
    pieces: Vec<String>,
}

// https://learn.microsoft.com/en-us/windows/win32/fileio/naming-a-file
const NAUGHTY_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

fn check_path_piece(piece: &[u8]) -> Result<&str> {
    let piece = std::str::from_utf8(piece)?;
    if piece.is_empty() {
        bail!("path components must be non-empty");
    }
    if piece.contains(NAUGHTY_CHARS) {
        bail!("invalid or non-portable characters in path component {piece:?}");
    }
    if piece.contains(|c: char| c.is_ascii_control()) {
        bail!("invalid or non-portable characters in path component {piece:?}");
    }
    if piece.ends_with('.') || piece.ends_with(' ') {
        bail!("invalid or non-portable path component {piece:?}");
    }
    Ok(piece)
}

impl ArchivePath {
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Every proper ancestor, shortest first. Used to emit directory
    /// entries ahead of their contents.
    pub fn ancestors(&self) -> Vec<ArchivePath> {
        (1..self.pieces.len())
            .map(|end| self.slice(..end))
            .collect()
    }

    pub fn slice<I>(&self, index: I) -> ArchivePath
    where
        I: SliceIndex<[String], Output = [String]>,
    {
        ArchivePath {
            pieces: self.pieces[index].into(),
        }
    }

    /// Relative path from `root` to `path`, validated for the archive.
    pub fn from_relative(root: &Path, path: &Path) -> Result<ArchivePath> {
        let relative = path.strip_prefix(root).with_context(|| {
            format!(
                "{} is outside the source root {}",
                path.display(),
                root.display()
            )
        })?;
        let mut pieces = Vec::new();
        for component in relative.components() {
            match component {
                std::path::Component::Normal(piece) => {
                    let piece = piece
                        .to_str()
                        .ok_or_else(|| anyhow!("non-utf8 path component"))?;
                    pieces.push(check_path_piece(piece.as_bytes())?.to_owned());
                }
                std::path::Component::CurDir => {}
                _ => bail!(
                    "can't archive path {}: not a plain relative path",
                    relative.display()
                ),
            }
        }
        Ok(ArchivePath { pieces })
    }
}

impl Display for ArchivePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pieces.is_empty() {
            write!(f, ".")
        } else {
            write!(f, "{}", self.pieces.as_slice().join("/"))
        }
    }
}

impl TryFrom<&UnixPath> for ArchivePath {
    type Error = anyhow::Error;

    fn try_from(value: &UnixPath) -> Result<Self, Self::Error> {
        let mut new = ArchivePath { pieces: vec![] };
        for c in value.components() {
            match c {
                UnixComponent::RootDir => bail!("expected relative path"),
                UnixComponent::CurDir => (),
                UnixComponent::ParentDir => {
                    if !new.pieces.is_empty() {
                        new.pieces.pop();
                    } else {
                        bail!("path escapes parent directory");
                    }
                }
                UnixComponent::Normal(piece) => {
                    new.pieces.push(check_path_piece(piece)?.into());
                }
            }
        }
        Ok(new)
    }
}

impl TryFrom<&str> for ArchivePath {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        UnixPath::new(value.as_bytes()).try_into()
    }
}

try_from_str_boilerplate!(ArchivePath);

impl PartialOrd for ArchivePath {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ArchivePath {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_string().cmp(&other.to_string())
    }
}
