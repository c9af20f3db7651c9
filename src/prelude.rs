pub use std::collections::{HashMap, HashSet};
pub use std::convert::{TryFrom, TryInto};
pub use std::fmt::Display;
pub use std::path::{Path, PathBuf};
pub use std::str::FromStr;

pub use anyhow::{anyhow, bail, ensure, Context, Result};
pub use derivative::Derivative;
pub use indexmap::{IndexMap, IndexSet};
pub use once_cell::sync::Lazy;
pub use regex::Regex;
pub use serde::{Deserialize, Serialize};
pub use serde_with::{DeserializeFromStr, SerializeDisplay};
pub use tracing::{debug, trace, warn};
pub use url::Url;

pub use crate::error::{BackendError, SchemaIssue};
pub use crate::try_from_str_boilerplate;
pub use crate::vocab::*;
