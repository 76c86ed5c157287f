//! Resource URIs
//!
//! A resource URI names exactly one primitive instance:
//!
//! | Scheme | Form | Backing resource |
//! |--------|------|------------------|
//! | Latch | `latch:<container>/<id>` | Row `<id>` in table `<container>` |
//! | BlobCell | `blobcell:<container>/<id>` | Blob `<id>` in container `<container>` |
//! | Queue | `queue:<container>` | Broker queue `<container>` |
//! | ResultCell | `resultcell:<container>/` | Broker queue `<container>` |
//!
//! Constructing a URI never performs I/O and never checks that the referent
//! exists. Parsing a string only checks the shape. Containers must not
//! contain `/`; a URI built from parts with such a container is rejected by
//! [`ResourceUri::expect_scheme`] at first use.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four addressable primitive kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Scheme {
    /// Distributed monotonic counter
    Latch,
    /// Write-once content blob
    BlobCell,
    /// Reference-passing message queue
    Queue,
    /// Single-result future
    ResultCell,
}

impl Scheme {
    /// All schemes (for iteration)
    pub const ALL: [Scheme; 4] = [
        Scheme::Latch,
        Scheme::BlobCell,
        Scheme::Queue,
        Scheme::ResultCell,
    ];

    /// URI prefix (without the trailing colon)
    pub const fn id(&self) -> &'static str {
        match self {
            Scheme::Latch => "latch",
            Scheme::BlobCell => "blobcell",
            Scheme::Queue => "queue",
            Scheme::ResultCell => "resultcell",
        }
    }

    /// Parse from URI prefix
    pub fn from_id(id: &str) -> Option<Self> {
        match id {
            "latch" => Some(Scheme::Latch),
            "blobcell" => Some(Scheme::BlobCell),
            "queue" => Some(Scheme::Queue),
            "resultcell" => Some(Scheme::ResultCell),
            _ => None,
        }
    }

    /// Whether URIs of this scheme carry an `/id` segment
    pub const fn has_id(&self) -> bool {
        matches!(self, Scheme::Latch | Scheme::BlobCell)
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// Opaque handle `scheme:container[/id]` for one primitive instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceUri {
    scheme: Scheme,
    container: String,
    id: Option<String>,
}

impl ResourceUri {
    /// Build a URI from parts. Performs no validation and no I/O.
    pub fn new(scheme: Scheme, container: impl Into<String>, id: Option<String>) -> Self {
        Self {
            scheme,
            container: container.into(),
            id,
        }
    }

    /// `latch:<container>/<id>`
    pub fn latch(container: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(Scheme::Latch, container, Some(id.into()))
    }

    /// `blobcell:<container>/<id>`
    pub fn blob_cell(container: impl Into<String>, id: impl Into<String>) -> Self {
        Self::new(Scheme::BlobCell, container, Some(id.into()))
    }

    /// `queue:<container>`
    pub fn queue(container: impl Into<String>) -> Self {
        Self::new(Scheme::Queue, container, None)
    }

    /// `resultcell:<container>/`
    pub fn result_cell(container: impl Into<String>) -> Self {
        Self::new(Scheme::ResultCell, container, None)
    }

    /// Scheme of this URI
    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Container segment
    pub fn container(&self) -> &str {
        &self.container
    }

    /// Id segment, if any
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Fail with [`Error::InvalidUri`] unless this URI uses `scheme`.
    pub fn expect_scheme(&self, scheme: Scheme) -> Result<&Self> {
        if self.scheme != scheme {
            return Err(Error::InvalidUri(format!(
                "expected {} uri, got {}",
                scheme, self
            )));
        }
        if self.container.is_empty() {
            return Err(Error::InvalidUri(format!("empty container in {}", self)));
        }
        // The string form splits container from id at the first '/'.
        if self.container.contains('/') {
            return Err(Error::InvalidUri(format!(
                "container '{}' contains '/' in {}",
                self.container, self
            )));
        }
        Ok(self)
    }

    /// Resolve to `(container, id)` for schemes that address a single item.
    pub fn item(&self, scheme: Scheme) -> Result<(&str, &str)> {
        self.expect_scheme(scheme)?;
        match self.id.as_deref() {
            Some(id) if !id.is_empty() => Ok((&self.container, id)),
            _ => Err(Error::InvalidUri(format!("missing id in {}", self))),
        }
    }
}

impl fmt::Display for ResourceUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.scheme, &self.id) {
            (Scheme::Queue, _) => write!(f, "queue:{}", self.container),
            (Scheme::ResultCell, _) => write!(f, "resultcell:{}/", self.container),
            (scheme, Some(id)) => write!(f, "{}:{}/{}", scheme, self.container, id),
            (scheme, None) => write!(f, "{}:{}", scheme, self.container),
        }
    }
}

impl FromStr for ResourceUri {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (prefix, rest) = s
            .split_once(':')
            .ok_or_else(|| Error::InvalidUri(format!("missing scheme in '{}'", s)))?;
        let scheme = Scheme::from_id(prefix)
            .ok_or_else(|| Error::InvalidUri(format!("unknown scheme '{}'", prefix)))?;

        let (container, id) = match rest.split_once('/') {
            Some((container, id)) => (container, (!id.is_empty()).then(|| id.to_string())),
            None => (rest, None),
        };
        if container.is_empty() {
            return Err(Error::InvalidUri(format!("empty container in '{}'", s)));
        }
        if scheme.has_id() && id.is_none() {
            return Err(Error::InvalidUri(format!("missing id in '{}'", s)));
        }
        if !scheme.has_id() && id.is_some() {
            return Err(Error::InvalidUri(format!(
                "{} uris do not carry an id: '{}'",
                scheme, s
            )));
        }

        Ok(Self::new(scheme, container, id))
    }
}

impl TryFrom<String> for ResourceUri {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ResourceUri> for String {
    fn from(uri: ResourceUri) -> Self {
        uri.to_string()
    }
}
