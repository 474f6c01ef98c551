//! Descriptor types recovered from a project container.
//!
//! The container is treated as opaque bytes. A descriptor records where a
//! label lives inside it so the label can be read back or overwritten in
//! place. Track names and expression-map references are kept as distinct
//! types so one can never be handed to code expecting the other.

use serde::Serialize;
use std::ops::Range;

/// Which kind of field a descriptor was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DescriptorKind {
    /// A tagged `Name` field carrying a track name.
    Name,
    /// An expression-map reference following the MIDI input marker pair.
    Reference,
}

impl std::fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorKind::Name => write!(f, "name"),
            DescriptorKind::Reference => write!(f, "reference"),
        }
    }
}

/// A track name found in the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameDescriptor {
    /// Decoded label text.
    pub label: String,
    /// Offset of the first label byte.
    pub offset: usize,
    /// Exact number of bytes the label occupies.
    pub len: usize,
    /// Offset of the tag that introduced the field. Used for proximity.
    pub record_offset: usize,
}

impl NameDescriptor {
    /// Byte range occupied by the label.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// An expression-map reference found in the container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceDescriptor {
    /// Decoded label text (the map's internal name).
    pub label: String,
    /// Offset of the first label byte.
    pub offset: usize,
    /// Exact number of bytes the label occupies.
    pub len: usize,
    /// Offset of the first marker of the pair. Used for proximity.
    pub record_offset: usize,
}

impl ReferenceDescriptor {
    /// Byte range occupied by the label.
    pub fn range(&self) -> Range<usize> {
        self.offset..self.offset + self.len
    }
}

/// Either kind of descriptor, for callers walking the container in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Descriptor {
    Name(NameDescriptor),
    Reference(ReferenceDescriptor),
}

impl Descriptor {
    pub fn kind(&self) -> DescriptorKind {
        match self {
            Descriptor::Name(_) => DescriptorKind::Name,
            Descriptor::Reference(_) => DescriptorKind::Reference,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Descriptor::Name(d) => &d.label,
            Descriptor::Reference(d) => &d.label,
        }
    }

    pub fn offset(&self) -> usize {
        match self {
            Descriptor::Name(d) => d.offset,
            Descriptor::Reference(d) => d.offset,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Descriptor::Name(d) => d.len,
            Descriptor::Reference(d) => d.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_name(&self) -> Option<&NameDescriptor> {
        match self {
            Descriptor::Name(d) => Some(d),
            Descriptor::Reference(_) => None,
        }
    }

    pub fn as_reference(&self) -> Option<&ReferenceDescriptor> {
        match self {
            Descriptor::Reference(d) => Some(d),
            Descriptor::Name(_) => None,
        }
    }
}

impl From<NameDescriptor> for Descriptor {
    fn from(d: NameDescriptor) -> Self {
        Descriptor::Name(d)
    }
}

impl From<ReferenceDescriptor> for Descriptor {
    fn from(d: ReferenceDescriptor) -> Self {
        Descriptor::Reference(d)
    }
}
