use std::collections::HashMap;
use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign, Not};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Tags that match everything and are never assigned a bit.
pub const WILDCARDS: [&str; 2] = ["all", "*"];

/// Returns true for tags that match every entity.
pub fn is_wildcard(tag: &str) -> bool {
    WILDCARDS.contains(&tag)
}

/// A collision filter bitmask: one bit per registered tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagMask(pub u32);

impl TagMask {
    /// Number of distinct tags a mask can represent.
    pub const BITS: u32 = u32::BITS;
    /// Matches everything.
    pub const ALL: Self = Self(u32::MAX);
    /// Matches nothing.
    pub const NONE: Self = Self(0);

    /// The raw bits, as handed to a physics engine's filter group/mask.
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Returns true if the two masks share at least one bit.
    pub fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Returns true if bit `index` is set.
    pub fn has_bit(self, index: u32) -> bool {
        index < Self::BITS && self.0 & (1 << index) != 0
    }

    /// The broadphase filter rule: two objects may collide only when each
    /// one's group is accepted by the other's mask.
    pub fn accepts(group_a: Self, mask_a: Self, group_b: Self, mask_b: Self) -> bool {
        group_a.intersects(mask_b) && group_b.intersects(mask_a)
    }
}

impl Default for TagMask {
    fn default() -> Self {
        Self::ALL
    }
}

impl fmt::Display for TagMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl Not for TagMask {
    type Output = Self;

    fn not(self) -> Self {
        Self(!self.0)
    }
}

impl BitOr for TagMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for TagMask {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for TagMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

/// Assigns stable bit positions to tag strings.
///
/// Indices are handed out on first sight, starting at 0 and never reused, so
/// a mask computed early stays valid for as long as the registry lives. One
/// registry is shared by everything that builds collision filters.
#[derive(Debug, Clone, Default)]
pub struct TagRegistry {
    indices: HashMap<String, u32>,
    order: Vec<String>,
}

impl TagRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The bit index of a tag, if it has been seen.
    pub fn index_of(&self, tag: &str) -> Option<u32> {
        self.indices.get(tag).copied()
    }

    /// Number of registered tags.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns true if no tag has been registered yet.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered tags with their bit index, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> + '_ {
        self.order
            .iter()
            .enumerate()
            .map(|(i, tag)| (tag.as_str(), i as u32))
    }

    /// Look up a tag's index, assigning the next free one on first sight.
    pub fn register(&mut self, tag: &str) -> CoreResult<u32> {
        if let Some(index) = self.indices.get(tag) {
            return Ok(*index);
        }
        let index = self.order.len() as u32;
        if index >= TagMask::BITS {
            return Err(CoreError::TagOverflow {
                tag: tag.to_string(),
                capacity: TagMask::BITS,
            });
        }
        log::debug!("registered tag \"{tag}\" at bit {index}");
        self.indices.insert(tag.to_string(), index);
        self.order.push(tag.to_string());
        Ok(index)
    }

    /// Compute the bitmask for a tag set.
    ///
    /// An empty or all-wildcard set matches everything. When every tag is
    /// negated (`!tag`) the stripped tags are combined and the result is
    /// inverted. Wildcards and empty strings contribute no bits.
    pub fn bits<S: AsRef<str>>(&mut self, tags: &[S]) -> CoreResult<TagMask> {
        if tags
            .iter()
            .all(|t| t.as_ref().is_empty() || is_wildcard(t.as_ref()))
        {
            return Ok(TagMask::ALL);
        }

        let negated = tags.iter().all(|t| t.as_ref().starts_with('!'));
        let mut mask = TagMask::NONE;
        for tag in tags {
            let tag = tag.as_ref();
            let tag = if negated { &tag[1..] } else { tag };
            if tag.is_empty() || is_wildcard(tag) {
                continue;
            }
            let index = self.register(tag)?;
            mask |= TagMask(1 << index);
        }

        Ok(if negated { !mask } else { mask })
    }

    /// Compute a mask from a whitespace-separated tag string.
    pub fn bits_of(&mut self, tags: &str) -> CoreResult<TagMask> {
        let tags: Vec<&str> = tags.split_whitespace().collect();
        self.bits(&tags)
    }
}
