//! Parsed-structure tree.
//!
//! Generated code describes each structure of a format as a type implementing
//! [`KStruct`]. [`Node::read`] drives it: it resolves the byte order once,
//! dispatches to the matching read routine and hands back a populated
//! [`Node`]. A node never exists half-read: if any read fails the partially
//! filled value is dropped and the error propagates to the caller.
//!
//! Parent and root links are borrow-scoped. While a node reads, its
//! [`ReadCtx`] lends it the enclosing structures (as populated so far); the
//! links are not kept once the node is built, so the tree holds no cycles and
//! drops leaves before their parents.

use std::any::type_name;
use std::fmt;
use std::ops::{Deref, Range};
use std::rc::Rc;

use log::debug;

use crate::errors::{KsError, Result};
use crate::stream::KStream;

/// Byte order of a node's multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Endian {
    Le,
    Be,
}

impl fmt::Display for Endian {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endian::Le => f.write_str("little-endian"),
            Endian::Be => f.write_str("big-endian"),
        }
    }
}

/// Byte order requested when a node is constructed: fixed, or left for the
/// node to decide while it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EndianMode {
    #[default]
    Unresolved,
    Le,
    Be,
}

impl EndianMode {
    pub fn resolved(self) -> Option<Endian> {
        match self {
            EndianMode::Unresolved => None,
            EndianMode::Le => Some(Endian::Le),
            EndianMode::Be => Some(Endian::Be),
        }
    }
}

impl From<Endian> for EndianMode {
    fn from(value: Endian) -> Self {
        match value {
            Endian::Le => EndianMode::Le,
            Endian::Be => EndianMode::Be,
        }
    }
}

/// A structure of a binary format, read field by field from a [`KStream`].
///
/// `Parent` and `Root` name the types of the enclosing structure and of the
/// tree root. A root type typically uses `()` as its parent and itself as its
/// root.
pub trait KStruct<'a>: Default {
    type Parent;
    type Root;

    /// Decides the byte order when the node was constructed with
    /// [`EndianMode::Unresolved`], usually by reading a discriminant.
    fn resolve_endian(
        &mut self,
        ctx: &ReadCtx<'_, 'a, Self::Parent, Self::Root>,
    ) -> Result<Endian> {
        let _ = ctx;
        Err(KsError::EndianUndecided {
            type_name: type_name::<Self>(),
        })
    }

    /// Reads the fields in declaration order, little-endian.
    fn read_le(&mut self, ctx: &ReadCtx<'_, 'a, Self::Parent, Self::Root>) -> Result<()> {
        let _ = ctx;
        Err(KsError::EndianNotSupported {
            type_name: type_name::<Self>(),
            endian: Endian::Le,
        })
    }

    /// Reads the fields in declaration order, big-endian.
    fn read_be(&mut self, ctx: &ReadCtx<'_, 'a, Self::Parent, Self::Root>) -> Result<()> {
        let _ = ctx;
        Err(KsError::EndianNotSupported {
            type_name: type_name::<Self>(),
            endian: Endian::Be,
        })
    }
}

/// What a node can see while it reads: the shared stream and read-only
/// links to its parent and to the tree root.
pub struct ReadCtx<'n, 'a, P, R> {
    io: &'n Rc<KStream<'a>>,
    parent: Option<&'n P>,
    root: Option<&'n R>,
}

impl<'n, 'a, P, R> ReadCtx<'n, 'a, P, R> {
    pub fn io(&self) -> &'n KStream<'a> {
        self.io
    }

    /// The enclosing structure; `None` for the tree root.
    pub fn parent(&self) -> Option<&'n P> {
        self.parent
    }

    /// The tree root; `None` while the root itself is reading.
    pub fn root(&self) -> Option<&'n R> {
        self.root
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Reads a child structure from the same stream, starting at the
    /// current position.
    pub fn read_child<C>(
        &self,
        parent: &C::Parent,
        root: Option<&C::Root>,
        mode: EndianMode,
    ) -> Result<Node<'a, C>>
    where
        C: KStruct<'a>,
    {
        Node::read(Rc::clone(self.io), Some(parent), root, mode)
    }

    /// Reads a child structure from its own stream, e.g. a
    /// [`KStream::substream`] holding the bytes of a sized field.
    pub fn read_child_from<C>(
        &self,
        io: Rc<KStream<'a>>,
        parent: &C::Parent,
        root: Option<&C::Root>,
        mode: EndianMode,
    ) -> Result<Node<'a, C>>
    where
        C: KStruct<'a>,
    {
        Node::read(io, Some(parent), root, mode)
    }
}

/// A populated structure: its fields plus the stream it was read from, the
/// byte order it was read with and the stream range it covered.
pub struct Node<'a, T> {
    io: Rc<KStream<'a>>,
    endian: Endian,
    span: Range<u64>,
    inner: T,
}

impl<'a, T: KStruct<'a>> Node<'a, T> {
    /// Reads the root of a tree.
    pub fn read_root(io: Rc<KStream<'a>>, mode: EndianMode) -> Result<Self> {
        Self::read(io, None, None, mode)
    }

    /// Constructs a node and runs its read. Every child the node builds
    /// finishes reading before this returns.
    pub fn read(
        io: Rc<KStream<'a>>,
        parent: Option<&T::Parent>,
        root: Option<&T::Root>,
        mode: EndianMode,
    ) -> Result<Self> {
        let start = io.pos();
        let mut value = T::default();
        let ctx = ReadCtx {
            io: &io,
            parent,
            root,
        };

        let endian = match mode.resolved() {
            Some(endian) => endian,
            None => value.resolve_endian(&ctx)?,
        };

        match endian {
            Endian::Le => value.read_le(&ctx)?,
            Endian::Be => value.read_be(&ctx)?,
        }

        let end = io.pos();
        debug!(
            "Read {} ({}) over {}..{}",
            type_name::<T>(),
            endian,
            start,
            end
        );

        Ok(Node {
            io,
            endian,
            span: start..end,
            inner: value,
        })
    }
}

impl<'a, T> Node<'a, T> {
    /// The stream this node was read from.
    pub fn io(&self) -> &Rc<KStream<'a>> {
        &self.io
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    /// Stream positions at the start and at the end of the node's read.
    pub fn span(&self) -> Range<u64> {
        self.span.clone()
    }

    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T> Deref for Node<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: fmt::Debug> fmt::Debug for Node<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("endian", &self.endian)
            .field("span", &self.span)
            .field("value", &self.inner)
            .finish()
    }
}
