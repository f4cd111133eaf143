//! # kaitai-runtime
//!
//! Runtime support for parsers generated from declarative binary format
//! descriptions.
//!
//! [`KStream`] reads typed values from a memory- or file-backed byte source:
//! fixed-width integers and floats in either byte order, MSB-first bit
//! fields with carry-over between reads, sized and terminated byte arrays,
//! and fixed magic contents. [`process`] holds the byte transforms applied
//! to fields after reading (XOR, rotation, zlib, padding strip...).
//!
//! Generated structures implement [`KStruct`] and are read into a tree of
//! [`Node`]s that share one stream. A structure may fix its byte order or
//! decide it while reading.
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//!
//! use kaitai_runtime::{EndianMode, KStream, KStruct, Node, ReadCtx, Result};
//!
//! #[derive(Default)]
//! struct Header {
//!     version: u16,
//!     flags: u64,
//! }
//!
//! impl<'a> KStruct<'a> for Header {
//!     type Parent = ();
//!     type Root = Header;
//!
//!     fn read_be(&mut self, ctx: &ReadCtx<'_, 'a, (), Header>) -> Result<()> {
//!         let io = ctx.io();
//!         io.ensure_fixed_contents(b"KS")?;
//!         self.version = io.read_u2be()?;
//!         self.flags = io.read_bits_int(3)?;
//!         Ok(())
//!     }
//! }
//!
//! let io = Rc::new(KStream::from_bytes(vec![b'K', b'S', 0x00, 0x02, 0b1010_0000]));
//! let header = Node::<Header>::read_root(io, EndianMode::Be).unwrap();
//! assert_eq!(header.version, 2);
//! assert_eq!(header.flags, 0b101);
//! ```

pub mod bits;
pub mod enums;
pub mod errors;
pub mod node;
pub mod process;
pub mod source;
pub mod stream;
pub mod text;

pub use errors::{ErrorKind, KsError, ParseFailure, Result};
pub use node::{Endian, EndianMode, KStruct, Node, ReadCtx};
pub use stream::KStream;
