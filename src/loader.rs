// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Loads LC-3 object images.
//!
//! An image is a stream of big-endian words. The first word is the origin,
//! and the rest are placed in memory starting there.

use crate::{
    cpu::{mem::Memory, mem::MEMORY_SIZE, Adr},
    error::{Error, Result},
};
use std::path::Path;

/// A parsed object image
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Image {
    origin: Adr,
    words: Vec<u16>,
}

impl Image {
    /// Parses an image from big-endian bytes
    ///
    /// A trailing odd byte can't make a word, so it's dropped with a warning.
    /// # Examples
    /// ```rust
    /// # use lc3vm::loader::Image;
    /// # fn main() -> lc3vm::error::Result<()> {
    /// let image = Image::from_bytes(&[0x30, 0x00, 0x12, 0x34, 0xf0, 0x25])?;
    /// assert_eq!(0x3000, image.origin());
    /// assert_eq!(&[0x1234_u16, 0xf025], image.words());
    /// # Ok(())
    /// # }
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (header, body) = match bytes {
            [hi, lo, body @ ..] => (u16::from_be_bytes([*hi, *lo]), body),
            _ => return Err(Error::TruncatedHeader { len: bytes.len() }),
        };
        if body.len() % 2 != 0 {
            log::warn!("image has a trailing odd byte; ignoring it");
        }
        let words: Vec<u16> = body
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        if words.is_empty() {
            return Err(Error::EmptyImage { origin: header });
        }
        if words.len() > MEMORY_SIZE {
            return Err(Error::ImageTooLarge { words: words.len() });
        }
        Ok(Image {
            origin: header,
            words,
        })
    }

    /// Reads and parses an image file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("reading image {}", path.display());
        Self::from_bytes(&std::fs::read(path)?)
    }

    /// Gets the address the image loads at
    pub fn origin(&self) -> Adr {
        self.origin
    }

    /// Gets the image body, in host order
    pub fn words(&self) -> &[u16] {
        &self.words
    }

    /// Gets the number of words in the image body
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns true if the image body is empty. Parsed images never are.
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Copies the image into memory, wrapping around the top of memory.
    ///
    /// Returns the origin, which the caller should use as the initial pc.
    pub fn load_into(&self, mem: &mut Memory) -> Adr {
        let written = mem.load(self.origin, &self.words);
        log::info!(
            "loaded {written} words at {:04x}..{:04x}",
            self.origin,
            self.origin.wrapping_add(written as Adr)
        );
        self.origin
    }
}

/// Parses `bytes` and loads them into memory, returning the origin
/// # Examples
/// ```rust
/// # use lc3vm::{loader::load_bytes, Memory};
/// # fn main() -> lc3vm::error::Result<()> {
/// let mut mem = Memory::new();
/// let origin = load_bytes(&mut mem, &[0x30, 0x00, 0x12, 0x34])?;
/// assert_eq!(0x3000, origin);
/// assert_eq!(0x1234, mem.peek(0x3000));
/// # Ok(())
/// # }
/// ```
pub fn load_bytes(mem: &mut Memory, bytes: &[u8]) -> Result<Adr> {
    Ok(Image::from_bytes(bytes)?.load_into(mem))
}

/// Reads an image file and loads it into memory, returning the origin
pub fn load_file(mem: &mut Memory, path: impl AsRef<Path>) -> Result<Adr> {
    Ok(Image::open(path)?.load_into(mem))
}
