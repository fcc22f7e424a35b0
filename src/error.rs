// (c) 2023 John A. Breaux
// This code is licensed under MIT license (see LICENSE for details)

//! Error type for lc3vm

use thiserror::Error;

/// Result type, equivalent to [std::result::Result]<T, [enum@Error]>
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for lc3vm.
///
/// Only startup can fail. Once a program is running, unsupported instructions
/// and unknown trap vectors are logged and skipped instead.
#[derive(Debug, Error)]
pub enum Error {
    /// The image is too short to hold its origin word
    #[error("image is {len} byte(s) long, too short for an origin word")]
    TruncatedHeader {
        /// The length of the offending image, in bytes
        len: usize,
    },
    /// The image has an origin, but nothing to put there
    #[error("image has origin {origin:04x}, but no words to load")]
    EmptyImage {
        /// The origin read from the header
        origin: u16,
    },
    /// The image holds more words than there are addresses
    #[error("image holds {words} words, but memory only has 65536")]
    ImageTooLarge {
        /// The number of words in the image body
        words: usize,
    },
    /// A command line argument could not be understood
    #[error("invalid argument: {arg}")]
    InvalidArgument {
        /// The offending argument
        arg: String,
    },
    /// Error originated in [std::io]
    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl Error {
    /// Gets the process exit status for this kind of failure
    ///
    /// # Examples
    /// ```rust
    /// # use lc3vm::error::Error;
    /// assert_eq!(2, Error::TruncatedHeader { len: 1 }.exit_code());
    /// assert_eq!(3, Error::EmptyImage { origin: 0x3000 }.exit_code());
    /// ```
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::IoError(_) => 1,
            Error::TruncatedHeader { .. } => 2,
            Error::EmptyImage { .. } => 3,
            Error::ImageTooLarge { .. } => 4,
            Error::InvalidArgument { .. } => 64,
        }
    }
}
