//! Registry file storage
//!
//! Tag-level reading and writing of the registry dialect, the three-file
//! commit protocol, and file signatures used to skip redundant parses.

pub mod file_set;
pub mod file_token;
pub mod xml;

pub use file_set::{RegistryFiles, XmlFileIo};
pub use file_token::FileToken;
pub use xml::{Tag, TagEvent, TagReader, TagWriter};
