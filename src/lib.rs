//! Content loading for the TOEIC38 study bot: bundled vocabulary, practice tests
//! from a bundled file or a remote document store, and YouTube player pages.

pub mod assets;
pub mod config;
pub mod error;
pub mod quiz;
pub mod vocabulary;
pub mod youtube;
