//! # roulette_core - Demon List Roulette Save Codec
//!
//! Persists a roulette session to a compact binary blob and restores it,
//! including saves written by older builds.
//!
//! ## Formats
//! - Current (v1): raw deflate over MessagePack, demons as positional tuples
//! - Legacy (v0): base64 text over zlib over MessagePack
//!
//! The format of an incoming blob is guessed from its bytes; see
//! [`save::SaveFormat::detect`].

pub mod demon;
pub mod save;
pub mod state;

pub use demon::{extract_video_id, simplify_demon, CatalogDemon, CatalogPlayer, Demon};
pub use save::{
    compress_state, decode_record, decompress_state, try_compress_state, SaveError, SaveFormat,
    SaveRecord, SAVE_VERSION,
};
pub use state::{RouletteState, SelectedLists};
