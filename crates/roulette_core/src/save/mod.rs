// Save/Load System for the roulette
// MessagePack + raw deflate, with a base64 + zlib legacy path

pub mod error;
pub mod format;
pub mod migration;
pub mod record;

pub use error::SaveError;
pub use format::{compress_state, decode_record, decompress_state, try_compress_state, SaveFormat};
pub use migration::{migrate, migrate_legacy, migrate_v1};
pub use record::{CurrentRecordV1, LegacyRecord, SaveRecord};

/// Version stamped on every save written by this build
pub const SAVE_VERSION: u32 = 1;

/// Version reported for base64 saves that predate the version field
pub const LEGACY_VERSION: u32 = 0;

/// Upper bound on inflated payload size
pub const MAX_DECOMPRESSED_BYTES: usize = 8 * 1024 * 1024;
