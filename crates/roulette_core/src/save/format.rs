use super::error::SaveError;
use super::migration::migrate;
use super::record::{CurrentRecordV1, DemonTuple, LegacyRecord, SaveRecord};
use super::{MAX_DECOMPRESSED_BYTES, SAVE_VERSION};
use crate::state::RouletteState;

use anyhow::{bail, Context};
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine as _;
use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use rmp_serde::to_vec_named;
use rmpv::Value;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use std::io::Write;

/// Legacy saves came from a lenient decoder: padding optional, stray
/// trailing bits tolerated.
const LEGACY_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const INFLATE_CHUNK: usize = 16 * 1024;

/// Save encoding, as guessed from the bytes alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveFormat {
    /// base64 text over zlib over MessagePack
    Legacy,
    /// raw deflate over MessagePack
    Current,
}

impl SaveFormat {
    /// Legacy iff every byte is in the base64 alphabet. A heuristic, not a
    /// tag: raw deflate output practically always breaks it. Kept as-is so
    /// old saves keep loading.
    pub fn detect(bytes: &[u8]) -> SaveFormat {
        if bytes.iter().all(|b| is_base64_byte(*b)) {
            SaveFormat::Legacy
        } else {
            SaveFormat::Current
        }
    }
}

fn is_base64_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='
}

// ============================================================================
// Encode
// ============================================================================

/// Top-level map written for a v1 save
struct TransportRecord<'a> {
    state: &'a RouletteState,
}

impl Serialize for TransportRecord<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let state = self.state;
        let demons: Vec<DemonTuple<'_>> = state.demons.iter().map(DemonTuple).collect();

        let mut map = serializer.serialize_map(Some(8 + state.extra.len()))?;
        map.serialize_entry("playing", &state.playing)?;
        map.serialize_entry("selectedLists", &state.selected_lists)?;
        map.serialize_entry("demons", &demons)?;
        map.serialize_entry("current", &state.current)?;
        map.serialize_entry("percent", &state.percent)?;
        map.serialize_entry("percents", &state.percents)?;
        map.serialize_entry("completedDemonNames", &state.completed_demon_names)?;
        for (key, value) in &state.extra {
            map.serialize_entry(key, value)?;
        }
        map.serialize_entry("version", &SAVE_VERSION)?;
        map.end()
    }
}

/// Encode a state as a v1 save
pub fn try_compress_state(state: &RouletteState) -> Result<Vec<u8>, SaveError> {
    // Validate before serialization
    state.validate()?;

    // 1. MessagePack with field names, demons as tuples
    let msgpack = to_vec_named(&TransportRecord { state })?;

    // 2. Raw deflate, no zlib header
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&msgpack).map_err(|_| SaveError::Compression)?;
    let compressed = encoder.finish().map_err(|_| SaveError::Compression)?;

    log::debug!(
        "Encoded save: {} demons, {} bytes msgpack -> {} bytes deflated",
        state.demons.len(),
        msgpack.len(),
        compressed.len()
    );

    Ok(compressed)
}

/// Encode a state, returning an empty vector on failure. An empty result is
/// a failure marker, never a valid save; prefer `try_compress_state`.
pub fn compress_state(state: &RouletteState) -> Vec<u8> {
    match try_compress_state(state) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::error!("Error during save compression: {}", e);
            Vec::new()
        }
    }
}

// ============================================================================
// Decode
// ============================================================================

/// Detect the format and decode the payload, without migrating it.
/// The detected path is final: a failing path is not retried as the other.
pub fn decode_record(bytes: &[u8]) -> Result<SaveRecord, SaveError> {
    log::debug!("Decoding save: {} bytes", bytes.len());

    match SaveFormat::detect(bytes) {
        SaveFormat::Legacy => read_legacy(bytes).map(SaveRecord::Legacy).map_err(|e| {
            log::error!("Error during old save decompression: {:#}", e);
            SaveError::LegacyDecode { cause: format!("{:#}", e) }
        }),
        SaveFormat::Current => read_current(bytes).map(SaveRecord::V1).map_err(|e| {
            log::error!("Error during new save decompression: {:#}", e);
            SaveError::CurrentDecode { cause: format!("{:#}", e) }
        }),
    }
}

/// Decode a save of either format into a fresh state
pub fn decompress_state(bytes: &[u8]) -> Result<RouletteState, SaveError> {
    let record = decode_record(bytes)?;
    Ok(migrate(record))
}

fn read_legacy(bytes: &[u8]) -> anyhow::Result<LegacyRecord> {
    // 1. The blob is base64 text
    let text = std::str::from_utf8(bytes).context("Old save is not UTF-8 text")?;

    // 2. base64 -> zlib stream
    let zlib = LEGACY_BASE64.decode(text).context("Failed to decode base64")?;

    // 3. zlib -> MessagePack
    let msgpack = inflate(&zlib, true).context("Failed to inflate zlib stream")?;

    // 4. MessagePack -> record
    let value = read_msgpack(&msgpack)?;
    rmpv::ext::from_value::<LegacyRecord>(value).context("Unexpected old save layout")
}

fn read_current(bytes: &[u8]) -> anyhow::Result<CurrentRecordV1> {
    let msgpack = inflate(bytes, false).context("Failed to inflate deflate stream")?;
    let value = read_msgpack(&msgpack)?;
    rmpv::ext::from_value::<CurrentRecordV1>(value).context("Unexpected save layout")
}

fn read_msgpack(bytes: &[u8]) -> anyhow::Result<Value> {
    let value: Value =
        rmp_serde::from_slice(bytes).context("Failed to deserialize MessagePack")?;

    if !value.is_map() {
        bail!("Save payload is not a map");
    }
    Ok(value)
}

/// Inflate a complete stream held in memory. `zlib` selects header and
/// checksum handling. Fails on truncated streams and on output past
/// `MAX_DECOMPRESSED_BYTES`.
fn inflate(input: &[u8], zlib: bool) -> anyhow::Result<Vec<u8>> {
    let mut decoder = Decompress::new(zlib);
    let mut out = Vec::with_capacity(INFLATE_CHUNK.max(input.len() * 4));

    loop {
        if out.len() == out.capacity() {
            out.reserve(INFLATE_CHUNK);
        }

        let before_in = decoder.total_in();
        let before_out = decoder.total_out();
        let consumed = before_in as usize;

        let status = decoder
            .decompress_vec(&input[consumed..], &mut out, FlushDecompress::None)
            .context("Corrupt compressed stream")?;

        if out.len() > MAX_DECOMPRESSED_BYTES {
            bail!("Decompressed save exceeds {} bytes", MAX_DECOMPRESSED_BYTES);
        }

        if status == Status::StreamEnd {
            return Ok(out);
        }

        if decoder.total_in() == before_in && decoder.total_out() == before_out {
            bail!("Compressed stream ended early after {} bytes", out.len());
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use crate::demon::Demon;
    use crate::state::SelectedLists;
    use proptest::prelude::*;

    fn demon_strategy() -> impl Strategy<Value = Demon> {
        (
            1i32..=500,
            "[A-Za-z0-9 ]{1,24}",
            "[A-Za-z0-9_]{1,16}",
            proptest::option::of("[A-Za-z0-9_-]{11}"),
            proptest::option::of(1u64..200_000_000),
        )
            .prop_map(|(position, name, creator, video, level_id)| Demon {
                name,
                position,
                video,
                creator,
                level_id,
                link: Some(crate::demon::demon_link(position)),
            })
    }

    fn state_strategy() -> impl Strategy<Value = RouletteState> {
        (
            any::<bool>(),
            (any::<bool>(), any::<bool>(), any::<bool>()),
            proptest::collection::vec(demon_strategy(), 0..40),
            proptest::option::of(demon_strategy()),
            0u32..=100,
            proptest::collection::vec(0u32..=100, 0..20),
            proptest::collection::vec("[A-Za-z ]{1,16}", 0..10),
        )
            .prop_map(
                |(playing, (main, extended, legacy), demons, current, percent, percents, done)| {
                    RouletteState {
                        playing,
                        selected_lists: SelectedLists { main, extended, legacy },
                        demons,
                        current,
                        percent: percent as f64,
                        percents: percents.into_iter().map(f64::from).collect(),
                        completed_demon_names: done,
                        version: SAVE_VERSION,
                        extra: Default::default(),
                    }
                },
            )
    }

    proptest! {
        /// Property: decode(encode(s)) == s for saves written by this build
        #[test]
        fn prop_roundtrip(state in state_strategy()) {
            let compressed = compress_state(&state);
            prop_assert!(!compressed.is_empty());
            prop_assert_eq!(SaveFormat::detect(&compressed), SaveFormat::Current);

            let restored = decompress_state(&compressed).unwrap();
            prop_assert_eq!(restored, state);
        }

        /// Property: base64-alphabet input always takes the legacy path
        #[test]
        fn prop_base64_alphabet_is_legacy(text in "[A-Za-z0-9+/=]{0,64}") {
            prop_assert_eq!(SaveFormat::detect(text.as_bytes()), SaveFormat::Legacy);
            if let Err(e) = decompress_state(text.as_bytes()) {
                prop_assert_eq!(e.format(), Some(SaveFormat::Legacy));
            }
        }

        /// Property: arbitrary bytes never panic and fail with a decode error
        #[test]
        fn prop_garbage_fails_cleanly(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
            if let Err(e) = decompress_state(&bytes) {
                prop_assert!(e.format().is_some());
            }
        }

        /// Property: truncating a save always fails
        #[test]
        fn prop_truncation_fails(state in state_strategy(), cut in 1usize..64) {
            let compressed = compress_state(&state);
            let len = compressed.len().saturating_sub(cut);
            let rejected = match decompress_state(&compressed[..len]) {
                Err(e) => e.format().is_some(),
                Ok(_) => false,
            };
            prop_assert!(rejected, "save truncated to {} bytes decoded", len);
        }

        /// Property: short tuples only affect their own slot
        #[test]
        fn prop_short_tuple_contained(
            good in proptest::collection::vec(demon_strategy(), 1..10),
            bad_at in 0usize..10,
            bad_len in 0usize..4,
        ) {
            let bad_at = bad_at % (good.len() + 1);
            let mut entries: Vec<serde_json::Value> = good
                .iter()
                .map(|d| serde_json::to_value(DemonTuple(d)).unwrap())
                .collect();
            let short: Vec<serde_json::Value> = vec![serde_json::json!(1), serde_json::json!("x"), serde_json::json!("y")]
                .into_iter()
                .take(bad_len)
                .collect();
            entries.insert(bad_at, serde_json::Value::Array(short));

            let blob = super::tests::legacy_blob(&serde_json::json!({ "demons": entries }));
            let state = decompress_state(&blob).unwrap();

            prop_assert_eq!(state.demons.len(), good.len() + 1);
            prop_assert!(state.demons[bad_at].is_unknown());
            let rest: Vec<&Demon> = state
                .demons
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != bad_at)
                .map(|(_, d)| d)
                .collect();
            for (restored, original) in rest.into_iter().zip(good.iter()) {
                prop_assert_eq!(restored.position, original.position);
                prop_assert_eq!(&restored.name, &original.name);
                prop_assert_eq!(&restored.creator, &original.creator);
                prop_assert_eq!(&restored.video, &original.video);
            }
        }
    }
}
