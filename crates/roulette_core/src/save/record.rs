//! Wire payloads
//!
//! Saves are decoded into one of these typed records before migration. Demon
//! entries stay as raw values here because both formats may carry either a
//! positional tuple or a keyed record; `demon_from_entry` settles which.

use super::format::SaveFormat;
use crate::demon::Demon;
use crate::state::SelectedLists;
use rmpv::Value;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

/// Minimum tuple length that still identifies a demon
pub const MIN_TUPLE_LEN: usize = 4;

/// Payload of a base64 + zlib save
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacyRecord {
    /// Rolled demon (renamed `current` later)
    pub demon: Option<Value>,

    #[serde(deserialize_with = "null_as_default")]
    pub main: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub extended: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub legacy: bool,

    #[serde(deserialize_with = "null_as_default")]
    pub percent: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub percents: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub playing: bool,

    #[serde(deserialize_with = "null_as_default")]
    pub demons: Vec<Value>,

    #[serde(deserialize_with = "null_as_default")]
    pub completed_demon_names: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub version: u32,
}

/// Payload of a raw deflate save
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CurrentRecordV1 {
    #[serde(deserialize_with = "null_as_default")]
    pub playing: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub selected_lists: SelectedLists,
    #[serde(deserialize_with = "null_as_default")]
    pub demons: Vec<Value>,
    pub current: Option<Value>,
    #[serde(deserialize_with = "null_as_default")]
    pub percent: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub percents: Vec<f64>,
    #[serde(deserialize_with = "null_as_default")]
    pub completed_demon_names: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub version: u32,

    /// Everything else at the top level
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// A decoded save, before migration
#[derive(Debug, Clone, PartialEq)]
pub enum SaveRecord {
    Legacy(LegacyRecord),
    V1(CurrentRecordV1),
}

impl SaveRecord {
    pub fn format(&self) -> SaveFormat {
        match self {
            SaveRecord::Legacy(_) => SaveFormat::Legacy,
            SaveRecord::V1(_) => SaveFormat::Current,
        }
    }

    /// Version field as stored in the payload
    pub fn version(&self) -> u32 {
        match self {
            SaveRecord::Legacy(record) => record.version,
            SaveRecord::V1(record) => record.version,
        }
    }
}

/// Absent and nil both fall back to the field default
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Transport tuple: `[position, name, creator, video, levelID, link]`.
/// Element order is part of the wire format.
#[derive(Debug)]
pub struct DemonTuple<'a>(pub &'a Demon);

impl Serialize for DemonTuple<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let demon = self.0;
        let level_id = demon.level_id.filter(|id| *id != 0);
        let link = demon.link.as_deref().filter(|link| !link.is_empty());

        (
            demon.position,
            demon.name.as_str(),
            demon.creator.as_str(),
            demon.video.as_deref(),
            level_id,
            link,
        )
            .serialize(serializer)
    }
}

/// Rebuild one pool entry. Anything unreadable becomes `Demon::unknown()` so
/// one bad entry never sinks the whole save.
pub fn demon_from_entry(entry: &Value) -> Demon {
    match entry {
        Value::Array(items) => demon_from_tuple(items).unwrap_or_else(|| {
            log::warn!("Malformed demon tuple in save: {}", entry);
            Demon::unknown()
        }),
        Value::Map(_) => rmpv::ext::from_value::<Demon>(entry.clone()).unwrap_or_else(|e| {
            log::warn!("Malformed demon record in save ({}): {}", e, entry);
            Demon::unknown()
        }),
        other => {
            log::warn!("Unexpected demon entry in save: {}", other);
            Demon::unknown()
        }
    }
}

/// Positional reconstruction. `None` for short tuples or wrong scalar kinds.
pub fn demon_from_tuple(items: &[Value]) -> Option<Demon> {
    if items.len() < MIN_TUPLE_LEN {
        return None;
    }

    let position = as_position(&items[0])?;
    let name = items[1].as_str()?.to_string();
    let creator = items[2].as_str()?.to_string();
    let video = match &items[3] {
        Value::Nil => None,
        Value::String(id) => Some(id.as_str()?.to_string()),
        _ => return None,
    };

    // Missing, nil and zero all mean "no level ID"
    let level_id = items.get(4).and_then(Value::as_u64).filter(|id| *id != 0);
    let link = items.get(5).and_then(Value::as_str).unwrap_or_default().to_string();

    Some(Demon { name, position, video, creator, level_id, link: Some(link) })
}

fn as_position(value: &Value) -> Option<i32> {
    if let Some(n) = value.as_i64() {
        return i32::try_from(n).ok();
    }

    // Whole floats sneak in from number-typed writers
    let f = value.as_f64()?;
    if f.fract() == 0.0 && f >= i32::MIN as f64 && f <= i32::MAX as f64 {
        Some(f as i32)
    } else {
        None
    }
}
