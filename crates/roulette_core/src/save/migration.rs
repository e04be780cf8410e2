use super::record::{demon_from_entry, CurrentRecordV1, LegacyRecord, SaveRecord};
use super::SAVE_VERSION;
use crate::state::{RouletteState, SelectedLists};

/// Bring a decoded record of any historical shape to the in-memory state
pub fn migrate(record: SaveRecord) -> RouletteState {
    if needs_migration(&record) {
        log::info!(
            "Migrating {:?} save from version {} to {}",
            record.format(),
            record.version(),
            SAVE_VERSION
        );
    }

    match record {
        SaveRecord::Legacy(record) => migrate_legacy(record),
        SaveRecord::V1(record) => migrate_v1(record),
    }
}

/// Base64 era: `demon` instead of `current`, list toggles at the top level
pub fn migrate_legacy(record: LegacyRecord) -> RouletteState {
    log::debug!("Legacy save holds {} demons", record.demons.len());

    RouletteState {
        playing: record.playing,
        selected_lists: SelectedLists {
            main: record.main,
            extended: record.extended,
            legacy: record.legacy,
        },
        demons: record.demons.iter().map(demon_from_entry).collect(),
        current: record.demon.as_ref().map(demon_from_entry),
        percent: record.percent,
        percents: record.percents,
        completed_demon_names: record.completed_demon_names,
        version: record.version,
        extra: Default::default(),
    }
}

/// Raw deflate era: every top-level field carries over, demons may be tuples
pub fn migrate_v1(record: CurrentRecordV1) -> RouletteState {
    if record.version > SAVE_VERSION {
        // Future version - might be compatible
        log::warn!("Loading save from future version {} (current: {})", record.version, SAVE_VERSION);
    }

    RouletteState {
        playing: record.playing,
        selected_lists: record.selected_lists,
        demons: record.demons.iter().map(demon_from_entry).collect(),
        current: record.current.as_ref().map(demon_from_entry),
        percent: record.percent,
        percents: record.percents,
        completed_demon_names: record.completed_demon_names,
        version: record.version,
        extra: record.extra,
    }
}

/// Check if a save was written before the current version
pub fn needs_migration(record: &SaveRecord) -> bool {
    match record {
        SaveRecord::Legacy(_) => true,
        SaveRecord::V1(record) => record.version < SAVE_VERSION,
    }
}
