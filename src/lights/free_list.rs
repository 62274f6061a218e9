//! Free-slot search and free-list head maintenance for the light table.
//!
//! The table has no explicit chain; `LightProperties::ed_light_free` holds the
//! slot index + 1 of a free slot (0 when none is known). The head is only a
//! hint: it is kept pointing at *a* free slot, not necessarily the lowest.

use tracing::debug;

use super::{decode, encode_entry, encode_properties, LightEntry, LightsFile, MAX_LIGHTS};
use crate::error::{ensure_index, AssetError, Result};

impl LightsFile {
    /// First free slot, trying the free-list head before a linear scan.
    pub fn find_first_free_index(&self) -> Option<usize> {
        let head = self.properties.ed_light_free;
        if head >= 1 && head as usize <= MAX_LIGHTS {
            let index = head as usize - 1;
            if !self.entries[index].is_used() {
                return Some(index);
            }
        }
        self.entries.iter().position(|e| e.used == 0)
    }

    /// Next free slot after `index`, wrapping around the table.
    fn next_free_after(&self, index: usize) -> Option<usize> {
        (1..=MAX_LIGHTS)
            .map(|step| (index + step) % MAX_LIGHTS)
            .find(|&i| self.entries[i].used == 0)
    }
}

/// Slot an `add_light` would fill, or `None` when all 255 slots are used.
pub fn find_first_free_index(data: &[u8]) -> Result<Option<usize>> {
    Ok(decode(data)?.find_first_free_index())
}

/// Place `entry` in the first free slot.
///
/// Returns the replacement buffer and the slot index used.
pub fn add_light(data: &[u8], entry: LightEntry) -> Result<(Vec<u8>, usize)> {
    let mut file = decode(data)?;
    let index = file.find_first_free_index().ok_or_else(|| {
        AssetError::CapacityExceeded(format!("all {MAX_LIGHTS} light slots are in use"))
    })?;

    let mut entry = entry;
    entry.used = 1;
    entry.next = 0;
    let out = encode_entry(data, index, &entry)?;
    file.entries[index] = entry;

    let mut properties = file.properties;
    properties.ed_light_free = file
        .next_free_after(index)
        .map(|i| i as i32 + 1)
        .unwrap_or(0);
    let out = encode_properties(&out, &properties)?;

    debug!(index, free_head = properties.ed_light_free, "light added");
    Ok((out, index))
}

/// Free the slot at `index`.
///
/// The head moves to this slot only when no head is known or the current head
/// lies after it.
pub fn delete_light(data: &[u8], index: usize) -> Result<Vec<u8>> {
    ensure_index(index, MAX_LIGHTS)?;
    let file = decode(data)?;

    let mut entry = file.entries[index];
    entry.used = 0;
    let mut out = encode_entry(data, index, &entry)?;

    let head = file.properties.ed_light_free;
    let slot = index as i32 + 1;
    if head == 0 || head > slot {
        let mut properties = file.properties;
        properties.ed_light_free = slot;
        out = encode_properties(&out, &properties)?;
    }

    debug!(index, "light deleted");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lights::{read_entry, read_properties, LIGHTS_FILE_SIZE};

    fn template() -> Vec<u8> {
        LightsFile::new_template().encode().unwrap()
    }

    fn full_table() -> Vec<u8> {
        let mut file = LightsFile::new_template();
        for e in file.entries.iter_mut() {
            e.used = 1;
        }
        file.properties.ed_light_free = 0;
        file.encode().unwrap()
    }

    #[test]
    fn empty_table_head_one_gives_slot_zero() {
        let bytes = template();
        assert_eq!(bytes.len(), LIGHTS_FILE_SIZE);
        assert_eq!(find_first_free_index(&bytes).unwrap(), Some(0));
    }

    #[test]
    fn stale_head_falls_back_to_scan() {
        let mut file = LightsFile::new_template();
        file.entries[0].used = 1;
        file.entries[1].used = 1;
        file.properties.ed_light_free = 1; // points at a used slot
        assert_eq!(file.find_first_free_index(), Some(2));

        file.properties.ed_light_free = 400; // out of range
        assert_eq!(file.find_first_free_index(), Some(2));
    }

    #[test]
    fn head_is_preferred_over_lowest() {
        let mut file = LightsFile::new_template();
        file.properties.ed_light_free = 10;
        assert_eq!(file.find_first_free_index(), Some(9));
    }

    #[test]
    fn add_stamps_and_advances_head() {
        let entry = LightEntry {
            range: 50,
            next: 7,
            x: 100,
            ..LightEntry::default()
        };
        let (out, index) = add_light(&template(), entry).unwrap();
        assert_eq!(index, 0);

        let stored = read_entry(&out, 0).unwrap();
        assert_eq!(stored.used, 1);
        assert_eq!(stored.next, 0);
        assert_eq!(stored.range, 50);
        assert_eq!(read_properties(&out).unwrap().ed_light_free, 2);
    }

    #[test]
    fn add_wraps_around_when_searching_next_head() {
        let mut file = LightsFile::new_template();
        for e in file.entries.iter_mut().skip(1) {
            e.used = 1;
        }
        file.entries[3].used = 0;
        file.properties.ed_light_free = 1;
        let (out, index) = add_light(&file.encode().unwrap(), LightEntry::default()).unwrap();
        assert_eq!(index, 0);
        assert_eq!(read_properties(&out).unwrap().ed_light_free, 4);

        let (out, index) = add_light(&out, LightEntry::default()).unwrap();
        assert_eq!(index, 3);
        assert_eq!(read_properties(&out).unwrap().ed_light_free, 0);
    }

    #[test]
    fn full_table_reports_capacity() {
        let bytes = full_table();
        assert_eq!(find_first_free_index(&bytes).unwrap(), None);
        let err = add_light(&bytes, LightEntry::default()).unwrap_err();
        assert!(matches!(err, AssetError::CapacityExceeded(_)));
    }

    #[test]
    fn delete_moves_head_down_only() {
        let mut bytes = template();
        for _ in 0..5 {
            bytes = add_light(&bytes, LightEntry::default()).unwrap().0;
        }
        assert_eq!(read_properties(&bytes).unwrap().ed_light_free, 6);

        let bytes = delete_light(&bytes, 2).unwrap();
        assert_eq!(read_entry(&bytes, 2).unwrap().used, 0);
        assert_eq!(read_properties(&bytes).unwrap().ed_light_free, 3);

        // Head (3) is before slot 4, so it stays put.
        let bytes = delete_light(&bytes, 4).unwrap();
        assert_eq!(read_properties(&bytes).unwrap().ed_light_free, 3);
    }

    #[test]
    fn delete_on_full_table_sets_head() {
        let bytes = delete_light(&full_table(), 100).unwrap();
        assert_eq!(read_properties(&bytes).unwrap().ed_light_free, 101);
        assert_eq!(find_first_free_index(&bytes).unwrap(), Some(100));
    }

    #[test]
    fn delete_out_of_range() {
        assert!(matches!(
            delete_light(&template(), 255),
            Err(AssetError::IndexOutOfRange { .. })
        ));
    }
}
