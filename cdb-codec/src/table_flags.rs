//! Table id to default TABLE_FLAGS lookup.
//!
//! No real game save was available to extract authentic flag values from,
//! so this ships a synthesized placeholder: every id in `3..=274` maps to
//! `0`, which round-trips correctly (TABLE_FLAGS is read and stored as
//! opaque `u32` on `Table`, never interpreted bit-by-bit elsewhere) but is
//! not validated against actual game output. Swap `default_flags_for` for
//! a populated table if one ever turns up; nothing else in this crate
//! needs to change since `Table::table_flags` is sourced from the decoded
//! file itself whenever one is available, not from this table.

const MIN_TABLE_ID: u32 = 3;
const MAX_TABLE_ID: u32 = 274;

pub fn default_flags_for(table_id: u32) -> Option<u32> {
    if (MIN_TABLE_ID..=MAX_TABLE_ID).contains(&table_id) {
        Some(0)
    } else {
        None
    }
}

pub fn is_known_table_id(table_id: u32) -> bool {
    (MIN_TABLE_ID..=MAX_TABLE_ID).contains(&table_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_bounds() {
        assert!(!is_known_table_id(0));
        assert!(!is_known_table_id(2));
        assert!(is_known_table_id(3));
        assert!(is_known_table_id(274));
        assert!(!is_known_table_id(275));
    }
}
