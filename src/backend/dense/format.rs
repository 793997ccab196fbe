//! Dense container format constants.
//!
//! ```text
//! +------------------+
//! | Magic: "RMFd"    |  4 bytes
//! +------------------+
//! | Frozen flag      |  1 byte (0x00 or 0xFF)
//! | Reserved         |  1 byte
//! +------------------+
//! | Version          |  2 bytes (u16 LE)
//! +------------------+
//! | Root Group Pos   |  8 bytes (u64 LE)
//! +------------------+
//! | ... Data ...     |
//! +------------------+
//! ```
//!
//! A group is a child count followed by child offsets (u64 LE each); a data
//! block is a byte length followed by the bytes. The root group holds the
//! attribute block followed by one group per table, and each table group
//! holds a header block and a payload block.

/// Magic bytes at the start of a dense container.
pub const MAGIC: &[u8; 4] = b"RMFd";

/// Size of the file header in bytes.
pub const HEADER_SIZE: usize = 16;

/// Offset of the frozen flag in the header.
pub const FROZEN_OFFSET: usize = 4;

/// Offset of the version in the header.
pub const VERSION_OFFSET: usize = 6;

/// Offset of the root group position in the header.
pub const ROOT_POS_OFFSET: usize = 8;

/// Current container version.
pub const CURRENT_VERSION: u16 = 1;

/// Frozen flag of a completely written container.
pub const FROZEN_FLAG: u8 = 0xFF;

/// Frozen flag while the container is being written.
pub const NOT_FROZEN_FLAG: u8 = 0x00;

/// Child offsets with this bit set point at data blocks, otherwise at groups.
pub const DATA_FLAG: u64 = 1 << 63;

/// Mask extracting the position from a child offset.
pub const OFFSET_MASK: u64 = !DATA_FLAG;

/// Number of children of a table group (header and payload).
pub const TABLE_GROUP_CHILDREN: usize = 2;

#[inline]
pub const fn is_data_offset(offset: u64) -> bool {
    (offset & DATA_FLAG) != 0
}

#[inline]
pub const fn extract_offset(offset: u64) -> u64 {
    offset & OFFSET_MASK
}

#[inline]
pub const fn make_data_offset(pos: u64) -> u64 {
    pos | DATA_FLAG
}

#[inline]
pub const fn make_group_offset(pos: u64) -> u64 {
    pos & OFFSET_MASK
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offsets() {
        let group = make_group_offset(0x1234);
        assert!(!is_data_offset(group));
        assert_eq!(extract_offset(group), 0x1234);

        let data = make_data_offset(0x5678);
        assert!(is_data_offset(data));
        assert_eq!(extract_offset(data), 0x5678);
        assert_eq!(data, 0x8000_0000_0000_5678);
    }
}
