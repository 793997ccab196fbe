//! Persisted table and attribute names, node-data column layout, name audits.

use crate::util::{Error, Result, ValueType};

/// Container attribute holding the format version.
pub const VERSION_ATTRIBUTE: &str = "version";
/// The only accepted version string.
pub const VERSION: &str = "rmf 1";
/// Container attribute holding the free-form description.
pub const DESCRIPTION_ATTRIBUTE: &str = "description";
/// Container attribute naming the producing program.
pub const PRODUCER_ATTRIBUTE: &str = "producer";

/// 1-D string table of node names.
pub const NODE_NAME: &str = "node_name";
/// 1-D string table of category names.
pub const CATEGORY_NAMES: &str = "category_names";
/// 1-D string table of frame names.
pub const FRAME_NAMES: &str = "frame_names";

/// Name of the root node.
pub const ROOT_NAME: &str = "root";

/// Category holding the target of LINK nodes.
pub const LINK_CATEGORY: &str = "link";
/// Key holding the target of LINK nodes.
pub const LINK_KEY: &str = "linked";
/// Name given to LINK nodes.
pub const LINK_NODE_NAME: &str = "link";
/// Name given to node sets.
pub const SET_NAME: &str = "bond";

/// Node-data column holding the node type.
pub const TYPE: usize = 0;
/// Node-data column holding the first child (arity 1).
pub const CHILD: usize = 1;
/// Node-data column holding the next sibling (arity 1).
pub const SIBLING: usize = 2;

/// Largest supported node-set arity.
pub const MAX_ARITY: usize = 4;

/// Node-data table of the given arity.
pub fn node_data(arity: usize) -> &'static str {
    match arity {
        1 => "node_data",
        2 => "node_data_pair",
        3 => "node_data_triplet",
        _ => "node_data_quad",
    }
}

/// First node-data column holding category rows.
///
/// Arity 1 rows are (type, child, sibling, rows...); arity k rows are
/// (type, member 0..k, rows...).
#[inline]
pub const fn first_category_column(arity: usize) -> usize {
    if arity == 1 {
        3
    } else {
        arity + 1
    }
}

/// Node-data column holding the row of `category_index`.
#[inline]
pub const fn category_column(arity: usize, category_index: usize) -> usize {
    first_category_column(arity) + category_index
}

fn frame_suffix(per_frame: bool) -> &'static str {
    if per_frame {
        "_per_frame"
    } else {
        ""
    }
}

/// 1-D string table listing the key names of one partition.
pub fn key_list(category: &str, value_type: ValueType, per_frame: bool) -> String {
    format!("{category}_{value_type}{}_list", frame_suffix(per_frame))
}

/// Data table of one partition at one arity.
///
/// Set arities are marked in a suffix after the type, where no category or
/// key name can reach, so every (arity, category, type, per-frame) maps to
/// its own table.
pub fn data_table(arity: usize, category: &str, value_type: ValueType, per_frame: bool) -> String {
    let arity_suffix = match arity {
        1 => "",
        2 => "_pair",
        3 => "_triplet",
        _ => "_quad",
    };
    format!(
        "{category}_{value_type}{}{arity_suffix}_storage",
        frame_suffix(per_frame)
    )
}

const KEY_NAME_ILLEGAL: &[char] = &['\\', ':', '=', '(', ')', '[', ']', '{', '}', '"', '\''];

/// Reject empty key names and names with reserved characters.
pub fn audit_key_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName {
            name: name.into(),
            reason: "key names must not be empty".into(),
        });
    }
    if let Some(c) = name.chars().find(|c| KEY_NAME_ILLEGAL.contains(c)) {
        return Err(Error::InvalidName {
            name: name.into(),
            reason: format!("key names must not contain {c:?}"),
        });
    }
    Ok(())
}

/// Reject empty node names and names with a double quote.
pub fn audit_node_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidName {
            name: name.into(),
            reason: "node names must not be empty".into(),
        });
    }
    if name.contains('"') {
        return Err(Error::InvalidName {
            name: name.into(),
            reason: "node names must not contain '\"'".into(),
        });
    }
    Ok(())
}

/// Description and producer must be empty or end with a newline.
pub fn audit_multiline(attribute: &str, value: &str) -> Result<()> {
    if value.is_empty() || value.ends_with('\n') {
        Ok(())
    } else {
        Err(Error::usage(format!(
            "{attribute} should end in a newline"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_names() {
        assert_eq!(key_list("physics", ValueType::Float, false), "physics_float_list");
        assert_eq!(
            key_list("physics", ValueType::Float, true),
            "physics_float_per_frame_list"
        );
        assert_eq!(
            data_table(1, "physics", ValueType::Vector3, true),
            "physics_vector3_per_frame_storage"
        );
        assert_eq!(
            data_table(2, "bond", ValueType::Int, false),
            "bond_int_pair_storage"
        );
        assert_eq!(
            data_table(4, "bond", ValueType::Int, true),
            "bond_int_per_frame_quad_storage"
        );
        assert_ne!(
            data_table(1, "pair_x", ValueType::Float, false),
            data_table(2, "x", ValueType::Float, false)
        );
        assert_eq!(node_data(3), "node_data_triplet");
    }

    #[test]
    fn test_columns() {
        assert_eq!(category_column(1, 0), 3);
        assert_eq!(category_column(1, 2), 5);
        assert_eq!(category_column(2, 0), 3);
        assert_eq!(category_column(4, 1), 6);
    }

    #[test]
    fn test_audits() {
        assert!(audit_key_name("mass").is_ok());
        assert!(audit_key_name("").is_err());
        assert!(audit_key_name("a:b").is_err());
        assert!(audit_key_name("x[0]").is_err());
        assert!(audit_node_name("CA").is_ok());
        assert!(audit_node_name("say \"hi\"").is_err());
        assert!(audit_multiline("description", "").is_ok());
        assert!(audit_multiline("description", "a file\n").is_ok());
        assert!(audit_multiline("description", "a file").unwrap_err().is_usage());
    }
}
