//! Tables to records.

use std::collections::HashMap;

use super::schema::{
    push_value, FileInfo, Frame, FrameInfo, Info, KeyInfo, Label, Node, NodeSet, NodeValue,
    RowTable, TypeDatas,
};
use crate::backend::{DenseArray, TableStore};
use crate::core::names::{self, CHILD, MAX_ARITY, SIBLING, TYPE};
use crate::core::NodeType;
use crate::util::{Result, Value, ValueType};

// ============================================================================
// Table access helpers
// ============================================================================

pub(super) fn table<'a>(store: &'a TableStore, name: &str) -> Result<Option<&'a DenseArray>> {
    if store.has_table(name) {
        store.table(name).map(Some)
    } else {
        Ok(None)
    }
}

pub(super) fn strings(store: &TableStore, name: &str) -> Result<Vec<String>> {
    Ok(match table(store, name)? {
        Some(t) => (0..t.extent().size(0))
            .map(|i| match t.get(&[i]) {
                Value::String(s) => s,
                _ => String::new(),
            })
            .collect(),
        None => Vec::new(),
    })
}

fn index(t: Option<&DenseArray>, row: usize, col: usize) -> i32 {
    t.and_then(|t| t.get(&[row, col]).as_i32()).unwrap_or(-1)
}

fn rows(t: Option<&DenseArray>) -> usize {
    t.map_or(0, |t| t.extent().size(0))
}

fn push(data: &mut TypeDatas, key: i32, id: i32, value: Value) {
    match value {
        Value::Int(v) => push_value(&mut data.int_data, key, id, v),
        Value::Float(v) => push_value(&mut data.float_data, key, id, v),
        Value::Index(v) => push_value(&mut data.index_data, key, id, v),
        Value::NodeId(v) => push_value(&mut data.node_id_data, key, id, v),
        Value::String(v) => push_value(&mut data.string_data, key, id, v),
        Value::Ints(v) => push_value(&mut data.ints_data, key, id, v),
        Value::Floats(v) => push_value(&mut data.floats_data, key, id, v),
        Value::Strings(v) => push_value(&mut data.strings_data, key, id, v),
        Value::Vector3(v) => push_value(&mut data.vector3_data, key, id, v.to_array()),
        Value::Vector4(v) => push_value(&mut data.vector4_data, key, id, v.to_array()),
        Value::Vector3s(v) => push_value(
            &mut data.vector3s_data,
            key,
            id,
            v.iter().map(|x| x.to_array()).collect(),
        ),
        Value::Vector4s(v) => push_value(
            &mut data.vector4s_data,
            key,
            id,
            v.iter().map(|x| x.to_array()).collect(),
        ),
    }
}

// ============================================================================
// Export
// ============================================================================

struct Exporter<'a> {
    store: &'a TableStore,
    /// Node-data table per arity (index 0 unused).
    node_data: [Option<&'a DenseArray>; MAX_ARITY + 1],
    /// Global id of every (arity, set row).
    set_ids: HashMap<(usize, usize), i32>,
}

impl<'a> Exporter<'a> {
    fn new(store: &'a TableStore) -> Result<Self> {
        let mut node_data = [None; MAX_ARITY + 1];
        for (arity, slot) in node_data.iter_mut().enumerate().skip(1) {
            *slot = table(store, names::node_data(arity))?;
        }
        Ok(Self {
            store,
            node_data,
            set_ids: HashMap::new(),
        })
    }

    /// Nodes in depth-first order, siblings in insertion order.
    fn nodes(&self) -> Result<Vec<Node>> {
        let names = strings(self.store, names::NODE_NAME)?;
        let nd = self.node_data[1];
        let n = names.len().max(rows(nd));

        let children_of = |p: usize| {
            let mut out = Vec::new();
            let mut c = index(nd, p, CHILD);
            while c >= 0 && (c as usize) < n && out.len() < n {
                out.push(c as usize);
                c = index(nd, c as usize, SIBLING);
            }
            out.reverse();
            out
        };

        let mut visited = vec![false; n];
        let mut order: Vec<(usize, Option<usize>)> = Vec::with_capacity(n);
        let mut stack = Vec::new();
        if n > 0 && index(nd, 0, TYPE) >= 0 {
            stack.push((0usize, None));
        }
        while let Some((node, parent)) = stack.pop() {
            if visited[node] {
                continue;
            }
            visited[node] = true;
            order.push((node, parent));
            for c in children_of(node).into_iter().rev() {
                stack.push((c, Some(node)));
            }
        }
        for (node, seen) in visited.iter().enumerate() {
            if !seen && index(nd, node, TYPE) >= 0 {
                tracing::warn!(node, "node unreachable from the root");
                order.push((node, None));
            }
        }

        Ok(order
            .into_iter()
            .map(|(node, parent)| Node {
                id: node as i32,
                name: names.get(node).cloned().unwrap_or_default(),
                node_type: index(nd, node, TYPE),
                parents: parent.map(|p| vec![p as i32]).unwrap_or_default(),
            })
            .collect())
    }

    fn node_sets(&mut self) -> Vec<NodeSet> {
        let mut sets = Vec::new();
        for arity in 2..=MAX_ARITY {
            let t = self.node_data[arity];
            for s in 0..rows(t) {
                if index(t, s, TYPE) < 0 {
                    continue;
                }
                let id = sets.len() as i32;
                self.set_ids.insert((arity, s), id);
                sets.push(NodeSet {
                    id,
                    nodes: (1..=arity).map(|m| index(t, s, m)).collect(),
                });
            }
        }
        sets
    }

    /// (row, value id) of everything holding a row in a category, by row.
    fn owners(&self, arity: usize, category: usize) -> Vec<(usize, i32)> {
        let t = self.node_data[arity];
        let column = names::category_column(arity, category);
        let mut owners: Vec<(usize, i32)> = (0..rows(t))
            .filter_map(|i| {
                let row = index(t, i, column);
                if row < 0 || index(t, i, TYPE) < 0 {
                    return None;
                }
                let id = if arity == 1 {
                    i as i32
                } else {
                    -1 - *self.set_ids.get(&(arity, i))?
                };
                Some((row as usize, id))
            })
            .collect();
        owners.sort_unstable();
        owners
    }

    /// Every allocated row, valueless ones included.
    fn row_tables(&self, n_categories: usize) -> Vec<RowTable> {
        let mut tables = Vec::new();
        for arity in 1..=MAX_ARITY {
            for category in 0..n_categories {
                let owners = self.owners(arity, category);
                if owners.is_empty() {
                    continue;
                }
                tables.push(RowTable {
                    arity: arity as i32,
                    category: category as i32,
                    rows: owners
                        .into_iter()
                        .map(|(row, id)| NodeValue {
                            id,
                            value: row as i32,
                        })
                        .collect(),
                });
            }
        }
        tables
    }

    fn frame_count(&self, frame_names: &[String]) -> usize {
        self.store
            .tables()
            .filter(|(_, t)| t.rank() == 3)
            .map(|(_, t)| t.extent().size(2))
            .fold(frame_names.len(), usize::max)
    }
}

/// Express every table of `store` as records.
pub fn export(store: &TableStore) -> Result<Vec<Frame>> {
    let mut ex = Exporter::new(store)?;
    let categories = strings(store, names::CATEGORY_NAMES)?;
    let frame_names = strings(store, names::FRAME_NAMES)?;
    let nodes = ex.nodes()?;
    let node_sets = ex.node_sets();
    let row_tables = ex.row_tables(categories.len());
    let n_frames = ex.frame_count(&frame_names);

    let mut file_keys = Vec::new();
    let mut frame_keys = Vec::new();
    let mut file_data = TypeDatas::default();
    let mut frame_data = vec![TypeDatas::default(); n_frames];
    let mut next_key = 0i32;

    for (c, category) in categories.iter().enumerate() {
        for value_type in ValueType::ALL {
            for per_frame in [false, true] {
                let key_names = strings(store, &names::key_list(category, value_type, per_frame))?;
                if key_names.is_empty() {
                    continue;
                }
                let first_key = next_key;
                let n_keys = key_names.len();
                for name in key_names {
                    let info = KeyInfo {
                        id: next_key,
                        name,
                        category: c as i32,
                        key_type: value_type.into(),
                        per_frame,
                    };
                    next_key += 1;
                    if per_frame && n_frames > 0 {
                        frame_keys.push(info);
                    } else {
                        file_keys.push(info);
                    }
                }

                for arity in 1..=MAX_ARITY {
                    let name = names::data_table(arity, category, value_type, per_frame);
                    let Some(t) = table(store, &name)? else {
                        continue;
                    };
                    let owners = ex.owners(arity, c);
                    for k in 0..n_keys.min(t.extent().size(1)) {
                        let key = first_key + k as i32;
                        if per_frame {
                            for (f, data) in frame_data.iter_mut().enumerate() {
                                for (row, id) in &owners {
                                    let v = t.get(&[*row, k, f]);
                                    if !v.is_null() {
                                        push(data, key, *id, v);
                                    }
                                }
                            }
                        } else {
                            for (row, id) in &owners {
                                let v = t.get(&[*row, k]);
                                if !v.is_null() {
                                    push(&mut file_data, key, *id, v);
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    let info = FileInfo {
        description: store
            .get_attribute(names::DESCRIPTION_ATTRIBUTE)
            .unwrap_or_default()
            .to_string(),
        producer: store
            .get_attribute(names::PRODUCER_ATTRIBUTE)
            .unwrap_or_default()
            .to_string(),
        categories: categories
            .into_iter()
            .enumerate()
            .map(|(id, name)| Label {
                id: id as i32,
                name,
            })
            .collect(),
        node_types: NodeType::ALL
            .iter()
            .map(|t| Label {
                id: t.to_i32(),
                name: t.name().to_string(),
            })
            .collect(),
        frame_types: vec![Label {
            id: 0,
            name: "frame".into(),
        }],
        node_sets,
        rows: row_tables,
    };

    let mut frames = Vec::with_capacity(n_frames + 1);
    frames.push(Frame {
        info: Info::File(info),
        nodes,
        keys: file_keys,
        data: file_data,
    });
    for (f, data) in frame_data.into_iter().enumerate() {
        frames.push(Frame {
            info: Info::Frame(FrameInfo {
                id: f as i32,
                name: frame_names.get(f).cloned().unwrap_or_default(),
                frame_type: 0,
                parents: if f > 0 { vec![f as i32 - 1] } else { Vec::new() },
            }),
            nodes: Vec::new(),
            keys: if f == 0 {
                std::mem::take(&mut frame_keys)
            } else {
                Vec::new()
            },
            data,
        });
    }
    Ok(frames)
}
