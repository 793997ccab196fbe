//! Records to tables.
//!
//! Rows come from the row tables of the file record. Owners holding values
//! without a listed row (all of them in historical containers) are given the
//! rows after the listed ones, in ascending id order.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use glam::{Vec3, Vec4};

use super::schema::{Frame, Info, TypeDatas};
use crate::backend::{DenseArray, TableStore};
use crate::core::names::{self, CHILD, MAX_ARITY, SIBLING, TYPE};
use crate::core::NodeType;
use crate::util::{Error, Extent, Result, Value, ValueType};

/// Every value of one record as (key, owner id, value).
fn flatten(data: TypeDatas) -> Vec<(i32, i32, Value)> {
    let mut out = Vec::new();
    macro_rules! take {
        ($field:ident, |$v:ident| $conv:expr) => {
            for group in data.$field {
                for nv in group.values {
                    let $v = nv.value;
                    out.push((group.key, nv.id, $conv));
                }
            }
        };
    }
    take!(int_data, |v| Value::Int(v));
    take!(float_data, |v| Value::Float(v));
    take!(string_data, |v| Value::String(v));
    take!(vector3_data, |v| Value::Vector3(Vec3::from_array(v)));
    take!(vector4_data, |v| Value::Vector4(Vec4::from_array(v)));
    take!(ints_data, |v| Value::Ints(v));
    take!(floats_data, |v| Value::Floats(v));
    take!(strings_data, |v| Value::Strings(v));
    take!(vector3s_data, |v| Value::Vector3s(
        v.into_iter().map(Vec3::from_array).collect()
    ));
    take!(vector4s_data, |v| Value::Vector4s(
        v.into_iter().map(Vec4::from_array).collect()
    ));
    take!(index_data, |v| Value::Index(v));
    take!(node_id_data, |v| Value::NodeId(v));
    out
}

fn insert_strings(store: &mut TableStore, name: &str, values: Vec<String>) -> Result<()> {
    let extent = Extent::d1(values.len());
    let cells = values.into_iter().map(Value::String).collect();
    store.insert(name, DenseArray::from_cells(ValueType::String, extent, cells)?);
    Ok(())
}

fn non_negative(v: i32, what: &str) -> Result<usize> {
    usize::try_from(v).map_err(|_| Error::corrupt(format!("negative {what} {v}")))
}

/// Decode a value id into (arity, node id or set slot).
fn owner_slot(
    id: i32,
    n_nodes: usize,
    set_slot: &HashMap<i32, (usize, usize)>,
) -> Result<(usize, usize)> {
    if id >= 0 {
        if id as usize >= n_nodes {
            return Err(Error::corrupt(format!("value for unknown node {id}")));
        }
        Ok((1, id as usize))
    } else {
        set_slot
            .get(&(-1 - id))
            .copied()
            .ok_or_else(|| Error::corrupt(format!("value for unknown set {}", -1 - id)))
    }
}

/// Row count needed to hold every row of a map.
fn row_count(map: &HashMap<usize, usize>) -> usize {
    map.values().max().map_or(0, |r| r + 1)
}

/// Where a value lives.
struct Slot {
    arity: usize,
    category: usize,
    value_type: ValueType,
    per_frame: bool,
    key_index: usize,
    owner: usize,
    frame: Option<usize>,
    value: Value,
}

/// Rebuild the tables of a store from its records.
pub fn import(frames: Vec<Frame>) -> Result<TableStore> {
    let mut file = None;
    let mut frame_records = Vec::new();
    let mut keys = Vec::new();
    let mut nodes = Vec::new();
    for frame in frames {
        keys.extend(frame.keys);
        nodes.extend(frame.nodes);
        match frame.info {
            Info::File(info) => {
                if file.is_some() {
                    return Err(Error::corrupt("more than one file record"));
                }
                file = Some((info, frame.data));
            }
            Info::Frame(info) => frame_records.push((info, frame.data)),
        }
    }
    let (info, file_data) = file.ok_or_else(|| Error::corrupt("no file record"))?;
    let row_tables = info.rows;

    let mut store = TableStore::new();
    store.set_attribute(names::VERSION_ATTRIBUTE, names::VERSION);
    store.set_attribute(names::DESCRIPTION_ATTRIBUTE, &info.description);
    store.set_attribute(names::PRODUCER_ATTRIBUTE, &info.producer);

    // Categories
    let mut labels = info.categories;
    labels.sort_by_key(|l| l.id);
    for (i, l) in labels.iter().enumerate() {
        if l.id != i as i32 {
            return Err(Error::corrupt(format!("category ids skip {i}")));
        }
    }
    let categories: Vec<String> = labels.into_iter().map(|l| l.name).collect();
    let n_categories = categories.len();
    if n_categories > 0 {
        insert_strings(&mut store, names::CATEGORY_NAMES, categories.clone())?;
    }

    // Frames
    let mut n_frames = 0;
    for (f, _) in &frame_records {
        n_frames = n_frames.max(non_negative(f.id, "frame id")? + 1);
    }
    let mut frame_names = vec![String::new(); n_frames];
    for (f, _) in &frame_records {
        frame_names[f.id as usize] = f.name.clone();
    }
    if n_frames > 0 {
        insert_strings(&mut store, names::FRAME_NAMES, frame_names)?;
    }

    // Keys
    let mut partitions: BTreeMap<(usize, ValueType, bool), Vec<(i32, String)>> = BTreeMap::new();
    for k in keys {
        let category = non_negative(k.category, "category")?;
        if category >= n_categories {
            return Err(Error::corrupt(format!("key {} in unknown category", k.name)));
        }
        partitions
            .entry((category, k.key_type.into(), k.per_frame))
            .or_default()
            .push((k.id, k.name));
    }
    let mut key_index: HashMap<i32, (usize, ValueType, bool, usize)> = HashMap::new();
    for (&(category, value_type, per_frame), list) in partitions.iter_mut() {
        list.sort_by_key(|(id, _)| *id);
        for (i, (id, _)) in list.iter().enumerate() {
            if key_index
                .insert(*id, (category, value_type, per_frame, i))
                .is_some()
            {
                return Err(Error::corrupt(format!("duplicate key id {id}")));
            }
        }
        let list_name = names::key_list(&categories[category], value_type, per_frame);
        let key_names = list.iter().map(|(_, n)| n.clone()).collect();
        insert_strings(&mut store, &list_name, key_names)?;
    }

    // Node sets
    let mut sets = info.node_sets;
    sets.sort_by_key(|s| s.id);
    let mut set_members: [Vec<Vec<i32>>; MAX_ARITY + 1] = Default::default();
    let mut set_slot: HashMap<i32, (usize, usize)> = HashMap::new();
    for s in sets {
        let arity = s.nodes.len();
        if !(2..=MAX_ARITY).contains(&arity) {
            return Err(Error::corrupt(format!("node set of arity {arity}")));
        }
        set_slot.insert(s.id, (arity, set_members[arity].len()));
        set_members[arity].push(s.nodes);
    }

    // Values
    let n_nodes = nodes
        .iter()
        .map(|n| non_negative(n.id, "node id").map(|id| id + 1))
        .try_fold(0usize, |acc, n| n.map(|n| acc.max(n)))?;

    let mut sources = vec![(None, file_data)];
    sources.extend(
        frame_records
            .into_iter()
            .map(|(f, data)| (Some(f.id as usize), data)),
    );
    let mut slots = Vec::new();
    for (frame, data) in sources {
        for (key, id, value) in flatten(data) {
            let &(category, value_type, per_frame, key_slot) = key_index
                .get(&key)
                .ok_or_else(|| Error::corrupt(format!("value for unknown key {key}")))?;
            if value.value_type() != value_type {
                return Err(Error::corrupt(format!(
                    "{} value stored under {value_type} key",
                    value.value_type()
                )));
            }
            if per_frame != frame.is_some() {
                return Err(Error::corrupt(format!(
                    "key {key} value stored in the wrong record"
                )));
            }
            let (arity, owner) = owner_slot(id, n_nodes, &set_slot)?;
            slots.push(Slot {
                arity,
                category,
                value_type,
                per_frame,
                key_index: key_slot,
                owner,
                frame,
                value,
            });
        }
    }

    // Rows
    let mut rows: HashMap<(usize, usize), HashMap<usize, usize>> = HashMap::new();
    for table in row_tables {
        let arity = non_negative(table.arity, "row table arity")?;
        let category = non_negative(table.category, "row table category")?;
        if !(1..=MAX_ARITY).contains(&arity) || category >= n_categories {
            return Err(Error::corrupt(format!(
                "row table for arity {arity} category {category}"
            )));
        }
        let map = rows.entry((arity, category)).or_default();
        let mut taken = HashSet::new();
        for entry in table.rows {
            let (owner_arity, owner) = owner_slot(entry.id, n_nodes, &set_slot)?;
            let row = non_negative(entry.value, "row")?;
            if owner_arity != arity || !taken.insert(row) || map.insert(owner, row).is_some() {
                return Err(Error::corrupt(format!(
                    "row table for arity {arity} category {category} repeats {} or row {row}",
                    entry.id
                )));
            }
        }
    }
    // Owners missing from the row tables follow the listed rows in ascending
    // id order.
    let mut unlisted: BTreeMap<(usize, usize), BTreeSet<usize>> = BTreeMap::new();
    for s in &slots {
        let listed = rows
            .get(&(s.arity, s.category))
            .is_some_and(|m| m.contains_key(&s.owner));
        if !listed {
            unlisted
                .entry((s.arity, s.category))
                .or_default()
                .insert(s.owner);
        }
    }
    for (k, owners) in unlisted {
        let map = rows.entry(k).or_default();
        let mut next = row_count(map);
        for owner in owners {
            map.insert(owner, next);
            next += 1;
        }
    }

    // Node data
    let mut node_names = vec![String::new(); n_nodes];
    let mut nd = DenseArray::new(ValueType::Index, 2);
    nd.resize(&Extent::d2(n_nodes, names::first_category_column(1) + n_categories))?;
    for n in &nodes {
        let id = n.id as usize;
        if NodeType::from_i32(n.node_type).is_none() {
            return Err(Error::corrupt(format!("node {id} has type {}", n.node_type)));
        }
        node_names[id] = n.name.clone();
        nd.set(&[id, TYPE], Value::Index(n.node_type))?;
        if let Some(&parent) = n.parents.first() {
            let parent = non_negative(parent, "parent")?;
            if parent >= n_nodes {
                return Err(Error::corrupt(format!("node {id} has unknown parent {parent}")));
            }
            let sibling = nd.get(&[parent, CHILD]);
            nd.set(&[id, SIBLING], sibling)?;
            nd.set(&[parent, CHILD], Value::Index(n.id))?;
        }
        if n.parents.len() > 1 {
            tracing::warn!(node = id, "ignoring extra parents");
        }
    }
    for ((arity, category), map) in &rows {
        if *arity != 1 {
            continue;
        }
        for (owner, row) in map {
            nd.set(
                &[*owner, names::category_column(1, *category)],
                Value::Index(*row as i32),
            )?;
        }
    }
    if n_nodes > 0 {
        insert_strings(&mut store, names::NODE_NAME, node_names)?;
        store.insert(names::node_data(1), nd);
    }

    for (arity, members) in set_members.iter().enumerate().skip(2) {
        if members.is_empty() {
            continue;
        }
        let mut t = DenseArray::new(ValueType::Index, 2);
        t.resize(&Extent::d2(
            members.len(),
            names::first_category_column(arity) + n_categories,
        ))?;
        for (s, nodes) in members.iter().enumerate() {
            t.set(&[s, TYPE], Value::Index(NodeType::Bond.to_i32()))?;
            for (m, node) in nodes.iter().enumerate() {
                t.set(&[s, 1 + m], Value::Index(*node))?;
            }
        }
        for ((a, category), map) in &rows {
            if *a != arity {
                continue;
            }
            for (owner, row) in map {
                t.set(
                    &[*owner, names::category_column(arity, *category)],
                    Value::Index(*row as i32),
                )?;
            }
        }
        store.insert(names::node_data(arity), t);
    }

    // Data tables
    let mut tables: BTreeMap<(usize, usize, ValueType, bool), Vec<Slot>> = BTreeMap::new();
    for s in slots {
        tables
            .entry((s.arity, s.category, s.value_type, s.per_frame))
            .or_default()
            .push(s);
    }
    for ((arity, category, value_type, per_frame), slots) in tables {
        let n_rows = rows.get(&(arity, category)).map_or(0, row_count);
        let n_keys = partitions
            .get(&(category, value_type, per_frame))
            .map_or(0, Vec::len);
        let extent = if per_frame {
            Extent::d3(n_rows, n_keys, n_frames)
        } else {
            Extent::d2(n_rows, n_keys)
        };
        let mut t = DenseArray::new(value_type, extent.rank());
        t.resize(&extent)?;
        for s in slots {
            let row = rows
                .get(&(arity, category))
                .and_then(|m| m.get(&s.owner))
                .copied()
                .ok_or_else(|| Error::internal("owner without a row"))?;
            match s.frame {
                Some(f) => t.set(&[row, s.key_index, f], s.value)?,
                None => t.set(&[row, s.key_index], s.value)?,
            }
        }
        let name = names::data_table(arity, &categories[category], value_type, per_frame);
        store.insert(name, t);
    }

    store.mark_clean();
    Ok(store)
}
