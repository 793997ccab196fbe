//! Record containers written under the historical schema.

mod common;

use common::{child_by_name, child_names, init_tracing, temp_path};
use rmf::backend::record::{self, container, legacy, schema};
use rmf::prelude::*;

/// Bytes of a historical container holding a small two-frame trajectory.
fn legacy_bytes() -> Vec<u8> {
    let mut data = SharedData::create_in_buffer().unwrap();
    data.set_description("written by an older producer\n").unwrap();
    let residue = data.add_child(NodeId::ROOT, "residue", NodeType::Representation).unwrap();
    let atom = data.add_child(residue, "CA", NodeType::Representation).unwrap();
    let c = data.get_category("physics").unwrap();
    let mass = data.get_key::<FloatTraits>(c, "mass").unwrap();
    let x = data.get_key::<Vector3Traits>(c, "coordinates").unwrap();
    data.set_static_value(atom, mass, 12.0).unwrap();
    data.add_frame("f0").unwrap();
    data.set_value(atom, x, glam::Vec3::new(0.0, 0.0, 1.0)).unwrap();
    data.add_frame("f1").unwrap();
    data.set_value(atom, x, glam::Vec3::new(0.0, 0.0, 2.0)).unwrap();

    let store = record::decode_store(&data.to_buffer().unwrap()).unwrap();
    let frames = record::export(&store)
        .unwrap()
        .into_iter()
        .map(legacy::downgrade_frame)
        .collect::<Result<Vec<_>>>()
        .unwrap();
    legacy::encode_container(&frames).unwrap()
}

fn check_trajectory(data: &mut SharedData) {
    assert_eq!(data.get_description(), "written by an older producer\n");
    assert_eq!(child_names(data, NodeId::ROOT), vec!["residue"]);
    let residue = child_by_name(data, NodeId::ROOT, "residue").unwrap();
    let atom = child_by_name(data, residue, "CA").unwrap();

    let c = data.get_category("physics").unwrap();
    let mass = data.get_key::<FloatTraits>(c, "mass").unwrap();
    let x = data.get_key::<Vector3Traits>(c, "coordinates").unwrap();
    assert_eq!(data.get_static_value(atom, mass).unwrap(), 12.0);
    assert!(data.get_is_per_frame(x).unwrap());
    assert_eq!(data.get_number_of_frames(), 2);
    assert_eq!(data.get_frame_name(FrameId(1)).unwrap(), "f1");
    assert_eq!(
        data.get_all_values(atom, x).unwrap(),
        vec![glam::Vec3::new(0.0, 0.0, 1.0), glam::Vec3::new(0.0, 0.0, 2.0)]
    );
}

#[test]
fn test_legacy_container_opens() {
    init_tracing();
    let bytes = legacy_bytes();
    let (schema_id, _) = container::read_schema_id(&bytes).unwrap();
    assert_eq!(schema_id, legacy::SCHEMA_ID);

    let (_dir, path) = temp_path("old.rmfz");
    std::fs::write(&path, &bytes).unwrap();

    let mut data = SharedData::open_read_only(&path).unwrap();
    assert_eq!(data.backend_kind(), BackendKind::Record);
    check_trajectory(&mut data);
    data.close().unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), bytes);
}

/// A historical container decodes to the same tables as the current encoding
/// of the same content.
#[test]
fn test_legacy_decodes_like_current() {
    init_tracing();
    let old = record::decode_store(&legacy_bytes()).unwrap();
    let current = record::encode_store(&old).unwrap();
    let new = record::decode_store(&current).unwrap();

    let mut names = old.table_names();
    names.sort();
    let mut new_names = new.table_names();
    new_names.sort();
    assert_eq!(names, new_names);
    for name in &names {
        assert_eq!(old.table(name).unwrap(), new.table(name).unwrap(), "table {name}");
    }
    assert_eq!(old.attributes(), new.attributes());
}

#[test]
fn test_legacy_container_is_rewritten_on_change() {
    init_tracing();
    let (_dir, path) = temp_path("old.rmfz");
    std::fs::write(&path, legacy_bytes()).unwrap();

    {
        let mut data = SharedData::open(&path).unwrap();
        data.set_producer("upgraded\n").unwrap();
        data.close().unwrap();
    }
    let bytes = std::fs::read(&path).unwrap();
    let (schema_id, _) = container::read_schema_id(&bytes).unwrap();
    assert_eq!(schema_id, schema::SCHEMA_ID);

    let mut data = SharedData::open(&path).unwrap();
    check_trajectory(&mut data);
    assert_eq!(data.get_producer(), "upgraded\n");
}

#[test]
fn test_legacy_buffer_opens() {
    init_tracing();
    let mut data = SharedData::open_buffer(&legacy_bytes()).unwrap();
    check_trajectory(&mut data);
}

#[test]
fn test_links_cannot_be_downgraded() {
    init_tracing();
    let mut data = SharedData::create_in_buffer().unwrap();
    let a = data.add_child(NodeId::ROOT, "a", NodeType::Representation).unwrap();
    data.add_child_link(NodeId::ROOT, a).unwrap();

    let store = record::decode_store(&data.to_buffer().unwrap()).unwrap();
    let downgraded: Result<Vec<_>> = record::export(&store)
        .unwrap()
        .into_iter()
        .map(legacy::downgrade_frame)
        .collect();
    assert!(downgraded.unwrap_err().is_usage());
}
