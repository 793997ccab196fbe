//! Values of every type written, persisted and read back.

mod common;

use common::{child_by_name, init_tracing, temp_path};
use glam::{Vec3, Vec4};
use rmf::prelude::*;

/// One static value of every type on `atom`, plus a per-frame float.
fn fill(data: &mut SharedData) -> Result<()> {
    let atom = data.add_child(NodeId::ROOT, "atom", NodeType::Representation)?;
    let other = data.add_child(NodeId::ROOT, "other", NodeType::Representation)?;
    let c = data.get_category("everything")?;

    let k = data.get_key::<IntTraits>(c, "int")?;
    data.set_static_value(atom, k, -7)?;
    let k = data.get_key::<FloatTraits>(c, "float")?;
    data.set_static_value(atom, k, 0.125)?;
    let k = data.get_key::<IndexTraits>(c, "index")?;
    data.set_static_value(atom, k, 3)?;
    let k = data.get_key::<NodeIdTraits>(c, "node")?;
    data.set_static_value(atom, k, other)?;
    let k = data.get_key::<StringTraits>(c, "string")?;
    data.set_static_value(atom, k, "carbon".to_string())?;
    let k = data.get_key::<IntsTraits>(c, "ints")?;
    data.set_static_value(atom, k, vec![1, 2, 3])?;
    let k = data.get_key::<FloatsTraits>(c, "floats")?;
    data.set_static_value(atom, k, vec![0.5, -0.5])?;
    let k = data.get_key::<StringsTraits>(c, "strings")?;
    data.set_static_value(atom, k, vec!["a".to_string(), "bc".to_string()])?;
    let k = data.get_key::<Vector3Traits>(c, "vector3")?;
    data.set_static_value(atom, k, Vec3::new(1.0, 2.0, 3.0))?;
    let k = data.get_key::<Vector4Traits>(c, "vector4")?;
    data.set_static_value(atom, k, Vec4::new(1.0, 2.0, 3.0, 4.0))?;
    let k = data.get_key::<Vector3sTraits>(c, "vector3s")?;
    data.set_static_value(atom, k, vec![Vec3::X, Vec3::Y])?;
    let k = data.get_key::<Vector4sTraits>(c, "vector4s")?;
    data.set_static_value(atom, k, vec![Vec4::W])?;

    let x = data.get_key::<FloatTraits>(c, "x")?;
    data.set_current_frame(FrameId(0))?;
    data.set_value(other, x, 10.0)?;
    data.set_current_frame(FrameId(1))?;
    data.set_value(other, x, 11.0)?;
    data.set_current_frame(FrameId::ALL_FRAMES)
}

fn check(data: &mut SharedData) {
    let atom = child_by_name(data, NodeId::ROOT, "atom").expect("atom missing");
    let other = child_by_name(data, NodeId::ROOT, "other").expect("other missing");
    let c = data.get_category("everything").unwrap();

    let k = data.get_key::<IntTraits>(c, "int").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), -7);
    let k = data.get_key::<FloatTraits>(c, "float").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), 0.125);
    let k = data.get_key::<IndexTraits>(c, "index").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), 3);
    let k = data.get_key::<NodeIdTraits>(c, "node").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), other);
    let k = data.get_key::<StringTraits>(c, "string").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), "carbon");
    let k = data.get_key::<IntsTraits>(c, "ints").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), vec![1, 2, 3]);
    let k = data.get_key::<FloatsTraits>(c, "floats").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), vec![0.5, -0.5]);
    let k = data.get_key::<StringsTraits>(c, "strings").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), vec!["a", "bc"]);
    let k = data.get_key::<Vector3Traits>(c, "vector3").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), Vec3::new(1.0, 2.0, 3.0));
    let k = data.get_key::<Vector4Traits>(c, "vector4").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), Vec4::new(1.0, 2.0, 3.0, 4.0));
    let k = data.get_key::<Vector3sTraits>(c, "vector3s").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), vec![Vec3::X, Vec3::Y]);
    let k = data.get_key::<Vector4sTraits>(c, "vector4s").unwrap();
    assert_eq!(data.get_value(atom, k).unwrap(), vec![Vec4::W]);

    // Other owners and frames stay null.
    let k = data.get_key::<IntTraits>(c, "int").unwrap();
    assert_eq!(data.get_value(other, k).unwrap(), i32::MAX);
    let x = data.get_key::<FloatTraits>(c, "x").unwrap();
    assert_eq!(data.get_all_values(other, x).unwrap(), vec![10.0, 11.0]);
    assert_eq!(data.get_all_values(atom, x).unwrap(), vec![f32::MAX, f32::MAX]);
    assert_eq!(data.get_static_value(other, x).unwrap(), f32::MAX);
}

#[test]
fn test_roundtrip_in_memory() {
    init_tracing();
    let mut data = SharedData::create_in_buffer().unwrap();
    fill(&mut data).unwrap();
    check(&mut data);
    data.flush().unwrap();
    check(&mut data);
    data.reload().unwrap();
    check(&mut data);
}

#[test]
fn test_roundtrip_files() {
    init_tracing();
    for name in ["values.rmf", "values.rmfz"] {
        let (_dir, path) = temp_path(name);
        let mut data = SharedData::create(&path).unwrap();
        fill(&mut data).unwrap();
        check(&mut data);

        data.reload().unwrap();
        check(&mut data);
        data.close().unwrap();

        let mut data = SharedData::open(&path).unwrap();
        check(&mut data);
        let mut data = SharedData::open_read_only(&path).unwrap();
        check(&mut data);
    }
}

#[test]
fn test_roundtrip_buffer_encoding() {
    init_tracing();
    let (_dir, path) = temp_path("source.rmf");
    let mut data = SharedData::create(&path).unwrap();
    fill(&mut data).unwrap();
    let bytes = data.to_buffer().unwrap();
    data.close().unwrap();

    let mut back = SharedData::open_buffer(&bytes).unwrap();
    assert_eq!(back.backend_kind(), BackendKind::Buffer);
    check(&mut back);
}

#[test]
fn test_uncompressed_dense_file() {
    init_tracing();
    let (_dir, path) = temp_path("plain.rmf");
    let options = OpenOptions::new().compression(0).use_mmap(false);
    let mut data = SharedData::create_with(&path, options).unwrap();
    fill(&mut data).unwrap();
    data.close().unwrap();

    let mut data = SharedData::open_with(&path, OpenOptions::new().use_mmap(false)).unwrap();
    check(&mut data);
}

/// Presized per-frame tables read the same as tables grown frame by frame.
#[test]
fn test_frames_hint() {
    init_tracing();
    let (_dir, path) = temp_path("hinted.rmf");
    let mut data = SharedData::create_with(&path, OpenOptions::new().frames_hint(8)).unwrap();
    let atom = data.add_child(NodeId::ROOT, "atom", NodeType::Representation).unwrap();
    let c = data.get_category("physics").unwrap();
    let x = data.get_key::<FloatTraits>(c, "x").unwrap();
    for f in 0..3 {
        data.add_frame("").unwrap();
        data.set_value(atom, x, f as f32).unwrap();
    }
    data.close().unwrap();

    let mut data = SharedData::open(&path).unwrap();
    let frames = data.get_number_of_frames();
    assert!(frames >= 3);
    let values = data.get_all_values(atom, x).unwrap();
    assert_eq!(&values[..3], &[0.0, 1.0, 2.0]);
    assert!(values[3..].iter().all(|v| *v == f32::MAX));
}
