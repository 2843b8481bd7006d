use std::collections::BTreeSet;
use std::sync::Arc;

use mesh_pipeline::pipeline::WarningLog;
use mesh_pipeline::prelude::*;
use proptest::prelude::*;

fn quad_surface(points: Vec<[f64; 3]>) -> Dataset {
    let polys = CellArray::from_cells([[0, 1, 2, 3]]);
    let cells = PolyCells::from_classes(CellArray::new(), CellArray::new(), polys, CellArray::new());
    Dataset::polygonal(points, cells).unwrap()
}

fn welded() -> MergeOptions {
    MergeOptions {
        merge_points: true,
        tolerance: 1e-5,
        tolerance_is_absolute: true,
    }
}

fn tri_mesh() -> Dataset {
    let mut ds = Dataset::unstructured(
        vec![[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 1.0, 0.0]],
        CellArray::from_cells([[0, 1, 2], [1, 3, 2]]),
        vec![CellType::Triangle; 2],
    )
    .unwrap();
    ds.point_data_mut().insert_with_role(
        DataArray::from_f64("pressure", 1, vec![1.0, 2.0, 3.0, 4.0]).unwrap(),
        AttributeRole::Scalars,
    );
    ds.cell_data_mut()
        .insert(DataArray::from_i32("material", 1, vec![7, 8]).unwrap());
    ds
}

#[test]
fn single_input_merge_is_a_structural_copy() {
    let ds = tri_mesh();
    let out = append_datasets(
        &[&ds],
        DatasetKind::UnstructuredMesh,
        &MergeOptions::default(),
        &mut WarningLog::new(),
    )
    .unwrap();
    assert_eq!(out, ds);
    assert_eq!(out.point_data().role_name(AttributeRole::Scalars), Some("pressure"));
}

#[test]
fn dedup_round_trip() {
    let ds = tri_mesh();
    let exact = MergeOptions {
        merge_points: true,
        tolerance: 0.0,
        tolerance_is_absolute: true,
    };
    let mut log = WarningLog::new();
    let merged = append_datasets(&[&ds, &ds], DatasetKind::UnstructuredMesh, &exact, &mut log).unwrap();
    assert_eq!(merged.num_points(), ds.num_points());
    assert_eq!(merged.num_cells(), 2 * ds.num_cells());

    let plain = append_datasets(
        &[&ds, &ds],
        DatasetKind::UnstructuredMesh,
        &MergeOptions::default(),
        &mut log,
    )
    .unwrap();
    assert_eq!(plain.num_points(), 2 * ds.num_points());
    assert_eq!(
        plain.cell_data().get("material").unwrap().as_i32().unwrap(),
        &[7, 8, 7, 8]
    );
}

#[test]
fn two_quads_sharing_an_edge_weld_into_six_points() {
    let a = quad_surface(vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
    let b = quad_surface(vec![
        [1.0 + 4e-7, 0.0, 0.0],
        [2.0, 0.0, 0.0],
        [2.0, 1.0, 0.0],
        [1.0, 1.0 - 6e-7, 0.0],
    ]);
    let out = append_datasets(
        &[&a, &b],
        DatasetKind::PolygonalSurface,
        &welded(),
        &mut WarningLog::new(),
    )
    .unwrap();
    assert_eq!(out.num_points(), 6);
    assert_eq!(out.num_cells(), 2);
    assert_eq!(out.cell_points(1).unwrap(), &[1, 4, 5, 2]);
}

#[test]
fn arrays_missing_from_one_input_are_dropped() {
    let mut a = quad_surface(vec![[0.0; 3], [1.0, 0.0, 0.0], [1.0, 1.0, 0.0], [0.0, 1.0, 0.0]]);
    a.point_data_mut()
        .insert(DataArray::from_f64("temperature", 1, vec![20.0; 4]).unwrap());
    let b = quad_surface(vec![[5.0, 0.0, 0.0], [6.0, 0.0, 0.0], [6.0, 1.0, 0.0], [5.0, 1.0, 0.0]]);
    let out = append_datasets(
        &[&a, &b],
        DatasetKind::PolygonalSurface,
        &MergeOptions::default(),
        &mut WarningLog::new(),
    )
    .unwrap();
    assert!(out.point_data().is_empty());
    assert_eq!(out.num_points(), 8);
}

#[test]
fn empty_inputs_do_not_suppress_shared_arrays() {
    let ds = tri_mesh();
    let empty = Dataset::empty(DatasetKind::UnstructuredMesh);
    let out = append_datasets(
        &[&empty, &ds, &empty],
        DatasetKind::UnstructuredMesh,
        &MergeOptions::default(),
        &mut WarningLog::new(),
    )
    .unwrap();
    assert!(out.point_data().get("pressure").is_some());
    let none = append_datasets(
        &[&empty],
        DatasetKind::UnstructuredMesh,
        &MergeOptions::default(),
        &mut WarningLog::new(),
    )
    .unwrap();
    assert!(none.is_empty());
}

#[test]
fn composite_merge_shares_pass_through_leaves() {
    let table = Arc::new(Dataset::table(3));
    let tree = |mesh: Dataset| {
        CompositeDataset::from_nodes(vec![
            CompositeNode::leaf("mesh", Some(Arc::new(mesh))),
            CompositeNode::block("meta", vec![CompositeNode::leaf("table", Some(table.clone()))]),
        ])
    };
    let a = tree(tri_mesh());
    let b = tree(tri_mesh());
    let out = append_composites(&[&a, &b], &MergeOptions::default(), &mut WarningLog::new())
        .unwrap();
    assert!(out.is_structurally_compatible(&a));
    assert_eq!(out.leaf(0).unwrap().num_cells(), 4);
    assert!(Arc::ptr_eq(out.leaf(1).unwrap(), &table));
}

const NAMES: [&str; 5] = ["a", "b", "c", "d", "e"];

/// One attribute set drawn from a fixed pool; `b` comes in two incompatible
/// flavours so some sources disagree on it.
fn attribute_set(mask: u8, b_is_int: bool) -> AttributeSet {
    let mut set = AttributeSet::new();
    for (i, name) in NAMES.iter().enumerate() {
        if mask & (1 << i) == 0 {
            continue;
        }
        let (ty, components) = match *name {
            "b" if b_is_int => (ElementType::I32, 3),
            "b" => (ElementType::F64, 3),
            "c" => (ElementType::U8, 1),
            _ => (ElementType::F64, 1),
        };
        set.insert(DataArray::zeros(*name, ty, components, 2));
    }
    set
}

proptest! {
    #[test]
    fn ledger_survivors_ignore_source_order(
        sources in prop::collection::vec((any::<u8>(), any::<bool>()), 2..6)
            .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle())),
    ) {
        let (original, shuffled) = sources;
        let survivors = |list: &[(u8, bool)]| {
            let sets: Vec<AttributeSet> =
                list.iter().map(|&(m, b)| attribute_set(m, b)).collect();
            let ledger = FieldLedger::build(sets.iter().map(|s| (s, 2)));
            ledger.names().map(str::to_string).collect::<BTreeSet<_>>()
        };
        prop_assert_eq!(survivors(&original), survivors(&shuffled));
    }
}
