use std::thread;
use std::time::Duration;

use mesh_pipeline::prelude::*;

fn strip(n: usize) -> Dataset {
    let points = (0..=n).map(|i| [i as f64, 0.0, 0.0]).collect();
    let cells = CellArray::from_cells((0..n).map(|i| [i, i + 1]));
    let mut ds = Dataset::unstructured(points, cells, vec![CellType::Segment; n]).unwrap();
    ds.cell_data_mut()
        .insert(DataArray::from_i32("id", 1, (0..n as i32).collect()).unwrap());
    ds
}

/// Run the same producer → piece → gather pipeline on every rank of an
/// in-process group and return each rank's output.
fn run_group(ranks: usize, request: UpdateRequest) -> Vec<DataObject> {
    let exact = MergeOptions {
        merge_points: true,
        tolerance: 0.0,
        tolerance_is_absolute: true,
    };
    thread::scope(|s| {
        let handles: Vec<_> = LocalTransport::group(ranks)
            .into_iter()
            .map(|t| {
                s.spawn(move || {
                    let t = t.with_timeout(Duration::from_secs(10));
                    let mut p = Pipeline::new();
                    let src = p.add(DataProducer::new(strip(12)));
                    let piece = p.add(ExtractPiece::default());
                    let gather = p.add(GatherPieces::new(t, 0).with_merge(exact));
                    p.connect(src, 0, piece, 0).unwrap();
                    p.connect(piece, 0, gather, 0).unwrap();
                    p.update_with(gather, 0, request).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    })
}

#[test]
fn root_reassembles_the_whole_mesh() {
    let outputs = run_group(4, UpdateRequest::whole());
    let root = outputs[0].as_dataset().unwrap();
    assert_eq!(root.num_cells(), 12);
    assert_eq!(root.num_points(), 13);
    // pieces arrive in rank order
    assert_eq!(
        root.cell_data().get("id").unwrap().as_i32().unwrap(),
        (0..12).collect::<Vec<_>>().as_slice()
    );
    for other in &outputs[1..] {
        assert_eq!(other.kind(), DataKind::UnstructuredMesh);
        assert_eq!(other.num_cells(), 0);
    }
}

#[test]
fn ghost_layers_are_dropped_before_welding() {
    let outputs = run_group(4, UpdateRequest::piece(0, 1, 1));
    let root = outputs[0].as_dataset().unwrap();
    assert_eq!(root.num_cells(), 12);
    assert_eq!(root.num_points(), 13);
    assert!(!root.has_ghost_arrays());
    assert_eq!(
        root.cell_data().get("id").unwrap().as_i32().unwrap(),
        (0..12).collect::<Vec<_>>().as_slice()
    );
}

#[test]
fn single_process_gather_is_a_pass_through() {
    let outputs = run_group(1, UpdateRequest::whole());
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].as_dataset().unwrap().as_ref(), &strip(12));
}
