use mesh_pipeline::prelude::*;
use serde::Deserialize;

/// A driver's configuration file: only the fields it sets are required.
#[derive(Deserialize)]
struct DriverConfig {
    #[serde(default)]
    piece: PieceOptions,
    #[serde(default)]
    append: AppendOptions,
    request: UpdateRequest,
}

fn strip(n: usize) -> Dataset {
    let points = (0..=n).map(|i| [i as f64, 0.0, 0.0]).collect();
    let cells = CellArray::from_cells((0..n).map(|i| [i, i + 1]));
    Dataset::unstructured(points, cells, vec![CellType::Segment; n]).unwrap()
}

#[test]
fn pipeline_built_from_json() {
    let cfg: DriverConfig = serde_json::from_str(
        r#"{
            "piece": { "piece": 1, "num_pieces": 3, "ghost_levels": 1 },
            "append": { "output_kind": "PointCloud", "merge_points": true },
            "request": { "piece": 0, "num_pieces": 1 }
        }"#,
    )
    .unwrap();
    assert_eq!(cfg.request, UpdateRequest::whole());

    let mut p = Pipeline::new();
    let src = p.add(DataProducer::new(strip(9)));
    let piece = p.add(ExtractPiece::new(cfg.piece));
    let append = p.add(AppendDatasets::new(cfg.append));
    p.connect(src, 0, piece, 0).unwrap();
    p.connect(piece, 0, append, 0).unwrap();

    let out = p.update_with(append, 0, cfg.request).unwrap();
    assert_eq!(out.kind(), DataKind::PointCloud);
    // cells 2..=6 (owned 3..6 plus one ghost each side) touch points 2..=7
    assert_eq!(out.num_points(), 6);
    assert_eq!(out.num_cells(), 0);
}

#[test]
fn request_round_trips_through_json() {
    let req = UpdateRequest::piece(2, 5, 1).with_extent(Extent::new(0, 3, 0, 3, 0, 0));
    let text = serde_json::to_string(&req).unwrap();
    assert!(text.contains("\"num_pieces\":5"));
    let back: UpdateRequest = serde_json::from_str(&text).unwrap();
    assert_eq!(back, req);
}

#[test]
fn a_non_mergeable_output_kind_fails_negotiation() {
    let append: AppendOptions = serde_json::from_str(r#"{ "output_kind": "Table" }"#).unwrap();
    let mut p = Pipeline::new();
    let src = p.add(DataProducer::new(strip(2)));
    let node = p.add(AppendDatasets::new(append));
    p.connect(src, 0, node, 0).unwrap();
    let err = p.update(node).unwrap_err();
    assert!(matches!(err, MeshFlowError::IncompatibleOutputKind { .. }));
    assert_eq!(err.class(), ErrorClass::Negotiation);
}
