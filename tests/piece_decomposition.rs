use mesh_pipeline::prelude::*;
use proptest::prelude::*;

/// `nx` × `ny` quads on the unit lattice.
fn quad_grid(nx: usize, ny: usize) -> Dataset {
    let mut points = Vec::with_capacity((nx + 1) * (ny + 1));
    for j in 0..=ny {
        for i in 0..=nx {
            points.push([i as f64, j as f64, 0.0]);
        }
    }
    let row = nx + 1;
    let mut cells = CellArray::new();
    for j in 0..ny {
        for i in 0..nx {
            let p = i + j * row;
            cells.push(&[p, p + 1, p + 1 + row, p + row]);
        }
    }
    Dataset::unstructured(points, cells, vec![CellType::Quadrilateral; nx * ny]).unwrap()
}

fn strip(n: usize) -> Dataset {
    let points = (0..=n).map(|i| [i as f64, 0.0, 0.0]).collect();
    let cells = CellArray::from_cells((0..n).map(|i| [i, i + 1]));
    Dataset::unstructured(points, cells, vec![CellType::Segment; n]).unwrap()
}

#[test]
fn ten_cells_two_pieces() {
    let ds = strip(10);
    let classifier = GhostClassifier::new(&ds);

    let p0 = classifier.classify(&PieceSpec::new(0, 2, 0), None).unwrap();
    let p1 = classifier.classify(&PieceSpec::new(1, 2, 0), None).unwrap();
    assert_eq!(p0.kept_cells(), vec![0, 1, 2, 3, 4]);
    assert_eq!(p1.kept_cells(), vec![5, 6, 7, 8, 9]);

    let g = classifier.classify(&PieceSpec::new(0, 2, 1), None).unwrap();
    assert_eq!(g.kept_cells(), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(g.cells[5], 1);
    assert!(g.cells[..5].iter().all(|&t| t == 0));
    assert!(g.cells[6..].iter().all(|&t| t == -1));
}

#[test]
fn extracted_pieces_carry_ghost_arrays() {
    let ds = strip(10);
    let piece = extract_piece(&ds, &PieceSpec::new(1, 2, 2), None, ExtractOptions::default())
        .unwrap();
    assert_eq!(piece.num_cells(), 7);
    let ghosts = piece.cell_data().get(GHOST_ARRAY_NAME).unwrap().as_u8().unwrap();
    // first-use order keeps the input cell order: 3, 4, then owned 5..10
    assert_eq!(ghosts, &[2, 1, 0, 0, 0, 0, 0]);
    piece.validate_invariants().unwrap();
}

#[test]
fn custom_selector_replaces_buckets() {
    let ds = strip(6);
    let even = |cell: usize| cell % 2 == 0;
    let tags = GhostClassifier::new(&ds)
        .classify(&PieceSpec::new(0, 2, 0), Some(&even as &dyn PieceSelector))
        .unwrap();
    assert_eq!(tags.kept_cells(), vec![0, 2, 4]);
}

#[test]
fn all_pieces_reassemble_the_input() {
    let ds = quad_grid(4, 3);
    let pieces = extract_all_pieces(&ds, 5, 0, ExtractOptions::default()).unwrap();
    let refs: Vec<&Dataset> = pieces.iter().collect();
    let opts = MergeOptions {
        merge_points: true,
        tolerance: 0.0,
        tolerance_is_absolute: true,
    };
    let mut warnings = mesh_pipeline::pipeline::WarningLog::new();
    let merged = append_datasets(&refs, DatasetKind::UnstructuredMesh, &opts, &mut warnings).unwrap();
    assert_eq!(merged.num_cells(), ds.num_cells());
    assert_eq!(merged.num_points(), ds.num_points());
    assert!(warnings.is_empty());
}

proptest! {
    #[test]
    fn level_zero_pieces_partition_the_cells(nx in 1usize..7, ny in 1usize..5, count in 1usize..9) {
        let ds = quad_grid(nx, ny);
        let classifier = GhostClassifier::new(&ds);
        let mut owners = vec![0usize; ds.num_cells()];
        for piece in 0..count {
            let tags = classifier.classify(&PieceSpec::new(piece, count, 0), None).unwrap();
            prop_assert!(tags.cells.iter().all(|&t| t == 0 || t == -1));
            for c in tags.kept_cells() {
                owners[c] += 1;
            }
        }
        prop_assert!(owners.iter().all(|&n| n == 1));
    }

    #[test]
    fn ghost_sets_grow_with_the_level(
        nx in 1usize..7,
        ny in 1usize..5,
        count in 1usize..5,
        piece_seed in 0usize..64,
    ) {
        let ds = quad_grid(nx, ny);
        let piece = piece_seed % count;
        let classifier = GhostClassifier::new(&ds);
        let mut previous = classifier.classify(&PieceSpec::new(piece, count, 0), None).unwrap();
        for level in 1..4usize {
            let tags = classifier.classify(&PieceSpec::new(piece, count, level), None).unwrap();
            for (c, (&before, &now)) in previous.cells.iter().zip(&tags.cells).enumerate() {
                if before >= 0 {
                    prop_assert_eq!(now, before, "cell {} changed tag", c);
                }
                prop_assert!(now <= level as i32);
            }
            for (&before, &now) in previous.points.iter().zip(&tags.points) {
                if before >= 0 {
                    prop_assert!(now >= 0 && now <= before);
                }
            }
            previous = tags;
        }
    }
}
