//! Node splitting its input into one piece, with optional ghost layers.

use std::sync::Arc;

use crate::algs::ghost::{PieceSelector, PieceSpec};
use crate::algs::piece::extract_piece_with_links;
use crate::data::composite::CompositeDataset;
use crate::data::dataset::Dataset;
use crate::data::object::{DataKind, DataObject};
use crate::mesh_error::MeshFlowError;
use crate::pipeline::algorithm::{
    Algorithm, InputData, InputInformation, InputKinds, PortSpec, first_input, first_input_kind,
};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::information::UpdateRequest;
use crate::pipeline::options::PieceOptions;
use crate::topology::cache::{InvalidateCache, LinksCache};

/// Extracts the requested piece of a point cloud, surface, mesh, or every
/// leaf of a composite.
///
/// The piece comes from the downstream request when that asks for a split,
/// otherwise from [`PieceOptions`]. The input is always requested whole.
/// Grids are not cut here: the request is forwarded so the grid producer
/// emits the piece's extent.
#[derive(Default)]
pub struct ExtractPiece {
    options: PieceOptions,
    selector: Option<Arc<dyn PieceSelector>>,
    links: LinksCache,
}

impl ExtractPiece {
    pub fn new(options: PieceOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn options(&self) -> &PieceOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: PieceOptions) {
        self.options = options;
    }

    /// Replace the contiguous-bucket test with `selector`.
    pub fn set_selector(&mut self, selector: Option<Arc<dyn PieceSelector>>) {
        self.selector = selector;
        self.links.invalidate_cache();
    }

    fn effective_spec(&self, request: &UpdateRequest) -> PieceSpec {
        if request.piece.is_whole() && request.piece.ghost_levels == 0 {
            self.options.spec()
        } else {
            request.piece
        }
    }

    fn extract(
        &mut self,
        ds: &Arc<Dataset>,
        spec: &PieceSpec,
    ) -> Result<Dataset, MeshFlowError> {
        let links = ds.has_cell_topology().then(|| self.links.get(ds));
        extract_piece_with_links(
            ds,
            links.as_deref(),
            spec,
            self.selector.as_deref(),
            self.options.extract_options(),
        )
    }

    fn extract_composite(
        &mut self,
        input: &CompositeDataset,
        spec: &PieceSpec,
        ctx: &ExecutionContext,
    ) -> Result<Option<CompositeDataset>, MeshFlowError> {
        let n = input.num_leaves().max(1);
        let mut leaves = Vec::with_capacity(input.num_leaves());
        for leaf in input.leaves() {
            if ctx.checkpoint(leaf.index as f64 / n as f64) {
                return Ok(None);
            }
            let piece = match leaf.data {
                Some(ds) => Some(Arc::new(self.extract(ds, spec)?)),
                None => None,
            };
            leaves.push(piece);
        }
        let mut out = input.copy_structure();
        out.set_leaves(leaves)?;
        Ok(Some(out))
    }
}

impl Algorithm for ExtractPiece {
    fn name(&self) -> &str {
        "extract piece"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::required("input", &[])]
    }

    fn request_data_object(
        &mut self,
        _port: usize,
        inputs: &InputKinds,
    ) -> Result<DataKind, MeshFlowError> {
        Ok(first_input_kind(inputs, 0).unwrap_or(DataKind::UnstructuredMesh))
    }

    fn request_update_extent(
        &mut self,
        request: &UpdateRequest,
        inputs: &InputInformation,
        upstream: &mut [Vec<UpdateRequest>],
    ) -> Result<(), MeshFlowError> {
        let spec = self.effective_spec(request);
        for (conn, info) in upstream[0].iter_mut().zip(&inputs[0]) {
            *conn = if info.whole_extent.is_some() {
                UpdateRequest {
                    piece: spec,
                    update_extent: request.update_extent,
                }
            } else {
                UpdateRequest::whole()
            };
        }
        Ok(())
    }

    fn request_data(
        &mut self,
        inputs: &InputData,
        request: &UpdateRequest,
        outputs: &mut [DataObject],
        ctx: &mut ExecutionContext,
    ) -> Result<(), MeshFlowError> {
        let Some(input) = first_input(inputs, 0) else {
            return Ok(());
        };
        let spec = self.effective_spec(request);
        spec.validate()?;
        outputs[0] = match input {
            DataObject::Dataset(ds) if ds.has_regular_grid() => input.clone(),
            DataObject::Dataset(ds) => self.extract(ds, &spec)?.into(),
            DataObject::Composite(c) => match self.extract_composite(c, &spec, ctx)? {
                Some(out) => out.into(),
                None => return Ok(()),
            },
        };
        ctx.checkpoint(1.0);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::cell_array::CellArray;
    use crate::nodes::producer::DataProducer;
    use crate::pipeline::executive::Pipeline;
    use crate::topology::cell_type::CellType;

    fn strip(n: usize) -> Dataset {
        let points = (0..=n).map(|i| [i as f64, 0.0, 0.0]).collect();
        let cells = CellArray::from_cells((0..n).map(|i| [i, i + 1]));
        Dataset::unstructured(points, cells, vec![CellType::Segment; n]).unwrap()
    }

    #[test]
    fn request_piece_overrides_options() {
        let mut p = Pipeline::new();
        let src = p.add(DataProducer::new(strip(10)));
        let piece = p.add(ExtractPiece::new(PieceOptions {
            piece: 0,
            num_pieces: 5,
            ..PieceOptions::default()
        }));
        p.connect(src, 0, piece, 0).unwrap();

        assert_eq!(p.update(piece).unwrap().num_cells(), 2);
        let out = p.update_with(piece, 0, UpdateRequest::piece(1, 2, 1)).unwrap();
        assert_eq!(out.num_cells(), 6);
        let ds = out.as_dataset().unwrap();
        assert!(ds.has_ghost_arrays());
    }

    #[test]
    fn links_are_reused_across_pieces() {
        let mut p = Pipeline::new();
        let src = p.add(DataProducer::new(strip(4)));
        let piece = p.add(ExtractPiece::default());
        p.connect(src, 0, piece, 0).unwrap();
        p.update_with(piece, 0, UpdateRequest::piece(0, 2, 0)).unwrap();
        p.update_with(piece, 0, UpdateRequest::piece(1, 2, 0)).unwrap();
        let input = p.output(src, 0).unwrap().as_dataset().unwrap().clone();
        assert!(p.algorithm::<ExtractPiece>(piece).unwrap().links.is_cached_for(&input));
    }

    #[test]
    fn composite_leaves_are_split_independently() {
        let mut c = CompositeDataset::new();
        c.push_leaf("a", Some(strip(4)));
        c.push_leaf("b", None);
        c.push_leaf("c", Some(strip(2)));
        let mut p = Pipeline::new();
        let src = p.add(DataProducer::new(c));
        let piece = p.add(ExtractPiece::default());
        p.connect(src, 0, piece, 0).unwrap();
        let out = p.update_with(piece, 0, UpdateRequest::piece(1, 2, 0)).unwrap();
        let tree = out.as_composite().unwrap();
        assert_eq!(tree.leaf(0).unwrap().num_cells(), 2);
        assert!(tree.leaf(1).is_none());
        assert_eq!(tree.leaf(2).unwrap().num_cells(), 1);
    }

    #[test]
    fn missing_input_leaves_an_empty_mesh() {
        let mut p = Pipeline::new();
        let piece = p.add(ExtractPiece::default());
        let out = p.update(piece).unwrap();
        assert_eq!(out.kind(), DataKind::UnstructuredMesh);
        assert_eq!(out.num_cells(), 0);
        assert_eq!(p.warnings().len(), 1);
    }
}
