//! Collect every rank's piece on one root rank.

use crate::algs::append::append_datasets;
use crate::algs::communicator::{Transport, decode, encode};
use crate::algs::piece::strip_ghosts;
use crate::data::dataset::{Dataset, DatasetKind};
use crate::data::object::{DataKind, DataObject};
use crate::mesh_error::MeshFlowError;
use crate::pipeline::algorithm::{
    Algorithm, InputData, InputInformation, InputKinds, PortSpec, first_input, first_input_kind,
};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::information::UpdateRequest;
use crate::pipeline::options::MergeOptions;

const MERGEABLE: &[DataKind] = &[
    DataKind::PointCloud,
    DataKind::PolygonalSurface,
    DataKind::UnstructuredMesh,
];

/// Each rank asks upstream for piece `rank` of `size`; the root appends all
/// pieces in rank order and every other rank outputs an empty dataset.
///
/// Ghost cells and points are dropped before sending, so the root receives
/// owned cells only and can weld the pieces back together.
///
/// Every rank must update this node for the collective to complete.
pub struct GatherPieces<T: Transport> {
    transport: T,
    root: usize,
    merge: MergeOptions,
}

impl<T: Transport> GatherPieces<T> {
    pub fn new(transport: T, root: usize) -> Self {
        Self {
            transport,
            root,
            merge: MergeOptions::default(),
        }
    }

    pub fn with_merge(mut self, merge: MergeOptions) -> Self {
        self.merge = merge;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn is_root(&self) -> bool {
        self.transport.rank() == self.root
    }
}

impl<T: Transport + 'static> Algorithm for GatherPieces<T> {
    fn name(&self) -> &str {
        "gather pieces"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::required("input", MERGEABLE)]
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
        _inputs: &InputInformation,
        upstream: &mut [Vec<UpdateRequest>],
    ) -> Result<(), MeshFlowError> {
        let piece = UpdateRequest::piece(
            self.transport.rank(),
            self.transport.size(),
            request.piece.ghost_levels,
        );
        for conn in upstream[0].iter_mut() {
            *conn = piece;
        }
        Ok(())
    }

    fn request_data(
        &mut self,
        inputs: &InputData,
        _request: &UpdateRequest,
        outputs: &mut [DataObject],
        ctx: &mut ExecutionContext,
    ) -> Result<(), MeshFlowError> {
        let target = outputs[0]
            .kind()
            .dataset_kind()
            .unwrap_or(DatasetKind::UnstructuredMesh);
        let local = first_input(inputs, 0).and_then(DataObject::as_dataset);
        // ranks with no data still take part in the collective
        let payload = match local {
            Some(ds) => encode(&strip_ghosts(ds.as_ref())?)?,
            None => encode(&Dataset::empty(target))?,
        };
        let Some(gathered) = self.transport.gather(self.root, &payload)? else {
            outputs[0] = Dataset::empty(target).into();
            return Ok(());
        };

        let pieces = gathered
            .iter()
            .map(|bytes| decode::<Dataset>(bytes))
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!(
            "gather pieces: root {} received {} pieces",
            self.root,
            pieces.len()
        );
        let refs: Vec<&Dataset> = pieces.iter().collect();
        outputs[0] = append_datasets(&refs, target, &self.merge, ctx.warnings_mut())?.into();
        ctx.checkpoint(1.0);
        Ok(())
    }
}
