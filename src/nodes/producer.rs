//! Source node emitting a fixed data object.

use crate::algs::extent::{extract_voi, mark_grid_ghosts, split_extent};
use crate::data::object::{DataKind, DataObject};
use crate::mesh_error::MeshFlowError;
use crate::pipeline::algorithm::{Algorithm, InputData, InputInformation, InputKinds};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::information::{Information, UpdateRequest};

/// Hands a caller-supplied dataset or composite to the pipeline.
///
/// A grid output honours a requested update extent by cropping, and a piece
/// request by cutting the slab [`split_extent`] assigns to it, padding
/// included. Every other kind is emitted whole and split downstream.
#[derive(Clone, Debug)]
pub struct DataProducer {
    name: String,
    data: DataObject,
}

impl DataProducer {
    pub fn new(data: impl Into<DataObject>) -> Self {
        Self {
            name: "producer".into(),
            data: data.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn data(&self) -> &DataObject {
        &self.data
    }

    /// Replace the emitted object. Call through `Pipeline::configure` so the
    /// node is marked modified.
    pub fn set_data(&mut self, data: impl Into<DataObject>) {
        self.data = data.into();
    }
}

impl Algorithm for DataProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn request_data_object(
        &mut self,
        _port: usize,
        _inputs: &InputKinds,
    ) -> Result<DataKind, MeshFlowError> {
        Ok(self.data.kind())
    }

    fn request_information(
        &mut self,
        _inputs: &InputInformation,
        outputs: &mut [Information],
    ) -> Result<(), MeshFlowError> {
        let out = &mut outputs[0];
        out.clear_metadata();
        out.bounds = Some(self.data.bounds());
        match &self.data {
            DataObject::Dataset(ds) => out.whole_extent = ds.grid().map(|g| g.extent),
            DataObject::Composite(c) => out.leaf_bounds = c.leaf_bounds(),
        }
        Ok(())
    }

    fn request_data(
        &mut self,
        _inputs: &InputData,
        request: &UpdateRequest,
        outputs: &mut [DataObject],
        _ctx: &mut ExecutionContext,
    ) -> Result<(), MeshFlowError> {
        let DataObject::Dataset(ds) = &self.data else {
            outputs[0] = self.data.clone();
            return Ok(());
        };
        let Some(g) = ds.grid() else {
            outputs[0] = self.data.clone();
            return Ok(());
        };
        let spec = request.piece;
        outputs[0] = match request.update_extent {
            Some(extent) if g.extent != extent => extract_voi(ds, &extent, [1, 1, 1])?.into(),
            Some(_) => self.data.clone(),
            None if spec.is_whole() => self.data.clone(),
            None => {
                let whole = g.extent;
                let padded = split_extent(&whole, spec.piece, spec.num_pieces, spec.ghost_levels);
                let mut piece = extract_voi(ds, &padded, [1, 1, 1])?;
                if spec.ghost_levels > 0 && !piece.is_empty() {
                    let owned = split_extent(&whole, spec.piece, spec.num_pieces, 0);
                    mark_grid_ghosts(&mut piece, &owned)?;
                }
                log::debug!(
                    "{}: piece {}/{} of held grid has extent {:?}",
                    self.name,
                    spec.piece,
                    spec.num_pieces,
                    padded.0
                );
                piece.into()
            }
        };
        Ok(())
    }
}
