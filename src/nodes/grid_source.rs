//! Structured grid source that produces exactly the requested extent.

use std::sync::Arc;

use crate::algs::extent::{mark_grid_ghosts, split_extent};
use crate::data::array::DataArray;
use crate::data::attributes::AttributeRole;
use crate::data::bounds::Extent;
use crate::data::dataset::{Dataset, GridGeometry};
use crate::data::object::{DataKind, DataObject};
use crate::mesh_error::MeshFlowError;
use crate::pipeline::algorithm::{Algorithm, InputData, InputInformation, InputKinds};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::information::{Information, UpdateRequest};

/// Scalar sampled at every grid point.
pub type FieldFn = Arc<dyn Fn([f64; 3]) -> f64 + Send + Sync>;

/// Emits a `VolumeGrid` over a fixed whole extent.
///
/// An explicit update extent is produced as asked. Otherwise the piece in
/// the request is turned into a slab with [`split_extent`], padded by the
/// requested ghost layers, and the padding is marked with `ghost_level`
/// arrays.
pub struct GridSource {
    geometry: GridGeometry,
    field: Option<(String, FieldFn)>,
}

impl GridSource {
    pub fn new(whole: Extent) -> Self {
        Self {
            geometry: GridGeometry::new(whole),
            field: None,
        }
    }

    pub fn with_geometry(mut self, origin: [f64; 3], spacing: [f64; 3]) -> Self {
        self.geometry.origin = origin;
        self.geometry.spacing = spacing;
        self
    }

    /// Sample `f` at every point into a scalar array called `name`.
    pub fn with_field(mut self, name: impl Into<String>, f: FieldFn) -> Self {
        self.field = Some((name.into(), f));
        self
    }

    pub fn whole_extent(&self) -> Extent {
        self.geometry.extent
    }

    pub fn set_whole_extent(&mut self, whole: Extent) {
        self.geometry.extent = whole;
    }
}

impl Algorithm for GridSource {
    fn name(&self) -> &str {
        "grid source"
    }

    fn request_data_object(
        &mut self,
        _port: usize,
        _inputs: &InputKinds,
    ) -> Result<DataKind, MeshFlowError> {
        Ok(DataKind::VolumeGrid)
    }

    fn request_information(
        &mut self,
        _inputs: &InputInformation,
        outputs: &mut [Information],
    ) -> Result<(), MeshFlowError> {
        let out = &mut outputs[0];
        out.clear_metadata();
        out.whole_extent = Some(self.geometry.extent);
        out.bounds = Some(self.geometry.bounds());
        Ok(())
    }

    fn request_data(
        &mut self,
        _inputs: &InputData,
        request: &UpdateRequest,
        outputs: &mut [DataObject],
        ctx: &mut ExecutionContext,
    ) -> Result<(), MeshFlowError> {
        let whole = self.geometry.extent;
        let spec = request.piece;
        let extent = match request.update_extent {
            Some(e) => e.intersect(&whole),
            None => split_extent(&whole, spec.piece, spec.num_pieces, spec.ghost_levels),
        };
        let extent = if extent.is_empty() { Extent::EMPTY } else { extent };
        let mut ds = Dataset::volume_grid(GridGeometry {
            extent,
            ..self.geometry
        });

        if let Some((name, f)) = &self.field {
            let geometry = ds.grid().copied().unwrap_or(self.geometry);
            let n = ds.num_points();
            let mut values = Vec::with_capacity(n);
            for i in 0..n {
                if i % 4096 == 0 && ctx.checkpoint(i as f64 / n as f64) {
                    return Ok(());
                }
                values.push(geometry.point(i).map_or(0.0, |p| f(p)));
            }
            ds.point_data_mut()
                .insert_with_role(DataArray::from_f64(name.as_str(), 1, values)?, AttributeRole::Scalars);
        }

        if request.update_extent.is_none() && spec.ghost_levels > 0 && !extent.is_empty() {
            let owned = split_extent(&whole, spec.piece, spec.num_pieces, 0);
            mark_grid_ghosts(&mut ds, &owned)?;
        }
        log::debug!("grid source: produced extent {:?}", extent.0);
        outputs[0] = ds.into();
        Ok(())
    }
}
