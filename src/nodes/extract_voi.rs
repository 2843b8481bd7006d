//! Volume-of-interest node for structured grids.

use crate::algs::extent::{extract_voi, split_extent};
use crate::data::bounds::Extent;
use crate::data::object::{DataKind, DataObject};
use crate::mesh_error::MeshFlowError;
use crate::pipeline::algorithm::{
    Algorithm, InputData, InputInformation, InputKinds, PortSpec, first_input,
};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::information::{Information, UpdateRequest};
use crate::pipeline::options::VoiOptions;

/// Crops a `VolumeGrid` to a volume of interest and optionally subsamples it.
///
/// Upstream is asked only for the cropped extent. At unit sample rate the
/// output keeps the input's index space, so a downstream piece or update
/// extent narrows the upstream request further.
#[derive(Clone, Debug, Default)]
pub struct ExtractVoi {
    options: VoiOptions,
    /// Extent requested upstream during the last negotiation.
    requested: Option<Extent>,
}

impl ExtractVoi {
    pub fn new(options: VoiOptions) -> Self {
        Self {
            options,
            requested: None,
        }
    }

    pub fn options(&self) -> &VoiOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: VoiOptions) {
        self.options = options;
    }

    fn unit_rate(&self) -> bool {
        self.options.sample_rate == [1, 1, 1]
    }

    fn output_whole(&self, input_whole: &Extent) -> Extent {
        let clipped = input_whole.intersect(&self.options.voi);
        if clipped.is_empty() {
            return Extent::EMPTY;
        }
        if self.unit_rate() {
            return clipped;
        }
        let dims = clipped.dimensions();
        let r = self.options.sample_rate;
        Extent::from_dimensions([0, 1, 2].map(|a| (dims[a] - 1) / r[a] + 1))
    }
}

impl Algorithm for ExtractVoi {
    fn name(&self) -> &str {
        "extract voi"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::required("input", &[DataKind::VolumeGrid])]
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
        inputs: &InputInformation,
        outputs: &mut [Information],
    ) -> Result<(), MeshFlowError> {
        self.options.validate()?;
        let out = &mut outputs[0];
        out.clear_metadata();
        if let Some(info) = inputs.first().and_then(|p| p.first()) {
            out.whole_extent = info.whole_extent.map(|w| self.output_whole(&w));
            out.bounds = info.bounds;
        }
        Ok(())
    }

    fn request_update_extent(
        &mut self,
        request: &UpdateRequest,
        inputs: &InputInformation,
        upstream: &mut [Vec<UpdateRequest>],
    ) -> Result<(), MeshFlowError> {
        let Some(whole) = inputs.first().and_then(|p| p.first()).and_then(|i| i.whole_extent)
        else {
            self.requested = None;
            return Ok(());
        };
        let mut extent = whole.intersect(&self.options.voi);
        if self.unit_rate() && !extent.is_empty() {
            let spec = request.piece;
            if let Some(e) = request.update_extent {
                extent = extent.intersect(&e);
            } else if !spec.is_whole() {
                extent = split_extent(&extent, spec.piece, spec.num_pieces, spec.ghost_levels);
            }
        }
        if extent.is_empty() {
            extent = Extent::EMPTY;
        }
        self.requested = Some(extent);
        for conn in upstream[0].iter_mut() {
            *conn = UpdateRequest::whole().with_extent(extent);
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
        let Some(ds) = first_input(inputs, 0).and_then(DataObject::as_dataset) else {
            return Ok(());
        };
        let voi = match self.requested {
            Some(e) if self.unit_rate() => e,
            _ => self.options.voi,
        };
        outputs[0] = extract_voi(ds, &voi, self.options.sample_rate)?.into();
        ctx.checkpoint(1.0);
        Ok(())
    }
}
