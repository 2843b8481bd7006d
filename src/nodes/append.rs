//! Merge nodes: geometry append and append-by-structure.

use std::sync::Arc;

use crate::algs::append::append_datasets;
use crate::algs::composite_append::append_composites;
use crate::data::bounds::Bounds;
use crate::data::composite::CompositeDataset;
use crate::data::dataset::Dataset;
use crate::data::object::{DataKind, DataObject};
use crate::mesh_error::MeshFlowError;
use crate::pipeline::algorithm::{
    Algorithm, InputData, InputInformation, InputKinds, PortSpec, first_input_kind,
    input_composites, input_datasets,
};
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::information::{Information, UpdateRequest};
use crate::pipeline::options::{AppendOptions, MergeOptions};

const MERGEABLE: &[DataKind] = &[
    DataKind::PointCloud,
    DataKind::PolygonalSurface,
    DataKind::UnstructuredMesh,
];

fn union_bounds(infos: &[Information]) -> Option<Bounds> {
    infos
        .iter()
        .filter_map(|i| i.bounds)
        .reduce(|a, b| a.union(&b))
}

fn warn_missing(ctx: &mut ExecutionContext, name: &str, present: usize, inputs: &InputData) {
    let total = inputs.first().map_or(0, Vec::len);
    if present > 0 && present < total {
        ctx.warn(format!("{name}: {} of {total} inputs are missing", total - present));
    }
}

/// Concatenates any number of point clouds, surfaces and meshes, optionally
/// welding coincident points.
#[derive(Clone, Debug, Default)]
pub struct AppendDatasets {
    options: AppendOptions,
}

impl AppendDatasets {
    pub fn new(options: AppendOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &AppendOptions {
        &self.options
    }

    pub fn set_options(&mut self, options: AppendOptions) {
        self.options = options;
    }
}

impl Algorithm for AppendDatasets {
    fn name(&self) -> &str {
        "append datasets"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::required("input", MERGEABLE).repeatable()]
    }

    fn request_data_object(
        &mut self,
        port: usize,
        inputs: &InputKinds,
    ) -> Result<DataKind, MeshFlowError> {
        match self.options.output_kind {
            Some(kind) if kind.is_mergeable() => Ok(kind.into()),
            Some(kind) => Err(MeshFlowError::IncompatibleOutputKind {
                node: self.name().to_string(),
                port,
                expected: kind.into(),
                found: None,
            }),
            None => Ok(first_input_kind(inputs, 0).unwrap_or(DataKind::UnstructuredMesh)),
        }
    }

    fn request_information(
        &mut self,
        inputs: &InputInformation,
        outputs: &mut [Information],
    ) -> Result<(), MeshFlowError> {
        let out = &mut outputs[0];
        out.clear_metadata();
        out.bounds = inputs.first().and_then(|infos| union_bounds(infos));
        Ok(())
    }

    fn request_data(
        &mut self,
        inputs: &InputData,
        _request: &UpdateRequest,
        outputs: &mut [DataObject],
        ctx: &mut ExecutionContext,
    ) -> Result<(), MeshFlowError> {
        let sources = input_datasets(inputs, 0);
        warn_missing(ctx, self.name(), sources.len(), inputs);
        let Some(target) = outputs[0].kind().dataset_kind() else {
            return Ok(());
        };
        let refs: Vec<&Dataset> = sources.iter().map(|d| Arc::as_ref(d)).collect();
        let merged = append_datasets(&refs, target, &self.options.merge, ctx.warnings_mut())?;
        outputs[0] = merged.into();
        ctx.checkpoint(1.0);
        Ok(())
    }
}

/// Merges composite trees of identical shape leaf by leaf.
#[derive(Clone, Debug, Default)]
pub struct AppendComposite {
    options: MergeOptions,
}

impl AppendComposite {
    pub fn new(options: MergeOptions) -> Self {
        Self { options }
    }

    pub fn set_options(&mut self, options: MergeOptions) {
        self.options = options;
    }
}

impl Algorithm for AppendComposite {
    fn name(&self) -> &str {
        "append composite"
    }

    fn input_ports(&self) -> Vec<PortSpec> {
        vec![PortSpec::required("input", &[DataKind::Composite]).repeatable()]
    }

    fn request_data_object(
        &mut self,
        _port: usize,
        _inputs: &InputKinds,
    ) -> Result<DataKind, MeshFlowError> {
        Ok(DataKind::Composite)
    }

    fn request_information(
        &mut self,
        inputs: &InputInformation,
        outputs: &mut [Information],
    ) -> Result<(), MeshFlowError> {
        let out = &mut outputs[0];
        out.clear_metadata();
        let Some(infos) = inputs.first() else {
            return Ok(());
        };
        out.bounds = union_bounds(infos);
        if let Some(first) = infos.first() {
            out.leaf_bounds = first.leaf_bounds.clone();
            for info in &infos[1..] {
                if info.leaf_bounds.len() != out.leaf_bounds.len() {
                    continue;
                }
                for (dst, src) in out.leaf_bounds.iter_mut().zip(&info.leaf_bounds) {
                    *dst = match (*dst, *src) {
                        (Some(a), Some(b)) => Some(a.union(&b)),
                        (a, b) => a.or(b),
                    };
                }
            }
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
        let sources = input_composites(inputs, 0);
        warn_missing(ctx, self.name(), sources.len(), inputs);
        let refs: Vec<&CompositeDataset> = sources.iter().map(|c| Arc::as_ref(c)).collect();
        let merged = append_composites(&refs, &self.options, ctx.warnings_mut())?;
        outputs[0] = merged.into();
        ctx.checkpoint(1.0);
        Ok(())
    }
}
