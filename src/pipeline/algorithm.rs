//! The node contract.
//!
//! A pipeline node implements [`Algorithm`]: it declares its ports and
//! answers the four executive passes. Only `request_data_object` and
//! `request_data` are mandatory; the other passes default to copying
//! upstream information and forwarding the downstream request unchanged.

use std::any::Any;
use std::sync::Arc;

use crate::data::composite::CompositeDataset;
use crate::data::dataset::Dataset;
use crate::data::object::{DataKind, DataObject};
use crate::mesh_error::MeshFlowError;
use crate::pipeline::context::ExecutionContext;
use crate::pipeline::information::{Information, UpdateRequest};

/// Declaration of one input port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortSpec {
    pub name: &'static str,
    /// Kinds this port accepts; empty accepts anything.
    pub accepts: &'static [DataKind],
    /// Whether the node can run without a connection here.
    pub optional: bool,
    /// Whether the port takes any number of connections.
    pub repeatable: bool,
}

impl PortSpec {
    pub const fn required(name: &'static str, accepts: &'static [DataKind]) -> Self {
        Self {
            name,
            accepts,
            optional: false,
            repeatable: false,
        }
    }

    pub const fn optional(name: &'static str, accepts: &'static [DataKind]) -> Self {
        Self {
            name,
            accepts,
            optional: true,
            repeatable: false,
        }
    }

    pub const fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn accepts_kind(&self, kind: DataKind) -> bool {
        self.accepts.is_empty() || self.accepts.contains(&kind)
    }
}

/// Input kinds seen in RequestDataObject: `[port][connection]`, `None` for a
/// connection whose producer failed.
pub type InputKinds = [Vec<Option<DataKind>>];

/// Upstream information seen in RequestInformation / RequestUpdateExtent:
/// `[port][connection]`.
pub type InputInformation = [Vec<Information>];

/// Input data seen in RequestData: `[port][connection]`, `None` for a missing
/// or failed producer.
pub type InputData = [Vec<Option<DataObject>>];

/// A pipeline node.
pub trait Algorithm: Any {
    /// Label used in logs and error messages.
    fn name(&self) -> &str;

    fn input_ports(&self) -> Vec<PortSpec> {
        Vec::new()
    }

    fn num_output_ports(&self) -> usize {
        1
    }

    /// Pass 1: the kind of data output `port` will hold.
    fn request_data_object(
        &mut self,
        port: usize,
        inputs: &InputKinds,
    ) -> Result<DataKind, MeshFlowError>;

    /// Pass 2: describe the outputs from upstream information and
    /// parameters only.
    fn request_information(
        &mut self,
        inputs: &InputInformation,
        outputs: &mut [Information],
    ) -> Result<(), MeshFlowError> {
        copy_first_input_information(inputs, outputs);
        Ok(())
    }

    /// Pass 3: adjust what each upstream connection is asked for.
    /// `upstream` arrives pre-filled with a copy of `request`.
    fn request_update_extent(
        &mut self,
        _request: &UpdateRequest,
        _inputs: &InputInformation,
        _upstream: &mut [Vec<UpdateRequest>],
    ) -> Result<(), MeshFlowError> {
        Ok(())
    }

    /// Pass 4: produce the outputs.
    fn request_data(
        &mut self,
        inputs: &InputData,
        request: &UpdateRequest,
        outputs: &mut [DataObject],
        ctx: &mut ExecutionContext,
    ) -> Result<(), MeshFlowError>;
}

/// Default RequestInformation: every output mirrors the first connection of
/// the first input port.
pub fn copy_first_input_information(inputs: &InputInformation, outputs: &mut [Information]) {
    let first = inputs.first().and_then(|p| p.first());
    for out in outputs {
        match first {
            Some(src) => out.copy_metadata_from(src),
            None => out.clear_metadata(),
        }
    }
}

/// First present data object on `port`.
pub fn first_input(inputs: &InputData, port: usize) -> Option<&DataObject> {
    inputs.get(port)?.iter().flatten().next()
}

/// Every present dataset on `port`, in connection order.
pub fn input_datasets(inputs: &InputData, port: usize) -> Vec<&Arc<Dataset>> {
    inputs
        .get(port)
        .map(|conns| conns.iter().flatten().filter_map(DataObject::as_dataset).collect())
        .unwrap_or_default()
}

/// Every present composite on `port`, in connection order.
pub fn input_composites(inputs: &InputData, port: usize) -> Vec<&Arc<CompositeDataset>> {
    inputs
        .get(port)
        .map(|conns| conns.iter().flatten().filter_map(DataObject::as_composite).collect())
        .unwrap_or_default()
}

/// Kind of the first known input on `port`.
pub fn first_input_kind(inputs: &InputKinds, port: usize) -> Option<DataKind> {
    inputs.get(port)?.iter().flatten().next().copied()
}

/// True when no connection on `port` delivered data.
pub fn input_missing(inputs: &InputData, port: usize) -> bool {
    first_input(inputs, port).is_none()
}
