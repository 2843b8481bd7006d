//! The pipeline graph and its demand-driven executive.
//!
//! A [`Pipeline`] owns its nodes in an arena indexed by [`NodeId`]. Calling
//! [`Pipeline::update_with`] on a node walks every node upstream of it four
//! times, in order:
//!
//! 1. **RequestDataObject**: each output port gets an output of the kind the
//!    node reports. An output whose kind changes is replaced by an empty one.
//! 2. **RequestInformation**: output metadata is refreshed from upstream
//!    information and node parameters.
//! 3. **RequestUpdateExtent**: the request travels upstream, consumers first.
//!    Each node may rewrite what its inputs are asked for.
//! 4. **RequestData**: producers first, each node runs unless its output is
//!    already newer than its inputs and parameters, satisfies the same
//!    request, and was not aborted.
//!
//! A node that fails in passes 1 to 3, or with a non-data error in pass 4,
//! fails its branch: its previous output is kept, the error lands in
//! [`Pipeline::failures`], and every consumer sees that input as missing.

use std::any::Any;
use std::collections::BTreeMap;

use hashbrown::{HashMap, HashSet};

use crate::data::object::{DataKind, DataObject};
use crate::mesh_error::{ErrorClass, MeshFlowError};
use crate::pipeline::algorithm::{Algorithm, PortSpec};
use crate::pipeline::context::{AbortHandle, ExecutionContext, ProgressFn, WarningLog};
use crate::pipeline::information::{Information, UpdateRequest};
use crate::pipeline::timestamp::{Clock, TimeStamp};

/// Index of a node inside its [`Pipeline`].
pub type NodeId = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct Link {
    node: NodeId,
    port: usize,
}

#[derive(Debug, Default)]
struct OutputSlot {
    data: Option<DataObject>,
    info: Information,
    time: TimeStamp,
}

struct Node {
    algorithm: Box<dyn Algorithm>,
    ports: Vec<PortSpec>,
    /// `inputs[port]` lists the producers wired to that port, in connection order.
    inputs: Vec<Vec<Link>>,
    outputs: Vec<OutputSlot>,
    /// Last parameter or connection change.
    modified: TimeStamp,
}

impl Node {
    fn name(&self) -> String {
        self.algorithm.name().to_string()
    }
}

/// Outcome of one RequestData visit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Step {
    Skipped,
    Ran,
    Aborted,
}

/// A directed acyclic graph of [`Algorithm`] nodes plus the executive that
/// drives them.
pub struct Pipeline {
    nodes: Vec<Node>,
    clock: Clock,
    abort: AbortHandle,
    progress: Option<ProgressFn>,
    failures: BTreeMap<NodeId, MeshFlowError>,
    warnings: WarningLog,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            clock: Clock::new(),
            abort: AbortHandle::new(),
            progress: None,
            failures: BTreeMap::new(),
            warnings: WarningLog::new(),
        }
    }

    /// Add `algorithm` as a new, unconnected node.
    pub fn add<A: Algorithm>(&mut self, algorithm: A) -> NodeId {
        let ports = algorithm.input_ports();
        let outputs = (0..algorithm.num_output_ports())
            .map(|_| OutputSlot::default())
            .collect();
        let id = self.nodes.len();
        log::debug!("pipeline: added node {id} `{}`", algorithm.name());
        self.nodes.push(Node {
            inputs: vec![Vec::new(); ports.len()],
            ports,
            algorithm: Box::new(algorithm),
            outputs,
            modified: self.clock.tick(),
        });
        id
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn node(&self, id: NodeId) -> Result<&Node, MeshFlowError> {
        self.nodes.get(id).ok_or(MeshFlowError::UnknownNode(id))
    }

    /// Label of node `id`.
    pub fn name(&self, id: NodeId) -> Result<&str, MeshFlowError> {
        Ok(self.node(id)?.algorithm.name())
    }

    /// Wire output `from_port` of `from` into input `to_port` of `to`.
    ///
    /// A non-repeatable port holds one connection; connecting again replaces
    /// it. Repeatable ports append.
    pub fn connect(
        &mut self,
        from: NodeId,
        from_port: usize,
        to: NodeId,
        to_port: usize,
    ) -> Result<(), MeshFlowError> {
        let producer = self.node(from)?;
        if from_port >= producer.outputs.len() {
            return Err(MeshFlowError::NoSuchPort {
                node: producer.name(),
                direction: "output",
                port: from_port,
            });
        }
        let consumer = self.node(to)?;
        let Some(spec) = consumer.ports.get(to_port) else {
            return Err(MeshFlowError::NoSuchPort {
                node: consumer.name(),
                direction: "input",
                port: to_port,
            });
        };
        let repeatable = spec.repeatable;
        if from == to || self.is_upstream(to, from) {
            return Err(MeshFlowError::CycleDetected { from, to });
        }

        let link = Link {
            node: from,
            port: from_port,
        };
        let t = self.clock.tick();
        let node = &mut self.nodes[to];
        if repeatable {
            node.inputs[to_port].push(link);
        } else {
            node.inputs[to_port] = vec![link];
        }
        node.modified = t;
        Ok(())
    }

    /// Remove every connection on input `port` of `to`.
    pub fn disconnect(&mut self, to: NodeId, port: usize) -> Result<(), MeshFlowError> {
        let node = self.node(to)?;
        if port >= node.ports.len() {
            return Err(MeshFlowError::NoSuchPort {
                node: node.name(),
                direction: "input",
                port,
            });
        }
        let t = self.clock.tick();
        let node = &mut self.nodes[to];
        node.inputs[port].clear();
        node.modified = t;
        Ok(())
    }

    /// True when `candidate` feeds `of`, directly or transitively.
    fn is_upstream(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut stack = vec![of];
        let mut seen = HashSet::new();
        while let Some(n) = stack.pop() {
            if !seen.insert(n) {
                continue;
            }
            for link in self.nodes[n].inputs.iter().flatten() {
                if link.node == candidate {
                    return true;
                }
                stack.push(link.node);
            }
        }
        false
    }

    /// Borrow node `id` as its concrete type.
    pub fn algorithm<T: Algorithm>(&self, id: NodeId) -> Result<&T, MeshFlowError> {
        let node = self.node(id)?;
        let any: &dyn Any = &*node.algorithm;
        any.downcast_ref::<T>()
            .ok_or_else(|| MeshFlowError::NodeTypeMismatch(node.name()))
    }

    /// Change the parameters of node `id` through `f` and mark it modified.
    pub fn configure<T: Algorithm, R>(
        &mut self,
        id: NodeId,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, MeshFlowError> {
        let name = self.node(id)?.name();
        let t = self.clock.tick();
        let node = &mut self.nodes[id];
        let any: &mut dyn Any = &mut *node.algorithm;
        let alg = any
            .downcast_mut::<T>()
            .ok_or(MeshFlowError::NodeTypeMismatch(name))?;
        let out = f(alg);
        node.modified = t;
        Ok(out)
    }

    /// Force node `id` to re-execute on the next update.
    pub fn mark_modified(&mut self, id: NodeId) -> Result<(), MeshFlowError> {
        self.node(id)?;
        self.nodes[id].modified = self.clock.tick();
        Ok(())
    }

    /// Handle that cancels the running (or next) update from another thread.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    pub fn set_progress(&mut self, progress: Option<ProgressFn>) {
        self.progress = progress;
    }

    /// Current output of `id` on `port`, if it ever produced one.
    pub fn output(&self, id: NodeId, port: usize) -> Option<&DataObject> {
        self.nodes.get(id)?.outputs.get(port)?.data.as_ref()
    }

    pub fn information(&self, id: NodeId, port: usize) -> Option<&Information> {
        self.nodes.get(id)?.outputs.get(port).map(|s| &s.info)
    }

    /// Modification time of the output on `port`; [`TimeStamp::NEVER`] if it
    /// has not been produced.
    pub fn output_time(&self, id: NodeId, port: usize) -> TimeStamp {
        self.nodes
            .get(id)
            .and_then(|n| n.outputs.get(port))
            .map(|s| s.time)
            .unwrap_or(TimeStamp::NEVER)
    }

    /// Branch failures recorded by the most recent updates, by node.
    pub fn failures(&self) -> &BTreeMap<NodeId, MeshFlowError> {
        &self.failures
    }

    /// Warnings emitted during the most recent update.
    pub fn warnings(&self) -> &WarningLog {
        &self.warnings
    }

    /// Produce the whole of output 0 of `id`: piece 0 of 1, no ghost levels.
    pub fn update(&mut self, id: NodeId) -> Result<DataObject, MeshFlowError> {
        self.update_with(id, 0, UpdateRequest::whole())
    }

    /// Run the four passes so that output `port` of `id` satisfies `request`.
    pub fn update_with(
        &mut self,
        id: NodeId,
        port: usize,
        request: UpdateRequest,
    ) -> Result<DataObject, MeshFlowError> {
        let target = self.node(id)?;
        if port >= target.outputs.len() {
            return Err(MeshFlowError::NoSuchPort {
                node: target.name(),
                direction: "output",
                port,
            });
        }
        request.piece.validate()?;

        let order = self.upstream_order(id);
        for n in &order {
            self.failures.remove(n);
        }
        let mut failed = HashSet::new();
        let mut ctx = ExecutionContext::new(self.abort.clone(), self.progress.clone());
        log::debug!("pipeline: update of node {id} over {} nodes", order.len());

        for &n in &order {
            if let Err(e) = self.request_data_object(n, &failed) {
                self.fail(n, e, &mut failed);
            }
        }
        for &n in &order {
            if failed.contains(&n) {
                continue;
            }
            if let Err(e) = self.request_information(n, &failed) {
                self.fail(n, e, &mut failed);
            }
        }
        let requests = self.request_update_extent(&order, id, request, &mut failed);
        for &n in &order {
            if failed.contains(&n) {
                continue;
            }
            if ctx.is_aborted() {
                log::debug!("pipeline: aborted before node {n}");
                break;
            }
            let req = requests.get(&n).copied().unwrap_or(request);
            match self.request_data(n, &req, &failed, &mut ctx) {
                Ok(Step::Aborted) => {
                    log::debug!("pipeline: node {n} aborted");
                    break;
                }
                Ok(_) => {}
                Err(e) => self.fail(n, e, &mut failed),
            }
        }
        self.warnings = ctx.into_warnings();

        let node = &self.nodes[id];
        if failed.contains(&id) {
            return Err(self
                .failures
                .get(&id)
                .cloned()
                .unwrap_or_else(|| MeshFlowError::UpstreamFailed(node.name())));
        }
        node.outputs[port]
            .data
            .clone()
            .ok_or_else(|| MeshFlowError::UpstreamFailed(node.name()))
    }

    /// Every node `id` depends on, producers before consumers, ending in `id`.
    fn upstream_order(&self, id: NodeId) -> Vec<NodeId> {
        fn visit(nodes: &[Node], n: NodeId, seen: &mut HashSet<NodeId>, out: &mut Vec<NodeId>) {
            if !seen.insert(n) {
                return;
            }
            for link in nodes[n].inputs.iter().flatten() {
                visit(nodes, link.node, seen, out);
            }
            out.push(n);
        }
        let mut out = Vec::new();
        visit(&self.nodes, id, &mut HashSet::new(), &mut out);
        out
    }

    fn fail(&mut self, n: NodeId, e: MeshFlowError, failed: &mut HashSet<NodeId>) {
        log::warn!("pipeline: node {n} `{}` failed: {e}", self.nodes[n].algorithm.name());
        self.failures.insert(n, e);
        failed.insert(n);
    }

    /// Per-port, per-connection view of the producers of `n`; failed
    /// producers map to `None`.
    fn live_inputs<'a>(
        &'a self,
        n: NodeId,
        failed: &'a HashSet<NodeId>,
    ) -> impl Iterator<Item = Vec<Option<&'a OutputSlot>>> + 'a {
        self.nodes[n].inputs.iter().map(move |links| {
            links
                .iter()
                .map(|l| {
                    (!failed.contains(&l.node)).then(|| &self.nodes[l.node].outputs[l.port])
                })
                .collect()
        })
    }

    fn input_information(&self, n: NodeId, failed: &HashSet<NodeId>) -> Vec<Vec<Information>> {
        self.live_inputs(n, failed)
            .map(|conns| {
                conns
                    .into_iter()
                    .map(|s| s.map(|s| s.info.clone()).unwrap_or_default())
                    .collect()
            })
            .collect()
    }

    fn request_data_object(
        &mut self,
        n: NodeId,
        failed: &HashSet<NodeId>,
    ) -> Result<(), MeshFlowError> {
        let kinds: Vec<Vec<Option<DataKind>>> = self
            .live_inputs(n, failed)
            .map(|conns| {
                conns
                    .into_iter()
                    .map(|s| s.and_then(|s| s.data.as_ref()).map(DataObject::kind))
                    .collect()
            })
            .collect();

        let node = &mut self.nodes[n];
        for (p, spec) in node.ports.iter().enumerate() {
            if let Some(&kind) = kinds[p].iter().flatten().find(|&&k| !spec.accepts_kind(k)) {
                return Err(MeshFlowError::UnacceptedInputKind {
                    node: node.name(),
                    port: p,
                    kind,
                });
            }
        }
        for port in 0..node.outputs.len() {
            let kind = node.algorithm.request_data_object(port, &kinds)?;
            let slot = &mut node.outputs[port];
            if slot.data.as_ref().map(DataObject::kind) != Some(kind) {
                log::debug!("pipeline: node {n} port {port} now produces {kind:?}");
                slot.data = Some(DataObject::empty(kind));
                slot.info.last_request = None;
                slot.info.data_complete = false;
            }
            slot.info.data_kind = Some(kind);
        }
        Ok(())
    }

    fn request_information(
        &mut self,
        n: NodeId,
        failed: &HashSet<NodeId>,
    ) -> Result<(), MeshFlowError> {
        let inputs = self.input_information(n, failed);
        let node = &mut self.nodes[n];
        let mut infos: Vec<Information> = node.outputs.iter().map(|s| s.info.clone()).collect();
        node.algorithm.request_information(&inputs, &mut infos)?;
        for (slot, mut info) in node.outputs.iter_mut().zip(infos) {
            info.data_kind = slot.info.data_kind;
            info.last_request = slot.info.last_request;
            info.data_complete = slot.info.data_complete;
            slot.info = info;
        }
        Ok(())
    }

    /// Walk consumers first, collecting the request each node must satisfy.
    /// A producer feeding several consumers serves the first one that asks.
    fn request_update_extent(
        &mut self,
        order: &[NodeId],
        target: NodeId,
        request: UpdateRequest,
        failed: &mut HashSet<NodeId>,
    ) -> HashMap<NodeId, UpdateRequest> {
        let mut requests = HashMap::new();
        requests.insert(target, request);
        for &n in order.iter().rev() {
            if failed.contains(&n) {
                continue;
            }
            let Some(req) = requests.get(&n).copied() else {
                continue;
            };
            let inputs = self.input_information(n, failed);
            let node = &mut self.nodes[n];
            let mut upstream: Vec<Vec<UpdateRequest>> =
                node.inputs.iter().map(|links| vec![req; links.len()]).collect();
            if let Err(e) = node
                .algorithm
                .request_update_extent(&req, &inputs, &mut upstream)
            {
                self.fail(n, e, failed);
                continue;
            }
            for (links, reqs) in self.nodes[n].inputs.iter().zip(&upstream) {
                for (link, r) in links.iter().zip(reqs) {
                    let entry = requests.entry(link.node).or_insert(*r);
                    if entry != r {
                        log::debug!(
                            "pipeline: node {} already serves {entry:?}; ignoring {r:?} from node {n}",
                            link.node
                        );
                    }
                }
            }
        }
        requests
    }

    fn request_data(
        &mut self,
        n: NodeId,
        req: &UpdateRequest,
        failed: &HashSet<NodeId>,
        ctx: &mut ExecutionContext,
    ) -> Result<Step, MeshFlowError> {
        let mut any_missing = false;
        let mut newest = self.nodes[n].modified;
        let inputs: Vec<Vec<Option<DataObject>>> = self
            .live_inputs(n, failed)
            .map(|conns| {
                conns
                    .into_iter()
                    .map(|s| match s {
                        Some(s) => {
                            newest = newest.max(s.time);
                            s.data.clone()
                        }
                        None => {
                            any_missing = true;
                            None
                        }
                    })
                    .collect()
            })
            .collect();

        let node = &mut self.nodes[n];
        let name = node.name();
        let fresh = !any_missing
            && node.outputs.iter().all(|s| {
                s.time != TimeStamp::NEVER
                    && s.time >= newest
                    && s.info.last_request.as_ref() == Some(req)
                    && s.info.data_complete
            });
        if fresh {
            log::info!("pipeline: node {n} `{name}` is up to date; skipping");
            return Ok(Step::Skipped);
        }

        for (p, spec) in node.ports.iter().enumerate() {
            if !spec.optional && inputs[p].iter().all(Option::is_none) {
                ctx.warn(format!("{name}: required input `{}` is missing", spec.name));
            }
        }

        let kinds: Vec<DataKind> = node
            .outputs
            .iter()
            .map(|s| {
                s.info
                    .data_kind
                    .ok_or_else(|| MeshFlowError::UpstreamFailed(name.clone()))
            })
            .collect::<Result<_, _>>()?;
        let mut outputs: Vec<DataObject> = node
            .outputs
            .iter()
            .zip(&kinds)
            .map(|(s, &k)| s.data.clone().unwrap_or_else(|| DataObject::empty(k)))
            .collect();

        ctx.enter(n);
        log::debug!("pipeline: node {n} `{name}` RequestData {req:?}");
        match node.algorithm.request_data(&inputs, req, &mut outputs, ctx) {
            Ok(()) => {
                for (port, (out, &expected)) in outputs.iter().zip(&kinds).enumerate() {
                    if out.kind() != expected {
                        return Err(MeshFlowError::IncompatibleOutputKind {
                            node: name,
                            port,
                            expected,
                            found: Some(out.kind()),
                        });
                    }
                }
            }
            Err(e) if e.class() == ErrorClass::Data => {
                ctx.warn(format!("{name}: {e}; output left empty"));
                outputs = kinds.iter().map(|&k| DataObject::empty(k)).collect();
            }
            Err(e) => return Err(e),
        }

        let aborted = ctx.is_aborted();
        let t = self.clock.tick();
        for (slot, out) in self.nodes[n].outputs.iter_mut().zip(outputs) {
            slot.data = Some(out);
            slot.time = t;
            slot.info.last_request = Some(*req);
            slot.info.data_complete = !aborted;
        }
        Ok(if aborted { Step::Aborted } else { Step::Ran })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::Dataset;
    use crate::pipeline::algorithm::{InputData, InputKinds, first_input};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Emits a point cloud of `n` points and counts its executions.
    struct Points {
        n: usize,
        runs: Arc<AtomicUsize>,
    }

    impl Algorithm for Points {
        fn name(&self) -> &str {
            "points"
        }

        fn request_data_object(&mut self, _: usize, _: &InputKinds) -> Result<DataKind, MeshFlowError> {
            Ok(DataKind::PointCloud)
        }

        fn request_data(
            &mut self,
            _: &InputData,
            _: &UpdateRequest,
            outputs: &mut [DataObject],
            _: &mut ExecutionContext,
        ) -> Result<(), MeshFlowError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            outputs[0] = Dataset::point_cloud(vec![[0.0; 3]; self.n]).into();
            Ok(())
        }
    }

    /// Passes its input through, or fails with a configured error.
    struct Relay {
        error: Option<MeshFlowError>,
        runs: Arc<AtomicUsize>,
    }

    impl Algorithm for Relay {
        fn name(&self) -> &str {
            "relay"
        }

        fn input_ports(&self) -> Vec<PortSpec> {
            vec![PortSpec::required("input", &[])]
        }

        fn request_data_object(&mut self, _: usize, _: &InputKinds) -> Result<DataKind, MeshFlowError> {
            Ok(DataKind::PointCloud)
        }

        fn request_data(
            &mut self,
            inputs: &InputData,
            _: &UpdateRequest,
            outputs: &mut [DataObject],
            _: &mut ExecutionContext,
        ) -> Result<(), MeshFlowError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            if let Some(e) = self.error.clone() {
                return Err(e);
            }
            if let Some(d) = first_input(inputs, 0) {
                outputs[0] = d.clone();
            }
            Ok(())
        }
    }

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn chain(error: Option<MeshFlowError>) -> (Pipeline, NodeId, NodeId, Arc<AtomicUsize>) {
        let mut p = Pipeline::new();
        let runs = counter();
        let src = p.add(Points {
            n: 3,
            runs: runs.clone(),
        });
        let relay = p.add(Relay {
            error,
            runs: counter(),
        });
        p.connect(src, 0, relay, 0).unwrap();
        (p, src, relay, runs)
    }

    #[test]
    fn unchanged_pipeline_is_not_recomputed() {
        let (mut p, _, relay, runs) = chain(None);
        let first = p.update(relay).unwrap();
        let t = p.output_time(relay, 0);
        let second = p.update(relay).unwrap();
        assert!(first.ptr_eq(&second));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(p.output_time(relay, 0), t);
        assert_eq!(second.num_points(), 3);
    }

    #[test]
    fn parameter_change_recomputes() {
        let (mut p, src, relay, runs) = chain(None);
        p.update(relay).unwrap();
        p.configure::<Points, _>(src, |s| s.n = 5).unwrap();
        assert_eq!(p.update(relay).unwrap().num_points(), 5);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn different_request_recomputes() {
        let (mut p, _, relay, runs) = chain(None);
        p.update(relay).unwrap();
        p.update_with(relay, 0, UpdateRequest::piece(1, 2, 0)).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
        let info = p.information(relay, 0).unwrap();
        assert_eq!(info.last_request, Some(UpdateRequest::piece(1, 2, 0)));
    }

    #[test]
    fn configure_checks_the_concrete_type() {
        let (mut p, src, _, _) = chain(None);
        let err = p.configure::<Relay, _>(src, |_| ()).unwrap_err();
        assert_eq!(err, MeshFlowError::NodeTypeMismatch("points".into()));
        assert_eq!(p.algorithm::<Points>(src).unwrap().n, 3);
    }

    #[test]
    fn cycles_are_rejected() {
        let (mut p, src, relay, _) = chain(None);
        let other = p.add(Relay {
            error: None,
            runs: counter(),
        });
        p.connect(relay, 0, other, 0).unwrap();
        assert!(matches!(
            p.connect(other, 0, relay, 0),
            Err(MeshFlowError::CycleDetected { .. })
        ));
        assert!(matches!(
            p.connect(relay, 0, relay, 0),
            Err(MeshFlowError::CycleDetected { .. })
        ));
        assert!(matches!(
            p.connect(src, 3, other, 0),
            Err(MeshFlowError::NoSuchPort { .. })
        ));
    }

    #[test]
    fn data_errors_leave_an_empty_output() {
        let (mut p, _, relay, _) = chain(Some(MeshFlowError::MissingArray("rho".into())));
        let out = p.update(relay).unwrap();
        assert_eq!(out.kind(), DataKind::PointCloud);
        assert_eq!(out.num_points(), 0);
        assert_eq!(p.warnings().len(), 1);
        assert!(p.failures().is_empty());
    }

    #[test]
    fn consistency_errors_keep_the_previous_output() {
        let (mut p, _, relay, _) = chain(None);
        let good = p.update(relay).unwrap();
        let t = p.output_time(relay, 0);
        p.configure::<Relay, _>(relay, |r| r.error = Some(MeshFlowError::StructureMismatch))
            .unwrap();
        assert_eq!(p.update(relay), Err(MeshFlowError::StructureMismatch));
        assert!(p.output(relay, 0).unwrap().ptr_eq(&good));
        assert_eq!(p.output_time(relay, 0), t);
        assert!(p.failures().contains_key(&relay));
    }

    #[test]
    fn failed_branch_reads_as_missing_input() {
        let (mut p, src, relay, _) = chain(Some(MeshFlowError::StructureMismatch));
        let consumer = p.add(Relay {
            error: None,
            runs: counter(),
        });
        let sibling = p.add(Relay {
            error: None,
            runs: counter(),
        });
        p.connect(relay, 0, consumer, 0).unwrap();
        p.connect(src, 0, sibling, 0).unwrap();

        let out = p.update(consumer).unwrap();
        assert_eq!(out.num_points(), 0);
        assert!(p.failures().contains_key(&relay));
        assert!(p.warnings().messages()[0].contains("missing"));
        assert_eq!(p.update(sibling).unwrap().num_points(), 3);
    }

    #[test]
    fn aborted_runs_are_incomplete_and_rerun() {
        let (mut p, _, relay, runs) = chain(None);
        let handle = p.abort_handle();
        handle.abort();
        p.update(relay).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        handle.reset();
        p.update(relay).unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(p.information(relay, 0).unwrap().data_complete);
    }
}
