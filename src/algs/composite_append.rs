//! Append-by-structure: merge N composite trees leaf by leaf.

use std::sync::Arc;

use itertools::Itertools;

use crate::algs::append::{MergeOptions, accepts, append_datasets};
use crate::data::composite::CompositeDataset;
use crate::data::dataset::Dataset;
use crate::debug_invariants::DebugInvariants;
use crate::mesh_error::MeshFlowError;
use crate::pipeline::context::WarningLog;

/// Merge `inputs`, which must share one tree shape, into a tree of that shape.
///
/// At every leaf the first input holding data decides the kind. Mergeable
/// kinds are appended across all inputs present at that leaf; grids and
/// tables are shared from the first input. Leaves whose inputs cannot be
/// combined stay empty and produce one warning per distinct combination.
/// Inputs whose shape differs from the first are excluded with a warning.
pub fn append_composites(
    inputs: &[&CompositeDataset],
    opts: &MergeOptions,
    warnings: &mut WarningLog,
) -> Result<CompositeDataset, MeshFlowError> {
    let Some(first) = inputs.first() else {
        return Ok(CompositeDataset::new());
    };
    let mut sources: Vec<&CompositeDataset> = Vec::with_capacity(inputs.len());
    for (i, c) in inputs.iter().enumerate() {
        if !first.has_same_shape(c) {
            warnings.warn(format!(
                "composite append: input {i} has a different block structure; excluded"
            ));
            continue;
        }
        c.validate_invariants()?;
        sources.push(c);
    }

    // leaf-major table: leaves[s][i] is input s at leaf i
    let leaves: Vec<Vec<Option<&Arc<Dataset>>>> = sources
        .iter()
        .map(|c| c.leaves().map(|l| l.data).collect())
        .collect();

    let mut merged = Vec::with_capacity(first.num_leaves());
    for i in 0..first.num_leaves() {
        let present: Vec<&Arc<Dataset>> = leaves.iter().filter_map(|l| l[i]).collect();
        merged.push(merge_leaf(i, &present, opts, warnings)?);
    }

    let mut out = first.copy_structure();
    out.set_leaves(merged)?;
    Ok(out)
}

fn merge_leaf(
    index: usize,
    present: &[&Arc<Dataset>],
    opts: &MergeOptions,
    warnings: &mut WarningLog,
) -> Result<Option<Arc<Dataset>>, MeshFlowError> {
    let Some(head) = present.first() else {
        return Ok(None);
    };
    let kind = head.kind();
    if !kind.is_mergeable() {
        return Ok(Some(Arc::clone(head)));
    }
    if present.len() == 1 {
        return Ok(Some(Arc::clone(head)));
    }
    if present.iter().any(|d| !accepts(kind, d.kind())) {
        let kinds = present.iter().map(|d| format!("{:?}", d.kind())).unique().join(", ");
        warnings.warn(format!(
            "composite append: cannot merge leaf kinds [{kinds}]; leaf left empty"
        ));
        log::debug!("composite append: leaf {index} left empty");
        return Ok(None);
    }
    let refs: Vec<&Dataset> = present.iter().map(|d| Arc::as_ref(d)).collect();
    let out = append_datasets(&refs, kind, opts, warnings)?;
    Ok(Some(Arc::new(out)))
}
