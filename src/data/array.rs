//! Typed attribute arrays.
//!
//! A [`DataArray`] is a named, tuple-major buffer of one scalar element type.
//! Every tuple has `components` values; the number of tuples is the number of
//! points (or cells, or rows) the array is attached to.

use serde::{Deserialize, Serialize};

use crate::mesh_error::MeshFlowError;

/// Scalar element type tag for attribute arrays.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    F64,
    F32,
    I64,
    I32,
    U64,
    U8,
}

impl ElementType {
    /// Returns a stable string label for the element type.
    pub fn as_str(self) -> &'static str {
        match self {
            ElementType::F64 => "f64",
            ElementType::F32 => "f32",
            ElementType::I64 => "i64",
            ElementType::I32 => "i32",
            ElementType::U64 => "u64",
            ElementType::U8 => "u8",
        }
    }

    /// Parse an element type from a string label.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "f64" => Some(ElementType::F64),
            "f32" => Some(ElementType::F32),
            "i64" => Some(ElementType::I64),
            "i32" => Some(ElementType::I32),
            "u64" => Some(ElementType::U64),
            "u8" => Some(ElementType::U8),
            _ => None,
        }
    }
}

/// Tagged value buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ArrayValues {
    F64(Vec<f64>),
    F32(Vec<f32>),
    I64(Vec<i64>),
    I32(Vec<i32>),
    U64(Vec<u64>),
    U8(Vec<u8>),
}

/// Apply the same expression to whichever vector a tagged buffer holds.
macro_rules! with_values {
    ($values:expr, $v:ident => $body:expr) => {
        match $values {
            ArrayValues::F64($v) => $body,
            ArrayValues::F32($v) => $body,
            ArrayValues::I64($v) => $body,
            ArrayValues::I32($v) => $body,
            ArrayValues::U64($v) => $body,
            ArrayValues::U8($v) => $body,
        }
    };
}

/// Same as `with_values!`, for two buffers that must share a variant.
macro_rules! with_value_pair {
    ($dst:expr, $src:expr, ($d:ident, $s:ident) => $body:expr, $mismatch:expr) => {
        match ($dst, $src) {
            (ArrayValues::F64($d), ArrayValues::F64($s)) => $body,
            (ArrayValues::F32($d), ArrayValues::F32($s)) => $body,
            (ArrayValues::I64($d), ArrayValues::I64($s)) => $body,
            (ArrayValues::I32($d), ArrayValues::I32($s)) => $body,
            (ArrayValues::U64($d), ArrayValues::U64($s)) => $body,
            (ArrayValues::U8($d), ArrayValues::U8($s)) => $body,
            _ => $mismatch,
        }
    };
}

impl ArrayValues {
    /// Zero-filled buffer of `len` values.
    pub fn zeros(ty: ElementType, len: usize) -> Self {
        match ty {
            ElementType::F64 => ArrayValues::F64(vec![0.0; len]),
            ElementType::F32 => ArrayValues::F32(vec![0.0; len]),
            ElementType::I64 => ArrayValues::I64(vec![0; len]),
            ElementType::I32 => ArrayValues::I32(vec![0; len]),
            ElementType::U64 => ArrayValues::U64(vec![0; len]),
            ElementType::U8 => ArrayValues::U8(vec![0; len]),
        }
    }

    /// Element type tag of the buffer.
    pub fn element_type(&self) -> ElementType {
        match self {
            ArrayValues::F64(_) => ElementType::F64,
            ArrayValues::F32(_) => ElementType::F32,
            ArrayValues::I64(_) => ElementType::I64,
            ArrayValues::I32(_) => ElementType::I32,
            ArrayValues::U64(_) => ElementType::U64,
            ArrayValues::U8(_) => ElementType::U8,
        }
    }

    /// Number of scalar values (not tuples).
    pub fn len(&self) -> usize {
        with_values!(self, v => v.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value `i` widened to `f64`.
    pub fn get_f64(&self, i: usize) -> Option<f64> {
        match self {
            ArrayValues::F64(v) => v.get(i).copied(),
            ArrayValues::F32(v) => v.get(i).map(|&x| x as f64),
            ArrayValues::I64(v) => v.get(i).map(|&x| x as f64),
            ArrayValues::I32(v) => v.get(i).map(|&x| x as f64),
            ArrayValues::U64(v) => v.get(i).map(|&x| x as f64),
            ArrayValues::U8(v) => v.get(i).map(|&x| x as f64),
        }
    }

    fn resize(&mut self, len: usize) {
        match self {
            ArrayValues::F64(v) => v.resize(len, 0.0),
            ArrayValues::F32(v) => v.resize(len, 0.0),
            ArrayValues::I64(v) => v.resize(len, 0),
            ArrayValues::I32(v) => v.resize(len, 0),
            ArrayValues::U64(v) => v.resize(len, 0),
            ArrayValues::U8(v) => v.resize(len, 0),
        }
    }
}

/// Named, typed, tuple-major attribute array.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataArray {
    name: String,
    components: usize,
    values: ArrayValues,
}

impl DataArray {
    /// Build an array, checking that `values` holds whole tuples.
    pub fn new(
        name: impl Into<String>,
        components: usize,
        values: ArrayValues,
    ) -> Result<Self, MeshFlowError> {
        let name = name.into();
        if components == 0 || values.len() % components != 0 {
            return Err(MeshFlowError::RaggedArray {
                name,
                values: values.len(),
                components,
            });
        }
        Ok(Self {
            name,
            components,
            values,
        })
    }

    pub fn from_f64(
        name: impl Into<String>,
        components: usize,
        values: Vec<f64>,
    ) -> Result<Self, MeshFlowError> {
        Self::new(name, components, ArrayValues::F64(values))
    }

    pub fn from_i32(
        name: impl Into<String>,
        components: usize,
        values: Vec<i32>,
    ) -> Result<Self, MeshFlowError> {
        Self::new(name, components, ArrayValues::I32(values))
    }

    pub fn from_u8(
        name: impl Into<String>,
        components: usize,
        values: Vec<u8>,
    ) -> Result<Self, MeshFlowError> {
        Self::new(name, components, ArrayValues::U8(values))
    }

    /// Zero-filled array with `tuples` tuples.
    pub fn zeros(
        name: impl Into<String>,
        ty: ElementType,
        components: usize,
        tuples: usize,
    ) -> Self {
        let components = components.max(1);
        Self {
            name: name.into(),
            components,
            values: ArrayValues::zeros(ty, tuples * components),
        }
    }

    /// Zero-filled array with the same name, type and width as `self`.
    pub fn empty_like(&self, tuples: usize) -> Self {
        Self::zeros(
            self.name.clone(),
            self.element_type(),
            self.components,
            tuples,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn element_type(&self) -> ElementType {
        self.values.element_type()
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn num_tuples(&self) -> usize {
        self.values.len() / self.components
    }

    pub fn values(&self) -> &ArrayValues {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut ArrayValues {
        &mut self.values
    }

    pub fn as_f64(&self) -> Option<&[f64]> {
        match &self.values {
            ArrayValues::F64(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_u8(&self) -> Option<&[u8]> {
        match &self.values {
            ArrayValues::U8(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<&[i32]> {
        match &self.values {
            ArrayValues::I32(v) => Some(v),
            _ => None,
        }
    }

    /// Component `c` of tuple `t`, widened to `f64`.
    pub fn component_f64(&self, t: usize, c: usize) -> Option<f64> {
        if c >= self.components {
            return None;
        }
        self.values.get_f64(t * self.components + c)
    }

    /// Grow or shrink to `tuples` tuples; new tuples are zero.
    pub fn resize(&mut self, tuples: usize) {
        self.values.resize(tuples * self.components);
    }

    /// True when `other` could be copied into `self` tuple by tuple.
    pub fn is_copy_compatible(&self, other: &DataArray) -> bool {
        self.element_type() == other.element_type() && self.components == other.components
    }

    fn type_mismatch(&self, src: &DataArray) -> MeshFlowError {
        type_mismatch(&self.name, self.element_type(), self.components, src)
    }

    fn check_tuple(&self, index: usize, count: usize) -> Result<(), MeshFlowError> {
        let len = self.num_tuples();
        if index.checked_add(count).is_none_or(|end| end > len) {
            return Err(MeshFlowError::TupleOutOfRange {
                name: self.name.clone(),
                index: index + count.saturating_sub(1),
                len,
            });
        }
        Ok(())
    }

    /// Copy `count` consecutive tuples from `src[src_start..]` into `self[dst_start..]`.
    pub fn copy_range_from(
        &mut self,
        dst_start: usize,
        src: &DataArray,
        src_start: usize,
        count: usize,
    ) -> Result<(), MeshFlowError> {
        if !self.is_copy_compatible(src) {
            return Err(self.type_mismatch(src));
        }
        self.check_tuple(dst_start, count)?;
        src.check_tuple(src_start, count)?;
        let nc = self.components;
        let (d0, s0, n) = (dst_start * nc, src_start * nc, count * nc);
        let ty = self.element_type();
        with_value_pair!(&mut self.values, &src.values, (d, s) => {
            d[d0..d0 + n].copy_from_slice(&s[s0..s0 + n]);
            Ok(())
        }, Err(type_mismatch(&self.name, ty, nc, src)))
    }

    /// Copy the single tuple `src[src_index]` into `self[dst_index]`.
    pub fn copy_tuple_from(
        &mut self,
        dst_index: usize,
        src: &DataArray,
        src_index: usize,
    ) -> Result<(), MeshFlowError> {
        self.copy_range_from(dst_index, src, src_index, 1)
    }

    /// Copy `src[ids[k]]` into `self[dst_start + k]` for every `k`.
    pub fn copy_tuples_from_ids(
        &mut self,
        dst_start: usize,
        src: &DataArray,
        ids: &[usize],
    ) -> Result<(), MeshFlowError> {
        if !self.is_copy_compatible(src) {
            return Err(self.type_mismatch(src));
        }
        self.check_tuple(dst_start, ids.len())?;
        let src_len = src.num_tuples();
        if let Some(&bad) = ids.iter().find(|&&i| i >= src_len) {
            return Err(MeshFlowError::TupleOutOfRange {
                name: src.name.clone(),
                index: bad,
                len: src_len,
            });
        }
        let nc = self.components;
        let ty = self.element_type();
        with_value_pair!(&mut self.values, &src.values, (d, s) => {
            for (k, &id) in ids.iter().enumerate() {
                let d0 = (dst_start + k) * nc;
                d[d0..d0 + nc].copy_from_slice(&s[id * nc..id * nc + nc]);
            }
            Ok(())
        }, Err(type_mismatch(&self.name, ty, nc, src)))
    }

    /// New array holding `self[ids[k]]` as tuple `k`.
    pub fn select_tuples(&self, ids: &[usize]) -> Result<DataArray, MeshFlowError> {
        let mut out = self.empty_like(ids.len());
        out.copy_tuples_from_ids(0, self, ids)?;
        Ok(out)
    }
}

fn type_mismatch(name: &str, ty: ElementType, components: usize, src: &DataArray) -> MeshFlowError {
    MeshFlowError::ArrayTypeMismatch {
        name: name.to_string(),
        src: format!("{}x{}", src.element_type().as_str(), src.components),
        dst: format!("{}x{}", ty.as_str(), components),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_values_are_rejected() {
        let err = DataArray::from_f64("v", 3, vec![1.0; 4]).unwrap_err();
        assert!(matches!(err, MeshFlowError::RaggedArray { .. }));
    }

    #[test]
    fn range_copy_respects_components() {
        let src = DataArray::from_f64("v", 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut dst = src.empty_like(3);
        dst.copy_range_from(1, &src, 0, 2).unwrap();
        assert_eq!(dst.as_f64().unwrap(), &[0.0, 0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn copy_between_types_fails() {
        let src = DataArray::from_i32("v", 1, vec![1]).unwrap();
        let mut dst = DataArray::zeros("v", ElementType::F64, 1, 1);
        assert!(matches!(
            dst.copy_tuple_from(0, &src, 0),
            Err(MeshFlowError::ArrayTypeMismatch { .. })
        ));
    }

    #[test]
    fn mismatch_reports_both_layouts() {
        let src = DataArray::from_u8("g", 2, vec![1, 2]).unwrap();
        let mut dst = DataArray::zeros("g", ElementType::I32, 2, 1);
        let err = dst.copy_tuples_from_ids(0, &src, &[0]).unwrap_err();
        assert_eq!(
            err,
            MeshFlowError::ArrayTypeMismatch {
                name: "g".into(),
                src: "u8x2".into(),
                dst: "i32x2".into(),
            }
        );
        // a compatible copy still succeeds after a failed one
        let ok = DataArray::from_i32("g", 2, vec![5, 6]).unwrap();
        dst.copy_tuples_from_ids(0, &ok, &[0]).unwrap();
        assert_eq!(dst.as_i32().unwrap(), &[5, 6]);
    }

    #[test]
    fn select_tuples_gathers_in_order() {
        let src = DataArray::from_u8("g", 1, vec![7, 8, 9]).unwrap();
        let out = src.select_tuples(&[2, 0, 2]).unwrap();
        assert_eq!(out.as_u8().unwrap(), &[9, 7, 9]);
        assert!(src.select_tuples(&[3]).is_err());
    }

    #[test]
    fn element_type_labels_round_trip() {
        for ty in [
            ElementType::F64,
            ElementType::F32,
            ElementType::I64,
            ElementType::I32,
            ElementType::U64,
            ElementType::U8,
        ] {
            assert_eq!(ElementType::parse(ty.as_str()), Some(ty));
        }
    }
}
