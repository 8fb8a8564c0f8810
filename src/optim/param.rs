//! Parameters, parameter groups and gradients

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameter group; each has its own learning rate and freeze flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Backbone,
    Head,
}

impl GroupKind {
    pub const ALL: [GroupKind; 2] = [GroupKind::Backbone, GroupKind::Head];

    pub fn index(self) -> usize {
        match self {
            GroupKind::Backbone => 0,
            GroupKind::Head => 1,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GroupKind::Backbone => "backbone",
            GroupKind::Head => "head",
        }
    }
}

impl fmt::Display for GroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named, flat parameter tensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub group: GroupKind,
    pub data: Array1<f32>,
}

impl Param {
    pub fn new(name: impl Into<String>, group: GroupKind, data: Array1<f32>) -> Self {
        Self { name: name.into(), group, data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Gradients aligned by index with a parameter slice
#[derive(Debug, Clone, PartialEq)]
pub struct Gradients {
    grads: Vec<Array1<f32>>,
}

impl Gradients {
    /// Zero gradients shaped like `params`
    pub fn zeros_like(params: &[Param]) -> Self {
        Self { grads: params.iter().map(|p| Array1::zeros(p.len())).collect() }
    }

    pub fn from_vec(grads: Vec<Array1<f32>>) -> Self {
        Self { grads }
    }

    pub fn len(&self) -> usize {
        self.grads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grads.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Array1<f32>> {
        self.grads.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Array1<f32>> {
        self.grads.get_mut(index)
    }

    pub fn as_slice(&self) -> &[Array1<f32>] {
        &self.grads
    }

    pub fn as_mut_slice(&mut self) -> &mut [Array1<f32>] {
        &mut self.grads
    }

    /// Whether every element is finite
    pub fn is_finite(&self) -> bool {
        self.grads.iter().all(|g| g.iter().all(|x| x.is_finite()))
    }

    /// Multiply every element by `factor`
    pub fn scale(&mut self, factor: f32) {
        for g in &mut self.grads {
            g.mapv_inplace(|x| x * factor);
        }
    }

    /// Whether shapes line up with `params`
    pub fn matches(&self, params: &[Param]) -> bool {
        self.grads.len() == params.len()
            && self.grads.iter().zip(params).all(|(g, p)| g.len() == p.len())
    }
}
