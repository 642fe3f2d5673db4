//! Sample shapes and the squeeze/unsqueeze transform.
//!
//! A [`SampleShape`] describes the dimensions of a single sample (for
//! example `(threads, channels)`), independent of the sample axis itself.
//! Squeezing drops unit dimensions for ergonomic array access; the
//! [`SqueezedShape`] it produces keeps an index-preserving mask so the
//! original shape can always be reconstructed exactly.

use std::fmt;

use crate::{BasebandError, Result};

/// One dimension of a sample: an optional name and a size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dim {
    pub name: Option<&'static str>,
    pub size: usize,
}

/// Ordered dimensions of a single sample.
///
/// Invariant: every dimension size is at least 1. The empty shape describes
/// a scalar sample (one real or complex value per sample).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleShape {
    dims: Vec<Dim>,
}

impl SampleShape {
    /// Shape of a scalar sample (no extra dimensions).
    pub fn scalar() -> Self {
        Self { dims: Vec::new() }
    }

    /// Build a shape from unnamed dimension sizes.
    pub fn new(sizes: &[usize]) -> Result<Self> {
        Self::from_dims(sizes.iter().map(|&size| Dim { name: None, size }))
    }

    /// Build a shape from `(name, size)` pairs.
    pub fn named(entries: &[(&'static str, usize)]) -> Result<Self> {
        Self::from_dims(entries.iter().map(|&(name, size)| Dim {
            name: Some(name),
            size,
        }))
    }

    fn from_dims(dims: impl Iterator<Item = Dim>) -> Result<Self> {
        let dims: Vec<Dim> = dims.collect();
        if let Some(dim) = dims.iter().find(|d| d.size == 0) {
            return Err(BasebandError::InvalidShape {
                reason: format!("dimension {:?} has size 0", dim.name.unwrap_or("?")),
            });
        }
        Ok(Self { dims })
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Dimension sizes, in order.
    pub fn sizes(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.size).collect()
    }

    /// The dimensions themselves.
    pub fn dims(&self) -> &[Dim] {
        &self.dims
    }

    /// Number of elements in one sample (product of the sizes; 1 if scalar).
    pub fn sample_size(&self) -> usize {
        self.dims.iter().map(|d| d.size).product()
    }

    /// Drop unit dimensions, remembering where they were.
    pub fn squeeze(&self) -> SqueezedShape {
        let kept: Vec<bool> = self.dims.iter().map(|d| d.size > 1).collect();
        SqueezedShape {
            full: self.clone(),
            kept,
        }
    }
}

impl fmt::Display for SampleShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, dim) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match dim.name {
                Some(name) => write!(f, "{name}={}", dim.size)?,
                None => write!(f, "{}", dim.size)?,
            }
        }
        write!(f, ")")
    }
}

/// A [`SampleShape`] with unit dimensions removed.
///
/// Holds the original shape and a per-dimension mask, so the squeeze is a
/// bijection: [`SqueezedShape::unsqueeze`] returns the exact original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqueezedShape {
    full: SampleShape,
    kept: Vec<bool>,
}

impl SqueezedShape {
    /// Sizes of the retained (non-unit) dimensions.
    pub fn sizes(&self) -> Vec<usize> {
        self.full
            .dims
            .iter()
            .zip(&self.kept)
            .filter(|(_, &kept)| kept)
            .map(|(d, _)| d.size)
            .collect()
    }

    /// The retained dimensions.
    pub fn dims(&self) -> Vec<Dim> {
        self.full
            .dims
            .iter()
            .zip(&self.kept)
            .filter(|(_, &kept)| kept)
            .map(|(d, _)| *d)
            .collect()
    }

    /// Number of retained dimensions.
    pub fn ndim(&self) -> usize {
        self.kept.iter().filter(|&&k| k).count()
    }

    /// Reconstruct the original shape, unit dimensions included.
    pub fn unsqueeze(&self) -> SampleShape {
        self.full.clone()
    }

    /// Expand a data shape whose trailing axes are the squeezed dimensions
    /// into the corresponding full shape, reinserting unit axes at their
    /// original positions. Leading axes (e.g. the sample axis) pass through.
    pub fn expand_data_shape(&self, data_shape: &[usize]) -> Vec<usize> {
        let leading = data_shape.len() - self.ndim();
        let mut out: Vec<usize> = data_shape[..leading].to_vec();
        let mut trailing = data_shape[leading..].iter();
        for (dim, &kept) in self.full.dims.iter().zip(&self.kept) {
            if kept {
                out.push(*trailing.next().expect("mask and data shape agree"));
            } else {
                debug_assert_eq!(dim.size, 1);
                out.push(1);
            }
        }
        out
    }

    /// Drop the unit axes of a full data shape, the inverse of
    /// [`Self::expand_data_shape`].
    pub fn collapse_data_shape(&self, data_shape: &[usize]) -> Vec<usize> {
        let leading = data_shape.len() - self.full.ndim();
        let mut out: Vec<usize> = data_shape[..leading].to_vec();
        for (&size, &kept) in data_shape[leading..].iter().zip(&self.kept) {
            if kept {
                out.push(size);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_shape() {
        let shape = SampleShape::scalar();
        assert_eq!(shape.ndim(), 0);
        assert_eq!(shape.sample_size(), 1);
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(SampleShape::new(&[4, 0]).is_err());
    }

    #[test]
    fn test_sample_size() {
        let shape = SampleShape::new(&[2, 8]).unwrap();
        assert_eq!(shape.sample_size(), 16);
    }

    #[test]
    fn test_squeeze_drops_unit_dims() {
        let shape = SampleShape::named(&[("threads", 1), ("channels", 8)]).unwrap();
        let squeezed = shape.squeeze();
        assert_eq!(squeezed.sizes(), vec![8]);
        assert_eq!(squeezed.dims()[0].name, Some("channels"));
    }

    #[test]
    fn test_unsqueeze_is_exact_inverse() {
        for sizes in [vec![1, 8], vec![4, 1, 2], vec![1], vec![3, 5]] {
            let shape = SampleShape::new(&sizes).unwrap();
            assert_eq!(shape.squeeze().unsqueeze(), shape);
        }
    }

    #[test]
    fn test_expand_data_shape() {
        let shape = SampleShape::new(&[1, 8]).unwrap();
        let squeezed = shape.squeeze();
        assert_eq!(squeezed.expand_data_shape(&[100, 8]), vec![100, 1, 8]);
        assert_eq!(squeezed.collapse_data_shape(&[100, 1, 8]), vec![100, 8]);
    }

    #[test]
    fn test_display() {
        let shape = SampleShape::named(&[("channels", 8)]).unwrap();
        assert_eq!(format!("{shape}"), "(channels=8)");
        let shape = SampleShape::new(&[2, 4]).unwrap();
        assert_eq!(format!("{shape}"), "(2, 4)");
    }
}
