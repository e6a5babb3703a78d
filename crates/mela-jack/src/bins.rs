//! Dense bin-major storage for jackknife samples.

use mela_core::errors::{ErrorInfo, MelaError};
use serde::{Deserialize, Serialize};

use crate::value::Sample;

fn shape_error(message: impl Into<String>) -> MelaError {
    MelaError::ShapeMismatch(ErrorInfo::new("bins-shape", message))
}

/// Jackknife bins of an array with one retained axis.
///
/// Stored row-major as `[bin][position]`; `width` is the number of retained
/// positions (time slices, insertion times) and is `1` for scalar estimators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bins<T> {
    nbins: usize,
    width: usize,
    data: Vec<T>,
}

impl<T: Sample> Bins<T> {
    /// Wraps row-major data, checking it holds `nbins * width` elements.
    pub fn new(nbins: usize, width: usize, data: Vec<T>) -> Result<Self, MelaError> {
        if data.len() != nbins * width {
            return Err(shape_error(format!(
                "expected {} elements for {nbins} bins of width {width}, got {}",
                nbins * width,
                data.len()
            )));
        }
        Ok(Self { nbins, width, data })
    }

    /// Zero-filled bins.
    pub fn zeros(nbins: usize, width: usize) -> Self {
        Self {
            nbins,
            width,
            data: vec![T::zero(); nbins * width],
        }
    }

    /// Bins of a scalar estimator (`width == 1`).
    pub fn from_scalars(values: Vec<T>) -> Self {
        Self {
            nbins: values.len(),
            width: 1,
            data: values,
        }
    }

    /// Assembles bins from per-position columns of equal length.
    pub fn from_columns(columns: &[Vec<T>]) -> Result<Self, MelaError> {
        let width = columns.len();
        let nbins = columns.first().map(Vec::len).unwrap_or(0);
        if columns.iter().any(|col| col.len() != nbins) {
            return Err(shape_error("columns have different bin counts"));
        }
        let mut data = Vec::with_capacity(nbins * width);
        for b in 0..nbins {
            for col in columns {
                data.push(col[b]);
            }
        }
        Ok(Self { nbins, width, data })
    }

    /// Builds bins element by element.
    pub fn from_fn(nbins: usize, width: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(nbins * width);
        for b in 0..nbins {
            for t in 0..width {
                data.push(f(b, t));
            }
        }
        Self { nbins, width, data }
    }

    /// Number of jackknife bins (leading dimension).
    pub fn nbins(&self) -> usize {
        self.nbins
    }

    /// Number of retained positions per bin.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Element at bin `b`, position `t`.
    pub fn get(&self, b: usize, t: usize) -> T {
        self.data[b * self.width + t]
    }

    /// Overwrites the element at bin `b`, position `t`.
    pub fn set(&mut self, b: usize, t: usize, value: T) {
        self.data[b * self.width + t] = value;
    }

    /// All positions of bin `b`.
    pub fn row(&self, b: usize) -> &[T] {
        &self.data[b * self.width..(b + 1) * self.width]
    }

    /// All bins at position `t`.
    pub fn column(&self, t: usize) -> Vec<T> {
        (0..self.nbins).map(|b| self.get(b, t)).collect()
    }

    /// Scalar values, one per bin, when `width == 1`.
    pub fn scalars(&self) -> Result<&[T], MelaError> {
        if self.width != 1 {
            return Err(shape_error(format!(
                "scalar view requested on bins of width {}",
                self.width
            )));
        }
        Ok(&self.data)
    }

    /// Row-major view of all elements.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Applies `f` to every element.
    pub fn map<U: Sample>(&self, f: impl Fn(T) -> U) -> Bins<U> {
        Bins {
            nbins: self.nbins,
            width: self.width,
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Combines two equally shaped bin arrays element by element.
    pub fn zip_with<U: Sample, V: Sample>(
        &self,
        other: &Bins<U>,
        f: impl Fn(T, U) -> V,
    ) -> Result<Bins<V>, MelaError> {
        if self.nbins != other.nbins || self.width != other.width {
            return Err(shape_error(format!(
                "cannot combine bins {}x{} with {}x{}",
                self.nbins, self.width, other.nbins, other.width
            )));
        }
        Ok(Bins {
            nbins: self.nbins,
            width: self.width,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    /// Number of undefined (NaN or infinite) elements.
    pub fn undefined_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_defined()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn columns_and_rows_agree() {
        let bins = Bins::from_columns(&[vec![1.0, 2.0, 3.0], vec![10.0, 20.0, 30.0]]).unwrap();
        assert_eq!(bins.nbins(), 3);
        assert_eq!(bins.width(), 2);
        assert_eq!(bins.row(1), &[2.0, 20.0]);
        assert_eq!(bins.column(1), vec![10.0, 20.0, 30.0]);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = Bins::new(3, 2, vec![0.0; 5]).unwrap_err();
        assert!(matches!(err, MelaError::ShapeMismatch(_)));
    }

    #[test]
    fn scalar_view_requires_unit_width() {
        let bins = Bins::<f64>::zeros(4, 2);
        assert!(bins.scalars().is_err());
        let scalars = Bins::from_scalars(vec![1.0, 2.0]);
        assert_eq!(scalars.scalars().unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn counts_undefined_elements() {
        let bins = Bins::new(2, 2, vec![1.0, f64::NAN, 2.0, f64::INFINITY]).unwrap();
        assert_eq!(bins.undefined_count(), 2);
    }
}
