//! N-dimensional pixel arrays with a tracked axis-order label.
//!
//! Canonical memory layout is `[T?, Z?, C, Y, X]`. The axes label is always
//! derived from the actual array shape, never from configuration flags, so
//! a saved stack can never disagree with its own metadata.

use ndarray::{Array2, ArrayD, Axis as NdAxis, IxDyn};
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;
use crate::error::{HiconaError, Result};

/// One dimension of a hyperstack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    T,
    Z,
    C,
    Y,
    X,
}

impl Axis {
    fn letter(self) -> char {
        match self {
            Axis::T => 'T',
            Axis::Z => 'Z',
            Axis::C => 'C',
            Axis::Y => 'Y',
            Axis::X => 'X',
        }
    }

    fn rank(self) -> usize {
        match self {
            Axis::T => 0,
            Axis::Z => 1,
            Axis::C => 2,
            Axis::Y => 3,
            Axis::X => 4,
        }
    }
}

/// Ordered axis set: a subset of `T,Z,C,Y,X` always ending in `Y,X`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Axes(Vec<Axis>);

impl Axes {
    pub fn new(axes: Vec<Axis>) -> Result<Self> {
        let ordered = axes.windows(2).all(|w| w[0].rank() < w[1].rank());
        let ends_yx = axes.len() >= 2
            && axes[axes.len() - 2] == Axis::Y
            && axes[axes.len() - 1] == Axis::X;
        if !ordered || !ends_yx {
            let label: String = axes.iter().map(|a| a.letter()).collect();
            return Err(HiconaError::AxesMismatch {
                label,
                ndim: axes.len(),
            });
        }
        Ok(Self(axes))
    }

    pub fn label(&self) -> String {
        self.0.iter().map(|a| a.letter()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn position(&self, axis: Axis) -> Option<usize> {
        self.0.iter().position(|a| *a == axis)
    }

    pub fn contains(&self, axis: Axis) -> bool {
        self.position(axis).is_some()
    }

    fn without(&self, axis: Axis) -> Self {
        Self(self.0.iter().copied().filter(|a| *a != axis).collect())
    }

    fn with_leading(&self, axis: Axis) -> Result<Self> {
        let mut v = Vec::with_capacity(self.0.len() + 1);
        v.push(axis);
        v.extend_from_slice(&self.0);
        Self::new(v)
    }
}

/// Pixel storage at native bit depth.
#[derive(Clone, Debug, PartialEq)]
pub enum PixelData {
    U8(ArrayD<u8>),
    U16(ArrayD<u16>),
}

impl PixelData {
    pub fn ndim(&self) -> usize {
        match self {
            PixelData::U8(a) => a.ndim(),
            PixelData::U16(a) => a.ndim(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            PixelData::U8(a) => a.shape(),
            PixelData::U16(a) => a.shape(),
        }
    }

    pub fn bit_depth(&self) -> u8 {
        match self {
            PixelData::U8(_) => 8,
            PixelData::U16(_) => 16,
        }
    }
}

/// A pixel array plus the axis-order label describing its dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct Hyperstack {
    data: PixelData,
    axes: Axes,
}

impl Hyperstack {
    /// Pair data with axes. The label length must match the array
    /// dimensionality; there is no silent fixup.
    pub fn new(data: PixelData, axes: Axes) -> Result<Self> {
        if data.ndim() != axes.len() {
            return Err(HiconaError::AxesMismatch {
                label: axes.label(),
                ndim: data.ndim(),
            });
        }
        Ok(Self { data, axes })
    }

    /// Reshape a flat plane list into `[Z, C, Y, X]` (or `[C, Y, X]` for a
    /// single plane). The list must be ordered plane-major with the channel
    /// varying fastest, i.e. `p01-ch1, p01-ch2, p02-ch1, ...` as the sorted
    /// file enumeration yields it.
    pub fn from_planes(planes: Vec<Array2<u16>>, n_planes: usize, n_channels: usize) -> Result<Self> {
        let expected = n_planes * n_channels;
        if planes.len() != expected || expected == 0 {
            return Err(HiconaError::PlaneCountMismatch {
                expected,
                planes: n_planes,
                channels: n_channels,
                actual: planes.len(),
            });
        }
        let (h, w) = planes[0].dim();
        if let Some(bad) = planes.iter().find(|p| p.dim() != (h, w)) {
            return Err(HiconaError::Pipeline(format!(
                "tile dimensions differ: expected {h}x{w}, got {}x{}",
                bad.nrows(),
                bad.ncols()
            )));
        }

        let mut buf = Vec::with_capacity(expected * h * w);
        for plane in &planes {
            buf.extend(plane.iter().copied());
        }

        let (shape, axes) = if n_planes > 1 {
            (
                vec![n_planes, n_channels, h, w],
                Axes::new(vec![Axis::Z, Axis::C, Axis::Y, Axis::X])?,
            )
        } else {
            (
                vec![n_channels, h, w],
                Axes::new(vec![Axis::C, Axis::Y, Axis::X])?,
            )
        };
        let data = ArrayD::from_shape_vec(IxDyn(&shape), buf)?;
        Self::new(PixelData::U16(data), axes)
    }

    /// Build a `[C, Y, X]` stack from per-channel planes of equal size.
    pub fn from_channel_planes(channels: Vec<Array2<u16>>) -> Result<Self> {
        let n = channels.len();
        Self::from_planes(channels, 1, n)
    }

    /// Wrap a single `[Y, X]` plane.
    pub fn from_plane(plane: Array2<u16>) -> Result<Self> {
        let data = plane.into_dyn();
        Self::new(PixelData::U16(data), Axes::new(vec![Axis::Y, Axis::X])?)
    }

    /// Stack per-timepoint hyperstacks along a new leading `T` axis. All
    /// inputs must share shape and axes.
    pub fn stack_timepoints(stacks: Vec<Hyperstack>) -> Result<Self> {
        let first = stacks
            .first()
            .ok_or_else(|| HiconaError::Pipeline("no timepoints to stack".into()))?;
        let axes = first.axes.clone();
        let shape = first.data.shape().to_vec();
        if let Some(bad) = stacks
            .iter()
            .find(|s| s.axes != axes || s.data.shape() != shape.as_slice())
        {
            return Err(HiconaError::Pipeline(format!(
                "timepoint shape/axes mismatch: {:?} {} vs {:?} {}",
                shape,
                axes.label(),
                bad.data.shape(),
                bad.axes.label()
            )));
        }

        let stacked_axes = axes.with_leading(Axis::T)?;
        match &first.data {
            PixelData::U16(_) => {
                let views: Vec<_> = stacks
                    .iter()
                    .map(|s| match &s.data {
                        PixelData::U16(a) => Ok(a.view()),
                        PixelData::U8(_) => {
                            Err(HiconaError::Pipeline("mixed bit depths across timepoints".into()))
                        }
                    })
                    .collect::<Result<_>>()?;
                let stacked = ndarray::stack(NdAxis(0), &views)?;
                Self::new(PixelData::U16(stacked), stacked_axes)
            }
            PixelData::U8(_) => {
                let views: Vec<_> = stacks
                    .iter()
                    .map(|s| match &s.data {
                        PixelData::U8(a) => Ok(a.view()),
                        PixelData::U16(_) => {
                            Err(HiconaError::Pipeline("mixed bit depths across timepoints".into()))
                        }
                    })
                    .collect::<Result<_>>()?;
                let stacked = ndarray::stack(NdAxis(0), &views)?;
                Self::new(PixelData::U8(stacked), stacked_axes)
            }
        }
    }

    pub fn axes(&self) -> &Axes {
        &self.axes
    }

    pub fn data(&self) -> &PixelData {
        &self.data
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Length of one axis, if present.
    pub fn axis_len(&self, axis: Axis) -> Option<usize> {
        self.axes.position(axis).map(|i| self.data.shape()[i])
    }

    /// Maximum intensity projection along `Z`.
    pub fn project_max(&self) -> Result<Self> {
        self.project(|a, z| a.fold_axis(z, u16::MIN, |&acc, &v| acc.max(v)), |a, z| {
            a.fold_axis(z, u8::MIN, |&acc, &v| acc.max(v))
        })
    }

    /// Minimum intensity projection along `Z`.
    pub fn project_min(&self) -> Result<Self> {
        self.project(|a, z| a.fold_axis(z, u16::MAX, |&acc, &v| acc.min(v)), |a, z| {
            a.fold_axis(z, u8::MAX, |&acc, &v| acc.min(v))
        })
    }

    fn project(
        &self,
        f16: impl Fn(&ArrayD<u16>, NdAxis) -> ArrayD<u16>,
        f8: impl Fn(&ArrayD<u8>, NdAxis) -> ArrayD<u8>,
    ) -> Result<Self> {
        let z = self
            .axes
            .position(Axis::Z)
            .ok_or(HiconaError::MissingAxis { axis: 'Z' })?;
        let data = match &self.data {
            PixelData::U16(a) => PixelData::U16(f16(a, NdAxis(z))),
            PixelData::U8(a) => PixelData::U8(f8(a, NdAxis(z))),
        };
        Self::new(data, self.axes.without(Axis::Z))
    }

    /// Convert to 8 bit, scaling each `[Y, X]` image independently by its
    /// own maximum: `u8((pixel / max) * 255)`. Zero-max images map to zero.
    pub fn to_8bit(&self) -> Result<Self> {
        let a = match &self.data {
            PixelData::U8(_) => return Ok(self.clone()),
            PixelData::U16(a) => a,
        };
        let shape = a.shape().to_vec();
        let ndim = shape.len();
        let (h, w) = (shape[ndim - 2], shape[ndim - 1]);
        let image_px = h * w;

        let contiguous = a.as_standard_layout();
        let flat = contiguous
            .as_slice()
            .ok_or_else(|| HiconaError::Pipeline("non-contiguous pixel buffer".into()))?;

        let convert = |img: &[u16]| -> Vec<u8> {
            let max = img.iter().copied().max().unwrap_or(0);
            if max == 0 {
                return vec![0u8; img.len()];
            }
            img.iter()
                .map(|&v| ((v as f64 / max as f64) * 255.0) as u8)
                .collect()
        };

        let images: Vec<Vec<u8>> = if image_px >= PARALLEL_PIXEL_THRESHOLD {
            flat.par_chunks(image_px).map(convert).collect()
        } else {
            flat.chunks(image_px).map(convert).collect()
        };
        let buf: Vec<u8> = images.into_iter().flatten().collect();

        let data = ArrayD::from_shape_vec(IxDyn(&shape), buf)?;
        Self::new(PixelData::U8(data), self.axes.clone())
    }

    /// Iterate the `C` axis, yielding one `[Y, X]` hyperstack per channel.
    /// Requires a projected (or single-plane) `[C, Y, X]` stack.
    pub fn split_channels(&self) -> Result<Vec<Hyperstack>> {
        let expected = Axes::new(vec![Axis::C, Axis::Y, Axis::X])?;
        if self.axes != expected {
            return Err(HiconaError::Pipeline(format!(
                "channel split requires a CYX stack, got {}",
                self.axes.label()
            )));
        }
        let yx = Axes::new(vec![Axis::Y, Axis::X])?;
        let n = self.shape()[0];
        (0..n)
            .map(|c| {
                let data = match &self.data {
                    PixelData::U16(a) => PixelData::U16(a.index_axis(NdAxis(0), c).to_owned()),
                    PixelData::U8(a) => PixelData::U8(a.index_axis(NdAxis(0), c).to_owned()),
                };
                Self::new(data, yx.clone())
            })
            .collect()
    }

    /// Extract one channel as a `[Z, Y, X]` substack (u16). Used for the
    /// EDF handoff.
    pub fn channel_substack(&self, channel: usize) -> Result<ArrayD<u16>> {
        let c = self
            .axes
            .position(Axis::C)
            .ok_or(HiconaError::MissingAxis { axis: 'C' })?;
        let a = match &self.data {
            PixelData::U16(a) => a,
            PixelData::U8(_) => {
                return Err(HiconaError::Pipeline("EDF requires 16-bit input".into()))
            }
        };
        if channel >= a.shape()[c] {
            return Err(HiconaError::Pipeline(format!(
                "channel {channel} out of range ({} channels)",
                a.shape()[c]
            )));
        }
        Ok(a.index_axis(NdAxis(c), channel).to_owned())
    }
}
