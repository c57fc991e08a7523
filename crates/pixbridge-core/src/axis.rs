//! Native axes and axis permutations.
//!
//! Pixel buffers always store their data in native `x, y, z, c` order (x
//! fastest). Foreign arrays may use any order of any subset of those axes;
//! an [`AxisPermutation`] records which native axis each requested position
//! refers to.
//!
//! # Example
//!
//! ```
//! use pixbridge_core::{Axis, AxisPermutation};
//!
//! let yxc = AxisPermutation::parse("yxc").unwrap();
//! assert_eq!(yxc.rank(), 3);
//! assert_eq!(yxc.index_map(), [1, 0, -1, 2]);
//!
//! // Native (w, h, d, c) = (640, 480, 1, 3) seen in y, x, c order:
//! assert_eq!(yxc.apply(&[640, 480, 1, 3]), vec![480, 640, 3]);
//! assert_eq!(yxc.to_native(&[480, 640, 3], 1).unwrap(), [640, 480, 1, 3]);
//! ```

use crate::error::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// One of the four native axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    /// Width
    X = 0,
    /// Height
    Y = 1,
    /// Depth
    Z = 2,
    /// Channels (spectrum)
    C = 3,
}

impl Axis {
    /// Native axes in storage order.
    pub const ALL: [Axis; 4] = [Axis::X, Axis::Y, Axis::Z, Axis::C];

    /// Native index (0..4).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Axis at a native index.
    pub const fn from_index(index: usize) -> Option<Axis> {
        match index {
            0 => Some(Axis::X),
            1 => Some(Axis::Y),
            2 => Some(Axis::Z),
            3 => Some(Axis::C),
            _ => None,
        }
    }

    /// Lowercase label.
    pub const fn label(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
            Axis::C => 'c',
        }
    }

    /// Label as a string, used in error messages.
    pub const fn name(self) -> &'static str {
        match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
            Axis::C => "c",
        }
    }

    /// Parses a label, case-insensitive. `w`, `h`, `d` and `s` are accepted
    /// for width, height, depth and spectrum.
    pub fn from_label(label: char) -> Option<Axis> {
        match label.to_ascii_lowercase() {
            'x' | 'w' => Some(Axis::X),
            'y' | 'h' => Some(Axis::Y),
            'z' | 'd' => Some(Axis::Z),
            'c' | 's' => Some(Axis::C),
            _ => None,
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Mapping from a requested axis order to native axes.
///
/// Holds between one and four distinct axes. Internally the requested axes are
/// followed by the unspecified ones in native order, so every permutation also
/// knows its completed four-axis form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AxisPermutation {
    axes: [Axis; 4],
    rank: usize,
}

impl AxisPermutation {
    /// Native `xyzc` order.
    pub const fn native() -> Self {
        Self {
            axes: Axis::ALL,
            rank: 4,
        }
    }

    /// The first `rank` native axes (`x`, `xy`, `xyz` or `xyzc`).
    ///
    /// This is the order assumed for arrays imported without an explicit order.
    pub fn native_prefix(rank: usize) -> Result<Self> {
        if !(1..=4).contains(&rank) {
            return Err(Error::invalid_argument(format!("rank {rank} not in 1..=4")));
        }
        Self::from_axes(&Axis::ALL[..rank])
    }

    /// Builds a permutation from explicit axes.
    pub fn from_axes(axes: &[Axis]) -> Result<Self> {
        if axes.is_empty() {
            return Err(Error::invalid_argument("axis order is empty"));
        }
        if axes.len() > 4 {
            return Err(Error::invalid_argument(format!(
                "axis order has {} entries, at most 4 allowed",
                axes.len()
            )));
        }
        let mut seen = [false; 4];
        for &axis in axes {
            if std::mem::replace(&mut seen[axis.index()], true) {
                return Err(Error::invalid_argument(format!(
                    "axis '{axis}' appears more than once"
                )));
            }
        }

        let mut full = [Axis::X; 4];
        full[..axes.len()].copy_from_slice(axes);
        let rest = Axis::ALL.iter().filter(|a| !seen[a.index()]);
        for (slot, &axis) in full[axes.len()..].iter_mut().zip(rest) {
            *slot = axis;
        }
        Ok(Self {
            axes: full,
            rank: axes.len(),
        })
    }

    /// Parses an axis label string such as `"yxc"` or `"CZYX"`.
    pub fn parse(order: &str) -> Result<Self> {
        let axes = order
            .chars()
            .map(|ch| {
                Axis::from_label(ch)
                    .ok_or_else(|| Error::invalid_argument(format!("unknown axis label '{ch}' in {order:?}")))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::from_axes(&axes)
    }

    /// Like [`parse`](Self::parse), but requires all four axes.
    pub fn parse_strict(order: &str) -> Result<Self> {
        let perm = Self::parse(order)?;
        if perm.rank != 4 {
            return Err(Error::invalid_argument(format!(
                "axis order {order:?} must name all four axes"
            )));
        }
        Ok(perm)
    }

    /// Number of requested axes.
    #[inline]
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Requested axes, in order.
    #[inline]
    pub fn axes(&self) -> &[Axis] {
        &self.axes[..self.rank]
    }

    /// Native axes not named by this permutation, in native order.
    #[inline]
    pub fn unspecified(&self) -> &[Axis] {
        &self.axes[self.rank..]
    }

    /// Returns true if `axis` is part of the requested order.
    #[inline]
    pub fn contains(&self, axis: Axis) -> bool {
        self.axes().contains(&axis)
    }

    /// Requested position of a native axis.
    pub fn position(&self, axis: Axis) -> Option<usize> {
        self.axes().iter().position(|&a| a == axis)
    }

    /// For each native axis, its requested position or -1 if unspecified.
    pub fn index_map(&self) -> [isize; 4] {
        Axis::ALL.map(|axis| self.position(axis).map_or(-1, |pos| pos as isize))
    }

    /// True for the four-axis native order.
    pub fn is_identity(&self) -> bool {
        self.rank == 4 && self.axes == Axis::ALL
    }

    /// Maps a native 4-tuple to the requested order.
    pub fn apply<T: Copy>(&self, native: &[T; 4]) -> Vec<T> {
        self.axes().iter().map(|a| native[a.index()]).collect()
    }

    /// Scatters a requested-order tuple back to native order, using `fill` for
    /// unspecified axes.
    pub fn to_native<T: Copy>(&self, requested: &[T], fill: T) -> Result<[T; 4]> {
        if requested.len() != self.rank {
            return Err(Error::invalid_argument(format!(
                "expected {} values for axis order {self}, got {}",
                self.rank,
                requested.len()
            )));
        }
        let mut native = [fill; 4];
        for (axis, &value) in self.axes().iter().zip(requested) {
            native[axis.index()] = value;
        }
        Ok(native)
    }

    /// Four-axis form: requested axes followed by the unspecified ones.
    pub fn completed(&self) -> Self {
        Self {
            axes: self.axes,
            rank: 4,
        }
    }

    /// Inverse of the completed permutation.
    ///
    /// For any native tuple `x`, `p.inverse().apply(&p.completed().apply(&x))`
    /// viewed as a native tuple returns `x`.
    pub fn inverse(&self) -> Self {
        let completed = self.completed();
        // every axis has a position in the completed form
        let axes = Axis::ALL.map(|axis| completed.position(axis).and_then(Axis::from_index).unwrap_or(axis));
        Self { axes, rank: 4 }
    }
}

impl Default for AxisPermutation {
    fn default() -> Self {
        Self::native()
    }
}

impl fmt::Display for AxisPermutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in self.axes() {
            write!(f, "{axis}")?;
        }
        Ok(())
    }
}

impl FromStr for AxisPermutation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
