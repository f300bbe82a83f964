use std::collections::BTreeMap;

use ndarray::{Array2, s};

use crate::enums::CoordSys;
use crate::error::Result;
use crate::orientation::{aff2axcodes, inv_axcodes};

/// Spatial metadata of an image.
///
/// `affine` maps voxel indices `(i, j, k, 1)` to world coordinates in the
/// world of `coord_sys` (RAS+ for Nib, LPS+ for Itk). `orig_ornt` records the
/// orientation of the image as it is stored on disk, in the convention of
/// `coord_sys`, so it can be restored when saving.
#[derive(Debug, Clone, PartialEq)]
pub struct MetaData {
    pub affine: Array2<f64>,
    pub orig_ornt: Option<String>,
    pub coord_sys: CoordSys,
    pub header: Option<BTreeMap<String, String>>,
}

impl MetaData {
    pub fn new(affine: Array2<f64>, orig_ornt: Option<String>, coord_sys: CoordSys) -> Self {
        Self {
            affine,
            orig_ornt,
            coord_sys,
            header: None,
        }
    }

    /// Unit spacing, zero origin, identity direction
    pub fn identity(coord_sys: CoordSys) -> Self {
        Self::new(Array2::eye(4), None, coord_sys)
    }

    pub fn with_header(mut self, header: BTreeMap<String, String>) -> Self {
        self.header = Some(header);
        self
    }

    /// Voxel size along each of the three voxel axes
    pub fn spacing(&self) -> [f64; 3] {
        let mut spacing = [0.0; 3];
        for (axis, value) in spacing.iter_mut().enumerate() {
            let column = self.affine.slice(s![0..3, axis]);
            *value = column.dot(&column).sqrt();
        }
        spacing
    }

    pub fn origin(&self) -> [f64; 3] {
        [
            self.affine[[0, 3]],
            self.affine[[1, 3]],
            self.affine[[2, 3]],
        ]
    }

    /// Direction cosines, one column per voxel axis
    pub fn direction(&self) -> Array2<f64> {
        let mut direction = self.affine.slice(s![0..3, 0..3]).to_owned();
        for (mut column, spacing) in direction.columns_mut().into_iter().zip(self.spacing()) {
            if spacing > 0.0 {
                column /= spacing;
            }
        }
        direction
    }

    /// Orientation code of the first `n` axes in the convention of `coord_sys`
    pub fn ornt(&self, n: usize) -> Result<String> {
        match self.coord_sys {
            CoordSys::Nib => aff2axcodes(&self.affine, n),
            CoordSys::Itk => {
                let nib = aff2axcodes(&flip_lr_ap(&self.affine), n)?;
                Ok(inv_axcodes(Some(nib.as_str()))?.unwrap_or_default())
            }
        }
    }

    /// Convert affine and original orientation to another world convention
    pub fn convert(&mut self, dest: CoordSys) -> Result<()> {
        if self.coord_sys == dest {
            return Ok(());
        }
        self.affine = flip_lr_ap(&self.affine);
        self.orig_ornt = inv_axcodes(self.orig_ornt.as_deref())?;
        self.coord_sys = dest;
        Ok(())
    }

    pub fn converted(mut self, dest: CoordSys) -> Result<Self> {
        self.convert(dest)?;
        Ok(self)
    }
}

/// RAS+ and LPS+ world spaces differ by the sign of their first two axes
fn flip_lr_ap(affine: &Array2<f64>) -> Array2<f64> {
    let mut flipped = affine.clone();
    for row in 0..2 {
        flipped.row_mut(row).mapv_inplace(|v| -v);
    }
    flipped
}
