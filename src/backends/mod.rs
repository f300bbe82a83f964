//! Reader/writer backends behind the dispatch facade.
//!
//! Every backend returns arrays with spatial axes first in voxel index order
//! and metadata in its own world convention ([`CoordSys`]). The helpers at the
//! bottom hold the orientation and channel handling the backends share.

pub mod itk_io;
pub mod nib_io;
pub mod pdcm_io;

use std::path::Path;

use crate::enums::CoordSys;
use crate::error::Result;
use crate::image::{ImageArray, resolve_axis};
use crate::metadata::MetaData;
use crate::options::BackendOptions;
use crate::orientation::{inv_axcodes, reorient};

pub use itk_io::ItkIo;
pub use nib_io::NibIo;
pub use pdcm_io::PdcmIo;

/// A backend that reads and writes single image files
pub trait ImageBackend: Send + Sync {
    /// Read `path`, reorienting to `desired_ornt` (in this backend's convention)
    fn read_img(
        &self,
        path: &Path,
        desired_ornt: Option<&str>,
        header: bool,
        channels_axis: Option<isize>,
        options: &BackendOptions,
    ) -> Result<(ImageArray, MetaData)>;

    fn save_img(
        &self,
        path: &Path,
        image: ImageArray,
        metadata: &MetaData,
        use_original_ornt: bool,
        channels_axis: Option<isize>,
        options: &BackendOptions,
    ) -> Result<()>;
}

/// A backend for DICOM series stored as a directory of slice files
pub trait DicomSeriesBackend: Send + Sync {
    /// Read a series without reorientation
    fn read_img(
        &self,
        path: &Path,
        header: bool,
        channels_axis: Option<isize>,
        options: &BackendOptions,
    ) -> Result<(ImageArray, MetaData)>;

    #[allow(clippy::too_many_arguments)]
    fn save_dcm_dir(
        &self,
        dir: &Path,
        image: ImageArray,
        metadata: &MetaData,
        use_original_ornt: bool,
        channels_axis: Option<isize>,
        parents: bool,
        allow_dcm_reorient: bool,
        options: &BackendOptions,
    ) -> Result<()>;
}

/// Number of spatial axes of an image with `ndim` axes
pub(crate) fn spatial_ndim(ndim: usize, channeled: bool) -> usize {
    ndim.saturating_sub(usize::from(channeled)).min(3)
}

/// Convert a code in `coord_sys` convention to the Nib convention used by
/// [`reorient`]
fn to_nib_code(code: &str, coord_sys: CoordSys) -> Result<String> {
    match coord_sys {
        CoordSys::Nib => Ok(code.to_string()),
        CoordSys::Itk => Ok(inv_axcodes(Some(code))?.unwrap_or_default()),
    }
}

/// Reorient `image` so its first `n` axes match `code` (in the convention of
/// `metadata.coord_sys`)
pub(crate) fn reorient_to(
    image: ImageArray,
    metadata: &mut MetaData,
    code: &str,
    n: usize,
) -> Result<ImageArray> {
    let coord_sys = metadata.coord_sys;
    let nib_code = to_nib_code(code, coord_sys)?;
    metadata.convert(CoordSys::Nib)?;
    let (image, affine) = reorient(image, &metadata.affine, &nib_code, n)?;
    metadata.affine = affine;
    metadata.convert(coord_sys)?;
    Ok(image)
}

/// Common tail of every read: record the on-disk orientation, reorient if
/// asked to, and put the channel axis (last on entry) where the caller wants it
pub(crate) fn finish_read(
    image: ImageArray,
    mut metadata: MetaData,
    desired_ornt: Option<&str>,
    channeled: bool,
    channels_axis: Option<isize>,
) -> Result<(ImageArray, MetaData)> {
    let n = spatial_ndim(image.ndim(), channeled);
    metadata.orig_ornt = Some(metadata.ornt(n)?);

    let mut image = image;
    if let Some(code) = desired_ornt {
        image = reorient_to(image, &mut metadata, code, n)?;
    }
    if channeled && let Some(axis) = channels_axis {
        image = image.move_axis(-1, axis)?;
    }
    Ok((image, metadata))
}

/// Common head of every write: move the channel axis last, convert the
/// metadata to `coord_sys` and restore the original orientation if asked to.
///
/// Returns the image, the metadata describing it and whether it is channeled.
pub(crate) fn prepare_write(
    image: ImageArray,
    metadata: &MetaData,
    coord_sys: CoordSys,
    use_original_ornt: bool,
    channels_axis: Option<isize>,
) -> Result<(ImageArray, MetaData, bool)> {
    let mut metadata = metadata.clone().converted(coord_sys)?;
    let mut image = image;
    let channeled = channels_axis.is_some();
    if let Some(axis) = channels_axis {
        let axis = resolve_axis(axis, image.ndim())?;
        image = image.move_axis(axis as isize, -1)?;
    }

    if use_original_ornt && let Some(orig) = metadata.orig_ornt.clone() {
        let n = spatial_ndim(image.ndim(), channeled);
        if orig.len() == n {
            image = reorient_to(image, &mut metadata, &orig, n)?;
        } else {
            log::warn!(
                "original orientation {orig} does not fit a {n}-d image, saving as is"
            );
        }
    }
    Ok((image, metadata, channeled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn};

    fn ramp(shape: &[usize]) -> ImageArray {
        let len = shape.iter().product::<usize>();
        ImageArray::I32(
            ArrayD::from_shape_vec(IxDyn(shape), (0..len as i32).collect()).unwrap(),
        )
    }

    #[test]
    fn reorientation_of_itk_metadata_stays_in_lps() {
        let mut metadata = MetaData::identity(CoordSys::Itk);
        assert_eq!(metadata.ornt(3).unwrap(), "RAI");

        let image = reorient_to(ramp(&[2, 3, 4]), &mut metadata, "LAI", 3).unwrap();
        assert_eq!(metadata.coord_sys, CoordSys::Itk);
        assert_eq!(metadata.ornt(3).unwrap(), "LAI");
        assert_eq!(metadata.affine[[0, 0]], -1.0);
        assert_eq!(metadata.affine[[0, 3]], 1.0);
        let array = image.as_array::<i32>().unwrap();
        let original = ramp(&[2, 3, 4]);
        let original = original.as_array::<i32>().unwrap();
        assert_eq!(array[[0, 2, 3]], original[[1, 2, 3]]);
    }

    #[test]
    fn channels_go_last_for_writing_and_back_on_reading() {
        let metadata = MetaData::identity(CoordSys::Nib);
        let (image, metadata, channeled) =
            prepare_write(ramp(&[3, 4, 5, 6]), &metadata, CoordSys::Itk, true, Some(0)).unwrap();
        assert!(channeled);
        assert_eq!(image.shape(), &[4, 5, 6, 3]);
        assert_eq!(metadata.coord_sys, CoordSys::Itk);

        let (image, metadata) = finish_read(image, metadata, None, true, Some(0)).unwrap();
        assert_eq!(image.shape(), &[3, 4, 5, 6]);
        // RAS+ identity seen from LPS+
        assert_eq!(metadata.orig_ornt.as_deref(), Some("LPI"));
    }

    #[test]
    fn original_orientation_of_another_rank_is_ignored() {
        let mut metadata = MetaData::identity(CoordSys::Itk);
        metadata.orig_ornt = Some("RA".to_string());
        let (image, _, _) =
            prepare_write(ramp(&[2, 2, 2]), &metadata, CoordSys::Itk, true, None).unwrap();
        assert_eq!(image, ramp(&[2, 2, 2]));
    }
}
