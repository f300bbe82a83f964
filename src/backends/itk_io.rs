use std::path::Path;

use image::{DynamicImage, ImageBuffer};
use ndarray::{Array3, ArrayD, Axis};

use crate::backends::nib_io::NibIo;
use crate::backends::pdcm_io::PdcmIo;
use crate::backends::{ImageBackend, finish_read, prepare_write, spatial_ndim};
use crate::enums::CoordSys;
use crate::error::{MedioError, Result};
use crate::files::{is_dicom, is_nifti, is_raster};
use crate::image::ImageArray;
use crate::metadata::MetaData;
use crate::options::BackendOptions;

/// General purpose backend with ITK conventions.
///
/// Metadata is LPS+ ([`CoordSys::Itk`]) and orientation codes name the side
/// each axis points away from. NIfTI files, raster images (`.png`, `.jpg`,
/// `.tif`, ...) and DICOM series or single `.dcm` files can be read; NIfTI and
/// raster images can be written.
#[derive(Debug, Default, Clone, Copy)]
pub struct ItkIo;

impl ItkIo {
    /// Read a raster image as an (x, y[, c]) array with an identity affine
    fn read_raster(path: &Path) -> Result<(ImageArray, MetaData, bool)> {
        let decoded = image::open(path)?;
        let (width, height) = (decoded.width() as usize, decoded.height() as usize);

        let (image, channeled) = match decoded {
            DynamicImage::ImageLuma8(buffer) => (
                ImageArray::U8(to_xy(buffer.into_raw(), width, height, 1)?),
                false,
            ),
            DynamicImage::ImageLuma16(buffer) => (
                ImageArray::U16(to_xy(buffer.into_raw(), width, height, 1)?),
                false,
            ),
            DynamicImage::ImageRgb8(buffer) => (
                ImageArray::U8(to_xy(buffer.into_raw(), width, height, 3)?),
                true,
            ),
            DynamicImage::ImageRgba8(buffer) => (
                ImageArray::U8(to_xy(buffer.into_raw(), width, height, 4)?),
                true,
            ),
            DynamicImage::ImageRgb16(buffer) => (
                ImageArray::U16(to_xy(buffer.into_raw(), width, height, 3)?),
                true,
            ),
            DynamicImage::ImageRgba16(buffer) => (
                ImageArray::U16(to_xy(buffer.into_raw(), width, height, 4)?),
                true,
            ),
            DynamicImage::ImageRgb32F(buffer) => (
                ImageArray::F32(to_xy(buffer.into_raw(), width, height, 3)?),
                true,
            ),
            DynamicImage::ImageRgba32F(buffer) => (
                ImageArray::F32(to_xy(buffer.into_raw(), width, height, 4)?),
                true,
            ),
            // gray with alpha and future variants
            other => (
                ImageArray::U8(to_xy(other.into_rgba8().into_raw(), width, height, 4)?),
                true,
            ),
        };

        let metadata = MetaData::identity(CoordSys::Itk);
        Ok((image, metadata, channeled))
    }

    fn write_raster(path: &Path, image: ImageArray, channeled: bool) -> Result<()> {
        let mut image = image;
        // a single slice volume is saved as a plane
        if spatial_ndim(image.ndim(), channeled) == 3 && image.shape()[2] == 1 {
            image = image.remove_axis(2)?;
        }
        let spatial = image.ndim() - usize::from(channeled);
        if spatial != 2 {
            return Err(MedioError::NotSupported(format!(
                "raster images must be 2-d, got shape {:?}",
                image.shape()
            )));
        }
        let channels = if channeled { image.shape()[2] } else { 1 };

        let (width, height) = (image.shape()[0] as u32, image.shape()[1] as u32);
        let shape_error =
            || MedioError::InvalidArgument("pixel buffer does not match the image size".to_string());
        let dynamic = match (image, channels) {
            (ImageArray::U8(a), 1) => DynamicImage::ImageLuma8(
                ImageBuffer::from_raw(width, height, to_row_major(&a)).ok_or_else(shape_error)?,
            ),
            (ImageArray::U8(a), 3) => DynamicImage::ImageRgb8(
                ImageBuffer::from_raw(width, height, to_row_major(&a)).ok_or_else(shape_error)?,
            ),
            (ImageArray::U8(a), 4) => DynamicImage::ImageRgba8(
                ImageBuffer::from_raw(width, height, to_row_major(&a)).ok_or_else(shape_error)?,
            ),
            (ImageArray::U16(a), 1) => DynamicImage::ImageLuma16(
                ImageBuffer::from_raw(width, height, to_row_major(&a)).ok_or_else(shape_error)?,
            ),
            (ImageArray::U16(a), 3) => DynamicImage::ImageRgb16(
                ImageBuffer::from_raw(width, height, to_row_major(&a)).ok_or_else(shape_error)?,
            ),
            (ImageArray::U16(a), 4) => DynamicImage::ImageRgba16(
                ImageBuffer::from_raw(width, height, to_row_major(&a)).ok_or_else(shape_error)?,
            ),
            (other, channels) => {
                return Err(MedioError::NotSupported(format!(
                    "raster export of {} images with {channels} channel(s), cast to uint8 or uint16 with 1, 3 or 4 channels",
                    other.dtype()
                )));
            }
        };
        dynamic.save(path)?;
        Ok(())
    }
}

impl ImageBackend for ItkIo {
    fn read_img(
        &self,
        path: &Path,
        desired_ornt: Option<&str>,
        header: bool,
        channels_axis: Option<isize>,
        options: &BackendOptions,
    ) -> Result<(ImageArray, MetaData)> {
        let (image, metadata, channeled) = if is_nifti(path, true)? {
            let (image, metadata, channeled) = NibIo::read_raw(path, header)?;
            (image, metadata.converted(CoordSys::Itk)?, channeled)
        } else if is_dicom(path) {
            PdcmIo::load(path, header, options)?
        } else if is_raster(path) {
            Self::read_raster(path)?
        } else {
            return Err(MedioError::NotSupported(format!(
                "no reader for \"{}\"",
                path.display()
            )));
        };
        log::debug!(
            "itk: read {} with shape {:?} ({})",
            path.display(),
            image.shape(),
            image.dtype()
        );
        finish_read(image, metadata, desired_ornt, channeled, channels_axis)
    }

    fn save_img(
        &self,
        path: &Path,
        image: ImageArray,
        metadata: &MetaData,
        use_original_ornt: bool,
        channels_axis: Option<isize>,
        _options: &BackendOptions,
    ) -> Result<()> {
        let (image, metadata, channeled) = prepare_write(
            image,
            metadata,
            CoordSys::Itk,
            use_original_ornt,
            channels_axis,
        )?;

        if is_nifti(path, false)? {
            NibIo::write_raw(path, image, &metadata.converted(CoordSys::Nib)?, channeled)
        } else if is_raster(path) {
            Self::write_raster(path, image, channeled)
        } else if is_dicom(path) {
            Err(MedioError::NotSupported(
                "DICOM output is written as a series, use save_dir".to_string(),
            ))
        } else {
            Err(MedioError::NotSupported(format!(
                "no writer for \"{}\"",
                path.display()
            )))
        }
    }
}

/// Turn a row-major (y, x[, c]) pixel buffer into an (x, y[, c]) array
fn to_xy<T>(raw: Vec<T>, width: usize, height: usize, channels: usize) -> Result<ArrayD<T>> {
    let pixels = Array3::from_shape_vec((height, width, channels), raw)?.permuted_axes([1, 0, 2]);
    if channels == 1 {
        Ok(pixels.index_axis_move(Axis(2), 0).into_dyn())
    } else {
        Ok(pixels.into_dyn())
    }
}

/// Row-major pixel buffer of an (x, y[, c]) array
fn to_row_major<T: Copy>(array: &ArrayD<T>) -> Vec<T> {
    let mut view = array.view();
    view.swap_axes(0, 1);
    view.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, array};

    #[test]
    fn pixel_buffers_become_x_major() {
        // two rows of three pixels
        let array = to_xy(vec![1u8, 2, 3, 4, 5, 6], 3, 2, 1).unwrap();
        assert_eq!(array.shape(), &[3, 2]);
        assert_eq!(array[[2, 0]], 3);
        assert_eq!(array[[0, 1]], 4);
        assert_eq!(to_row_major(&array), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn gray_png_round_trip() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("plane.png");
        let pixels = Array2::from_shape_fn((5, 3), |(x, y)| (x * 10 + y) as u8).into_dyn();
        let metadata = MetaData::identity(CoordSys::Itk);

        ItkIo
            .save_img(
                &path,
                ImageArray::U8(pixels.clone()),
                &metadata,
                true,
                None,
                &BackendOptions::default(),
            )
            .unwrap();
        let (image, read_meta) = ItkIo
            .read_img(&path, None, false, Some(-1), &BackendOptions::default())
            .unwrap();

        assert_eq!(image, ImageArray::U8(pixels));
        assert_eq!(read_meta.orig_ornt.as_deref(), Some("RA"));
        assert_eq!(read_meta.spacing(), [1.0, 1.0, 1.0]);
    }

    #[test]
    fn rgb_channels_can_be_moved_first() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("rgb.png");
        let pixels = array![
            [[255u8, 0, 0], [0, 255, 0]],
            [[0, 0, 255], [9, 9, 9]],
            [[1, 2, 3], [4, 5, 6]]
        ]
        .into_dyn();
        ItkIo
            .save_img(
                &path,
                ImageArray::U8(pixels.clone()),
                &MetaData::identity(CoordSys::Itk),
                false,
                Some(-1),
                &BackendOptions::default(),
            )
            .unwrap();

        let (image, _) = ItkIo
            .read_img(&path, None, false, Some(0), &BackendOptions::default())
            .unwrap();
        assert_eq!(image.shape(), &[3, 3, 2]);
        let array = image.as_array::<u8>().unwrap();
        assert_eq!(array[[2, 1, 0]], 255);
        assert_eq!(array[[2, 0, 1]], 0);
        assert_eq!(array[[0, 2, 1]], 4);
    }

    #[test]
    fn float_raster_export_is_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let err = ItkIo
            .save_img(
                &temp.path().join("plane.png"),
                ImageArray::F32(ArrayD::zeros(vec![4, 4])),
                &MetaData::identity(CoordSys::Itk),
                true,
                None,
                &BackendOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, MedioError::NotSupported(_)));
    }

    #[test]
    fn unknown_suffix_has_no_writer() {
        let temp = tempfile::tempdir().unwrap();
        let err = ItkIo
            .save_img(
                &temp.path().join("volume.xyz"),
                ImageArray::U8(ArrayD::zeros(vec![2, 2])),
                &MetaData::identity(CoordSys::Itk),
                true,
                None,
                &BackendOptions::default(),
            )
            .unwrap_err();
        assert!(matches!(err, MedioError::NotSupported(_)));
    }
}
