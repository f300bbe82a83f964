//! Read and save entry points that pick a backend for a path.

use std::path::Path;

use web_time::Instant;

use crate::backends::{DicomSeriesBackend, ImageBackend, ItkIo, NibIo, PdcmIo};
use crate::enums::Backend;
use crate::error::{MedioError, Result};
use crate::files::{is_nifti, make_dir};
use crate::image::ImageArray;
use crate::metadata::MetaData;
use crate::options::{ReadOptions, SaveDirOptions, SaveOptions};
use crate::orientation::inv_axcodes;

/// Routes read and save calls to one of three backends.
///
/// [`Dispatcher::default`] uses [`NibIo`], [`ItkIo`] and [`PdcmIo`]; other
/// implementations can be plugged in with [`Dispatcher::new`].
pub struct Dispatcher {
    nib: Box<dyn ImageBackend>,
    itk: Box<dyn ImageBackend>,
    pdcm: Box<dyn DicomSeriesBackend>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Box::new(NibIo), Box::new(ItkIo), Box::new(PdcmIo))
    }
}

impl Dispatcher {
    pub fn new(
        nib: Box<dyn ImageBackend>,
        itk: Box<dyn ImageBackend>,
        pdcm: Box<dyn DicomSeriesBackend>,
    ) -> Self {
        Self { nib, itk, pdcm }
    }

    /// Read an image file or DICOM directory.
    ///
    /// Without an explicit backend, NIfTI paths go to the Nib backend and
    /// everything else to the Itk backend. `desired_ornt` is given in Itk
    /// convention and translated for the Nib backend.
    ///
    /// # Errors
    ///
    /// Returns `NotSupported` if a desired orientation is combined with the
    /// pdcm backend, an I/O `NotFound` error if the path does not exist, and
    /// any error of the selected backend unchanged
    pub fn read_img(
        &self,
        path: impl AsRef<Path>,
        options: &ReadOptions,
    ) -> Result<(ImageArray, MetaData)> {
        let path = path.as_ref();
        let desired_ornt = options.desired_ornt.as_deref();
        if options.backend == Some(Backend::Pdcm) && desired_ornt.is_some() {
            return Err(MedioError::NotSupported(
                "the pdcm backend does not support reorientation".to_string(),
            ));
        }
        let backend = match options.backend {
            Some(backend) => backend,
            None if is_nifti(path, true)? => Backend::Nib,
            None => Backend::Itk,
        };

        let start = Instant::now();
        let (image, metadata) = match backend {
            Backend::Nib => {
                let nib_ornt = inv_axcodes(desired_ornt)?;
                self.nib.read_img(
                    path,
                    nib_ornt.as_deref(),
                    options.header,
                    options.channels_axis,
                    &options.backend_options,
                )?
            }
            Backend::Itk => self.itk.read_img(
                path,
                desired_ornt,
                options.header,
                options.channels_axis,
                &options.backend_options,
            )?,
            Backend::Pdcm => self.pdcm.read_img(
                path,
                options.header,
                options.channels_axis,
                &options.backend_options,
            )?,
        };
        log::debug!(
            "read {} with the {backend} backend in {:?}",
            path.display(),
            start.elapsed()
        );

        let image = match options.dtype {
            Some(dtype) => image.astype(dtype),
            None => image,
        };
        Ok((image, metadata))
    }

    /// Save an image to a single file.
    ///
    /// Only the Nib and Itk backends write files; DICOM series are written
    /// with [`Dispatcher::save_dir`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for the pdcm backend before any directory is
    /// created, an I/O error if the parent directory cannot be created, and any
    /// error of the selected backend unchanged
    pub fn save_img(
        &self,
        path: impl AsRef<Path>,
        image: ImageArray,
        metadata: &MetaData,
        options: &SaveOptions,
    ) -> Result<()> {
        let path = path.as_ref();
        let backend = match options.backend {
            Some(Backend::Pdcm) => {
                return Err(MedioError::InvalidArgument(
                    "backend must be \"itk\" or \"nib\" when saving a file, use save_dir for DICOM series"
                        .to_string(),
                ));
            }
            Some(backend) => backend,
            None if is_nifti(path, false)? => Backend::Nib,
            None => Backend::Itk,
        };

        if options.mkdir
            && let Some(parent) = path.parent()
        {
            make_dir(parent, options.parents)?;
        }

        let image = match options.dtype {
            Some(dtype) => image.astype(dtype),
            None => image,
        };
        let writer = match backend {
            Backend::Nib => &self.nib,
            _ => &self.itk,
        };
        writer.save_img(
            path,
            image,
            metadata,
            options.use_original_ornt,
            options.channels_axis,
            &options.backend_options,
        )?;
        log::info!("saved {} with the {backend} backend", path.display());
        Ok(())
    }

    /// Save an image as a DICOM series, one file per slice, into `dir`
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if `dir` exists and is not empty, and
    /// `NotSupported` for element types or shapes a DICOM series cannot hold or
    /// for left-handed images without `allow_dcm_reorient`
    pub fn save_dir(
        &self,
        dir: impl AsRef<Path>,
        image: ImageArray,
        metadata: &MetaData,
        options: &SaveDirOptions,
    ) -> Result<()> {
        let dir = dir.as_ref();
        let image = match options.dtype {
            Some(dtype) => image.astype(dtype),
            None => image,
        };
        self.pdcm.save_dcm_dir(
            dir,
            image,
            metadata,
            options.use_original_ornt,
            options.channels_axis,
            options.parents,
            options.allow_dcm_reorient,
            &options.backend_options,
        )?;
        log::info!("saved DICOM series to {}", dir.display());
        Ok(())
    }
}

/// Read with the default backends, see [`Dispatcher::read_img`]
pub fn read_img(path: impl AsRef<Path>, options: &ReadOptions) -> Result<(ImageArray, MetaData)> {
    Dispatcher::default().read_img(path, options)
}

/// Save with the default backends, see [`Dispatcher::save_img`]
pub fn save_img(
    path: impl AsRef<Path>,
    image: ImageArray,
    metadata: &MetaData,
    options: &SaveOptions,
) -> Result<()> {
    Dispatcher::default().save_img(path, image, metadata, options)
}

/// Save a DICOM series with the default backend, see [`Dispatcher::save_dir`]
pub fn save_dir(
    dir: impl AsRef<Path>,
    image: ImageArray,
    metadata: &MetaData,
    options: &SaveDirOptions,
) -> Result<()> {
    Dispatcher::default().save_dir(dir, image, metadata, options)
}
