//! # medio
//!
//! This crate serves a small high-level API for reading and writing medical
//! images. A single call reads a NIfTI volume, a raster image or a DICOM
//! series into an [`ImageArray`] plus its spatial [`MetaData`], and the
//! inverse calls write them back in a chosen format and orientation.
//!
//! Three backends do the actual work:
//!  - `nib`: NIfTI volumes through the `nifti` crate, RAS+ metadata
//!  - `itk`: NIfTI, raster formats and DICOM, LPS+ metadata
//!  - `pdcm` (also `pydicom`): DICOM series through the `dicom` crate
//!
//! Without an explicit backend, paths ending in `.nii` or `.nii.gz` go to
//! `nib` and everything else to `itk`. Orientation codes passed to the entry
//! points use the ITK convention (the letter names the side an axis points
//! away from) and are translated for `nib`. DICOM series slices are decoded in
//! parallel using rayon.
//!
//! DICOM series are assumed to have the following attributes:
//!   - One series per directory, or a series chosen by SeriesInstanceUID
//!   - No multiframe (always the first frame is used)
//!
//! # Examples
//!
//! ## Converting a DICOM series to NIfTI
//!
//! Read all DICOM files from the dicom/ directory in RAI orientation, cast the
//! voxels to float and save them as a compressed NIfTI file in the original
//! orientation.
//!
//! ```no_run
//! # use medio::{DType, ReadOptions, SaveOptions, read_img, save_img};
//! let (image, metadata) = read_img("dicom", &ReadOptions::new().desired_ornt("RAI"))
//!     .expect("should have read the series");
//! save_img(
//!     "out/volume.nii.gz",
//!     image,
//!     &metadata,
//!     &SaveOptions::new().dtype(DType::F32).mkdir(true, true),
//! )
//! .expect("should have saved the volume");
//! ```

pub mod backends;
pub mod enums;
pub mod error;
pub mod files;
pub mod image;
pub mod metadata;
pub mod options;
pub mod orientation;
pub mod read_save;

pub use backends::{DicomSeriesBackend, ImageBackend, ItkIo, NibIo, PdcmIo};
pub use enums::{Backend, CoordSys, DType, SortBy};
pub use error::{MedioError, Result};
pub use image::ImageArray;
pub use metadata::MetaData;
pub use options::{BackendOptions, ReadOptions, SaveDirOptions, SaveOptions};
pub use read_save::{Dispatcher, read_img, save_dir, save_img};
