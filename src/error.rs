use thiserror::Error;

#[derive(Debug, Error)]
pub enum MedioError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("No valid DICOM images found")]
    NoValidImages,

    #[error("Inconsistent image dimensions")]
    InconsistentDimensions,

    #[error("Slices differ in bits allocated or pixel representation")]
    InconsistentPixelFormat,

    #[error("Missing geometry information: {0}")]
    MissingGeometry(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("DICOM error: {0}")]
    DicomRead(#[from] dicom::object::ReadError),

    #[error("DICOM write error: {0}")]
    DicomWrite(String),

    #[error("Pixel data decoding error: {0}")]
    Decode(String),

    #[error("NIfTI error: {0}")]
    Nifti(#[from] nifti::error::NiftiError),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

pub type Result<T> = std::result::Result<T, MedioError>;
