use std::fmt;
use std::str::FromStr;

use crate::error::MedioError;

/// Reader/writer backend selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// NIfTI volumes through the `nifti` crate
    Nib,
    /// Generic formats (NIfTI, raster images, DICOM) with ITK axis conventions
    Itk,
    /// DICOM series through the `dicom` crate
    Pdcm,
}

impl FromStr for Backend {
    type Err = MedioError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        match token {
            "nib" => Ok(Backend::Nib),
            "itk" => Ok(Backend::Itk),
            "pdcm" | "pydicom" => Ok(Backend::Pdcm),
            other => Err(MedioError::InvalidArgument(format!(
                "unknown backend \"{other}\", must be one of: \"itk\", \"nib\", \"pdcm\" (or \"pydicom\")"
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Nib => write!(f, "nib"),
            Backend::Itk => write!(f, "itk"),
            Backend::Pdcm => write!(f, "pdcm"),
        }
    }
}

/// Element type of an image array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    I64,
    F32,
    F64,
}

impl DType {
    pub fn name(&self) -> &'static str {
        match self {
            DType::U8 => "uint8",
            DType::I8 => "int8",
            DType::U16 => "uint16",
            DType::I16 => "int16",
            DType::U32 => "uint32",
            DType::I32 => "int32",
            DType::I64 => "int64",
            DType::F32 => "float32",
            DType::F64 => "float64",
        }
    }
}

impl FromStr for DType {
    type Err = MedioError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name {
            "uint8" | "u8" => Ok(DType::U8),
            "int8" | "i8" => Ok(DType::I8),
            "uint16" | "u16" => Ok(DType::U16),
            "int16" | "i16" => Ok(DType::I16),
            "uint32" | "u32" => Ok(DType::U32),
            "int32" | "i32" => Ok(DType::I32),
            "int64" | "i64" => Ok(DType::I64),
            "float32" | "f32" => Ok(DType::F32),
            "float64" | "f64" => Ok(DType::F64),
            other => Err(MedioError::InvalidArgument(format!(
                "unknown dtype \"{other}\""
            ))),
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// World coordinate convention of a metadata affine.
///
/// `Nib` affines map into RAS+ space and orientation codes name the direction
/// an axis points to. `Itk` affines map into LPS+ space and orientation codes
/// name the direction an axis points from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordSys {
    #[default]
    Itk,
    Nib,
}

/// Slice ordering used when stacking a DICOM series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortBy {
    /// Projection of ImagePositionPatient onto the slice normal
    #[default]
    ImagePositionPatient,
    TablePosition,
    InstanceNumber,
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_tokens() {
        assert_eq!("nib".parse::<Backend>().unwrap(), Backend::Nib);
        assert_eq!("itk".parse::<Backend>().unwrap(), Backend::Itk);
        assert_eq!("pdcm".parse::<Backend>().unwrap(), Backend::Pdcm);
        assert_eq!("pydicom".parse::<Backend>().unwrap(), Backend::Pdcm);
    }

    #[test]
    fn rejects_unknown_backend() {
        let err = "bogus".parse::<Backend>().unwrap_err();
        assert!(matches!(err, MedioError::InvalidArgument(_)));
        assert!("NIB".parse::<Backend>().is_err());
    }

    #[test]
    fn dtype_names_parse_back() {
        for dtype in [
            DType::U8,
            DType::I8,
            DType::U16,
            DType::I16,
            DType::U32,
            DType::I32,
            DType::I64,
            DType::F32,
            DType::F64,
        ] {
            assert_eq!(dtype.name().parse::<DType>().unwrap(), dtype);
        }
        assert!("complex64".parse::<DType>().is_err());
    }
}
