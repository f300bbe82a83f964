use std::collections::BTreeMap;
use std::path::Path;

use ndarray::Array2;
use nifti::writer::WriterOptions;
use nifti::{
    InMemNiftiVolume, IntoNdArray, NiftiHeader, NiftiObject, NiftiType, NiftiVolume, ReaderOptions,
};

use crate::backends::{ImageBackend, finish_read, prepare_write, spatial_ndim};
use crate::enums::CoordSys;
use crate::error::{MedioError, Result};
use crate::image::{ImageArray, with_array};
use crate::metadata::MetaData;
use crate::options::BackendOptions;

/// NIFTI_INTENT_VECTOR, marks a 5-d image whose last axis holds vector components
const INTENT_VECTOR: i16 = 1007;
/// Scanner-independent "aligned" transform code
const XFORM_ALIGNED: i16 = 2;
/// Millimetres for space, seconds for time
const XYZT_MM_SEC: u8 = 2 | 8;

/// NIfTI backend over the `nifti` crate. Metadata is in the Nib (RAS+) convention.
#[derive(Debug, Default, Clone, Copy)]
pub struct NibIo;

impl NibIo {
    /// Voxel-to-world affine from the header: sform, then qform, then pixdim scaling
    pub fn header_affine(header: &NiftiHeader) -> Array2<f64> {
        let mut affine = Array2::<f64>::eye(4);
        if header.sform_code > 0 {
            for (row, srow) in [header.srow_x, header.srow_y, header.srow_z]
                .iter()
                .enumerate()
            {
                for (col, value) in srow.iter().enumerate() {
                    affine[[row, col]] = *value as f64;
                }
            }
        } else if header.qform_code > 0 {
            let b = header.quatern_b as f64;
            let c = header.quatern_c as f64;
            let d = header.quatern_d as f64;
            let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
            let qfac = if header.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
            let rotation = [
                [
                    a * a + b * b - c * c - d * d,
                    2.0 * (b * c - a * d),
                    2.0 * (b * d + a * c),
                ],
                [
                    2.0 * (b * c + a * d),
                    a * a + c * c - b * b - d * d,
                    2.0 * (c * d - a * b),
                ],
                [
                    2.0 * (b * d - a * c),
                    2.0 * (c * d + a * b),
                    a * a + d * d - c * c - b * b,
                ],
            ];
            let zooms = [
                header.pixdim[1] as f64,
                header.pixdim[2] as f64,
                header.pixdim[3] as f64 * qfac,
            ];
            for row in 0..3 {
                for col in 0..3 {
                    affine[[row, col]] = rotation[row][col] * zooms[col];
                }
            }
            affine[[0, 3]] = header.quatern_x as f64;
            affine[[1, 3]] = header.quatern_y as f64;
            affine[[2, 3]] = header.quatern_z as f64;
        } else {
            for axis in 0..3 {
                let zoom = header.pixdim[axis + 1] as f64;
                affine[[axis, axis]] = if zoom > 0.0 { zoom } else { 1.0 };
            }
        }
        affine
    }

    fn header_dict(header: &NiftiHeader) -> BTreeMap<String, String> {
        let descrip = String::from_utf8_lossy(&header.descrip)
            .trim_end_matches('\0')
            .to_string();
        BTreeMap::from([
            ("dim".to_string(), format!("{:?}", header.dim)),
            ("datatype".to_string(), header.datatype.to_string()),
            ("bitpix".to_string(), header.bitpix.to_string()),
            ("pixdim".to_string(), format!("{:?}", header.pixdim)),
            ("intent_code".to_string(), header.intent_code.to_string()),
            ("scl_slope".to_string(), header.scl_slope.to_string()),
            ("scl_inter".to_string(), header.scl_inter.to_string()),
            ("xyzt_units".to_string(), header.xyzt_units.to_string()),
            ("qform_code".to_string(), header.qform_code.to_string()),
            ("sform_code".to_string(), header.sform_code.to_string()),
            ("descrip".to_string(), descrip),
        ])
    }

    fn is_scaled(header: &NiftiHeader) -> bool {
        header.scl_slope != 0.0 && (header.scl_slope != 1.0 || header.scl_inter != 0.0)
    }

    fn decode(volume: InMemNiftiVolume, scaled: bool) -> Result<ImageArray> {
        let data_type = volume.data_type();
        let image = match data_type {
            NiftiType::Float64 => ImageArray::F64(volume.into_ndarray::<f64>()?),
            _ if scaled => ImageArray::F32(volume.into_ndarray::<f32>()?),
            NiftiType::Uint8 => ImageArray::U8(volume.into_ndarray::<u8>()?),
            NiftiType::Int8 => ImageArray::I8(volume.into_ndarray::<i8>()?),
            NiftiType::Uint16 => ImageArray::U16(volume.into_ndarray::<u16>()?),
            NiftiType::Int16 => ImageArray::I16(volume.into_ndarray::<i16>()?),
            NiftiType::Uint32 => ImageArray::U32(volume.into_ndarray::<u32>()?),
            NiftiType::Int32 => ImageArray::I32(volume.into_ndarray::<i32>()?),
            NiftiType::Int64 | NiftiType::Uint64 => {
                ImageArray::I64(volume.into_ndarray::<i64>()?)
            }
            NiftiType::Float32 => ImageArray::F32(volume.into_ndarray::<f32>()?),
            other => {
                return Err(MedioError::NotSupported(format!(
                    "NIfTI data type {other:?}"
                )));
            }
        };
        Ok(image)
    }

    /// Read the image exactly as stored, channel axis last if channeled
    pub(crate) fn read_raw(path: &Path, header: bool) -> Result<(ImageArray, MetaData, bool)> {
        let obj = ReaderOptions::new().read_file(path)?;
        let nifti_header = obj.header().clone();
        let affine = Self::header_affine(&nifti_header);
        let mut image = Self::decode(obj.into_volume(), Self::is_scaled(&nifti_header))?;

        // vector images are stored as (x, y, z, t = 1, c)
        let channeled = image.ndim() == 5 && image.shape()[3] == 1 && image.shape()[4] > 1;
        if channeled {
            image = image.remove_axis(3)?;
        }

        let mut metadata = MetaData::new(affine, None, CoordSys::Nib);
        if header {
            metadata = metadata.with_header(Self::header_dict(&nifti_header));
        }
        Ok((image, metadata, channeled))
    }

    /// Write `image` (channel axis last if `channeled`) with a Nib-convention affine
    pub(crate) fn write_raw(
        path: &Path,
        image: ImageArray,
        metadata: &MetaData,
        channeled: bool,
    ) -> Result<()> {
        let mut image = image;
        let mut intent_code = 0;
        if channeled {
            if image.ndim() > 4 {
                return Err(MedioError::NotSupported(
                    "channeled NIfTI images with a time axis".to_string(),
                ));
            }
            while image.ndim() < 4 {
                let channel_axis = image.ndim() - 1;
                image = image.insert_axis(channel_axis)?;
            }
            image = image.insert_axis(3)?;
            intent_code = INTENT_VECTOR;
        }
        let image = image.into_standard_layout();

        let header = Self::write_header(metadata, intent_code);
        let writer = WriterOptions::new(path).reference_header(&header);
        with_array!(image, a => writer.write_nifti(&a)?);
        Ok(())
    }

    fn write_header(metadata: &MetaData, intent_code: i16) -> NiftiHeader {
        let affine = &metadata.affine;
        let row = |r: usize| -> [f32; 4] {
            [
                affine[[r, 0]] as f32,
                affine[[r, 1]] as f32,
                affine[[r, 2]] as f32,
                affine[[r, 3]] as f32,
            ]
        };
        let spacing = metadata.spacing();
        NiftiHeader {
            pixdim: [
                1.0,
                spacing[0] as f32,
                spacing[1] as f32,
                spacing[2] as f32,
                1.0,
                1.0,
                1.0,
                1.0,
            ],
            sform_code: XFORM_ALIGNED,
            qform_code: 0,
            srow_x: row(0),
            srow_y: row(1),
            srow_z: row(2),
            intent_code,
            xyzt_units: XYZT_MM_SEC,
            scl_slope: 1.0,
            scl_inter: 0.0,
            ..NiftiHeader::default()
        }
    }
}

impl ImageBackend for NibIo {
    fn read_img(
        &self,
        path: &Path,
        desired_ornt: Option<&str>,
        header: bool,
        channels_axis: Option<isize>,
        _options: &BackendOptions,
    ) -> Result<(ImageArray, MetaData)> {
        let (image, metadata, channeled) = Self::read_raw(path, header)?;
        log::debug!(
            "nib: read {} with shape {:?} ({})",
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
            CoordSys::Nib,
            use_original_ornt,
            channels_axis,
        )?;
        if spatial_ndim(image.ndim(), channeled) == 0 {
            return Err(MedioError::InvalidArgument(
                "cannot save an image without spatial axes".to_string(),
            ));
        }
        Self::write_raw(path, image, &metadata, channeled)
    }
}
