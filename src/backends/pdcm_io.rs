use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dicom::core::{DataElement, PrimitiveValue, Tag, VR};
use dicom::object::{FileDicomObject, FileMetaTableBuilder, InMemDicomObject, open_file};
use dicom::pixeldata::{ConvertOptions, ModalityLutOption, PixelDecoder, VoiLutOption};
use dicom_dictionary_std::{tags, uids};
use ndarray::{Array2, Array3, ArrayD, ArrayView3, Axis, s};
use rayon::prelude::*;
use web_time::{SystemTime, UNIX_EPOCH};

use crate::backends::{DicomSeriesBackend, finish_read, prepare_write, reorient_to, spatial_ndim};
use crate::enums::{CoordSys, SortBy};
use crate::error::{MedioError, Result};
use crate::files::make_empty_dir;
use crate::image::ImageArray;
use crate::metadata::MetaData;
use crate::options::BackendOptions;

type DicomFile = FileDicomObject<InMemDicomObject>;

/// Tags copied into the metadata header dictionary
const HEADER_TAGS: [(&str, Tag); 14] = [
    ("PatientID", tags::PATIENT_ID),
    ("PatientName", tags::PATIENT_NAME),
    ("StudyInstanceUID", tags::STUDY_INSTANCE_UID),
    ("StudyDate", tags::STUDY_DATE),
    ("SeriesInstanceUID", tags::SERIES_INSTANCE_UID),
    ("SeriesDescription", tags::SERIES_DESCRIPTION),
    ("Modality", tags::MODALITY),
    ("Manufacturer", tags::MANUFACTURER),
    ("PhotometricInterpretation", tags::PHOTOMETRIC_INTERPRETATION),
    ("BitsAllocated", tags::BITS_ALLOCATED),
    ("PixelRepresentation", tags::PIXEL_REPRESENTATION),
    ("RescaleSlope", tags::RESCALE_SLOPE),
    ("RescaleIntercept", tags::RESCALE_INTERCEPT),
    ("SliceThickness", tags::SLICE_THICKNESS),
];

/// Files of one DICOM series found in a directory
#[derive(Debug, Clone)]
pub struct DicomSeriesInfo {
    pub series_instance_uid: String,
    pub series_description: String,
    pub modality: String,
    pub file_paths: Vec<PathBuf>,
}

/// Voxel type a series decodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PixelKind {
    U8,
    U16,
    I16,
    /// Rescaled or wider than 16 bits
    F32,
}

/// DICOM series backend over the `dicom` crate.
///
/// Reads a directory holding one series (or one file) into a volume indexed
/// (column, row, slice) with Itk (LPS+) metadata, and writes volumes back as
/// one file per slice. Reorientation on read is not supported.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdcmIo;

impl PdcmIo {
    /// Group the DICOM files of `dir` by SeriesInstanceUID. Files that fail to
    /// parse as DICOM are skipped.
    pub fn scan_directory(dir: impl AsRef<Path>) -> Result<Vec<DicomSeriesInfo>> {
        let entries: Vec<PathBuf> = fs::read_dir(dir.as_ref())?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();

        let headers: Vec<(PathBuf, String, String, String)> = entries
            .par_iter()
            .filter_map(|path| {
                let object = open_file(path).ok()?;
                Some((
                    path.clone(),
                    get_string(&object, tags::SERIES_INSTANCE_UID).unwrap_or_default(),
                    get_string(&object, tags::SERIES_DESCRIPTION).unwrap_or_default(),
                    get_string(&object, tags::MODALITY).unwrap_or_default(),
                ))
            })
            .collect();

        let mut series_map: HashMap<String, DicomSeriesInfo> = HashMap::new();
        for (path, uid, description, modality) in headers {
            series_map
                .entry(uid.clone())
                .or_insert_with(|| DicomSeriesInfo {
                    series_instance_uid: uid,
                    series_description: description,
                    modality,
                    file_paths: Vec::new(),
                })
                .file_paths
                .push(path);
        }

        let mut series_list: Vec<DicomSeriesInfo> = series_map.into_values().collect();
        for series in &mut series_list {
            series.file_paths.sort();
        }
        series_list.sort_by(|a, b| a.series_instance_uid.cmp(&b.series_instance_uid));
        Ok(series_list)
    }

    fn select_series(dir: &Path, options: &BackendOptions) -> Result<DicomSeriesInfo> {
        let mut series_list = Self::scan_directory(dir)?;
        if series_list.is_empty() {
            return Err(MedioError::NoValidImages);
        }
        match &options.series {
            Some(uid) => series_list
                .into_iter()
                .find(|series| &series.series_instance_uid == uid)
                .ok_or_else(|| {
                    MedioError::InvalidArgument(format!(
                        "series \"{uid}\" not found in \"{}\"",
                        dir.display()
                    ))
                }),
            None if series_list.len() == 1 => Ok(series_list.remove(0)),
            None => {
                let uids: Vec<&str> = series_list
                    .iter()
                    .map(|series| series.series_instance_uid.as_str())
                    .collect();
                Err(MedioError::InvalidArgument(format!(
                    "\"{}\" holds {} series, choose one with the series option: {}",
                    dir.display(),
                    uids.len(),
                    uids.join(", ")
                )))
            }
        }
    }

    /// Read the series at `path` as stored. Channel axis last if channeled.
    pub(crate) fn load(
        path: &Path,
        header: bool,
        options: &BackendOptions,
    ) -> Result<(ImageArray, MetaData, bool)> {
        let paths = if path.is_dir() {
            Self::select_series(path, options)?.file_paths
        } else {
            vec![path.to_path_buf()]
        };

        let objects = paths
            .par_iter()
            .map(|path| open_file(path).map_err(MedioError::from))
            .collect::<Result<Vec<DicomFile>>>()?;
        let objects = Self::sort_slices(objects, options.sort_by);
        let first = objects.first().ok_or(MedioError::NoValidImages)?;

        let samples = get_u32(first, tags::SAMPLES_PER_PIXEL).unwrap_or(1) as usize;
        let channeled = samples > 1;
        let image = Self::decode_volume(&objects, Self::pixel_kind(&objects)?)?;
        let affine = Self::geometry(&objects, options.allow_default_affine)?;

        let mut metadata = MetaData::new(affine, None, CoordSys::Itk);
        if header {
            metadata = metadata.with_header(Self::header_dict(first));
        }
        Ok((image, metadata, channeled))
    }

    fn sort_order(object: &DicomFile, sort_by: SortBy, normal: Option<[f64; 3]>) -> Option<f64> {
        match sort_by {
            SortBy::ImagePositionPatient => {
                let position = get_position(object)?;
                let normal = normal?;
                Some(dot(&position, &normal))
            }
            SortBy::TablePosition => get_f64(object, tags::TABLE_POSITION),
            SortBy::InstanceNumber => object
                .element(tags::INSTANCE_NUMBER)
                .ok()?
                .to_int::<i32>()
                .ok()
                .map(f64::from),
            SortBy::None => Some(0.0),
        }
    }

    fn sort_slices(objects: Vec<DicomFile>, sort_by: SortBy) -> Vec<DicomFile> {
        if matches!(sort_by, SortBy::None) {
            return objects;
        }
        let normal = objects.first().and_then(slice_normal);
        let mut with_order: Vec<(Option<f64>, DicomFile)> = objects
            .into_iter()
            .map(|object| (Self::sort_order(&object, sort_by, normal), object))
            .collect();
        with_order.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        with_order.into_iter().map(|(_, object)| object).collect()
    }

    /// Voxel type of the whole series. Slices must share their stored pixel
    /// format; any rescaled slice makes the series rescaled.
    fn pixel_kind(objects: &[DicomFile]) -> Result<PixelKind> {
        let first = objects.first().ok_or(MedioError::NoValidImages)?;
        let format = |object: &DicomFile| {
            (
                get_u32(object, tags::BITS_ALLOCATED).unwrap_or(16),
                get_u32(object, tags::PIXEL_REPRESENTATION).unwrap_or(0) == 1,
            )
        };
        let (bits, signed) = format(first);
        if objects.iter().any(|object| format(object) != (bits, signed)) {
            return Err(MedioError::InconsistentPixelFormat);
        }

        let rescaled = objects.iter().any(|object| {
            let slope = get_f64(object, tags::RESCALE_SLOPE).unwrap_or(1.0);
            let intercept = get_f64(object, tags::RESCALE_INTERCEPT).unwrap_or(0.0);
            slope != 1.0 || intercept != 0.0
        });
        if rescaled {
            return Ok(PixelKind::F32);
        }
        Ok(match (bits, signed) {
            (8, false) => PixelKind::U8,
            (16, false) => PixelKind::U16,
            (16, true) => PixelKind::I16,
            _ => PixelKind::F32,
        })
    }

    fn decode_volume(objects: &[DicomFile], kind: PixelKind) -> Result<ImageArray> {
        let raw = ConvertOptions::new()
            .with_modality_lut(ModalityLutOption::None)
            .with_voi_lut(VoiLutOption::Identity);

        macro_rules! decode_as {
            ($t:ty, $variant:ident, $options:expr) => {{
                let planes = objects
                    .par_iter()
                    .map(|object| -> Result<Array3<$t>> {
                        let pixel_data = object
                            .decode_pixel_data()
                            .map_err(|e| MedioError::Decode(e.to_string()))?;
                        let array = pixel_data
                            .to_ndarray_with_options::<$t>($options)
                            .map_err(|e| MedioError::Decode(e.to_string()))?;
                        // first frame only
                        Ok(array.slice_move(s![0, .., .., ..]))
                    })
                    .collect::<Result<Vec<_>>>()?;
                ImageArray::$variant(Self::build_volume_array(&planes)?)
            }};
        }

        let image = match kind {
            PixelKind::U8 => decode_as!(u8, U8, &raw),
            PixelKind::U16 => decode_as!(u16, U16, &raw),
            PixelKind::I16 => decode_as!(i16, I16, &raw),
            PixelKind::F32 => {
                let rescaled = ConvertOptions::new()
                    .with_modality_lut(ModalityLutOption::Default)
                    .with_voi_lut(VoiLutOption::Identity);
                decode_as!(f32, F32, &rescaled)
            }
        };
        Ok(image)
    }

    fn validate_dimensions<T>(planes: &[Array3<T>]) -> Result<()> {
        let first_dim = planes.first().ok_or(MedioError::NoValidImages)?.dim();
        if planes.iter().any(|plane| plane.dim() != first_dim) {
            return Err(MedioError::InconsistentDimensions);
        }
        Ok(())
    }

    /// Stack (rows, columns, samples) planes into a (columns, rows, slices[, samples]) volume
    fn build_volume_array<T: Clone>(planes: &[Array3<T>]) -> Result<ArrayD<T>> {
        Self::validate_dimensions(planes)?;
        let views: Vec<ArrayView3<'_, T>> = planes.iter().map(|plane| plane.view()).collect();
        let volume = ndarray::stack(Axis(2), &views)?.permuted_axes([1, 0, 2, 3]);
        if volume.shape()[3] == 1 {
            Ok(volume.index_axis_move(Axis(3), 0).into_dyn())
        } else {
            Ok(volume.into_dyn())
        }
    }

    /// LPS+ affine of the sorted slices
    fn geometry(objects: &[DicomFile], allow_default_affine: bool) -> Result<Array2<f64>> {
        let first = objects.first().ok_or(MedioError::NoValidImages)?;
        let spacing = get_f64_vec(first, tags::PIXEL_SPACING).filter(|v| v.len() == 2);
        let orientation =
            get_f64_vec(first, tags::IMAGE_ORIENTATION_PATIENT).filter(|v| v.len() == 6);
        let origin = get_position(first);
        let thickness = get_f64(first, tags::SPACING_BETWEEN_SLICES)
            .or_else(|| get_f64(first, tags::SLICE_THICKNESS))
            .filter(|v| *v > 0.0)
            .unwrap_or(1.0);

        let (Some(spacing), Some(orientation), Some(origin)) = (&spacing, orientation, origin)
        else {
            if !allow_default_affine {
                return Err(MedioError::MissingGeometry(
                    "PixelSpacing, ImageOrientationPatient and ImagePositionPatient are required"
                        .to_string(),
                ));
            }
            log::warn!("DICOM geometry tags missing, using a spacing-only affine");
            let (dy, dx) = spacing.as_ref().map_or((1.0, 1.0), |v| (v[0], v[1]));
            let mut affine = Array2::<f64>::eye(4);
            affine[[0, 0]] = dx;
            affine[[1, 1]] = dy;
            affine[[2, 2]] = thickness;
            return Ok(affine);
        };

        let row_dir = normalize([orientation[0], orientation[1], orientation[2]]);
        let col_dir = normalize([orientation[3], orientation[4], orientation[5]]);
        let (dy, dx) = (spacing[0], spacing[1]);

        let last_position = objects.last().and_then(get_position);
        let slice_step = match last_position {
            Some(last) if objects.len() > 1 => {
                let steps = (objects.len() - 1) as f64;
                [
                    (last[0] - origin[0]) / steps,
                    (last[1] - origin[1]) / steps,
                    (last[2] - origin[2]) / steps,
                ]
            }
            _ => {
                let normal = cross(&row_dir, &col_dir);
                [normal[0] * thickness, normal[1] * thickness, normal[2] * thickness]
            }
        };

        let mut affine = Array2::<f64>::eye(4);
        for axis in 0..3 {
            affine[[axis, 0]] = row_dir[axis] * dx;
            affine[[axis, 1]] = col_dir[axis] * dy;
            affine[[axis, 2]] = slice_step[axis];
            affine[[axis, 3]] = origin[axis];
        }
        Ok(affine)
    }

    fn header_dict(object: &DicomFile) -> BTreeMap<String, String> {
        HEADER_TAGS
            .iter()
            .filter_map(|(name, tag)| Some((name.to_string(), get_string(object, *tag)?)))
            .collect()
    }

    fn write_slices(
        dir: &Path,
        image: &ImageArray,
        metadata: &MetaData,
        channeled: bool,
        options: &BackendOptions,
    ) -> Result<()> {
        let pixel_format = PixelFormat::of(image, channeled)?;
        let shape = image.shape();
        let (columns, rows, slices) = (shape[0], shape[1], shape[2]);
        let too_large = || {
            MedioError::NotSupported(format!("slice of {columns} x {rows} pixels is too large"))
        };
        let rows_us = u16::try_from(rows).map_err(|_| too_large())?;
        let columns_us = u16::try_from(columns).map_err(|_| too_large())?;

        let direction = metadata.direction();
        let spacing = metadata.spacing();
        let origin = metadata.origin();
        let study_uid = new_uid();
        let series_uid = new_uid();
        let frame_uid = new_uid();

        let orientation: Vec<f64> = (0..2)
            .flat_map(|col| (0..3).map(move |row| (row, col)))
            .map(|(row, col)| direction[[row, col]])
            .collect();

        for k in 0..slices {
            let position: Vec<f64> = (0..3)
                .map(|axis| origin[axis] + metadata.affine[[axis, 2]] * k as f64)
                .collect();
            let instance_uid = new_uid();

            let mut object = InMemDicomObject::new_empty();
            put_str(&mut object, tags::SOP_CLASS_UID, VR::UI, uids::SECONDARY_CAPTURE_IMAGE_STORAGE);
            put_str(&mut object, tags::SOP_INSTANCE_UID, VR::UI, &instance_uid);
            put_str(&mut object, tags::STUDY_INSTANCE_UID, VR::UI, &study_uid);
            put_str(&mut object, tags::SERIES_INSTANCE_UID, VR::UI, &series_uid);
            put_str(&mut object, tags::FRAME_OF_REFERENCE_UID, VR::UI, &frame_uid);
            put_str(&mut object, tags::MODALITY, VR::CS, "OT");
            put_str(&mut object, tags::SERIES_NUMBER, VR::IS, "1");
            put_str(&mut object, tags::INSTANCE_NUMBER, VR::IS, &(k + 1).to_string());
            put_ds(&mut object, tags::IMAGE_POSITION_PATIENT, &position);
            put_ds(&mut object, tags::IMAGE_ORIENTATION_PATIENT, &orientation);
            put_ds(&mut object, tags::PIXEL_SPACING, &[spacing[1], spacing[0]]);
            put_ds(&mut object, tags::SLICE_THICKNESS, &[spacing[2]]);
            put_ds(&mut object, tags::SPACING_BETWEEN_SLICES, &[spacing[2]]);
            put_us(&mut object, tags::ROWS, rows_us);
            put_us(&mut object, tags::COLUMNS, columns_us);
            pixel_format.put_pixel_module(&mut object, image, k)?;

            let file_object = object
                .with_meta(
                    FileMetaTableBuilder::new()
                        .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                        .media_storage_sop_class_uid(uids::SECONDARY_CAPTURE_IMAGE_STORAGE)
                        .media_storage_sop_instance_uid(instance_uid.as_str()),
                )
                .map_err(|e| MedioError::DicomWrite(e.to_string()))?;
            file_object
                .write_to_file(dir.join(options.slice_file_name(k)))
                .map_err(|e| MedioError::DicomWrite(e.to_string()))?;
        }
        Ok(())
    }
}

impl DicomSeriesBackend for PdcmIo {
    fn read_img(
        &self,
        path: &Path,
        header: bool,
        channels_axis: Option<isize>,
        options: &BackendOptions,
    ) -> Result<(ImageArray, MetaData)> {
        let (image, metadata, channeled) = Self::load(path, header, options)?;
        log::debug!(
            "pdcm: read {} with shape {:?} ({})",
            path.display(),
            image.shape(),
            image.dtype()
        );
        finish_read(image, metadata, None, channeled, channels_axis)
    }

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
    ) -> Result<()> {
        let (mut image, mut metadata, channeled) = prepare_write(
            image,
            metadata,
            CoordSys::Itk,
            use_original_ornt,
            channels_axis,
        )?;

        match spatial_ndim(image.ndim(), channeled) {
            2 => image = image.insert_axis(2)?,
            3 if image.ndim() == 3 + usize::from(channeled) => {}
            _ => {
                return Err(MedioError::NotSupported(format!(
                    "DICOM series export of an image with shape {:?}",
                    image.shape()
                )));
            }
        }

        // slices are stacked along the row x column normal, so the voxel axes
        // must form a right-handed system
        if determinant(&metadata.direction()) < 0.0 {
            let ornt = metadata.ornt(3)?;
            if !allow_dcm_reorient {
                return Err(MedioError::NotSupported(format!(
                    "left-handed orientation {ornt} cannot be saved as a DICOM series, \
                     allow reorientation to save it flipped along the slice axis"
                )));
            }
            let mut flipped: Vec<char> = ornt.chars().collect();
            if let Some(last) = flipped.last_mut() {
                *last = opposite_code(*last);
            }
            let flipped: String = flipped.into_iter().collect();
            log::info!("reorienting {ornt} to {flipped} for DICOM export");
            image = reorient_to(image, &mut metadata, &flipped, 3)?;
        }

        let shape = image.shape();
        if u16::try_from(shape[0]).is_err() || u16::try_from(shape[1]).is_err() {
            return Err(MedioError::NotSupported(format!(
                "DICOM slices are limited to {} rows and columns, got shape {:?}",
                u16::MAX,
                shape
            )));
        }

        make_empty_dir(dir, parents)?;
        let image = image.into_standard_layout();
        Self::write_slices(dir, &image, &metadata, channeled, options)?;
        log::debug!(
            "pdcm: wrote {} slices to {}",
            image.shape()[2],
            dir.display()
        );
        Ok(())
    }
}

/// Pixel module attributes for the supported export types
#[derive(Debug, Clone, Copy)]
enum PixelFormat {
    Mono8,
    Mono16 { signed: bool },
    Rgb8,
}

impl PixelFormat {
    fn of(image: &ImageArray, channeled: bool) -> Result<Self> {
        match (image, channeled) {
            (ImageArray::U8(_), false) => Ok(PixelFormat::Mono8),
            (ImageArray::U16(_), false) => Ok(PixelFormat::Mono16 { signed: false }),
            (ImageArray::I16(_), false) => Ok(PixelFormat::Mono16 { signed: true }),
            (ImageArray::U8(array), true) if array.shape().last() == Some(&3) => {
                Ok(PixelFormat::Rgb8)
            }
            _ => Err(MedioError::NotSupported(format!(
                "DICOM export of {} images{}, cast to uint8, uint16 or int16 first",
                image.dtype(),
                if channeled { " with channels" } else { "" }
            ))),
        }
    }

    fn put_pixel_module(
        &self,
        object: &mut InMemDicomObject,
        image: &ImageArray,
        k: usize,
    ) -> Result<()> {
        let (samples, photometric, bits, signed) = match self {
            PixelFormat::Mono8 => (1, "MONOCHROME2", 8, false),
            PixelFormat::Mono16 { signed } => (1, "MONOCHROME2", 16, *signed),
            PixelFormat::Rgb8 => (3, "RGB", 8, false),
        };
        put_us(object, tags::SAMPLES_PER_PIXEL, samples);
        put_str(object, tags::PHOTOMETRIC_INTERPRETATION, VR::CS, photometric);
        if samples > 1 {
            put_us(object, tags::PLANAR_CONFIGURATION, 0);
        }
        put_us(object, tags::BITS_ALLOCATED, bits);
        put_us(object, tags::BITS_STORED, bits);
        put_us(object, tags::HIGH_BIT, bits - 1);
        put_us(object, tags::PIXEL_REPRESENTATION, u16::from(signed));

        let value = match image {
            ImageArray::U8(array) => PrimitiveValue::U8(slice_row_major(array, k).into()),
            ImageArray::U16(array) => PrimitiveValue::U16(slice_row_major(array, k).into()),
            ImageArray::I16(array) => PrimitiveValue::U16(
                slice_row_major(array, k)
                    .into_iter()
                    .map(|v| v as u16)
                    .collect::<Vec<u16>>()
                    .into(),
            ),
            other => {
                return Err(MedioError::NotSupported(format!(
                    "DICOM export of {} images",
                    other.dtype()
                )));
            }
        };
        let vr = if bits > 8 { VR::OW } else { VR::OB };
        object.put(DataElement::new(tags::PIXEL_DATA, vr, value));
        Ok(())
    }
}

/// Slice `k` of a (columns, rows, slices[, samples]) volume in DICOM pixel order
fn slice_row_major<T: Copy>(volume: &ArrayD<T>, k: usize) -> Vec<T> {
    let mut plane = volume.index_axis(Axis(2), k);
    plane.swap_axes(0, 1);
    plane.iter().copied().collect()
}

static UID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// UUID-derived style UID under the 2.25 root
fn new_uid() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let counter = UID_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("2.25.{}{:06}", nanos.max(1), counter % 1_000_000)
}

/// Decimal string within the 16 character limit of DS
fn format_ds(value: f64) -> String {
    for precision in (0..=6).rev() {
        let text = format!("{value:.precision$}");
        let text = if text.contains('.') {
            text.trim_end_matches('0').trim_end_matches('.')
        } else {
            text.as_str()
        };
        let text = if text == "-0" { "0" } else { text };
        if text.len() <= 16 {
            return text.to_string();
        }
    }
    format!("{value:.6e}")
}

fn put_str(object: &mut InMemDicomObject, tag: Tag, vr: VR, value: &str) {
    object.put(DataElement::new(tag, vr, PrimitiveValue::from(value)));
}

fn put_ds(object: &mut InMemDicomObject, tag: Tag, values: &[f64]) {
    let strings = values.iter().map(|v| format_ds(*v)).collect();
    object.put(DataElement::new(tag, VR::DS, PrimitiveValue::Strs(strings)));
}

fn put_us(object: &mut InMemDicomObject, tag: Tag, value: u16) {
    object.put(DataElement::new(tag, VR::US, PrimitiveValue::from(value)));
}

fn opposite_code(letter: char) -> char {
    match letter {
        'R' => 'L',
        'L' => 'R',
        'A' => 'P',
        'P' => 'A',
        'S' => 'I',
        'I' => 'S',
        other => other,
    }
}

// --- Helpers ---

fn get_string(object: &DicomFile, tag: Tag) -> Option<String> {
    object
        .element(tag)
        .ok()?
        .to_str()
        .ok()
        .map(|s| s.trim().to_string())
}

fn get_u32(object: &DicomFile, tag: Tag) -> Option<u32> {
    object.element(tag).ok()?.to_int::<u32>().ok()
}

fn get_f64(object: &DicomFile, tag: Tag) -> Option<f64> {
    object.element(tag).ok()?.to_float64().ok()
}

fn get_f64_vec(object: &DicomFile, tag: Tag) -> Option<Vec<f64>> {
    object.element(tag).ok()?.to_multi_float64().ok()
}

fn get_position(object: &DicomFile) -> Option<[f64; 3]> {
    let v = get_f64_vec(object, tags::IMAGE_POSITION_PATIENT)?;
    (v.len() == 3).then(|| [v[0], v[1], v[2]])
}

fn slice_normal(object: &DicomFile) -> Option<[f64; 3]> {
    let v = get_f64_vec(object, tags::IMAGE_ORIENTATION_PATIENT)?;
    if v.len() != 6 {
        return None;
    }
    Some(normalize(cross(&[v[0], v[1], v[2]], &[v[3], v[4], v[5]])))
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalize(v: [f64; 3]) -> [f64; 3] {
    let norm = dot(&v, &v).sqrt();
    if norm > f64::EPSILON {
        [v[0] / norm, v[1] / norm, v[2] / norm]
    } else {
        v
    }
}

fn determinant(m: &Array2<f64>) -> f64 {
    let column = |c: usize| [m[[0, c]], m[[1, c]], m[[2, c]]];
    dot(&column(0), &cross(&column(1), &column(2)))
}
