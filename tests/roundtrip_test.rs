use std::fs;

use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::object::open_file;
use dicom_dictionary_std::tags;
use medio::{
    Backend, BackendOptions, CoordSys, DType, ImageArray, MedioError, MetaData, ReadOptions,
    SaveDirOptions, SaveOptions, read_img, save_dir, save_img,
};
use ndarray::{Array2, ArrayD, IxDyn, array};

fn ramp<T: Copy>(shape: &[usize], convert: impl Fn(usize) -> T) -> ArrayD<T> {
    let len = shape.iter().product::<usize>();
    ArrayD::from_shape_vec(IxDyn(shape), (0..len).map(convert).collect()).unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-4,
        "expected {expected}, got {actual}"
    );
}

fn nib_affine() -> Array2<f64> {
    array![
        [2.0, 0.0, 0.0, -12.0],
        [0.0, 3.0, 0.0, 8.0],
        [0.0, 0.0, 4.0, 1.5],
        [0.0, 0.0, 0.0, 1.0]
    ]
}

#[test]
fn nifti_round_trip_through_the_facade() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("nested").join("volume.nii.gz");
    let data = ramp(&[4, 5, 6], |v| v as u16);
    let metadata = MetaData::new(nib_affine(), None, CoordSys::Nib);

    save_img(
        &path,
        ImageArray::U16(data.clone()),
        &metadata,
        &SaveOptions::new().mkdir(true, false),
    )
    .unwrap();
    assert!(path.is_file());

    let (image, read_meta) = read_img(&path, &ReadOptions::new()).unwrap();
    assert_eq!(image, ImageArray::U16(data));
    assert_eq!(read_meta.coord_sys, CoordSys::Nib);
    assert_eq!(read_meta.affine, nib_affine());
    assert_eq!(read_meta.orig_ornt.as_deref(), Some("RAS"));
}

#[test]
fn reoriented_reads_are_restored_on_save() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("volume.nii");
    let data = ramp(&[3, 4, 5], |v| v as f32);
    save_img(
        &path,
        ImageArray::F32(data.clone()),
        &MetaData::new(nib_affine(), None, CoordSys::Nib),
        &SaveOptions::new(),
    )
    .unwrap();

    // "RAI" in ITK terms is LPS+ aligned, so x and y are flipped
    let (image, metadata) = read_img(&path, &ReadOptions::new().desired_ornt("RAI")).unwrap();
    assert_eq!(metadata.orig_ornt.as_deref(), Some("RAS"));
    assert_eq!(metadata.ornt(3).unwrap(), "LPS");
    let flipped = image.as_array::<f32>().unwrap();
    assert_eq!(flipped[[0, 0, 2]], data[[2, 3, 2]]);
    assert_eq!(flipped[[2, 1, 4]], data[[0, 2, 4]]);
    // the voxel at the origin of the file keeps its world position
    assert_close(metadata.affine[[0, 3]], -12.0 + 2.0 * 2.0);
    assert_close(metadata.affine[[1, 3]], 8.0 + 3.0 * 3.0);

    let restored = temp.path().join("restored.nii");
    save_img(&restored, image, &metadata, &SaveOptions::new()).unwrap();
    let (image, metadata) = read_img(&restored, &ReadOptions::new()).unwrap();
    assert_eq!(image, ImageArray::F32(data));
    assert_eq!(metadata.affine, nib_affine());
}

#[test]
fn itk_reads_nifti_with_lps_metadata() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("volume.nii.gz");
    save_img(
        &path,
        ImageArray::I16(ramp(&[2, 3, 4], |v| v as i16 - 10)),
        &MetaData::new(nib_affine(), None, CoordSys::Nib),
        &SaveOptions::new(),
    )
    .unwrap();

    let (image, metadata) = read_img(
        &path,
        &ReadOptions::new().backend(Backend::Itk).dtype(DType::F64),
    )
    .unwrap();
    assert_eq!(image.dtype(), DType::F64);
    assert_eq!(image.as_array::<f64>().unwrap()[[0, 0, 0]], -10.0);
    assert_eq!(metadata.coord_sys, CoordSys::Itk);
    assert_eq!(metadata.orig_ornt.as_deref(), Some("LPI"));
    assert_eq!(metadata.affine[[0, 0]], -2.0);
    assert_eq!(metadata.affine[[1, 3]], -8.0);
    assert_eq!(metadata.spacing(), [2.0, 3.0, 4.0]);
}

#[test]
fn png_round_trip_with_cast() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("plane.png");
    let data = ramp(&[6, 4], |v| v as f32 * 10.0);

    save_img(
        &path,
        ImageArray::F32(data),
        &MetaData::identity(CoordSys::Itk),
        &SaveOptions::new().dtype(DType::U8),
    )
    .unwrap();

    let (image, metadata) = read_img(&path, &ReadOptions::new()).unwrap();
    assert_eq!(image, ImageArray::U8(ramp(&[6, 4], |v| (v * 10) as u8)));
    assert_eq!(metadata.coord_sys, CoordSys::Itk);
}

fn itk_metadata(z_step: f64) -> MetaData {
    let affine = array![
        [0.5, 0.0, 0.0, -10.0],
        [0.0, 0.7, 0.0, 5.0],
        [0.0, 0.0, z_step, 3.0],
        [0.0, 0.0, 0.0, 1.0]
    ];
    MetaData::new(affine, None, CoordSys::Itk)
}

#[test]
fn dicom_series_round_trip() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("series");
    let data = ramp(&[4, 3, 5], |v| (v * 17) as u16);

    save_dir(
        &dir,
        ImageArray::U16(data.clone()),
        &itk_metadata(2.0),
        &SaveDirOptions::new(),
    )
    .unwrap();
    assert_eq!(fs::read_dir(&dir).unwrap().count(), 5);
    assert!(dir.join("IM0.dcm").is_file());

    let (image, metadata) = read_img(
        &dir,
        &ReadOptions::new().backend(Backend::Pdcm).header(true),
    )
    .unwrap();
    assert_eq!(image, ImageArray::U16(data.clone()));
    assert_eq!(metadata.coord_sys, CoordSys::Itk);
    for (actual, expected) in metadata.spacing().into_iter().zip([0.5, 0.7, 2.0]) {
        assert_close(actual, expected);
    }
    for (actual, expected) in metadata.origin().into_iter().zip([-10.0, 5.0, 3.0]) {
        assert_close(actual, expected);
    }
    assert_eq!(metadata.orig_ornt.as_deref(), Some("RAI"));
    let header = metadata.header.unwrap();
    assert_eq!(header["Modality"], "OT");

    // the generic backend reads DICOM directories too
    let (image, _) = read_img(&dir, &ReadOptions::new()).unwrap();
    assert_eq!(image, ImageArray::U16(data));
}

#[test]
fn dicom_export_needs_an_empty_directory() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("keep.txt"), b"x").unwrap();
    let err = save_dir(
        temp.path(),
        ImageArray::U8(ramp(&[2, 2, 2], |v| v as u8)),
        &itk_metadata(1.0),
        &SaveDirOptions::new(),
    )
    .unwrap_err();
    assert!(matches!(err, MedioError::InvalidArgument(_)));
}

#[test]
fn left_handed_dicom_export_needs_permission() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("flipped");
    let data = ramp(&[3, 2, 4], |v| v as i16 - 5);

    let err = save_dir(
        &dir,
        ImageArray::I16(data.clone()),
        &itk_metadata(-1.5),
        &SaveDirOptions::new(),
    )
    .unwrap_err();
    assert!(matches!(err, MedioError::NotSupported(_)));
    assert!(!dir.exists());

    save_dir(
        &dir,
        ImageArray::I16(data.clone()),
        &itk_metadata(-1.5),
        &SaveDirOptions::new().allow_dcm_reorient(true),
    )
    .unwrap();
    let (image, metadata) = read_img(&dir, &ReadOptions::new().backend(Backend::Pdcm)).unwrap();
    let read = image.as_array::<i16>().unwrap();
    assert_eq!(read.shape(), &[3, 2, 4]);
    assert_eq!(read[[1, 1, 0]], data[[1, 1, 3]]);
    assert_eq!(read[[2, 0, 3]], data[[2, 0, 0]]);
    assert_close(metadata.affine[[2, 2]], 1.5);
    assert_close(metadata.origin()[2], 3.0 - 3.0 * 1.5);
}

#[test]
fn float_dicom_export_asks_for_a_cast() {
    let temp = tempfile::tempdir().unwrap();
    let image = ImageArray::F32(ramp(&[2, 2, 2], |v| v as f32));

    let err = save_dir(
        temp.path().join("floats"),
        image.clone(),
        &itk_metadata(1.0),
        &SaveDirOptions::new(),
    )
    .unwrap_err();
    assert!(matches!(err, MedioError::NotSupported(_)));

    save_dir(
        temp.path().join("cast"),
        image,
        &itk_metadata(1.0),
        &SaveDirOptions::new().dtype(DType::I16),
    )
    .unwrap();
}

#[test]
fn series_option_selects_among_several_series() {
    let temp = tempfile::tempdir().unwrap();
    let first = temp.path().join("first");
    let second = temp.path().join("second");
    let merged = temp.path().join("merged");
    for dir in [&first, &second] {
        save_dir(
            dir,
            ImageArray::U8(ramp(&[2, 2, 2], |v| v as u8)),
            &itk_metadata(1.0),
            &SaveDirOptions::new(),
        )
        .unwrap();
    }
    fs::create_dir(&merged).unwrap();
    fs::copy(first.join("IM0.dcm"), merged.join("a0.dcm")).unwrap();
    fs::copy(first.join("IM1.dcm"), merged.join("a1.dcm")).unwrap();
    fs::copy(second.join("IM0.dcm"), merged.join("b0.dcm")).unwrap();

    let err = read_img(&merged, &ReadOptions::new().backend(Backend::Pdcm)).unwrap_err();
    assert!(matches!(err, MedioError::InvalidArgument(_)));

    let series = medio::PdcmIo::scan_directory(&merged).unwrap();
    assert_eq!(series.len(), 2);
    let two_slices = series
        .iter()
        .find(|s| s.file_paths.len() == 2)
        .unwrap()
        .series_instance_uid
        .clone();
    let options = BackendOptions {
        series: Some(two_slices),
        ..BackendOptions::default()
    };
    let (image, _) = read_img(
        &merged,
        &ReadOptions::new()
            .backend(Backend::Pdcm)
            .backend_options(options),
    )
    .unwrap();
    assert_eq!(image.shape(), &[2, 2, 2]);
}

#[test]
fn rescale_of_any_slice_makes_the_series_rescaled() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("pet");
    save_dir(
        &dir,
        ImageArray::U16(ArrayD::from_elem(vec![2, 2, 2], 10)),
        &itk_metadata(1.0),
        &SaveDirOptions::new(),
    )
    .unwrap();

    let second = dir.join("IM1.dcm");
    let mut object = open_file(&second).unwrap();
    object.put(DataElement::new(
        tags::RESCALE_SLOPE,
        VR::DS,
        PrimitiveValue::from("3"),
    ));
    object.put(DataElement::new(
        tags::RESCALE_INTERCEPT,
        VR::DS,
        PrimitiveValue::from("0"),
    ));
    object.write_to_file(&second).unwrap();

    let (image, _) = read_img(&dir, &ReadOptions::new().backend(Backend::Pdcm)).unwrap();
    assert_eq!(image.dtype(), DType::F32);
    let voxels = image.as_array::<f32>().unwrap();
    assert_eq!(voxels[[1, 1, 0]], 10.0);
    assert_eq!(voxels[[1, 1, 1]], 30.0);
}

#[test]
fn slices_with_different_pixel_formats_are_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("mixed");
    save_dir(
        &dir,
        ImageArray::U16(ArrayD::from_elem(vec![2, 2, 2], 10)),
        &itk_metadata(1.0),
        &SaveDirOptions::new(),
    )
    .unwrap();

    let second = dir.join("IM1.dcm");
    let mut object = open_file(&second).unwrap();
    object.put(DataElement::new(
        tags::PIXEL_REPRESENTATION,
        VR::US,
        PrimitiveValue::from(1_u16),
    ));
    object.write_to_file(&second).unwrap();

    let err = read_img(&dir, &ReadOptions::new().backend(Backend::Pdcm)).unwrap_err();
    assert!(matches!(err, MedioError::InconsistentPixelFormat));
}
