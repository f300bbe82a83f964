use std::fs;
use std::io;
use std::path::Path;

use crate::error::{MedioError, Result};

const RASTER_EXTENSIONS: [&str; 8] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "gif", "webp"];

fn lower_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_ascii_lowercase())
        .unwrap_or_default()
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(MedioError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("no such file: \"{}\"", path.display()),
        )))
    }
}

/// Whether `path` names a NIfTI file (`.nii` or `.nii.gz`).
///
/// With `check_exist` a missing path is an error; destinations of a write
/// are checked with `check_exist = false`.
pub fn is_nifti(path: impl AsRef<Path>, check_exist: bool) -> Result<bool> {
    let path = path.as_ref();
    if check_exist {
        ensure_exists(path)?;
    }
    let name = lower_name(path);
    Ok(name.ends_with(".nii") || name.ends_with(".nii.gz"))
}

/// Whether `path` is a directory (assumed to hold a DICOM series) or a `.dcm` file
pub fn is_dicom(path: impl AsRef<Path>) -> bool {
    let path = path.as_ref();
    path.is_dir() || lower_name(path).ends_with(".dcm")
}

pub fn is_raster(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            RASTER_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// Create `dir`, succeeding if it already exists
pub fn make_dir(dir: impl AsRef<Path>, parents: bool) -> Result<()> {
    let dir = dir.as_ref();
    if dir.as_os_str().is_empty() || dir.is_dir() {
        return Ok(());
    }
    if parents {
        fs::create_dir_all(dir)?;
    } else {
        match fs::create_dir(dir) {
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
            other => other?,
        }
    }
    Ok(())
}

/// Create `dir` for writing a DICOM series. An existing directory must be empty.
pub fn make_empty_dir(dir: impl AsRef<Path>, parents: bool) -> Result<()> {
    let dir = dir.as_ref();
    if dir.is_dir() {
        if fs::read_dir(dir)?.next().is_some() {
            return Err(MedioError::InvalidArgument(format!(
                "output directory \"{}\" is not empty",
                dir.display()
            )));
        }
        return Ok(());
    }
    make_dir(dir, parents)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn nifti_suffixes() {
        for name in ["a.nii", "dir/b.nii.gz", "C.NII.GZ", "x.y.nii"] {
            assert!(is_nifti(name, false).unwrap(), "{name}");
        }
        for name in ["a.nrrd", "b.gz", "c.nii.zip", "nii", "d.mha", "scan"] {
            assert!(!is_nifti(name, false).unwrap(), "{name}");
        }
    }

    #[test]
    fn missing_file_is_an_error_when_checked() {
        let path = PathBuf::from("/definitely/not/here.nii.gz");
        let err = is_nifti(&path, true).unwrap_err();
        assert!(matches!(err, MedioError::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
        assert!(is_nifti(&path, false).unwrap());
    }

    #[test]
    fn make_dir_accepts_existing_directories() {
        let temp = tempfile::tempdir().unwrap();
        let nested = temp.path().join("a").join("b");

        assert!(make_dir(&nested, false).is_err());
        make_dir(&nested, true).unwrap();
        make_dir(&nested, true).unwrap();
        make_dir(&nested, false).unwrap();
        assert!(nested.is_dir());
    }

    #[test]
    fn make_empty_dir_rejects_populated_directories() {
        let temp = tempfile::tempdir().unwrap();
        make_empty_dir(temp.path(), false).unwrap();
        fs::write(temp.path().join("IM0.dcm"), b"").unwrap();
        assert!(matches!(
            make_empty_dir(temp.path(), false),
            Err(MedioError::InvalidArgument(_))
        ));
    }

    #[test]
    fn recognises_raster_and_dicom_paths() {
        assert!(is_raster("slice.PNG"));
        assert!(is_raster("photo.jpeg"));
        assert!(!is_raster("volume.nii.gz"));
        assert!(is_dicom("IM0001.dcm"));
        assert!(!is_dicom("IM0001.png"));
    }
}
