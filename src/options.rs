//! Call options for the read/save entry points and the backends

use crate::enums::{Backend, DType, SortBy};

/// Knobs consumed by individual backends
#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// SeriesInstanceUID to read when a DICOM directory holds several series
    pub series: Option<String>,
    /// Slice ordering for DICOM series
    pub sort_by: SortBy,
    /// Fall back to a spacing-only affine when DICOM geometry tags are missing
    pub allow_default_affine: bool,
    /// File name pattern for exported DICOM slices, `{}` is the slice index
    pub pattern: String,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            series: None,
            sort_by: SortBy::default(),
            allow_default_affine: false,
            pattern: "IM{}.dcm".to_string(),
        }
    }
}

impl BackendOptions {
    pub fn slice_file_name(&self, index: usize) -> String {
        self.pattern.replacen("{}", &index.to_string(), 1)
    }
}

/// Options for [`read_img`](crate::read_img)
#[derive(Debug, Clone)]
pub struct ReadOptions {
    /// Reorient to this code (Itk convention), e.g. `"RAI"`
    pub desired_ornt: Option<String>,
    pub backend: Option<Backend>,
    pub dtype: Option<DType>,
    /// Attach the backend's raw header dictionary to the metadata
    pub header: bool,
    /// Where to put the channel axis of channeled images
    pub channels_axis: Option<isize>,
    pub backend_options: BackendOptions,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            desired_ornt: None,
            backend: None,
            dtype: None,
            header: false,
            channels_axis: Some(-1),
            backend_options: BackendOptions::default(),
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn desired_ornt(mut self, code: impl Into<String>) -> Self {
        self.desired_ornt = Some(code.into());
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn header(mut self, header: bool) -> Self {
        self.header = header;
        self
    }

    pub fn channels_axis(mut self, axis: Option<isize>) -> Self {
        self.channels_axis = axis;
        self
    }

    pub fn backend_options(mut self, options: BackendOptions) -> Self {
        self.backend_options = options;
        self
    }
}

/// Options for [`save_img`](crate::save_img)
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Save in the orientation recorded in `MetaData::orig_ornt`
    pub use_original_ornt: bool,
    pub backend: Option<Backend>,
    pub dtype: Option<DType>,
    /// Channel axis of the image, `None` for unchanneled images
    pub channels_axis: Option<isize>,
    /// Create the parent directory of the destination
    pub mkdir: bool,
    /// With `mkdir`, also create missing ancestors
    pub parents: bool,
    pub backend_options: BackendOptions,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            use_original_ornt: true,
            backend: None,
            dtype: None,
            channels_axis: None,
            mkdir: false,
            parents: false,
            backend_options: BackendOptions::default(),
        }
    }
}

impl SaveOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_original_ornt(mut self, value: bool) -> Self {
        self.use_original_ornt = value;
        self
    }

    pub fn backend(mut self, backend: Backend) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn channels_axis(mut self, axis: Option<isize>) -> Self {
        self.channels_axis = axis;
        self
    }

    pub fn mkdir(mut self, mkdir: bool, parents: bool) -> Self {
        self.mkdir = mkdir;
        self.parents = parents;
        self
    }

    pub fn backend_options(mut self, options: BackendOptions) -> Self {
        self.backend_options = options;
        self
    }
}

/// Options for [`save_dir`](crate::save_dir)
#[derive(Debug, Clone)]
pub struct SaveDirOptions {
    pub use_original_ornt: bool,
    pub dtype: Option<DType>,
    pub channels_axis: Option<isize>,
    /// Create missing ancestors of the output directory
    pub parents: bool,
    /// Flip the slice axis of left-handed images instead of refusing to save them
    pub allow_dcm_reorient: bool,
    pub backend_options: BackendOptions,
}

impl Default for SaveDirOptions {
    fn default() -> Self {
        Self {
            use_original_ornt: true,
            dtype: None,
            channels_axis: None,
            parents: false,
            allow_dcm_reorient: false,
            backend_options: BackendOptions::default(),
        }
    }
}

impl SaveDirOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn use_original_ornt(mut self, value: bool) -> Self {
        self.use_original_ornt = value;
        self
    }

    pub fn dtype(mut self, dtype: DType) -> Self {
        self.dtype = Some(dtype);
        self
    }

    pub fn channels_axis(mut self, axis: Option<isize>) -> Self {
        self.channels_axis = axis;
        self
    }

    pub fn parents(mut self, parents: bool) -> Self {
        self.parents = parents;
        self
    }

    pub fn allow_dcm_reorient(mut self, allow: bool) -> Self {
        self.allow_dcm_reorient = allow;
        self
    }

    pub fn backend_options(mut self, options: BackendOptions) -> Self {
        self.backend_options = options;
        self
    }
}
