//! Dtype-tagged n-dimensional image buffers

use ndarray::{ArrayD, IxDyn};
use num_traits::AsPrimitive;

use crate::enums::DType;
use crate::error::{MedioError, Result};

/// Image pixel data as read from or written to disk.
///
/// Spatial axes come first in voxel index order (x, y, z). A channel axis, if
/// any, lives wherever the caller asked for it.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageArray {
    U8(ArrayD<u8>),
    I8(ArrayD<i8>),
    U16(ArrayD<u16>),
    I16(ArrayD<i16>),
    U32(ArrayD<u32>),
    I32(ArrayD<i32>),
    I64(ArrayD<i64>),
    F32(ArrayD<f32>),
    F64(ArrayD<f64>),
}

macro_rules! with_array {
    ($image:expr, $array:ident => $body:expr) => {
        match $image {
            ImageArray::U8($array) => $body,
            ImageArray::I8($array) => $body,
            ImageArray::U16($array) => $body,
            ImageArray::I16($array) => $body,
            ImageArray::U32($array) => $body,
            ImageArray::I32($array) => $body,
            ImageArray::I64($array) => $body,
            ImageArray::F32($array) => $body,
            ImageArray::F64($array) => $body,
        }
    };
}

macro_rules! map_array {
    ($image:expr, $array:ident => $body:expr) => {
        match $image {
            ImageArray::U8($array) => ImageArray::U8($body),
            ImageArray::I8($array) => ImageArray::I8($body),
            ImageArray::U16($array) => ImageArray::U16($body),
            ImageArray::I16($array) => ImageArray::I16($body),
            ImageArray::U32($array) => ImageArray::U32($body),
            ImageArray::I32($array) => ImageArray::I32($body),
            ImageArray::I64($array) => ImageArray::I64($body),
            ImageArray::F32($array) => ImageArray::F32($body),
            ImageArray::F64($array) => ImageArray::F64($body),
        }
    };
}

pub(crate) use with_array;

/// An element type that can be stored in an [`ImageArray`]
pub trait Element: Copy + Send + Sync + 'static {
    const DTYPE: DType;

    fn wrap(array: ArrayD<Self>) -> ImageArray;

    fn view(image: &ImageArray) -> Option<&ArrayD<Self>>;

    fn unwrap(image: ImageArray) -> std::result::Result<ArrayD<Self>, ImageArray>;
}

macro_rules! impl_element {
    ($t:ty, $variant:ident) => {
        impl Element for $t {
            const DTYPE: DType = DType::$variant;

            fn wrap(array: ArrayD<Self>) -> ImageArray {
                ImageArray::$variant(array)
            }

            fn view(image: &ImageArray) -> Option<&ArrayD<Self>> {
                match image {
                    ImageArray::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn unwrap(image: ImageArray) -> std::result::Result<ArrayD<Self>, ImageArray> {
                match image {
                    ImageArray::$variant(array) => Ok(array),
                    other => Err(other),
                }
            }
        }

        impl From<ArrayD<$t>> for ImageArray {
            fn from(array: ArrayD<$t>) -> Self {
                ImageArray::$variant(array)
            }
        }
    };
}

impl_element!(u8, U8);
impl_element!(i8, I8);
impl_element!(u16, U16);
impl_element!(i16, I16);
impl_element!(u32, U32);
impl_element!(i32, I32);
impl_element!(i64, I64);
impl_element!(f32, F32);
impl_element!(f64, F64);

/// An array transformation that is independent of the element type
pub trait ArrayOp {
    fn apply<T: Clone>(&self, array: ArrayD<T>) -> Result<ArrayD<T>>;
}

impl ImageArray {
    pub fn dtype(&self) -> DType {
        match self {
            ImageArray::U8(_) => DType::U8,
            ImageArray::I8(_) => DType::I8,
            ImageArray::U16(_) => DType::U16,
            ImageArray::I16(_) => DType::I16,
            ImageArray::U32(_) => DType::U32,
            ImageArray::I32(_) => DType::I32,
            ImageArray::I64(_) => DType::I64,
            ImageArray::F32(_) => DType::F32,
            ImageArray::F64(_) => DType::F64,
        }
    }

    pub fn shape(&self) -> &[usize] {
        with_array!(self, a => a.shape())
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    pub fn as_array<T: Element>(&self) -> Option<&ArrayD<T>> {
        T::view(self)
    }

    pub fn into_array<T: Element>(self) -> std::result::Result<ArrayD<T>, ImageArray> {
        T::unwrap(self)
    }

    /// Cast to `dtype`. An image that already has that dtype is returned as is,
    /// without touching its buffer.
    pub fn astype(self, dtype: DType) -> ImageArray {
        if self.dtype() == dtype {
            return self;
        }
        with_array!(self, a => cast_to(&a, dtype))
    }

    pub fn apply<O: ArrayOp>(self, op: &O) -> Result<ImageArray> {
        Ok(map_array!(self, a => op.apply(a)?))
    }

    /// Move axis `from` to position `to`; negative positions count from the end.
    pub fn move_axis(self, from: isize, to: isize) -> Result<ImageArray> {
        let ndim = self.ndim();
        let op = MoveAxis {
            from: resolve_axis(from, ndim)?,
            to: resolve_axis(to, ndim)?,
        };
        self.apply(&op)
    }

    pub fn insert_axis(self, axis: usize) -> Result<ImageArray> {
        if axis > self.ndim() {
            return Err(MedioError::InvalidArgument(format!(
                "cannot insert axis {axis} into a {}-d array",
                self.ndim()
            )));
        }
        Ok(map_array!(self, a => a.insert_axis(ndarray::Axis(axis))))
    }

    /// Drop a length-1 axis
    pub fn remove_axis(self, axis: usize) -> Result<ImageArray> {
        if self.shape().get(axis) != Some(&1) {
            return Err(MedioError::InvalidArgument(format!(
                "cannot remove axis {axis} of shape {:?}",
                self.shape()
            )));
        }
        Ok(map_array!(self, a => a.index_axis_move(ndarray::Axis(axis), 0)))
    }

    /// Reshape into `shape`, preserving logical (row-major) element order
    pub fn into_shape(self, shape: &[usize]) -> Result<ImageArray> {
        Ok(map_array!(self, a => {
            let standard = a.as_standard_layout().into_owned();
            standard.into_shape_with_order(IxDyn(shape))?
        }))
    }

    /// Copy into C-contiguous layout if the buffer is not already standard
    pub fn into_standard_layout(self) -> ImageArray {
        map_array!(self, a => {
            if a.is_standard_layout() {
                a
            } else {
                a.as_standard_layout().into_owned()
            }
        })
    }
}

/// Resolve a possibly negative axis index against `ndim`
pub fn resolve_axis(axis: isize, ndim: usize) -> Result<usize> {
    let resolved = if axis < 0 { ndim as isize + axis } else { axis };
    if resolved < 0 || resolved >= ndim as isize {
        return Err(MedioError::InvalidArgument(format!(
            "axis {axis} is out of bounds for a {ndim}-d array"
        )));
    }
    Ok(resolved as usize)
}

struct MoveAxis {
    from: usize,
    to: usize,
}

impl ArrayOp for MoveAxis {
    fn apply<T: Clone>(&self, array: ArrayD<T>) -> Result<ArrayD<T>> {
        if self.from == self.to {
            return Ok(array);
        }
        let mut order: Vec<usize> = (0..array.ndim()).filter(|&ax| ax != self.from).collect();
        order.insert(self.to, self.from);
        Ok(array.permuted_axes(IxDyn(&order)))
    }
}

fn cast_to<S>(array: &ArrayD<S>, dtype: DType) -> ImageArray
where
    S: AsPrimitive<u8>
        + AsPrimitive<i8>
        + AsPrimitive<u16>
        + AsPrimitive<i16>
        + AsPrimitive<u32>
        + AsPrimitive<i32>
        + AsPrimitive<i64>
        + AsPrimitive<f32>
        + AsPrimitive<f64>,
{
    match dtype {
        DType::U8 => ImageArray::U8(array.mapv(<S as AsPrimitive<u8>>::as_)),
        DType::I8 => ImageArray::I8(array.mapv(<S as AsPrimitive<i8>>::as_)),
        DType::U16 => ImageArray::U16(array.mapv(<S as AsPrimitive<u16>>::as_)),
        DType::I16 => ImageArray::I16(array.mapv(<S as AsPrimitive<i16>>::as_)),
        DType::U32 => ImageArray::U32(array.mapv(<S as AsPrimitive<u32>>::as_)),
        DType::I32 => ImageArray::I32(array.mapv(<S as AsPrimitive<i32>>::as_)),
        DType::I64 => ImageArray::I64(array.mapv(<S as AsPrimitive<i64>>::as_)),
        DType::F32 => ImageArray::F32(array.mapv(<S as AsPrimitive<f32>>::as_)),
        DType::F64 => ImageArray::F64(array.mapv(<S as AsPrimitive<f64>>::as_)),
    }
}
