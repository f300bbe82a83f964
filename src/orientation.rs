//! Axis orientation codes and array reorientation.
//!
//! Codes here are in the Nib convention: each letter names the anatomical
//! direction the corresponding array axis points to, in RAS+ world space.
//! [`inv_axcodes`] converts to and from the Itk convention, where each letter
//! names the direction an axis points from.

use ndarray::{Array2, ArrayD, Axis, IxDyn, s};

use crate::error::{MedioError, Result};
use crate::image::{ArrayOp, ImageArray};

/// Letters for the negative and positive direction of each RAS+ world axis
const LABELS: [(char, char); 3] = [('L', 'R'), ('P', 'A'), ('I', 'S')];

/// Where one array axis ends up: target axis and whether it is flipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisOrnt {
    pub axis: usize,
    pub flip: bool,
}

pub type Ornt = Vec<AxisOrnt>;

fn opposite(letter: char) -> Option<char> {
    match letter.to_ascii_uppercase() {
        'R' => Some('L'),
        'L' => Some('R'),
        'A' => Some('P'),
        'P' => Some('A'),
        'S' => Some('I'),
        'I' => Some('S'),
        _ => None,
    }
}

/// Swap every letter of an orientation code with its opposite (R/L, A/P, S/I).
///
/// Converts codes between the Nib and Itk conventions and is its own inverse.
pub fn inv_axcodes(code: Option<&str>) -> Result<Option<String>> {
    code.map(|code| {
        code.chars()
            .map(|letter| {
                opposite(letter).ok_or_else(|| {
                    MedioError::InvalidArgument(format!(
                        "invalid axis code \"{letter}\" in orientation \"{code}\""
                    ))
                })
            })
            .collect::<Result<String>>()
    })
    .transpose()
}

/// Closest world axis and direction of each of the first `n` voxel axes of a
/// 4x4 affine
pub fn io_orientation(affine: &Array2<f64>, n: usize) -> Result<Ornt> {
    if affine.dim() != (4, 4) {
        return Err(MedioError::InvalidArgument(format!(
            "expected a 4x4 affine, got {:?}",
            affine.dim()
        )));
    }
    if n == 0 || n > 3 {
        return Err(MedioError::InvalidArgument(format!(
            "cannot orient {n} spatial axes"
        )));
    }

    let mut rzs = affine.slice(s![0..3, 0..n]).to_owned();
    for mut column in rzs.columns_mut() {
        let norm = column.dot(&column).sqrt();
        if norm <= f64::EPSILON {
            return Err(MedioError::InvalidArgument(
                "affine has a degenerate voxel axis".to_string(),
            ));
        }
        column /= norm;
    }

    let mut ornt: Vec<Option<AxisOrnt>> = vec![None; n];
    let mut world_used = [false; 3];
    for _ in 0..n {
        let mut best: Option<(usize, usize, f64)> = None;
        for (world, used) in world_used.iter().enumerate() {
            if *used {
                continue;
            }
            for (voxel, assigned) in ornt.iter().enumerate() {
                if assigned.is_some() {
                    continue;
                }
                let value = rzs[[world, voxel]];
                if best.is_none_or(|(_, _, b)| value.abs() > b.abs()) {
                    best = Some((world, voxel, value));
                }
            }
        }
        let (world, voxel, value) = best.ok_or_else(|| {
            MedioError::InvalidArgument("cannot determine affine orientation".to_string())
        })?;
        world_used[world] = true;
        ornt[voxel] = Some(AxisOrnt {
            axis: world,
            flip: value < 0.0,
        });
    }

    Ok(ornt.into_iter().flatten().collect())
}

pub fn ornt2axcodes(ornt: &[AxisOrnt]) -> String {
    ornt.iter()
        .map(|o| {
            let (negative, positive) = LABELS[o.axis];
            if o.flip { negative } else { positive }
        })
        .collect()
}

pub fn axcodes2ornt(code: &str) -> Result<Ornt> {
    let mut ornt = Vec::with_capacity(code.len());
    for letter in code.chars().map(|c| c.to_ascii_uppercase()) {
        let found = LABELS.iter().enumerate().find_map(|(axis, (negative, positive))| {
            if letter == *positive {
                Some(AxisOrnt { axis, flip: false })
            } else if letter == *negative {
                Some(AxisOrnt { axis, flip: true })
            } else {
                None
            }
        });
        let axis_ornt = found.ok_or_else(|| {
            MedioError::InvalidArgument(format!(
                "invalid axis code \"{letter}\" in orientation \"{code}\""
            ))
        })?;
        if ornt.iter().any(|o: &AxisOrnt| o.axis == axis_ornt.axis) {
            return Err(MedioError::InvalidArgument(format!(
                "orientation \"{code}\" uses an axis more than once"
            )));
        }
        ornt.push(axis_ornt);
    }
    Ok(ornt)
}

/// Nib-convention orientation code of the first `n` axes of `affine`
pub fn aff2axcodes(affine: &Array2<f64>, n: usize) -> Result<String> {
    Ok(ornt2axcodes(&io_orientation(affine, n)?))
}

/// Orientation transform taking an array in `start` orientation to `end`
pub fn ornt_transform(start: &[AxisOrnt], end: &[AxisOrnt]) -> Result<Ornt> {
    if start.len() != end.len() {
        return Err(MedioError::InvalidArgument(format!(
            "orientations have different lengths ({} and {})",
            start.len(),
            end.len()
        )));
    }
    let mut result = vec![AxisOrnt { axis: 0, flip: false }; start.len()];
    for (end_in, end_out) in end.iter().enumerate() {
        let (start_in, start_out) = start
            .iter()
            .enumerate()
            .find(|(_, start_out)| start_out.axis == end_out.axis)
            .ok_or_else(|| {
                MedioError::InvalidArgument(format!(
                    "unable to find axis {} in start orientation",
                    end_out.axis
                ))
            })?;
        result[start_in] = AxisOrnt {
            axis: end_in,
            flip: start_out.flip != end_out.flip,
        };
    }
    Ok(result)
}

pub fn is_identity(ornt: &[AxisOrnt]) -> bool {
    ornt.iter()
        .enumerate()
        .all(|(i, o)| o.axis == i && !o.flip)
}

/// Flip and permute the leading axes of `array` according to `ornt`.
/// Trailing axes (time, channels) are left in place.
pub fn apply_orientation<T: Clone>(array: ArrayD<T>, ornt: &[AxisOrnt]) -> Result<ArrayD<T>> {
    let n = ornt.len();
    if array.ndim() < n {
        return Err(MedioError::InvalidArgument(format!(
            "orientation has {n} axes but the array only {}",
            array.ndim()
        )));
    }
    let mut array = array;
    for (axis, o) in ornt.iter().enumerate() {
        if o.flip {
            array.invert_axis(Axis(axis));
        }
    }
    let mut order: Vec<usize> = (0..array.ndim()).collect();
    for (source, o) in ornt.iter().enumerate() {
        order[o.axis] = source;
    }
    Ok(array.permuted_axes(IxDyn(&order)))
}

/// Affine taking voxel indices of the reoriented array back to indices of the
/// array with shape `shape` that `ornt` was applied to
pub fn inv_ornt_aff(ornt: &[AxisOrnt], shape: &[usize]) -> Array2<f64> {
    let mut padded: Ornt = ornt.to_vec();
    for axis in padded.len()..3 {
        padded.push(AxisOrnt { axis, flip: false });
    }

    let mut undo_reorder = Array2::<f64>::zeros((4, 4));
    for (row, o) in padded.iter().enumerate() {
        undo_reorder[[row, o.axis]] = 1.0;
    }
    undo_reorder[[3, 3]] = 1.0;

    let mut undo_flip = Array2::<f64>::eye(4);
    for (axis, o) in padded.iter().enumerate() {
        let size = shape.get(axis).copied().unwrap_or(1) as f64;
        let center = -(size - 1.0) / 2.0;
        let sign = if o.flip { -1.0 } else { 1.0 };
        undo_flip[[axis, axis]] = sign;
        undo_flip[[axis, 3]] = sign * center - center;
    }

    undo_flip.dot(&undo_reorder)
}

struct Reorient<'a>(&'a [AxisOrnt]);

impl ArrayOp for Reorient<'_> {
    fn apply<T: Clone>(&self, array: ArrayD<T>) -> Result<ArrayD<T>> {
        apply_orientation(array, self.0)
    }
}

/// Reorient the first `n` axes of `image` to the Nib-convention code `desired`,
/// returning the new image and its updated affine
pub fn reorient(
    image: ImageArray,
    affine: &Array2<f64>,
    desired: &str,
    n: usize,
) -> Result<(ImageArray, Array2<f64>)> {
    let start = io_orientation(affine, n)?;
    let end = axcodes2ornt(desired)?;
    if end.len() != n {
        return Err(MedioError::InvalidArgument(format!(
            "orientation \"{desired}\" does not match a {n}-d image"
        )));
    }
    let transform = ornt_transform(&start, &end)?;
    if is_identity(&transform) {
        return Ok((image, affine.clone()));
    }
    log::debug!(
        "reorienting {} to {desired}",
        ornt2axcodes(&start)
    );
    let shape = image.shape()[..n].to_vec();
    let reoriented = image.apply(&Reorient(&transform))?;
    Ok((reoriented, affine.dot(&inv_ornt_aff(&transform, &shape))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{ArrayD, IxDyn, array};

    #[test]
    fn inv_axcodes_is_involutive() {
        for code in ["RAS", "LPS", "RAI", "ASR", "IPL", "SR"] {
            let inverted = inv_axcodes(Some(code)).unwrap();
            assert_ne!(inverted.as_deref(), Some(code));
            let restored = inv_axcodes(inverted.as_deref()).unwrap();
            assert_eq!(restored.as_deref(), Some(code));
        }
        assert_eq!(inv_axcodes(None).unwrap(), None);
        assert_eq!(inv_axcodes(Some("RAS")).unwrap().as_deref(), Some("LPI"));
    }

    #[test]
    fn inv_axcodes_rejects_unknown_letters() {
        assert!(matches!(
            inv_axcodes(Some("RXS")),
            Err(MedioError::InvalidArgument(_))
        ));
    }

    #[test]
    fn codes_of_simple_affines() {
        let identity = Array2::<f64>::eye(4);
        assert_eq!(aff2axcodes(&identity, 3).unwrap(), "RAS");

        let lps = array![
            [-2.0, 0.0, 0.0, 10.0],
            [0.0, -2.0, 0.0, 10.0],
            [0.0, 0.0, 3.0, 0.0],
            [0.0, 0.0, 0.0, 1.0]
        ];
        assert_eq!(aff2axcodes(&lps, 3).unwrap(), "LPS");

        let swapped = array![
            [0.0, 0.0, 1.0, 0.0],
            [1.0, 0.0, 0.0, 0.0],
            [0.0, -1.0, 0.0, 0.0],
            [0.0, 0.0, 0.0, 1.0]
        ];
        assert_eq!(aff2axcodes(&swapped, 3).unwrap(), "AIR");
        assert_eq!(aff2axcodes(&swapped, 2).unwrap(), "AI");
    }

    #[test]
    fn axcodes_rejects_repeated_axes() {
        assert!(axcodes2ornt("RLS").is_err());
        assert_eq!(ornt2axcodes(&axcodes2ornt("pir").unwrap()), "PIR");
    }

    #[test]
    fn reorient_flips_data_and_affine() {
        let data = ArrayD::from_shape_vec(IxDyn(&[2, 3, 4]), (0..24).collect::<Vec<i32>>())
            .unwrap();
        let image = ImageArray::from(data.clone());
        let affine = Array2::<f64>::eye(4);

        let (flipped, new_affine) = reorient(image, &affine, "LAS", 3).unwrap();
        let flipped = flipped.as_array::<i32>().unwrap();
        assert_eq!(flipped.shape(), &[2, 3, 4]);
        assert_eq!(flipped[[0, 1, 2]], data[[1, 1, 2]]);
        assert_eq!(aff2axcodes(&new_affine, 3).unwrap(), "LAS");
        // voxel 0 of the flipped array is voxel 1 of the original, at x = 1
        assert_eq!(new_affine[[0, 3]], 1.0);
    }

    #[test]
    fn reorient_permutes_axes_and_maps_same_world_points() {
        let data = ArrayD::from_shape_vec(IxDyn(&[2, 3, 4]), (0..24).collect::<Vec<i32>>())
            .unwrap();
        let affine = array![
            [2.0, 0.0, 0.0, -5.0],
            [0.0, 3.0, 0.0, 1.0],
            [0.0, 0.0, 4.0, 7.0],
            [0.0, 0.0, 0.0, 1.0]
        ];
        let (moved, new_affine) =
            reorient(ImageArray::from(data.clone()), &affine, "SPR", 3).unwrap();
        let moved = moved.as_array::<i32>().unwrap();
        assert_eq!(moved.shape(), &[4, 3, 2]);

        for (k, j, i) in [(0, 0, 0), (3, 2, 1), (1, 2, 0)] {
            let new_index = [k, 2 - j, i];
            assert_eq!(moved[IxDyn(&new_index)], data[[i, j, k]]);

            let world_old = affine.dot(&array![i as f64, j as f64, k as f64, 1.0]);
            let world_new = new_affine.dot(&array![
                new_index[0] as f64,
                new_index[1] as f64,
                new_index[2] as f64,
                1.0
            ]);
            assert_eq!(world_old, world_new);
        }
    }

    #[test]
    fn transform_to_same_orientation_is_identity() {
        let ornt = axcodes2ornt("PSL").unwrap();
        assert!(is_identity(&ornt_transform(&ornt, &ornt).unwrap()));
    }
}
