//! Gaze direction from binarized eye-region pixels.
//!
//! The region is thresholded, split into left and right column halves, and
//! the right/left foreground ratio is bucketed. Directions are
//! screen-relative as presented to the operator, not anatomical.

use crate::capture::types::IntensityGrid;
use crate::config::GazeConfig;
use serde::{Deserialize, Serialize};

/// Discrete gaze direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GazeDirection {
    Left,
    Right,
    Center,
}

impl GazeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
            Self::Center => "CENTER",
        }
    }
}

/// Foreground pixel counts per column half.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HalfCounts {
    pub left: usize,
    pub right: usize,
}

/// Count foreground pixels (`value > threshold`) in each column half.
///
/// The left half is `[0, width / 2)`, the right half `[width / 2, width)`.
/// Returns `None` for malformed grids.
pub fn foreground_counts(region: &IntensityGrid, threshold: u8) -> Option<HalfCounts> {
    if !region.is_well_formed() {
        return None;
    }

    let split = region.width() / 2;
    let mut counts = HalfCounts { left: 0, right: 0 };
    for row in region.rows() {
        let (left, right) = row.split_at(split);
        counts.left += left.iter().filter(|&&v| v > threshold).count();
        counts.right += right.iter().filter(|&&v| v > threshold).count();
    }
    Some(counts)
}

/// Right/left ratio, defined as 1.0 when the left half is empty.
pub fn gaze_ratio(counts: HalfCounts) -> f64 {
    if counts.left == 0 {
        1.0
    } else {
        counts.right as f64 / counts.left as f64
    }
}

/// Bucket a ratio: `< low → Right`, `> high → Left`, otherwise `Center`.
pub fn direction_from_ratio(ratio: f64, config: &GazeConfig) -> GazeDirection {
    if ratio < config.low_ratio {
        GazeDirection::Right
    } else if ratio > config.high_ratio {
        GazeDirection::Left
    } else {
        GazeDirection::Center
    }
}

/// Classify one eye region. Never fails: unusable input reads as `Center`.
pub fn classify_gaze(region: &IntensityGrid, config: &GazeConfig) -> GazeDirection {
    match foreground_counts(region, config.binarization_threshold) {
        Some(counts) => direction_from_ratio(gaze_ratio(counts), config),
        None => GazeDirection::Center,
    }
}

/// Combine both eyes. Disagreement reads as `Center`.
pub fn combine_gaze(left: GazeDirection, right: GazeDirection) -> GazeDirection {
    if left == right {
        left
    } else {
        GazeDirection::Center
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Grid whose left half has `left_fg` bright pixels and right half `right_fg`.
    fn grid_with_counts(left_fg: usize, right_fg: usize) -> IntensityGrid {
        let half = 10;
        IntensityGrid::from_fn(half * 2, 1, |x, _| {
            let bright = if x < half { x < left_fg } else { x - half < right_fg };
            if bright {
                200
            } else {
                10
            }
        })
    }

    #[test]
    fn test_counts_split_by_column() {
        let counts = foreground_counts(&grid_with_counts(4, 7), 70).unwrap();
        assert_eq!(counts, HalfCounts { left: 4, right: 7 });
    }

    #[test]
    fn test_threshold_is_strict() {
        let grid = IntensityGrid::new(2, 1, vec![70, 71]);
        let counts = foreground_counts(&grid, 70).unwrap();
        assert_eq!(counts, HalfCounts { left: 0, right: 1 });
    }

    #[test]
    fn test_odd_width_puts_middle_column_right() {
        let grid = IntensityGrid::new(3, 1, vec![255, 255, 255]);
        let counts = foreground_counts(&grid, 70).unwrap();
        assert_eq!(counts, HalfCounts { left: 1, right: 2 });
    }

    #[test]
    fn test_empty_left_half_is_center() {
        let config = GazeConfig::default();
        let counts = HalfCounts { left: 0, right: 5 };
        assert_eq!(gaze_ratio(counts), 1.0);
        assert_eq!(
            classify_gaze(&grid_with_counts(0, 5), &config),
            GazeDirection::Center
        );
    }

    #[test]
    fn test_ratio_buckets() {
        let config = GazeConfig::default();
        // 5 / 10 = 0.5 < 0.8
        assert_eq!(
            classify_gaze(&grid_with_counts(10, 5), &config),
            GazeDirection::Right
        );
        // 8 / 5 = 1.6 > 1.2
        assert_eq!(
            classify_gaze(&grid_with_counts(5, 8), &config),
            GazeDirection::Left
        );
        // 5 / 5 = 1.0
        assert_eq!(
            classify_gaze(&grid_with_counts(5, 5), &config),
            GazeDirection::Center
        );
    }

    #[test]
    fn test_boundaries_are_center() {
        let config = GazeConfig::default();
        assert_eq!(direction_from_ratio(0.8, &config), GazeDirection::Center);
        assert_eq!(direction_from_ratio(1.2, &config), GazeDirection::Center);
    }

    #[test]
    fn test_malformed_and_empty_regions_are_center() {
        let config = GazeConfig::default();
        let malformed = IntensityGrid::new(4, 4, vec![255; 5]);
        assert_eq!(classify_gaze(&malformed, &config), GazeDirection::Center);

        let empty = IntensityGrid::new(0, 0, Vec::new());
        assert_eq!(classify_gaze(&empty, &config), GazeDirection::Center);
    }

    #[test]
    fn test_disagreement_is_center() {
        use GazeDirection::*;
        let all = [Left, Right, Center];
        for &l in &all {
            for &r in &all {
                let combined = combine_gaze(l, r);
                if l == r {
                    assert_eq!(combined, l);
                } else {
                    assert_eq!(combined, Center, "{l:?} + {r:?}");
                }
            }
        }
    }
}
