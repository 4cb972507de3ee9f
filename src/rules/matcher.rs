//! Region matching: does one detection satisfy one model constraint

use super::rule::ModelConstraint;
use crate::detection::Detection;

/// True when every predicate of the constraint holds for the detection.
///
/// Confidence is compared inclusively against the floor, box sizes against
/// `[min, max)`, and the polygon test uses the box base point.
pub fn is_contained(detection: &Detection, constraint: &ModelConstraint) -> bool {
    let bbox = &detection.bbox;

    detection.confidence >= constraint.confidence
        && bbox.width >= constraint.min_width
        && bbox.width < constraint.max_width
        && bbox.height >= constraint.min_height
        && bbox.height < constraint.max_height
        && constraint.polygon.contains(bbox.base_point())
}

/// Number of detections satisfying the constraint
pub fn count_matches(detections: &[Detection], constraint: &ModelConstraint) -> usize {
    detections
        .iter()
        .filter(|d| {
            let hit = is_contained(d, constraint);
            tracing::trace!(
                "{}:{} conf={:.2} box=({:.0},{:.0},{:.0},{:.0}) matched={}",
                constraint.model,
                constraint.category,
                d.confidence,
                d.bbox.center_x,
                d.bbox.center_y,
                d.bbox.width,
                d.bbox.height,
                hit
            );
            hit
        })
        .count()
}
