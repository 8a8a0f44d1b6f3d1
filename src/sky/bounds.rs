use crate::error::{Error, Result};
use crate::geom::{BoundingBox, Vector3};
use crate::vmf::SceneObject;

/// Bounds of every solid vertex and entity origin in `objects`
pub fn bounds(objects: &[SceneObject]) -> Result<BoundingBox> {
    BoundingBox::from_points(objects.iter().flat_map(SceneObject::points)).ok_or(Error::EmptyInput)
}

/// Like [`bounds`], but an empty set yields the degenerate box around `fallback`
pub fn bounds_or(objects: &[SceneObject], fallback: Vector3) -> BoundingBox {
    bounds(objects).unwrap_or(BoundingBox::around(fallback))
}
