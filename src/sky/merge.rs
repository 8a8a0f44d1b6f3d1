use crate::geom::Vector3;
use crate::vmf::{Document, SceneObject};

use super::bounds::bounds_or;

/// Height the skybox top has to move to so it sits `clearance` units below the host's lowest point,
/// with that point snapped down onto the `grid_snap` grid
pub fn relocation(host_min_z: f64, skybox_top_z: f64, grid_snap: f64, clearance: f64) -> f64 {
    let relocated_top = host_min_z - host_min_z.rem_euclid(grid_snap) - clearance;
    relocated_top - skybox_top_z
}

/// Replaces the previous skybox in `host` with `objects`.
///
/// Everything in `visgroup` is deleted first so reruns do not pile up skyboxes. The skybox top is taken as the
/// highest point of `objects` minus `wall_thickness`, i.e. the inside of the ceiling.
pub fn merge_into(
    host: &mut Document,
    mut objects: Vec<SceneObject>,
    visgroup: &str,
    grid_snap: f64,
    clearance: f64,
    wall_thickness: f64,
) {
    let removed = host.delete_visgroup_contents(visgroup);
    if removed > 0 {
        log::info!("Removed {} object(s) of the previous skybox", removed);
    }

    let host_min_z = host.bounds().map(|bounds| bounds.min.z).unwrap_or(0.0);
    let skybox_top_z = bounds_or(&objects, Vector3::ZERO).max.z - wall_thickness;
    let offset = Vector3::new(0.0, 0.0, relocation(host_min_z, skybox_top_z, grid_snap, clearance));
    log::debug!("Host bottom at z={}, moving skybox by {}", host_min_z, offset);

    for object in &mut objects {
        object.translate(offset);
    }
    host.add_to_visgroup(visgroup, objects.iter_mut());
    host.adopt(objects);
}
