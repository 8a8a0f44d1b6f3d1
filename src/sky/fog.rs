use crate::geom::{Angles, Vector3};
use crate::vmf::{Document, Entity};

pub const FOG_CONTROLLER_CLASS: &str = "env_fog_controller";
pub const SKY_CAMERA_CLASS: &str = "sky_camera";

/// Keys copied from the map's fog controller onto the sky camera
pub const FOG_KEYS: [&str; 9] = [
    "fogcolor",
    "fogcolor2",
    "fogdir",
    "fogend",
    "fogmaxdensity",
    "fogstart",
    "fogblend",
    "fogenable",
    "use_angles",
];

/// `sky_camera` with Hammer's default keyvalues; `scale` is the ratio between the map and its skybox
pub fn sky_camera(origin: Vector3, scale: f64) -> Entity {
    let mut camera = Entity::new(SKY_CAMERA_CLASS);
    camera.set_angles(Angles::default());
    camera.properties.set("scale", scale);
    camera.properties.set("fogenable", 0);
    camera.properties.set("fogblend", 0);
    camera.properties.set("use_angles", 0);
    camera.properties.set("fogcolor", "255 255 255");
    camera.properties.set("fogcolor2", "255 255 255");
    camera.properties.set("fogdir", "1 0 0");
    camera.properties.set("fogstart", "500.0");
    camera.properties.set("fogend", "2000.0");
    camera.properties.set("fogmaxdensity", 1);
    camera.set_origin(origin);
    camera
}

/// First fog controller in document order
pub fn find_fog_controller(document: &Document) -> Option<&Entity> {
    document.find_entity(FOG_CONTROLLER_CLASS)
}

/// Copies the fog keys the controller defines onto `camera`. Returns how many were copied.
pub fn copy_fog_settings(controller: &Entity, camera: &mut Entity) -> usize {
    let mut copied = 0;
    for key in FOG_KEYS {
        if let Some(value) = controller.properties.get(key) {
            camera.properties.set(key, value);
            copied += 1;
        }
    }
    copied
}
