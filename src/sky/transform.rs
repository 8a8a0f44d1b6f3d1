use crate::geom::{Angles, Vector3};
use crate::replace::ModelReplacementTable;
use crate::vmf::{Entity, SceneObject};

/// Prop classes whose `model` key goes through the replacement index
pub const REPLACEABLE_CLASSES: [&str; 3] = ["prop_static", "prop_dynamic", "prop_dynamic_override"];

/// Fixed rotation added to a prop using `model`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrientationCorrection {
    pub model: &'static str,
    pub rotation: Angles,
}

/// Skybox models that are not authored facing the same way as their full size version
pub const ORIENTATION_CORRECTIONS: &[OrientationCorrection] = &[
    OrientationCorrection {
        model: "models/props_foliage/tree_pine01_4cluster_skybox.mdl",
        rotation: Angles::new(0.0, -90.0, 0.0),
    },
];

pub fn is_replaceable(entity: &Entity) -> bool {
    REPLACEABLE_CLASSES.iter().any(|class| entity.classname().eq_ignore_ascii_case(class))
}

fn props(objects: &[SceneObject]) -> impl Iterator<Item=&Entity> {
    objects.iter()
        .filter_map(SceneObject::as_entity)
        .filter(|entity| is_replaceable(entity))
}

fn props_mut(objects: &mut [SceneObject]) -> impl Iterator<Item=&mut Entity> {
    objects.iter_mut()
        .filter_map(SceneObject::as_entity_mut)
        .filter(|entity| is_replaceable(entity))
}

/// Distinct prop models without a replacement, in the order they first appear
pub fn unresolved_models(objects: &[SceneObject], table: &ModelReplacementTable) -> Vec<String> {
    let mut models: Vec<String> = Vec::new();
    for model in props(objects).filter_map(Entity::model) {
        if table.resolve(model).is_none() && !models.iter().any(|seen| seen == model) {
            models.push(model.to_string());
        }
    }
    models
}

/// Substitutes every prop model that has a replacement. Returns the number of props changed.
pub fn replace_models(objects: &mut [SceneObject], table: &ModelReplacementTable) -> usize {
    let mut replaced = 0;
    for prop in props_mut(objects) {
        let Some(replacement) = prop.model().and_then(|model| table.resolve(model)) else { continue; };
        let replacement = replacement.to_string();
        log::debug!("Replacing {} with {}", prop.model().unwrap_or_default(), replacement);
        prop.set_model(&replacement);
        replaced += 1;
    }
    replaced
}

/// Scales every object about `pivot`
pub fn scale(objects: &mut [SceneObject], pivot: Vector3, factors: Vector3) {
    for object in objects {
        object.scale(pivot, factors);
    }
}

/// Applies [`ORIENTATION_CORRECTIONS`] to matching props. Returns the number of props rotated.
pub fn apply_orientation_corrections(objects: &mut [SceneObject]) -> usize {
    let mut corrected = 0;
    for prop in props_mut(objects) {
        let Some(correction) = ORIENTATION_CORRECTIONS.iter().find(|correction| prop.model() == Some(correction.model)) else {
            continue;
        };
        let angles = prop.angles().unwrap_or_default() + correction.rotation;
        prop.set_angles(angles);
        corrected += 1;
    }
    corrected
}
