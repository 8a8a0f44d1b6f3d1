use crate::vmf::{Document, SceneObject};

/// Detaches everything in visgroup `visgroup` (or any visgroup nested in it) from `document`.
///
/// World solids always come first, followed by entities when `include_entities` is set and `solids_only` is not.
/// Hidden objects are extracted too. Visgroup and group ids only mean something inside their own document, so they
/// are cleared and every extracted object is made visible.
pub fn extract(document: &mut Document, visgroup: &str, solids_only: bool, include_entities: bool) -> Vec<SceneObject> {
    let (solids, entities) = document.take_visgroup_members(visgroup, include_entities && !solids_only);
    log::debug!("Extracted {} solid(s) and {} entities from visgroup \"{}\"", solids.len(), entities.len(), visgroup);

    let mut objects: Vec<SceneObject> = solids.into_iter()
        .map(SceneObject::from)
        .chain(entities.into_iter().map(SceneObject::from))
        .collect();
    for object in &mut objects {
        object.set_hidden(false);
        object.editor_mut().normalize();
        if let SceneObject::Entity(entity) = object {
            for solid in &mut entity.solids {
                solid.hidden = false;
                solid.editor.normalize();
            }
        }
    }
    objects
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Vector3;
    use crate::vmf::{Entity, Solid};

    fn tagged_document() -> Document {
        let mut document = Document::new_empty();
        let autosky = document.ensure_visgroup("AutoSky");
        let other = document.ensure_visgroup("Detail");

        let mut hill = Solid::block(Vector3::new(0.0, 0.0, 0.0), Vector3::new(256.0, 256.0, 64.0), "nature/grass");
        hill.editor.visgroup_ids = vec![other, autosky];
        hill.editor.visgroup_shown = false;
        let playable = Solid::block(Vector3::new(-64.0, -64.0, -16.0), Vector3::new(64.0, 64.0, 0.0), "dev/dev_blendmeasure");
        let mut tree = Entity::new("prop_static");
        tree.set_origin(Vector3::new(128.0, 64.0, 64.0));
        tree.editor.visgroup_ids = vec![autosky];

        document.adopt(vec![SceneObject::from(hill), SceneObject::from(playable), SceneObject::from(tree)]);
        document
    }

    #[test]
    fn test_extract_normalizes_editor_info() {
        let mut document = tagged_document();
        let objects = extract(&mut document, "AutoSky", false, true);
        assert_eq!(objects.len(), 2);
        assert!(matches!(objects[0], SceneObject::Solid(_)));
        assert!(matches!(objects[1], SceneObject::Entity(_)));
        for object in &objects {
            assert!(object.editor().visgroup_ids.is_empty());
            assert!(object.editor().visgroup_shown);
        }
        assert_eq!(document.world.solids.len(), 1);
        assert!(document.entities.is_empty());
    }

    #[test]
    fn test_extract_shows_hidden_objects() {
        let mut document = tagged_document();
        for solid in &mut document.world.solids {
            solid.hidden = true;
        }
        document.entities[0].hidden = true;
        let objects = extract(&mut document, "AutoSky", false, true);
        assert_eq!(objects.len(), 2);
        for object in &objects {
            match object {
                SceneObject::Solid(solid) => assert!(!solid.hidden),
                SceneObject::Entity(entity) => assert!(!entity.hidden),
            }
            assert!(object.editor().visgroup_shown);
        }
        assert!(document.world.solids[0].hidden);
    }

    #[test]
    fn test_extract_solids_only_leaves_entities() {
        let mut document = tagged_document();
        let objects = extract(&mut document, "AutoSky", true, false);
        assert_eq!(objects.len(), 1);
        assert_eq!(document.entities.len(), 1);
    }

    #[test]
    fn test_extract_missing_visgroup_is_empty() {
        let mut document = tagged_document();
        assert!(extract(&mut document, "Nope", false, true).is_empty());
        assert_eq!(document.world.solids.len(), 2);
    }

    #[test]
    fn test_extract_scale_one_and_return_roundtrips() {
        let original = tagged_document();
        let mut document = original.clone();
        let mut objects = extract(&mut document, "AutoSky", false, true);
        for object in &mut objects {
            object.scale(Vector3::ZERO, Vector3::splat(1.0));
        }
        document.adopt(objects);

        let mut expected = original.clone();
        // The untouched solid already has default editor info
        for solid in &mut expected.world.solids {
            solid.editor.normalize();
        }
        for entity in &mut expected.entities {
            entity.editor.normalize();
        }
        let mut expected_solids = expected.world.solids.clone();
        let mut actual_solids = document.world.solids.clone();
        expected_solids.sort_by_key(|solid| solid.id);
        actual_solids.sort_by_key(|solid| solid.id);
        assert_eq!(actual_solids, expected_solids);
        assert_eq!(document.entities, expected.entities);
    }
}
