use std::collections::{HashMap, HashSet};

use crate::geom::{BoundingBox, Vector3};
use super::model::without_children;
use super::{Block, EditorInfo, Entity, ParseError, SceneObject, Solid, VersionInfo, Visgroup, World};

/// Hands out ids above the highest one in use
struct IdAllocator {
    used: HashSet<u32>,
    next: u32,
}

impl IdAllocator {
    fn new(used: HashSet<u32>) -> IdAllocator {
        let next = used.iter().max().copied().unwrap_or(0) + 1;
        IdAllocator { used, next }
    }

    /// Keeps `id` if it is free, otherwise replaces it with a fresh one
    fn claim(&mut self, id: &mut u32) {
        if *id == 0 || self.used.contains(id) {
            while self.used.contains(&self.next) {
                self.next += 1;
            }
            *id = self.next;
        }
        self.used.insert(*id);
    }
}

/// A whole VMF file
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub version_info: VersionInfo,
    pub visgroups: Vec<Visgroup>,
    pub world: World,
    /// Entities, hidden ones included
    pub entities: Vec<Entity>,
    /// Other top level blocks (`viewsettings`, `cameras`, `cordon`, ...), in file order
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new_empty() -> Document {
        Document {
            version_info: VersionInfo::default(),
            visgroups: Vec::new(),
            world: World::default(),
            entities: Vec::new(),
            blocks: vec![
                Block::new("viewsettings")
                    .with("bSnapToGrid", 1)
                    .with("bShowGrid", 1)
                    .with("bShowLogicalGrid", 0)
                    .with("nGridSpacing", 64)
                    .with("bShow3DGrid", 0),
                Block::new("cameras").with("activecamera", -1),
                Block::new("cordon")
                    .with("mins", "(-1024 -1024 -1024)")
                    .with("maxs", "(1024 1024 1024)")
                    .with("active", 0),
            ],
        }
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Result<Document, ParseError> {
        let mut version_info = None;
        let mut visgroups = Vec::new();
        let mut world = None;
        let mut entities = Vec::new();
        let mut rest = Vec::new();
        for block in blocks {
            match block.name.to_ascii_lowercase().as_str() {
                "versioninfo" => version_info = Some(VersionInfo::from_block(&block)),
                "visgroups" => {
                    for visgroup in block.children("visgroup") {
                        visgroups.push(Visgroup::from_block(visgroup)?);
                    }
                }
                "world" => {
                    if world.is_some() {
                        return Err(ParseError::InvalidValue {
                            block: "world".to_string(),
                            key: "world".to_string(),
                            value: "more than one world block".to_string(),
                        });
                    }
                    world = Some(World::from_block(&block)?)
                }
                "entity" => entities.push(Entity::from_block(&block)?),
                "hidden" => {
                    entities.extend(Entity::from_hidden_block(&block)?);
                    rest.extend(without_children(&block, "entity"));
                }
                _ => rest.push(block),
            }
        }
        Ok(Document {
            version_info: version_info.unwrap_or_default(),
            visgroups,
            world: world.ok_or_else(|| ParseError::MissingKey {
                block: "document".to_string(),
                key: "world".to_string(),
            })?,
            entities,
            blocks: rest,
        })
    }

    /// Every visgroup, depth first
    pub fn all_visgroups(&self) -> Vec<&Visgroup> {
        self.visgroups.iter().flat_map(Visgroup::flatten).collect()
    }

    /// Ids of every visgroup called `name` and of everything nested below them
    pub fn visgroup_ids_under(&self, name: &str) -> HashSet<u32> {
        self.all_visgroups()
            .into_iter()
            .filter(|visgroup| visgroup.name == name)
            .flat_map(|visgroup| visgroup.flatten())
            .map(|visgroup| visgroup.id)
            .collect()
    }

    /// Visgroups a Hammer group puts its members into
    fn group_visgroups(&self) -> HashMap<u32, Vec<u32>> {
        self.world.groups.iter()
            .map(|group| (group.id, group.editor.visgroup_ids.clone()))
            .collect()
    }

    /// Membership test for an editor block against a set of visgroup ids
    fn member_of(editor: &EditorInfo, ids: &HashSet<u32>, groups: &HashMap<u32, Vec<u32>>) -> bool {
        editor.visgroup_ids.iter().any(|id| ids.contains(id))
            || editor.group_id
                .and_then(|group| groups.get(&group))
                .is_some_and(|group_ids| group_ids.iter().any(|id| ids.contains(id)))
    }

    pub fn is_in_visgroup(&self, editor: &EditorInfo, name: &str) -> bool {
        let ids = self.visgroup_ids_under(name);
        !ids.is_empty() && Self::member_of(editor, &ids, &self.group_visgroups())
    }

    /// Detaches world solids (and entities, if `include_entities`) that belong to visgroup `name`
    pub fn take_visgroup_members(&mut self, name: &str, include_entities: bool) -> (Vec<Solid>, Vec<Entity>) {
        let ids = self.visgroup_ids_under(name);
        if ids.is_empty() {
            return (Vec::new(), Vec::new());
        }
        let groups = self.group_visgroups();

        let (solids, kept): (Vec<Solid>, Vec<Solid>) = std::mem::take(&mut self.world.solids)
            .into_iter()
            .partition(|solid| Self::member_of(&solid.editor, &ids, &groups));
        self.world.solids = kept;

        let entities = if include_entities {
            let (entities, kept): (Vec<Entity>, Vec<Entity>) = std::mem::take(&mut self.entities)
                .into_iter()
                .partition(|entity| Self::member_of(&entity.editor, &ids, &groups));
            self.entities = kept;
            entities
        } else {
            Vec::new()
        };
        (solids, entities)
    }

    /// Removes everything in visgroup `name`; The visgroup itself stays. Returns the number of removed objects.
    pub fn delete_visgroup_contents(&mut self, name: &str) -> usize {
        let (solids, entities) = self.take_visgroup_members(name, true);
        solids.len() + entities.len()
    }

    /// Id of the top level visgroup `name`, creating it if needed
    pub fn ensure_visgroup(&mut self, name: &str) -> u32 {
        if let Some(visgroup) = self.all_visgroups().into_iter().find(|visgroup| visgroup.name == name) {
            return visgroup.id;
        }
        let id = self.all_visgroups().iter().map(|visgroup| visgroup.id).max().unwrap_or(0) + 1;
        self.visgroups.push(Visgroup {
            name: name.to_string(),
            id,
            color: "255 0 255".to_string(),
            children: Vec::new(),
        });
        id
    }

    /// Tags objects with visgroup `name` (created if missing)
    pub fn add_to_visgroup<'a, I: IntoIterator<Item=&'a mut SceneObject>>(&mut self, name: &str, objects: I) {
        let id = self.ensure_visgroup(name);
        for object in objects {
            let editor = object.editor_mut();
            if !editor.visgroup_ids.contains(&id) {
                editor.visgroup_ids.push(id);
            }
        }
    }

    fn used_ids(&self) -> (HashSet<u32>, HashSet<u32>) {
        let mut objects = HashSet::new();
        let mut sides = HashSet::new();
        let mut visit_solid = |solid: &Solid, objects: &mut HashSet<u32>| {
            objects.insert(solid.id);
            sides.extend(solid.sides.iter().map(|side| side.id));
        };
        objects.insert(self.world.id);
        for solid in &self.world.solids {
            visit_solid(solid, &mut objects);
        }
        for group in &self.world.groups {
            objects.insert(group.id);
        }
        for entity in &self.entities {
            objects.insert(entity.id);
            for solid in &entity.solids {
                visit_solid(solid, &mut objects);
            }
        }
        (objects, sides)
    }

    /// Moves objects into this document, keeping their ids unless they are unset or already taken
    pub fn adopt<I: IntoIterator<Item=SceneObject>>(&mut self, objects: I) {
        let (object_ids, side_ids) = self.used_ids();
        let mut object_ids = IdAllocator::new(object_ids);
        let mut side_ids = IdAllocator::new(side_ids);

        let mut claim_solid = |solid: &mut Solid, object_ids: &mut IdAllocator| {
            object_ids.claim(&mut solid.id);
            for side in &mut solid.sides {
                side_ids.claim(&mut side.id);
            }
        };

        for object in objects {
            match object {
                SceneObject::Solid(mut solid) => {
                    claim_solid(&mut solid, &mut object_ids);
                    self.world.solids.push(solid);
                }
                SceneObject::Entity(mut entity) => {
                    object_ids.claim(&mut entity.id);
                    for solid in &mut entity.solids {
                        claim_solid(solid, &mut object_ids);
                    }
                    self.entities.push(entity);
                }
            }
        }
    }

    /// Every point of the map's geometry, hidden objects included: world brush vertices, entity origins
    /// and entity brush vertices
    pub fn points(&self) -> Vec<Vector3> {
        self.world.solids.iter()
            .flat_map(Solid::vertices)
            .chain(self.entities.iter().flat_map(Entity::points))
            .collect()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.points())
    }

    /// First entity with the given classname, in document order
    pub fn find_entity(&self, classname: &str) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.classname().eq_ignore_ascii_case(classname))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vmf::{parse_vmf, Group};

    const MAP: &str = r#"
versioninfo
{
	"editorversion" "400"
	"editorbuild" "8864"
	"mapversion" "3"
	"formatversion" "100"
	"prefab" "0"
}
visgroups
{
	visgroup
	{
		"name" "AutoSky"
		"visgroupid" "4"
		"color" "65 45 0"
		visgroup
		{
			"name" "Hills"
			"visgroupid" "5"
			"color" "0 100 0"
		}
	}
}
world
{
	"id" "1"
	"classname" "worldspawn"
	solid
	{
		"id" "2"
		side
		{
			"id" "1"
			"plane" "(-64 64 64) (64 64 64) (64 -64 64)"
			"material" "NATURE/BLENDGRASSGRAVEL001A"
			"uaxis" "[1 0 0 0] 0.25"
			"vaxis" "[0 -1 0 0] 0.25"
			"rotation" "0"
			"lightmapscale" "16"
			"smoothing_groups" "0"
		}
		editor
		{
			"color" "0 180 0"
			"visgroupid" "5"
			"visgroupshown" "1"
			"visgroupautoshown" "1"
		}
	}
	solid
	{
		"id" "3"
		side
		{
			"id" "2"
			"plane" "(-64 64 -64) (64 64 -64) (64 -64 -64)"
			"material" "DEV/DEV_MEASUREGENERIC01"
			"uaxis" "[1 0 0 0] 0.25"
			"vaxis" "[0 -1 0 0] 0.25"
		}
		editor
		{
			"color" "0 180 0"
			"groupid" "9"
			"visgroupshown" "1"
		}
	}
	solid
	{
		"id" "4"
		side
		{
			"id" "3"
			"plane" "(-64 64 -128) (64 64 -128) (64 -64 -128)"
			"material" "DEV/DEV_MEASUREGENERIC01"
		}
		editor
		{
			"visgroupshown" "1"
		}
	}
	group
	{
		"id" "9"
		editor
		{
			"visgroupid" "4"
			"visgroupshown" "1"
		}
	}
}
entity
{
	"id" "20"
	"classname" "prop_static"
	"model" "models/props_foliage/tree_pine01.mdl"
	"origin" "0 0 0"
	editor
	{
		"visgroupid" "4"
		"visgroupshown" "0"
	}
}
cameras
{
	"activecamera" "-1"
}
"#;

    #[test]
    fn test_from_blocks_sorts_blocks() {
        let document = parse_vmf(MAP).unwrap();
        assert_eq!(document.version_info.editor_build, "8864");
        assert_eq!(document.world.solids.len(), 3);
        assert_eq!(document.world.groups, vec![Group {
            id: 9,
            editor: EditorInfo { visgroup_ids: vec![4], ..EditorInfo::default() },
        }]);
        assert_eq!(document.entities.len(), 1);
        assert_eq!(document.blocks.len(), 1);
        assert_eq!(document.blocks[0].name, "cameras");
    }

    #[test]
    fn test_visgroup_membership_is_nested_and_through_groups() {
        let document = parse_vmf(MAP).unwrap();
        assert_eq!(document.visgroup_ids_under("AutoSky"), HashSet::from([4, 5]));
        let members: Vec<u32> = document.world.solids.iter()
            .filter(|solid| document.is_in_visgroup(&solid.editor, "AutoSky"))
            .map(|solid| solid.id)
            .collect();
        assert_eq!(members, vec![2, 3]);
        assert!(!document.is_in_visgroup(&document.world.solids[0].editor, "Missing"));
    }

    #[test]
    fn test_take_visgroup_members() {
        let mut document = parse_vmf(MAP).unwrap();
        let (solids, entities) = document.take_visgroup_members("AutoSky", false);
        assert_eq!(solids.len(), 2);
        assert!(entities.is_empty());
        assert_eq!(document.world.solids.len(), 1);
        assert_eq!(document.entities.len(), 1);
        assert_eq!(document.delete_visgroup_contents("AutoSky"), 1);
        assert!(document.entities.is_empty());
    }

    #[test]
    fn test_hidden_objects_are_members() {
        let text = MAP.replace("cameras\n{", r#"hidden
{
	entity
	{
		"id" "21"
		"classname" "env_fog_controller"
		"origin" "0 0 512"
		editor
		{
			"visgroupid" "5"
			"visgroupshown" "0"
		}
	}
}
cameras
{"#);
        let mut document = parse_vmf(&text).unwrap();
        assert_eq!(document.entities.len(), 2);
        assert!(document.entities[1].hidden);
        assert_eq!(document.blocks.len(), 1);
        assert_eq!(document.find_entity("env_fog_controller").map(|entity| entity.id), Some(21));
        assert_eq!(document.bounds().unwrap().max.z, 512.0);

        let rendered = String::from_utf8(crate::vmf::render_vmf(&document).unwrap()).unwrap();
        assert_eq!(parse_vmf(&rendered).unwrap(), document);

        assert_eq!(document.delete_visgroup_contents("Hills"), 2);
        assert!(document.find_entity("env_fog_controller").is_none());
    }

    #[test]
    fn test_ensure_visgroup_reuses_and_allocates() {
        let mut document = parse_vmf(MAP).unwrap();
        assert_eq!(document.ensure_visgroup("Hills"), 5);
        assert_eq!(document.ensure_visgroup("3D Skybox (AutoSky)"), 6);
        assert_eq!(document.ensure_visgroup("3D Skybox (AutoSky)"), 6);
        assert_eq!(document.visgroups.len(), 2);
    }

    #[test]
    fn test_adopt_reassigns_colliding_ids() {
        let mut document = parse_vmf(MAP).unwrap();
        let mut solid = document.world.solids[0].clone();
        solid.id = 2;
        let fresh = Solid::block(Vector3::splat(-8.0), Vector3::splat(8.0), "tools/toolsskybox");
        let mut entity = Entity::new("sky_camera");
        entity.id = 77;
        document.adopt(vec![SceneObject::Solid(solid), SceneObject::Solid(fresh), SceneObject::Entity(entity)]);

        let ids: Vec<u32> = document.world.solids.iter().map(|solid| solid.id).collect();
        assert_eq!(ids, vec![2, 3, 4, 21, 22]);
        assert_eq!(document.entities.last().unwrap().id, 77);
        let (objects, sides) = document.used_ids();
        assert_eq!(objects.len(), 1 + 5 + 1 + 2);
        assert_eq!(sides.len(), 3 + 1 + 6);
    }

    #[test]
    fn test_document_bounds() {
        let mut document = Document::new_empty();
        assert!(document.bounds().is_none());
        document.adopt(vec![SceneObject::Solid(Solid::block(
            Vector3::new(0.0, 0.0, -32.0),
            Vector3::new(16.0, 16.0, 0.0),
            "dev/dev_measuregeneric01",
        ))]);
        let bounds = document.bounds().unwrap();
        assert_eq!(bounds.min.z, -32.0);
        assert_eq!(bounds.max.x, 16.0);
    }
}
