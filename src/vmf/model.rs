#![allow(non_camel_case_types)]

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::geom::{Angles, BoundingBox, Number, Plane, Vector3};
use super::{Block, ParseError};

/// Tolerance for vertex reconstruction, in Hammer units
const VERTEX_EPSILON: f64 = 1.0 / 1_000.0;

/// The `editor` block carried by solids, entities and groups
#[derive(Debug, Clone, PartialEq)]
pub struct EditorInfo {
    pub color: Option<String>,
    pub visgroup_ids: Vec<u32>,
    pub group_id: Option<u32>,
    pub visgroup_shown: bool,
    pub visgroup_auto_shown: bool,
    pub extra: Vec<(String, String)>,
}

impl Default for EditorInfo {
    fn default() -> Self {
        EditorInfo {
            color: None,
            visgroup_ids: Vec::new(),
            group_id: None,
            visgroup_shown: true,
            visgroup_auto_shown: true,
            extra: Vec::new(),
        }
    }
}

impl EditorInfo {
    pub fn from_block(block: &Block) -> Result<EditorInfo, ParseError> {
        let mut editor = EditorInfo::default();
        for (key, value) in &block.pairs {
            let invalid = || ParseError::InvalidValue {
                block: block.name.clone(),
                key: key.clone(),
                value: value.clone(),
            };
            match key.to_ascii_lowercase().as_str() {
                "color" => editor.color = Some(value.clone()),
                "visgroupid" => editor.visgroup_ids.push(value.trim().parse().map_err(|_| invalid())?),
                "groupid" => editor.group_id = Some(value.trim().parse().map_err(|_| invalid())?),
                "visgroupshown" => editor.visgroup_shown = value.trim() != "0",
                "visgroupautoshown" => editor.visgroup_auto_shown = value.trim() != "0",
                _ => editor.extra.push((key.clone(), value.clone())),
            }
        }
        Ok(editor)
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::new("editor");
        if let Some(color) = &self.color {
            block.push("color", color);
        }
        for id in &self.visgroup_ids {
            block.push("visgroupid", id);
        }
        if let Some(group_id) = self.group_id {
            block.push("groupid", group_id);
        }
        block.push("visgroupshown", self.visgroup_shown as u8);
        block.push("visgroupautoshown", self.visgroup_auto_shown as u8);
        block.pairs.extend(self.extra.iter().cloned());
        block
    }

    /// Drops scene-local group membership and shows the object
    pub fn normalize(&mut self) {
        self.visgroup_ids.clear();
        self.group_id = None;
        self.visgroup_shown = true;
    }
}

/// Texture projection axis, `[x y z offset] scale`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextureAxis {
    pub axis: Vector3,
    pub offset: f64,
    pub scale: f64,
}

impl TextureAxis {
    pub const fn new(axis: Vector3, offset: f64, scale: f64) -> TextureAxis {
        TextureAxis { axis, offset, scale }
    }

    /// Keeps the texture attached to a surface moved by `offset`
    fn translate(&mut self, offset: Vector3) {
        if self.scale != 0.0 {
            self.offset -= offset.dot(self.axis) / self.scale;
        }
    }

    /// Keeps the texture attached to a surface scaled about `pivot`
    fn scale_about(&mut self, pivot: Vector3, factors: Vector3) {
        let weights = self.axis.abs();
        let weight_sum = weights.x + weights.y + weights.z;
        if weight_sum == 0.0 || self.scale == 0.0 {
            return;
        }
        let factor = weights.dot(factors) / weight_sum;
        if factor == 0.0 {
            return;
        }
        let projected = pivot.dot(self.axis) / self.scale;
        self.offset += projected - projected / factor;
        self.scale *= factor;
    }
}

impl Display for TextureAxis {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{} {} {} {}] {}",
            Number(self.axis.x), Number(self.axis.y), Number(self.axis.z), Number(self.offset), Number(self.scale)
        )
    }
}

impl FromStr for TextureAxis {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (bracketed, scale) = s.trim().strip_prefix('[')
            .and_then(|rest| rest.split_once(']'))
            .ok_or(())?;
        let numbers = bracketed.split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ())?;
        let scale = scale.trim().parse::<f64>().map_err(|_| ())?;
        match numbers.as_slice() {
            [x, y, z, offset] => Ok(TextureAxis::new(Vector3::new(*x, *y, *z), *offset, scale)),
            _ => Err(()),
        }
    }
}

/// Direction a generated face points; Selects Hammer's default world-aligned texture axes
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TextureFace {
    X_POS,
    X_NEG,
    Y_POS,
    Y_NEG,
    Z_POS,
    Z_NEG,
}

impl TextureFace {
    pub fn u_axis(self) -> Vector3 {
        match self {
            TextureFace::X_POS | TextureFace::X_NEG => Vector3::new(0.0, 1.0, 0.0),
            TextureFace::Y_POS | TextureFace::Y_NEG => Vector3::new(1.0, 0.0, 0.0),
            TextureFace::Z_POS | TextureFace::Z_NEG => Vector3::new(1.0, 0.0, 0.0),
        }
    }

    pub fn v_axis(self) -> Vector3 {
        match self {
            TextureFace::X_POS | TextureFace::X_NEG => Vector3::new(0.0, 0.0, -1.0),
            TextureFace::Y_POS | TextureFace::Y_NEG => Vector3::new(0.0, 0.0, -1.0),
            TextureFace::Z_POS | TextureFace::Z_NEG => Vector3::new(0.0, -1.0, 0.0),
        }
    }
}

/// One face of a solid
#[derive(Debug, Clone, PartialEq)]
pub struct Side {
    pub id: u32,
    pub plane: [Vector3; 3],
    pub material: String,
    pub u_axis: TextureAxis,
    pub v_axis: TextureAxis,
    pub rotation: f64,
    pub lightmap_scale: u32,
    pub smoothing_groups: u32,
    pub extra: Vec<(String, String)>,
    /// Unrecognised child blocks, e.g. `dispinfo`
    pub blocks: Vec<Block>,
}

fn parse_plane(value: &str) -> Result<[Vector3; 3], ParseError> {
    let invalid = || ParseError::InvalidPlane(value.to_string());
    let mut points = value.split(')')
        .map(|chunk| chunk.trim().trim_start_matches('('))
        .filter(|chunk| !chunk.trim().is_empty())
        .map(|chunk| chunk.parse::<Vector3>().map_err(|_| invalid()));
    match (points.next(), points.next(), points.next(), points.next()) {
        (Some(a), Some(b), Some(c), None) => Ok([a?, b?, c?]),
        _ => Err(invalid()),
    }
}

fn format_plane(plane: &[Vector3; 3]) -> String {
    format!("({}) ({}) ({})", plane[0], plane[1], plane[2])
}

impl Side {
    /// New world-aligned side; The id is assigned when the owning solid is added to a document
    pub fn new(plane: [Vector3; 3], material: &str, texture_face: TextureFace) -> Side {
        Side {
            id: 0,
            plane,
            material: material.to_string(),
            u_axis: TextureAxis::new(texture_face.u_axis(), 0.0, 0.25),
            v_axis: TextureAxis::new(texture_face.v_axis(), 0.0, 0.25),
            rotation: 0.0,
            lightmap_scale: 16,
            smoothing_groups: 0,
            extra: Vec::new(),
            blocks: Vec::new(),
        }
    }

    pub fn from_block(block: &Block) -> Result<Side, ParseError> {
        let plane = block.value("plane").ok_or_else(|| ParseError::MissingKey {
            block: block.name.clone(),
            key: "plane".to_string(),
        })?;
        let mut extra = Vec::new();
        for (key, value) in &block.pairs {
            match key.to_ascii_lowercase().as_str() {
                "id" | "plane" | "material" | "uaxis" | "vaxis" | "rotation" | "lightmapscale" | "smoothing_groups" => {}
                _ => extra.push((key.clone(), value.clone())),
            }
        }
        Ok(Side {
            id: block.parse_value("id")?.unwrap_or(0),
            plane: parse_plane(plane)?,
            material: block.value("material").unwrap_or("TOOLS/TOOLSNODRAW").to_string(),
            u_axis: block.parse_value("uaxis")?.unwrap_or(TextureAxis::new(Vector3::new(1.0, 0.0, 0.0), 0.0, 0.25)),
            v_axis: block.parse_value("vaxis")?.unwrap_or(TextureAxis::new(Vector3::new(0.0, -1.0, 0.0), 0.0, 0.25)),
            rotation: block.parse_value("rotation")?.unwrap_or(0.0),
            lightmap_scale: block.parse_value("lightmapscale")?.unwrap_or(16),
            smoothing_groups: block.parse_value("smoothing_groups")?.unwrap_or(0),
            extra,
            blocks: block.blocks.clone(),
        })
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::new("side")
            .with("id", self.id)
            .with("plane", format_plane(&self.plane))
            .with("material", &self.material)
            .with("uaxis", self.u_axis)
            .with("vaxis", self.v_axis)
            .with("rotation", Number(self.rotation))
            .with("lightmapscale", self.lightmap_scale)
            .with("smoothing_groups", self.smoothing_groups);
        block.pairs.extend(self.extra.iter().cloned());
        block.blocks.extend(self.blocks.iter().cloned());
        block
    }

    pub fn outward_plane(&self) -> Option<Plane> {
        Plane::from_points(self.plane)
    }

    pub fn translate(&mut self, offset: Vector3) {
        for point in &mut self.plane {
            *point += offset;
        }
        self.u_axis.translate(offset);
        self.v_axis.translate(offset);
        for displacement in self.blocks.iter_mut().filter(|b| b.name.eq_ignore_ascii_case("dispinfo")) {
            transform_displacement(displacement, |point| point + offset, None);
        }
    }

    pub fn scale(&mut self, pivot: Vector3, factors: Vector3) {
        for point in &mut self.plane {
            *point = point.scale_about(pivot, factors);
        }
        self.u_axis.scale_about(pivot, factors);
        self.v_axis.scale_about(pivot, factors);
        for displacement in self.blocks.iter_mut().filter(|b| b.name.eq_ignore_ascii_case("dispinfo")) {
            transform_displacement(displacement, |point| point.scale_about(pivot, factors), Some(factors));
        }
    }
}

fn scale_row(row: &str, factors: &[f64]) -> Option<String> {
    let values = row.split_whitespace()
        .map(str::parse::<f64>)
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    Some(values.iter()
        .enumerate()
        .map(|(index, value)| Number(value * factors[index % factors.len()]).to_string())
        .collect::<Vec<_>>()
        .join(" "))
}

/// Moves a displacement with its side; `factors` also rescales the stored offsets and distances
fn transform_displacement<F: Fn(Vector3) -> Vector3>(displacement: &mut Block, transform_point: F, factors: Option<Vector3>) {
    if let Some(start) = displacement.value("startposition").and_then(|value| value.parse::<Vector3>().ok()) {
        let moved = transform_point(start);
        displacement.set("startposition", format!("[{}]", moved));
    }

    let Some(factors) = factors else { return; };

    if let Some(offsets) = displacement.child_mut("offsets") {
        for (key, row) in offsets.pairs.iter_mut() {
            match scale_row(row, &factors.array()) {
                Some(scaled) => *row = scaled,
                None => log::warn!("Skipping malformed displacement offsets {}", key),
            }
        }
    }

    // Distances and elevation are lengths along a normal; Only an isotropic scale maps them exactly
    if factors.x == factors.y && factors.y == factors.z {
        let factor = factors.x;
        if let Some(elevation) = displacement.value("elevation").and_then(|value| value.trim().parse::<f64>().ok()) {
            displacement.set("elevation", Number(elevation * factor));
        }
        if let Some(distances) = displacement.child_mut("distances") {
            for (key, row) in distances.pairs.iter_mut() {
                match scale_row(row, &[factor]) {
                    Some(scaled) => *row = scaled,
                    None => log::warn!("Skipping malformed displacement distances {}", key),
                }
            }
        }
    } else {
        log::warn!("Non-uniform scale applied to a displacement; Distances left unscaled");
    }
}

/// Struct to represent source engine solids/brushes
#[derive(Debug, Clone, PartialEq)]
pub struct Solid {
    pub id: u32,
    pub sides: Vec<Side>,
    pub editor: EditorInfo,
    /// Hidden in Hammer; Saved inside a `hidden` block
    pub hidden: bool,
    pub extra: Vec<(String, String)>,
    pub blocks: Vec<Block>,
}

impl Solid {
    pub fn new(sides: Vec<Side>) -> Solid {
        Solid {
            id: 0,
            sides,
            editor: EditorInfo::default(),
            hidden: false,
            extra: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Axis aligned box solid with Hammer's side winding
    pub fn block(min: Vector3, max: Vector3, material: &str) -> Solid {
        let Vector3 { x: x0, y: y0, z: z0 } = min;
        let Vector3 { x: x1, y: y1, z: z1 } = max;
        let v = Vector3::new;
        Solid::new(vec![
            Side::new([v(x0, y1, z1), v(x1, y1, z1), v(x1, y0, z1)], material, TextureFace::Z_POS),
            Side::new([v(x0, y0, z0), v(x1, y0, z0), v(x1, y1, z0)], material, TextureFace::Z_NEG),
            Side::new([v(x0, y1, z1), v(x0, y0, z1), v(x0, y0, z0)], material, TextureFace::X_NEG),
            Side::new([v(x1, y1, z0), v(x1, y0, z0), v(x1, y0, z1)], material, TextureFace::X_POS),
            Side::new([v(x1, y1, z1), v(x0, y1, z1), v(x0, y1, z0)], material, TextureFace::Y_POS),
            Side::new([v(x1, y0, z0), v(x0, y0, z0), v(x0, y0, z1)], material, TextureFace::Y_NEG),
        ])
    }

    pub fn from_block(block: &Block) -> Result<Solid, ParseError> {
        let mut sides = Vec::new();
        let mut editor = EditorInfo::default();
        let mut blocks = Vec::new();
        for child in &block.blocks {
            match child.name.to_ascii_lowercase().as_str() {
                "side" => sides.push(Side::from_block(child)?),
                "editor" => editor = EditorInfo::from_block(child)?,
                _ => blocks.push(child.clone()),
            }
        }
        Ok(Solid {
            id: block.parse_value("id")?.unwrap_or(0),
            sides,
            editor,
            hidden: false,
            extra: block.pairs.iter()
                .filter(|(key, _)| !key.eq_ignore_ascii_case("id"))
                .cloned()
                .collect(),
            blocks,
        })
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::new("solid").with("id", self.id);
        block.pairs.extend(self.extra.iter().cloned());
        block.blocks.extend(self.sides.iter().map(Side::to_block));
        block.blocks.push(self.editor.to_block());
        block.blocks.extend(self.blocks.iter().cloned());
        block
    }

    /// The block as saved in `world`, wrapped in `hidden` when hidden
    pub fn to_saved_block(&self) -> Block {
        wrap_hidden(self.to_block(), self.hidden)
    }

    pub fn set_material(&mut self, material: &str) {
        for side in &mut self.sides {
            side.material = material.to_string();
        }
    }

    /// Corner points of the solid, found by intersecting every triple of side planes
    /// and keeping the points that lie inside all of them
    pub fn vertices(&self) -> Vec<Vector3> {
        let planes: Vec<Plane> = self.sides.iter().filter_map(Side::outward_plane).collect();
        let mut vertices: Vec<Vector3> = Vec::new();
        for i in 0..planes.len() {
            for j in (i + 1)..planes.len() {
                for k in (j + 1)..planes.len() {
                    let Some(point) = Plane::intersect(&planes[i], &planes[j], &planes[k]) else { continue; };
                    let inside = planes.iter().all(|plane| plane.distance_to(point) <= VERTEX_EPSILON);
                    if inside && !vertices.iter().any(|v| v.approx_eq(point, VERTEX_EPSILON)) {
                        vertices.push(point);
                    }
                }
            }
        }
        if vertices.is_empty() && !self.sides.is_empty() {
            log::warn!("Solid {} does not form a closed volume; Using its plane points", self.id);
            return self.sides.iter().flat_map(|side| side.plane).collect();
        }
        vertices
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(self.vertices())
    }

    pub fn translate(&mut self, offset: Vector3) {
        for side in &mut self.sides {
            side.translate(offset);
        }
    }

    pub fn scale(&mut self, pivot: Vector3, factors: Vector3) {
        for side in &mut self.sides {
            side.scale(pivot, factors);
        }
    }
}

/// Entity keyvalues in file order; `origin`, `angles` and `model` have typed accessors on [`Entity`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Properties(pub Vec<(String, String)>);

impl Properties {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn set<V: ToString>(&mut self, key: &str, value: V) {
        match self.0.iter_mut().find(|(k, _)| k.eq_ignore_ascii_case(key)) {
            Some((_, v)) => *v = value.to_string(),
            None => self.0.push((key.to_string(), value.to_string())),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        let index = self.0.iter().position(|(k, _)| k.eq_ignore_ascii_case(key))?;
        Some(self.0.remove(index).1)
    }

    pub fn iter(&self) -> impl Iterator<Item=(&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

pub const KEY_CLASSNAME: &str = "classname";
pub const KEY_ORIGIN: &str = "origin";
pub const KEY_ANGLES: &str = "angles";
pub const KEY_MODEL: &str = "model";

/// Point or brush entity
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u32,
    pub properties: Properties,
    pub solids: Vec<Solid>,
    pub editor: EditorInfo,
    pub hidden: bool,
    /// Unrecognised child blocks, e.g. `connections`
    pub blocks: Vec<Block>,
}

impl Entity {
    pub fn new(classname: &str) -> Entity {
        let mut properties = Properties::default();
        properties.set(KEY_CLASSNAME, classname);
        Entity {
            id: 0,
            properties,
            solids: Vec::new(),
            editor: EditorInfo::default(),
            hidden: false,
            blocks: Vec::new(),
        }
    }

    pub fn from_block(block: &Block) -> Result<Entity, ParseError> {
        let mut solids = Vec::new();
        let mut editor = EditorInfo::default();
        let mut blocks = Vec::new();
        for child in &block.blocks {
            match child.name.to_ascii_lowercase().as_str() {
                "solid" => solids.push(Solid::from_block(child)?),
                "editor" => editor = EditorInfo::from_block(child)?,
                _ => blocks.push(child.clone()),
            }
        }
        // Typed keys are validated up front so the accessors never meet malformed data
        block.parse_value::<Vector3>(KEY_ORIGIN)?;
        block.parse_value::<Angles>(KEY_ANGLES)?;
        Ok(Entity {
            id: block.parse_value("id")?.unwrap_or(0),
            properties: Properties(block.pairs.iter()
                .filter(|(key, _)| !key.eq_ignore_ascii_case("id"))
                .cloned()
                .collect()),
            solids,
            editor,
            hidden: false,
            blocks,
        })
    }

    /// Entities found in a top level `hidden` block
    pub fn from_hidden_block(block: &Block) -> Result<Vec<Entity>, ParseError> {
        block.children("entity")
            .map(|child| Entity::from_block(child).map(|entity| Entity { hidden: true, ..entity }))
            .collect()
    }

    /// The block as saved at the top level of a file, wrapped in `hidden` when hidden
    pub fn to_saved_block(&self) -> Block {
        wrap_hidden(self.to_block(), self.hidden)
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::new("entity").with("id", self.id);
        block.pairs.extend(self.properties.0.iter().cloned());
        block.blocks.extend(self.blocks.iter().cloned());
        block.blocks.extend(self.solids.iter().map(Solid::to_block));
        block.blocks.push(self.editor.to_block());
        block
    }

    pub fn classname(&self) -> &str {
        self.properties.get(KEY_CLASSNAME).unwrap_or("")
    }

    pub fn origin(&self) -> Option<Vector3> {
        self.properties.get(KEY_ORIGIN).and_then(|value| value.parse().ok())
    }

    pub fn set_origin(&mut self, origin: Vector3) {
        self.properties.set(KEY_ORIGIN, origin);
    }

    pub fn angles(&self) -> Option<Angles> {
        self.properties.get(KEY_ANGLES).and_then(|value| value.parse().ok())
    }

    pub fn set_angles(&mut self, angles: Angles) {
        self.properties.set(KEY_ANGLES, angles);
    }

    pub fn model(&self) -> Option<&str> {
        self.properties.get(KEY_MODEL)
    }

    pub fn set_model(&mut self, model: &str) {
        self.properties.set(KEY_MODEL, model);
    }

    /// Origin plus the vertices of any brush solids
    pub fn points(&self) -> Vec<Vector3> {
        self.origin()
            .into_iter()
            .chain(self.solids.iter().flat_map(Solid::vertices))
            .collect()
    }

    pub fn translate(&mut self, offset: Vector3) {
        if let Some(origin) = self.origin() {
            self.set_origin(origin + offset);
        }
        for solid in &mut self.solids {
            solid.translate(offset);
        }
    }

    pub fn scale(&mut self, pivot: Vector3, factors: Vector3) {
        if let Some(origin) = self.origin() {
            self.set_origin(origin.scale_about(pivot, factors));
        }
        for solid in &mut self.solids {
            solid.scale(pivot, factors);
        }
    }
}

/// A solid or an entity that can move between documents
#[derive(Debug, Clone, PartialEq)]
pub enum SceneObject {
    Solid(Solid),
    Entity(Entity),
}

impl SceneObject {
    pub fn editor(&self) -> &EditorInfo {
        match self {
            SceneObject::Solid(solid) => &solid.editor,
            SceneObject::Entity(entity) => &entity.editor,
        }
    }

    pub fn editor_mut(&mut self) -> &mut EditorInfo {
        match self {
            SceneObject::Solid(solid) => &mut solid.editor,
            SceneObject::Entity(entity) => &mut entity.editor,
        }
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        match self {
            SceneObject::Solid(solid) => solid.hidden = hidden,
            SceneObject::Entity(entity) => entity.hidden = hidden,
        }
    }

    pub fn points(&self) -> Vec<Vector3> {
        match self {
            SceneObject::Solid(solid) => solid.vertices(),
            SceneObject::Entity(entity) => entity.points(),
        }
    }

    pub fn translate(&mut self, offset: Vector3) {
        match self {
            SceneObject::Solid(solid) => solid.translate(offset),
            SceneObject::Entity(entity) => entity.translate(offset),
        }
    }

    pub fn scale(&mut self, pivot: Vector3, factors: Vector3) {
        match self {
            SceneObject::Solid(solid) => solid.scale(pivot, factors),
            SceneObject::Entity(entity) => entity.scale(pivot, factors),
        }
    }

    pub fn as_entity(&self) -> Option<&Entity> {
        match self {
            SceneObject::Entity(entity) => Some(entity),
            SceneObject::Solid(_) => None,
        }
    }

    pub fn as_entity_mut(&mut self) -> Option<&mut Entity> {
        match self {
            SceneObject::Entity(entity) => Some(entity),
            SceneObject::Solid(_) => None,
        }
    }
}

impl From<Solid> for SceneObject {
    fn from(solid: Solid) -> Self {
        SceneObject::Solid(solid)
    }
}

impl From<Entity> for SceneObject {
    fn from(entity: Entity) -> Self {
        SceneObject::Entity(entity)
    }
}

/// Named visibility group; Visgroups nest
#[derive(Debug, Clone, PartialEq)]
pub struct Visgroup {
    pub name: String,
    pub id: u32,
    pub color: String,
    pub children: Vec<Visgroup>,
}

impl Visgroup {
    pub fn from_block(block: &Block) -> Result<Visgroup, ParseError> {
        Ok(Visgroup {
            name: block.value("name").unwrap_or("").to_string(),
            id: block.require_value("visgroupid")?,
            color: block.value("color").unwrap_or("255 255 255").to_string(),
            children: block.children("visgroup")
                .map(Visgroup::from_block)
                .collect::<Result<_, _>>()?,
        })
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::new("visgroup")
            .with("name", &self.name)
            .with("visgroupid", self.id)
            .with("color", &self.color);
        block.blocks.extend(self.children.iter().map(Visgroup::to_block));
        block
    }

    /// This visgroup followed by every visgroup nested below it
    pub fn flatten(&self) -> Vec<&Visgroup> {
        let mut out = vec![self];
        for child in &self.children {
            out.extend(child.flatten());
        }
        out
    }
}

/// Hammer object group (Ctrl+G); Its editor block can carry visgroup membership for its members
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    pub id: u32,
    pub editor: EditorInfo,
}

impl Group {
    pub fn from_block(block: &Block) -> Result<Group, ParseError> {
        Ok(Group {
            id: block.require_value("id")?,
            editor: match block.child("editor") {
                Some(editor) => EditorInfo::from_block(editor)?,
                None => EditorInfo::default(),
            },
        })
    }

    pub fn to_block(&self) -> Block {
        Block::new("group")
            .with("id", self.id)
            .with_block(self.editor.to_block())
    }
}

/// `versioninfo`; Values are kept verbatim
#[derive(Debug, Clone, PartialEq)]
pub struct VersionInfo {
    pub editor_version: String,
    pub editor_build: String,
    pub map_version: String,
    pub format_version: String,
    pub prefab: String,
    pub extra: Vec<(String, String)>,
}

impl Default for VersionInfo {
    fn default() -> Self {
        // Defaults from https://developer.valvesoftware.com/wiki/Valve_Map_Format
        VersionInfo {
            editor_version: "400".to_string(),
            editor_build: "3325".to_string(),
            map_version: "0".to_string(),
            format_version: "100".to_string(),
            prefab: "0".to_string(),
            extra: Vec::new(),
        }
    }
}

impl VersionInfo {
    pub fn from_block(block: &Block) -> VersionInfo {
        let defaults = VersionInfo::default();
        let get = |key: &str, default: String| block.value(key).map(str::to_string).unwrap_or(default);
        VersionInfo {
            editor_version: get("editorversion", defaults.editor_version),
            editor_build: get("editorbuild", defaults.editor_build),
            map_version: get("mapversion", defaults.map_version),
            format_version: get("formatversion", defaults.format_version),
            prefab: get("prefab", defaults.prefab),
            extra: block.pairs.iter()
                .filter(|(key, _)| !matches!(
                    key.to_ascii_lowercase().as_str(),
                    "editorversion" | "editorbuild" | "mapversion" | "formatversion" | "prefab"
                ))
                .cloned()
                .collect(),
        }
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::new("versioninfo")
            .with("editorversion", &self.editor_version)
            .with("editorbuild", &self.editor_build)
            .with("mapversion", &self.map_version)
            .with("formatversion", &self.format_version)
            .with("prefab", &self.prefab);
        block.pairs.extend(self.extra.iter().cloned());
        block
    }
}

/// Hammer saves each hidden object in its own `hidden` block
fn wrap_hidden(block: Block, hidden: bool) -> Block {
    if hidden {
        Block::new("hidden").with_block(block)
    } else {
        block
    }
}

/// What is left of a `hidden` block once the objects named `name` are taken out, if anything
pub(crate) fn without_children(block: &Block, name: &str) -> Option<Block> {
    let rest: Vec<Block> = block.blocks.iter()
        .filter(|child| !child.name.eq_ignore_ascii_case(name))
        .cloned()
        .collect();
    if rest.is_empty() && block.pairs.is_empty() {
        None
    } else {
        Some(Block { name: block.name.clone(), pairs: block.pairs.clone(), blocks: rest })
    }
}

/// The `world` block: worldspawn keyvalues, world brushes and groups
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub id: u32,
    pub properties: Properties,
    pub solids: Vec<Solid>,
    pub groups: Vec<Group>,
    /// Unrecognised child blocks
    pub blocks: Vec<Block>,
}

impl Default for World {
    fn default() -> Self {
        World {
            id: 1,
            properties: Properties(vec![
                ("mapversion".to_string(), "0".to_string()),
                (KEY_CLASSNAME.to_string(), "worldspawn".to_string()),
                ("skyname".to_string(), "sky_day01_01".to_string()),
                ("maxpropscreenwidth".to_string(), "-1".to_string()),
                ("detailvbsp".to_string(), "detail.vbsp".to_string()),
                ("detailmaterial".to_string(), "detail/detailsprites".to_string()),
            ]),
            solids: Vec::new(),
            groups: Vec::new(),
            blocks: Vec::new(),
        }
    }
}

impl World {
    pub fn from_block(block: &Block) -> Result<World, ParseError> {
        let mut solids = Vec::new();
        let mut groups = Vec::new();
        let mut blocks = Vec::new();
        for child in &block.blocks {
            match child.name.to_ascii_lowercase().as_str() {
                "solid" => solids.push(Solid::from_block(child)?),
                "group" => groups.push(Group::from_block(child)?),
                "hidden" => {
                    for solid in child.children("solid") {
                        solids.push(Solid { hidden: true, ..Solid::from_block(solid)? });
                    }
                    if let Some(rest) = without_children(child, "solid") {
                        blocks.push(rest);
                    }
                }
                _ => blocks.push(child.clone()),
            }
        }
        Ok(World {
            id: block.parse_value("id")?.unwrap_or(1),
            properties: Properties(block.pairs.iter()
                .filter(|(key, _)| !key.eq_ignore_ascii_case("id"))
                .cloned()
                .collect()),
            solids,
            groups,
            blocks,
        })
    }

    pub fn to_block(&self) -> Block {
        let mut block = Block::new("world").with("id", self.id);
        block.pairs.extend(self.properties.0.iter().cloned());
        block.blocks.extend(self.solids.iter().map(Solid::to_saved_block));
        block.blocks.extend(self.groups.iter().map(Group::to_block));
        block.blocks.extend(self.blocks.iter().cloned());
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(half: f64) -> Solid {
        Solid::block(Vector3::splat(-half), Vector3::splat(half), "dev/dev_measuregeneric01")
    }

    #[test]
    fn test_block_solid_vertices() {
        let mut vertices = cube(64.0).vertices();
        assert_eq!(vertices.len(), 8);
        vertices.sort_by(|a, b| a.array().partial_cmp(&b.array()).unwrap());
        assert!(vertices[0].approx_eq(Vector3::splat(-64.0), 1e-9));
        assert!(vertices[7].approx_eq(Vector3::splat(64.0), 1e-9));
    }

    #[test]
    fn test_vertices_of_wedge() {
        // Cube with the +X+Z edge cut away by a slanted face
        let mut solid = cube(64.0);
        solid.sides.push(Side::new(
            [Vector3::new(0.0, -64.0, 64.0), Vector3::new(0.0, 64.0, 64.0), Vector3::new(64.0, -64.0, 0.0)],
            "dev/dev_measuregeneric01",
            TextureFace::Z_POS,
        ));
        let bounds = solid.bounds().unwrap();
        assert!(bounds.max.approx_eq(Vector3::new(64.0, 64.0, 64.0), 1e-9));
        // The corner (64, y, 64) was cut off
        assert!(!solid.vertices().iter().any(|v| v.approx_eq(Vector3::new(64.0, 64.0, 64.0), 1e-6)));
        assert!(solid.vertices().iter().any(|v| v.approx_eq(Vector3::new(64.0, 64.0, 0.0), 1e-6)));
    }

    #[test]
    fn test_texture_axis_roundtrip() {
        let axis: TextureAxis = "[1 0 0 -32] 0.25".parse().unwrap();
        assert_eq!(axis, TextureAxis::new(Vector3::new(1.0, 0.0, 0.0), -32.0, 0.25));
        assert_eq!(axis.to_string(), "[1 0 0 -32] 0.25");
        assert!("[1 0 0] 0.25".parse::<TextureAxis>().is_err());
    }

    #[test]
    fn test_texture_lock_on_translate() {
        let mut side = Side::new(
            [Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 0.0)],
            "brick/brickwall001a",
            TextureFace::Z_POS,
        );
        side.translate(Vector3::new(8.0, 0.0, 0.0));
        // u = x / 0.25 + offset must be unchanged for the moved point
        assert_eq!(side.u_axis.offset, -32.0);
        assert_eq!(side.plane[0], Vector3::new(8.0, 0.0, 0.0));
    }

    #[test]
    fn test_texture_lock_on_scale() {
        let mut side = Side::new(
            [Vector3::new(0.0, 0.0, 0.0), Vector3::new(1.0, 0.0, 0.0), Vector3::new(1.0, 1.0, 0.0)],
            "brick/brickwall001a",
            TextureFace::Z_POS,
        );
        let point = Vector3::new(48.0, 0.0, 0.0);
        let pivot = Vector3::new(16.0, 0.0, 0.0);
        let u_before = point.dot(side.u_axis.axis) / side.u_axis.scale + side.u_axis.offset;
        side.scale(pivot, Vector3::splat(0.5));
        let moved = point.scale_about(pivot, Vector3::splat(0.5));
        let u_after = moved.dot(side.u_axis.axis) / side.u_axis.scale + side.u_axis.offset;
        assert!((u_before - u_after).abs() < 1e-9);
        assert_eq!(side.u_axis.scale, 0.125);
    }

    #[test]
    fn test_displacement_follows_scale() {
        let mut side = cube(64.0).sides.remove(0);
        side.blocks.push(Block::new("dispinfo")
            .with("power", 2)
            .with("startposition", "[-64 -64 64]")
            .with("elevation", 8)
            .with_block(Block::new("distances").with("row0", "16 0 32"))
            .with_block(Block::new("offsets").with("row0", "0 0 16 2 4 8")));
        side.scale(Vector3::ZERO, Vector3::splat(0.5));
        let displacement = &side.blocks[0];
        assert_eq!(displacement.value("startposition"), Some("[-32 -32 32]"));
        assert_eq!(displacement.value("elevation"), Some("4"));
        assert_eq!(displacement.child("distances").unwrap().value("row0"), Some("8 0 16"));
        assert_eq!(displacement.child("offsets").unwrap().value("row0"), Some("0 0 8 1 2 4"));
    }

    #[test]
    fn test_entity_roundtrip_keeps_unknown_keys() {
        let block = Block::new("entity")
            .with("id", 12)
            .with("classname", "prop_static")
            .with("angles", "0 90 0")
            .with("model", "models/props_foliage/tree_pine01.mdl")
            .with("skin", "0")
            .with("origin", "128 -64 0")
            .with_block(Block::new("editor").with("color", "255 255 0").with("visgroupid", 3).with("logicalpos", "[0 500]"));
        let entity = Entity::from_block(&block).unwrap();
        assert_eq!(entity.id, 12);
        assert_eq!(entity.origin(), Some(Vector3::new(128.0, -64.0, 0.0)));
        assert_eq!(entity.angles(), Some(Angles::new(0.0, 90.0, 0.0)));
        assert_eq!(entity.editor.visgroup_ids, vec![3]);
        let written = entity.to_block();
        assert_eq!(written.value("skin"), Some("0"));
        assert_eq!(written.child("editor").unwrap().value("logicalpos"), Some("[0 500]"));
        assert_eq!(Entity::from_block(&written).unwrap(), entity);
    }

    #[test]
    fn test_world_reads_and_writes_hidden_solids() {
        let mut hidden = cube(32.0).to_block();
        hidden.set("id", 7);
        let block = Block::new("world")
            .with("id", 1)
            .with("classname", "worldspawn")
            .with_block(cube(64.0).to_block())
            .with_block(Block::new("hidden").with_block(hidden));
        let world = World::from_block(&block).unwrap();
        assert_eq!(world.solids.len(), 2);
        assert!(!world.solids[0].hidden);
        assert!(world.solids[1].hidden);
        assert_eq!(world.solids[1].id, 7);
        assert!(world.blocks.is_empty());

        let written = world.to_block();
        assert_eq!(written.children("hidden").count(), 1);
        assert_eq!(written.child("hidden").and_then(|hidden| hidden.child("solid")).and_then(|solid| solid.value("id")), Some("7"));
        assert_eq!(World::from_block(&written).unwrap(), world);
    }

    #[test]
    fn test_hidden_entities() {
        let block = Block::new("hidden")
            .with_block(Block::new("entity").with("id", 3).with("classname", "env_fog_controller"));
        let entities = Entity::from_hidden_block(&block).unwrap();
        assert_eq!(entities.len(), 1);
        assert!(entities[0].hidden);
        let saved = entities[0].to_saved_block();
        assert_eq!(saved.name, "hidden");
        assert_eq!(saved.child("entity").and_then(|entity| entity.value("classname")), Some("env_fog_controller"));
        assert_eq!(Entity::new("info_target").to_saved_block().name, "entity");
    }

    #[test]
    fn test_entity_rejects_bad_origin() {
        let block = Block::new("entity").with("classname", "info_target").with("origin", "1 2");
        assert!(matches!(Entity::from_block(&block), Err(ParseError::InvalidValue { .. })));
    }

    #[test]
    fn test_editor_normalize() {
        let mut editor = EditorInfo {
            visgroup_ids: vec![1, 2],
            group_id: Some(7),
            visgroup_shown: false,
            ..EditorInfo::default()
        };
        editor.normalize();
        assert!(editor.visgroup_ids.is_empty());
        assert_eq!(editor.group_id, None);
        assert!(editor.visgroup_shown);
    }
}
