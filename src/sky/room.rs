//! Hollow skybox room sized to enclose a set of bounds

use crate::error::{Error, Result};
use crate::geom::{BoundingBox, Vector3};
use crate::vmf::Solid;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RoomSettings {
    /// Room dimensions are whole multiples of this, per side of the origin
    pub min_block_unit: f64,
    /// Grid the merged skybox is snapped to
    pub grid_snap: f64,
    pub wall_thickness: f64,
}

impl Default for RoomSettings {
    fn default() -> Self {
        RoomSettings {
            min_block_unit: 128.0,
            grid_snap: 64.0,
            wall_thickness: 16.0,
        }
    }
}

/// Quantized extent of the room along one axis
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct AxisLayout {
    pub blocks_toward_lower: f64,
    pub blocks_toward_upper: f64,
    /// Interior size along the axis
    pub total: f64,
    /// Signed shift of the room centre away from the origin
    pub offset: f64,
}

impl AxisLayout {
    pub fn compute(lower: f64, upper: f64, min_block_unit: f64) -> AxisLayout {
        // One block more than the tightest fit, even on exact multiples
        let blocks_toward_lower = (lower.abs() / min_block_unit).floor() + 1.0;
        let blocks_toward_upper = (upper.abs() / min_block_unit).floor() + 1.0;
        AxisLayout {
            blocks_toward_lower,
            blocks_toward_upper,
            total: (blocks_toward_lower + blocks_toward_upper) * min_block_unit,
            offset: (blocks_toward_upper - blocks_toward_lower) / 2.0 * min_block_unit,
        }
    }

    pub fn interior_min(&self) -> f64 {
        self.offset - self.total / 2.0
    }

    pub fn interior_max(&self) -> f64 {
        self.offset + self.total / 2.0
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RoomLayout {
    pub x: AxisLayout,
    pub y: AxisLayout,
    pub z: AxisLayout,
}

impl RoomLayout {
    pub fn compute(bounds: &BoundingBox, min_block_unit: f64) -> Result<RoomLayout> {
        if !(min_block_unit.is_finite() && min_block_unit > 0.0) {
            return Err(Error::DegenerateRoom(format!("minimum block unit must be positive, got {}", min_block_unit)));
        }
        if !bounds.min.is_finite() || !bounds.max.is_finite() {
            return Err(Error::DegenerateRoom("bounds are not finite".to_string()));
        }
        if bounds.min.x > bounds.max.x || bounds.min.y > bounds.max.y || bounds.min.z > bounds.max.z {
            return Err(Error::DegenerateRoom(format!("inverted bounds {} to {}", bounds.min, bounds.max)));
        }
        Ok(RoomLayout {
            x: AxisLayout::compute(bounds.min.x, bounds.max.x, min_block_unit),
            y: AxisLayout::compute(bounds.min.y, bounds.max.y, min_block_unit),
            z: AxisLayout::compute(bounds.min.z, bounds.max.z, min_block_unit),
        })
    }

    pub fn size(&self) -> Vector3 {
        Vector3::new(self.x.total, self.y.total, self.z.total)
    }

    pub fn offset(&self) -> Vector3 {
        Vector3::new(self.x.offset, self.y.offset, self.z.offset)
    }

    pub fn interior(&self) -> BoundingBox {
        BoundingBox::new(
            Vector3::new(self.x.interior_min(), self.y.interior_min(), self.z.interior_min()),
            Vector3::new(self.x.interior_max(), self.y.interior_max(), self.z.interior_max()),
        )
    }
}

/// Six walls around an interior of `size`, centred on the origin, in the order +X, +Y, +Z, -X, -Y, -Z.
///
/// X walls cover the full outer face, Y walls fit between them and Z walls fit between all four, so no two walls overlap.
pub fn room_shell(size: Vector3, wall_thickness: f64, material: &str) -> [Solid; 6] {
    let inner = size / 2.0;
    let outer = inner + Vector3::splat(wall_thickness);
    let v = Vector3::new;
    [
        Solid::block(v(inner.x, -outer.y, -outer.z), v(outer.x, outer.y, outer.z), material),
        Solid::block(v(-inner.x, inner.y, -outer.z), v(inner.x, outer.y, outer.z), material),
        Solid::block(v(-inner.x, -inner.y, inner.z), v(inner.x, inner.y, outer.z), material),
        Solid::block(v(-outer.x, -outer.y, -outer.z), v(-inner.x, outer.y, outer.z), material),
        Solid::block(v(-inner.x, -outer.y, -outer.z), v(inner.x, -inner.y, outer.z), material),
        Solid::block(v(-inner.x, -inner.y, -outer.z), v(inner.x, inner.y, -inner.z), material),
    ]
}

/// Builds the room enclosing `bounds`: quantized to whole blocks on each side of the origin,
/// then shifted so the room follows the content when it is off centre
pub fn generate_room(bounds: &BoundingBox, min_block_unit: f64, wall_thickness: f64, material: &str) -> Result<[Solid; 6]> {
    if !(wall_thickness.is_finite() && wall_thickness > 0.0) {
        return Err(Error::DegenerateRoom(format!("wall thickness must be positive, got {}", wall_thickness)));
    }
    let layout = RoomLayout::compute(bounds, min_block_unit)?;
    log::debug!("Room interior {} offset {}", layout.size(), layout.offset());

    let mut walls = room_shell(layout.size(), wall_thickness, material);
    for wall in &mut walls {
        wall.translate(layout.offset());
    }
    Ok(walls)
}
