use std::fmt::{Display, Formatter};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};
use std::str::FromStr;

/// 3D vector in Hammer world units
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const ZERO: Vector3 = Vector3 { x: 0.0, y: 0.0, z: 0.0 };

    #[inline(always)]
    pub const fn new(x: f64, y: f64, z: f64) -> Vector3 {
        Vector3 { x, y, z }
    }

    #[inline(always)]
    pub const fn splat(value: f64) -> Vector3 {
        Vector3 { x: value, y: value, z: value }
    }

    #[inline(always)]
    pub fn from_array(array: [f64; 3]) -> Vector3 {
        Vector3 {
            x: array[0],
            y: array[1],
            z: array[2],
        }
    }

    pub fn array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }

    pub fn abs(self) -> Vector3 {
        Vector3 {
            x: self.x.abs(),
            y: self.y.abs(),
            z: self.z.abs(),
        }
    }

    pub fn dot(self, rhs: Vector3) -> f64 {
        self.x * rhs.x + self.y * rhs.y + self.z * rhs.z
    }

    pub fn cross(self, rhs: Vector3) -> Vector3 {
        Vector3 {
            x: self.y * rhs.z - self.z * rhs.y,
            y: self.z * rhs.x - self.x * rhs.z,
            z: self.x * rhs.y - self.y * rhs.x,
        }
    }

    pub fn magnitude(self) -> f64 {
        self.dot(self).sqrt()
    }

    pub fn min(self, rhs: Vector3) -> Vector3 {
        Vector3 {
            x: self.x.min(rhs.x),
            y: self.y.min(rhs.y),
            z: self.z.min(rhs.z),
        }
    }

    pub fn max(self, rhs: Vector3) -> Vector3 {
        Vector3 {
            x: self.x.max(rhs.x),
            y: self.y.max(rhs.y),
            z: self.z.max(rhs.z),
        }
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Scales this point about `pivot`, per axis
    pub fn scale_about(self, pivot: Vector3, factors: Vector3) -> Vector3 {
        pivot + (self - pivot) * factors
    }

    pub fn approx_eq(self, other: Vector3, margin: f64) -> bool {
        (self.x - other.x).abs() <= margin
            && (self.y - other.y).abs() <= margin
            && (self.z - other.z).abs() <= margin
    }
}

impl Add for Vector3 {
    type Output = Vector3;

    fn add(self, rhs: Self) -> Self::Output {
        Vector3 {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl AddAssign for Vector3 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs
    }
}

impl Sub for Vector3 {
    type Output = Vector3;

    fn sub(self, rhs: Self) -> Self::Output {
        Vector3 {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

impl SubAssign for Vector3 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs
    }
}

impl Neg for Vector3 {
    type Output = Vector3;

    fn neg(self) -> Self::Output {
        Vector3 {
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }
}

impl Mul<f64> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: f64) -> Self::Output {
        Vector3 {
            x: self.x * rhs,
            y: self.y * rhs,
            z: self.z * rhs,
        }
    }
}

impl Mul<Vector3> for f64 {
    type Output = Vector3;

    fn mul(self, rhs: Vector3) -> Self::Output {
        rhs * self
    }
}

impl Div<f64> for Vector3 {
    type Output = Vector3;

    fn div(self, rhs: f64) -> Self::Output {
        Vector3 {
            x: self.x / rhs,
            y: self.y / rhs,
            z: self.z / rhs,
        }
    }
}

impl Mul<Vector3> for Vector3 {
    type Output = Vector3;

    fn mul(self, rhs: Vector3) -> Self::Output {
        Vector3 {
            x: self.x * rhs.x,
            y: self.y * rhs.y,
            z: self.z * rhs.z,
        }
    }
}

/// Formats as `x y z`, the way coordinates appear in VMF values
impl Display for Vector3 {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", Number(self.x), Number(self.y), Number(self.z))
    }
}

/// Parses `x y z`; surrounding brackets or parentheses are tolerated
impl FromStr for Vector3 {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_start_matches(['[', '(']).trim_end_matches([']', ')']);
        let mut parts = trimmed.split_whitespace().map(str::parse::<f64>);
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(Ok(x)), Some(Ok(y)), Some(Ok(z)), None) => Ok(Vector3 { x, y, z }),
            _ => Err(()),
        }
    }
}

/// Float formatting for VMF output; Never prints `-0`
#[derive(Debug, Copy, Clone)]
pub struct Number(pub f64);

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0 + 0.0)
    }
}

/// Pitch, yaw and roll in degrees, as stored in an entity's `angles` key
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Angles {
    pub pitch: f64,
    pub yaw: f64,
    pub roll: f64,
}

impl Angles {
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Angles {
        Angles { pitch, yaw, roll }
    }
}

impl Add for Angles {
    type Output = Angles;

    fn add(self, rhs: Self) -> Self::Output {
        Angles {
            pitch: self.pitch + rhs.pitch,
            yaw: self.yaw + rhs.yaw,
            roll: self.roll + rhs.roll,
        }
    }
}

impl AddAssign for Angles {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs
    }
}

impl Display for Angles {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", Number(self.pitch), Number(self.yaw), Number(self.roll))
    }
}

impl FromStr for Angles {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let Vector3 { x, y, z } = s.parse()?;
        Ok(Angles { pitch: x, yaw: y, roll: z })
    }
}

/// Plane through three points; The outward normal follows Hammer's winding, `(c - a) x (b - a)`
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Plane {
    pub normal: Vector3,
    pub distance: f64,
}

impl Plane {
    pub fn from_points(points: [Vector3; 3]) -> Option<Plane> {
        let [a, b, c] = points;
        let normal = (c - a).cross(b - a);
        let length = normal.magnitude();
        if length <= f64::EPSILON || !length.is_finite() {
            return None;
        }
        let normal = normal / length;
        Some(Plane {
            normal,
            distance: normal.dot(a),
        })
    }

    /// Signed distance of a point from the plane; Positive is outside
    pub fn distance_to(&self, point: Vector3) -> f64 {
        self.normal.dot(point) - self.distance
    }

    /// Intersection point of three planes, if they meet in a single point
    pub fn intersect(a: &Plane, b: &Plane, c: &Plane) -> Option<Vector3> {
        let bc = b.normal.cross(c.normal);
        let denominator = a.normal.dot(bc);
        if denominator.abs() < 1e-9 {
            return None;
        }
        let point = (bc * a.distance + c.normal.cross(a.normal) * b.distance + a.normal.cross(b.normal) * c.distance) / denominator;
        if point.is_finite() { Some(point) } else { None }
    }
}

/// Axis aligned bounds
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BoundingBox {
    pub min: Vector3,
    pub max: Vector3,
}

impl BoundingBox {
    pub fn new(min: Vector3, max: Vector3) -> BoundingBox {
        BoundingBox { min, max }
    }

    /// Degenerate box around a single point
    pub fn around(point: Vector3) -> BoundingBox {
        BoundingBox { min: point, max: point }
    }

    pub fn include(mut self, point: Vector3) -> BoundingBox {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
        self
    }

    /// Folds points into bounds; `None` when there are no points
    pub fn from_points<I: IntoIterator<Item=Vector3>>(points: I) -> Option<BoundingBox> {
        let mut points = points.into_iter();
        let first = points.next()?;
        Some(points.fold(BoundingBox::around(first), BoundingBox::include))
    }

    pub fn size(&self) -> Vector3 {
        self.max - self.min
    }

    pub fn contains_strictly(&self, point: Vector3) -> bool {
        point.x > self.min.x && point.x < self.max.x
            && point.y > self.min.y && point.y < self.max.y
            && point.z > self.min.z && point.z < self.max.z
    }
}
