//! Geometry for the arena.
//!
//! Positions and headings are stored as fixed-point numbers so that saved
//! state is bit-exact. Trigonometry is evaluated in `f64` and quantized back
//! to fixed point immediately, which keeps every tick reproducible from a
//! snapshot.
//!
//! Headings are compass degrees: 0 is north (+y), 90 is east (+x).

use std::fmt;

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for positions and headings.
pub type Fixed = I32F32;

/// Full circle in degrees.
pub const FULL_CIRCLE: f64 = 360.0;

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// so encoded state round-trips without loss.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bits.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bits.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Fixed::from_bits(i64::deserialize(deserializer)?))
    }
}

/// Round to one decimal, the precision used in every reported distance.
#[must_use]
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Normalize an angle into `[0, 360)`.
#[must_use]
pub fn normalize_heading(angle: f64) -> f64 {
    let a = angle.rem_euclid(FULL_CIRCLE);
    // rem_euclid can return exactly 360.0 for tiny negative inputs
    if a >= FULL_CIRCLE {
        0.0
    } else {
        a
    }
}

/// Normalize an angle into `(-180, 180]`.
#[must_use]
pub fn normalize_bearing(angle: f64) -> f64 {
    let a = normalize_heading(angle);
    if a > 180.0 {
        a - FULL_CIRCLE
    } else {
        a
    }
}

fn to_fixed(value: f64) -> Fixed {
    Fixed::saturating_from_num(value)
}

fn heading_fixed(angle: f64) -> Fixed {
    let h = to_fixed(normalize_heading(angle));
    // quantizing 359.99999999999 can land on 360
    if h >= Fixed::from_num(360) {
        Fixed::ZERO
    } else {
        h
    }
}

/// A position in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    /// East-west coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// North-south coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

impl Point {
    /// Origin of the arena.
    pub const ORIGIN: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Create a point from fixed-point coordinates.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a point from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Create a point from float coordinates, quantized to fixed point.
    #[must_use]
    pub fn from_f64(x: f64, y: f64) -> Self {
        Self::new(to_fixed(x), to_fixed(y))
    }

    /// Coordinates as floats.
    #[must_use]
    pub fn as_f64(self) -> (f64, f64) {
        (self.x.to_num(), self.y.to_num())
    }

    /// Point reached by travelling `distance` along compass `heading`.
    #[must_use]
    pub fn translate(self, heading: f64, distance: f64) -> Self {
        let (x, y) = self.as_f64();
        let rad = heading.to_radians();
        Self::from_f64(x + rad.sin() * distance, y + rad.cos() * distance)
    }

    /// Euclidean distance, rounded to one decimal.
    #[must_use]
    pub fn distance_to(self, other: Self) -> f64 {
        let (x1, y1) = self.as_f64();
        let (x2, y2) = other.as_f64();
        round1((x2 - x1).hypot(y2 - y1))
    }

    /// Absolute compass heading towards `other`, in `[0, 360)`, one decimal.
    #[must_use]
    pub fn heading_to(self, other: Self) -> f64 {
        let (x1, y1) = self.as_f64();
        let (x2, y2) = other.as_f64();
        normalize_heading(round1((x2 - x1).atan2(y2 - y1).to_degrees()))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x, y) = self.as_f64();
        write!(f, "({:.1}, {:.1})", x, y)
    }
}

/// Position, heading and speed of a moving object.
///
/// All operations return new vectors; the heading stays in `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vector {
    /// Current position.
    pub pos: Point,
    /// Compass heading in degrees.
    #[serde(with = "fixed_serde")]
    pub heading: Fixed,
    /// Distance travelled per tick. Negative means reversing.
    pub speed: i32,
}

impl Vector {
    /// Create a vector, normalizing the heading.
    #[must_use]
    pub fn new(pos: Point, heading: f64, speed: i32) -> Self {
        Self {
            pos,
            heading: heading_fixed(heading),
            speed,
        }
    }

    /// Heading as a float.
    #[must_use]
    pub fn heading_f64(&self) -> f64 {
        self.heading.to_num()
    }

    /// Advance one tick along the current heading.
    #[must_use]
    pub fn moved(self) -> Self {
        Self {
            pos: self.pos.translate(self.heading_f64(), f64::from(self.speed)),
            ..self
        }
    }

    /// Turn by `angle` degrees (positive is clockwise).
    #[must_use]
    pub fn turned(self, angle: f64) -> Self {
        Self::new(self.pos, self.heading_f64() + angle, self.speed)
    }

    /// Change speed by `delta_v`.
    #[must_use]
    pub fn accelerated(self, delta_v: i32) -> Self {
        Self {
            speed: self.speed.saturating_add(delta_v),
            ..self
        }
    }

    /// Same vector with a different speed.
    #[must_use]
    pub fn with_speed(self, speed: i32) -> Self {
        Self { speed, ..self }
    }

    /// Bearing of `target` relative to this vector's heading, in `(-180, 180]`.
    #[must_use]
    pub fn direction_to(&self, target: Point) -> f64 {
        round1(normalize_bearing(
            self.pos.heading_to(target) - self.heading_f64(),
        ))
    }
}

/// An inclusive angular range, measured clockwise from `start` to `end`.
///
/// An arc whose start is greater than its end passes through 0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    /// First angle of the arc.
    pub start: f64,
    /// Last angle of the arc.
    pub end: f64,
}

impl Arc {
    /// Create an arc, normalizing both ends into `[0, 360)`.
    ///
    /// A full 360 end stays at 360 so that `(0, 360)` covers the circle.
    #[must_use]
    pub fn new(start: f64, end: f64) -> Self {
        let end = if (end - FULL_CIRCLE).abs() < f64::EPSILON {
            FULL_CIRCLE
        } else {
            normalize_heading(end)
        };
        Self {
            start: normalize_heading(start),
            end,
        }
    }

    /// Arc centred on `direction` with total width `width`.
    #[must_use]
    pub fn centred(direction: f64, width: f64) -> Self {
        if width >= FULL_CIRCLE {
            return Self::new(0.0, FULL_CIRCLE);
        }
        Self::new(direction - width / 2.0, direction + width / 2.0)
    }

    /// Whether `angle` (any value, normalized here) lies on the arc.
    #[must_use]
    pub fn contains(&self, angle: f64) -> bool {
        let angle = normalize_heading(angle);
        if self.start > self.end {
            self.start <= angle || angle <= self.end
        } else {
            self.start <= angle && angle <= self.end
        }
    }
}

impl fmt::Display for Arc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.start, self.end)
    }
}
