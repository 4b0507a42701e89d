use crate::entity::Point;
use std::fmt;

/// Distance unit understood by geo queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceUnit {
    #[default]
    Meters,
    Kilometers,
    Miles,
    Feet,
}

impl DistanceUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceUnit::Meters => "m",
            DistanceUnit::Kilometers => "km",
            DistanceUnit::Miles => "mi",
            DistanceUnit::Feet => "ft",
        }
    }
}

/// Search area for `in_radius`: an origin and a radius.
///
/// Defaults to a one meter circle around `0,0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    origin: Point,
    radius: f64,
    unit: DistanceUnit,
}

impl Default for Circle {
    fn default() -> Self {
        Circle {
            origin: Point::new(0.0, 0.0),
            radius: 1.0,
            unit: DistanceUnit::Meters,
        }
    }
}

impl Circle {
    pub fn new() -> Self {
        Circle::default()
    }

    pub fn origin(mut self, longitude: f64, latitude: f64) -> Self {
        self.origin = Point::new(longitude, latitude);
        self
    }

    pub fn radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn unit(mut self, unit: DistanceUnit) -> Self {
        self.unit = unit;
        self
    }

    pub fn meters(self) -> Self {
        self.unit(DistanceUnit::Meters)
    }

    pub fn kilometers(self) -> Self {
        self.unit(DistanceUnit::Kilometers)
    }

    pub fn miles(self) -> Self {
        self.unit(DistanceUnit::Miles)
    }

    pub fn feet(self) -> Self {
        self.unit(DistanceUnit::Feet)
    }

    pub fn center(&self) -> Point {
        self.origin
    }

    pub fn distance(&self) -> f64 {
        self.radius
    }

    pub fn distance_unit(&self) -> DistanceUnit {
        self.unit
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.origin.is_finite() && self.radius.is_finite() && self.radius >= 0.0
    }
}

impl fmt::Display for Circle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} {} {} {}]",
            self.origin.longitude,
            self.origin.latitude,
            self.radius,
            self.unit.as_str()
        )
    }
}
