//! Core identifier and geometry types shared by the catalog, the projector
//! and the marker surface.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declares an opaque string token type.
macro_rules! opaque_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

opaque_id!(
    /// Unique identifier of a waystone record
    RecordId
);

opaque_id!(
    /// Identifier of the world (spatial partition) a record lives in
    RegionId
);

opaque_id!(
    /// Identifier of the player owning a record
    OwnerId
);

opaque_id!(
    /// Opaque handle to one region of the marker surface
    SurfaceHandle
);

opaque_id!(
    /// Key of a marker inside a region's layer
    MarkerKey
);

/// Block position of a waystone
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}, {}", self.x, self.y, self.z)
    }
}

/// Point on the 2D map plane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: f64,
    pub z: f64,
}

impl From<Position> for MapPoint {
    /// Height is not part of map placement.
    fn from(pos: Position) -> Self {
        Self {
            x: f64::from(pos.x),
            z: f64::from(pos.z),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = RegionId::new("world_nether");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"world_nether\"");
        assert_eq!(id.to_string(), "world_nether");
        assert_eq!(RecordId::from("a"), RecordId::new(String::from("a")));
    }

    #[test]
    fn test_map_point_drops_height() {
        let point = MapPoint::from(Position::new(10, 64, -20));
        assert_eq!(point, MapPoint { x: 10.0, z: -20.0 });
        assert_eq!(Position::new(10, 64, -20).to_string(), "10, 64, -20");
    }
}
