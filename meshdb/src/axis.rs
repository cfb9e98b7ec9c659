//! Axis-system and unit normalization.
//!
//! The interchange database stores geometry in one canonical frame: up = Y,
//! front = Z (parity odd), right-handed, meters. Loaded scenes are converted
//! into that frame before extraction; exported scenes are built in it and
//! then converted to whatever frame the database metadata asks for.

use glam::{DMat3, DMat4, DVec3};

use crate::Error;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Axis {
    X,
    #[default]
    Y,
    Z,
}

impl Axis {
    pub fn code(self) -> char {
        match self {
            Self::X => 'x',
            Self::Y => 'y',
            Self::Z => 'z',
        }
    }

    pub fn from_code(c: char, context: &str) -> Result<Self, Error> {
        match c.to_ascii_lowercase() {
            'x' => Ok(Self::X),
            'y' => Ok(Self::Y),
            'z' => Ok(Self::Z),
            _ => Err(Error::InvalidAxisCode {
                context: context.to_string(),
                value: c.to_string(),
            }),
        }
    }

    pub fn unit_vector(self) -> DVec3 {
        match self {
            Self::X => DVec3::X,
            Self::Y => DVec3::Y,
            Self::Z => DVec3::Z,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "json", serde(rename_all = "lowercase"))]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

impl Handedness {
    pub fn code(self) -> char {
        match self {
            Self::Right => 'r',
            Self::Left => 'l',
        }
    }

    pub fn from_code(c: char) -> Result<Self, Error> {
        match c.to_ascii_lowercase() {
            'r' => Ok(Self::Right),
            'l' => Ok(Self::Left),
            _ => Err(Error::InvalidAxisCode {
                context: "handedness".to_string(),
                value: c.to_string(),
            }),
        }
    }
}

/// Up axis, front axis and handedness of a scene frame.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "json", derive(serde::Serialize, serde::Deserialize))]
pub struct AxisSystem {
    pub up: Axis,
    pub front: Axis,
    pub handedness: Handedness,
}

impl Default for AxisSystem {
    fn default() -> Self {
        Self::CANONICAL
    }
}

impl AxisSystem {
    /// The database frame: Y up, Z front, right-handed.
    pub const CANONICAL: AxisSystem = AxisSystem {
        up: Axis::Y,
        front: Axis::Z,
        handedness: Handedness::Right,
    };

    pub fn new(up: Axis, front: Axis, handedness: Handedness) -> Result<Self, Error> {
        if up == front {
            return Err(Error::DegenerateAxisSystem {
                value: format!("up={} front={}", up.code(), front.code()),
            });
        }
        Ok(Self {
            up,
            front,
            handedness,
        })
    }

    pub fn from_codes(up: char, front: char, handedness: char) -> Result<Self, Error> {
        Self::new(
            Axis::from_code(up, "up axis")?,
            Axis::from_code(front, "front axis")?,
            Handedness::from_code(handedness)?,
        )
    }

    pub fn codes(self) -> (char, char, char) {
        (self.up.code(), self.front.code(), self.handedness.code())
    }

    /// Orthonormal right-handed basis with columns (side, up, front).
    ///
    /// The basis deliberately ignores the handedness flag: scene conversion
    /// only ever re-orients (see [`rotation_to`](Self::rotation_to)), it never
    /// mirrors. Handedness is carried as metadata and restored verbatim.
    pub fn basis(self) -> DMat3 {
        let up = self.up.unit_vector();
        let front = self.front.unit_vector();
        let side = up.cross(front);
        DMat3::from_cols(side, up, front)
    }

    /// Proper rotation taking this frame's axes onto `target`'s axes.
    pub fn rotation_to(self, target: AxisSystem) -> DMat4 {
        let r = target.basis() * self.basis().transpose();
        DMat4::from_mat3(r)
    }
}

/// Scale factor from a scene unit string to meters. `None` for units the
/// converter does not know; callers warn and fall back to 1.0.
pub fn unit_scale_to_meters(unit: &str) -> Option<f64> {
    match unit.trim().to_ascii_lowercase().as_str() {
        "m" | "meter" | "meters" | "metre" | "metres" => Some(1.0),
        "dm" | "decimeter" | "decimeters" => Some(0.1),
        "cm" | "centimeter" | "centimeters" => Some(0.01),
        "mm" | "millimeter" | "millimeters" => Some(0.001),
        "km" | "kilometer" | "kilometers" => Some(1000.0),
        "in" | "inch" | "inches" => Some(0.0254),
        "ft" | "foot" | "feet" => Some(0.3048),
        "yd" | "yard" | "yards" => Some(0.9144),
        "mi" | "mile" | "miles" => Some(1609.344),
        _ => None,
    }
}

/// The unit every converted scene ends up in.
pub const CANONICAL_UNIT: &str = "meter";
