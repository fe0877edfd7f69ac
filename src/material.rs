// Material presets

use serde::{Deserialize, Serialize};

/// Lighting coefficients of a material (RGBA per term).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub shininess: f32,
}

/// The ten fixed presets, in number-key order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MaterialType {
    #[default]
    White,
    PolishedBronze,
    PolishedCopper,
    PolishedGold,
    PolishedSilver,
    Pewter,
    Emerald,
    Ruby,
    Turquoise,
    BlackRubber,
}

impl MaterialType {
    pub const ALL: [MaterialType; 10] = [
        MaterialType::White,
        MaterialType::PolishedBronze,
        MaterialType::PolishedCopper,
        MaterialType::PolishedGold,
        MaterialType::PolishedSilver,
        MaterialType::Pewter,
        MaterialType::Emerald,
        MaterialType::Ruby,
        MaterialType::Turquoise,
        MaterialType::BlackRubber,
    ];

    /// Preset bound to a number key
    pub fn from_preset(digit: u8) -> Option<Self> {
        Self::ALL.get(usize::from(digit)).copied()
    }

    pub fn properties(self) -> Material {
        match self {
            MaterialType::White => Material {
                ambient: [0.3, 0.3, 0.3, 1.0],
                diffuse: [0.9, 0.9, 0.9, 1.0],
                specular: [0.2, 0.2, 0.2, 1.0],
                shininess: 10.0,
            },
            MaterialType::PolishedBronze => Material {
                ambient: [0.25, 0.148, 0.06475, 1.0],
                diffuse: [0.4, 0.2368, 0.1036, 1.0],
                specular: [0.774597, 0.458561, 0.200621, 1.0],
                shininess: 76.8,
            },
            MaterialType::PolishedCopper => Material {
                ambient: [0.2295, 0.08825, 0.0275, 1.0],
                diffuse: [0.5508, 0.2118, 0.066, 1.0],
                specular: [0.580594, 0.223257, 0.0695701, 1.0],
                shininess: 51.2,
            },
            MaterialType::PolishedGold => Material {
                ambient: [0.24725, 0.2245, 0.0645, 1.0],
                diffuse: [0.34615, 0.3143, 0.0903, 1.0],
                specular: [0.797357, 0.723991, 0.208006, 1.0],
                shininess: 83.2,
            },
            MaterialType::PolishedSilver => Material {
                ambient: [0.23125, 0.23125, 0.23125, 1.0],
                diffuse: [0.2775, 0.2775, 0.2775, 1.0],
                specular: [0.773911, 0.773911, 0.773911, 1.0],
                shininess: 89.6,
            },
            MaterialType::Pewter => Material {
                ambient: [0.105882, 0.058824, 0.113725, 1.0],
                diffuse: [0.427451, 0.470588, 0.541176, 1.0],
                specular: [0.333333, 0.333333, 0.521569, 1.0],
                shininess: 9.84615,
            },
            MaterialType::Emerald => Material {
                ambient: [0.0215, 0.1745, 0.0215, 0.55],
                diffuse: [0.07568, 0.61424, 0.07568, 0.55],
                specular: [0.633, 0.727811, 0.633, 0.55],
                shininess: 76.8,
            },
            MaterialType::Ruby => Material {
                ambient: [0.1745, 0.01175, 0.01175, 0.55],
                diffuse: [0.61424, 0.04136, 0.04136, 0.55],
                specular: [0.727811, 0.626959, 0.626959, 0.55],
                shininess: 76.8,
            },
            MaterialType::Turquoise => Material {
                ambient: [0.1, 0.18725, 0.1745, 0.8],
                diffuse: [0.396, 0.74151, 0.69102, 0.8],
                specular: [0.297254, 0.30829, 0.306678, 0.8],
                shininess: 12.8,
            },
            MaterialType::BlackRubber => Material {
                ambient: [0.02, 0.02, 0.02, 1.0],
                diffuse: [0.01, 0.01, 0.01, 1.0],
                specular: [0.4, 0.4, 0.4, 1.0],
                shininess: 10.0,
            },
        }
    }
}
