// Phoneme inventory and the phoneme → viseme table.
// Weights follow the common ARKit-style mouth blendshapes.

use log::debug;
use serde::{Deserialize, Serialize};

use super::blendshape::BlendWeightSet;

/// Phoneme labels understood by the rule-based provider.
///
/// Serializes as the upper-case label (`"sil"` for silence). Deserializing goes
/// through [`Phoneme::from_label`], so any casing is accepted and labels outside
/// the inventory read as silence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum Phoneme {
    #[serde(rename = "sil")]
    Sil,
    // Vowels
    Aa,
    Ae,
    Ah,
    Ao,
    Eh,
    Er,
    Ih,
    Iy,
    Uh,
    Uw,
    // Consonants
    B,
    P,
    M,
    F,
    V,
    Th,
    S,
    Z,
    Sh,
    Ch,
    T,
    D,
    N,
    L,
    R,
    K,
    G,
    W,
    Y,
}

impl Phoneme {
    /// Parse a label such as `"AA"` or `"sil"`. Case-insensitive.
    pub fn from_label(label: &str) -> Option<Self> {
        let phoneme = match label.to_ascii_uppercase().as_str() {
            "SIL" => Self::Sil,
            "AA" => Self::Aa,
            "AE" => Self::Ae,
            "AH" => Self::Ah,
            "AO" => Self::Ao,
            "EH" => Self::Eh,
            "ER" => Self::Er,
            "IH" => Self::Ih,
            "IY" => Self::Iy,
            "UH" => Self::Uh,
            "UW" => Self::Uw,
            "B" => Self::B,
            "P" => Self::P,
            "M" => Self::M,
            "F" => Self::F,
            "V" => Self::V,
            "TH" => Self::Th,
            "S" => Self::S,
            "Z" => Self::Z,
            "SH" => Self::Sh,
            "CH" => Self::Ch,
            "T" => Self::T,
            "D" => Self::D,
            "N" => Self::N,
            "L" => Self::L,
            "R" => Self::R,
            "K" => Self::K,
            "G" => Self::G,
            "W" => Self::W,
            "Y" => Self::Y,
            _ => return None,
        };
        Some(phoneme)
    }

    /// Target mouth pose for this phoneme.
    pub fn viseme(self) -> BlendWeightSet {
        //                                 jaw  close pucker smile funnel
        let v = BlendWeightSet::new;
        match self {
            Self::Sil => v(0.0, 1.0, 0.0, 0.0, 0.0),
            Self::Aa => v(0.7, 0.0, 0.0, 0.0, 0.0),
            Self::Ae => v(0.5, 0.0, 0.0, 0.4, 0.0),
            Self::Ah => v(0.4, 0.0, 0.0, 0.0, 0.0),
            Self::Ao => v(0.6, 0.0, 0.3, 0.0, 0.2),
            Self::Eh => v(0.4, 0.0, 0.0, 0.3, 0.0),
            Self::Er => v(0.3, 0.0, 0.2, 0.0, 0.0),
            Self::Ih => v(0.3, 0.0, 0.0, 0.5, 0.0),
            Self::Iy => v(0.2, 0.0, 0.0, 0.7, 0.0),
            Self::Uh => v(0.3, 0.0, 0.3, 0.0, 0.0),
            Self::Uw => v(0.3, 0.0, 0.7, 0.0, 0.4),
            Self::B | Self::P | Self::M => v(0.0, 1.0, 0.0, 0.0, 0.0),
            Self::F | Self::V | Self::Th => v(0.2, 0.0, 0.0, 0.0, 0.0),
            Self::S | Self::Z => v(0.1, 0.0, 0.0, 0.3, 0.0),
            Self::Sh | Self::Ch => v(0.2, 0.0, 0.4, 0.0, 0.3),
            Self::T | Self::D | Self::N => v(0.2, 0.0, 0.0, 0.0, 0.0),
            Self::L => v(0.3, 0.0, 0.0, 0.2, 0.0),
            Self::R => v(0.3, 0.0, 0.3, 0.0, 0.0),
            Self::K | Self::G => v(0.4, 0.0, 0.0, 0.0, 0.0),
            Self::W => v(0.3, 0.0, 0.6, 0.0, 0.4),
            Self::Y => v(0.3, 0.0, 0.0, 0.5, 0.0),
        }
    }
}

impl From<String> for Phoneme {
    fn from(label: String) -> Self {
        Self::from_label(&label).unwrap_or_else(|| {
            debug!("Unknown phoneme {label:?}, using sil");
            Self::Sil
        })
    }
}
