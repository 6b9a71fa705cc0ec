// Blendshape vocabulary and per-frame weight sets.
// The vocabulary is closed: five named channels, always present, defaulting to 0.

use serde::{Deserialize, Serialize};

/// One named facial control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Blendshape {
    JawOpen,
    MouthClose,
    MouthPucker,
    MouthSmile,
    MouthFunnel,
}

impl Blendshape {
    /// All channels, in deformation-rule order.
    pub const ALL: [Blendshape; 5] = [
        Blendshape::JawOpen,
        Blendshape::MouthClose,
        Blendshape::MouthPucker,
        Blendshape::MouthSmile,
        Blendshape::MouthFunnel,
    ];

    /// Wire name, as produced by the animation provider.
    pub fn name(self) -> &'static str {
        match self {
            Self::JawOpen => "jawOpen",
            Self::MouthClose => "mouthClose",
            Self::MouthPucker => "mouthPucker",
            Self::MouthSmile => "mouthSmile",
            Self::MouthFunnel => "mouthFunnel",
        }
    }

    /// Upper end of the documented range. The lower end is always 0.
    pub fn max_weight(self) -> f32 {
        match self {
            Self::JawOpen => 0.7,
            Self::MouthClose => 1.0,
            Self::MouthPucker => 0.7,
            Self::MouthSmile => 0.7,
            Self::MouthFunnel => 0.4,
        }
    }
}

/// Weights for every blendshape channel.
///
/// Field names serialize in camelCase (`jawOpen`, ...) to match the provider's
/// JSON. Missing fields deserialize as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BlendWeightSet {
    pub jaw_open: f32,
    pub mouth_close: f32,
    pub mouth_pucker: f32,
    pub mouth_smile: f32,
    pub mouth_funnel: f32,
}

impl BlendWeightSet {
    /// All channels at rest.
    pub const NEUTRAL: Self = Self {
        jaw_open: 0.0,
        mouth_close: 0.0,
        mouth_pucker: 0.0,
        mouth_smile: 0.0,
        mouth_funnel: 0.0,
    };

    pub const fn new(
        jaw_open: f32,
        mouth_close: f32,
        mouth_pucker: f32,
        mouth_smile: f32,
        mouth_funnel: f32,
    ) -> Self {
        Self { jaw_open, mouth_close, mouth_pucker, mouth_smile, mouth_funnel }
    }

    pub fn get(&self, shape: Blendshape) -> f32 {
        match shape {
            Blendshape::JawOpen => self.jaw_open,
            Blendshape::MouthClose => self.mouth_close,
            Blendshape::MouthPucker => self.mouth_pucker,
            Blendshape::MouthSmile => self.mouth_smile,
            Blendshape::MouthFunnel => self.mouth_funnel,
        }
    }

    pub fn set(&mut self, shape: Blendshape, value: f32) {
        match shape {
            Blendshape::JawOpen => self.jaw_open = value,
            Blendshape::MouthClose => self.mouth_close = value,
            Blendshape::MouthPucker => self.mouth_pucker = value,
            Blendshape::MouthSmile => self.mouth_smile = value,
            Blendshape::MouthFunnel => self.mouth_funnel = value,
        }
    }

    /// `(channel, weight)` pairs in rule order.
    pub fn channels(&self) -> [(Blendshape, f32); 5] {
        Blendshape::ALL.map(|shape| (shape, self.get(shape)))
    }

    /// Move every channel a fraction of the way toward `target`:
    /// `self += (target - self) * factor`.
    pub fn approach(&mut self, target: &BlendWeightSet, factor: f32) {
        for shape in Blendshape::ALL {
            let current = self.get(shape);
            self.set(shape, current + (target.get(shape) - current) * factor);
        }
    }

    /// Copy with each channel forced into `[0, max_weight]`. Non-finite values become 0.
    pub fn clamped(&self) -> Self {
        let mut out = *self;
        for shape in Blendshape::ALL {
            let value = self.get(shape);
            let value = if value.is_finite() { value.clamp(0.0, shape.max_weight()) } else { 0.0 };
            out.set(shape, value);
        }
        out
    }

    /// True if every channel already lies in its documented range.
    pub fn is_in_range(&self) -> bool {
        self.channels()
            .iter()
            .all(|&(shape, w)| (0.0..=shape.max_weight()).contains(&w))
    }

    /// Largest absolute per-channel difference.
    pub fn max_distance(&self, other: &BlendWeightSet) -> f32 {
        Blendshape::ALL
            .iter()
            .map(|&shape| (self.get(shape) - other.get(shape)).abs())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_zero() {
        let w: BlendWeightSet = serde_json::from_str(r#"{"jawOpen": 0.7}"#).unwrap();
        assert_eq!(w, BlendWeightSet { jaw_open: 0.7, ..BlendWeightSet::NEUTRAL });
    }

    #[test]
    fn serializes_camel_case_names() {
        let json = serde_json::to_value(BlendWeightSet::new(0.1, 0.2, 0.3, 0.4, 0.0)).unwrap();
        for shape in Blendshape::ALL {
            assert!(json.get(shape.name()).is_some(), "missing {}", shape.name());
        }
    }

    #[test]
    fn approach_moves_a_fifth_of_the_way() {
        let mut w = BlendWeightSet::NEUTRAL;
        let target = BlendWeightSet::new(0.5, 1.0, 0.0, 0.0, 0.0);
        w.approach(&target, 0.2);
        assert_eq!(w.jaw_open, 0.5 * 0.2);
        assert_eq!(w.mouth_close, 1.0 * 0.2);
        assert_eq!(w.mouth_pucker, 0.0);
    }

    #[test]
    fn clamped_respects_documented_ranges() {
        let w = BlendWeightSet::new(2.0, -1.0, f32::NAN, 0.3, 0.9).clamped();
        assert_eq!(w, BlendWeightSet::new(0.7, 0.0, 0.0, 0.3, 0.4));
        assert!(w.is_in_range());
        assert!(!BlendWeightSet::new(0.0, 0.0, 0.0, 0.0, 0.5).is_in_range());
    }
}
