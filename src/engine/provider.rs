// Animation providers: turn a text or audio request into an AnimationTrack.
//
// RuleBasedProvider is a small local stand-in for a speech-analysis backend:
//   text  → letter rules → phonemes (80 ms each, 100 ms silence after each word)
//   audio → per-window RMS energy → one of four mouth openings
// Both sample the phoneme timeline at the requested fps.

use log::debug;

use super::track::{AnimationFrame, AnimationTrack};
use super::viseme::Phoneme;
use crate::error::{FaceError, Result};

/// Duration of one spoken phoneme, in seconds.
const PHONEME_SECS: f64 = 0.08;
/// Silence inserted after every word, in seconds.
const WORD_GAP_SECS: f64 = 0.1;
/// Audio analysis window, in seconds.
const AUDIO_WINDOW_SECS: f64 = 0.03;
/// RMS level audio is normalised to before analysis.
const AUDIO_TARGET_RMS: f32 = 0.3;

/// Input to a provider.
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationRequest {
    Text {
        text: String,
        fps: u32,
    },
    /// Mono 16-bit little-endian PCM.
    Audio {
        pcm: Vec<u8>,
        sample_rate: u32,
        fps: u32,
    },
}

impl AnimationRequest {
    pub fn text(text: impl Into<String>, fps: u32) -> Self {
        Self::Text { text: text.into(), fps }
    }

    pub fn fps(&self) -> u32 {
        match self {
            Self::Text { fps, .. } | Self::Audio { fps, .. } => *fps,
        }
    }
}

/// Anything that can answer an [`AnimationRequest`] with a whole track.
pub trait AnimationProvider {
    fn animate(&self, request: &AnimationRequest) -> Result<AnimationTrack>;
}

/// Deterministic letter- and energy-rule provider.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedProvider;

impl AnimationProvider for RuleBasedProvider {
    fn animate(&self, request: &AnimationRequest) -> Result<AnimationTrack> {
        match request {
            AnimationRequest::Text { text, fps } => animate_text(text, *fps),
            AnimationRequest::Audio { pcm, sample_rate, fps } => {
                animate_audio(pcm, *sample_rate, *fps)
            }
        }
    }
}

// ============================================================================
// TEXT
// ============================================================================

/// A phoneme with its start time and duration, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedPhoneme {
    pub phoneme: Phoneme,
    pub start: f64,
    pub duration: f64,
}

impl TimedPhoneme {
    fn covers(&self, t: f64) -> bool {
        self.start <= t && t < self.start + self.duration
    }
}

/// Letter rules for one word: TH/SH/CH digraphs first, then single letters.
/// Characters without a rule are skipped.
pub fn word_to_phonemes(word: &str) -> Vec<Phoneme> {
    let letters: Vec<char> = word.to_uppercase().chars().collect();
    let mut phonemes = Vec::new();
    let mut i = 0;

    while i < letters.len() {
        if i + 1 < letters.len() {
            let digraph = match (letters[i], letters[i + 1]) {
                ('T', 'H') => Some(Phoneme::Th),
                ('S', 'H') => Some(Phoneme::Sh),
                ('C', 'H') => Some(Phoneme::Ch),
                _ => None,
            };
            if let Some(p) = digraph {
                phonemes.push(p);
                i += 2;
                continue;
            }
        }

        let single = match letters[i] {
            'A' => Some(Phoneme::Ae),
            'E' => Some(Phoneme::Eh),
            'I' => Some(Phoneme::Ih),
            'O' => Some(Phoneme::Ao),
            'U' => Some(Phoneme::Ah),
            c if "BPMFVSZTDNLRKGWY".contains(c) => Phoneme::from_label(&c.to_string()),
            _ => None,
        };
        phonemes.extend(single);
        i += 1;
    }

    phonemes
}

/// Timeline for a whole sentence. Every word is followed by a silence gap.
pub fn text_to_phonemes(text: &str) -> Vec<TimedPhoneme> {
    let mut timeline = Vec::new();
    let mut t = 0.0;

    for word in text.split_whitespace() {
        for phoneme in word_to_phonemes(word) {
            timeline.push(TimedPhoneme { phoneme, start: t, duration: PHONEME_SECS });
            t += PHONEME_SECS;
        }
        timeline.push(TimedPhoneme { phoneme: Phoneme::Sil, start: t, duration: WORD_GAP_SECS });
        t += WORD_GAP_SECS;
    }

    timeline
}

/// Sample a phoneme timeline at `fps`. Gaps sample as silence.
pub fn sample_timeline(timeline: &[TimedPhoneme], fps: u32) -> Result<AnimationTrack> {
    if fps == 0 {
        return Err(FaceError::InvalidFps(fps));
    }
    let total = timeline.last().map_or(0.0, |p| p.start + p.duration);
    let frame_secs = 1.0 / f64::from(fps);
    let num_frames = (total / frame_secs) as usize + 1;

    let frames: Vec<AnimationFrame> = (0..num_frames)
        .map(|index| {
            let time = index as f64 * frame_secs;
            let phoneme = timeline
                .iter()
                .find(|p| p.covers(time))
                .map_or(Phoneme::Sil, |p| p.phoneme);
            AnimationFrame {
                index,
                time,
                phoneme: Some(phoneme),
                energy: None,
                blendshapes: phoneme.viseme(),
            }
        })
        .collect();

    let duration = frames.last().map_or(0.0, |f| f.time);
    AnimationTrack::new(frames, fps, duration)
}

pub fn animate_text(text: &str, fps: u32) -> Result<AnimationTrack> {
    let timeline = text_to_phonemes(text);
    debug!("Text request: {} phonemes", timeline.len());
    sample_timeline(&timeline, fps)
}

// ============================================================================
// AUDIO
// ============================================================================

/// Decode mono PCM16 LE bytes into samples in [-1, 1).
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>> {
    if bytes.len() % 2 != 0 {
        return Err(FaceError::Audio(format!("odd PCM16 byte count: {}", bytes.len())));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|b| f32::from(i16::from_le_bytes([b[0], b[1]])) / 32768.0)
        .collect())
}

pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f32>() / samples.len() as f32).sqrt()
}

/// Scale to `target` RMS and clip to [-1, 1]. Silence is returned unchanged.
pub fn normalize(samples: &mut [f32], target: f32) {
    let current = rms(samples);
    if current > 0.0 {
        let gain = target / current;
        for s in samples.iter_mut() {
            *s = (*s * gain).clamp(-1.0, 1.0);
        }
    }
}

/// Mouth opening for one window's RMS energy.
pub fn phoneme_for_energy(energy: f32) -> Phoneme {
    if energy < 0.01 {
        Phoneme::Sil
    } else if energy < 0.05 {
        Phoneme::M
    } else if energy < 0.15 {
        Phoneme::Eh
    } else {
        Phoneme::Aa
    }
}

pub fn animate_audio(pcm: &[u8], sample_rate: u32, fps: u32) -> Result<AnimationTrack> {
    if fps == 0 {
        return Err(FaceError::InvalidFps(fps));
    }
    if sample_rate == 0 {
        return Err(FaceError::Audio("sample rate must be positive".into()));
    }
    let mut samples = decode_pcm16(pcm)?;
    if samples.is_empty() {
        return Err(FaceError::Audio("empty audio data".into()));
    }
    normalize(&mut samples, AUDIO_TARGET_RMS);

    let window = ((f64::from(sample_rate) * AUDIO_WINDOW_SECS) as usize).max(1);
    let hop = ((sample_rate / fps) as usize).max(1);
    let num_frames = if samples.len() > window { (samples.len() - window) / hop } else { 0 };
    debug!(
        "Audio request: {} samples @ {sample_rate} Hz, window {window}, hop {hop}, {num_frames} frames",
        samples.len()
    );

    let frames: Vec<AnimationFrame> = (0..num_frames)
        .map(|index| {
            let start = index * hop;
            let energy = rms(&samples[start..start + window]);
            let phoneme = phoneme_for_energy(energy);
            AnimationFrame {
                index,
                time: start as f64 / f64::from(sample_rate),
                phoneme: Some(phoneme),
                energy: Some(energy),
                blendshapes: phoneme.viseme(),
            }
        })
        .collect();

    let duration = frames.last().map_or(0.0, |f| f.time);
    AnimationTrack::new(frames, fps, duration)
}
