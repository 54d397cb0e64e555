//! Time-windowed fade envelopes and their curve shapes.
//!
//! A fade is described by four positions on the absolute sample timeline:
//!
//! ```text
//! <----------|----------|---------->
//! pre      start       end       post
//! ```
//!
//! `vol_start` holds in `[pre, start)`, the curve runs in `[start, end)` and
//! `vol_end` holds in `[end, post)`. An unbounded `pre` reaches back to the
//! start of the stream and an unbounded `post` reaches its end.

use std::f32::consts::PI;
use std::fmt;

use serde::de::{Error as DeError, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

/// Attenuation factor of the exponential curves: 2.5 * ln(10), about -50dB.
const EXP_ATTENUATION: f32 = 5.756_462_7;

/// Curve used between the start and end of a fade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeShape {
    /// Closer to the natural decay of sound, for fade-outs.
    Exponential,
    /// Inverse of exponential.
    Logarithmic,
    /// Raised cosine, for musical crossfades.
    RaisedCosine,
    /// Quarter of a sine wave, for musical fades.
    QuarterSine,
    Parabolic,
    InverseParabolic,
    /// Linear.
    #[default]
    Triangular,
}

impl FadeShape {
    /// Map a single-letter shape tag to a shape.
    ///
    /// `{`/`}` are aliases for exponential and `(`/`)` for raised cosine.
    /// Unknown tags fall back to triangular.
    pub fn from_tag(tag: char) -> Self {
        match tag {
            'E' | '{' | '}' => FadeShape::Exponential,
            'L' => FadeShape::Logarithmic,
            'H' | '(' | ')' => FadeShape::RaisedCosine,
            'Q' => FadeShape::QuarterSine,
            'p' => FadeShape::Parabolic,
            'P' => FadeShape::InverseParabolic,
            _ => FadeShape::Triangular,
        }
    }

    /// Single-letter tag for this shape.
    pub fn tag(self) -> char {
        match self {
            FadeShape::Exponential => 'E',
            FadeShape::Logarithmic => 'L',
            FadeShape::RaisedCosine => 'H',
            FadeShape::QuarterSine => 'Q',
            FadeShape::Parabolic => 'p',
            FadeShape::InverseParabolic => 'P',
            FadeShape::Triangular => 'T',
        }
    }

    /// Parse a shape from its snake_case name or its tag.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "exponential" => FadeShape::Exponential,
            "logarithmic" => FadeShape::Logarithmic,
            "raised_cosine" => FadeShape::RaisedCosine,
            "quarter_sine" => FadeShape::QuarterSine,
            "parabolic" => FadeShape::Parabolic,
            "inverse_parabolic" => FadeShape::InverseParabolic,
            "triangular" | "linear" => FadeShape::Triangular,
            // tags are case sensitive ('p' vs 'P'), so match the raw input
            _ => {
                let mut chars = name.trim().chars();
                match (chars.next(), chars.next()) {
                    (Some(tag), None) => FadeShape::from_tag(tag),
                    _ => FadeShape::Triangular,
                }
            }
        }
    }

    /// Map a linear fade index in `0.0..=1.0` through the curve.
    pub fn apply(self, index: f32) -> f32 {
        match self {
            FadeShape::Exponential => (-EXP_ATTENUATION * (1.0 - index)).exp(),
            FadeShape::Logarithmic => 1.0 - (-EXP_ATTENUATION * index).exp(),
            FadeShape::RaisedCosine => (1.0 - (index * PI).cos()) / 2.0,
            FadeShape::QuarterSine => (index * PI / 2.0).sin(),
            FadeShape::Parabolic => 1.0 - (1.0 - index).sqrt(),
            FadeShape::InverseParabolic => 1.0 - (1.0 - index) * (1.0 - index),
            FadeShape::Triangular => index,
        }
    }
}

impl<'de> Deserialize<'de> for FadeShape {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ShapeVisitor;

        impl<'de> Visitor<'de> for ShapeVisitor {
            type Value = FadeShape;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a fade shape name or tag like \"H\"")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: DeError,
            {
                Ok(FadeShape::from_name(value))
            }

            fn visit_char<E>(self, value: char) -> Result<Self::Value, E>
            where
                E: DeError,
            {
                Ok(FadeShape::from_tag(value))
            }
        }

        deserializer.deserialize_str(ShapeVisitor)
    }
}

/// Gain envelope over an absolute sample window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FadeEnvelope {
    pub vol_start: f32,
    pub vol_end: f32,
    pub shape: FadeShape,
    /// `None` reaches back to the start of the stream.
    pub pre: Option<i64>,
    pub start: i64,
    pub end: i64,
    /// `None` reaches forward to the end of the stream.
    pub post: Option<i64>,
}

impl FadeEnvelope {
    /// Check `pre <= start <= end <= post` with non-negative positions.
    pub fn is_valid(&self) -> bool {
        if self.start < 0 || self.end < 0 || self.start > self.end {
            return false;
        }
        if let Some(pre) = self.pre {
            if pre < 0 || pre > self.start {
                return false;
            }
        }
        if let Some(post) = self.post {
            if post < 0 || self.end > post {
                return false;
            }
        }
        true
    }

    /// Return `true` when the envelope window `[pre, post)` intersects
    /// `[from, to)`.
    pub fn overlaps(&self, from: i64, to: i64) -> bool {
        let fade_start = self.pre.unwrap_or(i64::MIN);
        let fade_end = self.post.unwrap_or(i64::MAX);
        from < fade_end && to > fade_start
    }

    /// Gain at an absolute sample position, or `None` when the position lies
    /// outside the envelope window.
    ///
    /// A position before a bounded `pre` is `None` even when `post` is
    /// unbounded, and likewise past a bounded `post` with `pre` unbounded.
    pub fn gain_at(&self, position: i64) -> Option<f32> {
        let after_pre = self.pre.map_or(true, |pre| position >= pre);
        let before_post = self.post.map_or(true, |post| position < post);

        if after_pre && position < self.start {
            return Some(self.vol_start);
        }
        if position >= self.end && before_post {
            return Some(self.vol_end);
        }
        if position < self.start || position >= self.end {
            return None;
        }

        let range_vol = self.vol_end - self.vol_start;
        let range_dur = (self.end - self.start) as f32;
        let fade_in = self.vol_start < self.vol_end;

        // both directions use the 'normal' curve orientation, so fade-outs
        // walk the index backwards and subtract from vol_end
        let range_idx = if fade_in {
            position - self.start
        } else {
            self.end - position
        };
        let gain = self.shape.apply(range_idx as f32 / range_dur);

        if fade_in {
            Some(self.vol_start + range_vol * gain)
        } else {
            Some(self.vol_end - range_vol * gain)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_SHAPES: [FadeShape; 7] = [
        FadeShape::Exponential,
        FadeShape::Logarithmic,
        FadeShape::RaisedCosine,
        FadeShape::QuarterSine,
        FadeShape::Parabolic,
        FadeShape::InverseParabolic,
        FadeShape::Triangular,
    ];

    fn fade(vol_start: f32, vol_end: f32, pre: Option<i64>, post: Option<i64>) -> FadeEnvelope {
        FadeEnvelope {
            vol_start,
            vol_end,
            shape: FadeShape::Triangular,
            pre,
            start: 1000,
            end: 2000,
            post,
        }
    }

    #[test]
    fn shapes_hit_boundaries() {
        // exponential curves stop at -50dB instead of reaching silence
        let floor = (-EXP_ATTENUATION).exp();
        for shape in ALL_SHAPES {
            let low = shape.apply(0.0);
            let high = shape.apply(1.0);
            match shape {
                FadeShape::Exponential => {
                    assert!((low - floor).abs() < 1e-6);
                    assert_eq!(high, 1.0);
                }
                FadeShape::Logarithmic => {
                    assert_eq!(low, 0.0);
                    assert!((high - (1.0 - floor)).abs() < 1e-6);
                }
                _ => {
                    assert!(low.abs() < 1e-6, "{:?} at 0 = {}", shape, low);
                    assert!((high - 1.0).abs() < 1e-6, "{:?} at 1 = {}", shape, high);
                }
            }
        }
    }

    #[test]
    fn shapes_are_monotonic() {
        for shape in ALL_SHAPES {
            let mut last = shape.apply(0.0);
            for step in 1..=100 {
                let value = shape.apply(step as f32 / 100.0);
                assert!(value >= last - 1e-6, "{:?} not monotonic", shape);
                last = value;
            }
        }
    }

    #[test]
    fn tag_aliases() {
        assert_eq!(FadeShape::from_tag('{'), FadeShape::Exponential);
        assert_eq!(FadeShape::from_tag('}'), FadeShape::Exponential);
        assert_eq!(FadeShape::from_tag('('), FadeShape::RaisedCosine);
        assert_eq!(FadeShape::from_tag(')'), FadeShape::RaisedCosine);
        assert_eq!(FadeShape::from_tag('x'), FadeShape::Triangular);
        assert_eq!(FadeShape::from_name("p"), FadeShape::Parabolic);
        assert_eq!(FadeShape::from_name("P"), FadeShape::InverseParabolic);
        assert_eq!(FadeShape::from_name("quarter_sine"), FadeShape::QuarterSine);
        for shape in ALL_SHAPES {
            assert_eq!(FadeShape::from_tag(shape.tag()), shape);
        }
    }

    #[test]
    fn fade_out_midpoint_is_half() {
        let envelope = fade(1.0, 0.0, Some(1000), None);
        assert_eq!(envelope.gain_at(1500), Some(0.5));
        assert_eq!(envelope.gain_at(1000), Some(1.0));
        assert_eq!(envelope.gain_at(2000), Some(0.0));
        assert_eq!(envelope.gain_at(50_000), Some(0.0));
    }

    #[test]
    fn fade_in_midpoint_is_half() {
        let envelope = fade(0.0, 1.0, None, Some(2000));
        assert_eq!(envelope.gain_at(0), Some(0.0));
        assert_eq!(envelope.gain_at(1500), Some(0.5));
        assert_eq!(envelope.gain_at(2000), None);
    }

    #[test]
    fn outside_bounded_window_is_none() {
        let envelope = fade(1.0, 0.0, Some(500), Some(2500));
        assert_eq!(envelope.gain_at(499), None);
        assert_eq!(envelope.gain_at(500), Some(1.0));
        assert_eq!(envelope.gain_at(2499), Some(0.0));
        assert_eq!(envelope.gain_at(2500), None);
    }

    #[test]
    fn half_bounded_window_is_none_past_its_bound() {
        let fade_out = fade(1.0, 0.0, Some(500), None);
        assert_eq!(fade_out.gain_at(499), None);
        assert_eq!(fade_out.gain_at(1_000_000), Some(0.0));

        let fade_in = fade(0.0, 1.0, None, Some(2500));
        assert_eq!(fade_in.gain_at(-1_000), Some(0.0));
        assert_eq!(fade_in.gain_at(2500), None);
    }

    #[test]
    fn window_validation() {
        assert!(fade(1.0, 0.0, None, None).is_valid());
        assert!(!fade(1.0, 0.0, Some(1200), None).is_valid());
        assert!(!fade(1.0, 0.0, None, Some(1500)).is_valid());
        let mut reversed = fade(1.0, 0.0, None, None);
        reversed.end = 500;
        assert!(!reversed.is_valid());
    }

    #[test]
    fn overlap_check_uses_pre_and_post() {
        let envelope = fade(1.0, 0.0, Some(1000), Some(3000));
        assert!(!envelope.overlaps(0, 1000));
        assert!(envelope.overlaps(0, 1001));
        assert!(envelope.overlaps(2999, 4000));
        assert!(!envelope.overlaps(3000, 4000));
        assert!(fade(1.0, 0.0, None, None).overlaps(i64::MAX - 10, i64::MAX));
    }

    #[test]
    fn shape_deserializes_from_name_or_tag() {
        let shapes: Vec<FadeShape> =
            serde_json::from_str(r#"["raised_cosine", "E", "(", "bogus"]"#).expect("shapes");
        assert_eq!(
            shapes,
            vec![
                FadeShape::RaisedCosine,
                FadeShape::Exponential,
                FadeShape::RaisedCosine,
                FadeShape::Triangular,
            ]
        );
    }
}
