use image::{RgbaImage, imageops};

use crate::config::VideoConfig;
use crate::encode::sink::FrameSource;
use crate::foundation::error::{AutopostError, AutopostResult};
use crate::foundation::math::lerp_u8;

/// Ken Burns timing parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct KenBurnsParams {
    /// Output frame rate.
    pub fps: u32,
    /// Hold time per source frame.
    pub seconds_per_image: f64,
    /// End zoom factor of each hold (start is `1.0`).
    pub zoom: f64,
    /// Crossfade duration between consecutive holds.
    pub crossfade_seconds: f64,
}

impl KenBurnsParams {
    /// Sub-frames emitted per source frame (at least one).
    pub fn hold_frames(&self) -> u32 {
        ((self.seconds_per_image * f64::from(self.fps)).floor() as u32).max(1)
    }

    /// Blended sub-frames between consecutive sources.
    pub fn fade_frames(&self) -> u32 {
        (self.crossfade_seconds * f64::from(self.fps)).floor().max(0.0) as u32
    }

    /// Zoom factor for hold sub-frame `t`.
    pub fn scale_at(&self, t: u32) -> f64 {
        let n = self.hold_frames();
        if n <= 1 {
            1.0
        } else {
            1.0 + (self.zoom - 1.0) * (f64::from(t) / f64::from(n - 1))
        }
    }
}

impl From<&VideoConfig> for KenBurnsParams {
    fn from(v: &VideoConfig) -> Self {
        Self {
            fps: v.fps,
            seconds_per_image: v.seconds_per_image,
            zoom: v.zoom,
            crossfade_seconds: v.crossfade_seconds,
        }
    }
}

/// Where one sub-frame comes from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SubFrame {
    /// Zoomed crop of source `source` at `scale`.
    Hold {
        /// Source frame index.
        source: usize,
        /// Zoom factor.
        scale: f64,
    },
    /// Blend of the last zoomed sub-frame of `from` into source `from + 1`.
    Fade {
        /// Outgoing source index.
        from: usize,
        /// Weight of the incoming source.
        alpha: f64,
    },
}

/// Flat, random-access Ken Burns sequence over rendered frames.
///
/// Sub-frames are produced on demand so a long sequence never sits in memory at once.
pub struct KenBurnsSequence<'a> {
    sources: &'a [RgbaImage],
    params: KenBurnsParams,
    plan: Vec<SubFrame>,
}

impl<'a> KenBurnsSequence<'a> {
    /// Build the plan; every source must share the first frame's size.
    pub fn new(sources: &'a [RgbaImage], params: KenBurnsParams) -> AutopostResult<Self> {
        let Some(first) = sources.first() else {
            return Err(AutopostError::InsufficientMedia {
                required: 1,
                got: 0,
            });
        };
        if params.fps == 0 {
            return Err(AutopostError::validation("bad_config", "fps must be non-zero"));
        }
        let dims = first.dimensions();
        if sources.iter().any(|s| s.dimensions() != dims) {
            return Err(AutopostError::validation(
                "bad_frames",
                "all frames must share one size",
            ));
        }

        let hold = params.hold_frames();
        let fade = params.fade_frames();
        let mut plan = Vec::with_capacity(sources.len() * (hold + fade) as usize);
        for source in 0..sources.len() {
            plan.extend((0..hold).map(|t| SubFrame::Hold {
                source,
                scale: params.scale_at(t),
            }));
            if source + 1 < sources.len() {
                // Alpha stays strictly inside (0, 1) so no blend repeats a neighbouring hold frame.
                plan.extend((0..fade).map(|k| SubFrame::Fade {
                    from: source,
                    alpha: f64::from(k + 1) / f64::from(fade + 1),
                }));
            }
        }
        Ok(Self {
            sources,
            params,
            plan,
        })
    }

    /// Total sub-frame count.
    pub fn len(&self) -> usize {
        self.plan.len()
    }

    /// `true` when the plan is empty.
    pub fn is_empty(&self) -> bool {
        self.plan.is_empty()
    }

    /// Output frame size.
    pub fn dimensions(&self) -> (u32, u32) {
        self.sources
            .first()
            .map(RgbaImage::dimensions)
            .unwrap_or((0, 0))
    }

    /// Frame rate the plan was built for.
    pub fn fps(&self) -> u32 {
        self.params.fps
    }

    /// Sub-frame descriptors in order.
    pub fn plan(&self) -> &[SubFrame] {
        &self.plan
    }

    /// Materialize sub-frame `idx`.
    pub fn frame(&self, idx: usize) -> Option<RgbaImage> {
        match *self.plan.get(idx)? {
            SubFrame::Hold { source, scale } => Some(zoom_center(&self.sources[source], scale)),
            SubFrame::Fade { from, alpha } => {
                let end = self.params.scale_at(self.params.hold_frames() - 1);
                let last = zoom_center(&self.sources[from], end);
                Some(blend(&last, &self.sources[from + 1], alpha))
            }
        }
    }

    /// Iterate sub-frames in order.
    pub fn iter(&self) -> impl Iterator<Item = RgbaImage> + '_ {
        (0..self.len()).filter_map(|i| self.frame(i))
    }
}

impl FrameSource for KenBurnsSequence<'_> {
    fn frame_count(&self) -> usize {
        self.len()
    }

    fn frame_size(&self) -> (u32, u32) {
        self.dimensions()
    }

    fn frame_at(&self, idx: usize) -> Option<RgbaImage> {
        self.frame(idx)
    }
}

/// Center-crop by `scale` and resize back to the source size.
pub fn zoom_center(src: &RgbaImage, scale: f64) -> RgbaImage {
    let (w, h) = src.dimensions();
    if scale <= 1.0 || w == 0 || h == 0 {
        return src.clone();
    }
    let cw = ((f64::from(w) / scale).floor() as u32).clamp(1, w);
    let ch = ((f64::from(h) / scale).floor() as u32).clamp(1, h);
    let x0 = (w - cw) / 2;
    let y0 = (h - ch) / 2;
    let crop = imageops::crop_imm(src, x0, y0, cw, ch).to_image();
    imageops::resize(&crop, w, h, imageops::FilterType::Triangle)
}

/// Linear blend `a*(1-alpha) + b*alpha`; sizes must match.
pub fn blend(a: &RgbaImage, b: &RgbaImage, alpha: f64) -> RgbaImage {
    let t = alpha.clamp(0.0, 1.0) as f32;
    let (w, h) = a.dimensions();
    let mut out = RgbaImage::new(w, h);
    for (o, (pa, pb)) in out
        .chunks_exact_mut(4)
        .zip(a.as_raw().chunks_exact(4).zip(b.as_raw().chunks_exact(4)))
    {
        for c in 0..4 {
            o[c] = lerp_u8(pa[c], pb[c], t);
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/assemble/kenburns.rs"]
mod tests;
