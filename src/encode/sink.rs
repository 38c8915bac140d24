use image::RgbaImage;

use crate::foundation::error::{AutopostError, AutopostResult};

/// Configuration provided to a [`FrameSink`] before the first frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkConfig {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Frames per second.
    pub fps: u32,
}

/// Random-access, ordered frame provider.
pub trait FrameSource {
    /// Number of frames.
    fn frame_count(&self) -> usize;
    /// Size shared by every frame.
    fn frame_size(&self) -> (u32, u32);
    /// Produce frame `idx`, or `None` past the end.
    fn frame_at(&self, idx: usize) -> Option<RgbaImage>;
}

impl FrameSource for [RgbaImage] {
    fn frame_count(&self) -> usize {
        self.len()
    }

    fn frame_size(&self) -> (u32, u32) {
        self.first().map(RgbaImage::dimensions).unwrap_or((0, 0))
    }

    fn frame_at(&self, idx: usize) -> Option<RgbaImage> {
        self.get(idx).cloned()
    }
}

impl FrameSource for Vec<RgbaImage> {
    fn frame_count(&self) -> usize {
        self.as_slice().frame_count()
    }

    fn frame_size(&self) -> (u32, u32) {
        self.as_slice().frame_size()
    }

    fn frame_at(&self, idx: usize) -> Option<RgbaImage> {
        self.as_slice().frame_at(idx)
    }
}

/// Consumes frames in order.
///
/// `push_frame` is called with strictly increasing indices between one `begin` and one `end`.
pub trait FrameSink {
    /// Called once before any frames are pushed.
    fn begin(&mut self, cfg: SinkConfig) -> AutopostResult<()>;
    /// Push one frame.
    fn push_frame(&mut self, idx: u64, frame: &RgbaImage) -> AutopostResult<()>;
    /// Called once after the last frame.
    fn end(&mut self) -> AutopostResult<()>;
}

/// Stream every frame of `source` through `sink`.
pub fn drain_into(
    source: &dyn FrameSource,
    fps: u32,
    sink: &mut dyn FrameSink,
) -> AutopostResult<u64> {
    let (width, height) = source.frame_size();
    sink.begin(SinkConfig { width, height, fps })?;
    let mut pushed = 0u64;
    for idx in 0..source.frame_count() {
        let frame = source
            .frame_at(idx)
            .ok_or_else(|| AutopostError::encode(format!("frame {idx} unavailable")))?;
        sink.push_frame(pushed, &frame)?;
        pushed += 1;
    }
    sink.end()?;
    Ok(pushed)
}

/// In-memory sink for tests.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    frames: Vec<(u64, RgbaImage)>,
    ended: bool,
}

impl InMemorySink {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration captured in `begin`.
    pub fn config(&self) -> Option<SinkConfig> {
        self.cfg
    }

    /// Captured frames in push order.
    pub fn frames(&self) -> &[(u64, RgbaImage)] {
        &self.frames
    }

    /// `end` was called.
    pub fn ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> AutopostResult<()> {
        self.cfg = Some(cfg);
        self.frames.clear();
        self.ended = false;
        Ok(())
    }

    fn push_frame(&mut self, idx: u64, frame: &RgbaImage) -> AutopostResult<()> {
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> AutopostResult<()> {
        self.ended = true;
        Ok(())
    }
}
