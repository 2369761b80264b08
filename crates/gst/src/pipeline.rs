use std::time::Duration;

use gst::prelude::*;

use rtsp_loop::{LoopError, PipelineControl, PipelineState, Result, SeekFlags};

use crate::CAT;

/// [`PipelineControl`] over a GStreamer element.
///
/// The element is the top-level bin of an RTSP media, owned by the server;
/// this wrapper only holds a reference to it.
#[derive(Debug, Clone)]
pub struct GstPipeline {
    element: gst::Element,
}

impl GstPipeline {
    pub fn new(element: gst::Element) -> Self {
        Self { element }
    }
}

impl PipelineControl for GstPipeline {
    fn set_state(&self, state: PipelineState) -> Result<()> {
        self.element.set_state(gst_state(state)).map_err(|err| {
            gst::warning!(CAT, obj = &self.element, "state change to {} failed: {}", state, err);
            LoopError::StateChange { state }
        })?;
        gst::debug!(CAT, obj = &self.element, "state set to {}", state);
        Ok(())
    }

    fn seek(&self, position: Duration, flags: SeekFlags) -> Result<()> {
        let seek_pos =
            gst::ClockTime::try_from(position).map_err(|_| LoopError::Seek { position })?;
        self.element
            .seek_simple(gst_seek_flags(flags), seek_pos)
            .map_err(|err| {
                gst::warning!(CAT, obj = &self.element, "seek to {} failed: {}", seek_pos, err);
                LoopError::Seek { position }
            })
    }
}

fn gst_state(state: PipelineState) -> gst::State {
    match state {
        PipelineState::Null => gst::State::Null,
        PipelineState::Ready => gst::State::Ready,
        PipelineState::Playing => gst::State::Playing,
    }
}

fn gst_seek_flags(flags: SeekFlags) -> gst::SeekFlags {
    let mut out = gst::SeekFlags::empty();
    if flags.contains(SeekFlags::FLUSH) {
        out |= gst::SeekFlags::FLUSH;
    }
    if flags.contains(SeekFlags::KEY_UNIT) {
        out |= gst::SeekFlags::KEY_UNIT;
    }
    out
}
