use std::sync::Arc;

use gst::glib;
use gst::prelude::*;
use gst_rtsp_server::prelude::*;

use rtsp_loop::pipeline::PAYLOADER_NAME;
use rtsp_loop::{
    MediaFactory, PipelineControl, PipelineDescriptor, PipelineLifecycleObserver, PipelineState,
    Result,
};

use crate::CAT;
use crate::pipeline::GstPipeline;

/// Shared `RTSPMediaFactory` serving one [`PipelineDescriptor`].
#[derive(Debug, Clone)]
pub struct LoopFactory {
    factory: gst_rtsp_server::RTSPMediaFactory,
    launch: String,
}

impl LoopFactory {
    pub fn launch(&self) -> &str {
        &self.launch
    }

    pub fn inner(&self) -> &gst_rtsp_server::RTSPMediaFactory {
        &self.factory
    }
}

impl MediaFactory for LoopFactory {
    fn configure(descriptor: &PipelineDescriptor) -> Result<Self> {
        let launch = descriptor.launch();
        let factory = gst_rtsp_server::RTSPMediaFactory::new();
        factory.set_launch(&launch);
        // One decode pipeline for every client instead of one per session.
        factory.set_shared(true);
        Ok(Self { factory, launch })
    }

    fn on_media_configure(&self, observer: Arc<dyn PipelineLifecycleObserver>) {
        self.factory.connect_media_configure(move |_factory, media| {
            let element = media.element();
            gst::info!(CAT, obj = &element, "media configured");
            let observer = Arc::new(PreparedMedia {
                media: media.downgrade(),
                inner: observer.clone(),
            });
            if let Err(reason) = watch_end_of_stream(&element, observer) {
                gst::error!(CAT, obj = &element, "cannot loop media: {}", reason);
            }
        });
    }
}

/// Forwards end-of-stream only while the RTSP media is still prepared.
///
/// A TEARDOWN can unprepare the media while a restart is queued; the launch
/// bin must not be left PLAYING behind it.
struct PreparedMedia {
    media: glib::WeakRef<gst_rtsp_server::RTSPMedia>,
    inner: Arc<dyn PipelineLifecycleObserver>,
}

impl PreparedMedia {
    fn status(&self) -> Option<gst_rtsp_server::RTSPMediaStatus> {
        self.media.upgrade().map(|media| media.status())
    }
}

fn restart_allowed(status: Option<gst_rtsp_server::RTSPMediaStatus>) -> bool {
    matches!(status, Some(gst_rtsp_server::RTSPMediaStatus::Prepared))
}

impl PipelineLifecycleObserver for PreparedMedia {
    fn on_end_of_stream(&self, pipeline: &dyn PipelineControl) -> Result<()> {
        let status = self.status();
        if !restart_allowed(status) {
            tracing::debug!(?status, "media not prepared, restart skipped");
            return Ok(());
        }

        let result = self.inner.on_end_of_stream(pipeline);

        let status = self.status();
        if !restart_allowed(status) {
            tracing::debug!(?status, "media unprepared during restart, stopping pipeline");
            pipeline.set_state(PipelineState::Null)?;
        }
        result
    }
}

/// Intercept end-of-stream on the payloader and hand it to `observer`.
///
/// The EOS event is dropped so the RTSP session stays up. The observer runs
/// through `call_async`, off the streaming thread, since it changes the
/// state of the very pipeline that is pushing the event.
fn watch_end_of_stream(
    element: &gst::Element,
    observer: Arc<dyn PipelineLifecycleObserver>,
) -> std::result::Result<(), String> {
    let bin = element
        .downcast_ref::<gst::Bin>()
        .ok_or_else(|| "media element is not a bin".to_string())?;
    let payloader = bin
        .by_name(PAYLOADER_NAME)
        .ok_or_else(|| format!("no element named {}", PAYLOADER_NAME))?;
    let src_pad = payloader
        .static_pad("src")
        .ok_or_else(|| format!("{} has no src pad", PAYLOADER_NAME))?;

    let media_element = element.downgrade();
    src_pad
        .add_probe(gst::PadProbeType::EVENT_DOWNSTREAM, move |pad, info| {
            let is_eos = matches!(
                info.data,
                Some(gst::PadProbeData::Event(ref event)) if event.type_() == gst::EventType::Eos
            );
            if !is_eos {
                return gst::PadProbeReturn::Ok;
            }
            let Some(element) = media_element.upgrade() else {
                return gst::PadProbeReturn::Ok;
            };

            let pad = pad.clone();
            let observer = observer.clone();
            element.call_async(move |element| {
                align_to_running_time(element, &pad);
                let pipeline = GstPipeline::new(element.clone());
                if let Err(err) = observer.on_end_of_stream(&pipeline) {
                    gst::error!(CAT, obj = element, "restart failed: {}", err);
                    tracing::error!(error = %err, "failed to restart playback");
                }
            });
            gst::PadProbeReturn::Drop
        })
        .ok_or_else(|| "failed to install EOS probe".to_string())?;

    gst::debug!(CAT, obj = &payloader, "EOS probe installed");
    Ok(())
}

/// Shift `pad` so the restarted segment begins at the top-level pipeline's
/// current running time.
///
/// The restart only resets the launch bin; the rest of the media pipeline
/// keeps its clock, and without the offset the new segment would start in
/// the past for every sink that syncs.
fn align_to_running_time(element: &gst::Element, pad: &gst::Pad) {
    let mut top = element.clone();
    while let Some(parent) = top.parent().and_then(|p| p.downcast::<gst::Element>().ok()) {
        top = parent;
    }

    let Some(running_time) = top.current_running_time() else {
        gst::debug!(CAT, obj = element, "no running time, payloader offset unchanged");
        return;
    };
    match i64::try_from(running_time.nseconds()) {
        Ok(offset) => {
            pad.set_offset(offset);
            gst::debug!(CAT, obj = pad, "payloader offset set to {}", running_time);
        }
        Err(_) => gst::warning!(CAT, obj = pad, "running time {} out of range", running_time),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::thread;
    use std::time::{Duration, Instant};

    use rtsp_loop::LoopPlayback;

    /// Loops the first `max_restarts` end-of-streams, then just counts.
    struct Recorder {
        playback: LoopPlayback,
        calls: AtomicU64,
        max_restarts: u64,
    }

    impl Recorder {
        fn new(max_restarts: u64) -> Arc<Self> {
            Arc::new(Self {
                playback: LoopPlayback::new(tracing::Span::none()),
                calls: AtomicU64::new(0),
                max_restarts,
            })
        }

        fn calls(&self) -> u64 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PipelineLifecycleObserver for Recorder {
        fn on_end_of_stream(&self, pipeline: &dyn PipelineControl) -> Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call > self.max_restarts {
                return Ok(());
            }
            self.playback.on_end_of_stream(pipeline)
        }
    }

    fn wait_until(timeout: Duration, done: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        done()
    }

    #[test]
    fn configure_sets_shared_launch() {
        crate::init().unwrap();
        let descriptor = PipelineDescriptor::file_loop("/tmp/sample_videos/test.mp4");

        let factory = LoopFactory::configure(&descriptor).unwrap();

        assert!(factory.inner().is_shared());
        assert_eq!(
            factory.inner().launch().map(|l| l.to_string()),
            Some(descriptor.launch())
        );
        assert_eq!(factory.launch(), descriptor.launch());
    }

    #[test]
    fn end_of_stream_restarts_bin_without_reaching_bus() {
        crate::init().unwrap();

        let bin = gst::parse::bin_from_description("fakesrc num-buffers=3 ! identity name=pay0", true)
            .unwrap();
        let sink = gst::ElementFactory::make("fakesink")
            .property("signal-handoffs", true)
            .build()
            .unwrap();
        let buffers = Arc::new(AtomicU64::new(0));
        let counter = buffers.clone();
        sink.connect("handoff", false, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            None
        });

        let pipeline = gst::Pipeline::new();
        pipeline.add_many([bin.upcast_ref::<gst::Element>(), &sink]).unwrap();
        bin.link(&sink).unwrap();

        let recorder = Recorder::new(2);
        watch_end_of_stream(bin.upcast_ref(), recorder.clone()).unwrap();
        pipeline.set_state(gst::State::Playing).unwrap();

        // Two restarts, then the third end-of-stream is swallowed.
        assert!(
            wait_until(Duration::from_secs(5), || recorder.calls() >= 3),
            "observer saw {} end-of-streams",
            recorder.calls()
        );
        assert_eq!(recorder.playback.restarts(), 2);
        assert!(
            buffers.load(Ordering::SeqCst) >= 6,
            "no buffers after restart: {}",
            buffers.load(Ordering::SeqCst)
        );

        let bus = pipeline.bus().unwrap();
        let eos = bus.timed_pop_filtered(
            gst::ClockTime::from_mseconds(200),
            &[gst::MessageType::Eos],
        );
        assert!(eos.is_none(), "end-of-stream reached the pipeline bus");

        let pay_src = bin.by_name("pay0").unwrap().static_pad("src").unwrap();
        assert!(pay_src.offset() > 0, "restart did not realign running time");

        pipeline.set_state(gst::State::Null).unwrap();
    }

    #[test]
    fn restart_needs_prepared_media() {
        use gst_rtsp_server::RTSPMediaStatus;

        assert!(restart_allowed(Some(RTSPMediaStatus::Prepared)));
        assert!(!restart_allowed(Some(RTSPMediaStatus::Unpreparing)));
        assert!(!restart_allowed(Some(RTSPMediaStatus::Unprepared)));
        assert!(!restart_allowed(None));
    }

    #[test]
    fn unprepared_media_skips_restart() {
        crate::init().unwrap();
        let element = gst::parse::launch("fakesrc ! fakesink").unwrap();
        let media = gst_rtsp_server::RTSPMedia::new(&element);
        let recorder = Recorder::new(1);
        let guard = PreparedMedia {
            media: media.downgrade(),
            inner: recorder.clone(),
        };

        guard
            .on_end_of_stream(&GstPipeline::new(element.clone()))
            .unwrap();
        assert_eq!(recorder.calls(), 0);

        drop(media);
        guard.on_end_of_stream(&GstPipeline::new(element)).unwrap();
        assert_eq!(recorder.calls(), 0);
    }
}
