//! Software stand-in for GPU-side frame presentation, which real hardware
//! display is out of scope here. Logs the frames it receives instead
//! of handing them to a window/GPU surface.

use fpv_core::boundary::Presenter;
use fpv_core::errors::FpvError;
use fpv_core::types::DecodedFrame;
use tracing::debug;

#[derive(Default)]
pub struct LoggingPresenter {
    frames_submitted: u64,
}

impl LoggingPresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_submitted(&self) -> u64 {
        self.frames_submitted
    }
}

impl Presenter for LoggingPresenter {
    fn submit(&mut self, frame: DecodedFrame) -> Result<(), FpvError> {
        self.frames_submitted += 1;
        debug!(
            frame_count = self.frames_submitted,
            width = frame.width,
            height = frame.height,
            bytes = frame.data.len(),
            "presented frame"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use fpv_core::types::PixelFormat;

    #[test]
    fn counts_submitted_frames() {
        let mut presenter = LoggingPresenter::new();
        let frame = DecodedFrame { data: Bytes::new(), width: 1, height: 1, timestamp_us: 0, format: PixelFormat::Nv12 };
        presenter.submit(frame.clone()).unwrap();
        presenter.submit(frame).unwrap();
        assert_eq!(presenter.frames_submitted(), 2);
    }
}
