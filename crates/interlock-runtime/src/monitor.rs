//! [`Monitor`] – mirrors the safety latch onto the external indicator.
//!
//! While the latch is OK the monitor re-drives SAFE every poll.  On the
//! first poll that sees the latch tripped it drives UNSAFE once and stops
//! for good; nothing ever drives SAFE again.  The monitor never touches the
//! Guard.

use tracing::{error, info};

use interlock_hal::Indicator;
use interlock_middleware::Recorder;
use interlock_types::{EventPayload, IndicatorState};

use crate::config::MonitorConfig;
use crate::context::{LoopContext, LoopExit};

const SOURCE: &str = "interlock-runtime::monitor";

/// Summary returned when the monitor loop exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    /// Polls that found the latch OK.
    pub polls: u64,
    pub exit: LoopExit,
}

pub struct Monitor {
    ctx: LoopContext,
    config: MonitorConfig,
    indicator: Box<dyn Indicator>,
    recorder: Recorder,
    announced: Option<IndicatorState>,
}

impl Monitor {
    pub fn new(ctx: LoopContext, config: MonitorConfig, indicator: Box<dyn Indicator>) -> Self {
        let recorder = Recorder::new(SOURCE, ctx.sink.clone());
        Self {
            ctx,
            config,
            indicator,
            recorder,
            announced: None,
        }
    }

    /// Run until the latch trips or shutdown is requested.
    ///
    /// Shutdown leaves the indicator as it is; only a trip drives UNSAFE.
    pub fn run(mut self) -> MonitorReport {
        info!("monitor loop started");
        let mut polls = 0;
        let exit = loop {
            match self.ctx.stop_reason() {
                Some(LoopExit::Tripped) => {
                    self.latch_unsafe();
                    break LoopExit::Tripped;
                }
                Some(exit) => break exit,
                None => {}
            }
            self.drive(IndicatorState::Safe);
            polls += 1;
            self.ctx.sleeper.sleep_for(self.config.poll_interval);
        };

        info!(polls, exit = ?exit, "monitor loop stopped");
        MonitorReport { polls, exit }
    }

    fn latch_unsafe(&mut self) {
        error!(cause = ?self.ctx.latch.cause(), "latch tripped; driving UNSAFE");
        self.drive(IndicatorState::Unsafe);
    }

    /// Drive `state` and record it when it differs from the last state
    /// announced.  A failing output is logged; the loop carries on.
    fn drive(&mut self, state: IndicatorState) {
        let result = match state {
            IndicatorState::Safe => self.indicator.set_safe(),
            IndicatorState::Unsafe => self.indicator.set_unsafe(),
        };
        if let Err(e) = result {
            error!(?state, "indicator drive failed: {e}");
            return;
        }
        if self.announced != Some(state) {
            self.announced = Some(state);
            self.recorder.record(EventPayload::IndicatorChanged(state));
        }
    }
}
