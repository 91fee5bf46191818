// THEORY:
// The `Controller` is the actuation half of the servo loop. Once per control
// period it takes a consistent snapshot of the shared target cell and turns it
// into exactly one `VelocityCommand`. It keeps no state of its own between ticks:
// no smoothing, no ramps, no hysteresis. A missing or stale frame therefore never
// stalls motion output, at the price of no damping when the reported centroid
// jitters around the deadband edge.
//
// The law, for horizontal error e = cx - width / 2:
// - no target (or no frame seen yet): rotate in place at the search speed.
// - |e| >  threshold: turn with angular = gain * e and creep forward.
// - |e| <= threshold: drive forward at full speed.
// The last two are evaluated as two separate tests rather than one if/else.
// Inside the deadband nothing assigns the angular term, so it falls back to
// zero on that tick; heading correction switches off the moment the target
// crosses into the deadband rather than decaying. This mirrors the
// long-standing behavior of the loop and is kept on purpose.

use crate::core_modules::target_state::{Observation, TargetObserver, TargetState};
use crate::core_modules::velocity::VelocityCommand;
use crate::error::Result;
use crate::transport::VelocitySink;
use tracing::trace;

/// Tunables of the proportional control law.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlGains {
    /// Half-width, in pixels, of the band around the image center treated as centered.
    pub centering_threshold_px: f64,
    /// Yaw rate per pixel of horizontal error. Negative turns toward the target.
    pub angular_gain: f64,
    /// Yaw rate while no target is visible.
    pub search_angular_speed: f64,
    /// Forward speed while correcting heading.
    pub creep_speed: f64,
    /// Forward speed while centered.
    pub forward_speed: f64,
}

impl Default for ControlGains {
    fn default() -> Self {
        Self {
            centering_threshold_px: 20.0,
            angular_gain: -0.002,
            search_angular_speed: -0.3,
            creep_speed: 0.1,
            forward_speed: 0.2,
        }
    }
}

/// The control law as a pure function of one observation.
pub fn control_law(gains: &ControlGains, observation: &Observation) -> VelocityCommand {
    let mut command = VelocityCommand::default();

    let (TargetState::Detected { x, .. }, Some(dimensions)) = (observation.target, observation.dimensions) else {
        // Nothing to steer at, or no frame yet to know where the center is.
        command.angular = gains.search_angular_speed;
        return command;
    };

    let error_x = x as f64 - dimensions.width as f64 / 2.0;

    if error_x.abs() > gains.centering_threshold_px {
        command.angular = gains.angular_gain * error_x;
        command.linear = gains.creep_speed;
    }

    if error_x.abs() <= gains.centering_threshold_px {
        command.linear = gains.forward_speed;
    }

    command
}

/// Reads the shared target cell and publishes one command per `tick`.
pub struct Controller<S> {
    gains: ControlGains,
    observer: TargetObserver,
    sink: S,
}

impl<S: VelocitySink> Controller<S> {
    pub fn new(gains: ControlGains, observer: TargetObserver, sink: S) -> Self {
        Self {
            gains,
            observer,
            sink,
        }
    }

    pub fn gains(&self) -> &ControlGains {
        &self.gains
    }

    /// Computes and publishes the command for the current observation.
    pub fn tick(&self) -> Result<VelocityCommand> {
        let observation = self.observer.observe();
        let command = control_law(&self.gains, &observation);
        trace!(?observation, linear = command.linear, angular = command.angular, "control tick");
        self.sink.publish(command)?;
        Ok(command)
    }

    /// Publishes a zero command, used when the loop shuts down.
    pub fn stop(&self) -> Result<()> {
        self.sink.publish(VelocityCommand::stop())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::frame::FrameDimensions;
    use crate::core_modules::target_state::target_channel;
    use crate::transport::BusSink;

    const VGA: FrameDimensions = FrameDimensions { width: 640, height: 480 };

    fn seen_at(x: u32) -> Observation {
        Observation {
            target: TargetState::Detected { x, y: 240 },
            dimensions: Some(VGA),
        }
    }

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-12, "{actual} != {expected}");
    }

    #[test]
    fn centered_target_drives_forward_without_turning() {
        let cmd = control_law(&ControlGains::default(), &seen_at(320));
        assert_eq!(cmd, VelocityCommand::new(0.2, 0.0));
    }

    #[test]
    fn off_center_target_turns_toward_it_and_creeps() {
        let cmd = control_law(&ControlGains::default(), &seen_at(400));
        assert_close(cmd.angular, -0.16);
        assert_eq!(cmd.linear, 0.1);

        let cmd = control_law(&ControlGains::default(), &seen_at(200));
        assert_close(cmd.angular, 0.24);
        assert_eq!(cmd.linear, 0.1);
    }

    #[test]
    fn no_target_searches_in_place() {
        let observation = Observation {
            target: TargetState::NotDetected,
            dimensions: Some(VGA),
        };
        assert_eq!(control_law(&ControlGains::default(), &observation), VelocityCommand::new(0.0, -0.3));
    }

    #[test]
    fn inside_deadband_angular_resets_to_zero() {
        let cmd = control_law(&ControlGains::default(), &seen_at(330));
        assert_eq!(cmd, VelocityCommand::new(0.2, 0.0));
    }

    #[test]
    fn deadband_edges() {
        let gains = ControlGains::default();
        assert_eq!(control_law(&gains, &seen_at(340)), VelocityCommand::new(0.2, 0.0));
        assert_eq!(control_law(&gains, &seen_at(300)), VelocityCommand::new(0.2, 0.0));
        let just_outside = control_law(&gains, &seen_at(341));
        assert_eq!(just_outside.linear, 0.1);
        assert_close(just_outside.angular, -0.042);
    }

    #[test]
    fn unknown_dimensions_fall_back_to_search() {
        let observation = Observation {
            target: TargetState::Detected { x: 10, y: 10 },
            dimensions: None,
        };
        assert_eq!(control_law(&ControlGains::default(), &observation), VelocityCommand::new(0.0, -0.3));
    }

    #[test]
    fn odd_width_uses_fractional_center() {
        let observation = Observation {
            target: TargetState::Detected { x: 100, y: 0 },
            dimensions: Some(FrameDimensions { width: 159, height: 100 }),
        };
        let cmd = control_law(&ControlGains::default(), &observation);
        assert_eq!(cmd.linear, 0.1);
        assert_close(cmd.angular, -0.002 * 20.5);
    }

    #[test]
    fn tick_publishes_exactly_one_command() {
        let (tx, rx) = target_channel();
        let sink = BusSink::new("/cmd_vel", 8);
        let mut commands = sink.subscribe();
        let controller = Controller::new(ControlGains::default(), rx, sink);

        tx.record_dimensions(VGA);
        tx.publish(TargetState::Detected { x: 320, y: 100 });
        let sent = controller.tick().unwrap();
        assert_eq!(commands.try_recv().unwrap(), sent);
        assert!(commands.try_recv().is_err());

        controller.stop().unwrap();
        assert!(commands.try_recv().unwrap().is_stop());
    }
}
