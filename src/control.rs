//! Control signals and the adapter that turns them into a single actuation call.
//!
//! A car is driven either by a human (two named input axes) or by an external
//! policy (a 2-element action vector). Both are a [`ControlSource`]; the
//! adapter does not care which one it is reading.

use serde::{Deserialize, Serialize};

pub const HORIZONTAL_AXIS: &str = "Horizontal";
pub const VERTICAL_AXIS: &str = "Vertical";

/// One tick's worth of driver intent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlSignal {
    pub steer: f32,          // -1.0 (full left) .. 1.0 (full right)
    pub throttle_brake: f32, // -1.0 (brake / reverse) .. 1.0 (full forward)
}

impl ControlSignal {
    pub fn new(steer: f32, throttle_brake: f32) -> Self {
        Self { steer, throttle_brake }
    }
}

/// Anything that can produce a control signal once per tick.
pub trait ControlSource {
    fn signal(&mut self) -> ControlSignal;
}

/// The vehicle actuation call: `(steer, accelerate, footbrake, handbrake)`.
///
/// Implementations own any clamping; callers pass values through untouched.
pub trait Actuator {
    fn move_car(&mut self, steer: f32, accelerate: f32, footbrake: f32, handbrake: f32);
}

/// Forward one control signal to the actuator as `(h, v, v, 0)`.
///
/// No clamping or smoothing happens here. Out-of-range values are the
/// caller's problem and reach the actuator as-is.
pub fn apply_signal<A: Actuator + ?Sized>(signal: ControlSignal, actuator: &mut A) {
    let h = signal.steer;
    let v = signal.throttle_brake;
    actuator.move_car(h, v, v, 0.0);
}

/// Pull a signal from `source` and forward it. One actuation call per invocation.
pub fn drive<S, A>(source: &mut S, actuator: &mut A) -> ControlSignal
where
    S: ControlSource + ?Sized,
    A: Actuator + ?Sized,
{
    let signal = source.signal();
    apply_signal(signal, actuator);
    signal
}

// --------------------------------------------------
// Human input: latest value of the two named axes
// --------------------------------------------------
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AxisInput {
    pub horizontal: f32,
    pub vertical: f32,
}

impl AxisInput {
    pub fn new(horizontal: f32, vertical: f32) -> Self {
        Self { horizontal, vertical }
    }

    /// Axis lookup by name. Unknown axes read as 0.
    pub fn axis(&self, name: &str) -> f32 {
        match name {
            HORIZONTAL_AXIS => self.horizontal,
            VERTICAL_AXIS => self.vertical,
            _ => 0.0,
        }
    }
}

impl ControlSource for AxisInput {
    fn signal(&mut self) -> ControlSignal {
        ControlSignal::new(self.axis(HORIZONTAL_AXIS), self.axis(VERTICAL_AXIS))
    }
}

// --------------------------------------------------
// Policy action: [horizontal, vertical]
// --------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolicyAction {
    pub action: Vec<f32>,
}

impl PolicyAction {
    pub fn new(action: Vec<f32>) -> Self {
        Self { action }
    }
}

impl ControlSource for PolicyAction {
    /// Index 0 steers, index 1 drives. Missing entries read as 0 and extra
    /// entries are ignored; values are not range-checked.
    fn signal(&mut self) -> ControlSignal {
        let h = self.action.first().copied().unwrap_or(0.0);
        let v = self.action.get(1).copied().unwrap_or(0.0);
        ControlSignal::new(h, v)
    }
}

/// Which driver currently owns a car.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMode {
    Manual(AxisInput),
    Agent(PolicyAction),
}

impl ControlMode {
    pub fn name(&self) -> &'static str {
        match self {
            ControlMode::Manual(_) => "manual",
            ControlMode::Agent(_) => "agent",
        }
    }

    pub fn is_agent(&self) -> bool {
        matches!(self, ControlMode::Agent(_))
    }
}

impl ControlSource for ControlMode {
    fn signal(&mut self) -> ControlSignal {
        match self {
            ControlMode::Manual(axes) => axes.signal(),
            ControlMode::Agent(action) => action.signal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every actuation call it receives.
    #[derive(Default)]
    struct RecordingActuator {
        calls: Vec<(f32, f32, f32, f32)>,
    }

    impl Actuator for RecordingActuator {
        fn move_car(&mut self, steer: f32, accelerate: f32, footbrake: f32, handbrake: f32) {
            self.calls.push((steer, accelerate, footbrake, handbrake));
        }
    }

    #[test]
    fn actuator_receives_h_v_v_zero_across_the_input_range() {
        let samples = [-1.0, -0.5, 0.0, 0.25, 1.0];
        for &h in &samples {
            for &v in &samples {
                let mut actuator = RecordingActuator::default();
                apply_signal(ControlSignal::new(h, v), &mut actuator);
                assert_eq!(actuator.calls, vec![(h, v, v, 0.0)]);
            }
        }
    }

    #[test]
    fn adapter_does_not_clamp_out_of_range_values() {
        let mut actuator = RecordingActuator::default();
        let mut source = PolicyAction::new(vec![3.0, -7.5]);
        drive(&mut source, &mut actuator);
        assert_eq!(actuator.calls, vec![(3.0, -7.5, -7.5, 0.0)]);
    }

    #[test]
    fn axis_input_reads_named_axes() {
        let mut axes = AxisInput::new(-0.4, 0.9);
        assert_eq!(axes.axis("Horizontal"), -0.4);
        assert_eq!(axes.axis("Vertical"), 0.9);
        assert_eq!(axes.axis("Jump"), 0.0);
        assert_eq!(axes.signal(), ControlSignal::new(-0.4, 0.9));
    }

    #[test]
    fn short_or_long_action_vectors_are_padded_or_truncated() {
        assert_eq!(PolicyAction::new(vec![]).signal(), ControlSignal::new(0.0, 0.0));
        assert_eq!(PolicyAction::new(vec![1.0]).signal(), ControlSignal::new(1.0, 0.0));
        assert_eq!(
            PolicyAction::new(vec![-1.0, 1.0, 0.5, 0.5]).signal(),
            ControlSignal::new(-1.0, 1.0)
        );
    }

    #[test]
    fn both_modes_drive_through_the_same_adapter() {
        let mut manual = ControlMode::Manual(AxisInput::new(0.5, 1.0));
        let mut agent = ControlMode::Agent(PolicyAction::new(vec![0.5, 1.0]));
        let mut a = RecordingActuator::default();
        let mut b = RecordingActuator::default();

        drive(&mut manual, &mut a);
        drive(&mut agent, &mut b);

        assert_eq!(a.calls, b.calls);
        assert!(!manual.is_agent());
        assert!(agent.is_agent());
        assert_eq!(agent.name(), "agent");
    }
}
