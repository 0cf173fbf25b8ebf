use crate::error::SimResult;
use crate::stage::Stage;

/// A subsystem that runs once per frame, after physics.
///
/// Systems are executed in registration order. Each system gets the stage,
/// so it can read and write the world, drive the engine adapters, and record
/// events.
pub trait System: std::fmt::Debug {
    /// Human-readable name for this system.
    fn name(&self) -> &str;

    /// Called once per frame with the frame's time delta in seconds.
    fn tick(&mut self, stage: &mut Stage, dt: f64) -> SimResult<()>;

    /// Called once before the first frame. Optional setup hook.
    fn init(&mut self, _stage: &mut Stage) -> SimResult<()> {
        Ok(())
    }

    /// Support downcasting to concrete types.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Support downcasting to concrete types.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}
