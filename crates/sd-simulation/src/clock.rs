/// Tracks simulation time: a monotonic step counter, elapsed seconds, and the
/// fixed-step accumulator that decides how many physics steps each frame gets.
#[derive(Debug, Clone)]
pub struct SimClock {
    tick: u64,
    elapsed: f64,
    fixed_step: f64,
    max_substeps: u32,
    accumulator: f64,
}

impl SimClock {
    /// Create a clock. A `fixed_step` of 0 hands every frame's `dt` to
    /// physics as a single step.
    pub fn new(fixed_step: f64, max_substeps: u32) -> Self {
        Self {
            tick: 0,
            elapsed: 0.0,
            fixed_step,
            max_substeps: max_substeps.max(1),
            accumulator: 0.0,
        }
    }

    /// Advance by one frame of `dt` seconds and return the physics step
    /// lengths to run for it.
    pub fn advance(&mut self, dt: f64) -> Vec<f64> {
        self.tick += 1;
        self.elapsed += dt;

        if self.fixed_step <= 0.0 {
            return if dt > 0.0 { vec![dt] } else { Vec::new() };
        }

        self.accumulator += dt;
        let mut steps = Vec::new();
        while self.accumulator >= self.fixed_step && steps.len() < self.max_substeps as usize {
            steps.push(self.fixed_step);
            self.accumulator -= self.fixed_step;
        }
        if self.accumulator >= self.fixed_step {
            log::warn!(
                "frame {} fell behind, dropping {:.3}s of physics",
                self.tick,
                self.accumulator
            );
            self.accumulator = 0.0;
        }
        steps
    }

    /// Return the current frame number.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Total seconds passed to [`SimClock::advance`].
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Seconds accumulated but not yet stepped.
    pub fn pending(&self) -> f64 {
        self.accumulator
    }

    /// Physics step length (0 = variable).
    pub fn fixed_step(&self) -> f64 {
        self.fixed_step
    }
}
