use crate::frame::Frame;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Easing {
    Linear,
    ExponentialInOut,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::ExponentialInOut => {
                if t == 0.0 || t == 1.0 {
                    t
                } else if t < 0.5 {
                    0.5 * 1024f64.powf(t * 2.0 - 1.0)
                } else {
                    0.5 * (2.0 - 2f64.powf(-10.0 * (t * 2.0 - 1.0)))
                }
            }
        }
    }
}

/// Scalar interpolation advanced once per frame tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Tween {
    from: f64,
    to: f64,
    duration_s: f64,
    elapsed_s: f64,
    easing: Easing,
}

impl Tween {
    pub fn new(from: f64, to: f64, duration_s: f64) -> Self {
        Self {
            from,
            to,
            duration_s: duration_s.max(0.0),
            elapsed_s: 0.0,
            easing: Easing::Linear,
        }
    }

    pub fn with_easing(mut self, easing: Easing) -> Self {
        self.easing = easing;
        self
    }

    pub fn value(&self) -> f64 {
        if self.duration_s == 0.0 {
            return self.to;
        }
        let t = self.easing.apply(self.elapsed_s / self.duration_s);
        self.from + (self.to - self.from) * t
    }

    pub fn is_finished(&self) -> bool {
        self.elapsed_s >= self.duration_s
    }

    /// One easing step; returns the value after the step.
    pub fn step(&mut self, frame: Frame) -> f64 {
        self.elapsed_s = (self.elapsed_s + frame.dt_s).min(self.duration_s);
        self.value()
    }
}
