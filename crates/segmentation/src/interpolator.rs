use shared::domain::{Code, CodeFlags};

/// Last accepted XY position the next move is averaged against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Baseline {
    /// At least one axis has not been seen since the stream (re)started.
    Unestablished { x: Option<f64>, y: Option<f64> },
    Established { x: f64, y: f64 },
}

impl Baseline {
    pub const UNKNOWN: Self = Self::Unestablished { x: None, y: None };

    fn from_axes(x: Option<f64>, y: Option<f64>) -> Self {
        match (x, y) {
            (Some(x), Some(y)) => Self::Established { x, y },
            (x, y) => Self::Unestablished { x, y },
        }
    }

    pub fn x(&self) -> Option<f64> {
        match *self {
            Self::Unestablished { x, .. } => x,
            Self::Established { x, .. } => Some(x),
        }
    }

    pub fn y(&self) -> Option<f64> {
        match *self {
            Self::Unestablished { y, .. } => y,
            Self::Established { y, .. } => Some(y),
        }
    }

    /// Overwrites whichever axes are given and keeps the others.
    fn record(self, x: Option<f64>, y: Option<f64>) -> Self {
        Self::from_axes(x.or(self.x()), y.or(self.y()))
    }
}

impl Default for Baseline {
    fn default() -> Self {
        Self::UNKNOWN
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassReason {
    /// Macro code or a move without X and Y.
    Irrelevant,
    /// First move(s) of a new or rewound stream.
    NewStream,
    /// X/Y present but none of them could be averaged.
    NothingToInterpolate,
}

/// The two codes executed in place of an intercepted move.
#[derive(Debug, Clone, PartialEq)]
pub struct Replacement {
    /// Halfway to the target, with halved extrusion.
    pub midpoint: Code,
    /// The original target, still with halved extrusion.
    pub restore: Code,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    PassThrough(PassReason),
    Replace(Replacement),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpolatorOptions {
    /// Flag replacement codes as asynchronous. Controllers before v3.5 need it
    /// to queue the second code while the first one is still moving.
    pub mark_asynchronous: bool,
}

impl Default for InterpolatorOptions {
    fn default() -> Self {
        Self {
            mark_asynchronous: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterpolationStats {
    pub irrelevant: u64,
    pub baselines: u64,
    pub interpolated: u64,
    pub uninterpolated: u64,
}

impl InterpolationStats {
    pub fn total(&self) -> u64 {
        self.irrelevant + self.baselines + self.interpolated + self.uninterpolated
    }

    fn count(&mut self, decision: &Decision) {
        match decision {
            Decision::PassThrough(PassReason::Irrelevant) => self.irrelevant += 1,
            Decision::PassThrough(PassReason::NewStream) => self.baselines += 1,
            Decision::PassThrough(PassReason::NothingToInterpolate) => self.uninterpolated += 1,
            Decision::Replace(_) => self.interpolated += 1,
        }
    }
}

/// First-order smoothing of XY moves on one channel.
///
/// Every steady-state move is split into a move to the midpoint between the
/// previous and the new target followed by a move to the new target. The
/// baseline always tracks the commanded targets, never the midpoints.
#[derive(Debug, Clone, Default)]
pub struct Interpolator {
    options: InterpolatorOptions,
    baseline: Baseline,
    last_file_position: Option<u64>,
    stats: InterpolationStats,
}

impl Interpolator {
    pub fn new(options: InterpolatorOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn baseline(&self) -> Baseline {
        self.baseline
    }

    pub fn last_file_position(&self) -> Option<u64> {
        self.last_file_position
    }

    pub fn stats(&self) -> InterpolationStats {
        self.stats
    }

    pub fn process(&mut self, code: &Code) -> Decision {
        let decision = self.decide(code);
        self.stats.count(&decision);
        decision
    }

    fn decide(&mut self, code: &Code) -> Decision {
        if code.is_from_macro() || !(code.has_parameter('X') || code.has_parameter('Y')) {
            return Decision::PassThrough(PassReason::Irrelevant);
        }

        let rewound = match (self.last_file_position, code.file_position) {
            (None, _) => true,
            (Some(last), Some(position)) => position < last,
            (Some(_), None) => false,
        };
        self.last_file_position = code.file_position;

        let (prev_x, prev_y) = match self.baseline {
            Baseline::Established { x, y } if !rewound => (x, y),
            baseline => {
                let baseline = if rewound { Baseline::UNKNOWN } else { baseline };
                self.baseline = baseline.record(code.float('X'), code.float('Y'));
                return Decision::PassThrough(PassReason::NewStream);
            }
        };

        let mut midpoint = code.clone();
        let (mut x, mut y) = (prev_x, prev_y);
        let mut interpolated = false;
        for parameter in &mut midpoint.parameters {
            let previous = match parameter.letter {
                'X' => &mut x,
                'Y' => &mut y,
                _ => continue,
            };
            let Some(target) = parameter.value.as_float() else {
                continue;
            };
            parameter.value = ((*previous + target) / 2.0).into();
            *previous = target;
            interpolated = true;
        }
        self.baseline = Baseline::Established { x, y };

        if !interpolated {
            return Decision::PassThrough(PassReason::NothingToInterpolate);
        }

        if let Some(extrusion) = midpoint
            .parameters
            .iter_mut()
            .find(|parameter| parameter.letter == 'E')
        {
            if let Some(halved) = extrusion.value.halved() {
                extrusion.value = halved;
            }
        }
        if self.options.mark_asynchronous {
            midpoint.flags |= CodeFlags::ASYNCHRONOUS;
        }

        let restore = restore_targets(&midpoint, code);
        Decision::Replace(Replacement { midpoint, restore })
    }
}

/// Puts the original X/Y targets back into a copy of the midpoint code.
fn restore_targets(midpoint: &Code, original: &Code) -> Code {
    let mut restore = midpoint.clone();
    for (slot, source) in restore.parameters.iter_mut().zip(&original.parameters) {
        if matches!(slot.letter, 'X' | 'Y') {
            slot.clone_from(source);
        }
    }
    restore
}

#[cfg(test)]
#[path = "tests/interpolator_tests.rs"]
mod tests;
