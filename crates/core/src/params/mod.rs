use serde::{Deserialize, Serialize};

pub const MIN_ANGLE_DELTA: f64 = 0.1;
pub const MAX_ANGLE_DELTA: f64 = 360.0;
pub const MIN_LINK_LENGTH: u32 = 1;
pub const MAX_LINK_LENGTH: u32 = 1_000_000;
pub const MIN_FPS: u32 = 1;
pub const MAX_FPS: u32 = 1_000;
pub const MAX_AA_LEVEL: u32 = 16;

const ANGLE_STEP: f64 = 0.1;
const TENTHS: f64 = 10.0;

/// Numeric parameters that can be adjusted while the animation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamField {
    AngleDelta,
    LinkLength,
    FpsLimit,
    AaLevel,
}

impl ParamField {
    fn base_step(self) -> f64 {
        match self {
            Self::AngleDelta => ANGLE_STEP,
            Self::LinkLength | Self::FpsLimit | Self::AaLevel => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    pub fn sign(self) -> f64 {
        match self {
            Self::Increase => 1.0,
            Self::Decrease => -1.0,
        }
    }
}

/// Step multiplier selected by the modifier keys held during an adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Multiplier {
    #[default]
    One,
    Ten,
    Hundred,
}

impl Multiplier {
    pub fn factor(self) -> f64 {
        match self {
            Self::One => 1.0,
            Self::Ten => 10.0,
            Self::Hundred => 100.0,
        }
    }

    /// Each held shift key multiplies the step by ten.
    pub fn from_shift_keys(left: bool, right: bool) -> Self {
        match (left, right) {
            (true, true) => Self::Hundred,
            (true, false) | (false, true) => Self::Ten,
            (false, false) => Self::One,
        }
    }
}

/// How the trail bounds its history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RetentionMode {
    /// Keep at most `link_length` links.
    #[default]
    Cutoff,
    /// Keep links while their age-based opacity is visible.
    Fade,
}

impl RetentionMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Cutoff => Self::Fade,
            Self::Fade => Self::Cutoff,
        }
    }
}

/// Parameter store for the animation. Every setter clamps, so a value read
/// back from here is always inside its documented range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameters {
    angle_delta_deg: f64,
    link_length: u32,
    fps_limit: u32,
    aa_level: u32,
    paused: bool,
    retention: RetentionMode,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            angle_delta_deg: 1.0,
            link_length: 360,
            fps_limit: 60,
            aa_level: 8,
            paused: false,
            retention: RetentionMode::Cutoff,
        }
    }
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn angle_delta_deg(&self) -> f64 {
        self.angle_delta_deg
    }

    pub fn link_length(&self) -> u32 {
        self.link_length
    }

    pub fn fps_limit(&self) -> u32 {
        self.fps_limit
    }

    pub fn aa_level(&self) -> u32 {
        self.aa_level
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    pub fn retention(&self) -> RetentionMode {
        self.retention
    }

    /// Current value of a numeric field.
    pub fn get(&self, field: ParamField) -> f64 {
        match field {
            ParamField::AngleDelta => self.angle_delta_deg,
            ParamField::LinkLength => f64::from(self.link_length),
            ParamField::FpsLimit => f64::from(self.fps_limit),
            ParamField::AaLevel => f64::from(self.aa_level),
        }
    }

    /// Moves `field` by `direction * base_step * multiplier` and returns the
    /// clamped result. The angle step lands on the 0.1 degree grid so
    /// repeated steps cannot drift.
    pub fn adjust(&mut self, field: ParamField, direction: Direction, multiplier: Multiplier) -> f64 {
        let delta = direction.sign() * field.base_step() * multiplier.factor();
        let mut value = self.get(field) + delta;
        if field == ParamField::AngleDelta {
            value = (value * TENTHS).round() / TENTHS;
        }
        self.set(field, value)
    }

    /// Sets `field` directly and returns the clamped result.
    pub fn set(&mut self, field: ParamField, value: f64) -> f64 {
        match field {
            ParamField::AngleDelta => {
                let value = if value.is_nan() { MIN_ANGLE_DELTA } else { value };
                self.angle_delta_deg = value.clamp(MIN_ANGLE_DELTA, MAX_ANGLE_DELTA);
            }
            ParamField::LinkLength => {
                self.link_length = clamp_u32(value, MIN_LINK_LENGTH, MAX_LINK_LENGTH);
            }
            ParamField::FpsLimit => {
                self.fps_limit = clamp_u32(value, MIN_FPS, MAX_FPS);
            }
            ParamField::AaLevel => {
                self.aa_level = clamp_u32(value, 0, MAX_AA_LEVEL);
            }
        }
        self.get(field)
    }

    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn toggle_retention(&mut self) -> RetentionMode {
        self.retention = self.retention.toggled();
        self.retention
    }

    pub fn set_retention(&mut self, mode: RetentionMode) {
        self.retention = mode;
    }
}

fn clamp_u32(value: f64, min: u32, max: u32) -> u32 {
    if value.is_nan() {
        return min;
    }
    value.round().clamp(f64::from(min), f64::from(max)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIELDS: [ParamField; 4] = [
        ParamField::AngleDelta,
        ParamField::LinkLength,
        ParamField::FpsLimit,
        ParamField::AaLevel,
    ];

    fn in_range(params: &Parameters) -> bool {
        (MIN_ANGLE_DELTA..=MAX_ANGLE_DELTA).contains(&params.angle_delta_deg())
            && (MIN_LINK_LENGTH..=MAX_LINK_LENGTH).contains(&params.link_length())
            && (MIN_FPS..=MAX_FPS).contains(&params.fps_limit())
            && params.aa_level() <= MAX_AA_LEVEL
    }

    #[test]
    fn set_keeps_exact_angle_and_adjust_returns_to_grid() {
        let mut params = Parameters::default();
        assert_eq!(params.set(ParamField::AngleDelta, 1.234), 1.234);
        assert_eq!(params.set(ParamField::AngleDelta, 0.01), MIN_ANGLE_DELTA);

        params.set(ParamField::AngleDelta, 1.234);
        assert_eq!(
            params.adjust(ParamField::AngleDelta, Direction::Increase, Multiplier::One),
            1.3
        );
    }

    #[test]
    fn adjustments_never_leave_range() {
        let mut params = Parameters::new();
        for field in FIELDS {
            for direction in [Direction::Decrease, Direction::Increase] {
                for multiplier in [Multiplier::One, Multiplier::Ten, Multiplier::Hundred] {
                    for _ in 0..20_000 {
                        params.adjust(field, direction, multiplier);
                    }
                    assert!(in_range(&params), "{field:?} {direction:?} {multiplier:?}");
                }
            }
        }
    }

    #[test]
    fn link_length_stays_at_one_when_pushed_below() {
        let mut params = Parameters::new();
        params.set(ParamField::LinkLength, 1.0);
        for _ in 0..5 {
            assert_eq!(
                params.adjust(ParamField::LinkLength, Direction::Decrease, Multiplier::Hundred),
                1.0
            );
        }
        assert_eq!(params.link_length(), 1);
    }

    #[test]
    fn angle_steps_do_not_accumulate_drift() {
        let mut params = Parameters::new();
        params.set(ParamField::AngleDelta, 1.0);
        for _ in 0..7 {
            params.adjust(ParamField::AngleDelta, Direction::Increase, Multiplier::One);
        }
        assert_eq!(params.angle_delta_deg(), 1.7);
        params.adjust(ParamField::AngleDelta, Direction::Decrease, Multiplier::Ten);
        assert_eq!(params.angle_delta_deg(), 0.7);
        params.adjust(ParamField::AngleDelta, Direction::Decrease, Multiplier::Hundred);
        assert_eq!(params.angle_delta_deg(), MIN_ANGLE_DELTA);
    }

    #[test]
    fn aa_level_is_capped_at_sixteen() {
        let mut params = Parameters::new();
        assert_eq!(params.set(ParamField::AaLevel, 40.0), 16.0);
        assert_eq!(params.set(ParamField::AaLevel, -3.0), 0.0);
    }

    #[test]
    fn nan_falls_back_to_minimum() {
        let mut params = Parameters::new();
        params.set(ParamField::FpsLimit, f64::NAN);
        params.set(ParamField::AngleDelta, f64::NAN);
        assert_eq!(params.fps_limit(), MIN_FPS);
        assert_eq!(params.angle_delta_deg(), MIN_ANGLE_DELTA);
    }

    #[test]
    fn toggles_are_two_valued() {
        let mut params = Parameters::new();
        assert!(params.toggle_pause());
        assert!(!params.toggle_pause());
        assert_eq!(params.toggle_retention(), RetentionMode::Fade);
        assert_eq!(params.toggle_retention(), RetentionMode::Cutoff);
    }

    #[test]
    fn shift_keys_select_multiplier() {
        assert_eq!(Multiplier::from_shift_keys(false, false), Multiplier::One);
        assert_eq!(Multiplier::from_shift_keys(true, false), Multiplier::Ten);
        assert_eq!(Multiplier::from_shift_keys(true, true), Multiplier::Hundred);
    }
}
