/// Unit attached to a [`Length`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LengthUnit {
    /// User units.
    Px,
    /// Percentage of the current viewport (`50.0` is 50%).
    Percent,
    /// Multiple of the font size.
    Em,
    /// Half of an em.
    Ex,
    /// Inches.
    In,
    /// Centimeters.
    Cm,
    /// Millimeters.
    Mm,
    /// Points (1/72 in).
    Pt,
    /// Picas (1/6 in).
    Pc,
}

/// Axis a length is measured along; decides which viewport side a percentage uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LengthDir {
    /// Percentages of the viewport width.
    Horizontal,
    /// Percentages of the viewport height.
    Vertical,
    /// Percentages of the normalized diagonal `sqrt((w² + h²) / 2)`.
    Both,
}

/// A number with a unit, resolved to user units at draw time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Length {
    /// Magnitude in `unit`.
    pub value: f64,
    /// Unit of `value`.
    pub unit: LengthUnit,
}

impl Length {
    /// Length in an explicit unit.
    pub const fn new(value: f64, unit: LengthUnit) -> Self {
        Self { value, unit }
    }

    /// Length in user units.
    pub const fn px(value: f64) -> Self {
        Self::new(value, LengthUnit::Px)
    }

    /// Percentage length; `percent(100.0)` spans the whole viewport.
    pub const fn percent(value: f64) -> Self {
        Self::new(value, LengthUnit::Percent)
    }

    /// Zero user units.
    pub const fn zero() -> Self {
        Self::px(0.0)
    }

    /// Resolve to user units.
    pub fn normalize(&self, dir: LengthDir, params: &NormalizeParams) -> f64 {
        match self.unit {
            LengthUnit::Px => self.value,
            LengthUnit::Percent => {
                let (w, h) = params.viewport;
                let base = match dir {
                    LengthDir::Horizontal => w,
                    LengthDir::Vertical => h,
                    LengthDir::Both => ((w * w + h * h) / 2.0).sqrt(),
                };
                self.value / 100.0 * base
            }
            LengthUnit::Em => self.value * params.font_size,
            LengthUnit::Ex => self.value * params.font_size / 2.0,
            LengthUnit::In => self.value * params.dpi(dir),
            LengthUnit::Cm => self.value * params.dpi(dir) / 2.54,
            LengthUnit::Mm => self.value * params.dpi(dir) / 25.4,
            LengthUnit::Pt => self.value * params.dpi(dir) / 72.0,
            LengthUnit::Pc => self.value * params.dpi(dir) / 6.0,
        }
    }
}

impl Default for Length {
    fn default() -> Self {
        Self::zero()
    }
}

/// Everything a [`Length`] needs to resolve to user units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizeParams {
    /// Horizontal resolution.
    pub dpi_x: f64,
    /// Vertical resolution.
    pub dpi_y: f64,
    /// Top of the viewport stack as `(width, height)`.
    pub viewport: (f64, f64),
    /// Computed font size in user units.
    pub font_size: f64,
}

impl NormalizeParams {
    fn dpi(&self, dir: LengthDir) -> f64 {
        match dir {
            LengthDir::Horizontal => self.dpi_x,
            LengthDir::Vertical => self.dpi_y,
            LengthDir::Both => ((self.dpi_x * self.dpi_x + self.dpi_y * self.dpi_y) / 2.0).sqrt(),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/length.rs"]
mod tests;
