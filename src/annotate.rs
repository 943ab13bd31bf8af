//! Backend independent geometry and strings for annotating analysis plots
//!
//! Nothing here draws. Positions come back in data coordinates and labels as mathtext strings,
//! ready for whichever plotting backend renders the figure.

use std::fmt::LowerExp;
use std::str::FromStr;

use num_traits::Float;
use pretty_dtoa::{dtoa, FmtFloatConfig};

use crate::rounding::{self, round_to_significant};
use crate::{Error, Result};

/// Gap between a label and the edges of the axes, as a fraction of the axes
pub const LABEL_MARGIN: f64 = 1.0 / 20.0;

/// Significant figures shown for a parameter without an uncertainty
pub const COMPACT_FIGURES: u32 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scale {
    Linear,
    Log,
}

/// The visible range of one axis
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Axis {
    min: f64,
    max: f64,
    scale: Scale,
}

impl Axis {
    /// # Errors
    /// Returns [`Error::InvalidAxis`] if a limit is not finite, or if a log axis has a limit that
    /// is not positive.
    pub fn new(min: f64, max: f64, scale: Scale) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() {
            return Err(Error::InvalidAxis(format!(
                "limits must be finite, got {min} and {max}"
            )));
        }
        if scale == Scale::Log && (min <= 0. || max <= 0.) {
            return Err(Error::InvalidAxis(format!(
                "log axis limits must be positive, got {min} and {max}"
            )));
        }
        Ok(Self { min, max, scale })
    }

    /// # Errors
    /// See [`Axis::new`].
    pub fn linear(min: f64, max: f64) -> Result<Self> {
        Self::new(min, max, Scale::Linear)
    }

    /// # Errors
    /// See [`Axis::new`].
    pub fn log(min: f64, max: f64) -> Result<Self> {
        Self::new(min, max, Scale::Log)
    }

    pub const fn scale(&self) -> Scale {
        self.scale
    }

    /// The data coordinate `fraction` of the way along the axis, measured in the axis scale
    pub fn at_fraction(&self, fraction: f64) -> f64 {
        match self.scale {
            Scale::Linear => fraction.mul_add(self.max - self.min, self.min),
            Scale::Log => fraction
                .mul_add(self.max.ln() - self.min.ln(), self.min.ln())
                .exp(),
        }
    }

    /// Arithmetic mean on a linear axis, geometric mean on a log axis
    pub fn midpoint(&self) -> f64 {
        match self.scale {
            Scale::Linear => (self.min + self.max) / 2.,
            Scale::Log => (self.min * self.max).sqrt(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Location {
    LowerLeft,
    LowerRight,
    UpperLeft,
    UpperRight,
}

impl FromStr for Location {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "lower left" => Ok(Self::LowerLeft),
            "lower right" => Ok(Self::LowerRight),
            "upper left" => Ok(Self::UpperLeft),
            "upper right" => Ok(Self::UpperRight),
            other => Err(Error::InvalidLocation(other.to_owned())),
        }
    }
}

/// Rendered size of a piece of text as a fraction of the axes it sits in
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TextExtent {
    pub width: f64,
    pub height: f64,
}

/// Where to centre a label so it sits in the requested corner of the axes
///
/// The label keeps [`LABEL_MARGIN`] from both edges of its corner. Text wider (or taller) than
/// twice the margin is pushed in by half its size so it stays inside the axes.
pub fn label_anchor(x: &Axis, y: &Axis, location: Location, extent: TextExtent) -> (f64, f64) {
    let margin = |size: f64| {
        if size / 2. > LABEL_MARGIN {
            size / 2. + LABEL_MARGIN
        } else {
            LABEL_MARGIN
        }
    };
    let (margin_x, margin_y) = (margin(extent.width), margin(extent.height));

    let fraction_x = match location {
        Location::LowerLeft | Location::UpperLeft => margin_x,
        Location::LowerRight | Location::UpperRight => 1. - margin_x,
    };
    let fraction_y = match location {
        Location::LowerLeft | Location::LowerRight => margin_y,
        Location::UpperLeft | Location::UpperRight => 1. - margin_y,
    };

    (x.at_fraction(fraction_x), y.at_fraction(fraction_y))
}

/// Mathtext label for a fitted parameter, e.g. `$\alpha = 3.1 \pm 0.2$`
///
/// `symbol` is a mathtext command name without its backslash. With an uncertainty both numbers
/// are rounded to matching significant figures, without one the value is shown to
/// [`COMPACT_FIGURES`] figures.
///
/// # Errors
/// Returns [`Error::InvalidInput`] for a zero uncertainty or a non-finite number.
pub fn parameter_label<E: Float + LowerExp>(
    symbol: &str,
    value: E,
    uncertainty: Option<E>,
) -> Result<String> {
    if let Some(uncertainty) = uncertainty {
        let rounded = rounding::format(value, Some(uncertainty), 1)?;
        let uncertainty = rounded.uncertainty_display().unwrap_or_default();
        Ok(format!(
            r"$\{symbol} = {} \pm {uncertainty}$",
            rounded.value_display()
        ))
    } else {
        Ok(format!(r"$\{symbol} = {}$", compact(value, COMPACT_FIGURES)?))
    }
}

/// `value` as Python's `"{:1.3}"` shows it, for `significant` figures
///
/// Fixed notation keeps at least one place after the point. Scientific notation takes over once
/// the leading digit sits below `1e-4` or at `10^(significant - 1)` and above, e.g. `120` to three
/// figures is `1.2e+02`.
///
/// # Errors
/// See [`round_to_significant`].
pub fn compact<E: Float + LowerExp>(value: E, significant: u32) -> Result<String> {
    let rounded = round_to_significant(value, significant)?;
    if rounded.is_zero() {
        return Ok("0.0".to_owned());
    }
    let number = value
        .to_f64()
        .ok_or_else(|| Error::InvalidInput(format!("{value:e} does not fit in an f64")))?;

    // the switch is decided after rounding, so 99.96 becomes 1e+02 rather than 100.0
    let leading = rounded.decimal_exponent() + position(rounded.digits().len()) - 1;
    let upper = i32::try_from(significant).unwrap_or(i32::MAX) - 1;
    let config = FmtFloatConfig::default()
        .max_significant_digits(u8::try_from(significant).unwrap_or(u8::MAX))
        .radix_point('.')
        .round();

    if (-4..upper).contains(&leading) {
        return Ok(dtoa(number, config.force_no_e_notation().add_point_zero(true)));
    }

    let scientific = dtoa(number, config.force_e_notation().add_point_zero(false));
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return Ok(scientific);
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return Ok(scientific);
    };
    let mantissa = mantissa.strip_suffix(".0").unwrap_or(mantissa);
    let sign = if exponent < 0 { '-' } else { '+' };
    Ok(format!("{mantissa}e{sign}{:02}", exponent.unsigned_abs()))
}

fn position(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

/// A diagonal watermark across the middle of the axes
#[derive(Clone, Debug, PartialEq)]
pub struct Watermark {
    pub text: String,
    /// Centre of the text in data coordinates
    pub position: (f64, f64),
    /// Counter-clockwise, in degrees
    pub rotation: f64,
    pub alpha: f64,
    pub color: String,
    pub size: f64,
}

impl Watermark {
    /// `PRELIMINARY` along the diagonal of axes drawn `width` by `height` (any unit, only the
    /// ratio matters)
    ///
    /// # Errors
    /// Returns [`Error::InvalidAxis`] unless both dimensions are positive.
    pub fn preliminary(x: &Axis, y: &Axis, width: f64, height: f64) -> Result<Self> {
        if !(width > 0. && height > 0.) {
            return Err(Error::InvalidAxis(format!(
                "axes must have a positive size, got {width} by {height}"
            )));
        }
        Ok(Self {
            text: "PRELIMINARY".to_owned(),
            position: (x.midpoint(), y.midpoint()),
            rotation: (height / width).atan().to_degrees(),
            alpha: 0.5,
            color: "gray".to_owned(),
            size: 50.,
        })
    }
}

/// Rows and columns of a figure holding one panel per data set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridShape {
    nrows: usize,
    ncols: usize,
    panels: usize,
}

impl GridShape {
    /// Choose a grid for `panels` panels, filling in whichever dimensions are not given
    ///
    /// With neither given the grid is square with side `ceil(panels / 2)`, widened to 2x2 for two
    /// panels. With one given the other is `ceil(panels / 2) + 1`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidGrid`] if the grid has fewer cells than panels.
    pub fn for_panels(panels: usize, nrows: Option<usize>, ncols: Option<usize>) -> Result<Self> {
        let half = panels % 2 + panels / 2;
        let (nrows, ncols) = match (nrows, ncols) {
            (None, None) if panels == 2 => (half + 1, half + 1),
            (None, None) => (half, half),
            (Some(nrows), None) => (nrows, half + 1),
            (None, Some(ncols)) => (half + 1, ncols),
            (Some(nrows), Some(ncols)) => (nrows, ncols),
        };
        if nrows.saturating_mul(ncols) < panels {
            return Err(Error::InvalidGrid {
                panels,
                nrows,
                ncols,
            });
        }
        Ok(Self {
            nrows,
            ncols,
            panels,
        })
    }

    pub const fn nrows(&self) -> usize {
        self.nrows
    }

    pub const fn ncols(&self) -> usize {
        self.ncols
    }

    pub const fn panels(&self) -> usize {
        self.panels
    }

    /// Cells left empty, which a backend should remove from the figure
    pub const fn unused(&self) -> usize {
        self.nrows.saturating_mul(self.ncols).saturating_sub(self.panels)
    }

    /// Cells in row-major order as `(row, column, panel)`, with `None` for unused cells
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Option<usize>)> + '_ {
        let count = if self.ncols == 0 {
            0
        } else {
            self.nrows.saturating_mul(self.ncols)
        };
        (0..count).map(|index| {
            let panel = (index < self.panels).then_some(index);
            (index / self.ncols, index % self.ncols, panel)
        })
    }
}
