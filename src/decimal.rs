use std::cmp::Ordering;
use std::fmt::LowerExp;
use std::iter;

use num_traits::Float;

/// A finite float held as its shortest round-trip decimal digits
///
/// Working on the decimal digits rather than on the binary value means `0.15` really has a `5`
/// in the hundredths place, so ties and carries are decided on the number the user wrote down.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Decimal {
    pub(crate) negative: bool,
    /// Significant digits, most significant first, without leading or trailing zeros. Empty for
    /// zero.
    pub(crate) digits: Vec<u8>,
    /// Power of ten of the leading digit
    pub(crate) leading_position: i32,
}

/// The digits kept after rounding to a resolution
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Retained {
    pub(crate) digits: Vec<u8>,
    /// Rounding up carried out of the leading digit (9 -> 10)
    pub(crate) carried: bool,
}

impl Decimal {
    /// Returns `None` for NaN and infinities
    pub(crate) fn from_float<E: Float + LowerExp>(value: E) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        let repr = format!("{value:e}");
        let (negative, repr) = repr
            .strip_prefix('-')
            .map_or((false, repr.as_str()), |rest| (true, rest));
        let (mantissa, exponent) = repr.split_once('e')?;
        let exponent: i32 = exponent.parse().ok()?;

        let mut digits = mantissa
            .bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect::<Vec<_>>();
        while digits.last() == Some(&0) {
            digits.pop();
        }
        if digits.first() == Some(&0) {
            // Only the zero mantissa can start with a zero
            digits.clear();
        }

        let leading_position = if digits.is_empty() { 0 } else { exponent };
        Some(Self {
            negative,
            digits,
            leading_position,
        })
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.digits.is_empty()
    }

    pub(crate) fn leading_digit(&self) -> u8 {
        self.digits.first().copied().unwrap_or(0)
    }

    /// Power of ten of the least significant non-zero digit
    pub(crate) fn last_position(&self) -> i32 {
        let trailing = i32::try_from(self.digits.len().saturating_sub(1)).unwrap_or(i32::MAX);
        self.leading_position.saturating_sub(trailing)
    }

    /// Round to a multiple of `10^resolution`
    ///
    /// Remainders above half a unit round up and below half round down. An exact half rounds up
    /// when the leading retained digit is odd and down when it is even. When nothing is retained
    /// the leading digit counts as zero.
    pub(crate) fn round_at(&self, resolution: i32) -> Retained {
        let kept = i64::from(self.leading_position) - i64::from(resolution) + 1;
        if self.is_zero() || kept < 0 {
            return Retained {
                digits: vec![],
                carried: false,
            };
        }
        let kept = usize::try_from(kept).unwrap_or(usize::MAX);

        let split = kept.min(self.digits.len());
        let (head, rest) = self.digits.split_at(split);
        let mut digits = head.to_vec();
        digits.extend(iter::repeat(0).take(kept - split));

        let leading = digits.first().copied().unwrap_or(0);
        let round_up = match compare_to_half(rest) {
            Ordering::Greater => true,
            Ordering::Less => false,
            Ordering::Equal => leading % 2 == 1,
        };
        if !round_up {
            return Retained {
                digits,
                carried: false,
            };
        }

        if digits.is_empty() {
            return Retained {
                digits: vec![1],
                carried: false,
            };
        }
        let carried = increment(&mut digits);
        Retained { digits, carried }
    }
}

/// Compare the fraction `0.d1 d2 d3 ...` with one half
fn compare_to_half(rest: &[u8]) -> Ordering {
    match rest.split_first() {
        None => Ordering::Less,
        Some((first, tail)) => match first.cmp(&5) {
            Ordering::Equal if tail.iter().any(|&d| d != 0) => Ordering::Greater,
            ordering => ordering,
        },
    }
}

/// Add one unit in the last place, returns whether the digit count grew
fn increment(digits: &mut Vec<u8>) -> bool {
    for digit in digits.iter_mut().rev() {
        if *digit == 9 {
            *digit = 0;
        } else {
            *digit += 1;
            return false;
        }
    }
    digits.insert(0, 1);
    true
}

/// Render digits scaled by `10^decimal_exponent` in fixed notation
///
/// Negative exponents give exactly `-decimal_exponent` places after the point, positive
/// exponents append that many zeros. Zero is never signed.
pub(crate) fn render(negative: bool, digits: &[u8], decimal_exponent: i32) -> String {
    let is_zero = digits.iter().all(|&d| d == 0);
    let mut body: String = digits
        .iter()
        .skip_while(|&&d| d == 0)
        .map(|&d| char::from(b'0' + d))
        .collect();

    let body = if decimal_exponent >= 0 {
        if is_zero {
            "0".to_owned()
        } else {
            body.extend(iter::repeat('0').take(decimal_exponent.unsigned_abs() as usize));
            body
        }
    } else {
        let places = decimal_exponent.unsigned_abs() as usize;
        if body.len() <= places {
            body.insert_str(0, &"0".repeat(places + 1 - body.len()));
        }
        let (integer, fraction) = body.split_at(body.len() - places);
        format!("{integer}.{fraction}")
    };

    if negative && !is_zero {
        format!("-{body}")
    } else {
        body
    }
}
