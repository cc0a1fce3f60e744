//! Exact decimal numbers
//!
//! Backing representation for number literals that must survive exactly as
//! parsed. A `DecNumber` keeps the decimal coefficient and exponent from the
//! source text, so `1.10` and `1.1` compare equal but print differently.
//!
//! The parse/print forms follow the general decimal arithmetic convention:
//! plain notation while `exponent <= 0` and the adjusted exponent is `>= -6`,
//! exponential notation otherwise. Trailing zeros in the coefficient are
//! never trimmed.
//!
//! The decimal context (coefficient precision, exponent range) is
//! thread-local, created lazily on first use and torn down by the
//! thread-local destructor at thread exit.

use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;

/// Context limits for parsing decimal literals.
///
/// Coefficients longer than `digits` are rounded (half-even); values whose
/// adjusted exponent falls outside `[emin, emax]` become zero or infinity.
#[derive(Debug, Clone)]
pub struct DecContext {
    pub digits: usize,
    pub emax: i32,
    pub emin: i32,
}

impl Default for DecContext {
    fn default() -> Self {
        Self {
            digits: 999_999_999,
            emax: 999_999_999,
            emin: -999_999_999,
        }
    }
}

thread_local! {
    /// Thread-local decimal context, lazily initialized on first use
    static DEC_CTX: RefCell<Option<DecContext>> = const { RefCell::new(None) };
}

/// Run `f` with this thread's decimal context, creating it if needed.
pub(crate) fn with_dec_ctx<R>(f: impl FnOnce(&DecContext) -> R) -> R {
    DEC_CTX.with(|slot| {
        let mut slot = slot.borrow_mut();
        let ctx = slot.get_or_insert_with(DecContext::default);
        f(ctx)
    })
}

/// Number class after parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DecClass {
    Finite,
    Infinite,
    /// `payload` is set when the NaN carried nonzero diagnostic digits
    Nan { payload: bool },
}

/// The literal did not parse as a decimal number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DecSyntaxError;

impl fmt::Display for DecSyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decimal literal")
    }
}

/// An exact decimal value: sign, coefficient digits, and exponent.
///
/// Invariants: `digits` is never empty, holds values `0..=9` most
/// significant first, and has no leading zeros unless the coefficient is
/// exactly `[0]`. For `Infinite` and `Nan` the coefficient is `[0]`.
#[derive(Debug, Clone)]
pub(crate) struct DecNumber {
    sign: bool,
    exponent: i32,
    digits: Vec<u8>,
    class: DecClass,
}

impl DecNumber {
    pub(crate) fn class(&self) -> DecClass {
        self.class
    }

    pub(crate) fn is_zero(&self) -> bool {
        self.class == DecClass::Finite && self.digits == [0]
    }

    fn special(sign: bool, class: DecClass) -> Self {
        Self {
            sign,
            exponent: 0,
            digits: vec![0],
            class,
        }
    }

    /// Parse a decimal literal under the given context.
    pub(crate) fn parse(text: &str, ctx: &DecContext) -> Result<Self, DecSyntaxError> {
        let bytes = text.as_bytes();
        let mut pos = 0;
        let sign = match bytes.first() {
            Some(b'-') => {
                pos += 1;
                true
            }
            Some(b'+') => {
                pos += 1;
                false
            }
            _ => false,
        };
        let rest = &text[pos..];

        if rest.eq_ignore_ascii_case("inf") || rest.eq_ignore_ascii_case("infinity") {
            return Ok(Self::special(sign, DecClass::Infinite));
        }
        for prefix in [b"snan".as_slice(), b"nan".as_slice()] {
            let rb = rest.as_bytes();
            if rb.len() >= prefix.len() && rb[..prefix.len()].eq_ignore_ascii_case(prefix) {
                let payload = &rb[prefix.len()..];
                if !payload.iter().all(|b| b.is_ascii_digit()) {
                    return Err(DecSyntaxError);
                }
                let nonzero = payload.iter().any(|&b| b != b'0');
                return Ok(Self::special(sign, DecClass::Nan { payload: nonzero }));
            }
        }

        let mut digits: Vec<u8> = Vec::with_capacity(rest.len());
        let mut frac_len: i64 = 0;
        let mut seen_point = false;
        let mut seen_digit = false;
        let mut iter = rest.bytes().peekable();
        while let Some(&b) = iter.peek() {
            match b {
                b'0'..=b'9' => {
                    digits.push(b - b'0');
                    if seen_point {
                        frac_len += 1;
                    }
                    seen_digit = true;
                    iter.next();
                }
                b'.' if !seen_point => {
                    seen_point = true;
                    iter.next();
                }
                _ => break,
            }
        }
        if !seen_digit {
            return Err(DecSyntaxError);
        }

        let mut exp_part: i64 = 0;
        if let Some(&b) = iter.peek() {
            if b != b'e' && b != b'E' {
                return Err(DecSyntaxError);
            }
            iter.next();
            let exp_sign = match iter.peek() {
                Some(b'-') => {
                    iter.next();
                    true
                }
                Some(b'+') => {
                    iter.next();
                    false
                }
                _ => false,
            };
            let mut any = false;
            for b in iter.by_ref() {
                if !b.is_ascii_digit() {
                    return Err(DecSyntaxError);
                }
                any = true;
                // saturate well past any representable exponent
                exp_part = (exp_part * 10 + i64::from(b - b'0')).min(4_000_000_000);
            }
            if !any {
                return Err(DecSyntaxError);
            }
            if exp_sign {
                exp_part = -exp_part;
            }
        }

        let mut exponent = exp_part - frac_len;

        // strip leading zeros, keeping at least one digit
        let lead = digits.iter().take_while(|&&d| d == 0).count();
        let keep_from = lead.min(digits.len() - 1);
        digits.drain(..keep_from);

        if digits == [0] {
            let exponent = exponent.clamp(i64::from(ctx.emin), i64::from(ctx.emax)) as i32;
            return Ok(Self {
                sign,
                exponent,
                digits,
                class: DecClass::Finite,
            });
        }

        if digits.len() > ctx.digits {
            let dropped = digits.len() - ctx.digits;
            exponent += dropped as i64;
            if round_half_even(&mut digits, ctx.digits) {
                exponent += 1;
            }
        }

        let adjusted = exponent + digits.len() as i64 - 1;
        if adjusted > i64::from(ctx.emax) {
            return Ok(Self::special(sign, DecClass::Infinite));
        }
        if adjusted < i64::from(ctx.emin) {
            return Ok(Self {
                sign,
                exponent: ctx.emin,
                digits: vec![0],
                class: DecClass::Finite,
            });
        }

        Ok(Self {
            sign,
            exponent: exponent as i32,
            digits,
            class: DecClass::Finite,
        })
    }

    pub(crate) fn abs(&self) -> Self {
        let mut r = self.clone();
        r.sign = false;
        r
    }

    pub(crate) fn negate(&self) -> Self {
        let mut r = self.clone();
        r.sign = !r.sign;
        r
    }

    /// Exact comparison. `-0` and `0` are equal; infinities of the same
    /// sign are equal. NaNs are rejected before construction and never
    /// reach this point.
    pub(crate) fn cmp(&self, other: &Self) -> Ordering {
        debug_assert!(!matches!(self.class, DecClass::Nan { .. }));
        debug_assert!(!matches!(other.class, DecClass::Nan { .. }));

        match (self.is_zero(), other.is_zero()) {
            (true, true) => return Ordering::Equal,
            (true, false) => {
                return if other.sign {
                    Ordering::Greater
                } else {
                    Ordering::Less
                };
            }
            (false, true) => {
                return if self.sign {
                    Ordering::Less
                } else {
                    Ordering::Greater
                };
            }
            (false, false) => {}
        }
        if self.sign != other.sign {
            return if self.sign {
                Ordering::Less
            } else {
                Ordering::Greater
            };
        }
        let mag = self.cmp_magnitude(other);
        if self.sign { mag.reverse() } else { mag }
    }

    fn cmp_magnitude(&self, other: &Self) -> Ordering {
        match (self.class, other.class) {
            (DecClass::Infinite, DecClass::Infinite) => return Ordering::Equal,
            (DecClass::Infinite, _) => return Ordering::Greater,
            (_, DecClass::Infinite) => return Ordering::Less,
            _ => {}
        }
        let a_adj = i64::from(self.exponent) + self.digits.len() as i64 - 1;
        let b_adj = i64::from(other.exponent) + other.digits.len() as i64 - 1;
        match a_adj.cmp(&b_adj) {
            Ordering::Equal => {}
            ord => return ord,
        }
        // same adjusted exponent: compare digit-by-digit, shorter side
        // padded with zeros
        let n = self.digits.len().max(other.digits.len());
        for i in 0..n {
            let da = self.digits.get(i).copied().unwrap_or(0);
            let db = other.digits.get(i).copied().unwrap_or(0);
            match da.cmp(&db) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }
        Ordering::Equal
    }

    /// Convert to the nearest `f64`. Goes through the standard float
    /// parser, which rounds correctly for any digit count.
    pub(crate) fn to_f64(&self) -> f64 {
        match self.class {
            DecClass::Infinite => {
                if self.sign {
                    f64::NEG_INFINITY
                } else {
                    f64::INFINITY
                }
            }
            DecClass::Nan { .. } => f64::NAN,
            DecClass::Finite => {
                if self.is_zero() {
                    return if self.sign { -0.0 } else { 0.0 };
                }
                let mut s = String::with_capacity(self.digits.len() + 16);
                if self.sign {
                    s.push('-');
                }
                for &d in &self.digits {
                    s.push((b'0' + d) as char);
                }
                s.push('e');
                s.push_str(&self.exponent.to_string());
                s.parse::<f64>().unwrap_or(f64::NAN)
            }
        }
    }

    /// Canonical string form, preserving the parsed precision.
    pub(crate) fn to_literal(&self) -> String {
        let mut out = String::with_capacity(self.digits.len() + 8);
        if self.sign {
            out.push('-');
        }
        match self.class {
            DecClass::Infinite => {
                out.push_str("Infinity");
                return out;
            }
            DecClass::Nan { .. } => {
                out.push_str("NaN");
                return out;
            }
            DecClass::Finite => {}
        }

        let n = self.digits.len() as i64;
        let e = i64::from(self.exponent);
        let adjusted = e + n - 1;
        let digit_char = |d: u8| (b'0' + d) as char;

        if e <= 0 && adjusted >= -6 {
            if e == 0 {
                for &d in &self.digits {
                    out.push(digit_char(d));
                }
            } else if n > -e {
                let point = (n + e) as usize;
                for &d in &self.digits[..point] {
                    out.push(digit_char(d));
                }
                out.push('.');
                for &d in &self.digits[point..] {
                    out.push(digit_char(d));
                }
            } else {
                out.push_str("0.");
                for _ in 0..(-e - n) {
                    out.push('0');
                }
                for &d in &self.digits {
                    out.push(digit_char(d));
                }
            }
        } else {
            out.push(digit_char(self.digits[0]));
            if n > 1 {
                out.push('.');
                for &d in &self.digits[1..] {
                    out.push(digit_char(d));
                }
            }
            out.push('E');
            if adjusted >= 0 {
                out.push('+');
            }
            out.push_str(&adjusted.to_string());
        }
        out
    }
}

/// Round the coefficient to `keep` digits, half-even, in place.
///
/// Returns true when the coefficient rolled over (999.. -> 100..), in
/// which case the caller must bump the exponent by one.
fn round_half_even(digits: &mut Vec<u8>, keep: usize) -> bool {
    let first_dropped = digits[keep];
    let tail_nonzero = digits[keep + 1..].iter().any(|&d| d != 0);
    digits.truncate(keep);
    let round_up = match first_dropped {
        0..=4 => false,
        6..=9 => true,
        5 => tail_nonzero || digits[keep - 1] % 2 == 1,
        _ => unreachable!(),
    };
    if !round_up {
        return false;
    }
    let mut i = keep;
    loop {
        if i == 0 {
            // every digit was a 9: the result is 100..0 one order up
            digits.fill(0);
            digits[0] = 1;
            return true;
        }
        i -= 1;
        if digits[i] == 9 {
            digits[i] = 0;
        } else {
            digits[i] += 1;
            return false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> DecNumber {
        DecNumber::parse(s, &DecContext::default()).expect(s)
    }

    #[test]
    fn test_parse_and_print_plain() {
        for lit in ["0", "1", "42", "1.10", "0.5", "0.00", "100", "-1.5", "0.000001"] {
            assert_eq!(parse(lit).to_literal(), lit);
        }
    }

    #[test]
    fn test_parse_and_print_scientific() {
        assert_eq!(parse("1E+3").to_literal(), "1E+3");
        assert_eq!(parse("1.5E+20").to_literal(), "1.5E+20");
        assert_eq!(parse("1e-7").to_literal(), "1E-7");
        assert_eq!(parse("-2.50E+10").to_literal(), "-2.50E+10");
    }

    #[test]
    fn test_normalization_of_input_forms() {
        // leading zeros are dropped, trailing ones are not
        assert_eq!(parse("0001.10").to_literal(), "1.10");
        assert_eq!(parse("1.10e2").to_literal(), "110");
        assert_eq!(parse("+5").to_literal(), "5");
        assert_eq!(parse("0E+5").to_literal(), "0E+5");
    }

    #[test]
    fn test_syntax_errors() {
        let ctx = DecContext::default();
        for bad in ["", "-", ".", "1.2.3", "1e", "abc", "1x", "e5", "nan5x"] {
            assert!(DecNumber::parse(bad, &ctx).is_err(), "{bad:?}");
        }
    }

    #[test]
    fn test_specials() {
        assert_eq!(parse("Infinity").class(), DecClass::Infinite);
        assert_eq!(parse("-inf").class(), DecClass::Infinite);
        assert_eq!(parse("NaN").class(), DecClass::Nan { payload: false });
        assert_eq!(parse("nan0").class(), DecClass::Nan { payload: false });
        assert_eq!(parse("NaN42").class(), DecClass::Nan { payload: true });
        assert_eq!(parse("sNaN1").class(), DecClass::Nan { payload: true });
    }

    #[test]
    fn test_exponent_overflow_is_infinite() {
        assert_eq!(parse("1e1000000000").class(), DecClass::Infinite);
        assert!(parse("1e-1000000001").is_zero());
    }

    #[test]
    fn test_cmp_exact() {
        assert_eq!(parse("1.10").cmp(&parse("1.1")), Ordering::Equal);
        assert_eq!(parse("1.10").cmp(&parse("1.2")), Ordering::Less);
        assert_eq!(parse("-1.10").cmp(&parse("-1.2")), Ordering::Greater);
        assert_eq!(parse("0").cmp(&parse("-0")), Ordering::Equal);
        assert_eq!(parse("10").cmp(&parse("2")), Ordering::Greater);
        assert_eq!(parse("1e10").cmp(&parse("9e9")), Ordering::Greater);
        assert_eq!(parse("Infinity").cmp(&parse("1e999999998")), Ordering::Greater);
        assert_eq!(parse("-Infinity").cmp(&parse("Infinity")), Ordering::Less);
        assert_eq!(parse("Infinity").cmp(&parse("inf")), Ordering::Equal);
        // beyond double precision: these collapse to the same f64
        assert_eq!(
            parse("100000000000000000001").cmp(&parse("100000000000000000002")),
            Ordering::Less
        );
    }

    #[test]
    fn test_to_f64() {
        assert_eq!(parse("1.10").to_f64(), 1.1);
        assert_eq!(parse("-2.5e3").to_f64(), -2500.0);
        assert_eq!(parse("Infinity").to_f64(), f64::INFINITY);
        assert_eq!(parse("0.00").to_f64(), 0.0);
    }

    #[test]
    fn test_rounding_to_context_digits() {
        let ctx = DecContext {
            digits: 3,
            ..DecContext::default()
        };
        let n = DecNumber::parse("12345", &ctx).unwrap();
        assert_eq!(n.to_literal(), "1.23E+4");
        let n = DecNumber::parse("12351", &ctx).unwrap();
        assert_eq!(n.to_literal(), "1.24E+4");
        let n = DecNumber::parse("9995", &ctx).unwrap();
        assert_eq!(n.to_literal(), "1.00E+4");
        // ties go to even
        let n = DecNumber::parse("1245", &ctx).unwrap();
        assert_eq!(n.to_literal(), "1.24E+3");
        let n = DecNumber::parse("1235", &ctx).unwrap();
        assert_eq!(n.to_literal(), "1.24E+3");
    }
}
