//! Render rules: how a token turns its value into padded text.
//!
//! A rule is written as a format spec, `[[fill]align][0][width][.precision][type]`:
//!
//! - `0=3d` pads integers to three digits with zeros after any sign
//! - `x>6` right-aligns in six characters, filling with `x`
//! - `^10` centres in ten characters, filling with spaces
//! - `.2f` renders floats with two decimals

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;
use winnow::ascii::digit1;
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;
use winnow::token::{any, one_of};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
    Center,
    /// Fill goes between a leading sign and the digits.
    SignAware,
}

impl Align {
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            '<' => Some(Align::Left),
            '>' => Some(Align::Right),
            '^' => Some(Align::Center),
            '=' => Some(Align::SignAware),
            _ => None,
        }
    }

    pub fn symbol(self) -> char {
        match self {
            Align::Left => '<',
            Align::Right => '>',
            Align::Center => '^',
            Align::SignAware => '=',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRule {
    pub fill: char,
    pub align: Option<Align>,
    pub width: Option<usize>,
    pub precision: Option<usize>,
    pub kind: Option<char>,
}

impl Default for RenderRule {
    fn default() -> Self {
        Self {
            fill: ' ',
            align: None,
            width: None,
            precision: None,
            kind: None,
        }
    }
}

impl RenderRule {
    pub fn padded(fill: char, align: Align, width: usize) -> Self {
        Self {
            fill,
            align: Some(align),
            width: Some(width),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: char) -> Self {
        self.kind = Some(kind);
        self
    }

    fn effective_align(&self, numeric: bool) -> Align {
        self.align
            .unwrap_or(if numeric { Align::Right } else { Align::Left })
    }

    /// Pad `text` up to the rule's width. Longer text is left untouched.
    pub fn pad(&self, text: &str, numeric: bool) -> String {
        let Some(width) = self.width else {
            return text.to_string();
        };
        let len = text.chars().count();
        if len >= width {
            return text.to_string();
        }

        let missing = width - len;
        let fill = |n: usize| std::iter::repeat(self.fill).take(n).collect::<String>();
        match self.effective_align(numeric) {
            Align::Left => format!("{}{}", text, fill(missing)),
            Align::Right => format!("{}{}", fill(missing), text),
            Align::Center => {
                let left = missing / 2;
                format!("{}{}{}", fill(left), text, fill(missing - left))
            }
            Align::SignAware => {
                if text.starts_with('-') || text.starts_with('+') {
                    let (sign, digits) = text.split_at(1);
                    format!("{}{}{}", sign, fill(missing), digits)
                } else {
                    format!("{}{}", fill(missing), text)
                }
            }
        }
    }

    /// Remove fill characters added by [`RenderRule::pad`].
    ///
    /// Padding can only have been added when the text is exactly `width`
    /// characters long, so any other length is returned unchanged. Text made
    /// entirely of fill characters is also returned unchanged.
    pub fn unpad<'t>(&self, text: &'t str, numeric: bool) -> Cow<'t, str> {
        let Some(width) = self.width else {
            return Cow::Borrowed(text);
        };
        if text.chars().count() != width {
            return Cow::Borrowed(text);
        }

        let fill = self.fill;
        let stripped: Cow<'t, str> = match self.effective_align(numeric) {
            Align::Left => Cow::Borrowed(text.trim_end_matches(fill)),
            Align::Right => Cow::Borrowed(text.trim_start_matches(fill)),
            Align::Center => Cow::Borrowed(text.trim_matches(fill)),
            Align::SignAware => {
                if text.starts_with('-') || text.starts_with('+') {
                    let (sign, digits) = text.split_at(1);
                    let digits = digits.trim_start_matches(fill);
                    if digits.is_empty() {
                        return Cow::Borrowed(text);
                    }
                    Cow::Owned(format!("{}{}", sign, digits))
                } else {
                    Cow::Borrowed(text.trim_start_matches(fill))
                }
            }
        };

        if stripped.is_empty() {
            Cow::Borrowed(text)
        } else {
            stripped
        }
    }
}

fn align(input: &mut &str) -> ModalResult<Align> {
    one_of(['<', '>', '^', '='])
        .map(|c| Align::from_symbol(c).unwrap_or(Align::Left))
        .parse_next(input)
}

fn fill_align(input: &mut &str) -> ModalResult<(Option<char>, Align)> {
    alt((
        (any, align).map(|(fill, align)| (Some(fill), align)),
        align.map(|align| (None, align)),
    ))
    .parse_next(input)
}

fn number(input: &mut &str) -> ModalResult<usize> {
    digit1.try_map(|s: &str| s.parse::<usize>()).parse_next(input)
}

fn render_rule(input: &mut &str) -> ModalResult<RenderRule> {
    let fill_align = opt(fill_align).parse_next(input)?;
    let zero = opt('0').parse_next(input)?;
    let width = opt(number).parse_next(input)?;
    let precision = opt(preceded('.', number)).parse_next(input)?;
    let kind = opt(one_of(['s', 'd', 'f'])).parse_next(input)?;

    let (fill, align) = match (fill_align, zero) {
        (Some((fill, align)), _) => (fill.unwrap_or(' '), Some(align)),
        (None, Some(_)) => ('0', Some(Align::SignAware)),
        (None, None) => (' ', None),
    };

    Ok(RenderRule {
        fill,
        align,
        width,
        precision,
        kind,
    })
}

impl FromStr for RenderRule {
    type Err = String;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let mut input = spec;
        match render_rule.parse_next(&mut input) {
            Ok(rule) if input.is_empty() => Ok(rule),
            Ok(_) => Err(format!(
                "unexpected {:?} in render rule {:?}",
                input, spec
            )),
            Err(e) => Err(format!("invalid render rule {:?}: {:?}", spec, e)),
        }
    }
}

impl fmt::Display for RenderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(align) = self.align {
            write!(f, "{}{}", self.fill, align.symbol())?;
        }
        if let Some(width) = self.width {
            write!(f, "{}", width)?;
        }
        if let Some(precision) = self.precision {
            write!(f, ".{}", precision)?;
        }
        if let Some(kind) = self.kind {
            write!(f, "{}", kind)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(spec: &str) -> RenderRule {
        spec.parse().unwrap()
    }

    #[test]
    fn test_parse_fill_align_width() {
        let r = rule("0=3d");
        assert_eq!(r.fill, '0');
        assert_eq!(r.align, Some(Align::SignAware));
        assert_eq!(r.width, Some(3));
        assert_eq!(r.kind, Some('d'));
    }

    #[test]
    fn test_parse_align_without_fill() {
        let r = rule("<10");
        assert_eq!(r.fill, ' ');
        assert_eq!(r.align, Some(Align::Left));
        assert_eq!(r.width, Some(10));
    }

    #[test]
    fn test_parse_zero_flag() {
        let r = rule("03");
        assert_eq!(r.fill, '0');
        assert_eq!(r.align, Some(Align::SignAware));
        assert_eq!(r.width, Some(3));
    }

    #[test]
    fn test_parse_precision() {
        let r = rule(".2f");
        assert_eq!(r.precision, Some(2));
        assert_eq!(r.kind, Some('f'));
        assert_eq!(r.width, None);
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(rule(""), RenderRule::default());
    }

    #[test]
    fn test_parse_rejects_trailing_input() {
        assert!("3x".parse::<RenderRule>().is_err());
        assert!("0=3q".parse::<RenderRule>().is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for spec in ["0=3d", "x>6", "a^5", ".2f", "s", ""] {
            assert_eq!(rule(spec).to_string(), spec);
        }
    }

    #[test]
    fn test_pad_alignments() {
        assert_eq!(rule("x>6").pad("abcd", false), "xxabcd");
        assert_eq!(rule("x<6").pad("abcd", false), "abcdxx");
        assert_eq!(rule("x^7").pad("abcd", false), "xabcdxx");
        assert_eq!(rule("0=4").pad("-12", true), "-012");
        assert_eq!(rule("03").pad("1234", true), "1234");
    }

    #[test]
    fn test_pad_default_alignment_depends_on_type() {
        assert_eq!(rule("5").pad("ab", false), "ab   ");
        assert_eq!(rule("5").pad("12", true), "   12");
    }

    #[test]
    fn test_unpad_only_at_exact_width() {
        let r = RenderRule::padded('0', Align::Right, 5);
        assert_eq!(r.unpad("000ab", false), "ab");
        assert_eq!(r.unpad("0000ab", false), "0000ab");
        assert_eq!(r.unpad("00000", false), "00000");

        let r = RenderRule::padded('0', Align::Left, 5);
        assert_eq!(r.unpad("ab000", false), "ab");

        let r = RenderRule::padded('0', Align::SignAware, 4);
        assert_eq!(r.unpad("-012", true), "-12");
    }
}
