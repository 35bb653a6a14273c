//! Renders an amount as the uppercase Chinese numeral string used on billing documents, e.g.
//! `1000500` -> `壹佰万零伍佰元整`.

const DIGITS: [char; 10] = ['零', '壹', '贰', '叁', '肆', '伍', '陆', '柒', '捌', '玖'];
const IN_SECTION_UNITS: [&str; 4] = ["", "拾", "佰", "仟"];
const TEN_THOUSAND: &str = "万";
const HUNDRED_MILLION: &str = "亿";
const ZERO: &str = "零";
const CURRENCY_UNIT: &str = "元";
const EVEN_SUFFIX: &str = "整";

/// The fixed rendering of a zero amount.
pub const ZERO_AMOUNT: &str = "零元整";

/// One token of the rendering, produced while walking digits from least significant to most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// A nonzero digit together with its positional unit.
    Digit(u8, usize),
    /// A placeholder `零`.
    Zero,
    /// The bare `万` or `亿` of an all-zero position that starts a four-digit section.
    Section(&'static str),
}

impl Token {
    fn is_placeholder(&self) -> bool {
        matches!(self, Token::Zero | Token::Section(_))
    }

    fn push_to(&self, s: &mut String) {
        match *self {
            Token::Digit(digit, position) => {
                s.push(DIGITS[digit as usize]);
                s.push_str(unit(position));
            }
            Token::Zero => s.push_str(ZERO),
            Token::Section(unit) => s.push_str(unit),
        }
    }
}

/// The unit for a decimal position, where position 0 is the ones digit.
fn unit(position: usize) -> &'static str {
    if position > 0 && position % 4 == 0 {
        section_unit(position)
    } else {
        IN_SECTION_UNITS[position % 4]
    }
}

fn section_unit(position: usize) -> &'static str {
    if (position / 4) % 2 == 1 {
        TEN_THOUSAND
    } else {
        HUNDRED_MILLION
    }
}

/// Converts `amount` into its uppercase numeral representation ending in `元整`.
///
/// Negative and fractional amounts are not representable; callers holding a signed total must
/// reject negatives before calling this.
pub fn to_uppercase_numeral(amount: u64) -> String {
    if amount == 0 {
        return ZERO_AMOUNT.to_string();
    }

    let mut tokens: Vec<Token> = Vec::new();
    let mut rest = amount;
    let mut position = 0;
    while rest > 0 {
        let digit = (rest % 10) as u8;
        if digit != 0 {
            tokens.push(Token::Digit(digit, position));
        } else if position > 0 && position % 4 == 0 {
            tokens.push(Token::Section(section_unit(position)));
        } else if !tokens.last().is_some_and(Token::is_placeholder) {
            tokens.push(Token::Zero);
        }
        rest /= 10;
        position += 1;
    }

    let mut s = String::new();
    for token in tokens.iter().rev() {
        token.push_to(&mut s);
    }
    s.push_str(CURRENCY_UNIT);

    let s = collapse_zeros(&s);
    let s = s.replace("零元", CURRENCY_UNIT);
    let mut s = s.replace("亿万", HUNDRED_MILLION);

    if !s.ends_with(CURRENCY_UNIT) {
        s.push_str(CURRENCY_UNIT);
    }
    s.push_str(EVEN_SUFFIX);
    s
}

fn collapse_zeros(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut previous_zero = false;
    for c in s.chars() {
        let is_zero = c == DIGITS[0];
        if !(is_zero && previous_zero) {
            out.push(c);
        }
        previous_zero = is_zero;
    }
    out
}
