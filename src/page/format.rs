//! Persian number formatting for prices.

/// Default currency label.
pub const TOMAN: &str = "تومان";

const DIGITS: [char; 10] = ['۰', '۱', '۲', '۳', '۴', '۵', '۶', '۷', '۸', '۹'];
const GROUP_SEPARATOR: char = '٬';
const MINUS: &str = "\u{200e}\u{2212}";

/// Extended Arabic-Indic digits grouped by thousands, the way a `fa-IR`
/// number format renders integers.
pub fn format_price(price: i64) -> String {
    let digits = price.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() * 3);

    if price < 0 {
        out.push_str(MINUS);
    }

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(GROUP_SEPARATOR);
        }
        // digits of a formatted integer are always ASCII
        out.push(DIGITS[(c as u8 - b'0') as usize]);
    }

    out
}

/// Price followed by a currency label.
pub fn format_currency(amount: i64, currency: &str) -> String {
    format!("{} {currency}", format_price(amount))
}

pub fn format_toman(amount: i64) -> String {
    format_currency(amount, TOMAN)
}
