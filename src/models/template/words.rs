//! Cardinal-word spelling of amounts for lease clauses
//! ("two thousand five hundred and fifty pesewas").

const ONES: [&str; 20] = [
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
    "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
    "nineteen",
];

const TENS: [&str; 10] = [
    "", "", "twenty", "thirty", "forty", "fifty", "sixty", "seventy", "eighty", "ninety",
];

const SCALES: [(u64, &str); 3] = [
    (1_000_000_000, "billion"),
    (1_000_000, "million"),
    (1_000, "thousand"),
];

/// Spell a whole number. After a scale word the remainder is joined with " and "
/// when it is below one hundred, and with a plain space otherwise.
pub fn integer_to_words(n: u64) -> String {
    if n < 20 {
        return ONES[n as usize].to_string();
    }
    if n < 100 {
        let tens = TENS[(n / 10) as usize];
        return match n % 10 {
            0 => tens.to_string(),
            unit => format!("{tens}-{}", ONES[unit as usize]),
        };
    }

    let (divisor, scale) = SCALES
        .iter()
        .copied()
        .find(|(d, _)| n >= *d)
        .unwrap_or((100, "hundred"));

    let mut words = format!("{} {scale}", integer_to_words(n / divisor));
    let rest = n % divisor;
    if rest > 0 {
        words.push_str(if rest < 100 { " and " } else { " " });
        words.push_str(&integer_to_words(rest));
    }
    words
}

/// Spell an amount rounded to two decimals. A non-zero fraction is appended as
/// `" and <words> pesewas"`. Non-finite input yields an empty string.
pub fn number_to_words(amount: f64) -> String {
    if !amount.is_finite() {
        return String::new();
    }
    let total = (amount.abs() * 100.0).round() as u64;
    let (whole, fraction) = (total / 100, total % 100);

    let mut words = integer_to_words(whole);
    if fraction > 0 {
        words.push_str(" and ");
        words.push_str(&integer_to_words(fraction));
        words.push_str(" pesewas");
    }

    if amount < 0.0 && total > 0 {
        format!("minus {words}")
    } else {
        words
    }
}
