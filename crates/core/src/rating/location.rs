//! Registration-location rate adjustment.
//!
//! This is a placeholder heuristic with no geographic meaning: the last
//! character of the postal code is read as a digit `d` and mapped linearly
//! onto `[min, max)` as `(d / 10) * (max - min) + min`. A postal code that does
//! not end in an ASCII digit yields no adjustment at all.

use crate::config::RatingConfig;
use crate::domain::address::Address;

pub fn postal_code_digit(postal_code: &str) -> Option<u32> {
    postal_code.chars().last().filter(char::is_ascii_digit).and_then(|ch| ch.to_digit(10))
}

pub fn location_adjustment(config: &RatingConfig, address: &Address) -> Option<f64> {
    postal_code_digit(address.postal_code()).map(|digit| {
        (f64::from(digit) / 10.0)
            * (config.max_location_adjustment - config.min_location_adjustment)
            + config.min_location_adjustment
    })
}
