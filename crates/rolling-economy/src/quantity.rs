//! Unit and quantity conversion.
//!
//! Players type quantities as free text (`"0,5 kg"`, `"250g"`, `"3"`).
//! Storage and computation always use the resource's canonical base unit
//! (grams, litres, cubic metres or a count) with six decimals, so repeated
//! partial transfers never drift. Grams are displayed as kilograms from
//! 1000 g upwards.
//!
//! [`format_quantity`] and [`parse_user_quantity`] are inverses: a
//! displayed quantity typed back in yields the same machine quantity.

use std::str::FromStr;

use rolling_types::Unit;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::ActionError;

/// Decimal places kept for machine quantities.
pub const QUANTITY_SCALE: u32 = 6;

/// Decimal places kept for suggested default quantities.
const DEFAULT_SCALE: u32 = 4;

/// Grams per kilogram.
const GRAMS_PER_KILOGRAM: Decimal = Decimal::from_parts(1000, 0, 0, false, 0);

/// Share of the available quantity suggested by default (10%).
const DEFAULT_SHARE: Decimal = Decimal::from_parts(1, 0, 0, false, 1);

/// A quantity typed by a player, converted to base unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuantity {
    /// Quantity in base unit, rounded to [`QUANTITY_SCALE`] decimals.
    pub quantity: Decimal,
    /// The same quantity formatted for display.
    pub display: String,
}

/// Convert a typed quantity to the resource's base unit.
///
/// Whitespace is ignored, case does not matter and `,` is accepted as the
/// decimal separator. A bare number is read in the base unit. Accepted
/// suffixes are `g` and `kg` for grams, `l` for litres, `m3` for cubic
/// metres and `u` for counts.
///
/// # Errors
///
/// Returns [`ActionError::WrongInput`] for text that is not a number, a
/// suffix that does not belong to `unit`, zero, a negative quantity, or a
/// fractional count.
pub fn parse_user_quantity(raw: &str, unit: Unit) -> Result<ParsedQuantity, ActionError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return Err(ActionError::wrong_input("Please enter a quantity"));
    }

    let split = cleaned
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(cleaned.len());
    let (number, suffix) = cleaned.split_at(split);
    let multiplier = suffix_multiplier(unit, suffix)?;

    let value = Decimal::from_str(number)
        .map_err(|e| ActionError::wrong_input(format!("\"{raw}\" is not a quantity ({e})")))?;
    let exact = value
        .checked_mul(multiplier)
        .ok_or_else(|| ActionError::wrong_input(format!("\"{raw}\" is too large")))?;
    if unit.is_discrete() && !exact.fract().is_zero() {
        return Err(ActionError::wrong_input("Quantity must be a whole number"));
    }
    let quantity = exact.round_dp(QUANTITY_SCALE);

    if quantity.is_zero() {
        return Err(ActionError::wrong_input("Quantity must be greater than zero"));
    }
    if quantity.is_sign_negative() {
        return Err(ActionError::wrong_input("Quantity cannot be negative"));
    }
    Ok(ParsedQuantity {
        quantity: quantity.normalize(),
        display: format_quantity(quantity, unit),
    })
}

/// Parse a typed count of stuffs.
///
/// # Errors
///
/// Returns [`ActionError::WrongInput`] under the same rules as
/// [`parse_user_quantity`] for [`Unit::Count`], or if the count does not
/// fit a `u32`.
pub fn parse_stuff_count(raw: &str) -> Result<u32, ActionError> {
    let parsed = parse_user_quantity(raw, Unit::Count)?;
    decimal_to_count(parsed.quantity)
}

/// Convert a whole, positive decimal to a count.
///
/// # Errors
///
/// Returns [`ActionError::WrongInput`] if `quantity` is fractional, not
/// positive, or too large.
pub fn decimal_to_count(quantity: Decimal) -> Result<u32, ActionError> {
    if !quantity.fract().is_zero() || quantity <= Decimal::ZERO {
        return Err(ActionError::wrong_input(format!(
            "{quantity} is not a valid number of items"
        )));
    }
    quantity
        .to_u32()
        .ok_or_else(|| ActionError::wrong_input(format!("{quantity} items is too many")))
}

fn suffix_multiplier(unit: Unit, suffix: &str) -> Result<Decimal, ActionError> {
    match (unit, suffix) {
        (_, "")
        | (Unit::Gram, "g")
        | (Unit::Litre, "l")
        | (Unit::CubicMetre, "m3")
        | (Unit::Count, "u") => Ok(Decimal::ONE),
        (Unit::Gram, "kg") => Ok(GRAMS_PER_KILOGRAM),
        _ => Err(ActionError::wrong_input(format!(
            "Unit \"{suffix}\" cannot be used here, use {}",
            accepted_suffixes(unit)
        ))),
    }
}

const fn accepted_suffixes(unit: Unit) -> &'static str {
    match unit {
        Unit::Gram => "g or kg",
        Unit::Litre => "l",
        Unit::CubicMetre => "m3",
        Unit::Count => "a whole number",
    }
}

/// Format a base-unit quantity for display.
///
/// The output is accepted back by [`parse_user_quantity`].
pub fn format_quantity(quantity: Decimal, unit: Unit) -> String {
    let quantity = quantity.round_dp(QUANTITY_SCALE).normalize();
    match unit {
        Unit::Gram if quantity >= GRAMS_PER_KILOGRAM => {
            let kilograms = quantity
                .checked_div(GRAMS_PER_KILOGRAM)
                .unwrap_or(quantity)
                .normalize();
            format!("{kilograms} kg")
        }
        Unit::Count => quantity.to_string(),
        Unit::Gram | Unit::Litre | Unit::CubicMetre => {
            format!("{quantity} {}", unit.base_suffix())
        }
    }
}

/// Label shown next to a quantity input.
pub const fn unit_label(unit: Unit) -> Option<&'static str> {
    match unit {
        Unit::Gram => Some("g or kg"),
        Unit::Litre => Some("l"),
        Unit::CubicMetre => Some("m3"),
        Unit::Count => None,
    }
}

/// Quantity suggested when asking a player how much of a resource to move.
///
/// 10% of `available`, rounded to four decimals, or whole units for
/// counted resources. Falls back to `available` when the share rounds to
/// nothing.
pub fn default_quantity(available: Decimal, unit: Unit) -> Decimal {
    let share = available.checked_mul(DEFAULT_SHARE).unwrap_or(available);
    let rounded = if unit.is_discrete() {
        share.floor()
    } else {
        share.round_dp(DEFAULT_SCALE)
    };
    if rounded.is_zero() {
        available
    } else {
        rounded.normalize()
    }
}

/// Count suggested when asking a player how many stuffs to move: all of them.
pub const fn default_stuff_count(available: u32) -> u32 {
    available
}
