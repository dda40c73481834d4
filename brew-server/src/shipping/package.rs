//! Package aggregation for a multi-item shipment
//!
//! Items are assumed to nest: the box takes the largest value on each axis,
//! while weight adds up per unit.

use rust_decimal::Decimal;
use serde::Serialize;
use shared::models::Dimensions;

/// Box size (cm) and weight (kg) sent to the shipping provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Package {
    pub length: Decimal,
    pub breadth: Decimal,
    pub height: Decimal,
    pub weight: Decimal,
}

/// Used for products that carry no dimensions
pub fn default_dimensions() -> Dimensions {
    Dimensions::new(
        Decimal::TEN,
        Decimal::TEN,
        Decimal::TEN,
        Decimal::new(5, 1),
    )
}

/// Aggregate `(dimensions, quantity)` lines into one package
pub fn aggregate<'a, I>(lines: I) -> Package
where
    I: IntoIterator<Item = (Option<&'a Dimensions>, u32)>,
{
    let fallback = default_dimensions();
    let mut package = Package {
        length: Decimal::ZERO,
        breadth: Decimal::ZERO,
        height: Decimal::ZERO,
        weight: Decimal::ZERO,
    };
    let mut any = false;

    for (dims, quantity) in lines {
        let d = dims.unwrap_or(&fallback);
        package.length = package.length.max(d.length);
        package.breadth = package.breadth.max(d.breadth);
        package.height = package.height.max(d.height);
        package.weight += d.weight * Decimal::from(quantity);
        any = true;
    }

    if !any {
        return Package {
            length: fallback.length,
            breadth: fallback.breadth,
            height: fallback.height,
            weight: fallback.weight,
        };
    }
    package.weight = package.weight.normalize();
    package
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(l: i64, b: i64, h: i64, w: Decimal) -> Dimensions {
        Dimensions::new(Decimal::from(l), Decimal::from(b), Decimal::from(h), w)
    }

    #[test]
    fn test_per_axis_max_and_weight_sum() {
        let small = dims(6, 6, 12, Decimal::new(35, 2));
        let cube = dims(10, 10, 10, Decimal::new(5, 1));
        let package = aggregate([(Some(&small), 2), (Some(&cube), 1)]);

        assert_eq!(package.length, Decimal::from(10));
        assert_eq!(package.breadth, Decimal::from(10));
        assert_eq!(package.height, Decimal::from(12));
        assert_eq!(package.weight, Decimal::new(12, 1));
    }

    #[test]
    fn test_missing_dimensions_use_default() {
        let package = aggregate([(None, 3)]);
        assert_eq!(package.length, Decimal::TEN);
        assert_eq!(package.weight, Decimal::new(15, 1));
    }

    #[test]
    fn test_empty_shipment_is_one_default_box() {
        let package = aggregate(std::iter::empty());
        assert_eq!(package.height, Decimal::TEN);
        assert_eq!(package.weight, Decimal::new(5, 1));
    }
}
