use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Delivery fee schedule keyed by destination region, with a free-delivery
/// threshold applied to the item subtotal.
#[derive(Clone, Debug, PartialEq)]
pub struct FeeSchedule {
    pub zones: Vec<DeliveryZone>,
    pub default_zone: DeliveryZone,
    pub free_delivery_minimum: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryZone {
    pub name: String,
    pub regions: Vec<String>,
    pub fee_minor: i64,
    pub estimated_days: String,
}

impl DeliveryZone {
    pub fn fee(&self) -> Decimal {
        Decimal::new(self.fee_minor, 0)
    }
}

/// The zone resolution for one destination.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneQuote {
    pub zone: String,
    pub fee: Decimal,
    pub estimated_days: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricingBreakdown {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

impl PricingBreakdown {
    pub fn compute(unit_price: Decimal, quantity: u32, delivery_fee: Decimal) -> Self {
        let subtotal = unit_price * Decimal::from(quantity);
        Self { subtotal, delivery_fee, discount: Decimal::ZERO, total: subtotal + delivery_fee }
    }
}

impl FeeSchedule {
    /// Resolves the fee for a destination region. Unknown regions fall back
    /// to the default (highest-fee) zone rather than failing the order.
    pub fn quote(&self, region: &str) -> ZoneQuote {
        let needle = region.trim();
        let zone = self
            .zones
            .iter()
            .find(|zone| zone.regions.iter().any(|r| r.eq_ignore_ascii_case(needle)))
            .unwrap_or(&self.default_zone);
        ZoneQuote {
            zone: zone.name.clone(),
            fee: zone.fee(),
            estimated_days: zone.estimated_days.clone(),
        }
    }

    /// Prices one line with the free-delivery override applied.
    pub fn price(&self, unit_price: Decimal, quantity: u32, region: &str) -> (PricingBreakdown, ZoneQuote) {
        let quote = self.quote(region);
        let subtotal = unit_price * Decimal::from(quantity);
        let delivery_fee =
            if subtotal >= self.free_delivery_minimum { Decimal::ZERO } else { quote.fee };
        (PricingBreakdown::compute(unit_price, quantity, delivery_fee), quote)
    }

    /// Scans free text for a known region name, longest names first so that
    /// "Cross River" wins over a bare "River" style collision.
    pub fn recognize_region(&self, text: &str) -> Option<String> {
        let haystack = text.to_lowercase();
        let mut regions: Vec<&String> =
            self.zones.iter().flat_map(|zone| zone.regions.iter()).collect();
        regions.sort_by_key(|region| std::cmp::Reverse(region.len()));
        regions
            .into_iter()
            .find(|region| haystack.contains(&region.to_lowercase()))
            .cloned()
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        let zone = |name: &str, regions: &[&str], fee_minor: i64, estimated_days: &str| {
            DeliveryZone {
                name: name.to_string(),
                regions: regions.iter().map(|r| r.to_string()).collect(),
                fee_minor,
                estimated_days: estimated_days.to_string(),
            }
        };

        Self {
            zones: vec![
                zone("Lagos & Abuja (Major Cities)", &["Lagos", "Abuja"], 2_000, "1-2 days"),
                zone(
                    "South-West Region",
                    &["Ogun", "Oyo", "Osun", "Ondo", "Ekiti"],
                    3_000,
                    "2-3 days",
                ),
                zone(
                    "South-South & South-East",
                    &[
                        "Rivers",
                        "Delta",
                        "Edo",
                        "Akwa Ibom",
                        "Cross River",
                        "Bayelsa",
                        "Anambra",
                        "Enugu",
                        "Abia",
                        "Imo",
                        "Ebonyi",
                    ],
                    3_500,
                    "2-3 days",
                ),
                zone(
                    "North-Central Region",
                    &["Kogi", "Kwara", "Niger", "Benue", "Plateau", "Nasarawa"],
                    4_000,
                    "2-3 days",
                ),
                zone(
                    "North-West & North-East",
                    &[
                        "Kaduna",
                        "Kano",
                        "Katsina",
                        "Sokoto",
                        "Kebbi",
                        "Zamfara",
                        "Jigawa",
                        "Bauchi",
                        "Gombe",
                        "Borno",
                        "Yobe",
                        "Adamawa",
                        "Taraba",
                    ],
                    5_000,
                    "3-4 days",
                ),
            ],
            default_zone: zone("Standard Delivery", &[], 5_000, "3-4 days"),
            free_delivery_minimum: Decimal::new(100_000, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::FeeSchedule;

    #[test]
    fn south_west_region_prices_with_its_zone_fee() {
        let schedule = FeeSchedule::default();
        let (pricing, quote) = schedule.price(Decimal::new(50_000, 0), 1, "Oyo");

        assert_eq!(quote.fee, Decimal::new(3_000, 0));
        assert_eq!(pricing.subtotal, Decimal::new(50_000, 0));
        assert_eq!(pricing.total, Decimal::new(53_000, 0));
    }

    #[test]
    fn two_units_at_fifty_thousand_in_a_three_thousand_zone_totals_one_hundred_three() {
        let schedule = FeeSchedule::default();
        let (pricing, _) = schedule.price(Decimal::new(50_000, 0), 2, "Ogun");

        // 100,000 subtotal meets the free-delivery minimum, so force the
        // threshold above it to exercise the fee path.
        let mut schedule = schedule;
        schedule.free_delivery_minimum = Decimal::new(150_000, 0);
        let (priced, _) = schedule.price(Decimal::new(50_000, 0), 2, "Ogun");
        assert_eq!(priced.total, Decimal::new(103_000, 0));

        // Default threshold: delivery is free at exactly 100,000.
        assert_eq!(pricing.delivery_fee, Decimal::ZERO);
        assert_eq!(pricing.total, Decimal::new(100_000, 0));
    }

    #[test]
    fn unknown_region_falls_back_to_default_zone() {
        let schedule = FeeSchedule::default();
        let quote = schedule.quote("Atlantis");
        assert_eq!(quote.zone, "Standard Delivery");
        assert_eq!(quote.fee, Decimal::new(5_000, 0));
    }

    #[test]
    fn free_delivery_applies_at_threshold() {
        let schedule = FeeSchedule::default();
        let (pricing, _) = schedule.price(Decimal::new(100_000, 0), 1, "Lagos");
        assert_eq!(pricing.delivery_fee, Decimal::ZERO);
        assert_eq!(pricing.total, Decimal::new(100_000, 0));
    }

    #[test]
    fn recognize_region_matches_case_insensitively() {
        let schedule = FeeSchedule::default();
        assert_eq!(
            schedule.recognize_region("15 Admiralty Way, Lekki, lagos"),
            Some("Lagos".to_string())
        );
        assert_eq!(
            schedule.recognize_region("4 Marina Rd, Calabar, cross river"),
            Some("Cross River".to_string())
        );
        assert_eq!(schedule.recognize_region("nowhere in particular"), None);
    }
}
