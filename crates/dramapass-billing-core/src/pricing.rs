//! Package pricing and paid-amount decomposition

use serde::Serialize;

use dramapass_types::Package;

use crate::BillingError;

/// Price and duration of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PackageQuote {
    pub package: Package,
    /// Price in rupiah
    pub price: u64,
    /// Nominal VIP days
    pub days: u32,
}

impl From<Package> for PackageQuote {
    fn from(package: Package) -> Self {
        Self {
            package,
            price: package.price(),
            days: package.days(),
        }
    }
}

/// How many of one package a paid amount covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BreakdownLine {
    pub package: Package,
    pub count: u64,
}

/// Greedy decomposition of a paid amount
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AmountBreakdown {
    /// Packages with a non-zero count, most expensive first
    pub lines: Vec<BreakdownLine>,
    /// Total VIP days covered
    pub total_days: u32,
    /// Amount below the cheapest package, dropped without credit
    pub remainder: u64,
}

/// Maps package ids to price and duration
#[derive(Debug, Clone)]
pub struct PricingResolver {
    /// Catalogue, cheapest first
    packages: Vec<Package>,
}

impl PricingResolver {
    /// Resolver over the given catalogue
    pub fn new(packages: impl IntoIterator<Item = Package>) -> Self {
        let mut packages: Vec<Package> = packages.into_iter().collect();
        packages.sort_by_key(Package::price);
        packages.dedup();
        Self { packages }
    }

    /// Resolver over every known package
    pub fn standard() -> Self {
        Self::new(Package::ALL)
    }

    /// Catalogue, cheapest first
    pub fn list_packages(&self) -> &[Package] {
        &self.packages
    }

    /// Price and duration of a package id
    pub fn resolve_package(&self, package_id: &str) -> Result<PackageQuote, BillingError> {
        let package: Package = package_id.parse()?;
        if !self.packages.contains(&package) {
            return Err(BillingError::UnknownPackage(package_id.to_string()));
        }
        Ok(package.into())
    }

    /// Split `amount` into packages, largest price first, taking as many of
    /// each as fit before moving to the next. Whatever is left below the
    /// cheapest price earns nothing.
    pub fn decompose_amount(&self, amount: u64) -> AmountBreakdown {
        let mut remaining = amount;
        let mut total_days: u64 = 0;
        let mut lines = Vec::new();

        for package in self.packages.iter().rev() {
            let price = package.price();
            let count = remaining / price;
            if count == 0 {
                continue;
            }
            remaining -= count * price;
            total_days = total_days.saturating_add(count.saturating_mul(u64::from(package.days())));
            lines.push(BreakdownLine {
                package: *package,
                count,
            });
        }

        AmountBreakdown {
            lines,
            total_days: u32::try_from(total_days).unwrap_or(u32::MAX),
            remainder: remaining,
        }
    }
}

impl Default for PricingResolver {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_packages() {
        let pricing = PricingResolver::standard();
        let quote = pricing.resolve_package("vip_7d").unwrap();
        assert_eq!((quote.price, quote.days), (9_000, 7));
        assert_eq!(pricing.resolve_package("vip_30d").unwrap().days, 30);
    }

    #[test]
    fn test_resolve_unknown_package() {
        let pricing = PricingResolver::standard();
        assert!(matches!(
            pricing.resolve_package("vip_2d"),
            Err(BillingError::UnknownPackage(_))
        ));

        let restricted = PricingResolver::new([Package::SevenDays]);
        assert!(matches!(
            restricted.resolve_package("vip_1d"),
            Err(BillingError::UnknownPackage(_))
        ));
    }

    #[test]
    fn test_decompose_single_tier() {
        let breakdown = PricingResolver::standard().decompose_amount(9_000);
        assert_eq!(breakdown.total_days, 7);
        assert_eq!(breakdown.remainder, 0);
        assert_eq!(
            breakdown.lines,
            vec![BreakdownLine {
                package: Package::SevenDays,
                count: 1
            }]
        );
    }

    #[test]
    fn test_decompose_mixed_amount() {
        // 25000 + 9000 + 4000 + 2000 + 500 left over
        let breakdown = PricingResolver::standard().decompose_amount(40_500);
        assert_eq!(breakdown.total_days, 30 + 7 + 3 + 1);
        assert_eq!(breakdown.remainder, 500);
        assert_eq!(breakdown.lines.len(), 4);
    }

    #[test]
    fn test_decompose_zero_and_dust() {
        let pricing = PricingResolver::standard();
        assert_eq!(pricing.decompose_amount(0), AmountBreakdown::default());

        let dust = pricing.decompose_amount(1_999);
        assert_eq!(dust.total_days, 0);
        assert_eq!(dust.remainder, 1_999);
        assert!(dust.lines.is_empty());
    }
}
