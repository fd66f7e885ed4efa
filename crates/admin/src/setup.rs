//! Store setup diagnostics.
//!
//! When the storefront's checkout reports "no shipping available", the cause
//! is almost always configuration: no zone containing the customer's
//! country, no default zones on the channel, or no shipping method at all.
//! [`SetupReport::problems`] names each one.

use std::fmt;

use crate::types::{Channel, PaymentMethod, ShippingMethod, Zone};

/// Snapshot of the configuration the checkout depends on.
#[derive(Debug, Clone)]
pub struct SetupReport {
    pub channel: Channel,
    pub zones: Vec<Zone>,
    pub shipping_methods: Vec<ShippingMethod>,
    pub payment_methods: Vec<PaymentMethod>,
    /// Payment method code the storefront attaches payments with.
    pub payment_method_code: String,
}

/// One configuration gap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupProblem {
    NoZones,
    /// A zone with no enabled country or province.
    EmptyZone { name: String },
    NoDefaultShippingZone,
    NoDefaultTaxZone,
    NoShippingMethods,
    /// The storefront's payment method does not exist.
    PaymentMethodMissing { code: String },
    /// The storefront's payment method exists but is disabled.
    PaymentMethodDisabled { code: String },
}

impl fmt::Display for SetupProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoZones => f.write_str("no zones are defined"),
            Self::EmptyZone { name } => {
                write!(f, "zone '{name}' has no enabled countries or provinces")
            }
            Self::NoDefaultShippingZone => {
                f.write_str("the channel has no default shipping zone")
            }
            Self::NoDefaultTaxZone => f.write_str("the channel has no default tax zone"),
            Self::NoShippingMethods => f.write_str("no shipping methods are defined"),
            Self::PaymentMethodMissing { code } => {
                write!(f, "payment method '{code}' does not exist")
            }
            Self::PaymentMethodDisabled { code } => {
                write!(f, "payment method '{code}' is disabled")
            }
        }
    }
}

impl SetupReport {
    /// Configuration gaps that would break checkout. Empty when the store is
    /// ready to take orders.
    #[must_use]
    pub fn problems(&self) -> Vec<SetupProblem> {
        let mut problems = Vec::new();

        if self.zones.is_empty() {
            problems.push(SetupProblem::NoZones);
        }
        problems.extend(
            self.zones
                .iter()
                .filter(|z| !z.has_enabled_members())
                .map(|z| SetupProblem::EmptyZone {
                    name: z.name.clone(),
                }),
        );

        if self.channel.default_shipping_zone.is_none() {
            problems.push(SetupProblem::NoDefaultShippingZone);
        }
        if self.channel.default_tax_zone.is_none() {
            problems.push(SetupProblem::NoDefaultTaxZone);
        }

        if self.shipping_methods.is_empty() {
            problems.push(SetupProblem::NoShippingMethods);
        }

        let code = &self.payment_method_code;
        match self.payment_methods.iter().find(|m| &m.code == code) {
            None => problems.push(SetupProblem::PaymentMethodMissing { code: code.clone() }),
            Some(method) if !method.enabled => {
                problems.push(SetupProblem::PaymentMethodDisabled { code: code.clone() });
            }
            Some(_) => {}
        }

        problems
    }

    /// Whether checkout has everything it needs.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.problems().is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::types::{OperationRef, Region, ZoneRef};
    use quayside_core::{PaymentMethodId, ShippingMethodId, ZoneId};

    fn zone(name: &str, enabled: bool) -> Zone {
        Zone {
            id: ZoneId::new(name),
            name: name.to_string(),
            members: vec![Region {
                code: "GB".to_string(),
                name: "United Kingdom".to_string(),
                enabled,
            }],
        }
    }

    fn ready_report() -> SetupReport {
        let uk = ZoneRef {
            id: ZoneId::new("1"),
            name: "UK".to_string(),
        };
        SetupReport {
            channel: Channel {
                id: "1".to_string(),
                code: "__default_channel__".to_string(),
                default_shipping_zone: Some(uk.clone()),
                default_tax_zone: Some(uk),
            },
            zones: vec![zone("UK", true)],
            shipping_methods: vec![ShippingMethod {
                id: ShippingMethodId::new("1"),
                code: "standard".to_string(),
                name: "Standard".to_string(),
                checker: OperationRef {
                    code: "default-shipping-eligibility-checker".to_string(),
                },
                calculator: OperationRef {
                    code: "default-shipping-calculator".to_string(),
                },
            }],
            payment_methods: vec![PaymentMethod {
                id: PaymentMethodId::new("1"),
                code: "stripe".to_string(),
                name: "Card".to_string(),
                enabled: true,
                handler: OperationRef {
                    code: "stripe".to_string(),
                },
            }],
            payment_method_code: "stripe".to_string(),
        }
    }

    #[test]
    fn test_ready_store_has_no_problems() {
        assert!(ready_report().is_ready());
    }

    #[test]
    fn test_missing_shipping_configuration() {
        let mut report = ready_report();
        report.zones.clear();
        report.shipping_methods.clear();
        report.channel.default_shipping_zone = None;

        assert_eq!(
            report.problems(),
            vec![
                SetupProblem::NoZones,
                SetupProblem::NoDefaultShippingZone,
                SetupProblem::NoShippingMethods,
            ]
        );
    }

    #[test]
    fn test_empty_zone_and_disabled_payment() {
        let mut report = ready_report();
        report.zones.push(zone("Europe", false));
        if let Some(method) = report.payment_methods.first_mut() {
            method.enabled = false;
        }

        let problems = report.problems();
        assert_eq!(
            problems,
            vec![
                SetupProblem::EmptyZone {
                    name: "Europe".to_string()
                },
                SetupProblem::PaymentMethodDisabled {
                    code: "stripe".to_string()
                },
            ]
        );
        assert_eq!(
            problems[0].to_string(),
            "zone 'Europe' has no enabled countries or provinces"
        );
    }

    #[test]
    fn test_payment_method_code_mismatch() {
        let mut report = ready_report();
        report.payment_method_code = "mollie".to_string();
        assert_eq!(
            report.problems(),
            vec![SetupProblem::PaymentMethodMissing {
                code: "mollie".to_string()
            }]
        );
    }
}
