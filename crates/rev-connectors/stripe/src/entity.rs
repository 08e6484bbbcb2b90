use rev_core::Error;
use std::fmt;
use std::str::FromStr;

/// Stripe resources the connector can list and write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StripeEntity {
    Customers,
    Products,
    Prices,
    Invoices,
    Charges,
    Subscriptions,
    PaymentIntents,
    Refunds,
    Coupons,
    Plans,
}

impl StripeEntity {
    pub const ALL: [StripeEntity; 10] = [
        StripeEntity::Customers,
        StripeEntity::Products,
        StripeEntity::Prices,
        StripeEntity::Invoices,
        StripeEntity::Charges,
        StripeEntity::Subscriptions,
        StripeEntity::PaymentIntents,
        StripeEntity::Refunds,
        StripeEntity::Coupons,
        StripeEntity::Plans,
    ];

    /// Path segment under `/v1`
    pub fn path(&self) -> &'static str {
        match self {
            StripeEntity::Customers => "customers",
            StripeEntity::Products => "products",
            StripeEntity::Prices => "prices",
            StripeEntity::Invoices => "invoices",
            StripeEntity::Charges => "charges",
            StripeEntity::Subscriptions => "subscriptions",
            StripeEntity::PaymentIntents => "payment_intents",
            StripeEntity::Refunds => "refunds",
            StripeEntity::Coupons => "coupons",
            StripeEntity::Plans => "plans",
        }
    }

    /// Whether the API allows `DELETE /v1/<entity>/<id>`
    pub fn deletable(&self) -> bool {
        matches!(
            self,
            StripeEntity::Customers
                | StripeEntity::Products
                | StripeEntity::Invoices
                | StripeEntity::Subscriptions
                | StripeEntity::Coupons
                | StripeEntity::Plans
        )
    }
}

impl FromStr for StripeEntity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        StripeEntity::ALL
            .into_iter()
            .find(|e| e.path() == wanted)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "Entity '{}' is not supported by the Stripe connector",
                    s
                ))
            })
    }
}

impl fmt::Display for StripeEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}
