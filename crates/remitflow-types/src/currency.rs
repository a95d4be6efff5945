//! Currency domains.
//!
//! The transfer layer and the escrow layer validate currency codes against
//! two independent sets. They overlap on USD and EUR only: a GBP transfer
//! is accepted by the transfer layer and rejected when its escrow is created.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fiat currencies a transfer may be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    /// Parse an ISO-style code. Case-sensitive, as codes are stored verbatim.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "GBP" => Some(Self::Gbp),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Currencies an escrow may be denominated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowCurrency {
    Usd,
    Eur,
    Stx,
}

impl EscrowCurrency {
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "USD" => Some(Self::Usd),
            "EUR" => Some(Self::Eur),
            "STX" => Some(Self::Stx),
            _ => None,
        }
    }

    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Stx => "STX",
        }
    }
}

impl fmt::Display for EscrowCurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transfer_domain() {
        assert_eq!(Currency::from_code("GBP"), Some(Currency::Gbp));
        assert_eq!(Currency::from_code("STX"), None);
        assert_eq!(Currency::from_code("usd"), None);
    }

    #[test]
    fn escrow_domain() {
        assert_eq!(EscrowCurrency::from_code("STX"), Some(EscrowCurrency::Stx));
        assert_eq!(EscrowCurrency::from_code("GBP"), None);
    }

    #[test]
    fn shared_codes_line_up() {
        for c in [Currency::Usd, Currency::Eur] {
            let escrow = EscrowCurrency::from_code(c.code()).unwrap();
            assert_eq!(escrow.code(), c.code());
        }
    }
}
