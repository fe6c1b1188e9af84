use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::WorkflowError;

/// A single competing price quote gathered during the price-inquiry detour.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QuoteOffer {
    pub supplier: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub selected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment_ref: Option<String>,
}

/// Ordered slate of competing quotes; at most one may be selected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuoteSlate {
    pub offers: Vec<QuoteOffer>,
}

impl QuoteSlate {
    pub fn new(offers: Vec<QuoteOffer>) -> Self {
        Self { offers }
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn selected(&self) -> Option<&QuoteOffer> {
        self.offers.iter().find(|offer| offer.selected)
    }

    /// Price of the selected quote, or 0 if none is flagged.
    pub fn selected_total(&self) -> Decimal {
        self.selected().map(|offer| offer.price).unwrap_or(Decimal::ZERO)
    }

    /// Boundary validation: every offer needs a supplier and a positive
    /// price, and at most one offer may be selected. A missing selection is
    /// legal and yields a total of 0.
    pub fn validate(&self) -> Result<(), WorkflowError> {
        for (index, offer) in self.offers.iter().enumerate() {
            if offer.supplier.trim().is_empty() {
                return Err(WorkflowError::Validation(format!(
                    "quote #{} is missing a supplier",
                    index + 1
                )));
            }
            if offer.price <= Decimal::ZERO {
                return Err(WorkflowError::Validation(format!(
                    "quote #{} must have a positive price",
                    index + 1
                )));
            }
        }

        let selected_count = self.offers.iter().filter(|offer| offer.selected).count();
        if selected_count > 1 {
            return Err(WorkflowError::Validation(format!(
                "at most one quote may be selected, found {selected_count}"
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use crate::errors::WorkflowError;

    use super::{QuoteOffer, QuoteSlate};

    fn offer(supplier: &str, price: i64, selected: bool) -> QuoteOffer {
        QuoteOffer {
            supplier: supplier.to_string(),
            price: Decimal::from(price),
            description: None,
            selected,
            attachment_ref: None,
        }
    }

    #[test]
    fn selected_total_is_price_of_flagged_quote() {
        let slate = QuoteSlate::new(vec![
            offer("Acme Supply", 4_800_000, false),
            offer("Globex Trading", 5_000_000, true),
            offer("Initech Goods", 5_300_000, false),
        ]);

        assert_eq!(slate.selected_total(), Decimal::from(5_000_000));
        assert_eq!(slate.selected().map(|o| o.supplier.as_str()), Some("Globex Trading"));
    }

    #[test]
    fn missing_selection_defaults_to_zero() {
        let slate = QuoteSlate::new(vec![offer("Acme Supply", 100, false)]);
        assert_eq!(slate.selected_total(), Decimal::ZERO);
        assert!(slate.validate().is_ok());
    }

    #[test]
    fn rejects_more_than_one_selected_quote() {
        let slate =
            QuoteSlate::new(vec![offer("Acme Supply", 100, true), offer("Globex", 200, true)]);
        assert!(matches!(slate.validate(), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn rejects_blank_supplier_and_non_positive_price() {
        let blank = QuoteSlate::new(vec![offer("  ", 100, false)]);
        assert!(matches!(blank.validate(), Err(WorkflowError::Validation(_))));

        let free = QuoteSlate::new(vec![offer("Acme Supply", 0, false)]);
        assert!(matches!(free.validate(), Err(WorkflowError::Validation(_))));
    }

    #[test]
    fn slate_round_trips_through_json() {
        let slate = QuoteSlate::new(vec![offer("Acme Supply", 4_800_000, true)]);
        let json = serde_json::to_string(&slate).expect("serialize");
        let decoded: QuoteSlate = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(decoded, slate);
    }
}
