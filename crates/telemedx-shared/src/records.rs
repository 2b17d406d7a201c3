//! Typed payloads at the pharmacy/checkout/prescription service boundaries.
//!
//! Every payload is parsed into one of these types before use; a payload
//! with the wrong shape is an error, not a partially-filled object.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::RecordError;

/// Parse a JSON service payload into a typed record.
pub fn parse_payload<T: DeserializeOwned>(json: &str) -> Result<T, RecordError> {
    Ok(serde_json::from_str(json)?)
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PaymentOption {
    #[serde(rename_all = "camelCase")]
    CreditCard {
        id: String,
        name: String,
        last_four: String,
        expiry_month: u8,
        expiry_year: u16,
        is_default: bool,
    },
    #[serde(rename_all = "camelCase")]
    DebitCard {
        id: String,
        name: String,
        last_four: String,
        expiry_month: u8,
        expiry_year: u16,
        is_default: bool,
    },
    #[serde(rename_all = "camelCase")]
    BankAccount {
        id: String,
        name: String,
        last_four: String,
        bank_name: String,
        is_default: bool,
    },
    #[serde(rename_all = "camelCase")]
    CashOnDelivery {
        id: String,
        name: String,
        is_default: bool,
    },
}

impl PaymentOption {
    pub fn id(&self) -> &str {
        match self {
            PaymentOption::CreditCard { id, .. }
            | PaymentOption::DebitCard { id, .. }
            | PaymentOption::BankAccount { id, .. }
            | PaymentOption::CashOnDelivery { id, .. } => id,
        }
    }

    pub fn is_default(&self) -> bool {
        match self {
            PaymentOption::CreditCard { is_default, .. }
            | PaymentOption::DebitCard { is_default, .. }
            | PaymentOption::BankAccount { is_default, .. }
            | PaymentOption::CashOnDelivery { is_default, .. } => *is_default,
        }
    }

    /// Label shown on the checkout summary.
    pub fn display_name(&self) -> String {
        match self {
            PaymentOption::CreditCard { last_four, .. } => format!("Visa Card ****{last_four}"),
            PaymentOption::DebitCard { last_four, .. } => format!("Mastercard ****{last_four}"),
            PaymentOption::BankAccount {
                bank_name,
                last_four,
                ..
            } => format!("{bank_name} ****{last_four}"),
            PaymentOption::CashOnDelivery { .. } => "Cash on Delivery".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddress {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub is_default: bool,
}

impl DeliveryAddress {
    /// Collect every missing required field, in form order.
    pub fn validate(&self) -> Result<(), RecordError> {
        let checks = [
            (&self.name, "Name is required"),
            (&self.address, "Address is required"),
            (&self.city, "City is required"),
            (&self.state, "State is required"),
            (&self.zip_code, "ZIP code is required"),
            (&self.phone, "Phone number is required"),
        ];

        let errors: Vec<String> = checks
            .iter()
            .filter(|(value, _)| value.trim().is_empty())
            .map(|(_, msg)| msg.to_string())
            .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(RecordError::Invalid(errors))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    HomeDelivery,
    Pickup,
    InPersonCollection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverySettings {
    /// Miles.
    pub max_delivery_radius: f64,
    pub delivery_fee: f64,
    pub free_delivery_threshold: f64,
    pub estimated_delivery_days: u32,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            max_delivery_radius: 25.0,
            delivery_fee: 5.0,
            free_delivery_threshold: 50.0,
            estimated_delivery_days: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotal {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub total: f64,
    pub free_delivery_eligible: bool,
}

/// Price an order. `distance_miles` is the distance to the delivery
/// address, when one is known.
pub fn order_total(
    items: &[CartItem],
    delivery_type: DeliveryType,
    distance_miles: Option<f64>,
    settings: &DeliverySettings,
) -> OrderTotal {
    let subtotal: f64 = items
        .iter()
        .map(|item| item.price * f64::from(item.quantity))
        .sum();

    let mut delivery_fee = 0.0;
    let mut free_delivery_eligible = false;

    if let (DeliveryType::HomeDelivery, Some(distance)) = (delivery_type, distance_miles) {
        if distance <= settings.max_delivery_radius {
            free_delivery_eligible = subtotal >= settings.free_delivery_threshold;
            if !free_delivery_eligible {
                delivery_fee = settings.delivery_fee;
            }
        }
    }

    OrderTotal {
        subtotal,
        delivery_fee,
        total: subtotal + delivery_fee,
        free_delivery_eligible,
    }
}

// ---------------------------------------------------------------------------
// Prescriptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedicationRoute {
    Oral,
    Topical,
    Injection,
    Inhaler,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    Active,
    Completed,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub route: MedicationRoute,
    pub prescribed_date: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    pub duration: String,
    pub refills_remaining: u32,
    pub instructions: String,
    #[serde(default)]
    pub side_effects: Vec<String>,
    #[serde(default)]
    pub interactions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub doctor_name: String,
    pub doctor_specialty: String,
    pub medications: Vec<Medication>,
    pub diagnosis: String,
    pub prescribed_date: DateTime<Utc>,
    pub status: PrescriptionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub follow_up_date: Option<DateTime<Utc>>,
}

impl Prescription {
    pub fn is_active(&self) -> bool {
        self.status == PrescriptionStatus::Active
    }

    /// Medications that have run out of refills.
    pub fn needing_refill(&self) -> impl Iterator<Item = &Medication> {
        self.medications.iter().filter(|m| m.refills_remaining == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_option_tagged_parse() {
        let bank: PaymentOption = parse_payload(
            r#"{"type":"bank_account","id":"3","name":"Checking","lastFour":"1234","bankName":"Chase Bank","isDefault":false}"#,
        )
        .unwrap();
        assert_eq!(bank.display_name(), "Chase Bank ****1234");
        assert_eq!(bank.id(), "3");

        let cash: PaymentOption =
            parse_payload(r#"{"type":"cash_on_delivery","id":"4","name":"Cash","isDefault":true}"#)
                .unwrap();
        assert_eq!(cash.display_name(), "Cash on Delivery");
        assert!(cash.is_default());
    }

    #[test]
    fn test_payment_option_missing_field_rejected() {
        let res: Result<PaymentOption, _> =
            parse_payload(r#"{"type":"credit_card","id":"1","name":"Visa","isDefault":true}"#);
        assert!(matches!(res, Err(RecordError::Parse(_))));
    }

    #[test]
    fn test_address_validation_lists_all_errors() {
        let addr = DeliveryAddress {
            name: "John Doe".into(),
            city: "  ".into(),
            ..Default::default()
        };
        let Err(RecordError::Invalid(errors)) = addr.validate() else {
            panic!("expected validation errors");
        };
        assert_eq!(
            errors,
            vec![
                "Address is required",
                "City is required",
                "State is required",
                "ZIP code is required",
                "Phone number is required",
            ]
        );
    }

    #[test]
    fn test_order_total_delivery_rules() {
        let settings = DeliverySettings::default();
        let items = vec![CartItem { name: "Amoxicillin".into(), price: 12.5, quantity: 2 }];

        let home = order_total(&items, DeliveryType::HomeDelivery, Some(10.0), &settings);
        assert_eq!(home.subtotal, 25.0);
        assert_eq!(home.delivery_fee, 5.0);
        assert_eq!(home.total, 30.0);

        let far = order_total(&items, DeliveryType::HomeDelivery, Some(40.0), &settings);
        assert_eq!(far.delivery_fee, 0.0);

        let pickup = order_total(&items, DeliveryType::Pickup, Some(10.0), &settings);
        assert_eq!(pickup.total, 25.0);

        let big = vec![CartItem { name: "Insulin".into(), price: 60.0, quantity: 1 }];
        let free = order_total(&big, DeliveryType::HomeDelivery, Some(3.0), &settings);
        assert!(free.free_delivery_eligible);
        assert_eq!(free.delivery_fee, 0.0);
    }

    #[test]
    fn test_prescription_parse() {
        let rx: Prescription = parse_payload(
            r#"{
                "id": "RX-1", "patientId": "p1", "patientName": "Jane",
                "doctorId": "d1", "doctorName": "Dr Lee", "doctorSpecialty": "Cardiology",
                "diagnosis": "Hypertension", "prescribedDate": "2024-01-10T09:00:00Z",
                "status": "active",
                "medications": [{
                    "id": "m1", "name": "Lisinopril", "dosage": "10mg", "frequency": "daily",
                    "route": "oral", "prescribedDate": "2024-01-10T09:00:00Z",
                    "startDate": "2024-01-10T09:00:00Z", "duration": "90 days",
                    "refillsRemaining": 0, "instructions": "Take with water"
                }]
            }"#,
        )
        .unwrap();
        assert!(rx.is_active());
        assert_eq!(rx.needing_refill().count(), 1);
        assert_eq!(rx.medications[0].route, MedicationRoute::Oral);
    }
}
