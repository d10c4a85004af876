//! Domain enums shared by entities, core logic and the HTTP layer.
//!
//! Entities store these as plain strings; the enums here parse and validate
//! those strings so an unrecognised value is rejected before any mutation.

use crate::errors::Error;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

macro_rules! string_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $value:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// Stored / wire representation.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $value,)+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok(Self::$variant),)+
                    other => Err(Error::validation(format!(
                        "Invalid {} '{}'",
                        $label, other
                    ))),
                }
            }
        }
    };
}

string_enum! {
    /// Whether a registration covers a family or a single person.
    RegistrationType, "registration type" {
        /// Several members under one registration id
        Family => "family",
        /// A single member
        Individual => "individual",
    }
}

string_enum! {
    /// Administrative state of a registration.
    RegistrationStatus, "registration status" {
        /// Contributing member family
        Active => "Active",
        /// Awaiting activation
        Pending => "Pending",
        /// No longer contributing
        Inactive => "Inactive",
    }
}

string_enum! {
    /// How a contribution was collected.
    PaymentMethod, "payment method" {
        /// Cash handed to an admin
        Cash => "cash",
        /// QR / UPI scanner payment
        Scanner => "scanner",
    }
}

string_enum! {
    /// Settlement state of a payment record.
    PaymentStatus, "payment status" {
        /// Recorded but not settled
        Pending => "Pending",
        /// Settled; its months count as paid
        Completed => "Completed",
        /// Collection failed
        Failed => "Failed",
    }
}

string_enum! {
    /// Lifecycle state of a benefit application. Any state may move to any other.
    ApplicationStatus, "status" {
        /// Newly filed
        Pending => "Pending",
        /// An admin has started reviewing
        UnderReview => "Under Review",
        /// Payout granted
        Approved => "Approved",
        /// Claim declined
        Rejected => "Rejected",
    }
}

string_enum! {
    /// Category of assistance being claimed.
    BenefitType, "benefit type" {
        /// Hospitalisation or urgent treatment
        MedicalEmergency => "Medical Emergency",
        /// School or college fees
        EducationSupport => "Education Support",
        /// Shelter repairs or rent
        HousingAssistance => "Housing Assistance",
        /// Disability aid
        DisabilitySupport => "Disability Support",
        /// Support for elderly members
        SeniorCitizenBenefit => "Senior Citizen Benefit",
        /// Childbirth support
        MaternityBenefit => "Maternity Benefit",
        /// Anything else
        Other => "Other",
    }
}

string_enum! {
    /// Kind of supporting document attached to a claim.
    DocumentKind, "document type" {
        /// Aadhar identity card
        Aadhar => "aadhar",
        /// Letter from the treating hospital
        HospitalLetter => "hospitalLetter",
        /// Proof of a contribution payment
        PaymentSlip => "paymentSlip",
        /// Copy of the registration card
        RegistrationCopy => "registrationCopy",
        /// Any additional document
        Other => "other",
    }
}

string_enum! {
    /// Role carried by an account and its session token.
    Role, "role" {
        /// Member-facing account
        User => "user",
        /// Administrator
        Admin => "admin",
    }
}

impl ApplicationStatus {
    /// Statuses that still await a final decision.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Pending | Self::UnderReview)
    }
}
