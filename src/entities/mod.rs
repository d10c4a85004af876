//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod account;
pub mod benefit_application;
pub mod benefit_document;
pub mod member;
pub mod payment;
pub mod payment_month;
pub mod registration;
pub mod sequence;
pub mod status_change;

// Re-export specific types to avoid conflicts
pub use account::{Column as AccountColumn, Entity as Account, Model as AccountModel};
pub use benefit_application::{
    Column as BenefitApplicationColumn, Entity as BenefitApplication,
    Model as BenefitApplicationModel,
};
pub use benefit_document::{
    Column as BenefitDocumentColumn, Entity as BenefitDocument, Model as BenefitDocumentModel,
};
pub use member::{Column as MemberColumn, Entity as Member, Model as MemberModel};
pub use payment::{Column as PaymentColumn, Entity as Payment, Model as PaymentModel};
pub use payment_month::{
    Column as PaymentMonthColumn, Entity as PaymentMonth, Model as PaymentMonthModel,
};
pub use registration::{
    Column as RegistrationColumn, Entity as Registration, Model as RegistrationModel,
};
pub use sequence::{Column as SequenceColumn, Entity as Sequence, Model as SequenceModel};
pub use status_change::{
    Column as StatusChangeColumn, Entity as StatusChange, Model as StatusChangeModel,
};
