/// Accounts, password hashing and session tokens
pub mod account;

/// Benefit application filing, review and tracking
pub mod benefit;

/// Upload slot and file type rules for claim documents
pub mod documents;

/// One-year membership eligibility
pub mod eligibility;

/// Claim form and address parsing
pub mod form;

/// Pure month reconciliation math
pub mod ledger;

/// Contribution payments and the family ledger
pub mod payment;

/// Family and individual registrations
pub mod registration;

/// Dashboard, benefit and family reports
pub mod report;

/// Per-year identifier counters
pub mod sequence;
