use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const LOAN_ID_PREFIX: &str = "LN";

/// Sequential loan identifier, rendered as a fixed-width reference such as `LN0007`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct LoanId(u64);

impl LoanId {
    pub const fn from_sequence(sequence: u64) -> Self {
        Self(sequence)
    }

    pub const fn sequence(self) -> u64 {
        self.0
    }
}

impl fmt::Display for LoanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{LOAN_ID_PREFIX}{:04}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("'{0}' is not a loan reference")]
pub struct InvalidLoanId(pub String);

impl FromStr for LoanId {
    type Err = InvalidLoanId;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let digits = trimmed
            .get(..LOAN_ID_PREFIX.len())
            .filter(|prefix| prefix.eq_ignore_ascii_case(LOAN_ID_PREFIX))
            .map(|_| &trimmed[LOAN_ID_PREFIX.len()..])
            .ok_or_else(|| InvalidLoanId(value.to_string()))?;

        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(InvalidLoanId(value.to_string()));
        }

        digits
            .parse::<u64>()
            .map(Self)
            .map_err(|_| InvalidLoanId(value.to_string()))
    }
}

impl From<LoanId> for String {
    fn from(id: LoanId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for LoanId {
    type Error = InvalidLoanId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Member,
    Mufundisi,
    Elder,
}

impl Role {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Member => "Member",
            Self::Mufundisi => "Mufundisi",
            Self::Elder => "Elder",
        }
    }

    /// Roles allowed to review, approve, and decline loan applications.
    pub const fn can_approve(self) -> bool {
        matches!(self, Self::Mufundisi | Self::Elder)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "mufundisi" | "pastor" => Ok(Self::Mufundisi),
            "elder" => Ok(Self::Elder),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    #[default]
    RegionA,
    RegionB,
}

impl Region {
    pub const fn label(self) -> &'static str {
        match self {
            Self::RegionA => "Region A",
            Self::RegionB => "Region B",
        }
    }
}

impl FromStr for Region {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let compact: String = value
            .chars()
            .filter(|ch| !ch.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        match compact.as_str() {
            "a" | "regiona" => Ok(Self::RegionA),
            "b" | "regionb" => Ok(Self::RegionB),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Approved,
    Declined,
}

impl LoanStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Declined => "declined",
        }
    }
}

/// Endorsement of an applicant by another member of the same region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub recommender: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decline {
    pub declined_by: String,
    pub reason: String,
}

/// Loan aggregate. `status`, `approved_limit`, and `term_months` are derived
/// from the approval, recommendation, and decline facts by the underwriting
/// calculator after every mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub applicant_name: String,
    pub applicant_id: String,
    pub region: Region,
    pub requested_amount: Decimal,
    pub status: LoanStatus,
    pub mufundisi_approved: bool,
    pub elder_approvals: BTreeSet<String>,
    pub recommendations: Vec<Recommendation>,
    pub approved_limit: Decimal,
    pub term_months: u8,
    pub borrowed: Decimal,
    pub decline: Option<Decline>,
    pub created_at: DateTime<Utc>,
}

impl Loan {
    pub(crate) fn pending(
        id: LoanId,
        applicant_name: &str,
        applicant_id: &str,
        region: Region,
        requested_amount: Decimal,
    ) -> Self {
        Self {
            id,
            applicant_name: applicant_name.trim().to_string(),
            applicant_id: applicant_id.trim().to_string(),
            region,
            requested_amount,
            status: LoanStatus::Pending,
            mufundisi_approved: false,
            elder_approvals: BTreeSet::new(),
            recommendations: Vec::new(),
            approved_limit: Decimal::ZERO,
            term_months: 0,
            borrowed: Decimal::ZERO,
            decline: None,
            created_at: Utc::now(),
        }
    }

    pub fn remaining_credit(&self) -> Decimal {
        (self.approved_limit - self.borrowed).max(Decimal::ZERO)
    }

    pub fn is_declined(&self) -> bool {
        self.decline.is_some()
    }

    pub fn decline_reason(&self) -> Option<&str> {
        self.decline.as_ref().map(|decline| decline.reason.as_str())
    }

    pub fn applicant_matches(&self, name: &str) -> bool {
        normalize_identity(&self.applicant_name) == normalize_identity(name)
    }

    pub fn has_recommendation_from(&self, identity: &str) -> bool {
        let identity = normalize_identity(identity);
        self.recommendations
            .iter()
            .any(|recommendation| normalize_identity(&recommendation.recommender) == identity)
    }

    pub fn status_view(&self) -> LoanStatusView {
        LoanStatusView {
            loan_id: self.id,
            applicant_name: self.applicant_name.clone(),
            region: self.region,
            status: self.status.label(),
            requested_amount: self.requested_amount,
            approved_limit: self.approved_limit,
            term_months: self.term_months,
            borrowed: self.borrowed,
            remaining_credit: self.remaining_credit(),
            recommendations: self.recommendations.len(),
            elder_approvals: self.elder_approvals.len(),
            decline_reason: self.decline_reason().map(str::to_string),
        }
    }
}

/// Identities compare trimmed and case-insensitively.
pub(crate) fn normalize_identity(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Sanitized representation of a loan for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct LoanStatusView {
    pub loan_id: LoanId,
    pub applicant_name: String,
    pub region: Region,
    pub status: &'static str,
    pub requested_amount: Decimal,
    pub approved_limit: Decimal,
    pub term_months: u8,
    pub borrowed: Decimal,
    pub remaining_credit: Decimal,
    pub recommendations: usize,
    pub elder_approvals: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decline_reason: Option<String>,
}
