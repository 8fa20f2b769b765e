//! Database models and status enums
//!
//! Enum values round-trip through TEXT columns via `as_str`/`parse`; the same
//! strings appear on the wire (serde SCREAMING_SNAKE_CASE).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User role, resolved to capabilities once at the authorization boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Informant,
    Reporter,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Informant => "INFORMANT",
            Role::Reporter => "REPORTER",
            Role::Admin => "ADMIN",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "INFORMANT" => Some(Role::Informant),
            "REPORTER" => Some(Role::Reporter),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Admin gate: tip review, verification review, audit access,
    /// reputation event ingestion.
    pub fn can_review(&self) -> bool {
        matches!(self, Role::Admin)
    }

    /// Claim creation is reserved for reporters (verification status is
    /// checked separately against the store).
    pub fn can_claim(&self) -> bool {
        matches!(self, Role::Reporter)
    }
}

/// Tip review status. PENDING is the only non-terminal state; once decided
/// a tip never transitions again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TipStatus {
    Pending,
    Approved,
    Rejected,
}

impl TipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TipStatus::Pending => "PENDING",
            TipStatus::Approved => "APPROVED",
            TipStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<TipStatus> {
        match s {
            "PENDING" => Some(TipStatus::Pending),
            "APPROVED" => Some(TipStatus::Approved),
            "REJECTED" => Some(TipStatus::Rejected),
            _ => None,
        }
    }
}

/// Tip visibility mode. EXCLUSIVE grants the first picker a time-limited
/// embargo. The stored value is never flipped back to OPEN on expiry;
/// consumers derive the effective mode via `embargo::embargo_status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Visibility {
    Open,
    Exclusive,
}

impl Visibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Open => "OPEN",
            Visibility::Exclusive => "EXCLUSIVE",
        }
    }

    pub fn parse(s: &str) -> Option<Visibility> {
        match s {
            "OPEN" => Some(Visibility::Open),
            "EXCLUSIVE" => Some(Visibility::Exclusive),
            _ => None,
        }
    }
}

/// Verification review status. APPROVED is terminal; REJECTED may be
/// resubmitted back to PENDING by the same user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyStatus {
    Pending,
    Approved,
    Rejected,
}

impl VerifyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyStatus::Pending => "PENDING",
            VerifyStatus::Approved => "APPROVED",
            VerifyStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<VerifyStatus> {
        match s {
            "PENDING" => Some(VerifyStatus::Pending),
            "APPROVED" => Some(VerifyStatus::Approved),
            "REJECTED" => Some(VerifyStatus::Rejected),
            _ => None,
        }
    }
}

/// An admin's ruling on a pending tip or verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewDecision {
    Approved,
    Rejected,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approved => "APPROVED",
            ReviewDecision::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<ReviewDecision> {
        match s {
            "APPROVED" => Some(ReviewDecision::Approved),
            "REJECTED" => Some(ReviewDecision::Rejected),
            _ => None,
        }
    }
}

/// Reputation-affecting events. Deltas live in the settings table
/// (`rep_*` keys) so policy is tunable without a code change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReputationEventKind {
    /// First completion of a pick (+10). Applied internally by the pick
    /// ledger, never accepted from the ingestion endpoint.
    ArticleCompleted,
    /// Claimant responded within 24h of picking (+5, external timer input).
    ExcellentResponse,
    /// Pick proposal received no author response (-2, external timer input).
    ProposalIgnored,
    /// Misconduct report upheld (-20, moderation decision).
    ReportReceived,
    /// Formal warning issued (-30, moderation decision).
    WarningIssued,
}

impl ReputationEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReputationEventKind::ArticleCompleted => "ARTICLE_COMPLETED",
            ReputationEventKind::ExcellentResponse => "EXCELLENT_RESPONSE",
            ReputationEventKind::ProposalIgnored => "PROPOSAL_IGNORED",
            ReputationEventKind::ReportReceived => "REPORT_RECEIVED",
            ReputationEventKind::WarningIssued => "WARNING_ISSUED",
        }
    }

    pub fn parse(s: &str) -> Option<ReputationEventKind> {
        match s {
            "ARTICLE_COMPLETED" => Some(ReputationEventKind::ArticleCompleted),
            "EXCELLENT_RESPONSE" => Some(ReputationEventKind::ExcellentResponse),
            "PROPOSAL_IGNORED" => Some(ReputationEventKind::ProposalIgnored),
            "REPORT_RECEIVED" => Some(ReputationEventKind::ReportReceived),
            "WARNING_ISSUED" => Some(ReputationEventKind::WarningIssued),
            _ => None,
        }
    }

    /// Settings key holding this event's score delta.
    pub fn settings_key(&self) -> &'static str {
        match self {
            ReputationEventKind::ArticleCompleted => "rep_article_completed",
            ReputationEventKind::ExcellentResponse => "rep_excellent_response",
            ReputationEventKind::ProposalIgnored => "rep_proposal_ignored",
            ReputationEventKind::ReportReceived => "rep_report_received",
            ReputationEventKind::WarningIssued => "rep_warning_issued",
        }
    }

    pub fn default_delta(&self) -> i64 {
        match self {
            ReputationEventKind::ArticleCompleted => 10,
            ReputationEventKind::ExcellentResponse => 5,
            ReputationEventKind::ProposalIgnored => -2,
            ReputationEventKind::ReportReceived => -20,
            ReputationEventKind::WarningIssued => -30,
        }
    }

    /// Claim-scoped events carry a pick id and are applied at most once per
    /// (pick, kind) pair; moderation events are unscoped and always apply.
    pub fn is_claim_scoped(&self) -> bool {
        matches!(
            self,
            ReputationEventKind::ArticleCompleted
                | ReputationEventKind::ExcellentResponse
                | ReputationEventKind::ProposalIgnored
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentKind {
    Subscription,
    Boost,
}

impl PaymentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentKind::Subscription => "SUBSCRIPTION",
            PaymentKind::Boost => "BOOST",
        }
    }

    pub fn parse(s: &str) -> Option<PaymentKind> {
        match s {
            "SUBSCRIPTION" => Some(PaymentKind::Subscription),
            "BOOST" => Some(PaymentKind::Boost),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionPlan {
    Free,
    Basic,
    Premium,
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "FREE",
            SubscriptionPlan::Basic => "BASIC",
            SubscriptionPlan::Premium => "PREMIUM",
        }
    }

    pub fn parse(s: &str) -> Option<SubscriptionPlan> {
        match s {
            "FREE" => Some(SubscriptionPlan::Free),
            "BASIC" => Some(SubscriptionPlan::Basic),
            "PREMIUM" => Some(SubscriptionPlan::Premium),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "ACTIVE",
            SubscriptionStatus::Cancelled => "CANCELLED",
            SubscriptionStatus::Expired => "EXPIRED",
        }
    }

    pub fn parse(s: &str) -> Option<SubscriptionStatus> {
        match s {
            "ACTIVE" => Some(SubscriptionStatus::Active),
            "CANCELLED" => Some(SubscriptionStatus::Cancelled),
            "EXPIRED" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

/// Minimal user directory row. Authentication and profile data live with the
/// identity collaborator; the store keeps only what authorization and role
/// promotion need.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub guid: Uuid,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A submitted tip.
///
/// `embargo_ends` is set if and only if the tip is EXCLUSIVE and at least one
/// pick exists; it is never set for OPEN tips and never cleared once armed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    pub guid: Uuid,
    /// None when redacted for a non-author viewer of an anonymous tip.
    pub author_id: Option<Uuid>,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub region: Option<String>,
    pub visibility: Visibility,
    pub status: TipStatus,
    pub anonymous: bool,
    pub boosted: bool,
    pub view_count: i64,
    pub embargo_ends: Option<DateTime<Utc>>,
    pub reject_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tip {
    /// Anonymity is a read-time projection, not stored state: the author id
    /// is hidden from every viewer except the author, admins included.
    pub fn redact_author_for(&mut self, viewer: Option<Uuid>) {
        if self.anonymous && !self.is_authored_by(viewer) {
            self.author_id = None;
        }
    }

    pub fn is_authored_by(&self, viewer: Option<Uuid>) -> bool {
        match (self.author_id, viewer) {
            (Some(a), Some(v)) => a == v,
            _ => false,
        }
    }
}

/// A reporter's claim on a tip. At most one per (reporter, tip), enforced by
/// the store's unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pick {
    pub guid: Uuid,
    pub reporter_id: Uuid,
    pub tip_id: Uuid,
    pub proposal: Option<String>,
    pub accepted: bool,
    pub completed: bool,
    pub article_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Journalist credential review record, one per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Verification {
    pub guid: Uuid,
    pub user_id: Uuid,
    pub status: VerifyStatus,
    pub docs: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Reporter score card, provisioned lazily on the first qualifying event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reputation {
    pub user_id: Uuid,
    pub score: i64,
    pub articles_count: i64,
    pub last_active_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Append-only record of a privileged state transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub action: String,
    pub target_type: String,
    pub target_id: String,
    pub detail: Option<String>,
    pub actor_id: Uuid,
    /// The user the action was about, when there is one
    pub subject_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A confirmed payment, recorded from the payment collaborator's trigger.
/// `order_id` is unique; replays return the original outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub guid: Uuid,
    pub user_id: Uuid,
    pub order_id: String,
    pub kind: PaymentKind,
    pub amount: i64,
    pub tip_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    pub guid: Uuid,
    pub user_id: Uuid,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Lazy expiry: ACTIVE rows whose end has passed are reported inactive
    /// without a background sweep rewriting them.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.ends_at.map(|e| e > now).unwrap_or(true)
    }
}
