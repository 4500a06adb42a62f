#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Pending,
    Active,
    Unsubscribed,
    Bounced,
    Blocked,
}

impl SubscriptionStatus {
    pub const ALL: [SubscriptionStatus; 5] = [
        SubscriptionStatus::Pending,
        SubscriptionStatus::Active,
        SubscriptionStatus::Unsubscribed,
        SubscriptionStatus::Bounced,
        SubscriptionStatus::Blocked,
    ];

    pub fn is_unsubscribed(&self) -> bool {
        matches!(self, SubscriptionStatus::Unsubscribed)
    }

    /// Statuses only move forward. The single way back is an unsubscribed address
    /// signing up again, which puts it back to pending until it is confirmed.
    pub fn is_transition_allowed(&self, next: SubscriptionStatus) -> bool {
        use SubscriptionStatus::*;

        matches!(
            (self, next),
            (Pending, Active)
                | (Pending | Active, Unsubscribed)
                | (Pending | Active, Bounced)
                | (Pending | Active | Unsubscribed | Bounced, Blocked)
                | (Unsubscribed, Pending)
        )
    }

    pub fn parse(status: String) -> Result<SubscriptionStatus, String> {
        match status.as_str() {
            "pending" => Ok(SubscriptionStatus::Pending),
            "active" => Ok(SubscriptionStatus::Active),
            "unsubscribed" => Ok(SubscriptionStatus::Unsubscribed),
            "bounced" => Ok(SubscriptionStatus::Bounced),
            "blocked" => Ok(SubscriptionStatus::Blocked),
            _ => Err(format!("{} is not a valid subscription status", status)),
        }
    }
}

impl AsRef<str> for SubscriptionStatus {
    fn as_ref(&self) -> &str {
        match self {
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Unsubscribed => "unsubscribed",
            SubscriptionStatus::Bounced => "bounced",
            SubscriptionStatus::Blocked => "blocked",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}
