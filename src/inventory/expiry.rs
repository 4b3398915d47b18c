use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::Item;

/// Items left this many days or fewer before expiring are flagged.
pub const WARNING_DAYS: i64 = 3;

/// Window used by the expiring-items listing when the caller gives none.
pub const DEFAULT_EXPIRING_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    Expired,
    Warning,
    Fresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpirationStatus {
    pub freshness: Freshness,
    /// Calendar days until expiry; negative once expired.
    pub days_left: i64,
}

impl ExpirationStatus {
    pub fn classify(expiration_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days_left = (expiration_date.date_naive() - now.date_naive()).num_days();

        let freshness = if days_left < 0 {
            Freshness::Expired
        } else if days_left <= WARNING_DAYS {
            Freshness::Warning
        } else {
            Freshness::Fresh
        };

        Self { freshness, days_left }
    }

    pub fn label(&self) -> String {
        relative_day_label(self.days_left)
    }
}

/// Human wording for a day offset, as shown next to expiration dates.
pub fn relative_day_label(days: i64) -> String {
    match days {
        0 => "오늘".to_string(),
        1 => "내일".to_string(),
        -1 => "어제".to_string(),
        d if d > 0 => format!("{}일 후", d),
        d => format!("{}일 전", d.abs()),
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiringItems {
    /// Expiring within the window, soonest first.
    #[serde(default)]
    pub expiring_items: Vec<Item>,
    /// Already expired, most recently expired first.
    #[serde(default)]
    pub expired_items: Vec<Item>,
}

impl ExpiringItems {
    pub fn expiring_count(&self) -> usize {
        self.expiring_items.len()
    }

    pub fn expired_count(&self) -> usize {
        self.expired_items.len()
    }
}

/// End of the expiring window. A zero window means the default one; a
/// negative window ends before `now` and so matches nothing.
fn window_end(days: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    let days = if days == 0 { DEFAULT_EXPIRING_WINDOW_DAYS } else { days };

    Duration::try_days(days)
        .and_then(|window| now.checked_add_signed(window))
        .unwrap_or(if days > 0 { DateTime::<Utc>::MAX_UTC } else { DateTime::<Utc>::MIN_UTC })
}

/// Split items into "expiring within `days`" and "already expired".
/// Items without an expiration date are in neither list.
pub fn partition_expiring(items: &[Item], days: i64, now: DateTime<Utc>) -> ExpiringItems {
    let horizon = window_end(days, now);

    let mut expiring: Vec<(DateTime<Utc>, &Item)> = Vec::new();
    let mut expired: Vec<(DateTime<Utc>, &Item)> = Vec::new();

    for item in items {
        let Some(expiration) = item.expiration_date else { continue };
        if expiration < now {
            expired.push((expiration, item));
        } else if expiration <= horizon {
            expiring.push((expiration, item));
        }
    }

    expiring.sort_by_key(|(expiration, _)| *expiration);
    expired.sort_by(|a, b| b.0.cmp(&a.0));

    ExpiringItems {
        expiring_items: expiring.into_iter().map(|(_, item)| item.clone()).collect(),
        expired_items: expired.into_iter().map(|(_, item)| item.clone()).collect(),
    }
}
