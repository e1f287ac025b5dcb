//! Interaction handlers.
//!
//! Each user action (login, signup, submission, page load) is one call here:
//! fetch a fresh snapshot from the store, run the core, return the result.
//! Session identity is passed in explicitly; nothing is kept between calls.

use crate::aggregate::{
    AggregateSummary, CategoryAggregate, UserAggregate, UserSummary, by_category, by_user,
    total_summary, user_summary,
};
use crate::error::{DashboardError, Result};
use crate::login::AuthProvider;
use crate::record::{MAX_QUANTITY_KG, Record};
use crate::session::SessionContext;
use crate::store::{Profile, RECORDS_COLLECTION, RecordStore};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;

/// Name shown for accounts whose profile is missing
pub const UNKNOWN_NAME: &str = "Unknown";

/// Everything the community page renders
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommunityView {
    pub summary: AggregateSummary,
    pub by_category: Vec<CategoryAggregate>,
    pub by_user: Vec<UserAggregate>,
    /// Raw records for the data table, newest first
    pub records: Vec<Record>,
}

#[derive(Clone)]
pub struct Dashboard {
    store: Arc<dyn RecordStore>,
    auth: Arc<dyn AuthProvider>,
}

impl Dashboard {
    pub fn new(store: Arc<dyn RecordStore>, auth: Arc<dyn AuthProvider>) -> Self {
        Dashboard { store, auth }
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    /// Sign in and resolve the display name from the stored profile.
    pub fn login(&self, email: &str, password: &str) -> Result<SessionContext> {
        let identity = self.auth.sign_in(email, password).inspect_err(|e| {
            warn!("login failed for {}: {}", email.trim(), e);
        })?;

        let name = match self.store.get_profile(&identity.email)? {
            Some(profile) => profile.name,
            None => UNKNOWN_NAME.to_string(),
        };

        info!("{} logged in as {}", identity.email, name);
        Ok(SessionContext {
            email: identity.email,
            name,
        })
    }

    /// Create an account and write its profile document
    ///
    /// The caller still has to log in afterwards.
    pub fn signup(&self, email: &str, password: &str, name: &str) -> Result<Profile> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DashboardError::InvalidInput(
                "Full name cannot be empty".to_string(),
            ));
        }

        let identity = self.auth.sign_up(email, password)?;
        let profile = Profile {
            email: identity.email,
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.store.put_profile(&profile)?;

        info!("created account {} ({})", profile.email, profile.name);
        Ok(profile)
    }

    /// Record a submission from the data-entry form
    ///
    /// The form does not accept an empty quantity, so zero is rejected
    /// here even though [`crate::record::compute_yield`] accepts it.
    /// Quantities above [`MAX_QUANTITY_KG`] are rejected too.
    pub fn submit(&self, session: &SessionContext, category: &str, quantity: f64) -> Result<Record> {
        if quantity == 0.0 || quantity > MAX_QUANTITY_KG {
            return Err(DashboardError::InvalidQuantity(quantity));
        }

        let record = Record::create(&session.name, category, quantity, Utc::now())?;
        self.store.add_record(RECORDS_COLLECTION, &record)?;

        info!(
            "{} added {} kg of {} -> {:.2} L",
            record.user, record.quantity, record.category, record.ethanol
        );
        Ok(record)
    }

    /// Community totals, groupings and the data table.
    pub fn community(&self) -> Result<CommunityView> {
        let records = self.store.list_records(RECORDS_COLLECTION)?;
        Ok(CommunityView {
            summary: total_summary(&records),
            by_category: by_category(&records),
            by_user: by_user(&records),
            records,
        })
    }

    /// Personal totals for the sidebar; `None` before the first submission.
    pub fn sidebar(&self, session: &SessionContext) -> Result<Option<UserSummary>> {
        let records = self
            .store
            .list_records_for_user(RECORDS_COLLECTION, &session.name)?;
        Ok(user_summary(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login::Identity;
    use crate::store::MemoryStore;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Plaintext accounts, good enough to exercise the handlers.
    #[derive(Default)]
    struct FakeAuth {
        accounts: Mutex<HashMap<String, String>>,
    }

    impl AuthProvider for FakeAuth {
        fn sign_in(&self, email: &str, password: &str) -> Result<Identity> {
            let accounts = self.accounts.lock().unwrap();
            match accounts.get(email) {
                Some(stored) if stored == password => Ok(Identity { email: email.into() }),
                _ => Err(DashboardError::Auth("Invalid email or password".into())),
            }
        }

        fn sign_up(&self, email: &str, password: &str) -> Result<Identity> {
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(DashboardError::Auth("Email address is already registered".into()));
            }
            accounts.insert(email.into(), password.into());
            Ok(Identity { email: email.into() })
        }
    }

    fn dashboard() -> Dashboard {
        Dashboard::new(Arc::new(MemoryStore::new()), Arc::new(FakeAuth::default()))
    }

    fn session(name: &str) -> SessionContext {
        SessionContext {
            email: format!("{}@example.org", name.to_lowercase()),
            name: name.to_string(),
        }
    }

    #[test]
    fn signup_writes_profile_and_login_uses_its_name() {
        let dashboard = dashboard();
        dashboard.signup("asha@example.org", "secret1", " Asha Rao ").unwrap();

        let ctx = dashboard.login("asha@example.org", "secret1").unwrap();
        assert_eq!(ctx.name, "Asha Rao");
        assert_eq!(ctx.email, "asha@example.org");
    }

    #[test]
    fn login_without_profile_is_unknown() {
        let auth = Arc::new(FakeAuth::default());
        auth.sign_up("ghost@example.org", "secret1").unwrap();
        let dashboard = Dashboard::new(Arc::new(MemoryStore::new()), auth);

        let ctx = dashboard.login("ghost@example.org", "secret1").unwrap();
        assert_eq!(ctx.name, UNKNOWN_NAME);
    }

    #[test]
    fn signup_needs_a_name() {
        let dashboard = dashboard();
        assert!(matches!(
            dashboard.signup("asha@example.org", "secret1", "  "),
            Err(DashboardError::InvalidInput(_))
        ));
        assert!(dashboard.login("asha@example.org", "secret1").is_err());
    }

    #[test]
    fn submissions_feed_the_community_view() {
        let dashboard = dashboard();
        dashboard.submit(&session("A"), "Algae", 10.0).unwrap();
        dashboard.submit(&session("A"), "Tea Powder Waste", 4.0).unwrap();
        dashboard.submit(&session("B"), "Algae", 2.0).unwrap();

        let view = dashboard.community().unwrap();
        assert_eq!(view.summary.total_quantity, 16.0);
        assert_eq!(view.summary.total_ethanol, 7.0);
        assert_eq!(view.records.len(), 3);
        assert_eq!(view.by_user[0].user, "A");
        assert_eq!(view.by_user[0].total_ethanol, 6.0);
        assert_eq!(view.by_category[0].category, "Algae");
    }

    #[test]
    fn empty_community_has_no_efficiency() {
        let view = dashboard().community().unwrap();
        assert_eq!(view.summary.efficiency_percent, None);
        assert!(view.records.is_empty());
    }

    #[test]
    fn submit_rejects_zero_negative_and_unknown() {
        let dashboard = dashboard();
        let ctx = session("A");
        assert!(matches!(
            dashboard.submit(&ctx, "Algae", 0.0),
            Err(DashboardError::InvalidQuantity(_))
        ));
        assert!(matches!(
            dashboard.submit(&ctx, "Algae", -3.0),
            Err(DashboardError::InvalidQuantity(_))
        ));
        assert!(matches!(
            dashboard.submit(&ctx, "Algae", 1e308),
            Err(DashboardError::InvalidQuantity(_))
        ));
        assert!(matches!(
            dashboard.submit(&ctx, "Glass", 3.0),
            Err(DashboardError::UnknownCategory(_))
        ));
        assert!(dashboard.community().unwrap().records.is_empty());
    }

    #[test]
    fn sidebar_is_per_user() {
        let dashboard = dashboard();
        let asha = session("Asha");
        assert_eq!(dashboard.sidebar(&asha).unwrap(), None);

        dashboard.submit(&asha, "Peanut Shell", 3.0).unwrap();
        dashboard.submit(&session("Ravi"), "Algae", 100.0).unwrap();

        assert_eq!(
            dashboard.sidebar(&asha).unwrap(),
            Some(UserSummary { total_quantity: 3.0, total_ethanol: 0.75 })
        );
    }
}
