//! In-process tenant directory
//!
//! Holds accounts and their inboxes, agents, teams and labels. Every write
//! returns the snapshots the audit trail needs: the created row, the row
//! before and after an update, or the removed rows.
//!
//! Resource writes go through [`TenantDirectory`] so they hold the accounts
//! read lock; an account deletion takes the write lock and can never race a
//! write into the account it removes. Lock order is accounts, then rows.

pub mod models;

pub use models::*;

use audit_engine::EntityType;
use chrono::Utc;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use thiserror::Error;
use tracing::info;
use validator::Validate;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    #[error("{0}")]
    Conflict(String),
}

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// A resource that lives inside one account
pub trait TenantResource: Clone + Serialize + Send + Sync + 'static {
    const ENTITY: EntityType;
    /// Singular name used in messages
    const KIND: &'static str;

    type Create: Validate + DeserializeOwned + Send + 'static;
    type Update: Validate + DeserializeOwned + Send + 'static;

    fn build(id: i64, account_id: i64, request: Self::Create) -> Self;
    fn apply(&mut self, request: Self::Update);
    fn id(&self) -> i64;
    fn account_id(&self) -> i64;

    /// Value that must be unique inside an account, compared case-insensitively
    fn unique_key(&self) -> Option<&str>;

    fn table(directory: &TenantDirectory) -> &ResourceTable<Self>;
}

/// Rows of one resource kind across all accounts
#[derive(Debug)]
pub struct ResourceTable<T> {
    rows: RwLock<BTreeMap<i64, T>>,
    next_id: AtomicI64,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl<T: TenantResource> ResourceTable<T> {
    pub fn list(&self, account_id: i64) -> Vec<T> {
        self.rows
            .read()
            .values()
            .filter(|row| row.account_id() == account_id)
            .cloned()
            .collect()
    }

    pub fn get(&self, account_id: i64, id: i64) -> DirectoryResult<T> {
        self.rows
            .read()
            .get(&id)
            .filter(|row| row.account_id() == account_id)
            .cloned()
            .ok_or(DirectoryError::NotFound { kind: T::KIND, id })
    }

    fn insert(&self, account_id: i64, request: T::Create) -> DirectoryResult<T> {
        let mut rows = self.rows.write();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let row = T::build(id, account_id, request);
        ensure_unique(rows.values(), &row)?;
        rows.insert(id, row.clone());
        Ok(row)
    }

    /// Apply `request` and return the row before and after
    fn update(&self, account_id: i64, id: i64, request: T::Update) -> DirectoryResult<(T, T)> {
        let mut rows = self.rows.write();
        let before = rows
            .get(&id)
            .filter(|row| row.account_id() == account_id)
            .cloned()
            .ok_or(DirectoryError::NotFound { kind: T::KIND, id })?;

        let mut after = before.clone();
        after.apply(request);
        ensure_unique(rows.values().filter(|row| row.id() != id), &after)?;
        rows.insert(id, after.clone());
        Ok((before, after))
    }

    fn remove(&self, account_id: i64, id: i64) -> DirectoryResult<T> {
        let mut rows = self.rows.write();
        match rows.get(&id) {
            Some(row) if row.account_id() == account_id => {}
            _ => return Err(DirectoryError::NotFound { kind: T::KIND, id }),
        }
        rows.remove(&id).ok_or(DirectoryError::NotFound { kind: T::KIND, id })
    }

    fn purge_account(&self, account_id: i64) -> Vec<T> {
        let mut rows = self.rows.write();
        let ids: Vec<i64> = rows
            .values()
            .filter(|row| row.account_id() == account_id)
            .map(|row| row.id())
            .collect();
        ids.iter().filter_map(|id| rows.remove(id)).collect()
    }
}

fn ensure_unique<'a, T: TenantResource>(
    mut others: impl Iterator<Item = &'a T>,
    candidate: &T,
) -> DirectoryResult<()> {
    let Some(key) = candidate.unique_key() else {
        return Ok(());
    };
    let taken = others.any(|row| {
        row.account_id() == candidate.account_id()
            && row.unique_key().is_some_and(|other| other.eq_ignore_ascii_case(key))
    });
    if taken {
        return Err(DirectoryError::Conflict(format!(
            "{} '{key}' already exists in account {}",
            T::KIND,
            candidate.account_id()
        )));
    }
    Ok(())
}

/// Rows removed together with their account
#[derive(Debug, Clone, Default)]
pub struct PurgedResources {
    pub inboxes: Vec<Inbox>,
    pub agents: Vec<Agent>,
    pub teams: Vec<Team>,
    pub labels: Vec<Label>,
}

impl PurgedResources {
    pub fn len(&self) -> usize {
        self.inboxes.len() + self.agents.len() + self.teams.len() + self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Accounts and their resources
#[derive(Debug)]
pub struct TenantDirectory {
    accounts: RwLock<BTreeMap<i64, Account>>,
    next_account_id: AtomicI64,
    inboxes: ResourceTable<Inbox>,
    agents: ResourceTable<Agent>,
    teams: ResourceTable<Team>,
    labels: ResourceTable<Label>,
}

impl Default for TenantDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantDirectory {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(BTreeMap::new()),
            next_account_id: AtomicI64::new(1),
            inboxes: ResourceTable::default(),
            agents: ResourceTable::default(),
            teams: ResourceTable::default(),
            labels: ResourceTable::default(),
        }
    }

    /// Register an account with a fixed id, as configured at startup
    pub fn seed_account(&self, id: i64, name: impl Into<String>) -> Account {
        let account = Account {
            id,
            name: name.into(),
            locale: "en".to_string(),
            domain: None,
            support_email: None,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        };
        self.accounts.write().insert(id, account.clone());
        self.next_account_id.fetch_max(id.saturating_add(1), Ordering::SeqCst);
        account
    }

    pub fn list_accounts(&self) -> Vec<Account> {
        self.accounts.read().values().cloned().collect()
    }

    pub fn get_account(&self, id: i64) -> DirectoryResult<Account> {
        self.accounts
            .read()
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound { kind: "account", id })
    }

    pub fn account_exists(&self, id: i64) -> bool {
        self.accounts.read().contains_key(&id)
    }

    pub fn create_account(&self, request: CreateAccountRequest) -> DirectoryResult<Account> {
        let mut accounts = self.accounts.write();
        let id = self.next_account_id.fetch_add(1, Ordering::SeqCst);
        if id <= 0 || accounts.contains_key(&id) {
            return Err(DirectoryError::Conflict("account ids are exhausted".to_string()));
        }
        let account = Account {
            id,
            name: request.name,
            locale: request.locale,
            domain: request.domain,
            support_email: request.support_email,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        };
        accounts.insert(id, account.clone());
        info!(account_id = id, "Account created");
        Ok(account)
    }

    /// Apply `request` and return the account before and after
    pub fn update_account(&self, id: i64, request: UpdateAccountRequest) -> DirectoryResult<(Account, Account)> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .get_mut(&id)
            .ok_or(DirectoryError::NotFound { kind: "account", id })?;

        let before = account.clone();
        if let Some(name) = request.name {
            account.name = name;
        }
        if let Some(locale) = request.locale {
            account.locale = locale;
        }
        if let Some(domain) = request.domain {
            account.domain = Some(domain);
        }
        if let Some(email) = request.support_email {
            account.support_email = Some(email);
        }
        if let Some(status) = request.status {
            account.status = status;
        }
        Ok((before, account.clone()))
    }

    /// Remove an account together with every resource it owns
    pub fn delete_account(&self, id: i64) -> DirectoryResult<(Account, PurgedResources)> {
        let mut accounts = self.accounts.write();
        let account = accounts
            .remove(&id)
            .ok_or(DirectoryError::NotFound { kind: "account", id })?;

        let purged = PurgedResources {
            inboxes: self.inboxes.purge_account(id),
            agents: self.agents.purge_account(id),
            teams: self.teams.purge_account(id),
            labels: self.labels.purge_account(id),
        };
        drop(accounts);

        info!(account_id = id, purged = purged.len(), "Account deleted");
        Ok((account, purged))
    }

    /// Read access to one resource kind
    pub fn resources<T: TenantResource>(&self) -> &ResourceTable<T> {
        T::table(self)
    }

    pub fn insert_resource<T: TenantResource>(&self, account_id: i64, request: T::Create) -> DirectoryResult<T> {
        let accounts = self.accounts.read();
        require_account(&accounts, account_id)?;
        T::table(self).insert(account_id, request)
    }

    /// Apply `request` and return the row before and after
    pub fn update_resource<T: TenantResource>(
        &self,
        account_id: i64,
        id: i64,
        request: T::Update,
    ) -> DirectoryResult<(T, T)> {
        let accounts = self.accounts.read();
        require_account(&accounts, account_id)?;
        T::table(self).update(account_id, id, request)
    }

    pub fn remove_resource<T: TenantResource>(&self, account_id: i64, id: i64) -> DirectoryResult<T> {
        let accounts = self.accounts.read();
        require_account(&accounts, account_id)?;
        T::table(self).remove(account_id, id)
    }
}

fn require_account(accounts: &BTreeMap<i64, Account>, id: i64) -> DirectoryResult<()> {
    if accounts.contains_key(&id) {
        Ok(())
    } else {
        Err(DirectoryError::NotFound { kind: "account", id })
    }
}

impl TenantResource for Inbox {
    const ENTITY: EntityType = EntityType::Inbox;
    const KIND: &'static str = "inbox";

    type Create = CreateInboxRequest;
    type Update = UpdateInboxRequest;

    fn build(id: i64, account_id: i64, request: CreateInboxRequest) -> Self {
        Self {
            id,
            account_id,
            name: request.name,
            channel_type: request.channel_type,
            greeting_enabled: request.greeting_enabled,
            greeting_message: request.greeting_message,
            enable_auto_assignment: request.enable_auto_assignment,
        }
    }

    fn apply(&mut self, request: UpdateInboxRequest) {
        if let Some(name) = request.name {
            self.name = name;
        }
        if let Some(enabled) = request.greeting_enabled {
            self.greeting_enabled = enabled;
        }
        if let Some(message) = request.greeting_message {
            self.greeting_message = Some(message);
        }
        if let Some(auto) = request.enable_auto_assignment {
            self.enable_auto_assignment = auto;
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn account_id(&self) -> i64 {
        self.account_id
    }

    fn unique_key(&self) -> Option<&str> {
        None
    }

    fn table(directory: &TenantDirectory) -> &ResourceTable<Self> {
        &directory.inboxes
    }
}

impl TenantResource for Agent {
    const ENTITY: EntityType = EntityType::Agent;
    const KIND: &'static str = "agent";

    type Create = CreateAgentRequest;
    type Update = UpdateAgentRequest;

    fn build(id: i64, account_id: i64, request: CreateAgentRequest) -> Self {
        Self {
            id,
            account_id,
            name: request.name,
            email: request.email,
            role: request.role,
            availability: Availability::Offline,
        }
    }

    fn apply(&mut self, request: UpdateAgentRequest) {
        if let Some(name) = request.name {
            self.name = name;
        }
        if let Some(role) = request.role {
            self.role = role;
        }
        if let Some(availability) = request.availability {
            self.availability = availability;
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn account_id(&self) -> i64 {
        self.account_id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.email)
    }

    fn table(directory: &TenantDirectory) -> &ResourceTable<Self> {
        &directory.agents
    }
}

impl TenantResource for Team {
    const ENTITY: EntityType = EntityType::Team;
    const KIND: &'static str = "team";

    type Create = CreateTeamRequest;
    type Update = UpdateTeamRequest;

    fn build(id: i64, account_id: i64, request: CreateTeamRequest) -> Self {
        Self {
            id,
            account_id,
            name: request.name,
            description: request.description,
            allow_auto_assign: request.allow_auto_assign,
        }
    }

    fn apply(&mut self, request: UpdateTeamRequest) {
        if let Some(name) = request.name {
            self.name = name;
        }
        if let Some(description) = request.description {
            self.description = Some(description);
        }
        if let Some(auto) = request.allow_auto_assign {
            self.allow_auto_assign = auto;
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn account_id(&self) -> i64 {
        self.account_id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.name)
    }

    fn table(directory: &TenantDirectory) -> &ResourceTable<Self> {
        &directory.teams
    }
}

impl TenantResource for Label {
    const ENTITY: EntityType = EntityType::Label;
    const KIND: &'static str = "label";

    type Create = CreateLabelRequest;
    type Update = UpdateLabelRequest;

    fn build(id: i64, account_id: i64, request: CreateLabelRequest) -> Self {
        Self {
            id,
            account_id,
            title: request.title,
            description: request.description,
            color: request.color,
            show_on_sidebar: request.show_on_sidebar,
        }
    }

    fn apply(&mut self, request: UpdateLabelRequest) {
        if let Some(title) = request.title {
            self.title = title;
        }
        if let Some(description) = request.description {
            self.description = Some(description);
        }
        if let Some(color) = request.color {
            self.color = color;
        }
        if let Some(show) = request.show_on_sidebar {
            self.show_on_sidebar = show;
        }
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn account_id(&self) -> i64 {
        self.account_id
    }

    fn unique_key(&self) -> Option<&str> {
        Some(&self.title)
    }

    fn table(directory: &TenantDirectory) -> &ResourceTable<Self> {
        &directory.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(title: &str) -> CreateLabelRequest {
        CreateLabelRequest {
            title: title.to_string(),
            description: None,
            color: "#FF0000".to_string(),
            show_on_sidebar: true,
        }
    }

    fn directory() -> TenantDirectory {
        let directory = TenantDirectory::new();
        directory.seed_account(1, "Acme");
        directory.seed_account(2, "Globex");
        directory
    }

    #[test]
    fn test_resources_are_scoped_to_account() {
        let directory = directory();
        let created = directory.insert_resource::<Label>(1, label("vip")).unwrap();

        assert!(directory.resources::<Label>().get(1, created.id).is_ok());
        assert_eq!(
            directory.resources::<Label>().get(2, created.id),
            Err(DirectoryError::NotFound { kind: "label", id: created.id })
        );
        assert!(directory.resources::<Label>().list(2).is_empty());
        assert!(directory.remove_resource::<Label>(2, created.id).is_err());
    }

    #[test]
    fn test_unique_key_is_per_account_and_case_insensitive() {
        let directory = directory();
        let labels = directory.resources::<Label>();
        labels.insert(1, label("vip")).unwrap();

        assert!(matches!(labels.insert(1, label("VIP")), Err(DirectoryError::Conflict(_))));
        assert!(labels.insert(2, label("vip")).is_ok());
    }

    #[test]
    fn test_update_returns_both_snapshots() {
        let directory = directory();
        let labels = directory.resources::<Label>();
        let created = labels.insert(1, label("vip")).unwrap();
        let other = labels.insert(1, label("churn")).unwrap();

        let (before, after) = labels
            .update(
                1,
                created.id,
                UpdateLabelRequest {
                    color: Some("#00FF00".to_string()),
                    ..UpdateLabelRequest::default()
                },
            )
            .unwrap();
        assert_eq!(before.color, "#FF0000");
        assert_eq!(after.color, "#00FF00");

        let clash = UpdateLabelRequest {
            title: Some("vip".to_string()),
            ..UpdateLabelRequest::default()
        };
        assert!(matches!(labels.update(1, other.id, clash), Err(DirectoryError::Conflict(_))));
    }

    #[test]
    fn test_delete_account_returns_purged_resources() {
        let directory = directory();
        let vip = directory.insert_resource::<Label>(1, label("vip")).unwrap();
        directory.insert_resource::<Label>(2, label("vip")).unwrap();
        let team = directory
            .insert_resource::<Team>(
                1,
                CreateTeamRequest {
                    name: "Tier 1".to_string(),
                    description: None,
                    allow_auto_assign: true,
                },
            )
            .unwrap();

        let (account, purged) = directory.delete_account(1).unwrap();
        assert_eq!(account.name, "Acme");
        assert_eq!(purged.labels, vec![vip]);
        assert_eq!(purged.teams, vec![team]);
        assert_eq!(purged.len(), 2);
        assert!(!directory.account_exists(1));
        assert!(directory.resources::<Label>().list(1).is_empty());
        assert_eq!(directory.resources::<Label>().list(2).len(), 1);
    }

    #[test]
    fn test_writes_into_missing_account_are_refused() {
        let directory = directory();
        directory.delete_account(2).unwrap();

        assert_eq!(
            directory.insert_resource::<Label>(2, label("vip")),
            Err(DirectoryError::NotFound { kind: "account", id: 2 })
        );
        assert!(directory.resources::<Label>().list(2).is_empty());
        assert!(matches!(
            directory.update_resource::<Label>(2, 1, UpdateLabelRequest::default()),
            Err(DirectoryError::NotFound { kind: "account", .. })
        ));
    }

    #[test]
    fn test_seed_at_max_id_does_not_overflow() {
        let directory = TenantDirectory::new();
        directory.seed_account(i64::MAX, "Edge");
        assert!(directory.account_exists(i64::MAX));

        let next = directory.create_account(CreateAccountRequest {
            name: "Overflow".to_string(),
            locale: "en".to_string(),
            domain: None,
            support_email: None,
        });
        assert!(matches!(next, Err(DirectoryError::Conflict(_))));
        assert_eq!(directory.get_account(i64::MAX).unwrap().name, "Edge");
    }

    #[test]
    fn test_created_accounts_follow_seeded_ids() {
        let directory = TenantDirectory::new();
        directory.seed_account(4, "Seeded");
        let created = directory.create_account(CreateAccountRequest {
            name: "New".to_string(),
            locale: "en".to_string(),
            domain: None,
            support_email: None,
        })
        .unwrap();
        assert_eq!(created.id, 5);
    }
}
