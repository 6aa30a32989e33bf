//! In-memory state behind the API endpoints.

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use platform_authn::{Principal, PrincipalId};
use platform_authz::Record;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug)]
pub struct Schedule {
    pub id: Uuid,
    pub name: String,
    pub user: Arc<Principal>,
}

impl Record for Schedule {
    fn attribute(&self, name: &str) -> Option<&dyn Record> {
        match name {
            "user" => Some(&self.user),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Shift {
    pub id: Uuid,
    pub title: String,
    pub schedule: Arc<Schedule>,
}

impl Record for Shift {
    fn attribute(&self, name: &str) -> Option<&dyn Record> {
        match name {
            "schedule" => Some(&self.schedule),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ExportToken {
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SlackSettings {
    pub default_channel: Option<String>,
    pub alert_group_timeout_hours: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrganizationSettings {
    pub name: String,
    pub is_resolution_note_required: bool,
}

impl Default for OrganizationSettings {
    fn default() -> Self {
        Self {
            name: "Default".into(),
            is_resolution_note_required: false,
        }
    }
}

#[derive(Debug, Default)]
pub struct Store {
    schedules: RwLock<HashMap<Uuid, Arc<Schedule>>>,
    shifts: RwLock<HashMap<Uuid, Arc<Shift>>>,
    export_tokens: RwLock<HashMap<PrincipalId, ExportToken>>,
    slack_settings: RwLock<SlackSettings>,
    organization: RwLock<OrganizationSettings>,
}

impl Store {
    pub async fn insert_schedule(&self, name: impl Into<String>, user: Arc<Principal>) -> Arc<Schedule> {
        let schedule = Arc::new(Schedule {
            id: Uuid::new_v4(),
            name: name.into(),
            user,
        });
        self.schedules
            .write()
            .await
            .insert(schedule.id, schedule.clone());
        schedule
    }

    pub async fn insert_shift(&self, title: impl Into<String>, schedule: Arc<Schedule>) -> Arc<Shift> {
        let shift = Arc::new(Shift {
            id: Uuid::new_v4(),
            title: title.into(),
            schedule,
        });
        self.shifts.write().await.insert(shift.id, shift.clone());
        shift
    }

    pub async fn schedules(&self) -> Vec<Arc<Schedule>> {
        let mut all: Vec<_> = self.schedules.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub async fn schedule(&self, id: Uuid) -> Option<Arc<Schedule>> {
        self.schedules.read().await.get(&id).cloned()
    }

    /// Removes the schedule together with its shifts.
    pub async fn remove_schedule(&self, id: Uuid) -> Option<Arc<Schedule>> {
        let removed = self.schedules.write().await.remove(&id)?;
        self.shifts
            .write()
            .await
            .retain(|_, shift| shift.schedule.id != id);
        Some(removed)
    }

    pub async fn shift(&self, schedule_id: Uuid, shift_id: Uuid) -> Option<Arc<Shift>> {
        self.shifts
            .read()
            .await
            .get(&shift_id)
            .filter(|shift| shift.schedule.id == schedule_id)
            .cloned()
    }

    pub async fn export_token(&self, user: PrincipalId) -> Option<ExportToken> {
        self.export_tokens.read().await.get(&user).cloned()
    }

    /// `None` when the user already holds a token.
    pub async fn create_export_token(&self, user: PrincipalId) -> Option<ExportToken> {
        let mut tokens = self.export_tokens.write().await;
        if tokens.contains_key(&user) {
            return None;
        }
        let token = ExportToken {
            token: Uuid::new_v4().simple().to_string(),
            created_at: Utc::now(),
        };
        tokens.insert(user, token.clone());
        Some(token)
    }

    pub async fn revoke_export_token(&self, user: PrincipalId) -> Option<ExportToken> {
        self.export_tokens.write().await.remove(&user)
    }

    pub async fn slack_settings(&self) -> SlackSettings {
        self.slack_settings.read().await.clone()
    }

    pub async fn set_slack_settings(&self, settings: SlackSettings) {
        *self.slack_settings.write().await = settings;
    }

    pub async fn organization(&self) -> OrganizationSettings {
        self.organization.read().await.clone()
    }

    pub async fn set_organization(&self, settings: OrganizationSettings) {
        *self.organization.write().await = settings;
    }
}
