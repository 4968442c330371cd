//! Outreach catalog: frameworks (tactical, one stage lane, a timed
//! sequence of channel actions) and playbooks (strategic, which
//! frameworks run in which stage for which campaigns).

use crate::{
    customer::Customer,
    error::{SimError, SimResult},
    stage::Stage,
    types::{EntityId, Lag},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Whatsapp,
    Email,
    Sms,
    Call,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WhatsAppConfig {
    pub sender: String,
    pub template_id: String,
    pub language: String,
    #[serde(default)]
    pub variables: HashMap<String, String>,
    #[serde(default)]
    pub fallback_channel: Option<Channel>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmailConfig {
    pub from_address: String,
    pub subject: String,
    pub template_id: String,
    pub include_invoice: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SmsConfig {
    pub sender_id: String,
    pub message_content: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallType {
    Bot,
    Human,
    Ivr,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallObjective {
    PaymentReminder,
    Commitment,
    Renegotiation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CallConfig {
    pub caller_id: String,
    pub call_type: CallType,
    #[serde(default)]
    pub script_id: Option<String>,
    pub objective: CallObjective,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionConfig {
    Whatsapp(WhatsAppConfig),
    Email(EmailConfig),
    Sms(SmsConfig),
    Call(CallConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FrameworkAction {
    pub id: EntityId,
    pub order: u32,
    pub channel: Channel,
    /// Offset in days from the due date (-2, 0, +5 ...).
    pub timing: Lag,
    pub template_name: String,
    #[serde(default)]
    pub config: Option<ActionConfig>,
}

impl FrameworkAction {
    /// Complete enough to send: named, and configured for its channel.
    /// System actions carry no channel configuration.
    pub fn is_valid(&self) -> bool {
        if self.template_name.trim().is_empty() {
            return false;
        }
        match (self.channel, &self.config) {
            (Channel::System, _) => true,
            (Channel::Whatsapp, Some(ActionConfig::Whatsapp(wa))) => {
                !wa.sender.is_empty() && !wa.template_id.is_empty() && !wa.language.is_empty()
            }
            (Channel::Email, Some(ActionConfig::Email(em))) => {
                !em.from_address.is_empty() && !em.subject.is_empty() && !em.template_id.is_empty()
            }
            (Channel::Sms, Some(ActionConfig::Sms(sms))) => {
                !sms.sender_id.is_empty() && !sms.message_content.is_empty()
            }
            (Channel::Call, Some(ActionConfig::Call(call))) => !call.caller_id.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkStatus {
    Active,
    Paused,
    Deprecated,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FrameworkUsage {
    pub playbooks: u32,
    pub campaigns: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Framework {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    /// The board column this framework's customers belong to.
    pub lane: Stage,
    pub status: FrameworkStatus,
    pub actions: Vec<FrameworkAction>,
    #[serde(default)]
    pub usage: FrameworkUsage,
    pub updated_at: DateTime<Utc>,
}

impl Framework {
    /// Actions in timing order; ties keep their configured order.
    pub fn sorted_actions(&self) -> Vec<&FrameworkAction> {
        let mut actions: Vec<_> = self.actions.iter().collect();
        actions.sort_by_key(|a| (a.timing, a.order));
        actions
    }

    /// Default timing for a newly added action: two days after the last.
    pub fn next_action_timing(&self) -> Lag {
        self.actions
            .iter()
            .map(|a| a.timing)
            .max()
            .map(|t| t.saturating_add(2))
            .unwrap_or(1)
    }

    /// Append an unconfigured action; it stays invalid until configured.
    pub fn add_action(&mut self, id: impl Into<EntityId>, channel: Channel) -> &FrameworkAction {
        let action = FrameworkAction {
            id: id.into(),
            order: self.actions.len() as u32 + 1,
            channel,
            timing: self.next_action_timing(),
            template_name: "New Action".into(),
            config: None,
        };
        self.actions.push(action);
        &self.actions[self.actions.len() - 1]
    }

    pub fn has_invalid_actions(&self) -> bool {
        self.actions.iter().any(|a| !a.is_valid())
    }

    pub fn validate(&self) -> SimResult<()> {
        let invalid = |reason: String| SimError::InvalidFramework {
            id: self.id.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty".into()));
        }
        if let Some(bad) = self.actions.iter().find(|a| !a.is_valid()) {
            return Err(invalid(format!("action '{}' is incomplete", bad.id)));
        }
        Ok(())
    }

    /// Actions due for a customer sitting at `lag`.
    pub fn actions_at(&self, lag: Lag) -> impl Iterator<Item = &FrameworkAction> {
        self.actions.iter().filter(move |a| a.timing == lag)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybookStatus {
    Draft,
    Active,
    Deprecated,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UseCase {
    Subscription,
    Installments,
    OneTime,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybookStage {
    pub stage: Stage,
    /// Ordered.
    pub framework_ids: Vec<EntityId>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playbook {
    pub id: EntityId,
    pub name: String,
    pub description: String,
    pub status: PlaybookStatus,
    pub risk_profile: RiskProfile,
    pub use_case: UseCase,
    pub version: f64,
    pub stages: Vec<PlaybookStage>,
    #[serde(default)]
    pub campaigns: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub updated_by: String,
}

impl Playbook {
    pub fn frameworks_for(&self, stage: Stage) -> &[EntityId] {
        self.stages
            .iter()
            .find(|s| s.stage == stage)
            .map(|s| s.framework_ids.as_slice())
            .unwrap_or(&[])
    }

    pub fn covers(&self, stage: Stage) -> bool {
        !self.frameworks_for(stage).is_empty()
    }

    pub fn add_framework(&mut self, stage: Stage, framework_id: &str) {
        match self.stages.iter_mut().find(|s| s.stage == stage) {
            Some(entry) => {
                if !entry.framework_ids.iter().any(|id| id == framework_id) {
                    entry.framework_ids.push(framework_id.to_string());
                }
            }
            None => self.stages.push(PlaybookStage {
                stage,
                framework_ids: vec![framework_id.to_string()],
            }),
        }
    }

    pub fn remove_framework(&mut self, stage: Stage, framework_id: &str) {
        if let Some(entry) = self.stages.iter_mut().find(|s| s.stage == stage) {
            entry.framework_ids.retain(|id| id != framework_id);
        }
        self.stages.retain(|s| !s.framework_ids.is_empty());
    }

    /// A draft copy at version 1.0.
    pub fn duplicate(&self, new_id: impl Into<EntityId>, now: DateTime<Utc>) -> Playbook {
        Playbook {
            id: new_id.into(),
            name: format!("{} (Copy)", self.name),
            status: PlaybookStatus::Draft,
            version: 1.0,
            updated_at: now,
            ..self.clone()
        }
    }

    /// Ready to save: named, described, and at least one stage configured.
    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.description.trim().is_empty() && !self.stages.is_empty()
    }

    fn referenced_frameworks(&self) -> impl Iterator<Item = &EntityId> {
        self.stages.iter().flat_map(|s| s.framework_ids.iter())
    }
}

/// An outreach action a customer is due for this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct OutreachStep<'a> {
    pub playbook: &'a Playbook,
    pub framework: &'a Framework,
    pub action: &'a FrameworkAction,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    frameworks: Vec<Framework>,
    playbooks: Vec<Playbook>,
}

impl Catalog {
    /// Build a catalog, rejecting incomplete frameworks and playbooks that
    /// point at missing frameworks.
    pub fn from_parts(frameworks: Vec<Framework>, playbooks: Vec<Playbook>) -> SimResult<Self> {
        for framework in &frameworks {
            framework.validate()?;
        }
        let mut catalog = Self {
            frameworks,
            playbooks: Vec::new(),
        };
        for playbook in playbooks {
            catalog.upsert_playbook(playbook)?;
        }
        catalog.recount_usage();
        Ok(catalog)
    }

    pub fn frameworks(&self) -> &[Framework] {
        &self.frameworks
    }

    pub fn playbooks(&self) -> &[Playbook] {
        &self.playbooks
    }

    pub fn framework(&self, id: &str) -> SimResult<&Framework> {
        self.frameworks
            .iter()
            .find(|f| f.id == id)
            .ok_or_else(|| SimError::UnknownFramework { id: id.to_string() })
    }

    pub fn playbook(&self, id: &str) -> SimResult<&Playbook> {
        self.playbooks
            .iter()
            .find(|p| p.id == id)
            .ok_or_else(|| SimError::UnknownPlaybook { id: id.to_string() })
    }

    /// Insert or replace by id. The framework must validate.
    pub fn upsert_framework(&mut self, framework: Framework) -> SimResult<()> {
        framework.validate()?;
        match self.frameworks.iter_mut().find(|f| f.id == framework.id) {
            Some(existing) => *existing = framework,
            None => self.frameworks.push(framework),
        }
        self.recount_usage();
        Ok(())
    }

    /// Remove a framework and every playbook reference to it.
    pub fn delete_framework(&mut self, id: &str) -> SimResult<Framework> {
        let pos = self
            .frameworks
            .iter()
            .position(|f| f.id == id)
            .ok_or_else(|| SimError::UnknownFramework { id: id.to_string() })?;
        let removed = self.frameworks.remove(pos);
        for playbook in &mut self.playbooks {
            for stage in Stage::ALL {
                playbook.remove_framework(stage, id);
            }
        }
        self.recount_usage();
        Ok(removed)
    }

    /// Insert or replace by id. Every referenced framework must exist.
    pub fn upsert_playbook(&mut self, playbook: Playbook) -> SimResult<()> {
        if let Some(missing) = playbook
            .referenced_frameworks()
            .find(|fid| !self.frameworks.iter().any(|f| &f.id == *fid))
        {
            return Err(SimError::DanglingFramework {
                id: playbook.id.clone(),
                framework_id: missing.clone(),
            });
        }
        match self.playbooks.iter_mut().find(|p| p.id == playbook.id) {
            Some(existing) => *existing = playbook,
            None => self.playbooks.push(playbook),
        }
        self.recount_usage();
        Ok(())
    }

    pub fn delete_playbook(&mut self, id: &str) -> SimResult<Playbook> {
        let pos = self
            .playbooks
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| SimError::UnknownPlaybook { id: id.to_string() })?;
        let removed = self.playbooks.remove(pos);
        self.recount_usage();
        Ok(removed)
    }

    /// The first active playbook that runs `campaign`.
    pub fn playbook_for_campaign(&self, campaign: &str) -> Option<&Playbook> {
        self.playbooks
            .iter()
            .find(|p| p.status == PlaybookStatus::Active && p.campaigns.iter().any(|c| c == campaign))
    }

    /// Actions due for `customer` at its current lag, following its
    /// campaign's playbook into the frameworks for its stage.
    pub fn outreach_for<'a>(&'a self, customer: &Customer) -> Vec<OutreachStep<'a>> {
        let Some(playbook) = self.playbook_for_campaign(&customer.campaign) else {
            return Vec::new();
        };
        let lag = customer.lag();
        playbook
            .frameworks_for(customer.stage())
            .iter()
            .filter_map(|fid| self.framework(fid).ok())
            .filter(|f| f.status == FrameworkStatus::Active)
            .flat_map(|framework| {
                framework.actions_at(lag).map(move |action| OutreachStep {
                    playbook,
                    framework,
                    action,
                })
            })
            .collect()
    }

    fn recount_usage(&mut self) {
        for framework in &mut self.frameworks {
            let using: Vec<&Playbook> = self
                .playbooks
                .iter()
                .filter(|p| p.referenced_frameworks().any(|fid| *fid == framework.id))
                .collect();
            framework.usage = FrameworkUsage {
                playbooks: using.len() as u32,
                campaigns: using.iter().map(|p| p.campaigns.len() as u32).sum(),
            };
        }
    }

    /// The catalog a fresh workspace starts with.
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let email = |id: &str, order, timing, name: &str, from: &str, subject: &str, tpl: &str| {
            FrameworkAction {
                id: id.into(),
                order,
                channel: Channel::Email,
                timing,
                template_name: name.into(),
                config: Some(ActionConfig::Email(EmailConfig {
                    from_address: from.into(),
                    subject: subject.into(),
                    template_id: tpl.into(),
                    include_invoice: true,
                })),
            }
        };
        let whatsapp = |id: &str, order, timing, name: &str, tpl: &str| FrameworkAction {
            id: id.into(),
            order,
            channel: Channel::Whatsapp,
            timing,
            template_name: name.into(),
            config: Some(ActionConfig::Whatsapp(WhatsAppConfig {
                sender: "+15550101".into(),
                template_id: tpl.into(),
                language: "es".into(),
                variables: [("name".to_string(), "{user.name}".to_string())].into(),
                fallback_channel: None,
            })),
        };
        let framework = |id: &str, name: &str, description: &str, lane, status, actions| Framework {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            lane,
            status,
            actions,
            usage: FrameworkUsage::default(),
            updated_at: now,
        };

        let frameworks = vec![
            framework(
                "fw-001",
                "Gentle Preventive",
                "Friendly reminders before the due date.",
                Stage::Preventive,
                FrameworkStatus::Active,
                vec![
                    email("a1", 1, -5, "Pre-Notice 1", "billing@fintech.com", "Your invoice is ready", "tpl_pre_1"),
                    whatsapp("a2", 2, -2, "Friendly Reminder", "wa_reminder_v1"),
                ],
            ),
            framework(
                "fw-002",
                "Urgent Payment Day",
                "High intensity on the due date itself.",
                Stage::PaymentDay,
                FrameworkStatus::Active,
                vec![
                    FrameworkAction {
                        id: "a3".into(),
                        order: 1,
                        channel: Channel::Sms,
                        timing: 0,
                        template_name: "Due Today SMS".into(),
                        config: Some(ActionConfig::Sms(SmsConfig {
                            sender_id: "FINTECH".into(),
                            message_content: "Your invoice is due today.".into(),
                        })),
                    },
                    email("a4", 2, 0, "Invoice Due Today", "alert@fintech.com", "URGENT: Due date", "tpl_urgent"),
                ],
            ),
            framework(
                "fw-003",
                "Multichannel Post Payment",
                "Early recovery",
                Stage::PostPayment,
                FrameworkStatus::Paused,
                vec![email("a5", 1, 1, "Payment Failed", "billing@fintech.com", "Payment failed", "tpl_failed")],
            ),
            framework(
                "fw-004",
                "Legal Escalation",
                "Pre-legal notice",
                Stage::Escalation,
                FrameworkStatus::Paused,
                vec![email("a6", 1, 30, "Formal Notice", "legal@fintech.com", "Formal notice", "tpl_legal")],
            ),
            framework(
                "fw-005",
                "Renegotiation Offer",
                "20% discount",
                Stage::Reframing,
                FrameworkStatus::Active,
                vec![whatsapp("a7", 1, 10, "20% Off Offer", "wa_offer_20")],
            ),
        ];

        let playbooks = vec![
            Playbook {
                id: "pb-001".into(),
                name: "Core Strategy: Monthly Subscription".into(),
                description: "Standard flow for low-risk recurring customers.".into(),
                status: PlaybookStatus::Active,
                risk_profile: RiskProfile::Low,
                use_case: UseCase::Subscription,
                version: 1.2,
                stages: vec![
                    PlaybookStage { stage: Stage::Preventive, framework_ids: vec!["fw-001".into()] },
                    PlaybookStage { stage: Stage::PaymentDay, framework_ids: vec!["fw-002".into()] },
                    PlaybookStage { stage: Stage::PostPayment, framework_ids: vec!["fw-003".into()] },
                ],
                campaigns: vec!["March Subscription".into(), "April Subscription".into()],
                updated_at: now,
                updated_by: "Admin".into(),
            },
            Playbook {
                id: "pb-002".into(),
                name: "Aggressive Recovery".into(),
                description: "Designed for high-risk segments with debt > $500.".into(),
                status: PlaybookStatus::Draft,
                risk_profile: RiskProfile::High,
                use_case: UseCase::Custom,
                version: 0.1,
                stages: vec![
                    PlaybookStage { stage: Stage::PaymentDay, framework_ids: vec!["fw-002".into()] },
                    PlaybookStage { stage: Stage::Escalation, framework_ids: vec!["fw-004".into()] },
                ],
                campaigns: Vec::new(),
                updated_at: now,
                updated_by: "Admin".into(),
            },
        ];

        let mut catalog = Self { frameworks, playbooks };
        catalog.recount_usage();
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::<Utc>::default()
    }

    #[test]
    fn seeded_catalog_is_consistent() {
        let catalog = Catalog::seeded(now());
        for f in catalog.frameworks() {
            assert!(f.validate().is_ok(), "seeded framework {} is invalid", f.id);
        }
        let rebuilt = Catalog::from_parts(
            catalog.frameworks().to_vec(),
            catalog.playbooks().to_vec(),
        );
        assert!(rebuilt.is_ok());
        let fw2 = catalog.framework("fw-002").expect("fw-002");
        assert_eq!(fw2.usage.playbooks, 2);
        assert_eq!(fw2.usage.campaigns, 2);
    }

    #[test]
    fn new_action_is_invalid_until_configured() {
        let mut catalog = Catalog::seeded(now());
        let mut fw = catalog.framework("fw-005").expect("fw-005").clone();
        let added = fw.add_action("a8", Channel::Sms);
        assert_eq!(added.timing, 12);
        assert_eq!(added.order, 2);
        assert!(!added.is_valid());
        let err = catalog.upsert_framework(fw.clone()).unwrap_err();
        assert!(matches!(err, SimError::InvalidFramework { .. }));

        if let Some(action) = fw.actions.iter_mut().find(|a| a.id == "a8") {
            action.config = Some(ActionConfig::Sms(SmsConfig {
                sender_id: "FINTECH".into(),
                message_content: "Last call".into(),
            }));
        }
        catalog.upsert_framework(fw).expect("valid after configuring");
    }

    #[test]
    fn mismatched_config_is_invalid() {
        let action = FrameworkAction {
            id: "x".into(),
            order: 1,
            channel: Channel::Call,
            timing: 3,
            template_name: "Call".into(),
            config: Some(ActionConfig::Sms(SmsConfig {
                sender_id: "A".into(),
                message_content: "B".into(),
            })),
        };
        assert!(!action.is_valid());
    }

    #[test]
    fn empty_framework_defaults_first_timing_to_one() {
        let fw = Framework {
            id: "fw-x".into(),
            name: "x".into(),
            description: String::new(),
            lane: Stage::PostPayment,
            status: FrameworkStatus::Active,
            actions: Vec::new(),
            usage: FrameworkUsage::default(),
            updated_at: now(),
        };
        assert_eq!(fw.next_action_timing(), 1);
    }

    #[test]
    fn next_timing_saturates_at_the_lag_ceiling() {
        let mut fw = Catalog::seeded(now()).framework("fw-005").expect("fw-005").clone();
        fw.actions[0].timing = Lag::MAX;
        assert_eq!(fw.next_action_timing(), Lag::MAX);
    }

    #[test]
    fn from_parts_rejects_unconfigured_actions() {
        let catalog = Catalog::seeded(now());
        let mut frameworks = catalog.frameworks().to_vec();
        frameworks[0].add_action("a-bare", Channel::Email);

        let err = Catalog::from_parts(frameworks, catalog.playbooks().to_vec()).unwrap_err();
        assert!(matches!(err, SimError::InvalidFramework { .. }));
    }

    #[test]
    fn playbook_rejects_unknown_framework() {
        let mut catalog = Catalog::seeded(now());
        let mut pb = catalog.playbook("pb-002").expect("pb-002").duplicate("pb-003", now());
        pb.add_framework(Stage::Reframing, "fw-999");
        let err = catalog.upsert_playbook(pb).unwrap_err();
        assert!(matches!(err, SimError::DanglingFramework { .. }));
    }

    #[test]
    fn duplicate_is_a_fresh_draft() {
        let catalog = Catalog::seeded(now());
        let copy = catalog.playbook("pb-001").expect("pb-001").duplicate("pb-010", now());
        assert_eq!(copy.status, PlaybookStatus::Draft);
        assert_eq!(copy.version, 1.0);
        assert!(copy.name.ends_with("(Copy)"));
        assert!(copy.is_complete());
    }

    #[test]
    fn removing_last_framework_drops_the_stage() {
        let catalog = Catalog::seeded(now());
        let mut pb = catalog.playbook("pb-001").expect("pb-001").clone();
        pb.remove_framework(Stage::PostPayment, "fw-003");
        assert!(!pb.covers(Stage::PostPayment));
        assert_eq!(pb.stages.len(), 2);
        pb.add_framework(Stage::Preventive, "fw-001");
        assert_eq!(pb.frameworks_for(Stage::Preventive).len(), 1);
    }

    #[test]
    fn deleting_framework_strips_references() {
        let mut catalog = Catalog::seeded(now());
        catalog.delete_framework("fw-002").expect("delete");
        assert!(!catalog.playbook("pb-001").expect("pb-001").covers(Stage::PaymentDay));
        assert!(catalog.framework("fw-002").is_err());
    }

    #[test]
    fn outreach_follows_campaign_playbook() {
        let catalog = Catalog::seeded(now());
        let mut customer = Customer::new("cust-1", "Mia Wallace", -2);
        customer.campaign = "March Subscription".into();
        let steps = catalog.outreach_for(&customer);
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action.id, "a2");

        // Paused framework fw-003 never fires.
        customer.set_lag(1);
        assert!(catalog.outreach_for(&customer).is_empty());

        customer.campaign = "Summer Promo".into();
        customer.set_lag(-2);
        assert!(catalog.outreach_for(&customer).is_empty());
    }
}
