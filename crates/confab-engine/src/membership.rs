//! Group membership lifecycle: add, soft-remove, re-entry and admin
//! promotion.
//!
//! Removal never deletes a roster record; the `removed` flag flips so the
//! member's name and avatar stay attached to their historical messages.
//! Re-adding a removed member reuses the same record. Admin entries are a
//! duplicated subset of the roster and are not pruned on soft-removal.

use chrono::Utc;
use tracing::info;

use confab_shared::{ConversationId, IdentityId, IdentityRef};
use confab_store::{
    Conversation, ConversationStore, ConversationUpdate, GroupProfile, Member,
};

use crate::error::{EngineError, Result};

/// Outcome of a membership mutation. Benign no-ops are reported as
/// outcomes, not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipOutcome {
    /// A brand-new roster record was appended.
    Added,
    /// A previously removed record was reactivated.
    Restored,
    /// The identity was already an active member; nothing written.
    AlreadyPresent,
    /// The member was duplicated into the admin list.
    Promoted,
    /// The identity was already an admin; nothing written.
    AlreadyAdmin,
}

#[derive(Clone)]
pub struct MembershipManager {
    store: ConversationStore,
}

impl MembershipManager {
    pub fn new(store: ConversationStore) -> Self {
        Self { store }
    }

    /// Create a group conversation. The creator lands first on the roster
    /// as its initial admin; invitees join as plain members.
    pub async fn create_group(
        &self,
        creator: &IdentityRef,
        invitees: &[IdentityRef],
        name: &str,
    ) -> Result<Conversation> {
        if name.trim().is_empty() {
            return Err(EngineError::EmptyGroupName);
        }

        let mut members = vec![Member::admin_from_identity(creator)];
        members.extend(invitees.iter().map(Member::from_identity));

        let doc = Conversation {
            id: ConversationId::new(),
            members,
            messages: Vec::new(),
            last_activity_at: Utc::now(),
            typing: Default::default(),
            last_access: Vec::new(),
            group: Some(GroupProfile {
                name: name.trim().to_string(),
                avatar_url: String::new(),
                admins: vec![Member::admin_from_identity(creator)],
            }),
        };

        self.store.create(doc.clone()).await?;
        info!(id = %doc.id, name, members = doc.members.len(), "group created");
        Ok(doc)
    }

    /// Add an identity to a group, restoring a soft-removed record when one
    /// exists instead of duplicating it.
    pub async fn add_member(
        &self,
        group_id: ConversationId,
        candidate: &IdentityRef,
    ) -> Result<MembershipOutcome> {
        let doc = self.require_group(group_id).await?;

        let mut members = doc.members;
        match members.iter_mut().find(|m| m.identity_id == candidate.id) {
            Some(record) if record.removed => {
                record.removed = false;
                self.store
                    .apply(group_id, ConversationUpdate::SetMembers(members))
                    .await?;
                info!(group = %group_id, member = %candidate.id, "member restored");
                Ok(MembershipOutcome::Restored)
            }
            Some(_) => Ok(MembershipOutcome::AlreadyPresent),
            None => {
                members.push(Member::from_identity(candidate));
                self.store
                    .apply(group_id, ConversationUpdate::SetMembers(members))
                    .await?;
                info!(group = %group_id, member = %candidate.id, "member added");
                Ok(MembershipOutcome::Added)
            }
        }
    }

    /// Soft-remove the selected members. Records are preserved for message
    /// attribution; returns how many flags actually flipped. Removing the
    /// last active member does not delete the group.
    pub async fn remove_members(
        &self,
        group_id: ConversationId,
        selected: &[IdentityId],
    ) -> Result<usize> {
        let doc = self.require_group(group_id).await?;

        let mut members = doc.members;
        let mut flipped = 0;
        for member in members
            .iter_mut()
            .filter(|m| !m.removed && selected.contains(&m.identity_id))
        {
            member.removed = true;
            flipped += 1;
        }

        if flipped > 0 {
            self.store
                .apply(group_id, ConversationUpdate::SetMembers(members))
                .await?;
            info!(group = %group_id, flipped, "members removed");
        }
        Ok(flipped)
    }

    /// Promote an active member to admin by duplicating their record into
    /// the admin list.
    pub async fn promote_admin(
        &self,
        group_id: ConversationId,
        member_id: &IdentityId,
    ) -> Result<MembershipOutcome> {
        let doc = self.require_group(group_id).await?;
        let Some(group) = doc.group.as_ref() else {
            return Err(EngineError::NotAGroup(group_id));
        };

        if group.admins.iter().any(|a| &a.identity_id == member_id) {
            return Ok(MembershipOutcome::AlreadyAdmin);
        }

        let mut members = doc.members.clone();
        let record = members
            .iter_mut()
            .find(|m| &m.identity_id == member_id && !m.removed)
            .ok_or_else(|| EngineError::NotAMember {
                conversation: group_id,
                identity: member_id.clone(),
            })?;
        record.is_admin = true;

        let mut admins = group.admins.clone();
        admins.push(record.clone());

        self.store
            .apply_all(
                group_id,
                vec![
                    ConversationUpdate::SetMembers(members),
                    ConversationUpdate::SetAdmins(admins),
                ],
            )
            .await?;
        info!(group = %group_id, member = %member_id, "admin promoted");
        Ok(MembershipOutcome::Promoted)
    }

    /// Rename the group.
    pub async fn rename_group(&self, group_id: ConversationId, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(EngineError::EmptyGroupName);
        }
        self.store
            .apply(
                group_id,
                ConversationUpdate::SetGroupName(name.trim().to_string()),
            )
            .await?;
        Ok(())
    }

    /// Point the group avatar at an already-uploaded image URL.
    pub async fn set_group_avatar(&self, group_id: ConversationId, url: &str) -> Result<()> {
        self.store
            .apply(
                group_id,
                ConversationUpdate::SetGroupAvatar(url.to_string()),
            )
            .await?;
        Ok(())
    }

    /// Soft-remove `identity` from a direct conversation, purging the
    /// document once every member is removed. Returns `true` when the
    /// purge happened. Groups are never purged this way.
    pub async fn leave(
        &self,
        conversation_id: ConversationId,
        identity: &IdentityId,
    ) -> Result<bool> {
        let doc = self.store.get(conversation_id).await?;

        let mut members = doc.members;
        for member in members
            .iter_mut()
            .filter(|m| &m.identity_id == identity)
        {
            member.removed = true;
        }

        let updated = self
            .store
            .apply(conversation_id, ConversationUpdate::SetMembers(members))
            .await?;

        if !updated.is_group() && updated.fully_removed() {
            self.store.delete(conversation_id).await?;
            return Ok(true);
        }
        Ok(false)
    }

    async fn require_group(&self, id: ConversationId) -> Result<Conversation> {
        let doc = self.store.get(id).await?;
        if !doc.is_group() {
            return Err(EngineError::NotAGroup(id));
        }
        Ok(doc)
    }
}
