use crate::error::ReferralError;
use crate::store::UserDirectory;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One upline member eligible for a commission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UplineMember {
    pub level: u32,
    pub user_id: String,
}

/// Walks referrer chains one lookup per hop.
#[derive(Clone)]
pub struct UplineResolver {
    users: Arc<dyn UserDirectory>,
}

impl UplineResolver {
    pub fn new(users: Arc<dyn UserDirectory>) -> Self {
        UplineResolver { users }
    }

    /// Starts a lazy walk above `source_user_id`. Nothing is read until the
    /// first call to [`UplineWalk::next`].
    pub fn walk(&self, source_user_id: &str, max_depth: u32) -> UplineWalk {
        UplineWalk {
            users: self.users.clone(),
            source_user_id: source_user_id.to_owned(),
            max_depth,
            level: 1,
            seen: HashSet::from([source_user_id.to_owned()]),
            cursor: Cursor::Start,
        }
    }

    /// Runs a full walk and collects it.
    pub async fn resolve(
        &self,
        source_user_id: &str,
        max_depth: u32,
    ) -> Result<Vec<UplineMember>, ReferralError> {
        let mut walk = self.walk(source_user_id, max_depth);
        let mut chain = Vec::new();
        while let Some(member) = walk.next().await? {
            chain.push(member);
        }
        Ok(chain)
    }
}

enum Cursor {
    Start,
    At(Option<String>),
    Done,
}

/// Single-use walk up one referral chain.
///
/// Stops at the first missing user, the first inactive referrer, a user id
/// already visited in this walk, or after `max_depth` members. A lookup
/// error ends the walk after being returned once.
pub struct UplineWalk {
    users: Arc<dyn UserDirectory>,
    source_user_id: String,
    max_depth: u32,
    level: u32,
    seen: HashSet<String>,
    cursor: Cursor,
}

impl UplineWalk {
    pub async fn next(&mut self) -> Result<Option<UplineMember>, ReferralError> {
        let current = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Start => match self.users.find_user(&self.source_user_id).await? {
                Some(source) => source.referred_by,
                None => {
                    debug!("Source user {} not found", self.source_user_id);
                    None
                }
            },
            Cursor::At(next) => next,
            Cursor::Done => None,
        };
        let current = match current.filter(|id| !id.is_empty()) {
            Some(current) => current,
            None => return Ok(None),
        };
        if self.level > self.max_depth {
            return Ok(None);
        }
        if !self.seen.insert(current.to_owned()) {
            warn!(
                "Referral cycle above {} at level {}: {} already visited",
                self.source_user_id, self.level, current
            );
            return Ok(None);
        }

        let referrer = match self.users.find_user(&current).await? {
            Some(referrer) => referrer,
            None => {
                info!(
                    "Referrer not found at level {}: {}",
                    self.level, current
                );
                return Ok(None);
            }
        };
        if !referrer.is_active_referral {
            info!(
                "Referrer {} at level {} is not an active referral, chain ends",
                current, self.level
            );
            return Ok(None);
        }

        let member = UplineMember {
            level: self.level,
            user_id: current,
        };
        self.level += 1;
        self.cursor = Cursor::At(referrer.referred_by);
        Ok(Some(member))
    }

    /// Number of members yielded so far.
    pub fn depth(&self) -> u32 {
        self.level - 1
    }
}
