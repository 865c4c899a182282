//! Cache scope: the fixed set of tag dimensions that partition cache entries.

use serde::{Deserialize, Serialize};

/// Tag dimensions of a cache entry. `None` means "no filter on this dimension" in a query and
/// "not tagged" in a stored entry. Empty strings are normalized to `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheScope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
    /// Comma-separated competitor names; compared per element (see [`ListMatch`]).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub competitors_list_str: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

/// One dimension of [`CacheScope`]. `as_str` is the stored field name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeField {
    NodeName,
    Feature,
    CompetitorsListStr,
    UserId,
    SessionId,
}

impl ScopeField {
    pub const ALL: [ScopeField; 5] = [
        ScopeField::NodeName,
        ScopeField::Feature,
        ScopeField::CompetitorsListStr,
        ScopeField::UserId,
        ScopeField::SessionId,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ScopeField::NodeName => "nodeName",
            ScopeField::Feature => "feature",
            ScopeField::CompetitorsListStr => "competitorsListStr",
            ScopeField::UserId => "userId",
            ScopeField::SessionId => "sessionId",
        }
    }

    /// Fields whose values are comma-separated lists.
    pub fn is_list(self) -> bool {
        matches!(self, ScopeField::CompetitorsListStr)
    }
}

/// How list-valued scope fields are compared between a query and a stored entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListMatch {
    /// Match when the lists share at least one element.
    #[default]
    AnyElement,
    /// Match only when both lists hold the same set of elements.
    AllElements,
}

impl From<env_config::ListMatchSetting> for ListMatch {
    fn from(s: env_config::ListMatchSetting) -> Self {
        match s {
            env_config::ListMatchSetting::Any => ListMatch::AnyElement,
            env_config::ListMatchSetting::All => ListMatch::AllElements,
        }
    }
}

fn present(v: impl Into<String>) -> Option<String> {
    let v = v.into();
    let trimmed = v.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.len() == v.len() {
        Some(v)
    } else {
        Some(trimmed.to_string())
    }
}

impl CacheScope {
    /// Scope with only `nodeName` set.
    pub fn node(node_name: impl Into<String>) -> Self {
        Self {
            node_name: present(node_name),
            ..Self::default()
        }
    }

    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.feature = present(feature);
        self
    }

    pub fn with_competitors(mut self, competitors_list_str: impl Into<String>) -> Self {
        self.competitors_list_str = present(competitors_list_str);
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = present(user_id);
        self
    }

    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = present(session_id);
        self
    }

    pub fn get(&self, field: ScopeField) -> Option<&str> {
        match field {
            ScopeField::NodeName => self.node_name.as_deref(),
            ScopeField::Feature => self.feature.as_deref(),
            ScopeField::CompetitorsListStr => self.competitors_list_str.as_deref(),
            ScopeField::UserId => self.user_id.as_deref(),
            ScopeField::SessionId => self.session_id.as_deref(),
        }
    }

    fn slot(&mut self, field: ScopeField) -> &mut Option<String> {
        match field {
            ScopeField::NodeName => &mut self.node_name,
            ScopeField::Feature => &mut self.feature,
            ScopeField::CompetitorsListStr => &mut self.competitors_list_str,
            ScopeField::UserId => &mut self.user_id,
            ScopeField::SessionId => &mut self.session_id,
        }
    }

    /// Sets `field`; an empty or blank value clears it.
    pub fn set(&mut self, field: ScopeField, value: impl Into<String>) {
        *self.slot(field) = present(value);
    }

    /// Copy with blank values removed and surrounding whitespace trimmed.
    pub fn normalized(&self) -> Self {
        let mut out = Self::default();
        for (field, value) in self.fields() {
            out.set(field, value);
        }
        out
    }

    /// Present `(field, value)` pairs in field order.
    pub fn fields(&self) -> impl Iterator<Item = (ScopeField, &str)> + '_ {
        ScopeField::ALL
            .into_iter()
            .filter_map(move |f| self.get(f).map(|v| (f, v)))
    }

    /// True when no dimension carries a non-blank value.
    pub fn is_empty(&self) -> bool {
        self.fields().all(|(_, v)| v.trim().is_empty())
    }
}

impl std::fmt::Display for CacheScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, value) in self.fields() {
            if !first {
                f.write_str(" ")?;
            }
            first = false;
            write!(f, "{}={}", field.as_str(), value)?;
        }
        Ok(())
    }
}
