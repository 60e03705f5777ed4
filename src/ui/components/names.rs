use std::collections::HashMap;

use crate::backend::cache::QueryFamily;
use crate::backend::types::{Principal, UserProfile};
use crate::backend::CachedBackend;
use crate::query::Query;

/// Resolves principals to profile names through the cached `userProfile`
/// read. Unknown or unnamed users display as a shortened principal.
pub struct NameResolver {
  backend: CachedBackend,
  queries: HashMap<Principal, Query<Option<UserProfile>>>,
}

impl NameResolver {
  pub fn new(backend: CachedBackend) -> Self {
    Self {
      backend,
      queries: HashMap::new(),
    }
  }

  /// Start lookups for principals not seen before
  pub fn request<'a>(&mut self, users: impl IntoIterator<Item = &'a Principal>) {
    for user in users {
      if self.queries.contains_key(user) {
        continue;
      }
      let backend = self.backend.clone();
      let principal = user.clone();
      let mut query = Query::new(move || {
        let backend = backend.clone();
        let principal = principal.clone();
        async move { backend.user_profile(&principal).await.map_err(|e| e.to_string()) }
      })
      .watching(self.backend.cache().subscribe(), &[QueryFamily::UserProfile]);
      query.fetch();
      self.queries.insert(user.clone(), query);
    }
  }

  /// Poll every lookup; true if any name changed
  pub fn poll(&mut self) -> bool {
    let mut changed = false;
    for query in self.queries.values_mut() {
      changed |= query.poll();
    }
    changed
  }

  pub fn profile(&self, user: &Principal) -> Option<&UserProfile> {
    self.queries.get(user)?.data()?.as_ref()
  }

  pub fn name(&self, user: &Principal) -> String {
    match self.profile(user) {
      Some(profile) if !profile.name.trim().is_empty() => profile.name.clone(),
      _ => user.short(),
    }
  }
}
